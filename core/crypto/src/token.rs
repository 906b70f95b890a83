//! Authenticated token format (Fernet).
//!
//! A token is the URL-safe base64 encoding of
//! `version || timestamp || iv || ciphertext || tag`:
//!
//! | field      | size        | content                                  |
//! |------------|-------------|------------------------------------------|
//! | version    | 1           | `0x80`                                   |
//! | timestamp  | 8           | seconds since the UNIX epoch, big-endian |
//! | iv         | 16          | random AES-CBC initialization vector     |
//! | ciphertext | 16 * n      | AES-128-CBC with PKCS#7 padding          |
//! | tag        | 32          | HMAC-SHA256 over all preceding fields    |
//!
//! Every parsing or verification failure reports `Error::Authentication`,
//! so a caller cannot distinguish a corrupted token from a wrong key.

use std::time::Duration;

use aes::Aes128;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::keys::DerivedKey;
use sleepcrypt_common::{Error, Result};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Format version marker.
pub const VERSION: u8 = 0x80;

/// Timestamp size (8 bytes).
pub const TIMESTAMP_SIZE: usize = 8;

/// IV size for AES-128-CBC (16 bytes).
pub const IV_SIZE: usize = 16;

/// AES block size (16 bytes).
pub const BLOCK_SIZE: usize = 16;

/// HMAC-SHA256 tag size (32 bytes).
pub const TAG_SIZE: usize = 32;

/// Version + timestamp + IV.
pub const HEADER_SIZE: usize = 1 + TIMESTAMP_SIZE + IV_SIZE;

/// Smallest decoded token: header, one padded block, tag.
pub const MIN_TOKEN_SIZE: usize = HEADER_SIZE + BLOCK_SIZE + TAG_SIZE;

/// How far in the future a token may be stamped when a lifetime is enforced.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Unauthenticated metadata read from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Format version byte.
    pub version: u8,
    /// Creation time claimed by the token.
    pub timestamp: u64,
    /// Length of the encrypted payload, padding included.
    pub ciphertext_len: usize,
}

impl TokenInfo {
    /// Creation time as a calendar date, if representable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Encrypt plaintext into a token.
///
/// # Postconditions
/// - Returns the URL-safe base64 token as bytes
/// - The IV is randomly generated and the timestamp is the current time
///
/// # Errors
/// - `Crypto` if the system clock is before the UNIX epoch
pub fn seal(key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let timestamp = u64::try_from(Utc::now().timestamp())
        .map_err(|_| Error::Crypto("System clock is before the UNIX epoch".to_string()))?;

    seal_with_iv(key, &iv, timestamp, plaintext)
}

/// Encrypt plaintext with a specific IV and timestamp.
///
/// # Warning
/// This function exists for reproducible tokens in tests and fixtures.
/// Reusing an IV with the same key leaks whether two plaintexts share a
/// prefix.
///
/// # Preconditions
/// - `iv` must be unique for each (key, plaintext) pair
pub fn seal_with_iv(
    key: &DerivedKey,
    iv: &[u8; IV_SIZE],
    timestamp: u64,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let ciphertext = Aes128CbcEnc::new_from_slices(key.encryption_key(), iv)
        .map_err(|e| Error::Crypto(format!("Invalid cipher key: {}", e)))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut frame = Vec::with_capacity(HEADER_SIZE + ciphertext.len() + TAG_SIZE);
    frame.push(VERSION);
    frame.extend_from_slice(&timestamp.to_be_bytes());
    frame.extend_from_slice(iv);
    frame.extend_from_slice(&ciphertext);

    let tag = sign(key, &frame)?;
    frame.extend_from_slice(&tag);

    Ok(URL_SAFE.encode(&frame).into_bytes())
}

/// Verify and decrypt a token without checking its age.
///
/// # Errors
/// - `Authentication` if the token is malformed, tampered with, or was
///   sealed under another key
pub fn open(key: &DerivedKey, token: &[u8]) -> Result<Vec<u8>> {
    open_at(key, token, None)
}

/// Verify and decrypt a token no older than `ttl`.
///
/// # Errors
/// - `Authentication` as for [`open`]
/// - `Expired` if the token is older than `ttl` or stamped more than
///   MAX_CLOCK_SKEW_SECS in the future
pub fn open_with_ttl(key: &DerivedKey, token: &[u8], ttl: Duration) -> Result<Vec<u8>> {
    open_at(key, token, Some((ttl, Utc::now().timestamp())))
}

/// Read the metadata of a token without authenticating it.
///
/// The returned values are attacker-controlled until the token has been
/// opened with the right key.
pub fn inspect(token: &[u8]) -> Result<TokenInfo> {
    let frame = decode_frame(token)?;
    let timestamp = read_timestamp(&frame);

    Ok(TokenInfo {
        version: frame[0],
        timestamp,
        ciphertext_len: frame.len() - HEADER_SIZE - TAG_SIZE,
    })
}

fn open_at(key: &DerivedKey, token: &[u8], ttl: Option<(Duration, i64)>) -> Result<Vec<u8>> {
    let frame = decode_frame(token)?;
    let (signed, tag) = frame.split_at(frame.len() - TAG_SIZE);

    let mut mac = HmacSha256::new_from_slice(key.signing_key())
        .map_err(|e| Error::Crypto(format!("Invalid signing key: {}", e)))?;
    mac.update(signed);
    mac.verify_slice(tag).map_err(|_| Error::Authentication)?;

    if let Some((ttl, now)) = ttl {
        check_age(read_timestamp(&frame), ttl, now)?;
    }

    let iv = &signed[1 + TIMESTAMP_SIZE..HEADER_SIZE];
    let ciphertext = &signed[HEADER_SIZE..];

    Aes128CbcDec::new_from_slices(key.encryption_key(), iv)
        .map_err(|e| Error::Crypto(format!("Invalid cipher key: {}", e)))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::Authentication)
}

/// Decode the base64 layer and check the frame shape.
fn decode_frame(token: &[u8]) -> Result<Vec<u8>> {
    let frame = URL_SAFE.decode(token).map_err(|_| Error::Authentication)?;

    if frame.len() < MIN_TOKEN_SIZE || frame[0] != VERSION {
        return Err(Error::Authentication);
    }
    if (frame.len() - HEADER_SIZE - TAG_SIZE) % BLOCK_SIZE != 0 {
        return Err(Error::Authentication);
    }

    Ok(frame)
}

fn read_timestamp(frame: &[u8]) -> u64 {
    let mut ts = [0u8; TIMESTAMP_SIZE];
    ts.copy_from_slice(&frame[1..1 + TIMESTAMP_SIZE]);
    u64::from_be_bytes(ts)
}

fn sign(key: &DerivedKey, data: &[u8]) -> Result<[u8; TAG_SIZE]> {
    let mut mac = HmacSha256::new_from_slice(key.signing_key())
        .map_err(|e| Error::Crypto(format!("Invalid signing key: {}", e)))?;
    mac.update(data);

    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

fn check_age(timestamp: u64, ttl: Duration, now: i64) -> Result<()> {
    let issued = i64::try_from(timestamp).unwrap_or(i64::MAX);
    let age_secs = now.saturating_sub(issued);
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

    if age_secs > ttl_secs || age_secs < -MAX_CLOCK_SKEW_SECS {
        return Err(Error::Expired { age_secs });
    }
    Ok(())
}
