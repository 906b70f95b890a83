//! Key types with secure memory handling.
//!
//! Key material and passphrases zeroize their memory on drop and never
//! print their contents through `Debug`.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use sleepcrypt_common::{Error, Result};

/// Length of derived keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of each half of a derived key (signing and encryption).
pub const HALF_KEY_LENGTH: usize = KEY_LENGTH / 2;

/// Key derived from a passphrase.
///
/// The first half authenticates tokens with HMAC-SHA256, the second half
/// encrypts the payload with AES-128-CBC.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LENGTH],
}

impl DerivedKey {
    /// Create a key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// HMAC-SHA256 signing half.
    pub fn signing_key(&self) -> &[u8] {
        &self.key[..HALF_KEY_LENGTH]
    }

    /// AES-128 encryption half.
    pub fn encryption_key(&self) -> &[u8] {
        &self.key[HALF_KEY_LENGTH..]
    }

    /// Encode the key in the URL-safe base64 text format tokens are keyed by.
    pub fn encode(&self) -> String {
        URL_SAFE.encode(self.key)
    }

    /// Parse a key from its URL-safe base64 text format.
    ///
    /// # Errors
    /// - `InputType` if the text is not URL-safe base64 or does not hold
    ///   exactly KEY_LENGTH bytes
    pub fn decode(encoded: &str) -> Result<Self> {
        let mut raw = URL_SAFE
            .decode(encoded.trim())
            .map_err(|e| Error::InputType(format!("Key is not URL-safe base64: {}", e)))?;

        if raw.len() != KEY_LENGTH {
            let len = raw.len();
            raw.zeroize();
            return Err(Error::InputType(format!(
                "Invalid key length: expected {}, got {}",
                KEY_LENGTH, len
            )));
        }

        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&raw);
        raw.zeroize();
        Ok(Self { key })
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.ct_eq(&other.key).into()
    }
}

impl Eq for DerivedKey {}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivedKey([REDACTED])")
    }
}

/// Passphrase a key is derived from.
#[derive(Clone, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(from = "String")]
pub struct Passphrase(Vec<u8>);

impl Passphrase {
    /// Create a passphrase from bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the passphrase bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl PartialEq for Passphrase {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase([REDACTED])")
    }
}

/// Salt for key derivation.
///
/// A deployment uses one salt for every derivation; changing it makes all
/// previously issued tokens undecryptable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Create from bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Salt {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}
