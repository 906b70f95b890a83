//! Passphrase-keyed cipher service.
//!
//! [`CipherService`] ties key derivation to the token format: it derives a
//! key from the caller's passphrase (or the configured fallback) and seals
//! or opens tokens with it. Each call derives afresh; callers that encrypt
//! repeatedly under one passphrase can derive once with
//! [`CipherService::derive_key`] and use the `*_with_key` methods.

use std::time::Duration;

use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::config::CipherConfig;
use crate::kdf;
use crate::keys::DerivedKey;
use crate::token;
use sleepcrypt_common::{CipherInput, Error, Result};

/// Encrypts and decrypts payloads under passphrase-derived keys.
#[derive(Debug, Clone)]
pub struct CipherService {
    config: CipherConfig,
}

impl CipherService {
    /// Create a service from a configuration.
    ///
    /// # Errors
    /// - `InputType` if the configuration is invalid
    pub fn new(config: CipherConfig) -> Result<Self> {
        config.validate()?;
        if config.is_development() {
            warn!("cipher configured with development passphrase or salt");
        }
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &CipherConfig {
        &self.config
    }

    /// Derive the key for `passphrase`, or for the fallback passphrase when
    /// none is given.
    ///
    /// # Postconditions
    /// - Same passphrase and configuration always yield the same key
    pub fn derive_key(&self, passphrase: Option<&[u8]>) -> Result<DerivedKey> {
        debug!(
            iterations = self.config.iterations,
            fallback = passphrase.is_none(),
            "deriving key"
        );
        let passphrase = passphrase.unwrap_or_else(|| self.config.fallback_passphrase.as_bytes());
        kdf::derive_key(passphrase, &self.config.salt, &self.config.kdf_params())
    }

    /// Encrypt `data` into a token.
    ///
    /// Text is encoded as UTF-8; bytes are encrypted as given. Two calls
    /// with the same input produce different tokens.
    pub fn encrypt(
        &self,
        data: impl Into<CipherInput>,
        passphrase: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let key = self.derive_key(passphrase)?;
        self.seal_with_key(&key, data)
    }

    /// Decrypt a token into text.
    ///
    /// # Errors
    /// - `Authentication` if the token is invalid or the passphrase is wrong
    /// - `Decoding` if the authenticated payload is not UTF-8
    pub fn decrypt(&self, token: &[u8], passphrase: Option<&[u8]>) -> Result<String> {
        let key = self.derive_key(passphrase)?;
        self.open_with_key(&key, token)
    }

    /// Decrypt a token into the original bytes.
    pub fn decrypt_bytes(&self, token: &[u8], passphrase: Option<&[u8]>) -> Result<Vec<u8>> {
        let key = self.derive_key(passphrase)?;
        token::open(&key, token)
    }

    /// Decrypt a token into text, rejecting tokens older than `ttl`.
    ///
    /// # Errors
    /// - `Authentication` and `Decoding` as for [`CipherService::decrypt`]
    /// - `Expired` if the token is outside its lifetime
    pub fn decrypt_with_ttl(
        &self,
        token: &[u8],
        passphrase: Option<&[u8]>,
        ttl: Duration,
    ) -> Result<String> {
        let key = self.derive_key(passphrase)?;
        into_text(token::open_with_ttl(&key, token, ttl)?)
    }

    /// Encrypt `data` under an already derived key.
    pub fn seal_with_key(&self, key: &DerivedKey, data: impl Into<CipherInput>) -> Result<Vec<u8>> {
        let plaintext = data.into().into_bytes();
        token::seal(key, plaintext.as_bytes())
    }

    /// Decrypt a token into text under an already derived key.
    pub fn open_with_key(&self, key: &DerivedKey, token: &[u8]) -> Result<String> {
        into_text(token::open(key, token)?)
    }
}

fn into_text(plaintext: Vec<u8>) -> Result<String> {
    String::from_utf8(plaintext).map_err(|e| {
        let reason = e.utf8_error().to_string();
        e.into_bytes().zeroize();
        Error::Decoding(reason)
    })
}

/// Encrypt `data` with the default configuration.
pub fn encrypt(data: impl Into<CipherInput>, passphrase: Option<&[u8]>) -> Result<Vec<u8>> {
    CipherService::new(CipherConfig::default())?.encrypt(data, passphrase)
}

/// Decrypt a token with the default configuration.
pub fn decrypt(token: &[u8], passphrase: Option<&[u8]>) -> Result<String> {
    CipherService::new(CipherConfig::default())?.decrypt(token, passphrase)
}
