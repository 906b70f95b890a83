//! Cryptographic primitives for SleepCrypt.
//!
//! This module provides:
//! - Key derivation using PBKDF2-HMAC-SHA256
//! - Authenticated encryption in the Fernet token format
//!   (AES-128-CBC + HMAC-SHA256, URL-safe base64)
//! - A passphrase-keyed [`CipherService`] with injected configuration
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Tokens are verified in constant time before any decryption
//!
//! The salt is fixed per deployment rather than stored with each token, so
//! every token sealed under one passphrase shares a key.

pub mod cipher;
pub mod config;
pub mod kdf;
pub mod keys;
pub mod token;

pub use cipher::{decrypt, encrypt, CipherService};
pub use config::CipherConfig;
pub use kdf::{derive_key, KdfParams};
pub use keys::{DerivedKey, Passphrase, Salt};
pub use token::TokenInfo;

pub use sleepcrypt_common::{CipherInput, Error, Result};
