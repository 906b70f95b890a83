//! Key derivation using PBKDF2-HMAC-SHA256.

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::keys::{DerivedKey, Salt, KEY_LENGTH};
use sleepcrypt_common::{Error, Result};

/// Iteration count used unless a deployment configures another one.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Parameters for PBKDF2 key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Number of PBKDF2 iterations.
    pub iterations: u32,
}

impl KdfParams {
    /// Create parameters with a specific iteration count.
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Check the parameters can drive a derivation.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InputType(
                "KDF iteration count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

/// Derive a key from a passphrase and salt using PBKDF2-HMAC-SHA256.
///
/// # Preconditions
/// - `salt` must not be empty
/// - `params.iterations` must be non-zero
///
/// # Postconditions
/// - Returns a KEY_LENGTH-byte key
/// - The derived key is deterministic given the same inputs
///
/// # Errors
/// - `InputType` if the salt is empty or the iteration count is zero
///
/// # Security
/// - Passphrase is not stored or logged
/// - The intermediate buffer is zeroized after derivation
pub fn derive_key(passphrase: &[u8], salt: &Salt, params: &KdfParams) -> Result<DerivedKey> {
    params.validate()?;

    if salt.is_empty() {
        return Err(Error::InputType("Salt cannot be empty".to_string()));
    }

    let mut key_bytes = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(passphrase, salt.as_bytes(), params.iterations, &mut key_bytes);

    let key = DerivedKey::from_bytes(key_bytes);
    key_bytes.zeroize();

    Ok(key)
}
