//! Cipher configuration.
//!
//! A [`CipherConfig`] carries the deployment constants every derivation
//! depends on: the fallback passphrase used when a caller supplies none,
//! the salt, and the PBKDF2 iteration count. The defaults are development
//! values; deployments override them from a JSON file or the environment.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::kdf::{KdfParams, DEFAULT_ITERATIONS};
use crate::keys::{Passphrase, Salt};
use sleepcrypt_common::{Error, Result};

/// Development-only fallback passphrase.
pub const DEFAULT_FALLBACK_PASSPHRASE: &[u8] = b"this_is_a_default_key_for_development_only";

/// Development-only salt.
pub const DEFAULT_SALT: &[u8] = b"static_salt_for_development_only";

/// Environment variable overriding the fallback passphrase.
pub const ENV_PASSPHRASE: &str = "SLEEPCRYPT_PASSPHRASE";

/// Environment variable overriding the salt.
pub const ENV_SALT: &str = "SLEEPCRYPT_SALT";

/// Environment variable overriding the iteration count.
pub const ENV_ITERATIONS: &str = "SLEEPCRYPT_ITERATIONS";

/// Deployment constants for key derivation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CipherConfig {
    /// Passphrase substituted when a caller passes none.
    pub fallback_passphrase: Passphrase,
    /// Salt shared by every derivation.
    pub salt: Salt,
    /// PBKDF2 iteration count.
    pub iterations: u32,
}

impl CipherConfig {
    /// Create a configuration from explicit values.
    ///
    /// # Errors
    /// - `InputType` if the salt is empty or `iterations` is zero
    pub fn new(fallback_passphrase: Passphrase, salt: Salt, iterations: u32) -> Result<Self> {
        let config = Self {
            fallback_passphrase,
            salt,
            iterations,
        };
        config.validate()?;
        Ok(config)
    }

    /// Default configuration with overrides taken from the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Load a configuration from a JSON file.
    ///
    /// Missing fields keep their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading cipher config");

        let contents = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SLEEPCRYPT_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(passphrase) = lookup(ENV_PASSPHRASE) {
            debug!(var = ENV_PASSPHRASE, "fallback passphrase overridden");
            self.fallback_passphrase = Passphrase::from(passphrase);
        }
        if let Some(salt) = lookup(ENV_SALT) {
            debug!(var = ENV_SALT, "salt overridden");
            self.salt = Salt::from(salt);
        }
        if let Some(iterations) = lookup(ENV_ITERATIONS) {
            self.iterations = iterations.trim().parse().map_err(|e| {
                Error::InputType(format!("{} must be a positive integer: {}", ENV_ITERATIONS, e))
            })?;
            debug!(iterations = self.iterations, "iteration count overridden");
        }

        self.validate()?;
        Ok(self)
    }

    /// KDF parameters for this configuration.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams::new(self.iterations)
    }

    /// Whether this configuration still uses a development constant.
    pub fn is_development(&self) -> bool {
        self.fallback_passphrase.as_bytes() == DEFAULT_FALLBACK_PASSPHRASE
            || self.salt.as_bytes() == DEFAULT_SALT
    }

    /// Check the configuration can drive a derivation.
    pub fn validate(&self) -> Result<()> {
        if self.salt.is_empty() {
            return Err(Error::InputType("Salt cannot be empty".to_string()));
        }
        self.kdf_params().validate()
    }
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            fallback_passphrase: Passphrase::new(DEFAULT_FALLBACK_PASSPHRASE),
            salt: Salt::from_bytes(DEFAULT_SALT),
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_default_uses_development_constants() {
        let config = CipherConfig::default();
        assert_eq!(
            config.fallback_passphrase.as_bytes(),
            b"this_is_a_default_key_for_development_only"
        );
        assert_eq!(config.salt.as_bytes(), b"static_salt_for_development_only");
        assert_eq!(config.iterations, 100_000);
        assert!(config.is_development());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_validates() {
        assert!(CipherConfig::new(Passphrase::new("p"), Salt::from_bytes("s"), 1).is_ok());
        assert!(matches!(
            CipherConfig::new(Passphrase::new("p"), Salt::from_bytes(""), 1),
            Err(Error::InputType(_))
        ));
        assert!(matches!(
            CipherConfig::new(Passphrase::new("p"), Salt::from_bytes("s"), 0),
            Err(Error::InputType(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = CipherConfig::default()
            .with_overrides(lookup(&[
                (ENV_PASSPHRASE, "production passphrase"),
                (ENV_SALT, "production salt"),
                (ENV_ITERATIONS, "250000"),
            ]))
            .unwrap();

        assert_eq!(config.fallback_passphrase.as_bytes(), b"production passphrase");
        assert_eq!(config.salt.as_bytes(), b"production salt");
        assert_eq!(config.iterations, 250_000);
        assert!(!config.is_development());
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let config = CipherConfig::default().with_overrides(|_| None).unwrap();
        assert_eq!(config, CipherConfig::default());
    }

    #[test]
    fn test_invalid_iteration_override() {
        let err = CipherConfig::default()
            .with_overrides(lookup(&[(ENV_ITERATIONS, "lots")]))
            .unwrap_err();
        assert!(matches!(err, Error::InputType(_)));

        let err = CipherConfig::default()
            .with_overrides(lookup(&[(ENV_ITERATIONS, "0")]))
            .unwrap_err();
        assert!(matches!(err, Error::InputType(_)));
    }

    #[test]
    fn test_empty_salt_override_rejected() {
        let err = CipherConfig::default()
            .with_overrides(lookup(&[(ENV_SALT, "")]))
            .unwrap_err();
        assert!(matches!(err, Error::InputType(_)));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"salt": "lab-salt", "iterations": 1000}}"#).unwrap();

        let config = CipherConfig::load(file.path()).unwrap();
        assert_eq!(config.salt.as_bytes(), b"lab-salt");
        assert_eq!(config.iterations, 1_000);
        assert_eq!(
            config.fallback_passphrase.as_bytes(),
            DEFAULT_FALLBACK_PASSPHRASE
        );
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cipher": "aes-256-gcm"}}"#).unwrap();

        let err = CipherConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CipherConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
