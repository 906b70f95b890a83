//! Common error types for SleepCrypt.

use thiserror::Error;

/// Top-level error type for SleepCrypt operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Passphrase, data or configuration value of an unsupported shape.
    #[error("Invalid input: {0}")]
    InputType(String),

    /// Data could not be converted to bytes.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Token failed integrity verification.
    ///
    /// Wrong key, corruption, tampering and malformed tokens all land here
    /// and carry no further detail.
    #[error("Authentication failed: invalid token or wrong passphrase")]
    Authentication,

    /// Authenticated plaintext is not valid UTF-8.
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Token is authentic but outside the accepted lifetime.
    #[error("Token expired: age {age_secs}s")]
    Expired {
        /// Token age in seconds; negative when stamped in the future.
        age_secs: i64,
    },

    /// Cryptographic primitive failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error came from token verification rather than from
    /// the caller's input or the environment.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
