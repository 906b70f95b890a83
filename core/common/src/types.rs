//! Common types used throughout SleepCrypt.

use std::ffi::OsStr;
use std::fmt;
use zeroize::Zeroize;

use crate::Error;

/// Payload handed to the cipher.
///
/// Text is encoded as UTF-8 before encryption; bytes pass through
/// unchanged.
#[derive(Clone, PartialEq, Eq)]
pub enum CipherInput {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl CipherInput {
    /// Resolve the payload to the bytes that get encrypted.
    pub fn into_bytes(self) -> SensitiveBytes {
        match self {
            CipherInput::Text(text) => SensitiveBytes::new(text.into_bytes()),
            CipherInput::Bytes(bytes) => SensitiveBytes::new(bytes),
        }
    }

    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            CipherInput::Text(text) => text.len(),
            CipherInput::Bytes(bytes) => bytes.len(),
        }
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for CipherInput {
    fn from(text: &str) -> Self {
        CipherInput::Text(text.to_string())
    }
}

impl From<String> for CipherInput {
    fn from(text: String) -> Self {
        CipherInput::Text(text)
    }
}

impl From<&[u8]> for CipherInput {
    fn from(bytes: &[u8]) -> Self {
        CipherInput::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for CipherInput {
    fn from(bytes: &[u8; N]) -> Self {
        CipherInput::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for CipherInput {
    fn from(bytes: Vec<u8>) -> Self {
        CipherInput::Bytes(bytes)
    }
}

impl TryFrom<&OsStr> for CipherInput {
    type Error = Error;

    /// Platform strings are accepted as text only when they are valid Unicode.
    fn try_from(value: &OsStr) -> Result<Self, Self::Error> {
        value
            .to_str()
            .map(|s| CipherInput::Text(s.to_string()))
            .ok_or_else(|| Error::Encoding("argument is not valid Unicode".to_string()))
    }
}

impl fmt::Debug for CipherInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherInput::Text(t) => write!(f, "Text([REDACTED; {} bytes])", t.len()),
            CipherInput::Bytes(b) => write!(f, "Bytes([REDACTED; {} bytes])", b.len()),
        }
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_text_input_is_utf8_encoded() {
        let input = CipherInput::from("héllo");
        assert_eq!(input.len(), 6);
        assert_eq!(input.into_bytes().as_bytes(), "héllo".as_bytes());
    }

    #[test]
    fn test_bytes_input_passes_through() {
        let raw = vec![0xffu8, 0x00, 0x80];
        let input = CipherInput::from(raw.clone());
        assert_eq!(input.into_bytes().as_bytes(), raw.as_slice());
    }

    #[test]
    fn test_empty_input() {
        assert!(CipherInput::from("").is_empty());
        assert!(CipherInput::from(Vec::<u8>::new()).is_empty());
    }

    #[test]
    fn test_os_str_input() {
        let input = CipherInput::try_from(OsStr::new("test_data")).unwrap();
        assert_eq!(input, CipherInput::Text("test_data".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_os_str_is_encoding_error() {
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(&[0x66, 0x6f, 0x80, 0x6f]);
        let err = CipherInput::try_from(raw).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_debug_is_redacted() {
        let input = CipherInput::from("secret");
        assert_eq!(format!("{:?}", input), "Text([REDACTED; 6 bytes])");

        let bytes = SensitiveBytes::new(b"secret".to_vec());
        assert_eq!(format!("{:?}", bytes), "SensitiveBytes([REDACTED; 6 bytes])");
    }

    proptest! {
        #[test]
        fn prop_text_and_bytes_agree(text in ".*") {
            let from_text = CipherInput::from(text.as_str()).into_bytes();
            let from_bytes = CipherInput::from(text.as_bytes()).into_bytes();
            prop_assert_eq!(from_text.as_bytes(), from_bytes.as_bytes());
        }
    }
}
