//! Common utilities and types shared across SleepCrypt modules.
//!
//! This module provides the error taxonomy and the input types that the
//! cipher crate and the CLI agree on.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{CipherInput, SensitiveBytes};
