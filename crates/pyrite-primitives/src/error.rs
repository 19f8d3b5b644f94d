//! Validation errors

use thiserror::Error;

/// Malformed input to an API: wrong type, length or range.
///
/// Never recoverable and never charged gas; it signals a bug in the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Value has the wrong byte length
    #[error("invalid {what} length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// What was being validated
        what: &'static str,
        /// Required length
        expected: usize,
        /// Provided length
        got: usize,
    },

    /// Invalid hex string
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Value outside its permitted range
    #[error("{what} out of range: {value}")]
    OutOfRange {
        /// What was being validated
        what: &'static str,
        /// Offending value, formatted
        value: String,
    },

    /// Any other violated precondition
    #[error("{0}")]
    Invalid(String),
}

impl ValidationError {
    /// Build a free-form validation error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        ValidationError::Invalid(msg.into())
    }
}
