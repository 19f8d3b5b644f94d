//! Database error types

use pyrite_primitives::{ValidationError, H256};
use thiserror::Error;

/// Database errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// Caller violated an API precondition
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A trie node referenced by hash is not in the node store
    #[error("missing trie node {0}")]
    MissingTrieNode(H256),

    /// Stored bytes could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<rlp::DecoderError> for DbError {
    fn from(err: rlp::DecoderError) -> Self {
        DbError::Decode(err.to_string())
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::MissingTrieNode(H256::ZERO);
        assert!(err.to_string().starts_with("missing trie node 0x0000"));

        let err: DbError = ValidationError::invalid("unknown checkpoint 3").into();
        assert_eq!(err.to_string(), "validation error: unknown checkpoint 3");

        let err: DbError = rlp::DecoderError::RlpIsTooShort.into();
        assert!(matches!(err, DbError::Decode(_)));
    }
}
