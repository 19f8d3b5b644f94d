//! Error types for fixture runs

use thiserror::Error;

/// Test error type
#[derive(Error, Debug)]
pub enum TestError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fixture could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Pre-state setup or post-state read failed
    #[error("State error: {0}")]
    Db(#[from] pyrite_db::DbError),

    /// The VM returned an outward error instead of a computation
    #[error("Execution error: {0}")]
    Execution(#[from] pyrite_vm::Error),

    /// Assertion failed
    #[error("Assertion failed: {0}")]
    Assertion(String),
}

/// Test result type
pub type TestResult<T> = Result<T, TestError>;
