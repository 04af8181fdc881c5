//! Store error types

use thiserror::Error;

/// Errors raised at the key-value store boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Failed to serialize record: {0}")]
    Marshal(String),

    #[error("Failed to deserialize record: {0}")]
    Unmarshal(String),
}
