/*
    errors.rs - Error types for the document store client

    Store failures are deliberately coarse: callers either propagate them
    (capture path) or degrade to "not found" (restore path), so the
    taxonomy only distinguishes what those two paths need.
*/

use thiserror::Error;

/// Errors that can occur talking to the document store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the operation
    #[error("store backend error: {0}")]
    Backend(String),

    /// The store is unreachable or not initialized
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Document could not be encoded or decoded
    #[error("document serialization error: {0}")]
    Serialization(String),

    /// No document under the requested key
    #[error("document not found: {0}")]
    NotFound(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound("space_snapshots/space-1".to_string());
        assert_eq!(err.to_string(), "document not found: space_snapshots/space-1");
    }

    #[test]
    fn test_serde_error_conversion() {
        let bad = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: StoreError = bad.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
