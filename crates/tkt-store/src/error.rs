/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key or namespace name cannot be represented by the backend.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob metadata could not be encoded or decoded.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// The backend does not implement this optional capability.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// Backend-internal failure (poisoned lock, task join error).
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
