use std::fmt;

use tkt_store::StoreError;

/// Errors from record repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// A required field was missing or empty.
    #[error("missing required field: {field}")]
    Validation { field: &'static str },

    /// The referenced record or payload does not exist.
    #[error("{what} not found")]
    NotFound { what: String },

    /// Upload rejected before any write: too large.
    #[error("file size {size} exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// Upload rejected before any write: MIME type not on the allow-list.
    #[error("file type not allowed: {0}")]
    UnsupportedType(String),

    /// The backing store failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// A collection could not be encoded for writing.
    #[error("codec error: {0}")]
    Codec(String),

    /// Every integer id of a collection has been handed out.
    #[error("no ids left in {collection}")]
    IdsExhausted { collection: String },

    /// Optimistic retries were exhausted on a contended key.
    #[error("concurrent modification of {key} persisted after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },
}

impl RecordError {
    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::NotFound {
            what: what.to_string(),
        }
    }

    /// `true` for errors caused by the request rather than the system.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::PayloadTooLarge { .. } | Self::UnsupportedType(_)
        )
    }
}

/// Result alias for record operations.
pub type RecordResult<T> = Result<T, RecordError>;
