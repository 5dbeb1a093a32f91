use thiserror::Error;

/// Errors produced when parsing or constructing record types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown priority: {0}")]
    UnknownPriority(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
