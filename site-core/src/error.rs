//! Error types for consent operations.

use thiserror::Error;

use crate::storage::StorageError;

/// Result type for consent operations.
pub type ConsentResult<T> = Result<T, ConsentError>;

/// Errors that can occur while loading or persisting consent.
#[derive(Debug, Error)]
pub enum ConsentError {
    /// The stored consent record could not be understood.
    ///
    /// Callers treat this exactly like an absent record.
    #[error("Malformed consent record: {0}")]
    Malformed(String),

    /// The backing storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ConsentError {
    /// Whether this error came from an unreadable stored record.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}
