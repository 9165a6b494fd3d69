//! Error types for the engine.

use flowwatch_types::{InvalidPage, ParseCodeError};
use thiserror::Error;

/// Errors returned by engine operations.
///
/// None of these are fatal; each one describes a single rejected or failed
/// operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Production code was blank or not one of the known codes.
    #[error(transparent)]
    UnknownCode(#[from] ParseCodeError),

    /// A required field was missing or blank.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    /// Pagination parameters out of range.
    #[error(transparent)]
    InvalidPage(#[from] InvalidPage),

    /// The backing store could not complete the operation.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl CoreError {
    pub(crate) fn blank(field: &'static str) -> Self {
        CoreError::InvalidField {
            field,
            reason: "must not be blank",
        }
    }

    /// Whether the caller sent something unacceptable, as opposed to the
    /// engine failing to carry out a valid request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CoreError::Storage(_))
    }
}

/// Errors from a counter or event store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The store is not accepting operations.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
