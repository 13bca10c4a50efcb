//! Error types for tally-core

use thiserror::Error;

/// Result type alias using tally-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tally-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Referenced debt, receipt, intention, or own-side record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller has no ownership relationship to the referenced debt/receipt
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Concurrent writer won, or an intention is already registered by the
    /// other side; caller should re-read and retry
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid split input (zero total parts, negative price/quantity, part <= 0)
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    /// A money-conservation check failed after settlement; signals a bug,
    /// never retried
    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            // Unique-constraint races (duplicate intention, duplicate debt row)
            // surface as Conflict so callers re-read instead of overwriting.
            rusqlite::Error::SqliteFailure(sqlite_err, message)
                if sqlite_err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "unique constraint violation".to_string()),
                )
            }
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound("no matching row".to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}
