//! Core error types for dosemate-core.
//!
//! User-facing entry points surface `NotFound` / `Unauthorized` /
//! `InvalidArgument` / `Conflict`; background cycles contain their own
//! failures and never propagate them out of the scheduled invocation.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dosemate-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The referenced reminder, medicine or user has no row.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller does not own the referenced medicine or reminder.
    #[error("not authorized")]
    Unauthorized,

    /// Malformed input (status string, time-of-day, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A conditional status update lost the race: the reminder already
    /// reached a terminal state. Benign for background tasks; user-facing
    /// callers see it as a client error.
    #[error("reminder {reminder_id} is already resolved")]
    Conflict { reminder_id: i64 },

    /// Database-related errors
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("database is locked")]
    Locked,
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
