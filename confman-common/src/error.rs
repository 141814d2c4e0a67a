//! Common error types for confman

use thiserror::Error;

/// Common result type for confman operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the library and the server
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Storage could not be reached (pool closed, timed out, I/O failure)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A named request field failed validation
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Storage-level uniqueness constraint rejected a write
    #[error("{field} already exists")]
    Conflict { field: String },

    /// Signed token could not be issued or verified
    #[error("Token error: {0}")]
    Token(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Validation failure for a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Classify a raw sqlx error.
    ///
    /// Unique-constraint violations become [`Error::Conflict`] naming the
    /// offending column; foreign-key violations become a validation error on
    /// `reference`; connectivity failures become [`Error::Unavailable`].
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => Error::Conflict {
                field: conflict_field(db_err.message()),
            },
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                Error::validation(
                    REFERENCE_FIELD,
                    "record is referenced by, or refers to, records that block this change",
                )
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                Error::Unavailable(err.to_string())
            }
            sqlx::Error::Io(io) => Error::Unavailable(io.to_string()),
            other => Error::Database(other),
        }
    }
}

/// Field named by foreign-key violations
pub const REFERENCE_FIELD: &str = "reference";

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::from_sqlx(err)
    }
}

/// Extract a user-facing field name from a SQLite unique-constraint message
///
/// `UNIQUE constraint failed: users.email` → `email`;
/// composite keys map to the name of the relationship they protect.
fn conflict_field(message: &str) -> String {
    let columns = message
        .rsplit(':')
        .next()
        .unwrap_or_default()
        .trim();

    match columns {
        "registrations.user_id, registrations.conference_id" => "registration".to_string(),
        "reviews.submission_id, reviews.reviewer_id" => "assignment".to_string(),
        single => single
            .split('.')
            .last()
            .filter(|s| !s.is_empty())
            .unwrap_or("record")
            .to_string(),
    }
}
