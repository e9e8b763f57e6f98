//! Error types and result handling for transaction persistence.
//!
//! Splits failures into two families: problems with the inbound payload
//! (`PayloadError`), which are the sender's fault, and problems with the
//! storage layer (`CoreError`), which are ours. The HTTP layer maps each
//! family onto its own status code.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Storage and infrastructure errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// No pooled connection became available within the acquire timeout.
    #[error("Connection pool exhausted: no connection available within the acquire timeout")]
    PoolExhausted,

    /// The pool has been closed, typically during shutdown.
    #[error("Database unavailable: connection pool closed")]
    Unavailable,

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Constraint violation other than the upsert conflict target.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl CoreError {
    /// Returns the stable error code reported to clients.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unavailable => "E3001",
            Self::PoolExhausted => "E3002",
            Self::Database(_) | Self::NotFound(_) | Self::ConstraintViolation(_) => "E3004",
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::PoolExhausted,
            sqlx::Error::PoolClosed => Self::Unavailable,
            sqlx::Error::RowNotFound => Self::NotFound("requested row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::ConstraintViolation(format!("unique constraint violation: {db_err}"))
            },
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                Self::ConstraintViolation(format!("check constraint violation: {db_err}"))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Reasons an inbound body cannot be turned into a `TransactionRecord`.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Body is not a JSON document.
    #[error("body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Body is JSON but does not have the transaction shape.
    #[error("body is not a transaction: {0}")]
    InvalidShape(#[source] serde_json::Error),

    /// Transaction id is missing, empty or not a string/integer.
    #[error("transaction id must be a non-empty string or integer")]
    InvalidId,

    /// `amount` is present but is not a decimal number.
    #[error("amount {value:?} is not a decimal number")]
    InvalidAmount {
        /// The raw value as transmitted.
        value: String,
    },

    /// A timestamp field is present but cannot be parsed.
    #[error("{field} {value:?} is not a recognised timestamp")]
    InvalidTimestamp {
        /// Name of the offending field.
        field: &'static str,
        /// The raw value as transmitted.
        value: String,
    },
}

impl PayloadError {
    /// Returns the stable error code reported to clients.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) | Self::InvalidShape(_) => "E1003",
            Self::InvalidId => "E1004",
            Self::InvalidAmount { .. } | Self::InvalidTimestamp { .. } => "E1005",
        }
    }
}
