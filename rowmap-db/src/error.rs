//! Error types for the persistence engine.

use rowmap_model::ModelError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for engine operations.
pub type DbResult<T> = Result<T, DbError>;

/// Driver-level detail of a failed store operation.
///
/// This is the engine's "last error" triple: the extended driver code (when
/// the driver reported one), a symbolic state, and the driver's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub code: Option<i32>,
    pub state: String,
    pub message: String,
}

impl ErrorInfo {
    /// State used when the driver error carries no SQLite result code.
    pub const GENERIC_STATE: &'static str = "HY000";

    pub fn from_sqlite(err: &rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ffi, message) => Self {
                code: Some(ffi.extended_code),
                state: format!("{:?}", ffi.code),
                message: message.clone().unwrap_or_else(|| err.to_string()),
            },
            other => Self {
                code: None,
                state: Self::GENERIC_STATE.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{} {}] {}", self.state, code, self.message),
            None => write!(f, "[{}] {}", self.state, self.message),
        }
    }
}

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// The store could not be opened or configured.
    #[error("connection error: {0}")]
    Connection(String),

    /// A single statement failed.
    #[error("query error: {0}")]
    Query(ErrorInfo),

    /// The caller passed an unknown type, an empty key or a malformed payload.
    /// Raised before any I/O.
    #[error("validation error: {0}")]
    Validation(String),

    /// Begin, commit or rollback failed, or a transaction was already open.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// The configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Schema or relationship-resolution error from the model layer.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl DbError {
    /// Driver detail, when this error came from the store.
    pub fn info(&self) -> Option<&ErrorInfo> {
        match self {
            DbError::Query(info) => Some(info),
            _ => None,
        }
    }
}
