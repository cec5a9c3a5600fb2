//! Engine configuration.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Connection and behavior settings for a [`crate::Database`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlite::memory:`, `sqlite:<path>`, or a bare file path.
    pub dsn: String,
    /// Enforce foreign key constraints on the connection.
    pub foreign_keys: bool,
    /// How long to wait on a locked database file (ms).
    pub busy_timeout_ms: Option<u64>,
    /// `chrono` format string used when stamping created/updated fields.
    pub datetime_format: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: MEMORY_DSN.to_string(),
            foreign_keys: true,
            busy_timeout_ms: Some(5_000),
            datetime_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

const MEMORY_DSN: &str = "sqlite::memory:";

/// Where a DSN points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dsn {
    Memory,
    File(PathBuf),
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            dsn: format!("sqlite:{}", path.as_ref().display()),
            ..Self::default()
        }
    }

    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DbError::Config(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| DbError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Resolves the DSN. Drivers other than SQLite are a connection error.
    pub fn parse_dsn(&self) -> DbResult<Dsn> {
        let dsn = self.dsn.trim();
        if dsn.is_empty() {
            return Err(DbError::Connection("empty DSN".into()));
        }
        if dsn == MEMORY_DSN || dsn == ":memory:" {
            return Ok(Dsn::Memory);
        }
        match dsn.split_once(':') {
            Some(("sqlite", rest)) => {
                let path = rest.trim_start_matches("//");
                if path.is_empty() {
                    Err(DbError::Connection(format!("DSN {dsn:?} names no database file")))
                } else {
                    Ok(Dsn::File(PathBuf::from(path)))
                }
            }
            Some((driver, _)) if is_driver_name(driver) => Err(DbError::Connection(format!(
                "unsupported driver {driver:?}; only sqlite is available"
            ))),
            _ => Ok(Dsn::File(PathBuf::from(dsn))),
        }
    }
}

// Windows drive letters ("C:\...") are paths, not drivers.
fn is_driver_name(prefix: &str) -> bool {
    prefix.len() > 1 && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
