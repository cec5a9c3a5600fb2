//! Read operations: by key, by clause, and random.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::sql;
use rowmap_model::{LoadMode, Record, Value};
use rusqlite::types::Value as SqlValue;
use tracing::debug;

impl Database {
    /// Fetches the record of `type_name` whose alternate key equals `key`.
    ///
    /// Returns `Ok(None)` when no row matches or `key` is falsy.
    pub fn select(&self, type_name: &str, key: impl Into<Value>, mode: LoadMode) -> DbResult<Option<Record>> {
        self.inner.clear_error();
        let record_type = self.record_type(type_name)?;
        let key = key.into();
        if !key.is_truthy() {
            debug!(type_name, "select with empty key");
            return Ok(None);
        }

        let table = sql::ident(record_type.name());
        let statement = format!(
            "SELECT {table}.* FROM {table} WHERE {} = ?1 LIMIT 1",
            sql::ident(record_type.alternate_key())
        );
        match self.inner.fetch_one(&statement, &[sql::to_sql(&key)?])? {
            Some(row) => Ok(Some(self.instantiate(&record_type, row, mode)?)),
            None => Ok(None),
        }
    }

    /// Fetches every record of `type_name`, with `clauses` (e.g.
    /// `"WHERE Active = ?1 ORDER BY Name LIMIT 10"`) appended verbatim and
    /// `params` bound positionally.
    pub fn select_all(
        &self,
        type_name: &str,
        clauses: &str,
        params: &[Value],
        mode: LoadMode,
    ) -> DbResult<Vec<Record>> {
        self.inner.clear_error();
        let record_type = self.record_type(type_name)?;
        let table = sql::ident(record_type.name());
        let statement = format!("SELECT {table}.* FROM {table} {clauses}");
        let params = sql::to_sql_all(params)?;

        self.inner
            .fetch_all(statement.trim_end(), &params)?
            .into_iter()
            .map(|row| self.instantiate(&record_type, row, mode))
            .collect()
    }

    /// Fetches one record at or above a uniformly drawn rank of the primary
    /// key.
    ///
    /// The draw is over `0..MAX(pk)`, so rows that follow a gap in the key
    /// sequence are picked more often: this is an approximate sample, not a
    /// uniform one. Requires an integer primary key.
    pub fn select_random(&self, type_name: &str, mode: LoadMode) -> DbResult<Option<Record>> {
        self.inner.clear_error();
        let record_type = self.record_type(type_name)?;
        let table = sql::ident(record_type.name());
        let pk = sql::ident(record_type.primary_key());

        let max = self
            .inner
            .fetch_one(&format!("SELECT MAX({pk}) AS max_key FROM {table}"), &[])?
            .map(|row| row.get("max_key").clone())
            .unwrap_or_default();
        let max = match max {
            Value::Null => return Ok(None),
            Value::Integer(max) => max,
            other => {
                return Err(DbError::Validation(format!(
                    "{} needs an integer primary key for random selection, found {other:?}",
                    record_type.name()
                )));
            }
        };

        let threshold = (max as f64 * rand::random::<f64>()).floor() as i64;
        let statement =
            format!("SELECT {table}.* FROM {table} WHERE {pk} >= ?1 ORDER BY {pk} LIMIT 1");
        match self.inner.fetch_one(&statement, &[SqlValue::Integer(threshold)])? {
            Some(row) => Ok(Some(self.instantiate(&record_type, row, mode)?)),
            None => Ok(None),
        }
    }
}
