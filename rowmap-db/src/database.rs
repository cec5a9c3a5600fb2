//! The persistence engine: connection ownership, statement execution,
//! last-error state and transactions.

use crate::config::{DatabaseConfig, Dsn};
use crate::error::{DbError, DbResult, ErrorInfo};
use crate::sql;
use rowmap_model::{Entity, LoadMode, Record, RecordType, RelationshipLoader, Schema, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Persistence engine over one SQLite connection.
///
/// A `Database` is a cheap handle (`Clone` shares the same connection) meant
/// for one request on one thread. Records it builds hold only a weak
/// reference back to it: once the last handle is dropped the connection
/// closes, any still-open transaction is rolled back, and lazy reads on
/// surviving records stop loading.
///
/// Store failures are returned as [`DbError::Query`] and also recorded as
/// [`Database::last_error`]. "Not found" is never an error.
#[derive(Clone)]
pub struct Database {
    pub(crate) inner: Rc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) conn: Connection,
    pub(crate) schema: Arc<Schema>,
    pub(crate) config: DatabaseConfig,
    last_error: RefCell<Option<ErrorInfo>>,
    row_count: Cell<usize>,
    this: Weak<Inner>,
}

impl Database {
    /// Opens the store named by `config.dsn` and validates `schema`.
    pub fn open(config: DatabaseConfig, schema: Schema) -> DbResult<Self> {
        schema.validate()?;
        let conn = match config.parse_dsn()? {
            Dsn::Memory => Connection::open_in_memory(),
            Dsn::File(path) => Connection::open(&path),
        }
        .map_err(|e| connection_error("failed to open database", &e))?;

        if config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")
                .map_err(|e| connection_error("failed to enable foreign keys", &e))?;
        }
        if let Some(ms) = config.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))
                .map_err(|e| connection_error("failed to set busy timeout", &e))?;
        }

        debug!(dsn = %config.dsn, types = schema.len(), "opened database");
        let schema = Arc::new(schema);
        let inner = Rc::new_cyclic(|this| Inner {
            conn,
            schema,
            config,
            last_error: RefCell::new(None),
            row_count: Cell::new(0),
            this: this.clone(),
        });
        Ok(Self { inner })
    }

    /// Opens a private in-memory store (for tests and tooling).
    pub fn open_in_memory(schema: Schema) -> DbResult<Self> {
        Self::open(DatabaseConfig::in_memory(), schema)
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// The underlying connection, for collaborators that need raw access.
    pub fn connection(&self) -> &Connection {
        &self.inner.conn
    }

    // ── Last error ───────────────────────────────────────────────

    /// Detail of the most recent store failure, if the most recent operation
    /// failed in the store.
    pub fn last_error(&self) -> Option<ErrorInfo> {
        self.inner.last_error.borrow().clone()
    }

    /// Extended driver code of [`Database::last_error`].
    pub fn error_code(&self) -> Option<i32> {
        self.inner.last_error.borrow().as_ref().and_then(|e| e.code)
    }

    /// Rows affected by the last write, or rows returned by the last read.
    pub fn row_count(&self) -> usize {
        self.inner.row_count.get()
    }

    // ── Raw statements ───────────────────────────────────────────

    /// Executes one statement and returns the number of affected rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        self.inner.clear_error();
        let params = sql::to_sql_all(params)?;
        self.inner.execute(sql, &params)
    }

    /// Executes a script of statements separated by semicolons.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.inner.clear_error();
        debug!(sql, "executing batch");
        self.inner
            .conn
            .execute_batch(sql)
            .map_err(|e| self.inner.query_error(&e))
    }

    /// Runs a query and returns every row as an entity.
    pub fn fetch_all(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Entity>> {
        self.inner.clear_error();
        let params = sql::to_sql_all(params)?;
        self.inner.fetch_all(sql, &params)
    }

    // ── Transactions ─────────────────────────────────────────────

    /// Opens a transaction. Only one may be open at a time.
    pub fn begin_transaction(&self) -> DbResult<()> {
        self.inner.begin()
    }

    pub fn commit_transaction(&self) -> DbResult<()> {
        self.inner.commit()
    }

    pub fn rollback_transaction(&self) -> DbResult<()> {
        self.inner.rollback()
    }

    pub fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    // ── Shared helpers for the operation modules ─────────────────

    pub(crate) fn record_type(&self, type_name: &str) -> DbResult<Arc<RecordType>> {
        self.inner.record_type(type_name)
    }

    /// Builds a record bound to this engine, resolving mappings per `mode`.
    pub(crate) fn instantiate(
        &self,
        record_type: &Arc<RecordType>,
        row: Entity,
        mode: LoadMode,
    ) -> DbResult<Record> {
        self.inner.instantiate(record_type, row, mode)
    }
}

impl Inner {
    pub(crate) fn record_type(&self, type_name: &str) -> DbResult<Arc<RecordType>> {
        self.schema.get(type_name).cloned().ok_or_else(|| {
            DbError::Validation(format!("{type_name} is not a registered record type"))
        })
    }

    pub(crate) fn loader(&self) -> Weak<dyn RelationshipLoader> {
        self.this.clone()
    }

    pub(crate) fn instantiate(
        &self,
        record_type: &Arc<RecordType>,
        row: Entity,
        mode: LoadMode,
    ) -> DbResult<Record> {
        Ok(Record::hydrate(
            Arc::clone(record_type),
            row,
            self.loader(),
            mode,
        )?)
    }

    pub(crate) fn clear_error(&self) {
        self.last_error.replace(None);
    }

    /// Records a driver failure as the last error and wraps it.
    pub(crate) fn query_error(&self, err: &rusqlite::Error) -> DbError {
        let info = ErrorInfo::from_sqlite(err);
        error!(code = ?info.code, state = %info.state, message = %info.message, "caught database error");
        self.last_error.replace(Some(info.clone()));
        DbError::Query(info)
    }

    pub(crate) fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        debug!(sql, values = %sql::describe(params), "executing statement");
        let affected = self
            .conn
            .prepare(sql)
            .and_then(|mut stmt| stmt.execute(params_from_iter(params.iter())))
            .map_err(|e| self.query_error(&e))?;
        self.row_count.set(affected);
        Ok(affected)
    }

    pub(crate) fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Entity>> {
        debug!(sql, values = %sql::describe(params), "running query");
        let rows = self.query_rows(sql, params).map_err(|e| self.query_error(&e))?;
        self.row_count.set(rows.len());
        Ok(rows)
    }

    /// First row of a query, if any.
    pub(crate) fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> DbResult<Option<Entity>> {
        Ok(self.fetch_all(sql, params)?.into_iter().next())
    }

    fn query_rows(&self, sql: &str, params: &[SqlValue]) -> rusqlite::Result<Vec<Entity>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(sql::row_to_entity(&columns, row)?);
        }
        Ok(result)
    }

    pub(crate) fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    pub(crate) fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    pub(crate) fn begin(&self) -> DbResult<()> {
        if self.in_transaction() {
            error!("refusing to begin a nested transaction");
            return Err(DbError::Transaction("a transaction is already open".into()));
        }
        debug!("beginning database transaction");
        self.conn.execute_batch("BEGIN").map_err(|e| {
            let err = self.query_error(&e);
            error!("failed to begin database transaction");
            DbError::Transaction(format!("begin failed: {err}"))
        })
    }

    pub(crate) fn commit(&self) -> DbResult<()> {
        debug!("committing database transaction");
        self.conn.execute_batch("COMMIT").map_err(|e| {
            let err = self.query_error(&e);
            error!("failed to commit database transaction");
            DbError::Transaction(format!("commit failed: {err}"))
        })
    }

    pub(crate) fn rollback(&self) -> DbResult<()> {
        debug!("rolling back database transaction");
        self.conn.execute_batch("ROLLBACK").map_err(|e| {
            let err = self.query_error(&e);
            error!("failed to roll back database transaction");
            DbError::Transaction(format!("rollback failed: {err}"))
        })
    }

    /// Runs `body` inside a transaction when `enabled`, otherwise directly.
    ///
    /// Begin failure aborts before `body` runs. A failing `body` is rolled
    /// back and its error returned. A failing commit is rolled back too, so
    /// no transaction is left open on return. When the caller already holds
    /// a transaction, `body` joins it.
    pub(crate) fn transactional<T>(
        &self,
        enabled: bool,
        body: impl FnOnce() -> DbResult<T>,
    ) -> DbResult<T> {
        if !enabled {
            return body();
        }
        if self.in_transaction() {
            debug!("joining the caller's open transaction");
            return body();
        }
        self.begin()?;
        let result = body().and_then(|value| self.commit().map(|()| value));
        if result.is_err() && self.in_transaction() {
            if let Err(rollback_err) = self.rollback() {
                warn!(%rollback_err, "rollback after failed write also failed");
            }
        }
        result
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.in_transaction() {
            warn!("database closed with an open transaction; rolling back");
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                error!(error = %e, "failed to roll back database transaction");
            }
        }
    }
}

fn connection_error(context: &str, err: &rusqlite::Error) -> DbError {
    error!(error = %err, "{context}");
    DbError::Connection(format!("{context}: {err}"))
}
