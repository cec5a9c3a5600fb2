//! SQLite persistence engine for rowmap records.
//!
//! A [`Database`] owns one connection and the [`Schema`] of record types it
//! persists. It provides:
//!
//! - keyed, clause-based and random selection into [`Record`]s, with
//!   relationships resolved eagerly or on first access per [`LoadMode`]
//! - insert, update, save and delete from caller-owned [`Entity`] bags
//! - many-to-many association replacement, committed atomically with the
//!   owning row
//! - raw statements, explicit transactions and last-error inspection
//!
//! Records hold a weak reference to the engine that built them, so lazy
//! loading keeps working for as long as some `Database` handle is alive.

mod config;
mod database;
mod error;
mod loader;
mod select;
mod sql;
mod write;

pub use config::{DatabaseConfig, Dsn};
pub use database::Database;
pub use error::{DbError, DbResult, ErrorInfo};

pub use rowmap_model::{
    Entity, LoadMode, MappingDescriptor, ModelError, Record, RecordType, Relationship, Schema,
    Value,
};
