//! Object model for the rowmap persistence engine.
//!
//! Defines the types the engine reads into and writes from:
//! - [`Value`] and [`Entity`]: ordered, dynamically typed property bags
//! - [`MappingDescriptor`]: one declared relationship between record types
//! - [`RecordType`] and [`Schema`]: the startup registry of persisted types
//! - [`Record`]: an entity bound to its type, with lazy relationship access
//! - [`RelationshipLoader`]: the callback seam records use to reach storage
//!
//! Nothing here performs I/O on its own. The only place a query can be
//! issued is through a loader bound into a [`Record`].

mod entity;
mod error;
mod loader;
pub mod mapping;
mod record;
mod schema;
mod value;

pub use entity::Entity;
pub use error::{ModelError, ModelResult};
pub use loader::RelationshipLoader;
pub use mapping::{MappingBuilder, MappingDescriptor, Relationship};
pub use record::Record;
pub use schema::{LoadMode, RecordType, Schema};
pub use value::Value;
