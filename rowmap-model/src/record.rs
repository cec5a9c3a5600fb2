use crate::{Entity, LoadMode, MappingDescriptor, ModelResult, RecordType, RelationshipLoader, Value};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

/// An [`Entity`] bound to its registered [`RecordType`].
///
/// Records built by the engine also carry a weak handle to the engine's
/// [`RelationshipLoader`]. While that engine is alive, [`Record::fetch`]
/// resolves unset mapped properties on demand, which means **any `fetch`
/// may issue a blocking query**. [`Record::get`] never does.
///
/// There is no identity map: loading the same key twice yields two
/// independent records.
#[derive(Clone)]
pub struct Record {
    record_type: Arc<RecordType>,
    entity: Entity,
    loader: Option<Weak<dyn RelationshipLoader>>,
}

impl Record {
    /// An empty record with no loader bound.
    pub fn new(record_type: Arc<RecordType>) -> Self {
        Self::from_entity(record_type, Entity::new())
    }

    pub fn from_entity(record_type: Arc<RecordType>, entity: Entity) -> Self {
        Self {
            record_type,
            entity,
            loader: None,
        }
    }

    /// Builds a record from a fetched row, binds `loader` and resolves
    /// relationships according to `mode`.
    ///
    /// `NoLazy` resolves every non-lazy mapping, `All` every mapping, `None`
    /// nothing. The first failing resolution aborts construction.
    pub fn hydrate(
        record_type: Arc<RecordType>,
        entity: Entity,
        loader: Weak<dyn RelationshipLoader>,
        mode: LoadMode,
    ) -> ModelResult<Self> {
        let mut record = Self::from_entity(record_type, entity);
        record.loader = Some(loader);
        if mode == LoadMode::None {
            return Ok(record);
        }

        let record_type = Arc::clone(&record.record_type);
        for (property, mapping) in record_type.mappings() {
            if mode == LoadMode::NoLazy && mapping.is_lazy() {
                continue;
            }
            record.resolve(property, mapping)?;
        }
        Ok(record)
    }

    pub fn bind_loader(&mut self, loader: Weak<dyn RelationshipLoader>) {
        self.loader = Some(loader);
    }

    /// True while a loader is bound and its engine is still alive.
    pub fn has_loader(&self) -> bool {
        self.live_loader().is_some()
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn type_name(&self) -> &str {
        self.record_type.name()
    }

    pub fn mapping(&self, property: &str) -> Option<&MappingDescriptor> {
        self.record_type.mapping(property)
    }

    /// Stored value of `property`; `Null` when unset. Never performs I/O.
    pub fn get(&self, property: &str) -> &Value {
        self.entity.get(property)
    }

    pub fn set(&mut self, property: impl Into<String>, value: impl Into<Value>) {
        self.entity.set(property, value);
    }

    pub fn remove(&mut self, property: &str) -> Option<Value> {
        self.entity.remove(property)
    }

    /// Value of `property`, resolving its mapping first if it is still unset.
    ///
    /// Resolution happens only when the stored value is null, a mapping is
    /// registered for `property`, and a live loader is bound. Otherwise this
    /// is the same as [`Record::get`].
    pub fn fetch(&mut self, property: &str) -> ModelResult<&Value> {
        self.ensure_loaded(property)?;
        Ok(self.entity.get(property))
    }

    /// Runs the lazy-resolution step of [`Record::fetch`] without reading.
    /// Returns whether a load was attempted.
    pub fn ensure_loaded(&mut self, property: &str) -> ModelResult<bool> {
        if !self.entity.get(property).is_null() {
            return Ok(false);
        }
        self.reload(property)
    }

    /// Re-resolves a mapped property unconditionally, overwriting the
    /// stored value with current persisted state.
    ///
    /// Returns `Ok(false)` when `property` has no mapping or no live loader.
    pub fn reload(&mut self, property: &str) -> ModelResult<bool> {
        let record_type = Arc::clone(&self.record_type);
        let Some(mapping) = record_type.mapping(property) else {
            return Ok(false);
        };
        self.resolve(property, mapping)
    }

    /// Primary key value, `Null` for a record that was never saved.
    pub fn id(&self) -> &Value {
        self.entity.get(self.record_type.primary_key())
    }

    pub fn set_id(&mut self, id: impl Into<Value>) {
        let key = self.record_type.primary_key().to_string();
        self.entity.set(key, id);
    }

    /// Value of the externally addressed key.
    pub fn alternate_id(&self) -> &Value {
        self.entity.get(self.record_type.alternate_key())
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    pub fn into_entity(self) -> Entity {
        self.entity
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.entity.to_json()
    }

    fn resolve(&mut self, property: &str, mapping: &MappingDescriptor) -> ModelResult<bool> {
        let Some(loader) = self.live_loader() else {
            return Ok(false);
        };
        loader.load_mapping(self, property, mapping)?;
        Ok(true)
    }

    fn live_loader(&self) -> Option<Rc<dyn RelationshipLoader>> {
        self.loader.as_ref().and_then(Weak::upgrade)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.record_type.name() == other.record_type.name() && self.entity == other.entity
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type", &self.record_type.name())
            .field("entity", &self.entity)
            .field("loader", &self.has_loader())
            .finish()
    }
}
