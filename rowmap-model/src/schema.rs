use crate::mapping::{MappingDescriptor, Relationship};
use crate::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// How much of a record's relationship graph to resolve when it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// No relationship is resolved up front.
    None,
    /// Every non-lazy mapping is resolved up front.
    #[default]
    NoLazy,
    /// Every mapping is resolved up front, lazy or not.
    All,
}

/// Registration of one concrete record type: its table, key fields,
/// timestamp fields and relationship mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordType {
    name: String,
    #[serde(default = "default_primary_key")]
    primary_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alternate_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_field: Option<String>,
    #[serde(default)]
    mappings: BTreeMap<String, MappingDescriptor>,
}

fn default_primary_key() -> String {
    "ID".to_string()
}

impl RecordType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: default_primary_key(),
            alternate_key: None,
            created_field: None,
            updated_field: None,
            mappings: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = name.into();
        self
    }

    #[must_use]
    pub fn with_alternate_key(mut self, name: impl Into<String>) -> Self {
        self.alternate_key = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_created_field(mut self, name: impl Into<String>) -> Self {
        self.created_field = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_updated_field(mut self, name: impl Into<String>) -> Self {
        self.updated_field = Some(name.into());
        self
    }

    /// Shorthand for the conventional `Created` / `Updated` pair.
    #[must_use]
    pub fn with_timestamps(self) -> Self {
        self.with_created_field("Created").with_updated_field("Updated")
    }

    #[must_use]
    pub fn with_mapping(mut self, property: impl Into<String>, mapping: MappingDescriptor) -> Self {
        self.mappings.insert(property.into(), mapping);
        self
    }

    /// Type identifier, also used as the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Key used for externally addressed lookups and deletes.
    /// Falls back to the primary key.
    pub fn alternate_key(&self) -> &str {
        self.alternate_key.as_deref().unwrap_or(&self.primary_key)
    }

    pub fn created_field(&self) -> Option<&str> {
        self.created_field.as_deref()
    }

    pub fn updated_field(&self) -> Option<&str> {
        self.updated_field.as_deref()
    }

    pub fn mapping(&self, property: &str) -> Option<&MappingDescriptor> {
        self.mappings.get(property)
    }

    pub fn mappings(&self) -> impl Iterator<Item = (&str, &MappingDescriptor)> {
        self.mappings.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn validate(&self, schema: &Schema) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::Schema("record type with empty name".into()));
        }
        if self.primary_key.is_empty() {
            return Err(ModelError::Schema(format!(
                "{}: primary key name is empty",
                self.name
            )));
        }
        for (property, mapping) in &self.mappings {
            let at = format!("{}.{}", self.name, property);
            validate_mapping(&at, mapping)?;
            if schema.get(mapping.object_type()).is_none() {
                return Err(ModelError::Schema(format!(
                    "{at}: related type {} is not registered",
                    mapping.object_type()
                )));
            }
            if mapping.relationship() == Relationship::ManyToMany && mapping.submappings().is_empty()
            {
                return Err(ModelError::Schema(format!(
                    "{at}: many-to-many mapping needs a submapping onto the related table"
                )));
            }
        }
        Ok(())
    }
}

fn validate_mapping(at: &str, mapping: &MappingDescriptor) -> ModelResult<()> {
    match mapping.to_field().split_once('.') {
        Some((table, column)) if !table.is_empty() && !column.is_empty() => {}
        _ => {
            return Err(ModelError::Schema(format!(
                "{at}: to_field {:?} is not of the form table.field",
                mapping.to_field()
            )));
        }
    }
    if mapping.from_field().is_empty() {
        return Err(ModelError::Schema(format!("{at}: from_field is empty")));
    }
    for sub in mapping.submappings() {
        validate_mapping(at, sub)?;
    }
    Ok(())
}

/// Registry of every record type the engine may read or write.
///
/// Populated once at startup, validated once, then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: HashMap<String, Arc<RecordType>>,
}

/// On-disk schema file layout.
#[derive(Debug, Deserialize)]
struct SchemaFile {
    records: Vec<RecordType>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a schema document of the form `{"records": [ ... ]}` and
    /// validates it.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let file: SchemaFile = serde_json::from_str(json)?;
        let mut schema = Schema::new();
        for record_type in file.records {
            schema.register(record_type)?;
        }
        schema.validate()?;
        Ok(schema)
    }

    /// Adds a record type. Names must be unique.
    pub fn register(&mut self, record_type: RecordType) -> ModelResult<Arc<RecordType>> {
        if self.types.contains_key(record_type.name()) {
            return Err(ModelError::Schema(format!(
                "record type {} registered twice",
                record_type.name()
            )));
        }
        let record_type = Arc::new(record_type);
        self.types
            .insert(record_type.name().to_string(), Arc::clone(&record_type));
        Ok(record_type)
    }

    /// Builder-style [`Schema::register`].
    pub fn with(mut self, record_type: RecordType) -> ModelResult<Self> {
        self.register(record_type)?;
        Ok(self)
    }

    /// Checks every registration against the others.
    pub fn validate(&self) -> ModelResult<()> {
        let mut names: Vec<&String> = self.types.keys().collect();
        names.sort();
        for name in names {
            self.types[name].validate(self)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RecordType>> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
