use crate::{ModelError, ModelResult, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};

const NULL: &Value = &Value::Null;

/// An ordered bag of named properties.
///
/// Rows fetched from the store, payloads handed to the write path and the
/// property storage of every [`crate::Record`] are all entities. Properties
/// keep insertion order; setting an existing name replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    properties: Vec<(String, Value)>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an entity from a JSON object.
    ///
    /// Anything other than an object is not a property bag and is rejected.
    pub fn from_json(json: serde_json::Value) -> ModelResult<Self> {
        match json {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect()),
            other => Err(ModelError::MalformedEntity(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Returns the value of `name`, or `Null` when the property is unset.
    pub fn get(&self, name: &str) -> &Value {
        self.position(name)
            .map_or(NULL, |idx| &self.properties[idx].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        let idx = self.position(name)?;
        Some(&mut self.properties[idx].1)
    }

    /// Sets `name`, replacing any previous value and keeping its position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.properties[idx].1 = value,
            None => self.properties.push((name, value)),
        }
    }

    /// Builder-style [`Entity::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.position(name)?;
        Some(self.properties.remove(idx).1)
    }

    /// True when `name` is present and not null.
    pub fn contains(&self, name: &str) -> bool {
        !self.get(name).is_null()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Deep JSON rendering: nested entities and records expand to objects.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.properties
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|(k, _)| k == name)
    }
}

impl FromIterator<(String, Value)> for Entity {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut entity = Entity::new();
        for (k, v) in iter {
            entity.set(k, v);
        }
        entity
    }
}

impl IntoIterator for Entity {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.into_iter()
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.properties.len()))?;
        for (k, v) in &self.properties {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
