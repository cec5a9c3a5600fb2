//! Relationship resolution: the engine side of [`RelationshipLoader`].

use crate::database::{Database, Inner};
use crate::error::{DbError, DbResult};
use crate::sql;
use rowmap_model::{
    LoadMode, MappingDescriptor, ModelError, ModelResult, Record, RelationshipLoader, Value,
};
use tracing::debug;

impl Database {
    /// Resolves `property` of `record` through its registered mapping,
    /// overwriting whatever the property held.
    ///
    /// Related records are built with [`LoadMode::None`]: their own
    /// relationships, eager ones included, resolve only on
    /// [`Record::fetch`]. This keeps cyclic mappings from recursing.
    ///
    /// Fails with a validation error when `property` has no mapping.
    pub fn load_mapping(&self, record: &mut Record, property: &str) -> DbResult<()> {
        self.inner.clear_error();
        let record_type = std::sync::Arc::clone(record.record_type());
        let mapping = record_type.mapping(property).ok_or_else(|| {
            DbError::Validation(format!(
                "{} has no mapping for property {property}",
                record_type.name()
            ))
        })?;
        self.inner.resolve(record, property, mapping)
    }
}

impl Inner {
    pub(crate) fn resolve(
        &self,
        record: &mut Record,
        property: &str,
        mapping: &MappingDescriptor,
    ) -> DbResult<()> {
        let related_type = self.record_type(mapping.object_type())?;
        let owner_value = record.get(mapping.from_field()).clone();

        if owner_value.is_null() {
            debug!(
                owner = record.type_name(),
                property,
                from_field = mapping.from_field(),
                "owner field is null; nothing to load"
            );
            if mapping.relationship().is_plural() {
                record.set(property, Value::List(Vec::new()));
            }
            return Ok(());
        }

        let statement = mapping_query(mapping);
        let rows = self.fetch_all(&statement, &[sql::to_sql(&owner_value)?])?;

        if mapping.relationship().is_singular() {
            if let Some(row) = rows.into_iter().next() {
                let related = self.instantiate(&related_type, row, LoadMode::None)?;
                record.set(property, related);
            }
        } else {
            let related = rows
                .into_iter()
                .map(|row| self.instantiate(&related_type, row, LoadMode::None).map(Value::from))
                .collect::<DbResult<Vec<_>>>()?;
            record.set(property, Value::List(related));
        }
        Ok(())
    }
}

impl RelationshipLoader for Inner {
    fn load_mapping(
        &self,
        record: &mut Record,
        property: &str,
        mapping: &MappingDescriptor,
    ) -> ModelResult<()> {
        self.clear_error();
        self.resolve(record, property, mapping)
            .map_err(|e| match e {
                DbError::Model(inner) => inner,
                other => ModelError::Load {
                    property: property.to_string(),
                    message: other.to_string(),
                },
            })
    }
}

/// `SELECT "<object>".* FROM "<table>"[, "<sub table>"...] WHERE <to> = ?1
/// [AND <sub from> = <sub to> ...]`
pub(crate) fn mapping_query(mapping: &MappingDescriptor) -> String {
    let mut tables = vec![sql::ident(mapping.table())];
    let mut conditions = vec![format!("{} = ?1", sql::qualified(mapping.to_field()))];
    for sub in mapping.submappings() {
        tables.push(sql::ident(sub.table()));
        conditions.push(format!(
            "{} = {}",
            sql::qualified(sub.from_field()),
            sql::qualified(sub.to_field())
        ));
    }
    format!(
        "SELECT {}.* FROM {} WHERE {}",
        sql::ident(mapping.object_type()),
        tables.join(", "),
        conditions.join(" AND ")
    )
}
