//! Write operations: insert, update, delete and save.
//!
//! Inserts and updates persist the scalar properties of a caller-owned
//! [`Entity`]. Many-to-many properties present in the entity are written to
//! their junction tables in the same transaction as the main row, so the
//! main row and every association commit together or not at all.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::sql;
use rowmap_model::{Entity, MappingDescriptor, RecordType, Relationship, Value};
use rusqlite::types::Value as SqlValue;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

/// Scalar columns to write plus the many-to-many sets to reconcile.
struct WritePlan<'a> {
    columns: Vec<(String, SqlValue)>,
    associations: Vec<Association<'a>>,
}

impl WritePlan<'_> {
    /// Writes a timestamp into the caller's entity and the column list.
    fn stamp(&mut self, entity: &mut Entity, field: &str, now: &str) {
        entity.set(field, now);
        let value = SqlValue::Text(now.to_string());
        match self.columns.iter_mut().find(|(name, _)| name == field) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((field.to_string(), value)),
        }
    }
}

/// Filtered related keys for one many-to-many property.
struct Association<'a> {
    property: String,
    mapping: &'a MappingDescriptor,
    keys: Vec<SqlValue>,
}

impl Database {
    /// Inserts a new row from `entity`.
    ///
    /// The entity must not carry a primary key. On success the generated key
    /// is written back into it, along with any created/updated stamps.
    pub fn insert(&self, type_name: &str, entity: &mut Entity) -> DbResult<()> {
        self.inner.clear_error();
        let record_type = self.record_type(type_name)?;
        let pk = record_type.primary_key();
        if entity.get(pk).is_truthy() {
            return Err(DbError::Validation(format!(
                "insert into {type_name} does not accept a caller-supplied {pk}"
            )));
        }
        validate_names(entity)?;

        let mut plan = self.plan(&record_type, entity)?;
        let stamped: Vec<&str> = [record_type.created_field(), record_type.updated_field()]
            .into_iter()
            .flatten()
            .collect();
        if !stamped.is_empty() {
            let now = self.timestamp()?;
            for field in stamped {
                plan.stamp(entity, field, &now);
            }
        }
        let table = sql::ident(record_type.name());
        let statement = if plan.columns.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                column_list(&plan.columns),
                sql::placeholders(1, plan.columns.len())
            )
        };
        let values: Vec<SqlValue> = plan.columns.iter().map(|(_, v)| v.clone()).collect();

        let previous_key = entity.remove(pk);
        let result = self
            .inner
            .transactional(!plan.associations.is_empty(), || {
                self.inner.execute(&statement, &values)?;
                entity.set(pk, Value::Integer(self.inner.last_insert_id()));

                for association in &plan.associations {
                    let owner = owner_key(entity, association)?;
                    self.insert_links(association, &owner)?;
                }
                Ok(())
            });

        if result.is_err() {
            entity.remove(pk);
            if let Some(previous) = previous_key {
                entity.set(pk, previous);
            }
        }
        result
    }

    /// Updates the row identified by the entity's primary key.
    ///
    /// Every many-to-many property present in `entity` replaces the stored
    /// association set: afterwards the junction table holds exactly the
    /// filtered keys given.
    pub fn update(&self, type_name: &str, entity: &mut Entity) -> DbResult<()> {
        self.inner.clear_error();
        let record_type = self.record_type(type_name)?;
        let pk = record_type.primary_key();
        if !entity.get(pk).is_truthy() {
            return Err(DbError::Validation(format!(
                "update of {type_name} requires {pk}"
            )));
        }
        validate_names(entity)?;

        let mut plan = self.plan(&record_type, entity)?;
        if let Some(field) = record_type.updated_field() {
            plan.stamp(entity, field, &self.timestamp()?);
        }
        let key = sql::to_sql(entity.get(pk))?;
        let table = sql::ident(record_type.name());
        let update = if plan.columns.is_empty() {
            debug!(type_name, "no scalar columns to update");
            None
        } else {
            let assignments = plan
                .columns
                .iter()
                .enumerate()
                .map(|(i, (name, _))| format!("{} = ?{}", sql::ident(name), i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let mut values: Vec<SqlValue> = plan.columns.iter().map(|(_, v)| v.clone()).collect();
            values.push(key);
            let statement = format!(
                "UPDATE {table} SET {assignments} WHERE {} = ?{}",
                sql::ident(pk),
                values.len()
            );
            Some((statement, values))
        };

        self.inner
            .transactional(!plan.associations.is_empty(), || {
                if let Some((statement, values)) = &update {
                    self.inner.execute(statement, values)?;
                }
                for association in &plan.associations {
                    let owner = owner_key(entity, association)?;
                    self.unlink_stale(association, &owner)?;
                    self.insert_links(association, &owner)?;
                }
                Ok(())
            })
    }

    /// Deletes the row whose alternate key equals `key`; returns rows deleted.
    ///
    /// Junction rows and dependent records are not touched. Removing a row
    /// that is still referenced elsewhere is left to the store's own
    /// referential-integrity checks.
    pub fn delete(&self, type_name: &str, key: impl Into<Value>) -> DbResult<usize> {
        self.inner.clear_error();
        let record_type = self.record_type(type_name)?;
        let key = key.into();
        if !key.is_truthy() {
            return Err(DbError::Validation(format!(
                "delete from {type_name} requires a key"
            )));
        }
        let statement = format!(
            "DELETE FROM {} WHERE {} = ?1",
            sql::ident(record_type.name()),
            sql::ident(record_type.alternate_key())
        );
        self.inner.execute(&statement, &[sql::to_sql(&key)?])
    }

    /// Inserts when the entity has no primary key, updates otherwise.
    pub fn save(&self, type_name: &str, entity: &mut Entity) -> DbResult<()> {
        let record_type = self.record_type(type_name)?;
        if entity.get(record_type.primary_key()).is_truthy() {
            self.update(type_name, entity)
        } else {
            self.insert(type_name, entity)
        }
    }

    fn timestamp(&self) -> DbResult<String> {
        let format = &self.inner.config.datetime_format;
        let mut stamp = String::new();
        write!(stamp, "{}", chrono::Utc::now().format(format))
            .map_err(|_| DbError::Config(format!("invalid datetime format {format:?}")))?;
        Ok(stamp)
    }

    /// Splits `entity` into scalar columns and many-to-many key sets.
    ///
    /// The primary key, every mapped property and every non-scalar value are
    /// kept out of the column list.
    fn plan<'a>(&self, record_type: &'a Arc<RecordType>, entity: &Entity) -> DbResult<WritePlan<'a>> {
        let mut associations = Vec::new();
        for (property, mapping) in record_type.mappings() {
            if mapping.relationship() != Relationship::ManyToMany || !entity.contains(property) {
                continue;
            }
            let items = entity.get(property).as_list().ok_or_else(|| {
                DbError::Validation(format!(
                    "{}.{property} must be a list of keys or records",
                    record_type.name()
                ))
            })?;
            associations.push(Association {
                property: property.to_string(),
                mapping,
                keys: self.related_keys(mapping, property, items)?,
            });
        }

        let columns = entity
            .iter()
            .filter(|(name, value)| {
                *name != record_type.primary_key()
                    && record_type.mapping(name).is_none()
                    && value.is_scalar()
            })
            .map(|(name, value)| Ok((name.to_string(), sql::to_sql(value)?)))
            .collect::<DbResult<Vec<_>>>()?;

        Ok(WritePlan {
            columns,
            associations,
        })
    }

    /// Keys referenced by a many-to-many value, with falsy entries dropped
    /// and duplicates removed. Records contribute their primary key.
    fn related_keys(
        &self,
        mapping: &MappingDescriptor,
        property: &str,
        items: &[Value],
    ) -> DbResult<Vec<SqlValue>> {
        let related_pk = self.record_type(mapping.object_type())?.primary_key().to_string();
        let mut keys: Vec<SqlValue> = Vec::new();
        for item in items {
            let key = match item {
                Value::Record(record) => record.id(),
                Value::Entity(entity) => entity.get(&related_pk),
                Value::List(_) => {
                    return Err(DbError::Validation(format!(
                        "{property} entries must be keys or records, not lists"
                    )));
                }
                scalar => scalar,
            };
            if !key.is_truthy() {
                continue;
            }
            let key = sql::to_sql(key)?;
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Deletes junction rows for `owner` except those in the new key set
    /// (all of them when the set is empty).
    fn unlink_stale(&self, association: &Association<'_>, owner: &SqlValue) -> DbResult<usize> {
        let mapping = association.mapping;
        let mut statement = format!(
            "DELETE FROM {} WHERE {} = ?1",
            sql::ident(mapping.table()),
            sql::ident(mapping.to_column())
        );
        if !association.keys.is_empty() {
            let _ = write!(
                statement,
                " AND {} NOT IN ({})",
                sql::ident(junction_column(association)?),
                sql::placeholders(2, association.keys.len())
            );
        }
        let mut values = Vec::with_capacity(association.keys.len() + 1);
        values.push(owner.clone());
        values.extend(association.keys.iter().cloned());
        self.inner.execute(&statement, &values)
    }

    /// Bulk-inserts `(owner, key)` junction rows, ignoring ones that exist.
    fn insert_links(&self, association: &Association<'_>, owner: &SqlValue) -> DbResult<usize> {
        if association.keys.is_empty() {
            debug!(property = %association.property, "no related keys to link");
            return Ok(0);
        }
        let mapping = association.mapping;
        let statement = format!(
            "INSERT OR IGNORE INTO {} ({}, {}) VALUES {}",
            sql::ident(mapping.table()),
            sql::ident(mapping.to_column()),
            sql::ident(junction_column(association)?),
            sql::pair_placeholders(association.keys.len())
        );
        let values: Vec<SqlValue> = association
            .keys
            .iter()
            .flat_map(|key| [owner.clone(), key.clone()])
            .collect();
        self.inner.execute(&statement, &values)
    }
}

fn junction_column<'a>(association: &Association<'a>) -> DbResult<&'a str> {
    association.mapping.junction_column().ok_or_else(|| {
        DbError::Validation(format!(
            "{} is many-to-many but has no junction submapping",
            association.property
        ))
    })
}

/// The owning side of a junction row: the entity's value of the mapping's
/// `from_field`.
fn owner_key(entity: &Entity, association: &Association<'_>) -> DbResult<SqlValue> {
    let field = association.mapping.from_field();
    let value = entity.get(field);
    if !value.is_truthy() {
        return Err(DbError::Validation(format!(
            "{} needs {field} to link related rows",
            association.property
        )));
    }
    sql::to_sql(value)
}

fn validate_names(entity: &Entity) -> DbResult<()> {
    if entity.keys().any(str::is_empty) {
        return Err(DbError::Validation("property names must not be empty".into()));
    }
    Ok(())
}

fn column_list(columns: &[(String, SqlValue)]) -> String {
    columns
        .iter()
        .map(|(name, _)| sql::ident(name))
        .collect::<Vec<_>>()
        .join(", ")
}
