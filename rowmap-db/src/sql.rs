//! Statement building and value conversion between the model and SQLite.

use crate::error::{DbError, DbResult};
use rowmap_model::{Entity, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};

/// Quotes an identifier, doubling embedded quotes.
pub(crate) fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a possibly qualified `table.field` reference.
pub(crate) fn qualified(field: &str) -> String {
    match field.split_once('.') {
        Some((table, column)) => format!("{}.{}", ident(table), ident(column)),
        None => ident(field),
    }
}

/// `?1, ?2, ...` starting at `start`.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `(?1, ?2), (?3, ?4), ...` for `rows` two-column tuples.
pub(crate) fn pair_placeholders(rows: usize) -> String {
    (0..rows)
        .map(|r| format!("(?{}, ?{})", 2 * r + 1, 2 * r + 2))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Converts a scalar property value to a bound parameter.
///
/// A nested record binds as its primary key, so a related record can be
/// written straight into a foreign-key field.
pub(crate) fn to_sql(value: &Value) -> DbResult<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
        Value::Record(r) => return to_sql(r.id()),
        Value::Entity(_) | Value::List(_) => {
            return Err(DbError::Validation(
                "nested entities and lists cannot be bound as parameters".into(),
            ));
        }
    })
}

pub(crate) fn to_sql_all(values: &[Value]) -> DbResult<Vec<SqlValue>> {
    values.iter().map(to_sql).collect()
}

pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Reads every column of `row` into an entity keyed by column name.
pub(crate) fn row_to_entity(columns: &[String], row: &rusqlite::Row<'_>) -> rusqlite::Result<Entity> {
    let mut entity = Entity::new();
    for (idx, name) in columns.iter().enumerate() {
        entity.set(name.clone(), from_sql(row.get_ref(idx)?));
    }
    Ok(entity)
}

/// Comma-joined rendering of bound values for debug logs.
pub(crate) fn describe(values: &[SqlValue]) -> String {
    values
        .iter()
        .map(|v| match v {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Integer(i) => i.to_string(),
            SqlValue::Real(r) => r.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Blob(b) => format!("<{} bytes>", b.len()),
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!(ident("User"), "\"User\"");
        assert_eq!(ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(qualified("UserRole.UserID"), "\"UserRole\".\"UserID\"");
        assert_eq!(qualified("ID"), "\"ID\"");
    }

    #[test]
    fn placeholder_lists() {
        assert_eq!(placeholders(2, 3), "?2, ?3, ?4");
        assert_eq!(placeholders(1, 0), "");
        assert_eq!(pair_placeholders(2), "(?1, ?2), (?3, ?4)");
    }

    #[test]
    fn bool_binds_as_integer() {
        assert_eq!(to_sql(&Value::Bool(true)).unwrap(), SqlValue::Integer(1));
        assert!(to_sql(&Value::List(vec![])).is_err());
    }
}
