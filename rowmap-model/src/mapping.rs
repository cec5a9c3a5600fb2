use serde::{Deserialize, Serialize};

/// Cardinality of a relationship, seen from the owning record.
///
/// Only the cardinality of the *result* decides how a relationship resolves:
/// `ManyToOne` loads like `OneToOne` (one related record) and `ManyToMany`
/// loads like `OneToMany` (a list). The join mechanics live in the
/// descriptor's submappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Relationship {
    /// True when the relationship resolves to at most one related record.
    pub const fn is_singular(self) -> bool {
        matches!(self, Relationship::OneToOne | Relationship::ManyToOne)
    }

    pub const fn is_plural(self) -> bool {
        !self.is_singular()
    }
}

/// Declares one relationship between an owning record type and a related one.
///
/// Derived fields (`table`, `object_type`, and the defaults for `from_field`
/// and `lazy`) are computed once in [`MappingDescriptor::new`]; the value is
/// immutable afterwards.
///
/// A many-to-many relationship through a junction table is written as a
/// mapping onto the junction table whose single submapping joins onto the
/// related table:
///
/// ```
/// use rowmap_model::{MappingDescriptor, Relationship};
///
/// let roles = MappingDescriptor::builder(Relationship::ManyToMany, "UserRole.UserID")
///     .submapping(
///         MappingDescriptor::builder(Relationship::ManyToOne, "Role.ID")
///             .from_field("UserRole.RoleID")
///             .build(),
///     )
///     .build();
///
/// assert_eq!(roles.table(), "UserRole");
/// assert_eq!(roles.object_type(), "Role");
/// assert_eq!(roles.from_field(), "ID");
/// assert!(roles.is_lazy());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MappingSpec")]
pub struct MappingDescriptor {
    relationship: Relationship,
    from_field: String,
    to_field: String,
    table: String,
    object_type: String,
    submappings: Vec<MappingDescriptor>,
    lazy: bool,
}

impl MappingDescriptor {
    pub fn new(
        relationship: Relationship,
        from_field: Option<String>,
        to_field: impl Into<String>,
        submappings: Vec<MappingDescriptor>,
        lazy: Option<bool>,
    ) -> Self {
        let to_field = to_field.into();
        let table = table_of(&to_field).to_string();
        let object_type = submappings
            .last()
            .map_or_else(|| table.clone(), |last| last.object_type.clone());
        let from_field = from_field.unwrap_or_else(|| {
            if relationship.is_singular() {
                format!("{object_type}ID")
            } else {
                "ID".to_string()
            }
        });
        let lazy = lazy.unwrap_or(relationship.is_plural());

        Self {
            relationship,
            from_field,
            to_field,
            table,
            object_type,
            submappings,
            lazy,
        }
    }

    pub fn builder(relationship: Relationship, to_field: impl Into<String>) -> MappingBuilder {
        MappingBuilder {
            relationship,
            from_field: None,
            to_field: to_field.into(),
            submappings: Vec::new(),
            lazy: None,
        }
    }

    pub fn relationship(&self) -> Relationship {
        self.relationship
    }

    /// Field on the owning record whose value is matched against `to_field`.
    pub fn from_field(&self) -> &str {
        &self.from_field
    }

    /// `table.field` on the related side.
    pub fn to_field(&self) -> &str {
        &self.to_field
    }

    /// Table named by `to_field`. For many-to-many this is the junction table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Record type that resolution instantiates.
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn submappings(&self) -> &[MappingDescriptor] {
        &self.submappings
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Column half of `to_field` (`"UserID"` for `"UserRole.UserID"`).
    pub fn to_column(&self) -> &str {
        column_of(&self.to_field)
    }

    /// Column in the junction table holding the related key.
    ///
    /// Only meaningful for many-to-many mappings, where it is the column half
    /// of the first submapping's `from_field`.
    pub fn junction_column(&self) -> Option<&str> {
        self.submappings.first().map(|sub| column_of(&sub.from_field))
    }
}

/// Fluent construction for [`MappingDescriptor`]; derivation runs in `build`.
#[derive(Debug, Clone)]
pub struct MappingBuilder {
    relationship: Relationship,
    from_field: Option<String>,
    to_field: String,
    submappings: Vec<MappingDescriptor>,
    lazy: Option<bool>,
}

impl MappingBuilder {
    #[must_use]
    pub fn from_field(mut self, field: impl Into<String>) -> Self {
        self.from_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn submapping(mut self, mapping: MappingDescriptor) -> Self {
        self.submappings.push(mapping);
        self
    }

    #[must_use]
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = Some(lazy);
        self
    }

    pub fn build(self) -> MappingDescriptor {
        MappingDescriptor::new(
            self.relationship,
            self.from_field,
            self.to_field,
            self.submappings,
            self.lazy,
        )
    }
}

/// Serialized form of a mapping: only the explicit fields.
#[derive(Debug, Deserialize)]
struct MappingSpec {
    relationship: Relationship,
    #[serde(default)]
    from_field: Option<String>,
    to_field: String,
    #[serde(default)]
    submappings: Vec<MappingDescriptor>,
    #[serde(default)]
    lazy: Option<bool>,
}

impl From<MappingSpec> for MappingDescriptor {
    fn from(spec: MappingSpec) -> Self {
        MappingDescriptor::new(
            spec.relationship,
            spec.from_field,
            spec.to_field,
            spec.submappings,
            spec.lazy,
        )
    }
}

/// Table half of a `table.field` reference (text before the first `.`).
pub fn table_of(field: &str) -> &str {
    field.split_once('.').map_or(field, |(table, _)| table)
}

/// Column half of a `table.field` reference; unqualified names pass through.
pub fn column_of(field: &str) -> &str {
    field.split_once('.').map_or(field, |(_, column)| column)
}
