use crate::{MappingDescriptor, ModelResult, Record};

/// The seam through which a [`Record`] calls back into persistence.
///
/// The engine binds a weak handle to its own implementation into every record
/// it builds, so records can resolve their relationships without depending on
/// the engine's concrete type.
pub trait RelationshipLoader {
    /// Resolves `property` of `record` according to `mapping` and assigns the
    /// result to the record.
    ///
    /// Singular mappings assign the related record when one row matches and
    /// leave the property untouched otherwise; plural mappings assign a list,
    /// possibly empty. Calling this again re-fetches and overwrites. On error
    /// the property is left untouched.
    fn load_mapping(
        &self,
        record: &mut Record,
        property: &str,
        mapping: &MappingDescriptor,
    ) -> ModelResult<()>;
}
