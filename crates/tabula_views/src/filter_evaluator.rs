//! Filter compatibility checks and predicate compilation.

use crate::{FilterType, TypeRegistry};
use tabula_core::{Field, Predicate};
use tabula_error::{ViewError, ViewErrorKind, ViewResult};
use tracing::{debug, instrument};

/// Validates filter type/field pairs and compiles filter values.
///
/// Knows nothing about views; capability checks happen in the handler.
#[derive(Debug, Clone, Copy, derive_new::new)]
pub struct FilterEvaluator<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> FilterEvaluator<'a> {
    /// Resolve a filter type and check it accepts the field's kind.
    ///
    /// # Errors
    ///
    /// `FilterNotSupported` for unknown tags and
    /// `FilterTypeUnsupportedForField` for incompatible kinds.
    pub fn check(&self, field: &Field, filter_type: &str) -> ViewResult<&'a FilterType> {
        let descriptor = self.registry.get_filter_type(filter_type)?;
        if !descriptor.accepts(*field.kind()) {
            debug!(
                filter_type,
                field_id = %field.id(),
                field_kind = %field.kind(),
                "Filter type not compatible with field"
            );
            return Err(ViewError::new(
                ViewErrorKind::FilterTypeUnsupportedForField {
                    filter_type: filter_type.to_string(),
                    field_id: field.id().get(),
                    field_kind: field.kind().to_string(),
                },
            ));
        }
        Ok(descriptor)
    }

    /// Compile one filter into a predicate.
    ///
    /// # Errors
    ///
    /// Everything [`check`](Self::check) reports, plus `InvalidFilterValue`
    /// when the raw value cannot be coerced for the field.
    #[instrument(level = "debug", skip(self, field), fields(field_id = %field.id()))]
    pub fn compile(&self, field: &Field, filter_type: &str, raw_value: &str) -> ViewResult<Predicate> {
        let descriptor = self.check(field, filter_type)?;
        (descriptor.compile())(field, raw_value).ok_or_else(|| {
            ViewError::new(ViewErrorKind::InvalidFilterValue {
                filter_type: filter_type.to_string(),
                field_id: field.id().get(),
                value: raw_value.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{FieldId, FieldKind, TableId};
    use tabula_error::ErrorCategory;

    #[test]
    fn test_unknown_filter_type() {
        let registry = TypeRegistry::with_builtin();
        let field = Field::new(FieldId::from(1), TableId::from(1), "Name", FieldKind::Text);
        let err = FilterEvaluator::new(&registry)
            .compile(&field, "sounds_like", "x")
            .unwrap_err();
        assert!(matches!(err.kind(), ViewErrorKind::FilterNotSupported(_)));
    }

    #[test]
    fn test_incompatible_kind_is_validation() {
        let registry = TypeRegistry::with_builtin();
        let field = Field::new(FieldId::from(1), TableId::from(1), "Done", FieldKind::Boolean);
        let err = FilterEvaluator::new(&registry)
            .compile(&field, "contains", "x")
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
