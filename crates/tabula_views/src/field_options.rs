//! Lazily created per-(view, field) options.
//!
//! An absent entry means "type defaults". Entries only materialise when a
//! caller asks for them through [`FieldOptionsStore::get_or_create`] or
//! writes them through [`FieldOptionsStore::bulk_upsert`]; both are keyed
//! upserts, so racing first accesses resolve to one entry.

use crate::{FieldOptionsShape, ViewState};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tabula_core::{Field, FieldId, FieldOptions, ViewId};
use tabula_error::{ViewError, ViewErrorKind, ViewResult};
use tracing::debug;

/// Field options access for one view type shape.
#[derive(Debug, Clone, Copy, derive_new::new)]
pub struct FieldOptionsStore<'a> {
    shape: &'a FieldOptionsShape,
}

impl<'a> FieldOptionsStore<'a> {
    /// Options of a field, defaults when never touched. Never creates.
    pub fn get(&self, state: &ViewState, view_id: ViewId, field: &Field) -> FieldOptions {
        match state.field_options(view_id, *field.id()) {
            Some(stored) => self.with_defaults(stored, field),
            None => FieldOptions::new(view_id, *field.id(), self.shape.defaults_for(field)),
        }
    }

    /// Options of a field, persisting the defaults on first access.
    pub fn get_or_create(&self, state: &mut ViewState, view_id: ViewId, field: &Field) -> FieldOptions {
        let shape = self.shape;
        let entry = state.field_options_entry(view_id, *field.id(), || {
            debug!(%view_id, field_id = %field.id(), "Creating default field options");
            FieldOptions::new(view_id, *field.id(), shape.defaults_for(field))
        });
        entry.clone()
    }

    /// Validate every entry, then merge each one over the stored (or default)
    /// options.
    ///
    /// # Errors
    ///
    /// `InvalidFieldOptions` naming the first invalid entry; nothing is
    /// written in that case.
    pub fn bulk_upsert(
        &self,
        state: &mut ViewState,
        view_id: ViewId,
        entries: &[(Field, Map<String, Value>)],
    ) -> ViewResult<()> {
        for (field, attrs) in entries {
            self.validate(field, attrs)?;
        }
        let shape = self.shape;
        for (field, attrs) in entries {
            state
                .field_options_entry(view_id, *field.id(), || {
                    FieldOptions::new(view_id, *field.id(), shape.defaults_for(field))
                })
                .merge(attrs);
        }
        debug!(%view_id, entries = entries.len(), "Upserted field options");
        Ok(())
    }

    /// Options of every given field keyed by field id.
    pub fn all(&self, state: &ViewState, view_id: ViewId, fields: &[Field]) -> BTreeMap<FieldId, FieldOptions> {
        fields
            .iter()
            .map(|field| (*field.id(), self.get(state, view_id, field)))
            .collect()
    }

    /// Fields exposed by the view, in display order (position, then id).
    pub fn visible_in_order<'f>(
        &self,
        state: &ViewState,
        view_id: ViewId,
        fields: &'f [Field],
    ) -> Vec<&'f Field> {
        let mut visible: Vec<(i64, &Field)> = fields
            .iter()
            .filter(|field| !*field.trashed())
            .filter_map(|field| {
                let options = self.get(state, view_id, field);
                self.shape
                    .is_visible(options.attrs())
                    .then(|| (self.shape.position(options.attrs()), field))
            })
            .collect();
        visible.sort_by_key(|(position, field)| (*position, *field.id()));
        visible.into_iter().map(|(_, field)| field).collect()
    }

    fn validate(&self, field: &Field, attrs: &Map<String, Value>) -> ViewResult<()> {
        self.shape.schema().validate(attrs).map_err(|msg| {
            ViewError::new(ViewErrorKind::InvalidFieldOptions(format!(
                "field {}: {}",
                field.id(),
                msg
            )))
        })
    }

    /// Stored attributes completed with defaults added to the shape later.
    fn with_defaults(&self, stored: &FieldOptions, field: &Field) -> FieldOptions {
        let mut attrs = self.shape.defaults_for(field);
        for (key, value) in stored.attrs() {
            attrs.insert(key.clone(), value.clone());
        }
        FieldOptions::new(*stored.view_id(), *stored.field_id(), attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TypeRegistry, view_types::GRID};
    use serde_json::json;
    use tabula_core::{FieldKind, TableId};

    fn field(id: i64) -> Field {
        Field::new(FieldId::from(id), TableId::from(1), "F", FieldKind::Text)
    }

    #[test]
    fn test_get_does_not_create() {
        let registry = TypeRegistry::with_builtin();
        let shape = registry.get_view_type(GRID).unwrap().field_options().clone().unwrap();
        let store = FieldOptionsStore::new(&shape);
        let state = ViewState::default();
        let options = store.get(&state, ViewId::from(1), &field(1));
        assert_eq!(options.attr("width"), Some(&json!(200)));
        assert_eq!(state.field_options_count(ViewId::from(1)), 0);
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = TypeRegistry::with_builtin();
        let shape = registry.get_view_type(GRID).unwrap().field_options().clone().unwrap();
        let store = FieldOptionsStore::new(&shape);
        let mut state = ViewState::default();
        store.get_or_create(&mut state, ViewId::from(1), &field(1));
        store.get_or_create(&mut state, ViewId::from(1), &field(1));
        assert_eq!(state.field_options_count(ViewId::from(1)), 1);
    }

    #[test]
    fn test_bulk_upsert_rejects_unknown_key_without_writing() {
        let registry = TypeRegistry::with_builtin();
        let shape = registry.get_view_type(GRID).unwrap().field_options().clone().unwrap();
        let store = FieldOptionsStore::new(&shape);
        let mut state = ViewState::default();
        let good = json!({"width": 300}).as_object().cloned().unwrap();
        let bad = json!({"colour": "red"}).as_object().cloned().unwrap();
        let result = store.bulk_upsert(
            &mut state,
            ViewId::from(1),
            &[(field(1), good), (field(2), bad)],
        );
        assert!(result.is_err());
        assert_eq!(state.field_options_count(ViewId::from(1)), 0);
    }
}
