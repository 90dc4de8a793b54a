//! Persisted view entities.

use crate::{FieldId, FilterId, SortId, TableId, ViewId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the filters of a view are combined.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum FilterConjunction {
    /// Every filter must match
    #[default]
    And,
    /// At least one filter must match
    Or,
}

/// Direction of a sort.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    #[strum(serialize = "ASC")]
    #[serde(rename = "ASC")]
    Ascending,
    /// Largest first
    #[strum(serialize = "DESC")]
    #[serde(rename = "DESC")]
    Descending,
}

/// A named, typed configuration over one table's rows.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    derive_new::new,
)]
#[setters(prefix = "set_", borrow_self)]
pub struct View {
    #[setters(skip)]
    id: ViewId,
    #[setters(skip)]
    table_id: TableId,
    /// Registered view type tag, immutable after creation
    #[setters(skip)]
    #[new(into)]
    view_type: String,
    #[new(into)]
    name: String,
    /// Position among the table's views, ties broken by id
    order: i64,
    /// Public sharing token, `None` when not shared
    #[new(default)]
    slug: Option<String>,
    #[new(default)]
    filter_type: FilterConjunction,
    /// Stored filters are kept but not applied
    #[new(default)]
    filters_disabled: bool,
    /// Type specific attributes
    #[new(default)]
    options: Map<String, Value>,
}

impl View {
    /// Whether the view currently has a public slug.
    pub fn is_public(&self) -> bool {
        self.slug.is_some()
    }
}

/// A per-field predicate narrowing which rows a view returns.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    derive_new::new,
)]
#[setters(prefix = "set_", borrow_self)]
pub struct ViewFilter {
    #[setters(skip)]
    id: FilterId,
    #[setters(skip)]
    view_id: ViewId,
    field_id: FieldId,
    #[new(into)]
    filter_type: String,
    /// Raw comparison value, interpreted by the filter type
    #[new(into)]
    value: String,
}

/// A per-field ordering key of a view.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    derive_new::new,
)]
#[setters(prefix = "set_", borrow_self)]
pub struct ViewSort {
    /// Monotonic id; creation order equals id order
    #[setters(skip)]
    id: SortId,
    #[setters(skip)]
    view_id: ViewId,
    field_id: FieldId,
    direction: SortDirection,
}

/// Per-(view, field) display attributes.
///
/// The attribute shape is owned by the view type.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_new::new,
)]
pub struct FieldOptions {
    view_id: ViewId,
    field_id: FieldId,
    attrs: Map<String, Value>,
}

impl FieldOptions {
    /// Merge `patch` over the current attributes.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.attrs.insert(key.clone(), value.clone());
        }
    }

    /// Attribute lookup.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }
}
