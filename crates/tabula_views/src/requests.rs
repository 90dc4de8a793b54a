//! Attribute payloads accepted by the handler.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tabula_core::{FieldId, FilterConjunction, SortDirection, View, ViewFilter, ViewSort};

/// Attributes of a new view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), default)]
pub struct NewView {
    /// Display name, required
    #[builder(setter(into))]
    pub name: String,
    /// Filter combination, AND when unset
    pub filter_type: Option<FilterConjunction>,
    /// Keep filters stored but unapplied
    pub filters_disabled: Option<bool>,
    /// Share publicly right away
    pub public: Option<bool>,
    /// Type specific attributes
    #[builder(setter(into))]
    pub options: Map<String, Value>,
}

impl NewView {
    /// View with a name and every other attribute defaulted.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update of a view. Unset attributes stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), default)]
pub struct ViewUpdate {
    /// New display name
    pub name: Option<String>,
    /// Must equal the current type when given
    pub view_type: Option<String>,
    /// New filter combination
    pub filter_type: Option<FilterConjunction>,
    /// Enable or disable stored filters
    pub filters_disabled: Option<bool>,
    /// Share (`true`) or stop sharing (`false`)
    pub public: Option<bool>,
    /// Type specific attributes merged over the current ones
    pub options: Option<Map<String, Value>>,
}

/// Partial update of a filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), default)]
pub struct FilterUpdate {
    /// New target field
    pub field_id: Option<FieldId>,
    /// New filter type tag
    pub filter_type: Option<String>,
    /// New raw value
    pub value: Option<String>,
}

/// Partial update of a sort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), default)]
pub struct SortUpdate {
    /// New target field
    pub field_id: Option<FieldId>,
    /// New direction
    pub direction: Option<SortDirection>,
}

/// Extra relations embedded when listing views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewIncludes {
    /// Embed each view's filters
    pub filters: bool,
    /// Embed each view's sorts
    pub sortings: bool,
}

/// A view with optionally embedded filters and sorts.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters, derive_new::new)]
pub struct ViewWithRelations {
    view: View,
    filters: Option<Vec<ViewFilter>>,
    sortings: Option<Vec<ViewSort>>,
}

/// Parameters of a public link row lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(setter(into, strip_option), default)]
pub struct LookupRequest {
    /// Free-text search over the target table
    pub search: Option<String>,
    /// 1-based page, first page when unset
    pub page: Option<usize>,
    /// Page size, clamped to the configured limit
    pub size: Option<usize>,
}
