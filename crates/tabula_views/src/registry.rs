//! Capability descriptors for view types and filter types.
//!
//! The registry is assembled once at startup through [`TypeRegistryBuilder`]
//! and shared read-only afterwards.

use crate::{builtin_filter_types, builtin_view_types};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tabula_core::{Field, FieldKind, Predicate, View};
use tabula_error::{ConfigError, ViewError, ViewErrorKind, ViewResult};
use tracing::{debug, instrument};

/// Value kind accepted for an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrKind {
    /// JSON boolean
    Boolean,
    /// JSON integer within bounds, inclusive
    Integer {
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },
    /// JSON string up to a length
    Text {
        /// Longest accepted length in characters
        max_len: usize,
    },
    /// One of a fixed set of strings
    Choice(&'static [&'static str]),
}

impl AttrKind {
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (AttrKind::Boolean, Value::Bool(_)) => true,
            (AttrKind::Integer { min, max }, Value::Number(n)) => n
                .as_i64()
                .map(|i| (*min..=*max).contains(&i))
                .unwrap_or(false),
            (AttrKind::Text { max_len }, Value::String(s)) => s.chars().count() <= *max_len,
            (AttrKind::Choice(choices), Value::String(s)) => choices.contains(&s.as_str()),
            _ => false,
        }
    }
}

/// One attribute of a schema.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters, derive_new::new)]
pub struct AttrSpec {
    /// Attribute key
    key: &'static str,
    /// Accepted value kind
    kind: AttrKind,
    /// Value used when the attribute was never set
    default: Value,
}

/// Set of attributes a view type accepts in an attribute bag.
#[derive(Debug, Clone, PartialEq, Default, derive_getters::Getters)]
pub struct AttrSchema {
    specs: Vec<AttrSpec>,
}

impl AttrSchema {
    /// Schema from a list of specs.
    pub fn new(specs: Vec<AttrSpec>) -> Self {
        Self { specs }
    }

    /// Map of every attribute set to its default.
    pub fn defaults(&self) -> Map<String, Value> {
        self.specs
            .iter()
            .map(|spec| (spec.key.to_string(), spec.default.clone()))
            .collect()
    }

    /// Check a partial attribute bag against the schema.
    ///
    /// Returns a message naming the offending key on failure.
    pub fn validate(&self, attrs: &Map<String, Value>) -> Result<(), String> {
        for (key, value) in attrs {
            let spec = self
                .specs
                .iter()
                .find(|spec| spec.key == key)
                .ok_or_else(|| format!("unknown attribute '{}'", key))?;
            if !spec.kind.accepts(value) {
                return Err(format!(
                    "attribute '{}' does not accept {} (expected {:?})",
                    key, value, spec.kind
                ));
            }
        }
        Ok(())
    }
}

/// Adjusts per-field defaults, e.g. showing the primary field by default.
pub type FieldDefaultsFn = fn(&Field, &mut Map<String, Value>);

/// Shape of the per-(view, field) options of a view type.
#[derive(Debug, Clone, derive_getters::Getters, derive_new::new)]
pub struct FieldOptionsShape {
    /// Accepted attributes and their defaults
    schema: AttrSchema,
    /// Boolean attribute deciding visibility
    visible_key: &'static str,
    /// Value of `visible_key` that means visible
    visible_when: bool,
    /// Integer attribute ordering visible fields
    order_key: &'static str,
    /// Per-field default overrides
    #[new(default)]
    field_defaults: Option<FieldDefaultsFn>,
}

impl FieldOptionsShape {
    /// Attach a per-field default override.
    pub fn with_field_defaults(mut self, f: FieldDefaultsFn) -> Self {
        self.field_defaults = Some(f);
        self
    }

    /// Default attributes for a field that was never touched.
    pub fn defaults_for(&self, field: &Field) -> Map<String, Value> {
        let mut attrs = self.schema.defaults();
        if let Some(adjust) = self.field_defaults {
            adjust(field, &mut attrs);
        }
        attrs
    }

    /// Whether a field with these attributes is exposed by the view.
    pub fn is_visible(&self, attrs: &Map<String, Value>) -> bool {
        attrs
            .get(self.visible_key)
            .and_then(Value::as_bool)
            .map(|v| v == self.visible_when)
            .unwrap_or(false)
    }

    /// Position of a field among the visible ones.
    pub fn position(&self, attrs: &Map<String, Value>) -> i64 {
        attrs
            .get(self.order_key)
            .and_then(Value::as_i64)
            .unwrap_or(i64::MAX)
    }
}

/// Capability descriptor of a view type.
#[derive(Debug, Clone, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct ViewType {
    /// Registry tag, e.g. "grid"
    #[setters(skip)]
    #[getter(skip)]
    tag: &'static str,
    /// Views of this type accept filters
    can_filter: bool,
    /// Views of this type accept sorts
    can_sort: bool,
    /// Views of this type can be shared through a public slug
    can_share: bool,
    /// Public link row lookups only see rows linked from visible rows
    restrict_link_row_public_view_sharing: bool,
    /// Per-field options, `None` when the type has none
    #[setters(strip_option)]
    field_options: Option<FieldOptionsShape>,
    /// Type specific view attributes
    view_options: AttrSchema,
}

impl ViewType {
    /// Registry tag, e.g. "grid"
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Descriptor with every capability disabled.
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            can_filter: false,
            can_sort: false,
            can_share: false,
            restrict_link_row_public_view_sharing: false,
            field_options: None,
            view_options: AttrSchema::default(),
        }
    }

    /// Validate type specific view attributes.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` naming the offending attribute.
    pub fn validate_options(&self, options: &Map<String, Value>) -> ViewResult<()> {
        self.view_options.validate(options).map_err(|msg| {
            ViewError::new(ViewErrorKind::InvalidRequest(format!(
                "{} view: {}",
                self.tag, msg
            )))
        })
    }

    /// Field options shape or `ViewDoesNotSupportFieldOptions`.
    pub fn require_field_options(&self) -> ViewResult<&FieldOptionsShape> {
        self.field_options.as_ref().ok_or_else(|| {
            ViewError::new(ViewErrorKind::ViewDoesNotSupportFieldOptions(
                self.tag.to_string(),
            ))
        })
    }

    /// Fail with `ViewTypeUnsupported` unless filtering is allowed.
    pub fn require_filtering(&self) -> ViewResult<()> {
        self.require(self.can_filter, "filtering")
    }

    /// Fail with `ViewTypeUnsupported` unless sorting is allowed.
    pub fn require_sorting(&self) -> ViewResult<()> {
        self.require(self.can_sort, "sorting")
    }

    /// Fail with `CannotShareViewType` unless sharing is allowed.
    pub fn require_sharing(&self) -> ViewResult<()> {
        if self.can_share {
            Ok(())
        } else {
            Err(ViewError::new(ViewErrorKind::CannotShareViewType(
                self.tag.to_string(),
            )))
        }
    }

    #[track_caller]
    fn require(&self, flag: bool, capability: &str) -> ViewResult<()> {
        if flag {
            Ok(())
        } else {
            Err(ViewError::new(ViewErrorKind::ViewTypeUnsupported {
                view_type: self.tag.to_string(),
                capability: capability.to_string(),
            }))
        }
    }
}

/// Compiles a raw filter value into a predicate; `None` when the value
/// cannot be coerced for the field.
pub type CompileFn = fn(&Field, &str) -> Option<Predicate>;

/// Capability descriptor of a filter type.
#[derive(Debug, Clone, derive_getters::Getters, derive_new::new)]
pub struct FilterType {
    /// Registry tag, e.g. "equal"
    tag: &'static str,
    /// Field kinds the filter accepts
    compatible: Vec<FieldKind>,
    /// Predicate compilation
    compile: CompileFn,
}

impl FilterType {
    /// Whether the filter accepts fields of this kind.
    pub fn accepts(&self, kind: FieldKind) -> bool {
        self.compatible.contains(&kind)
    }
}

/// Lookup of view and filter type descriptors by tag.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    view_types: BTreeMap<&'static str, ViewType>,
    filter_types: BTreeMap<&'static str, FilterType>,
}

impl TypeRegistry {
    /// Start assembling a registry.
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Registry with the built-in view and filter types.
    pub fn with_builtin() -> Self {
        Self::builder()
            .with_builtin()
            .build()
    }

    /// View type by tag.
    ///
    /// # Errors
    ///
    /// `ViewTypeNotFound` for unknown tags.
    #[instrument(level = "trace", skip(self))]
    pub fn get_view_type(&self, tag: &str) -> ViewResult<&ViewType> {
        self.view_types
            .get(tag)
            .ok_or_else(|| ViewError::new(ViewErrorKind::ViewTypeNotFound(tag.to_string())))
    }

    /// View type of a stored view.
    pub fn get_view_type_by_instance(&self, view: &View) -> ViewResult<&ViewType> {
        self.get_view_type(view.view_type())
    }

    /// Filter type by tag.
    ///
    /// # Errors
    ///
    /// `FilterNotSupported` for unknown tags.
    pub fn get_filter_type(&self, tag: &str) -> ViewResult<&FilterType> {
        self.filter_types
            .get(tag)
            .ok_or_else(|| ViewError::new(ViewErrorKind::FilterNotSupported(tag.to_string())))
    }

    /// Every registered view type, ordered by tag.
    pub fn view_types(&self) -> impl Iterator<Item = &ViewType> {
        self.view_types.values()
    }

    /// Every registered filter type, ordered by tag.
    pub fn filter_types(&self) -> impl Iterator<Item = &FilterType> {
        self.filter_types.values()
    }
}

/// Collects descriptors before the registry is frozen.
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    registry: TypeRegistry,
    duplicates: Vec<&'static str>,
}

impl TypeRegistryBuilder {
    /// Register the built-in view and filter types.
    pub fn with_builtin(mut self) -> Self {
        for view_type in builtin_view_types() {
            self = self.register_view_type(view_type);
        }
        for filter_type in builtin_filter_types() {
            self = self.register_filter_type(filter_type);
        }
        self
    }

    /// Register a view type.
    pub fn register_view_type(mut self, view_type: ViewType) -> Self {
        debug!(tag = view_type.tag, "Registering view type");
        if let Some(previous) = self.registry.view_types.insert(view_type.tag, view_type) {
            self.duplicates.push(previous.tag);
        }
        self
    }

    /// Register a filter type.
    pub fn register_filter_type(mut self, filter_type: FilterType) -> Self {
        debug!(tag = filter_type.tag, "Registering filter type");
        if let Some(previous) = self
            .registry
            .filter_types
            .insert(filter_type.tag, filter_type)
        {
            self.duplicates.push(previous.tag);
        }
        self
    }

    /// Freeze the registry. Later registrations under a tag replace earlier ones.
    pub fn build(self) -> TypeRegistry {
        self.registry
    }

    /// Freeze the registry, rejecting tags registered twice.
    ///
    /// # Errors
    ///
    /// `ConfigError` listing the duplicated tags.
    pub fn try_build(self) -> Result<TypeRegistry, ConfigError> {
        if self.duplicates.is_empty() {
            Ok(self.registry)
        } else {
            Err(ConfigError::new(format!(
                "duplicate type registrations: {}",
                self.duplicates.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view_types::{FORM, GRID};

    #[test]
    fn test_builtin_lookup() {
        let registry = TypeRegistry::with_builtin();
        assert!(*registry.get_view_type(GRID).unwrap().can_filter());
        assert!(!*registry.get_view_type(FORM).unwrap().can_sort());
        assert!(registry.get_filter_type("contains").is_ok());

        let err = registry.get_view_type("kanban").unwrap_err();
        assert!(matches!(err.kind(), ViewErrorKind::ViewTypeNotFound(tag) if tag == "kanban"));
        let err = registry.get_filter_type("fuzzy").unwrap_err();
        assert!(matches!(err.kind(), ViewErrorKind::FilterNotSupported(_)));
    }

    #[test]
    fn test_capability_checks() {
        let bare = ViewType::new("bare");
        assert!(matches!(
            bare.require_filtering().unwrap_err().kind(),
            ViewErrorKind::ViewTypeUnsupported { capability, .. } if capability == "filtering"
        ));
        assert!(matches!(
            bare.require_sharing().unwrap_err().kind(),
            ViewErrorKind::CannotShareViewType(_)
        ));
        assert!(matches!(
            bare.require_field_options().unwrap_err().kind(),
            ViewErrorKind::ViewDoesNotSupportFieldOptions(_)
        ));

        let sortable = ViewType::new("list").with_can_sort(true);
        assert!(sortable.require_sorting().is_ok());
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = TypeRegistry::builder()
            .register_view_type(ViewType::new("list"))
            .register_view_type(ViewType::new("list").with_can_filter(true))
            .build();
        assert!(*registry.get_view_type("list").unwrap().can_filter());

        let err = TypeRegistry::builder()
            .with_builtin()
            .register_view_type(ViewType::new(GRID))
            .try_build()
            .unwrap_err();
        assert!(err.message.contains("grid"));
    }
}
