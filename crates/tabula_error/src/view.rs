//! View engine error types.

/// Broad classification of a [`ViewErrorKind`].
///
/// Callers map categories onto their own surface (HTTP status, CLI exit code)
/// without matching every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ErrorCategory {
    /// The addressed entity does not exist or is not accessible.
    #[display("not found")]
    NotFound,
    /// The view type lacks the requested capability.
    #[display("unsupported")]
    Unsupported,
    /// Input was rejected.
    #[display("validation")]
    Validation,
    /// Two entities that must share a table do not.
    #[display("invariant violation")]
    InvariantViolation,
    /// Storage or configuration failure.
    #[display("internal")]
    Internal,
}

/// View engine error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ViewErrorKind {
    /// Table does not exist
    #[display("Table {} does not exist", _0)]
    TableNotFound(i64),
    /// View does not exist, or is not reachable through the requested path
    #[display("View does not exist")]
    ViewNotFound,
    /// Filter does not exist
    #[display("View filter {} does not exist", _0)]
    FilterNotFound(i64),
    /// Sort does not exist
    #[display("View sort {} does not exist", _0)]
    SortNotFound(i64),
    /// Field does not exist or is not exposed by the view
    #[display("Field {} does not exist", _0)]
    FieldNotFound(i64),
    /// No view type registered under this tag
    #[display("View type '{}' does not exist", _0)]
    ViewTypeNotFound(String),
    /// No filter type registered under this tag
    #[display("Filter type '{}' is not supported", _0)]
    FilterNotSupported(String),
    /// The view type lacks a capability
    #[display("View type '{}' does not support {}", view_type, capability)]
    ViewTypeUnsupported {
        /// View type tag
        view_type: String,
        /// Missing capability, e.g. "filtering"
        capability: String,
    },
    /// The view type has no field options shape
    #[display("View type '{}' does not support field options", _0)]
    ViewDoesNotSupportFieldOptions(String),
    /// Filter type does not accept the field's type
    #[display(
        "Filter type '{}' is not compatible with field {} of type '{}'",
        filter_type,
        field_id,
        field_kind
    )]
    FilterTypeUnsupportedForField {
        /// Filter type tag
        filter_type: String,
        /// Offending field
        field_id: i64,
        /// Field type category
        field_kind: String,
    },
    /// Filter value could not be coerced for the field
    #[display(
        "Value '{}' is not valid for filter type '{}' on field {}",
        value,
        filter_type,
        field_id
    )]
    InvalidFilterValue {
        /// Filter type tag
        filter_type: String,
        /// Target field
        field_id: i64,
        /// Raw value that failed to coerce
        value: String,
    },
    /// Field type cannot be sorted
    #[display("Field {} of type '{}' does not support sorting", field_id, field_kind)]
    SortFieldNotSupported {
        /// Offending field
        field_id: i64,
        /// Field type category
        field_kind: String,
    },
    /// A sort on this field already exists for the view
    #[display("A sort on field {} already exists for view {}", field_id, view_id)]
    SortFieldAlreadyExists {
        /// View carrying the sort
        view_id: i64,
        /// Duplicated field
        field_id: i64,
    },
    /// The view type cannot be shared publicly
    #[display("View type '{}' cannot be shared", _0)]
    CannotShareViewType(String),
    /// Request attributes are invalid
    #[display("Invalid request: {}", _0)]
    InvalidRequest(String),
    /// Field options payload is invalid
    #[display("Invalid field options: {}", _0)]
    InvalidFieldOptions(String),
    /// Field belongs to another table than the view
    #[display("Field {} does not belong to table {}", field_id, table_id)]
    FieldNotInTable {
        /// Offending field
        field_id: i64,
        /// Table of the view
        table_id: i64,
    },
    /// View belongs to another table
    #[display("View {} does not belong to table {}", view_id, table_id)]
    ViewNotInTable {
        /// Offending view
        view_id: i64,
        /// Requested table
        table_id: i64,
    },
    /// Field options reference a field of another table
    #[display("Field {} is not related to the view's table", _0)]
    UnrelatedField(i64),
    /// Storage engine failure
    #[display("Storage error: {}", _0)]
    Storage(String),
    /// Configuration failure
    #[display("Configuration error: {}", _0)]
    Config(String),
}

impl ViewErrorKind {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ViewErrorKind::TableNotFound(_)
            | ViewErrorKind::ViewNotFound
            | ViewErrorKind::FilterNotFound(_)
            | ViewErrorKind::SortNotFound(_)
            | ViewErrorKind::FieldNotFound(_)
            | ViewErrorKind::ViewTypeNotFound(_) => ErrorCategory::NotFound,
            ViewErrorKind::FilterNotSupported(_)
            | ViewErrorKind::ViewTypeUnsupported { .. }
            | ViewErrorKind::ViewDoesNotSupportFieldOptions(_) => ErrorCategory::Unsupported,
            ViewErrorKind::FilterTypeUnsupportedForField { .. }
            | ViewErrorKind::InvalidFilterValue { .. }
            | ViewErrorKind::SortFieldNotSupported { .. }
            | ViewErrorKind::SortFieldAlreadyExists { .. }
            | ViewErrorKind::CannotShareViewType(_)
            | ViewErrorKind::InvalidRequest(_)
            | ViewErrorKind::InvalidFieldOptions(_) => ErrorCategory::Validation,
            ViewErrorKind::FieldNotInTable { .. }
            | ViewErrorKind::ViewNotInTable { .. }
            | ViewErrorKind::UnrelatedField(_) => ErrorCategory::InvariantViolation,
            ViewErrorKind::Storage(_) | ViewErrorKind::Config(_) => ErrorCategory::Internal,
        }
    }
}

/// View engine error with location tracking.
///
/// # Examples
///
/// ```
/// use tabula_error::{ErrorCategory, ViewError, ViewErrorKind};
///
/// let err = ViewError::new(ViewErrorKind::FilterNotFound(7));
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert!(format!("{}", err).contains("does not exist"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("View Error: {} at line {} in {}", kind, line, file)]
pub struct ViewError {
    kind: ViewErrorKind,
    line: u32,
    file: &'static str,
}

impl ViewError {
    /// Create a new view error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ViewErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ViewErrorKind {
        &self.kind
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Line number where the error was created.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// File where the error was created.
    pub fn file(&self) -> &'static str {
        self.file
    }
}

impl<T> From<T> for ViewError
where
    T: Into<ViewErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

impl From<crate::ConfigError> for ViewErrorKind {
    fn from(err: crate::ConfigError) -> Self {
        ViewErrorKind::Config(err.message)
    }
}

/// Result type for view engine operations.
pub type ViewResult<T> = std::result::Result<T, ViewError>;
