//! Change notifications published after each committed mutation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabula_core::{Actor, FieldId, FieldOptions, TableId, View, ViewFilter, ViewId, ViewSort};

/// What changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEventKind {
    /// A view was created
    ViewCreated {
        /// The new view
        view: View,
    },
    /// A view's attributes changed
    ViewUpdated {
        /// The view after the change
        view: View,
    },
    /// A view and its dependents were removed
    ViewDeleted {
        /// Removed view
        view_id: ViewId,
        /// Its table
        table_id: TableId,
    },
    /// Positions of a table's views changed
    ViewsReordered {
        /// Reordered table
        table_id: TableId,
        /// Ids in the requested order
        order: Vec<ViewId>,
    },
    /// A filter was created
    FilterCreated {
        /// The new filter
        filter: ViewFilter,
    },
    /// A filter changed
    FilterUpdated {
        /// The filter after the change
        filter: ViewFilter,
    },
    /// A filter was removed
    FilterDeleted {
        /// The removed filter
        filter: ViewFilter,
    },
    /// A sort was created
    SortCreated {
        /// The new sort
        sort: ViewSort,
    },
    /// A sort changed
    SortUpdated {
        /// The sort after the change
        sort: ViewSort,
    },
    /// A sort was removed
    SortDeleted {
        /// The removed sort
        sort: ViewSort,
    },
    /// Field options of a view changed
    FieldOptionsUpdated {
        /// Affected view
        view_id: ViewId,
        /// Options of the touched fields after the change
        field_options: Vec<FieldOptions>,
    },
    /// The public slug of a view was replaced
    SlugRotated {
        /// The view with its new slug
        view: View,
    },
    /// A deleted field's filters, sorts and options were dropped
    FieldReferencesRemoved {
        /// Deleted field
        field_id: FieldId,
        /// Number of removed entries
        removed: usize,
    },
}

/// A committed change with its author.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters)]
pub struct ViewEvent {
    actor: Actor,
    at: DateTime<Utc>,
    kind: ViewEventKind,
}

impl ViewEvent {
    /// Stamp a change with the current time.
    pub fn now(actor: Actor, kind: ViewEventKind) -> Self {
        Self {
            actor,
            at: Utc::now(),
            kind,
        }
    }
}
