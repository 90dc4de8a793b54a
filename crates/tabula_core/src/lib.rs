//! Core data types for the Tabula view engine.
//!
//! This crate holds the table/field/row model the engine reads, the view
//! entities it persists, and the row query model it composes.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod actor;
mod ids;
mod observability;
mod query;
mod row;
mod table;
mod view;

pub use actor::Actor;
pub use ids::{FieldId, FilterId, RowId, SortId, TableId, UserId, ViewId};
pub use observability::init_tracing;
pub use query::{Comparison, Condition, OrderKey, OrderTarget, Predicate, RowQuery};
pub use row::{CellValue, Row};
pub use table::{Field, FieldKind, Table};
pub use view::{
    FieldOptions, FilterConjunction, SortDirection, View, ViewFilter, ViewSort,
};
