//! View configuration and query composition for Tabula tables.
//!
//! A view is a named, typed configuration over one table's rows: filters,
//! sorts, per-field display options and an optional public slug. This crate
//! owns the lifecycle of those entities and composes them into row queries.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tabula_core::{Actor, FieldKind, UserId};
//! use tabula_views::{InMemoryTables, NewView, TypeRegistry, ViewHandler, ViewsConfig};
//!
//! # async fn example() -> tabula_error::ViewResult<()> {
//! let tables = InMemoryTables::new();
//! let projects = tables.create_table("Projects").await;
//! let name = tables.create_field(*projects.id(), "Name", FieldKind::Text).await?;
//!
//! let handler = ViewHandler::new(
//!     Arc::new(TypeRegistry::with_builtin()),
//!     Arc::new(tables.clone()),
//!     Arc::new(tables),
//!     ViewsConfig::default(),
//! );
//! let actor = Actor::User(UserId::from(1));
//! let view = handler
//!     .create_view(&actor, *projects.id(), "grid", NewView::named("All projects"))
//!     .await?;
//! handler
//!     .create_filter(&actor, *view.id(), *name.id(), "contains", "roof")
//!     .await?;
//! let rows = handler.query_view_rows(*view.id()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod events;
mod field_options;
mod filter_evaluator;
mod filter_types;
mod fixture;
mod handler;
mod memory;
mod public;
mod registry;
mod requests;
mod slug;
mod sort_composer;
mod store;
pub mod view_types;

pub use config::{ViewsConfig, ViewsConfigBuilder};
pub use events::{ViewEvent, ViewEventKind};
pub use field_options::FieldOptionsStore;
pub use filter_evaluator::FilterEvaluator;
pub use filter_types::builtin_filter_types;
pub use fixture::{
    FieldFixture, FilterFixture, Fixture, InstalledFixture, SortFixture, TableFixture, ViewFixture,
};
pub use handler::{ViewHandler, ensure_field_in_table};
pub use memory::InMemoryTables;
pub use public::{LinkRowPage, LinkRowValue, PublicAccessGate};
pub use registry::{
    AttrKind, AttrSchema, AttrSpec, CompileFn, FieldDefaultsFn, FieldOptionsShape, FilterType,
    TypeRegistry, TypeRegistryBuilder, ViewType,
};
pub use requests::{
    FilterUpdate, FilterUpdateBuilder, LookupRequest, LookupRequestBuilder, NewView,
    NewViewBuilder, SortUpdate, SortUpdateBuilder, ViewIncludes, ViewUpdate, ViewUpdateBuilder,
    ViewWithRelations,
};
pub use slug::generate_slug;
pub use sort_composer::SortComposer;
pub use store::{ViewState, ViewStore};
pub use view_types::builtin_view_types;
