//! Trait definitions for the collaborators of the Tabula view engine.
//!
//! The view engine never touches row storage directly. It reads table and
//! field metadata through [`TableProvider`] and hands composed queries to a
//! [`RowQueryEngine`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod query_engine;
mod table_provider;

pub use query_engine::RowQueryEngine;
pub use table_provider::TableProvider;
