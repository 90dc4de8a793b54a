//! Row query execution.

use async_trait::async_trait;
use std::collections::BTreeSet;
use tabula_core::{FieldId, Row, RowId, RowQuery, TableId};
use tabula_error::ViewResult;

/// Executes composed row queries.
#[async_trait]
pub trait RowQueryEngine: Send + Sync {
    /// Rows matching the predicate and search, ordered by the query's keys.
    async fn execute(&self, query: &RowQuery) -> ViewResult<Vec<Row>>;

    /// Ids referenced through `link_field` by the rows matching `query`.
    ///
    /// Only the predicate of `query` matters; ordering is ignored.
    async fn column_link_ids(&self, query: &RowQuery, link_field: FieldId)
    -> ViewResult<BTreeSet<RowId>>;

    /// Number of rows stored in a table.
    async fn row_count(&self, table_id: TableId) -> ViewResult<usize>;
}
