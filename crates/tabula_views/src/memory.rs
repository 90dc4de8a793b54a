//! In-memory table model and row engine.
//!
//! Backs the CLI, fixtures and tests. Row storage is owned here; the view
//! engine only reads it through [`TableProvider`] and [`RowQueryEngine`].

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tabula_core::{
    CellValue, Field, FieldId, FieldKind, Row, RowId, RowQuery, Table, TableId,
};
use tabula_error::{ViewError, ViewErrorKind, ViewResult};
use tabula_interface::{RowQueryEngine, TableProvider};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct TablesState {
    tables: BTreeMap<TableId, Table>,
    fields: BTreeMap<FieldId, Field>,
    rows: BTreeMap<TableId, BTreeMap<RowId, Row>>,
    last_table_id: i64,
    last_field_id: i64,
    last_row_id: i64,
}

impl TablesState {
    fn table(&self, table_id: TableId) -> ViewResult<&Table> {
        self.tables
            .get(&table_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::TableNotFound(table_id.get())))
    }

    fn field_mut(&mut self, field_id: FieldId) -> ViewResult<&mut Field> {
        self.fields
            .get_mut(&field_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::FieldNotFound(field_id.get())))
    }

    fn rows_of(&self, table_id: TableId) -> ViewResult<impl Iterator<Item = &Row>> {
        self.table(table_id)?;
        Ok(self.rows.get(&table_id).into_iter().flat_map(|rows| rows.values()))
    }

    /// Live fields of a table whose text participates in search.
    fn search_fields(&self, table_id: TableId) -> Vec<FieldId> {
        self.fields
            .values()
            .filter(|f| *f.table_id() == table_id && !*f.trashed() && f.kind().is_searchable())
            .map(|f| *f.id())
            .collect()
    }

    /// Store a new field. The first field of a table becomes its primary.
    fn insert_field(&mut self, table_id: TableId, build: impl FnOnce(FieldId) -> Field) -> Field {
        let first = !self.fields.values().any(|f| *f.table_id() == table_id);
        self.last_field_id += 1;
        let field = build(FieldId::from(self.last_field_id)).with_primary(first);
        self.fields.insert(*field.id(), field.clone());
        debug!(field_id = %field.id(), %table_id, primary = first, "Field created");
        field
    }
}

fn matches_search(row: &Row, term: &str, fields: &[FieldId]) -> bool {
    let term = term.trim().to_lowercase();
    if row.id().to_string() == term {
        return true;
    }
    fields.iter().any(|field_id| {
        row.cell(*field_id)
            .as_search_text()
            .to_lowercase()
            .contains(&term)
    })
}

/// Tables, fields and rows held in memory.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTables {
    inner: Arc<RwLock<TablesState>>,
}

impl InMemoryTables {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table.
    #[instrument(skip(self, name))]
    pub async fn create_table(&self, name: impl Into<String>) -> Table {
        let mut state = self.inner.write().await;
        state.last_table_id += 1;
        let table = Table::new(TableId::from(state.last_table_id), name);
        state.tables.insert(*table.id(), table.clone());
        debug!(table_id = %table.id(), "Table created");
        table
    }

    /// Create a field. The first field of a table becomes its primary field.
    ///
    /// # Errors
    ///
    /// `TableNotFound` if the table does not exist; `InvalidRequest` for link
    /// row kinds, which need [`InMemoryTables::create_link_field`].
    #[instrument(skip(self, name))]
    pub async fn create_field(
        &self,
        table_id: TableId,
        name: impl Into<String>,
        kind: FieldKind,
    ) -> ViewResult<Field> {
        if kind == FieldKind::LinkRow {
            return Err(ViewError::new(ViewErrorKind::InvalidRequest(
                "link row fields need a target table".to_string(),
            )));
        }
        let mut state = self.inner.write().await;
        state.table(table_id)?;
        let name = name.into();
        Ok(state.insert_field(table_id, |id| Field::new(id, table_id, name, kind)))
    }

    /// Create a link row field pointing at `target`.
    #[instrument(skip(self, name))]
    pub async fn create_link_field(
        &self,
        table_id: TableId,
        name: impl Into<String>,
        target: TableId,
    ) -> ViewResult<Field> {
        let mut state = self.inner.write().await;
        state.table(table_id)?;
        state.table(target)?;
        let name = name.into();
        Ok(state.insert_field(table_id, |id| {
            Field::new(id, table_id, name, FieldKind::LinkRow).with_link_table(target)
        }))
    }

    /// Insert a row with the given cells.
    ///
    /// # Errors
    ///
    /// `TableNotFound`, or `FieldNotInTable` when a cell targets a field of
    /// another table.
    pub async fn insert_row(
        &self,
        table_id: TableId,
        cells: impl IntoIterator<Item = (FieldId, CellValue)>,
    ) -> ViewResult<Row> {
        let mut state = self.inner.write().await;
        state.table(table_id)?;
        state.last_row_id += 1;
        let mut row = Row::new(RowId::from(state.last_row_id));
        for (field_id, value) in cells {
            let belongs = state
                .fields
                .get(&field_id)
                .map(|f| *f.table_id() == table_id)
                .unwrap_or(false);
            if !belongs {
                return Err(ViewError::new(ViewErrorKind::FieldNotInTable {
                    field_id: field_id.get(),
                    table_id: table_id.get(),
                }));
            }
            row = row.with_cell(field_id, value);
        }
        state
            .rows
            .entry(table_id)
            .or_default()
            .insert(*row.id(), row.clone());
        Ok(row)
    }

    /// Move a field to the trash. Views keep their references to it.
    pub async fn trash_field(&self, field_id: FieldId) -> ViewResult<Field> {
        let mut state = self.inner.write().await;
        let field = state.field_mut(field_id)?;
        *field = field.clone().with_trashed(true);
        debug!(%field_id, "Field trashed");
        Ok(field.clone())
    }

    /// Restore a trashed field.
    pub async fn restore_field(&self, field_id: FieldId) -> ViewResult<Field> {
        let mut state = self.inner.write().await;
        let field = state.field_mut(field_id)?;
        *field = field.clone().with_trashed(false);
        debug!(%field_id, "Field restored");
        Ok(field.clone())
    }

    /// Permanently delete a field and its cells.
    ///
    /// View references are cleaned up separately through
    /// `ViewHandler::on_field_deleted`.
    pub async fn delete_field(&self, field_id: FieldId) -> ViewResult<Field> {
        let mut state = self.inner.write().await;
        let field = state
            .fields
            .remove(&field_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::FieldNotFound(field_id.get())))?;
        if let Some(rows) = state.rows.get_mut(field.table_id()) {
            for row in rows.values_mut() {
                row.remove_cell(field_id);
            }
        }
        debug!(%field_id, "Field deleted");
        Ok(field)
    }
}

#[async_trait]
impl TableProvider for InMemoryTables {
    async fn get_table(&self, table_id: TableId) -> ViewResult<Table> {
        self.inner.read().await.table(table_id).cloned()
    }

    async fn get_field(&self, field_id: FieldId) -> ViewResult<Field> {
        self.inner
            .read()
            .await
            .fields
            .get(&field_id)
            .cloned()
            .ok_or_else(|| ViewError::new(ViewErrorKind::FieldNotFound(field_id.get())))
    }

    async fn list_fields(&self, table_id: TableId) -> ViewResult<Vec<Field>> {
        let state = self.inner.read().await;
        state.table(table_id)?;
        Ok(state
            .fields
            .values()
            .filter(|f| *f.table_id() == table_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RowQueryEngine for InMemoryTables {
    #[instrument(level = "debug", skip(self, query), fields(table_id = %query.table_id()))]
    async fn execute(&self, query: &RowQuery) -> ViewResult<Vec<Row>> {
        let state = self.inner.read().await;
        let search_fields = state.search_fields(*query.table_id());
        let mut rows: Vec<Row> = state
            .rows_of(*query.table_id())?
            .filter(|row| query.predicate().matches(row))
            .filter(|row| match query.search() {
                Some(term) => matches_search(row, term, &search_fields),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| query.compare_rows(a, b));
        debug!(count = rows.len(), "Executed row query");
        Ok(rows)
    }

    async fn column_link_ids(
        &self,
        query: &RowQuery,
        link_field: FieldId,
    ) -> ViewResult<BTreeSet<RowId>> {
        let state = self.inner.read().await;
        let ids = state
            .rows_of(*query.table_id())?
            .filter(|row| query.predicate().matches(row))
            .flat_map(|row| match row.cell(link_field) {
                CellValue::Links(ids) => ids.clone(),
                _ => Vec::new(),
            })
            .collect();
        Ok(ids)
    }

    async fn row_count(&self, table_id: TableId) -> ViewResult<usize> {
        Ok(self.inner.read().await.rows_of(table_id)?.count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{Comparison, Condition, OrderKey, OrderTarget, Predicate, SortDirection};

    #[tokio::test]
    async fn test_first_field_is_primary() {
        let tables = InMemoryTables::new();
        let table = tables.create_table("Projects").await;
        let name = tables
            .create_field(*table.id(), "Name", FieldKind::Text)
            .await
            .unwrap();
        let budget = tables
            .create_field(*table.id(), "Budget", FieldKind::Number)
            .await
            .unwrap();
        assert!(*name.primary());
        assert!(!*budget.primary());
    }

    #[tokio::test]
    async fn test_execute_filters_searches_and_orders() {
        let tables = InMemoryTables::new();
        let table = tables.create_table("Projects").await;
        let name = tables
            .create_field(*table.id(), "Name", FieldKind::Text)
            .await
            .unwrap();
        for value in ["beta", "alpha", "gamma", "alphabet"] {
            tables
                .insert_row(*table.id(), [(*name.id(), CellValue::from(value))])
                .await
                .unwrap();
        }
        let query = RowQuery::table(*table.id())
            .and_where(Predicate::Condition(Condition::new(
                *name.id(),
                Comparison::NotEqual,
                CellValue::from("gamma"),
            )))
            .with_search(Some("ALPHA".to_string()))
            .order_by(vec![OrderKey::new(
                OrderTarget::Field(*name.id()),
                SortDirection::Descending,
            )]);
        let rows = tables.execute(&query).await.unwrap();
        let names: Vec<String> = rows
            .iter()
            .map(|r| r.cell(*name.id()).as_search_text())
            .collect();
        assert_eq!(names, vec!["alphabet", "alpha"]);
    }

    #[tokio::test]
    async fn test_search_ignores_trashed_fields() {
        let tables = InMemoryTables::new();
        let table = tables.create_table("Projects").await;
        let name = tables
            .create_field(*table.id(), "Name", FieldKind::Text)
            .await
            .unwrap();
        let notes = tables
            .create_field(*table.id(), "Notes", FieldKind::LongText)
            .await
            .unwrap();
        tables
            .insert_row(
                *table.id(),
                [
                    (*name.id(), CellValue::from("Roof")),
                    (*notes.id(), CellValue::from("needle")),
                ],
            )
            .await
            .unwrap();
        tables.trash_field(*notes.id()).await.unwrap();
        let query = RowQuery::table(*table.id()).with_search(Some("needle".to_string()));
        assert!(tables.execute(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_row_rejects_foreign_field() {
        let tables = InMemoryTables::new();
        let a = tables.create_table("A").await;
        let b = tables.create_table("B").await;
        let field = tables
            .create_field(*b.id(), "Name", FieldKind::Text)
            .await
            .unwrap();
        let result = tables
            .insert_row(*a.id(), [(*field.id(), CellValue::from("x"))])
            .await;
        assert!(matches!(
            result.unwrap_err().kind(),
            ViewErrorKind::FieldNotInTable { .. }
        ));
    }
}
