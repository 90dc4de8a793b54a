//! Table and field metadata provider.

use async_trait::async_trait;
use tabula_core::{Field, FieldId, Table, TableId};
use tabula_error::ViewResult;

/// Read access to the table/field model owned by the storage layer.
#[async_trait]
pub trait TableProvider: Send + Sync {
    /// Look up a table.
    ///
    /// # Errors
    ///
    /// `TableNotFound` when the table does not exist.
    async fn get_table(&self, table_id: TableId) -> ViewResult<Table>;

    /// Look up a field, trashed fields included.
    ///
    /// # Errors
    ///
    /// `FieldNotFound` when the field does not exist.
    async fn get_field(&self, field_id: FieldId) -> ViewResult<Field>;

    /// Every field of a table, trashed fields included, ordered by id.
    async fn list_fields(&self, table_id: TableId) -> ViewResult<Vec<Field>>;
}
