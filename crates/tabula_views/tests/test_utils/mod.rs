//! Shared setup for view engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tabula_core::{
    Actor, CellValue, Field, FieldId, FieldKind, RowId, Table, TableId, UserId, View,
};
use tabula_error::ViewResult;
use tabula_interface::TableProvider;
use tabula_views::{InMemoryTables, NewView, TypeRegistry, ViewHandler, ViewsConfig};
use tokio::sync::oneshot;

/// A "Projects" table linking to a "Clients" table, plus an unrelated table.
pub struct Workspace {
    pub tables: InMemoryTables,
    pub handler: ViewHandler,
    pub actor: Actor,
    pub projects: TableId,
    pub name: FieldId,
    pub status: FieldId,
    pub budget: FieldId,
    pub done: FieldId,
    pub client: FieldId,
    pub clients: TableId,
    pub client_name: FieldId,
    pub acme: RowId,
    pub globex: RowId,
    pub initech: RowId,
    pub other: TableId,
    pub other_field: FieldId,
}

pub fn handler_over(tables: &InMemoryTables, config: ViewsConfig) -> ViewHandler {
    ViewHandler::new(
        Arc::new(TypeRegistry::with_builtin()),
        Arc::new(tables.clone()),
        Arc::new(tables.clone()),
        config,
    )
}

/// Table provider that can hold a single `get_field` call until released.
pub struct GatedTables {
    inner: InMemoryTables,
    gate: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
}

impl GatedTables {
    pub fn new(inner: InMemoryTables) -> Self {
        Self {
            inner,
            gate: Mutex::new(None),
        }
    }

    /// Hold the next `get_field` call. The first receiver fires once the
    /// call is waiting; sending on the returned sender lets it continue.
    pub fn arm(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some((entered_tx, release_rx));
        (entered_rx, release_tx)
    }
}

#[async_trait]
impl TableProvider for GatedTables {
    async fn get_table(&self, table_id: TableId) -> ViewResult<Table> {
        self.inner.get_table(table_id).await
    }

    async fn get_field(&self, field_id: FieldId) -> ViewResult<Field> {
        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            let _ = entered.send(());
            let _ = release.await;
        }
        self.inner.get_field(field_id).await
    }

    async fn list_fields(&self, table_id: TableId) -> ViewResult<Vec<Field>> {
        self.inner.list_fields(table_id).await
    }
}

pub async fn workspace() -> Workspace {
    workspace_with(ViewsConfig::default()).await
}

pub async fn workspace_with(config: ViewsConfig) -> Workspace {
    let tables = InMemoryTables::new();

    let clients = *tables.create_table("Clients").await.id();
    let client_name = *tables
        .create_field(clients, "Name", FieldKind::Text)
        .await
        .unwrap()
        .id();
    let mut client_rows = Vec::new();
    for name in ["Acme", "Globex", "Initech"] {
        let row = tables
            .insert_row(clients, [(client_name, CellValue::from(name))])
            .await
            .unwrap();
        client_rows.push(*row.id());
    }

    let projects = *tables.create_table("Projects").await.id();
    let name = *tables
        .create_field(projects, "Name", FieldKind::Text)
        .await
        .unwrap()
        .id();
    let status = *tables
        .create_field(projects, "Status", FieldKind::Text)
        .await
        .unwrap()
        .id();
    let budget = *tables
        .create_field(projects, "Budget", FieldKind::Number)
        .await
        .unwrap()
        .id();
    let done = *tables
        .create_field(projects, "Done", FieldKind::Boolean)
        .await
        .unwrap()
        .id();
    let client = *tables
        .create_link_field(projects, "Client", clients)
        .await
        .unwrap()
        .id();

    let other = *tables.create_table("Other").await.id();
    let other_field = *tables
        .create_field(other, "Name", FieldKind::Text)
        .await
        .unwrap()
        .id();

    let handler = handler_over(&tables, config);

    Workspace {
        tables,
        handler,
        actor: Actor::User(UserId::from(1)),
        projects,
        name,
        status,
        budget,
        done,
        client,
        clients,
        client_name,
        acme: client_rows[0],
        globex: client_rows[1],
        initech: client_rows[2],
        other,
        other_field,
    }
}

impl Workspace {
    /// Insert a project row.
    pub async fn project(&self, name: &str, status: &str, budget: f64, clients: &[RowId]) -> RowId {
        let row = self
            .tables
            .insert_row(
                self.projects,
                [
                    (self.name, CellValue::from(name)),
                    (self.status, CellValue::from(status)),
                    (self.budget, CellValue::from(budget)),
                    (self.client, CellValue::Links(clients.to_vec())),
                ],
            )
            .await
            .unwrap();
        *row.id()
    }

    /// Create a view of the projects table.
    pub async fn view(&self, view_type: &str, name: &str) -> View {
        self.handler
            .create_view(&self.actor, self.projects, view_type, NewView::named(name))
            .await
            .unwrap()
    }
}
