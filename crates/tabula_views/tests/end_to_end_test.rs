//! Whole-flow tests: query composition, field deletion and change events.

mod test_utils;

use std::collections::BTreeMap;
use serde_json::json;
use tabula_core::{CellValue, FieldKind, RowQuery, SortDirection};
use tabula_interface::RowQueryEngine;
use tabula_views::{InMemoryTables, NewView, ViewEventKind, ViewsConfig};
use test_utils::{handler_over, workspace};

#[tokio::test]
async fn test_filter_then_sort_end_to_end() {
    let tables = InMemoryTables::new();
    let table = *tables.create_table("Tasks").await.id();
    let name = *tables
        .create_field(table, "Name", FieldKind::Text)
        .await
        .unwrap()
        .id();
    let status = *tables
        .create_field(table, "Status", FieldKind::Text)
        .await
        .unwrap()
        .id();
    for (n, s) in [("B", "Done"), ("A", "Done"), ("C", "Open")] {
        tables
            .insert_row(table, [(name, CellValue::from(n)), (status, CellValue::from(s))])
            .await
            .unwrap();
    }

    let handler = handler_over(&tables, ViewsConfig::default());
    let actor = tabula_core::Actor::User(tabula_core::UserId::from(3));
    let view = handler
        .create_view(&actor, table, "grid", NewView::named("Done"))
        .await
        .unwrap();
    handler
        .create_filter(&actor, *view.id(), status, "equal", "Done")
        .await
        .unwrap();
    handler
        .create_sort(&actor, *view.id(), name, SortDirection::Ascending)
        .await
        .unwrap();

    let query = handler
        .apply_filters(&view, RowQuery::table(table))
        .await
        .unwrap();
    let query = handler.apply_sorts(&view, query).await.unwrap();
    let rows: Vec<(String, String)> = tables
        .execute(&query)
        .await
        .unwrap()
        .iter()
        .map(|row| {
            (
                row.cell(name).as_search_text(),
                row.cell(status).as_search_text(),
            )
        })
        .collect();

    assert_eq!(
        rows,
        vec![
            ("A".to_string(), "Done".to_string()),
            ("B".to_string(), "Done".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_field_deletion_removes_references() {
    let ws = workspace().await;
    let view = ws.view("grid", "Grid").await;
    ws.handler
        .create_filter(&ws.actor, *view.id(), ws.status, "equal", "Done")
        .await
        .unwrap();
    ws.handler
        .create_filter(&ws.actor, *view.id(), ws.name, "contains", "o")
        .await
        .unwrap();
    ws.handler
        .create_sort(&ws.actor, *view.id(), ws.status, SortDirection::Ascending)
        .await
        .unwrap();
    let mut update = BTreeMap::new();
    update.insert(ws.status, json!({"width": 90}).as_object().cloned().unwrap());
    ws.handler
        .update_field_options(&ws.actor, *view.id(), update)
        .await
        .unwrap();

    ws.tables.delete_field(ws.status).await.unwrap();
    let removed = ws
        .handler
        .on_field_deleted(&ws.actor, ws.status)
        .await
        .unwrap();

    assert_eq!(removed, 3);
    let filters = ws.handler.list_filters(*view.id()).await.unwrap();
    assert_eq!(filters.len(), 1);
    assert_eq!(*filters[0].field_id(), ws.name);
    assert!(ws.handler.list_sorts(*view.id()).await.unwrap().is_empty());
    assert!(
        !ws.handler
            .get_field_options(*view.id())
            .await
            .unwrap()
            .contains_key(&ws.status)
    );

    // Nothing left to remove the second time.
    assert_eq!(
        ws.handler
            .on_field_deleted(&ws.actor, ws.status)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_events_follow_commits() {
    let ws = workspace().await;
    let mut events = ws.handler.subscribe();

    let view = ws.view("grid", "Grid").await;
    let filter = ws
        .handler
        .create_filter(&ws.actor, *view.id(), ws.name, "equal", "x")
        .await
        .unwrap();
    ws.handler
        .create_sort(&ws.actor, *view.id(), ws.name, SortDirection::Ascending)
        .await
        .unwrap();
    // Rejected: publishes nothing.
    ws.handler
        .create_sort(&ws.actor, *view.id(), ws.name, SortDirection::Ascending)
        .await
        .unwrap_err();
    ws.handler.delete_view(&ws.actor, *view.id()).await.unwrap();

    let created = events.recv().await.unwrap();
    assert_eq!(*created.actor(), ws.actor);
    assert!(matches!(created.kind(), ViewEventKind::ViewCreated { view: v } if v.id() == view.id()));

    let filter_created = events.recv().await.unwrap();
    assert!(matches!(
        filter_created.kind(),
        ViewEventKind::FilterCreated { filter: f } if f == &filter
    ));

    assert!(matches!(
        events.recv().await.unwrap().kind(),
        ViewEventKind::SortCreated { .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap().kind(),
        ViewEventKind::ViewDeleted { view_id, table_id }
            if view_id == view.id() && *table_id == ws.projects
    ));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_query_view_rows_on_gallery() {
    let ws = workspace().await;
    ws.project("Roof", "Done", 5.0, &[]).await;
    ws.project("Door", "Done", 15.0, &[]).await;
    let gallery = ws.view("gallery", "Cards").await;
    ws.handler
        .create_sort(&ws.actor, *gallery.id(), ws.budget, SortDirection::Descending)
        .await
        .unwrap();
    let rows = ws.handler.query_view_rows(*gallery.id()).await.unwrap();
    let budgets: Vec<CellValue> = rows.iter().map(|r| r.cell(ws.budget).clone()).collect();
    assert_eq!(budgets, vec![CellValue::Number(15.0), CellValue::Number(5.0)]);

    // The primary field is the only one shown by default.
    let options = ws.handler.get_field_options(*gallery.id()).await.unwrap();
    assert_eq!(options[&ws.name].attr("hidden"), Some(&json!(false)));
    assert_eq!(options[&ws.status].attr("hidden"), Some(&json!(true)));
}
