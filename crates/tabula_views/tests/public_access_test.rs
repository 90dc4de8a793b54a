//! Public slug and anonymous link row lookup tests.

mod test_utils;

use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tabula_core::{Actor, RowId, View};
use tabula_error::{ErrorCategory, ViewErrorKind};
use tabula_interface::TableProvider;
use tabula_views::{LookupRequest, LookupRequestBuilder, ViewUpdateBuilder, ViewsConfigBuilder};
use test_utils::{Workspace, workspace, workspace_with};

async fn share(ws: &Workspace, view: &View) -> String {
    ws.handler
        .update_view(
            &ws.actor,
            *view.id(),
            ViewUpdateBuilder::default().public(true).build().unwrap(),
        )
        .await
        .unwrap()
        .slug()
        .clone()
        .unwrap()
}

/// Roof and Door are done and link Acme and Globex; Wall is open and links Initech.
async fn seeded_grid(ws: &Workspace) -> (View, String) {
    ws.project("Roof", "Done", 1.0, &[ws.acme]).await;
    ws.project("Door", "Done", 1.0, &[ws.acme, ws.globex]).await;
    ws.project("Wall", "Open", 1.0, &[ws.initech]).await;
    let view = ws.view("grid", "Shared").await;
    ws.handler
        .create_filter(&ws.actor, *view.id(), ws.status, "equal", "Done")
        .await
        .unwrap();
    let slug = share(ws, &view).await;
    (view, slug)
}

fn ids(page: &tabula_views::LinkRowPage) -> Vec<RowId> {
    page.results().iter().map(|r| *r.id()).collect()
}

// ============================================================================
// Slugs
// ============================================================================

#[tokio::test]
async fn test_rotate_slug_invalidates_previous() {
    let ws = workspace().await;
    let view = ws.view("grid", "Grid").await;
    let original = share(&ws, &view).await;

    let first = ws
        .handler
        .rotate_view_slug(&ws.actor, *view.id())
        .await
        .unwrap()
        .slug()
        .clone()
        .unwrap();
    let second = ws
        .handler
        .rotate_view_slug(&ws.actor, *view.id())
        .await
        .unwrap()
        .slug()
        .clone()
        .unwrap();
    assert_ne!(first, second);
    assert_ne!(original, first);

    for stale in [&original, &first] {
        let err = ws
            .handler
            .get_public_view_by_slug(&Actor::Anonymous, stale)
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ViewErrorKind::ViewNotFound));
    }
    let resolved = ws
        .handler
        .get_public_view_by_slug(&Actor::Anonymous, &second)
        .await
        .unwrap();
    assert_eq!(resolved.id(), view.id());
}

#[tokio::test]
async fn test_rotate_slug_requires_shareable_type() {
    use std::sync::Arc;
    use tabula_views::{NewView, TypeRegistry, ViewHandler, ViewType, ViewsConfig};

    let ws = workspace().await;
    let registry = TypeRegistry::builder()
        .register_view_type(ViewType::new("private"))
        .build();
    let handler = ViewHandler::new(
        Arc::new(registry),
        Arc::new(ws.tables.clone()),
        Arc::new(ws.tables.clone()),
        ViewsConfig::default(),
    );
    let view = handler
        .create_view(&ws.actor, ws.projects, "private", NewView::named("Mine"))
        .await
        .unwrap();
    let err = handler
        .rotate_view_slug(&ws.actor, *view.id())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ViewErrorKind::CannotShareViewType(_)));

    let err = handler
        .update_view(
            &ws.actor,
            *view.id(),
            ViewUpdateBuilder::default().public(true).build().unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ViewErrorKind::CannotShareViewType(_)));
}

#[tokio::test]
async fn test_unknown_slug() {
    let ws = workspace().await;
    let err = ws
        .handler
        .public_gate()
        .link_row_lookup("nope", ws.client, LookupRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ViewErrorKind::ViewNotFound));
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

// ============================================================================
// Restricted lookups
// ============================================================================

#[tokio::test]
async fn test_restricted_set_is_links_of_filtered_rows() {
    let ws = workspace().await;
    let (view, _) = seeded_grid(&ws).await;
    let field = ws.tables.get_field(ws.client).await.unwrap();

    let visible = ws
        .handler
        .public_gate()
        .visible_link_row_ids(&view, &field)
        .await
        .unwrap();
    let expected: BTreeSet<RowId> = [ws.acme, ws.globex].into_iter().collect();
    assert_eq!(visible, Some(expected));
}

#[tokio::test]
async fn test_lookup_returns_primary_values_in_id_order() {
    let ws = workspace().await;
    let (_, slug) = seeded_grid(&ws).await;

    let page = ws
        .handler
        .public_gate()
        .link_row_lookup(&slug, ws.client, LookupRequest::default())
        .await
        .unwrap();
    assert_eq!(*page.count(), 2);
    assert_eq!(*page.page(), 1);
    assert_eq!(ids(&page), vec![ws.acme, ws.globex]);
    let values: Vec<&str> = page.results().iter().map(|r| r.value().as_str()).collect();
    assert_eq!(values, vec!["Acme", "Globex"]);
}

#[tokio::test]
async fn test_search_narrows_restricted_set() {
    let ws = workspace().await;
    let (_, slug) = seeded_grid(&ws).await;

    let request = LookupRequestBuilder::default()
        .search("GLOB")
        .build()
        .unwrap();
    let page = ws
        .handler
        .public_gate()
        .link_row_lookup(&slug, ws.client, request)
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![ws.globex]);

    // Initech exists but is not linked from a visible row.
    let request = LookupRequestBuilder::default()
        .search("initech")
        .build()
        .unwrap();
    let page = ws
        .handler
        .public_gate()
        .link_row_lookup(&slug, ws.client, request)
        .await
        .unwrap();
    assert_eq!(*page.count(), 0);
}

#[tokio::test]
async fn test_filter_changes_are_reflected() {
    let ws = workspace().await;
    let (view, slug) = seeded_grid(&ws).await;
    let filter = ws.handler.list_filters(*view.id()).await.unwrap()[0].clone();
    ws.handler.delete_filter(&ws.actor, *filter.id()).await.unwrap();

    let page = ws
        .handler
        .public_gate()
        .link_row_lookup(&slug, ws.client, LookupRequest::default())
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![ws.acme, ws.globex, ws.initech]);
}

#[tokio::test]
async fn test_non_link_or_hidden_field_not_found() {
    let ws = workspace().await;
    let (view, slug) = seeded_grid(&ws).await;

    let err = ws
        .handler
        .public_gate()
        .link_row_lookup(&slug, ws.name, LookupRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ViewErrorKind::FieldNotFound(_)));

    let mut update = BTreeMap::new();
    update.insert(ws.client, json!({"hidden": true}).as_object().cloned().unwrap());
    ws.handler
        .update_field_options(&ws.actor, *view.id(), update)
        .await
        .unwrap();
    let err = ws
        .handler
        .public_gate()
        .link_row_lookup(&slug, ws.client, LookupRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ViewErrorKind::FieldNotFound(_)));
}

// ============================================================================
// Unrestricted lookups
// ============================================================================

#[tokio::test]
async fn test_form_lookup_sees_every_target_row() {
    let ws = workspace().await;
    ws.project("Wall", "Open", 1.0, &[ws.initech]).await;
    let form = ws.view("form", "Signup").await;
    let slug = share(&ws, &form).await;

    // Form fields are hidden until enabled.
    let err = ws
        .handler
        .public_gate()
        .link_row_lookup(&slug, ws.client, LookupRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ViewErrorKind::FieldNotFound(_)));

    let mut update = BTreeMap::new();
    update.insert(ws.client, json!({"enabled": true}).as_object().cloned().unwrap());
    ws.handler
        .update_field_options(&ws.actor, *form.id(), update)
        .await
        .unwrap();

    let field = ws.tables.get_field(ws.client).await.unwrap();
    assert_eq!(
        ws.handler
            .public_gate()
            .visible_link_row_ids(&form, &field)
            .await
            .unwrap(),
        None
    );

    let page = ws
        .handler
        .public_gate()
        .link_row_lookup(&slug, ws.client, LookupRequest::default())
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![ws.acme, ws.globex, ws.initech]);

    let request = LookupRequestBuilder::default().search("acme").build().unwrap();
    let page = ws
        .handler
        .public_gate()
        .link_row_lookup(&slug, ws.client, request)
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![ws.acme]);
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_pagination_and_clamping() {
    let config = ViewsConfigBuilder::default()
        .row_page_size_limit(2usize)
        .build()
        .unwrap();
    let ws = workspace_with(config).await;
    ws.project("Roof", "Done", 1.0, &[ws.acme, ws.globex, ws.initech])
        .await;
    let view = ws.view("grid", "Shared").await;
    let slug = share(&ws, &view).await;
    let gate = ws.handler.public_gate();

    let request = LookupRequestBuilder::default().size(50usize).build().unwrap();
    let page = gate.link_row_lookup(&slug, ws.client, request).await.unwrap();
    assert_eq!(*page.count(), 3);
    assert_eq!(ids(&page), vec![ws.acme, ws.globex]);

    let request = LookupRequestBuilder::default()
        .page(2usize)
        .size(2usize)
        .build()
        .unwrap();
    let page = gate.link_row_lookup(&slug, ws.client, request).await.unwrap();
    assert_eq!(ids(&page), vec![ws.initech]);

    let request = LookupRequestBuilder::default().page(5usize).build().unwrap();
    let page = gate.link_row_lookup(&slug, ws.client, request).await.unwrap();
    assert_eq!(*page.count(), 3);
    assert!(page.results().is_empty());

    let request = LookupRequestBuilder::default().page(0usize).build().unwrap();
    let err = gate
        .link_row_lookup(&slug, ws.client, request)
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ViewErrorKind::InvalidRequest(_)));
}
