//! Anonymous access to publicly shared views.

use crate::{FieldOptionsStore, LookupRequest, ViewHandler};
use serde::Serialize;
use std::collections::BTreeSet;
use tabula_core::{Actor, Field, FieldId, OrderKey, Predicate, RowId, RowQuery, View};
use tabula_error::{ViewError, ViewErrorKind, ViewResult};
use tracing::{debug, instrument};

/// One row of the link target table as shown to anonymous visitors.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters, derive_new::new)]
pub struct LinkRowValue {
    id: RowId,
    /// Primary field text of the row
    value: String,
}

/// One page of a public link row lookup.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters, derive_new::new)]
pub struct LinkRowPage {
    /// Matching rows across all pages
    count: usize,
    /// 1-based page number
    page: usize,
    results: Vec<LinkRowValue>,
}

/// Narrows cross-table lookups made through a shared view.
#[derive(Debug, Clone, Copy)]
pub struct PublicAccessGate<'a> {
    handler: &'a ViewHandler,
}

impl<'a> PublicAccessGate<'a> {
    pub(crate) fn new(handler: &'a ViewHandler) -> Self {
        Self { handler }
    }

    /// Target rows an anonymous visitor may pick through `field` of a shared
    /// view.
    ///
    /// # Errors
    ///
    /// - `ViewNotFound` if the slug is unknown or the view cannot be shared
    /// - `FieldNotFound` if `field_id` is not a link field shown by the view
    /// - `InvalidRequest` for a zero page or page size
    #[instrument(skip(self, slug, request), fields(%field_id))]
    pub async fn link_row_lookup(
        &self,
        slug: &str,
        field_id: FieldId,
        request: LookupRequest,
    ) -> ViewResult<LinkRowPage> {
        let view = self
            .handler
            .get_public_view_by_slug(&Actor::Anonymous, slug)
            .await?;
        let field = self.exposed_link_field(&view, field_id).await?;
        let target = field
            .link_table()
            .as_ref()
            .copied()
            .ok_or_else(|| ViewError::new(ViewErrorKind::FieldNotFound(field_id.get())))?;

        let limit = *self.handler.config().row_page_size_limit();
        let page = request.page.unwrap_or(1);
        let size = request.size.unwrap_or(limit);
        if page == 0 || size == 0 {
            return Err(ViewError::new(ViewErrorKind::InvalidRequest(
                "page and size must be positive".to_string(),
            )));
        }
        let size = size.min(limit);

        let mut query = RowQuery::table(target)
            .with_search(request.search)
            .order_by(vec![OrderKey::row_id_ascending()]);
        if let Some(visible) = self.visible_link_row_ids(&view, &field).await? {
            query = query.and_where(Predicate::RowIdIn(visible));
        }
        let rows = self.handler.rows().execute(&query).await?;

        let primary = self
            .handler
            .tables()
            .list_fields(target)
            .await?
            .into_iter()
            .find(|f| *f.primary() && !*f.trashed())
            .map(|f| *f.id());
        let count = rows.len();
        let results = rows
            .iter()
            .skip((page - 1).saturating_mul(size))
            .take(size)
            .map(|row| {
                let value = primary
                    .map(|id| row.cell(id).as_search_text())
                    .unwrap_or_default();
                LinkRowValue::new(*row.id(), value)
            })
            .collect::<Vec<_>>();

        debug!(count, returned = results.len(), "Public link row lookup");
        Ok(LinkRowPage::new(count, page, results))
    }

    /// Ids of the target rows reachable through `field` from the rows the
    /// shared view currently shows.
    ///
    /// `None` when the view type does not restrict link lookups, meaning
    /// every target row is visible.
    pub async fn visible_link_row_ids(
        &self,
        view: &View,
        field: &Field,
    ) -> ViewResult<Option<BTreeSet<RowId>>> {
        let descriptor = self.handler.registry().get_view_type_by_instance(view)?;
        if !*descriptor.restrict_link_row_public_view_sharing() {
            return Ok(None);
        }
        let mut source = RowQuery::table(*view.table_id());
        if *descriptor.can_filter() {
            source = self.handler.apply_filters(view, source).await?;
        }
        let ids = self
            .handler
            .rows()
            .column_link_ids(&source, *field.id())
            .await?;
        debug!(view_id = %view.id(), visible = ids.len(), "Restricted link row targets");
        Ok(Some(ids))
    }

    /// The link field `field_id` if the view shows it.
    async fn exposed_link_field(&self, view: &View, field_id: FieldId) -> ViewResult<Field> {
        let not_found = || ViewError::new(ViewErrorKind::FieldNotFound(field_id.get()));
        let descriptor = self.handler.registry().get_view_type_by_instance(view)?;
        let shape = descriptor.field_options().as_ref().ok_or_else(not_found)?;
        let fields = self.handler.tables().list_fields(*view.table_id()).await?;
        let snapshot = self.handler.snapshot().await;
        FieldOptionsStore::new(shape)
            .visible_in_order(&snapshot, *view.id(), &fields)
            .into_iter()
            .find(|f| *f.id() == field_id && f.is_link_row())
            .cloned()
            .ok_or_else(not_found)
    }
}
