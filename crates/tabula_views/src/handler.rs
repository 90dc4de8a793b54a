//! View lifecycle operations.
//!
//! Every mutation validates capabilities and field references first, then
//! re-checks entity existence and uniqueness inside one [`ViewStore`]
//! transaction, so either all of its changes become visible or none do.
//! Reads work on a snapshot and never wait for writers.

use crate::{
    FieldOptionsStore, FilterEvaluator, FilterUpdate, NewView, PublicAccessGate, SortComposer,
    SortUpdate, TypeRegistry, ViewEvent, ViewEventKind, ViewIncludes, ViewState, ViewStore,
    ViewUpdate, ViewWithRelations, ViewsConfig, generate_slug,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tabula_core::{
    Actor, Field, FieldId, FieldOptions, FilterConjunction, FilterId, Predicate, Row, RowQuery,
    SortDirection, SortId, TableId, View, ViewFilter, ViewId, ViewSort,
};
use tabula_error::{ViewError, ViewErrorKind, ViewResult};
use tabula_interface::{RowQueryEngine, TableProvider};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, trace, warn};

/// Check that a field may be referenced by a view of `table_id`.
///
/// Every operation accepting a field reference goes through this check.
///
/// # Errors
///
/// `FieldNotFound` for trashed fields, `FieldNotInTable` when the field
/// belongs to another table.
pub fn ensure_field_in_table(field: &Field, table_id: TableId) -> ViewResult<()> {
    if *field.trashed() {
        return Err(ViewError::new(ViewErrorKind::FieldNotFound(field.id().get())));
    }
    if *field.table_id() != table_id {
        return Err(ViewError::new(ViewErrorKind::FieldNotInTable {
            field_id: field.id().get(),
            table_id: table_id.get(),
        }));
    }
    Ok(())
}

fn validate_name(name: &str) -> ViewResult<()> {
    if name.trim().is_empty() {
        return Err(ViewError::new(ViewErrorKind::InvalidRequest(
            "view name must not be empty".to_string(),
        )));
    }
    Ok(())
}

/// Orchestrates view, filter, sort and field option lifecycles.
pub struct ViewHandler {
    registry: Arc<TypeRegistry>,
    tables: Arc<dyn TableProvider>,
    rows: Arc<dyn RowQueryEngine>,
    store: ViewStore,
    config: ViewsConfig,
    events: broadcast::Sender<ViewEvent>,
}

impl std::fmt::Debug for ViewHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewHandler")
            .field("config", &self.config)
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl ViewHandler {
    /// Create a handler over the given collaborators with an empty store.
    pub fn new(
        registry: Arc<TypeRegistry>,
        tables: Arc<dyn TableProvider>,
        rows: Arc<dyn RowQueryEngine>,
        config: ViewsConfig,
    ) -> Self {
        let (events, _) = broadcast::channel((*config.event_capacity()).max(1));
        Self {
            registry,
            tables,
            rows,
            store: ViewStore::new(),
            config,
            events,
        }
    }

    /// Type registry in use.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &ViewsConfig {
        &self.config
    }

    pub(crate) fn tables(&self) -> &dyn TableProvider {
        self.tables.as_ref()
    }

    pub(crate) fn rows(&self) -> &dyn RowQueryEngine {
        self.rows.as_ref()
    }

    pub(crate) async fn snapshot(&self) -> Arc<ViewState> {
        self.store.snapshot().await
    }

    /// Receive every change committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// Gate for unauthenticated lookups through public slugs.
    pub fn public_gate(&self) -> PublicAccessGate<'_> {
        PublicAccessGate::new(self)
    }

    fn publish(&self, actor: &Actor, kind: ViewEventKind) {
        if self.events.send(ViewEvent::now(*actor, kind)).is_err() {
            trace!("No event subscribers");
        }
    }

    fn unique_slug(&self, state: &ViewState) -> String {
        loop {
            let slug = generate_slug(*self.config.slug_bytes());
            if !state.slug_taken(&slug) {
                return slug;
            }
            warn!("Generated slug collided, retrying");
        }
    }

    /// Resolve a field and check it belongs to `table_id`.
    async fn field_of_table(&self, field_id: FieldId, table_id: TableId) -> ViewResult<Field> {
        let field = self.tables.get_field(field_id).await?;
        ensure_field_in_table(&field, table_id)?;
        Ok(field)
    }

    async fn fields_by_id(&self, table_id: TableId) -> ViewResult<HashMap<FieldId, Field>> {
        Ok(self
            .tables
            .list_fields(table_id)
            .await?
            .into_iter()
            .map(|field| (*field.id(), field))
            .collect())
    }

    async fn live_fields(&self, table_id: TableId) -> ViewResult<Vec<Field>> {
        Ok(self
            .tables
            .list_fields(table_id)
            .await?
            .into_iter()
            .filter(|field| !*field.trashed())
            .collect())
    }

    /// Create a view of `view_type` at the end of the table's view order.
    #[instrument(skip(self, attrs), fields(%actor, %table_id))]
    pub async fn create_view(
        &self,
        actor: &Actor,
        table_id: TableId,
        view_type: &str,
        attrs: NewView,
    ) -> ViewResult<View> {
        self.tables.get_table(table_id).await?;
        let descriptor = self.registry.get_view_type(view_type)?;
        validate_name(&attrs.name)?;
        descriptor.validate_options(&attrs.options)?;
        let public = attrs.public.unwrap_or(false);
        if public {
            descriptor.require_sharing()?;
        }

        let mut options = descriptor.view_options().defaults();
        options.extend(attrs.options);
        let tag = descriptor.tag();

        let view = self
            .store
            .transaction(|state| {
                let order = state.next_order(table_id);
                let slug = public.then(|| self.unique_slug(state));
                let view = state.insert_view(|view_id| {
                    let mut view = View::new(view_id, table_id, tag, attrs.name, order);
                    view.set_slug(slug)
                        .set_filter_type(attrs.filter_type.unwrap_or_default())
                        .set_filters_disabled(attrs.filters_disabled.unwrap_or(false))
                        .set_options(options);
                    view
                });
                Ok(view.clone())
            })
            .await?;

        info!(view_id = %view.id(), order = view.order(), "View created");
        self.publish(actor, ViewEventKind::ViewCreated { view: view.clone() });
        Ok(view)
    }

    /// A view by id.
    pub async fn get_view(&self, view_id: ViewId) -> ViewResult<View> {
        self.snapshot().await.view(view_id).cloned()
    }

    /// Views of a table ordered by position, then id.
    #[instrument(skip(self), fields(%table_id))]
    pub async fn list_views(
        &self,
        table_id: TableId,
        includes: ViewIncludes,
    ) -> ViewResult<Vec<ViewWithRelations>> {
        self.tables.get_table(table_id).await?;
        let snapshot = self.snapshot().await;
        let views = snapshot
            .views_of_table(table_id)
            .into_iter()
            .map(|view| {
                let filters = includes.filters.then(|| {
                    snapshot
                        .filters_of(*view.id())
                        .into_iter()
                        .cloned()
                        .collect()
                });
                let sortings = includes.sortings.then(|| {
                    snapshot
                        .sorts_of(*view.id())
                        .into_iter()
                        .cloned()
                        .collect()
                });
                ViewWithRelations::new(view.clone(), filters, sortings)
            })
            .collect::<Vec<_>>();
        debug!(count = views.len(), "Listed views");
        Ok(views)
    }

    /// Update a view. The view type cannot change.
    #[instrument(skip(self, update), fields(%actor, %view_id))]
    pub async fn update_view(
        &self,
        actor: &Actor,
        view_id: ViewId,
        update: ViewUpdate,
    ) -> ViewResult<View> {
        let current = self.get_view(view_id).await?;
        let descriptor = self.registry.get_view_type_by_instance(&current)?;

        if let Some(requested) = &update.view_type
            && requested != current.view_type()
        {
            return Err(ViewError::new(ViewErrorKind::InvalidRequest(format!(
                "view type cannot be changed from '{}' to '{}'",
                current.view_type(),
                requested
            ))));
        }
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(options) = &update.options {
            descriptor.validate_options(options)?;
        }
        if update.public == Some(true) {
            descriptor.require_sharing()?;
        }

        let view = self
            .store
            .transaction(|state| {
                let needs_slug = update.public == Some(true) && state.view(view_id)?.slug().is_none();
                if needs_slug {
                    let slug = self.unique_slug(state);
                    state.set_slug(view_id, Some(slug))?;
                } else if update.public == Some(false) {
                    state.set_slug(view_id, None)?;
                }

                let view = state.view_mut(view_id)?;
                if let Some(name) = update.name {
                    view.set_name(name);
                }
                if let Some(filter_type) = update.filter_type {
                    view.set_filter_type(filter_type);
                }
                if let Some(disabled) = update.filters_disabled {
                    view.set_filters_disabled(disabled);
                }
                if let Some(patch) = update.options {
                    let mut options = view.options().clone();
                    options.extend(patch);
                    view.set_options(options);
                }
                Ok(view.clone())
            })
            .await?;

        info!("View updated");
        self.publish(actor, ViewEventKind::ViewUpdated { view: view.clone() });
        Ok(view)
    }

    /// Delete a view with its filters, sorts and field options. Rows are
    /// never touched.
    #[instrument(skip(self), fields(%actor, %view_id))]
    pub async fn delete_view(&self, actor: &Actor, view_id: ViewId) -> ViewResult<()> {
        let view = self
            .store
            .transaction(|state| state.remove_view(view_id))
            .await?;
        info!("View deleted");
        self.publish(
            actor,
            ViewEventKind::ViewDeleted {
                view_id,
                table_id: *view.table_id(),
            },
        );
        Ok(())
    }

    /// Give each listed view its index as position; unlisted views of the
    /// table go to position 0.
    #[instrument(skip(self, order), fields(%actor, %table_id, count = order.len()))]
    pub async fn order_views(
        &self,
        actor: &Actor,
        table_id: TableId,
        order: &[ViewId],
    ) -> ViewResult<()> {
        self.tables.get_table(table_id).await?;
        self.store
            .transaction(|state| {
                for view_id in order {
                    let in_table = state
                        .view(*view_id)
                        .map(|view| *view.table_id() == table_id)
                        .unwrap_or(false);
                    if !in_table {
                        return Err(ViewError::new(ViewErrorKind::ViewNotInTable {
                            view_id: view_id.get(),
                            table_id: table_id.get(),
                        }));
                    }
                }
                let table_views: Vec<ViewId> = state
                    .views_of_table(table_id)
                    .into_iter()
                    .map(|view| *view.id())
                    .collect();
                for view_id in table_views {
                    let position = order
                        .iter()
                        .position(|listed| *listed == view_id)
                        .unwrap_or(0);
                    state.view_mut(view_id)?.set_order(position as i64);
                }
                Ok(())
            })
            .await?;
        info!("Views reordered");
        self.publish(
            actor,
            ViewEventKind::ViewsReordered {
                table_id,
                order: order.to_vec(),
            },
        );
        Ok(())
    }

    /// Filters of a view in creation order.
    pub async fn list_filters(&self, view_id: ViewId) -> ViewResult<Vec<ViewFilter>> {
        let snapshot = self.snapshot().await;
        snapshot.view(view_id)?;
        Ok(snapshot.filters_of(view_id).into_iter().cloned().collect())
    }

    /// A filter by id.
    pub async fn get_filter(&self, filter_id: FilterId) -> ViewResult<ViewFilter> {
        self.snapshot().await.filter(filter_id).cloned()
    }

    /// Validate a filter's view type, field, filter type and value together.
    async fn validate_filter(
        &self,
        view: &View,
        field_id: FieldId,
        filter_type: &str,
        value: &str,
    ) -> ViewResult<()> {
        self.registry
            .get_view_type_by_instance(view)?
            .require_filtering()?;
        let field = self.field_of_table(field_id, *view.table_id()).await?;
        FilterEvaluator::new(&self.registry).compile(&field, filter_type, value)?;
        Ok(())
    }

    /// Add a filter to a view.
    #[instrument(skip(self, value), fields(%actor, %view_id, %field_id))]
    pub async fn create_filter(
        &self,
        actor: &Actor,
        view_id: ViewId,
        field_id: FieldId,
        filter_type: &str,
        value: impl Into<String>,
    ) -> ViewResult<ViewFilter> {
        let value = value.into();
        let view = self.get_view(view_id).await?;
        self.validate_filter(&view, field_id, filter_type, &value)
            .await?;

        let filter = self
            .store
            .transaction(|state| {
                state.view(view_id)?;
                let filter = state.insert_filter(|filter_id| {
                    ViewFilter::new(filter_id, view_id, field_id, filter_type, value)
                });
                Ok(filter.clone())
            })
            .await?;

        info!(filter_id = %filter.id(), "Filter created");
        self.publish(actor, ViewEventKind::FilterCreated {
            filter: filter.clone(),
        });
        Ok(filter)
    }

    /// Change a filter's field, type or value. The resulting combination is
    /// validated as a whole.
    ///
    /// Unset attributes keep their stored values. When a concurrent update
    /// changes one of them while this combination is being validated, the
    /// new combination is validated again before anything is written.
    #[instrument(skip(self, update), fields(%actor, %filter_id))]
    pub async fn update_filter(
        &self,
        actor: &Actor,
        filter_id: FilterId,
        update: FilterUpdate,
    ) -> ViewResult<ViewFilter> {
        let filter = loop {
            let current = self.get_filter(filter_id).await?;
            let view = self.get_view(*current.view_id()).await?;
            let field_id = update.field_id.unwrap_or(*current.field_id());
            let filter_type = update
                .filter_type
                .clone()
                .unwrap_or_else(|| current.filter_type().clone());
            let value = update
                .value
                .clone()
                .unwrap_or_else(|| current.value().clone());
            self.validate_filter(&view, field_id, &filter_type, &value)
                .await?;

            let committed = self
                .store
                .transaction(|state| {
                    let filter = state.filter_mut(filter_id)?;
                    let unchanged = update.field_id.unwrap_or(*filter.field_id()) == field_id
                        && update.filter_type.as_deref().unwrap_or(filter.filter_type().as_str())
                            == filter_type
                        && update.value.as_deref().unwrap_or(filter.value().as_str()) == value;
                    if !unchanged {
                        return Ok(None);
                    }
                    filter
                        .set_field_id(field_id)
                        .set_filter_type(filter_type)
                        .set_value(value);
                    Ok(Some(filter.clone()))
                })
                .await?;

            match committed {
                Some(filter) => break filter,
                None => debug!("Filter changed during validation, validating again"),
            }
        };

        info!("Filter updated");
        self.publish(actor, ViewEventKind::FilterUpdated {
            filter: filter.clone(),
        });
        Ok(filter)
    }

    /// Remove a filter.
    #[instrument(skip(self), fields(%actor, %filter_id))]
    pub async fn delete_filter(&self, actor: &Actor, filter_id: FilterId) -> ViewResult<()> {
        let filter = self
            .store
            .transaction(|state| state.remove_filter(filter_id))
            .await?;
        info!("Filter deleted");
        self.publish(actor, ViewEventKind::FilterDeleted { filter });
        Ok(())
    }

    /// Sorts of a view in creation order.
    pub async fn list_sorts(&self, view_id: ViewId) -> ViewResult<Vec<ViewSort>> {
        let snapshot = self.snapshot().await;
        snapshot.view(view_id)?;
        Ok(snapshot.sorts_of(view_id).into_iter().cloned().collect())
    }

    /// A sort by id.
    pub async fn get_sort(&self, sort_id: SortId) -> ViewResult<ViewSort> {
        self.snapshot().await.sort(sort_id).cloned()
    }

    /// Validate that a view may be sorted by a field.
    async fn validate_sort_field(&self, view: &View, field_id: FieldId) -> ViewResult<Field> {
        self.registry
            .get_view_type_by_instance(view)?
            .require_sorting()?;
        let field = self.field_of_table(field_id, *view.table_id()).await?;
        if !field.kind().can_order_by() {
            return Err(ViewError::new(ViewErrorKind::SortFieldNotSupported {
                field_id: field.id().get(),
                field_kind: field.kind().to_string(),
            }));
        }
        Ok(field)
    }

    /// Add a sort to a view. At most one sort per field.
    #[instrument(skip(self), fields(%actor, %view_id, %field_id, %direction))]
    pub async fn create_sort(
        &self,
        actor: &Actor,
        view_id: ViewId,
        field_id: FieldId,
        direction: SortDirection,
    ) -> ViewResult<ViewSort> {
        let view = self.get_view(view_id).await?;
        self.validate_sort_field(&view, field_id).await?;

        let sort = self
            .store
            .transaction(|state| {
                state.view(view_id)?;
                if state.sort_on_field(view_id, field_id, None).is_some() {
                    return Err(ViewError::new(ViewErrorKind::SortFieldAlreadyExists {
                        view_id: view_id.get(),
                        field_id: field_id.get(),
                    }));
                }
                let sort = state.insert_sort(|sort_id| {
                    ViewSort::new(sort_id, view_id, field_id, direction)
                });
                Ok(sort.clone())
            })
            .await?;

        info!(sort_id = %sort.id(), "Sort created");
        self.publish(actor, ViewEventKind::SortCreated { sort: sort.clone() });
        Ok(sort)
    }

    /// Change a sort's field or direction.
    #[instrument(skip(self, update), fields(%actor, %sort_id))]
    pub async fn update_sort(
        &self,
        actor: &Actor,
        sort_id: SortId,
        update: SortUpdate,
    ) -> ViewResult<ViewSort> {
        let current = self.get_sort(sort_id).await?;
        let view_id = *current.view_id();
        if let Some(field_id) = update.field_id
            && field_id != *current.field_id()
        {
            let view = self.get_view(view_id).await?;
            self.validate_sort_field(&view, field_id).await?;
        }

        let sort = self
            .store
            .transaction(|state| {
                let field_id = update.field_id.unwrap_or(*state.sort(sort_id)?.field_id());
                if state.sort_on_field(view_id, field_id, Some(sort_id)).is_some() {
                    return Err(ViewError::new(ViewErrorKind::SortFieldAlreadyExists {
                        view_id: view_id.get(),
                        field_id: field_id.get(),
                    }));
                }
                let sort = state.sort_mut(sort_id)?;
                sort.set_field_id(field_id);
                if let Some(direction) = update.direction {
                    sort.set_direction(direction);
                }
                Ok(sort.clone())
            })
            .await?;

        info!("Sort updated");
        self.publish(actor, ViewEventKind::SortUpdated { sort: sort.clone() });
        Ok(sort)
    }

    /// Remove a sort.
    #[instrument(skip(self), fields(%actor, %sort_id))]
    pub async fn delete_sort(&self, actor: &Actor, sort_id: SortId) -> ViewResult<()> {
        let sort = self
            .store
            .transaction(|state| state.remove_sort(sort_id))
            .await?;
        info!("Sort deleted");
        self.publish(actor, ViewEventKind::SortDeleted { sort });
        Ok(())
    }

    /// Options of every live field of the view's table; untouched fields
    /// report type defaults.
    #[instrument(skip(self), fields(%view_id))]
    pub async fn get_field_options(
        &self,
        view_id: ViewId,
    ) -> ViewResult<BTreeMap<FieldId, FieldOptions>> {
        let snapshot = self.snapshot().await;
        let view = snapshot.view(view_id)?;
        let shape = self
            .registry
            .get_view_type_by_instance(view)?
            .require_field_options()?;
        let fields = self.live_fields(*view.table_id()).await?;
        Ok(FieldOptionsStore::new(shape).all(&snapshot, view_id, &fields))
    }

    /// Options of one field, persisting defaults on first access.
    #[instrument(skip(self), fields(%actor, %view_id, %field_id))]
    pub async fn get_or_create_field_options(
        &self,
        actor: &Actor,
        view_id: ViewId,
        field_id: FieldId,
    ) -> ViewResult<FieldOptions> {
        let view = self.get_view(view_id).await?;
        let shape = self
            .registry
            .get_view_type_by_instance(&view)?
            .require_field_options()?;
        let field = self.related_field(field_id, *view.table_id()).await?;
        self.store
            .transaction(|state| {
                state.view(view_id)?;
                Ok(FieldOptionsStore::new(shape).get_or_create(state, view_id, &field))
            })
            .await
    }

    async fn related_field(&self, field_id: FieldId, table_id: TableId) -> ViewResult<Field> {
        self.field_of_table(field_id, table_id)
            .await
            .map_err(|e| match e.kind() {
                ViewErrorKind::FieldNotFound(_) | ViewErrorKind::FieldNotInTable { .. } => {
                    ViewError::new(ViewErrorKind::UnrelatedField(field_id.get()))
                }
                _ => e,
            })
    }

    /// Upsert options for several fields at once, all or nothing.
    #[instrument(skip(self, field_options), fields(%actor, %view_id, count = field_options.len()))]
    pub async fn update_field_options(
        &self,
        actor: &Actor,
        view_id: ViewId,
        field_options: BTreeMap<FieldId, Map<String, Value>>,
    ) -> ViewResult<BTreeMap<FieldId, FieldOptions>> {
        let view = self.get_view(view_id).await?;
        let shape = self
            .registry
            .get_view_type_by_instance(&view)?
            .require_field_options()?;

        let mut entries = Vec::with_capacity(field_options.len());
        for (field_id, attrs) in field_options {
            let field = self.related_field(field_id, *view.table_id()).await?;
            entries.push((field, attrs));
        }
        let fields = self.live_fields(*view.table_id()).await?;

        let store = FieldOptionsStore::new(shape);
        let (all, touched) = self
            .store
            .transaction(|state| {
                state.view(view_id)?;
                store.bulk_upsert(state, view_id, &entries)?;
                let touched: Vec<FieldOptions> = entries
                    .iter()
                    .map(|(field, _)| store.get(state, view_id, field))
                    .collect();
                Ok((store.all(state, view_id, &fields), touched))
            })
            .await?;

        info!("Field options updated");
        self.publish(actor, ViewEventKind::FieldOptionsUpdated {
            view_id,
            field_options: touched,
        });
        Ok(all)
    }

    /// Replace the view's public slug; the previous slug stops resolving.
    #[instrument(skip(self), fields(%actor, %view_id))]
    pub async fn rotate_view_slug(&self, actor: &Actor, view_id: ViewId) -> ViewResult<View> {
        let view = self.get_view(view_id).await?;
        self.registry
            .get_view_type_by_instance(&view)?
            .require_sharing()?;

        let view = self
            .store
            .transaction(|state| {
                let slug = self.unique_slug(state);
                Ok(state.set_slug(view_id, Some(slug))?.clone())
            })
            .await?;

        info!("View slug rotated");
        self.publish(actor, ViewEventKind::SlugRotated { view: view.clone() });
        Ok(view)
    }

    /// Resolve a shared view by slug, regardless of who asks.
    ///
    /// # Errors
    ///
    /// `ViewNotFound` when the slug is unknown or the view type no longer
    /// permits sharing; the two cases are indistinguishable to the caller.
    #[instrument(skip(self, slug), fields(%actor))]
    pub async fn get_public_view_by_slug(&self, actor: &Actor, slug: &str) -> ViewResult<View> {
        let snapshot = self.snapshot().await;
        let view = snapshot
            .view_by_slug(slug)
            .ok_or_else(|| ViewError::new(ViewErrorKind::ViewNotFound))?;
        let shareable = self
            .registry
            .get_view_type_by_instance(view)
            .map(|descriptor| *descriptor.can_share())
            .unwrap_or(false);
        if !shareable {
            debug!(view_id = %view.id(), "Slug resolves to a view that cannot be shared");
            return Err(ViewError::new(ViewErrorKind::ViewNotFound));
        }
        Ok(view.clone())
    }

    /// Fold the view's filters into `base`.
    ///
    /// Filters on trashed or foreign fields are skipped. A stored filter
    /// that no longer compiles matches no rows.
    #[instrument(skip(self, view, base), fields(view_id = %view.id()))]
    pub async fn apply_filters(&self, view: &View, base: RowQuery) -> ViewResult<RowQuery> {
        if *view.filters_disabled() {
            return Ok(base);
        }
        let snapshot = self.snapshot().await;
        let filters = snapshot.filters_of(*view.id());
        if filters.is_empty() {
            return Ok(base);
        }

        let fields = self.fields_by_id(*view.table_id()).await?;
        let evaluator = FilterEvaluator::new(&self.registry);
        let mut predicates = Vec::with_capacity(filters.len());
        for filter in filters {
            let Some(field) = fields.get(filter.field_id()).filter(|f| !*f.trashed()) else {
                warn!(filter_id = %filter.id(), "Skipping filter on unavailable field");
                continue;
            };
            match evaluator.compile(field, filter.filter_type(), filter.value()) {
                Ok(predicate) => predicates.push(predicate),
                Err(e) => {
                    warn!(filter_id = %filter.id(), error = %e, "Stored filter no longer compiles");
                    predicates.push(Predicate::RowIdIn(BTreeSet::new()));
                }
            }
        }
        // Empty-value filters do not constrain, not even inside a disjunction.
        predicates.retain(|predicate| !matches!(predicate, Predicate::All));
        if predicates.is_empty() {
            return Ok(base);
        }

        let combined = match view.filter_type() {
            FilterConjunction::And => predicates.into_iter().fold(Predicate::All, Predicate::and),
            FilterConjunction::Or => Predicate::Or(predicates),
        };
        Ok(base.and_where(combined))
    }

    /// Order `base` by the view's sorts in creation order, then by row id.
    #[instrument(skip(self, view, base), fields(view_id = %view.id()))]
    pub async fn apply_sorts(&self, view: &View, base: RowQuery) -> ViewResult<RowQuery> {
        let snapshot = self.snapshot().await;
        let mut sorts: Vec<ViewSort> = snapshot
            .sorts_of(*view.id())
            .into_iter()
            .cloned()
            .collect();
        if !sorts.is_empty() {
            let fields = self.fields_by_id(*view.table_id()).await?;
            sorts.retain(|sort| {
                let usable = fields
                    .get(sort.field_id())
                    .map(|f| !*f.trashed() && f.kind().can_order_by())
                    .unwrap_or(false);
                if !usable {
                    warn!(sort_id = %sort.id(), "Skipping sort on unavailable field");
                }
                usable
            });
        }
        Ok(base.order_by(SortComposer.compose_total(&sorts)))
    }

    /// Rows of a view: filtered, then ordered.
    #[instrument(skip(self), fields(%view_id))]
    pub async fn query_view_rows(&self, view_id: ViewId) -> ViewResult<Vec<Row>> {
        let view = self.get_view(view_id).await?;
        let query = RowQuery::table(*view.table_id());
        let query = self.apply_filters(&view, query).await?;
        let query = self.apply_sorts(&view, query).await?;
        let rows = self.rows.execute(&query).await?;
        debug!(count = rows.len(), "View rows fetched");
        Ok(rows)
    }

    /// Drop every filter, sort and field options entry of a permanently
    /// deleted field. Returns the number of removed entries.
    #[instrument(skip(self), fields(%actor, %field_id))]
    pub async fn on_field_deleted(&self, actor: &Actor, field_id: FieldId) -> ViewResult<usize> {
        let removed = self
            .store
            .transaction(|state| Ok(state.remove_field_references(field_id)))
            .await?;
        if removed > 0 {
            info!(removed, "Removed references to deleted field");
            self.publish(actor, ViewEventKind::FieldReferencesRemoved { field_id, removed });
        }
        Ok(removed)
    }
}
