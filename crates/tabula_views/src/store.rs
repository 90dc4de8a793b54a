//! Persisted view state and its transaction boundary.
//!
//! Writers are serialised by the write lock and work on a private copy of
//! the state, which replaces the shared one only when the whole closure
//! succeeds. Readers clone the current `Arc` and never wait on validation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tabula_core::{
    FieldId, FieldOptions, FilterId, SortId, TableId, View, ViewFilter, ViewId, ViewSort,
};
use tabula_error::{ViewError, ViewErrorKind, ViewResult};
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Everything the view engine persists.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    views: BTreeMap<ViewId, View>,
    filters: BTreeMap<FilterId, ViewFilter>,
    sorts: BTreeMap<SortId, ViewSort>,
    field_options: BTreeMap<(ViewId, FieldId), FieldOptions>,
    slugs: HashMap<String, ViewId>,
    last_view_id: i64,
    last_filter_id: i64,
    last_sort_id: i64,
}

impl ViewState {
    /// View by id.
    ///
    /// # Errors
    ///
    /// `ViewNotFound` when absent.
    pub fn view(&self, view_id: ViewId) -> ViewResult<&View> {
        self.views
            .get(&view_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::ViewNotFound))
    }

    /// Mutable view by id.
    pub fn view_mut(&mut self, view_id: ViewId) -> ViewResult<&mut View> {
        self.views
            .get_mut(&view_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::ViewNotFound))
    }

    /// Views of a table ordered by `(order, id)`.
    pub fn views_of_table(&self, table_id: TableId) -> Vec<&View> {
        let mut views: Vec<&View> = self
            .views
            .values()
            .filter(|v| *v.table_id() == table_id)
            .collect();
        views.sort_by_key(|v| (*v.order(), *v.id()));
        views
    }

    /// Next position for a new view of the table.
    pub fn next_order(&self, table_id: TableId) -> i64 {
        self.views
            .values()
            .filter(|v| *v.table_id() == table_id)
            .map(|v| *v.order())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0)
    }

    /// Store a new view, assigning its id.
    pub fn insert_view(&mut self, build: impl FnOnce(ViewId) -> View) -> &View {
        self.last_view_id += 1;
        let view_id = ViewId::from(self.last_view_id);
        let view = build(view_id);
        if let Some(slug) = view.slug() {
            self.slugs.insert(slug.clone(), view_id);
        }
        self.views.entry(view_id).or_insert(view)
    }

    /// Remove a view with its filters, sorts and field options.
    pub fn remove_view(&mut self, view_id: ViewId) -> ViewResult<View> {
        let view = self
            .views
            .remove(&view_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::ViewNotFound))?;
        if let Some(slug) = view.slug() {
            self.slugs.remove(slug);
        }
        let filters_before = self.filters.len();
        let sorts_before = self.sorts.len();
        self.filters.retain(|_, f| *f.view_id() != view_id);
        self.sorts.retain(|_, s| *s.view_id() != view_id);
        self.field_options.retain(|(v, _), _| *v != view_id);
        debug!(
            %view_id,
            filters_removed = filters_before - self.filters.len(),
            sorts_removed = sorts_before - self.sorts.len(),
            "Removed view with dependents"
        );
        Ok(view)
    }

    /// View id owning a public slug.
    pub fn view_by_slug(&self, slug: &str) -> Option<&View> {
        self.slugs.get(slug).and_then(|id| self.views.get(id))
    }

    /// Whether any view currently uses this slug.
    pub fn slug_taken(&self, slug: &str) -> bool {
        self.slugs.contains_key(slug)
    }

    /// Replace a view's slug, keeping the slug index in step.
    pub fn set_slug(&mut self, view_id: ViewId, slug: Option<String>) -> ViewResult<&View> {
        let view = self
            .views
            .get_mut(&view_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::ViewNotFound))?;
        if let Some(previous) = view.slug() {
            self.slugs.remove(previous);
        }
        if let Some(next) = &slug {
            self.slugs.insert(next.clone(), view_id);
        }
        view.set_slug(slug);
        Ok(view)
    }

    /// Filter by id.
    pub fn filter(&self, filter_id: FilterId) -> ViewResult<&ViewFilter> {
        self.filters
            .get(&filter_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::FilterNotFound(filter_id.get())))
    }

    /// Mutable filter by id.
    pub fn filter_mut(&mut self, filter_id: FilterId) -> ViewResult<&mut ViewFilter> {
        self.filters
            .get_mut(&filter_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::FilterNotFound(filter_id.get())))
    }

    /// Filters of a view in creation order.
    pub fn filters_of(&self, view_id: ViewId) -> Vec<&ViewFilter> {
        self.filters
            .values()
            .filter(|f| *f.view_id() == view_id)
            .collect()
    }

    /// Store a new filter, assigning its id.
    pub fn insert_filter(&mut self, build: impl FnOnce(FilterId) -> ViewFilter) -> &ViewFilter {
        self.last_filter_id += 1;
        let filter_id = FilterId::from(self.last_filter_id);
        self.filters.entry(filter_id).or_insert(build(filter_id))
    }

    /// Remove a filter.
    pub fn remove_filter(&mut self, filter_id: FilterId) -> ViewResult<ViewFilter> {
        self.filters
            .remove(&filter_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::FilterNotFound(filter_id.get())))
    }

    /// Sort by id.
    pub fn sort(&self, sort_id: SortId) -> ViewResult<&ViewSort> {
        self.sorts
            .get(&sort_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::SortNotFound(sort_id.get())))
    }

    /// Mutable sort by id.
    pub fn sort_mut(&mut self, sort_id: SortId) -> ViewResult<&mut ViewSort> {
        self.sorts
            .get_mut(&sort_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::SortNotFound(sort_id.get())))
    }

    /// Sorts of a view in creation order.
    pub fn sorts_of(&self, view_id: ViewId) -> Vec<&ViewSort> {
        self.sorts
            .values()
            .filter(|s| *s.view_id() == view_id)
            .collect()
    }

    /// Sort of a view on a field other than `except`, if any.
    pub fn sort_on_field(
        &self,
        view_id: ViewId,
        field_id: FieldId,
        except: Option<SortId>,
    ) -> Option<&ViewSort> {
        self.sorts.values().find(|s| {
            *s.view_id() == view_id && *s.field_id() == field_id && Some(*s.id()) != except
        })
    }

    /// Store a new sort, assigning its id.
    pub fn insert_sort(&mut self, build: impl FnOnce(SortId) -> ViewSort) -> &ViewSort {
        self.last_sort_id += 1;
        let sort_id = SortId::from(self.last_sort_id);
        self.sorts.entry(sort_id).or_insert(build(sort_id))
    }

    /// Remove a sort.
    pub fn remove_sort(&mut self, sort_id: SortId) -> ViewResult<ViewSort> {
        self.sorts
            .remove(&sort_id)
            .ok_or_else(|| ViewError::new(ViewErrorKind::SortNotFound(sort_id.get())))
    }

    /// Stored field options, `None` when never touched.
    pub fn field_options(&self, view_id: ViewId, field_id: FieldId) -> Option<&FieldOptions> {
        self.field_options.get(&(view_id, field_id))
    }

    /// Stored field options, inserting `create()` when absent.
    pub fn field_options_entry(
        &mut self,
        view_id: ViewId,
        field_id: FieldId,
        create: impl FnOnce() -> FieldOptions,
    ) -> &mut FieldOptions {
        self.field_options
            .entry((view_id, field_id))
            .or_insert_with(create)
    }

    /// Number of stored field option entries of a view.
    pub fn field_options_count(&self, view_id: ViewId) -> usize {
        self.field_options
            .keys()
            .filter(|(v, _)| *v == view_id)
            .count()
    }

    /// Remove every filter, sort and field options entry on a field.
    ///
    /// Returns the number of removed entries.
    pub fn remove_field_references(&mut self, field_id: FieldId) -> usize {
        let before = self.filters.len() + self.sorts.len() + self.field_options.len();
        self.filters.retain(|_, f| *f.field_id() != field_id);
        self.sorts.retain(|_, s| *s.field_id() != field_id);
        self.field_options.retain(|(_, f), _| *f != field_id);
        before - (self.filters.len() + self.sorts.len() + self.field_options.len())
    }
}

/// Shared handle on the persisted state.
#[derive(Debug, Default)]
pub struct ViewStore {
    state: RwLock<Arc<ViewState>>,
}

impl ViewStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent read-only snapshot of the current state.
    pub async fn snapshot(&self) -> Arc<ViewState> {
        Arc::clone(&*self.state.read().await)
    }

    /// Run `apply` against a private copy of the state and publish the copy
    /// only if it returns `Ok`.
    ///
    /// Concurrent transactions are serialised; a failed transaction leaves no
    /// trace.
    pub async fn transaction<T>(
        &self,
        apply: impl FnOnce(&mut ViewState) -> ViewResult<T>,
    ) -> ViewResult<T> {
        let mut guard = self.state.write().await;
        let mut working = ViewState::clone(&guard);
        let result = apply(&mut working);
        match &result {
            Ok(_) => {
                *guard = Arc::new(working);
                trace!("Transaction committed");
            }
            Err(e) => {
                debug!(error = %e, "Transaction rolled back");
            }
        }
        result
    }
}
