// ── Resource controller ──
//
// Facade that a resource screen talks to. Owns the selection and
// pagination state for one collection, performs the backend I/O, and
// publishes a `ViewSnapshot` after every change. State is only touched
// through the named operations below; the lock is never held across a
// backend call.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::backend::ResourceBackend;
use crate::bulk::{BulkOperationExecutor, BulkReport, Resolution};
use crate::config::ViewConfig;
use crate::error::CoreError;
use crate::export::{self, Artifact, ExportScope, Exporter};
use crate::model::{Action, Entity, PageQuery};
use crate::pagination::{FetchOutcome, FetchTicket, PaginationController};
use crate::selection::{ClickMode, Modifiers, SelectionModel};
use crate::stream::{ViewSnapshot, ViewStream};

/// Mutable state of one view, guarded as a unit.
struct ViewState<T: Entity> {
    selection: SelectionModel<T::Id>,
    pagination: PaginationController<T>,
}

/// Selectable, paginated view over one server collection.
///
/// Cheaply cloneable via `Arc<ControllerInner>`; clones share state, so
/// overlapping operations from different tasks see one consistent view.
pub struct ResourceController<T: Entity, B: ResourceBackend<T>> {
    inner: Arc<ControllerInner<T, B>>,
}

impl<T: Entity, B: ResourceBackend<T>> Clone for ResourceController<T, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<T: Entity, B> {
    resource: String,
    config: ViewConfig,
    backend: B,
    state: Mutex<ViewState<T>>,
    executor: BulkOperationExecutor,
    view_tx: watch::Sender<Arc<ViewSnapshot<T>>>,
}

impl<T: Entity, B: ResourceBackend<T>> ResourceController<T, B> {
    /// Create a controller. Nothing is fetched until [`load`](Self::load)
    /// or another query operation is called.
    pub fn new(resource: impl Into<String>, backend: B, config: ViewConfig) -> Self {
        let pagination = PaginationController::new(config.page_size, config.max_page_size);
        let (view_tx, _) = watch::channel(Arc::new(ViewSnapshot::initial(
            pagination.query().clone(),
        )));

        Self {
            inner: Arc::new(ControllerInner {
                resource: resource.into(),
                config,
                backend,
                state: Mutex::new(ViewState {
                    selection: SelectionModel::new(),
                    pagination,
                }),
                executor: BulkOperationExecutor::new(),
                view_tx,
            }),
        }
    }

    pub fn resource(&self) -> &str {
        &self.inner.resource
    }

    pub fn config(&self) -> &ViewConfig {
        &self.inner.config
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<ViewSnapshot<T>> {
        self.inner.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> ViewStream<T> {
        ViewStream::new(self.inner.view_tx.subscribe())
    }

    pub fn is_busy(&self, action: Action) -> bool {
        self.inner.executor.is_in_flight(action)
    }

    // ── Queries (inbound UI events) ──────────────────────────────────

    /// Initial fetch of the configured first page.
    pub async fn load(&self) -> Result<FetchOutcome, CoreError> {
        self.refresh().await
    }

    /// Refetch the current query as it stands when this runs.
    pub async fn refresh(&self) -> Result<FetchOutcome, CoreError> {
        self.fetch_with(|state| Ok(state.pagination.refresh())).await
    }

    pub async fn on_search(&self, term: &str) -> Result<FetchOutcome, CoreError> {
        self.fetch_with(|state| {
            let ticket = state.pagination.set_search_term(term);
            state.selection.invalidate_anchor();
            Ok(ticket)
        })
        .await
    }

    pub async fn on_page_change(&self, page: u32) -> Result<FetchOutcome, CoreError> {
        self.fetch_with(|state| {
            let ticket = state.pagination.go_to_page(page)?;
            state.selection.invalidate_anchor();
            Ok(ticket)
        })
        .await
    }

    pub async fn on_page_size_change(&self, size: u32) -> Result<FetchOutcome, CoreError> {
        self.fetch_with(|state| {
            let ticket = state.pagination.set_page_size(size)?;
            state.selection.invalidate_anchor();
            Ok(ticket)
        })
        .await
    }

    // ── Selection (inbound UI events) ────────────────────────────────

    /// Row click. Shift takes precedence over ctrl when both are held.
    pub async fn on_item_click(&self, id: T::Id, modifiers: Modifiers) {
        let mut state = self.inner.state.lock().await;
        if modifiers.shift {
            let order = state.pagination.visible_ids();
            state.selection.select_range(id, &order);
        } else if modifiers.ctrl {
            state.selection.toggle_independent(id);
        } else {
            match self.inner.config.click_mode {
                ClickMode::Toggle => state.selection.toggle(id),
                ClickMode::Replace => state.selection.select_only(id),
            }
        }
        self.publish(&state);
    }

    /// Header checkbox: select every row on the visible page.
    pub async fn select_all_visible(&self) {
        let mut state = self.inner.state.lock().await;
        let order = state.pagination.visible_ids();
        state.selection.select_all(&order);
        self.publish(&state);
    }

    pub async fn deselect_all_visible(&self) {
        let mut state = self.inner.state.lock().await;
        let order = state.pagination.visible_ids();
        state.selection.deselect_all(&order);
        self.publish(&state);
    }

    pub async fn clear_selection(&self) {
        let mut state = self.inner.state.lock().await;
        state.selection.clear();
        self.publish(&state);
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Apply `action` to every selected id.
    ///
    /// On full success the selection is cleared and the view is either
    /// patched locally (activate/deactivate) or refetched (delete, or any
    /// action while a page fetch is in flight). On a partial failure the
    /// view is refetched, the selection is kept for a retry, and
    /// `CoreError::PartialBulkFailure` is returned, carrying the refetch
    /// error too when the view could not be refreshed.
    pub async fn on_bulk_action(&self, action: Action) -> Result<BulkReport<T::Id>, CoreError> {
        let (selection, already_done) = {
            let state = self.inner.state.lock().await;
            let selection = state.selection.selected().clone();
            let already_done = already_in_target_state(&state, &selection, action);
            (selection, already_done)
        };

        let backend = &self.inner.backend;
        let report = self
            .inner
            .executor
            .execute(action, &selection, &already_done, |id| {
                backend.mutate(id, action)
            })
            .await?;

        match report.resolution() {
            Resolution::Patch { active } => {
                if !self.patch_active(&report.succeeded_ids(), active).await {
                    self.resync_after(action).await;
                }
                self.clear_selection().await;
                Ok(report)
            }
            Resolution::Resync => {
                self.resync_after(action).await;
                self.clear_selection().await;
                Ok(report)
            }
            Resolution::Recover => {
                let resync_error = self.resync_after(action).await;
                let err = report
                    .to_error()
                    .unwrap_or_else(|| CoreError::Internal("recover without failures".into()))
                    .with_resync_error(resync_error);
                self.record_error(err.clone()).await;
                Err(err)
            }
        }
    }

    /// Apply `action` to a single row, outside the selection.
    ///
    /// This is the only way to run single-row-only actions such as
    /// [`Action::ResetPassword`].
    pub async fn run_action(&self, id: T::Id, action: Action) -> Result<(), CoreError> {
        debug!(resource = %self.inner.resource, %id, %action, "running single-row action");
        match self.inner.backend.mutate(id, action).await {
            Ok(()) => {
                let patched = match action.target_active() {
                    Some(active) => self.patch_active(&[id], active).await,
                    None => false,
                };
                if !patched {
                    self.resync_after(action).await;
                }
                if action == Action::Delete {
                    let mut state = self.inner.state.lock().await;
                    state.selection.deselect(id);
                    self.publish(&state);
                }
                Ok(())
            }
            Err(err) => {
                warn!(resource = %self.inner.resource, %id, %action, error = %err, "single-row action failed");
                self.resync_after(action).await;
                self.record_error(err.clone()).await;
                Err(err)
            }
        }
    }

    // ── Export ───────────────────────────────────────────────────────

    /// Serialize the rows currently on screen. Never fetches; in a
    /// multi-page view the artifact covers the visible page only (see
    /// [`Artifact::scope`]).
    pub async fn export_current_view(
        &self,
        exporter: &dyn Exporter<T>,
    ) -> Result<Artifact, CoreError> {
        let page = {
            let state = self.inner.state.lock().await;
            state.pagination.current().cloned()
        };
        let Some(page) = page else {
            return Err(CoreError::validation("nothing loaded to export"));
        };

        match export::export_page(&self.inner.resource, &page, exporter) {
            Ok(artifact) => Ok(artifact),
            Err(err) => {
                self.record_error(err.clone()).await;
                Err(err)
            }
        }
    }

    /// Fetch every row matching the current search (up to the configured
    /// export limit) in one dedicated request and serialize it. The
    /// visible page and selection are not touched.
    pub async fn export_all(&self, exporter: &dyn Exporter<T>) -> Result<Artifact, CoreError> {
        let query = {
            let state = self.inner.state.lock().await;
            let limit = u64::from(self.inner.config.export_limit.max(1));
            let known = state
                .pagination
                .current()
                .map_or(limit, |page| page.total_count().clamp(1, limit));
            PageQuery {
                page: 1,
                page_size: u32::try_from(known).unwrap_or(u32::MAX),
                search: state.pagination.query().search.clone(),
            }
        };

        debug!(resource = %self.inner.resource, page_size = query.page_size, "fetching full export");
        let page = self
            .inner
            .backend
            .fetch_page(&query)
            .await
            .map_err(|e| e.into_fetch(query.page))?;

        let scope = ExportScope::All {
            total_count: page.total_count(),
        };
        let artifact =
            export::build_artifact(&self.inner.resource, page.items(), scope, exporter)?;
        if u64::try_from(artifact.rows).unwrap_or(u64::MAX) < page.total_count() {
            warn!(
                rows = artifact.rows,
                total = page.total_count(),
                "export truncated at the configured limit"
            );
        }
        Ok(artifact)
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Issue a ticket under the lock, fetch without it, then apply.
    ///
    /// If the applied page lies past the new last page (rows vanished),
    /// the last page is fetched instead.
    async fn fetch_with<F>(&self, issue: F) -> Result<FetchOutcome, CoreError>
    where
        F: FnOnce(&mut ViewState<T>) -> Result<FetchTicket, CoreError>,
    {
        let mut ticket = {
            let mut state = self.inner.state.lock().await;
            let ticket = issue(&mut state)?;
            self.publish(&state);
            ticket
        };

        loop {
            debug!(resource = %self.inner.resource, seq = ticket.seq, query = ?ticket.query, "fetching page");
            let result = self.inner.backend.fetch_page(&ticket.query).await;

            let mut state = self.inner.state.lock().await;
            let outcome = state.pagination.apply(&ticket, result);
            let next = match outcome {
                FetchOutcome::Applied { ordering_changed } => {
                    if ordering_changed {
                        state.selection.invalidate_anchor();
                    }
                    state.pagination.overflow_ticket()
                }
                FetchOutcome::Failed => {
                    if let Some(err) = state.pagination.error() {
                        warn!(resource = %self.inner.resource, error = %err, "page fetch failed");
                    }
                    None
                }
                FetchOutcome::Superseded => None,
            };
            self.publish(&state);

            match next {
                Some(overflow) => ticket = overflow,
                None => {
                    return match outcome {
                        FetchOutcome::Failed => Err(state
                            .pagination
                            .error()
                            .cloned()
                            .unwrap_or_else(|| CoreError::Internal("fetch failed".into()))),
                        other => Ok(other),
                    };
                }
            }
        }
    }

    /// Refetch after a mutation. The outcome is already published; a
    /// failing refetch leaves its error in the snapshot and returns it.
    async fn resync_after(&self, action: Action) -> Option<CoreError> {
        let err = self.refresh().await.err()?;
        warn!(resource = %self.inner.resource, %action, error = %err, "resync after mutation failed");
        Some(err)
    }

    /// Patch the loaded rows in place. Returns `false` when the caller
    /// must refetch instead: a row rejected the patch, or a fetch is in
    /// flight whose response may predate the mutation and would replace
    /// the patched page.
    async fn patch_active(&self, ids: &[T::Id], active: bool) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.pagination.is_loading() {
            debug!(resource = %self.inner.resource, "fetch in flight, resyncing instead of patching");
            return false;
        }
        let patched = state
            .pagination
            .patch_items(ids, |item| item.set_active(active));
        if patched {
            info!(resource = %self.inner.resource, count = ids.len(), active, "patched rows locally");
            self.publish(&state);
        }
        patched
    }

    async fn record_error(&self, err: CoreError) {
        let mut state = self.inner.state.lock().await;
        state.pagination.set_error(err);
        self.publish(&state);
    }

    fn publish(&self, state: &ViewState<T>) {
        let snapshot = ViewSnapshot {
            query: state.pagination.query().clone(),
            page: state.pagination.current().cloned(),
            selected: state.selection.selected_ids(),
            anchor: state.selection.anchor(),
            error: state.pagination.error().cloned(),
            loading: state.pagination.is_loading(),
        };
        self.inner.view_tx.send_replace(Arc::new(snapshot));
    }
}

/// Selected ids whose loaded row already has the action's target flag.
fn already_in_target_state<T: Entity>(
    state: &ViewState<T>,
    selection: &BTreeSet<T::Id>,
    action: Action,
) -> BTreeSet<T::Id> {
    let (Some(target), Some(page)) = (action.target_active(), state.pagination.current()) else {
        return BTreeSet::new();
    };
    page.items()
        .iter()
        .filter(|item| selection.contains(&item.id()) && item.active() == Some(target))
        .map(Entity::id)
        .collect()
}
