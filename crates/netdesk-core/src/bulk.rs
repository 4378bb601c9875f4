// ── Bulk operation executor ──
//
// Fans one mutation per selected id out concurrently, joins every
// outcome (a rejection never aborts its siblings), and turns the final
// multiset of outcomes into a single resolution for the controller.

use std::collections::BTreeSet;
use std::future::Future;

use dashmap::DashSet;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::error::{CoreError, FailedItem};
use crate::model::{Action, EntityKey};

/// Result of the mutation for one id.
#[derive(Debug, Clone)]
pub struct BulkOutcome<Id> {
    pub id: Id,
    pub error: Option<CoreError>,
    /// Not dispatched because the item was already in the target state.
    pub skipped: bool,
}

impl<Id> BulkOutcome<Id> {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

/// How the controller reconciles local state after a bulk action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Everything succeeded and the result is predictable: patch the
    /// loaded rows to `active`, then clear the selection.
    Patch { active: bool },
    /// Everything succeeded but the result shape is server-defined
    /// (deletes): refetch, then clear the selection.
    Resync,
    /// At least one item failed: refetch, keep the selection.
    Recover,
}

/// Aggregate of one bulk action, one outcome per submitted id.
#[derive(Debug, Clone)]
pub struct BulkReport<Id> {
    pub action: Action,
    pub outcomes: Vec<BulkOutcome<Id>>,
}

impl<Id: EntityKey> BulkReport<Id> {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(BulkOutcome::ok)
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BulkOutcome<Id>> {
        self.outcomes.iter().filter(|o| !o.ok())
    }

    pub fn failed_ids(&self) -> Vec<Id> {
        self.failures().map(|o| o.id).collect()
    }

    pub fn succeeded_ids(&self) -> Vec<Id> {
        self.outcomes.iter().filter(|o| o.ok()).map(|o| o.id).collect()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.skipped).count()
    }

    pub fn resolution(&self) -> Resolution {
        if !self.all_succeeded() {
            return Resolution::Recover;
        }
        match self.action.target_active() {
            Some(active) => Resolution::Patch { active },
            None => Resolution::Resync,
        }
    }

    /// Aggregate error for a partial failure, `None` when all succeeded.
    pub fn to_error(&self) -> Option<CoreError> {
        if self.all_succeeded() {
            return None;
        }
        let failures: Vec<FailedItem> = self
            .failures()
            .map(|o| FailedItem {
                id: o.id.to_string(),
                reason: o
                    .error
                    .as_ref()
                    .map_or_else(String::new, ToString::to_string),
            })
            .collect();
        Some(CoreError::PartialBulkFailure {
            action: self.action,
            failed: failures.len(),
            total: self.total(),
            failures,
            resync_error: None,
        })
    }
}

// ── Executor ─────────────────────────────────────────────────────────

/// Dispatches bulk actions, allowing at most one in-flight run per
/// action class.
#[derive(Debug, Default)]
pub struct BulkOperationExecutor {
    in_flight: DashSet<Action>,
}

/// Releases the in-flight slot of an action when dropped.
struct InFlightGuard<'a> {
    set: &'a DashSet<Action>,
    action: Action,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.action);
    }
}

impl BulkOperationExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, action: Action) -> bool {
        self.in_flight.contains(&action)
    }

    /// Run `operation` for every id in `selection` concurrently.
    ///
    /// Ids in `already_done` are not dispatched and count as synthetic
    /// successes. Fails fast, without sending anything, on an empty
    /// selection, a single-row-only action, or a duplicate submission.
    pub async fn execute<Id, F, Fut>(
        &self,
        action: Action,
        selection: &BTreeSet<Id>,
        already_done: &BTreeSet<Id>,
        operation: F,
    ) -> Result<BulkReport<Id>, CoreError>
    where
        Id: EntityKey,
        F: Fn(Id) -> Fut,
        Fut: Future<Output = Result<(), CoreError>>,
    {
        if selection.is_empty() {
            return Err(CoreError::validation("no items selected"));
        }
        if !action.supports_bulk() {
            return Err(CoreError::Unsupported {
                operation: format!("bulk {action}"),
                reason: "this action can only be applied to one item at a time".into(),
            });
        }
        if !self.in_flight.insert(action) {
            return Err(CoreError::BulkInFlight { action });
        }
        let _guard = InFlightGuard {
            set: &self.in_flight,
            action,
        };

        debug!(%action, count = selection.len(), skipped = already_done.len(), "dispatching bulk action");

        let operation = &operation;
        let outcomes = join_all(selection.iter().map(|&id| async move {
            if already_done.contains(&id) {
                return BulkOutcome {
                    id,
                    error: None,
                    skipped: true,
                };
            }
            BulkOutcome {
                id,
                error: operation(id).await.err(),
                skipped: false,
            }
        }))
        .await;

        let report = BulkReport { action, outcomes };
        let failed = report.failures().count();
        if failed == 0 {
            info!(%action, total = report.total(), skipped = report.skipped(), "bulk action succeeded");
        } else {
            warn!(%action, failed, total = report.total(), "bulk action partially failed");
        }
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn ids(list: &[u32]) -> BTreeSet<u32> {
        list.iter().copied().collect()
    }

    fn boom() -> CoreError {
        CoreError::Api {
            message: "boom".into(),
            code: None,
            status: Some(500),
        }
    }

    #[tokio::test]
    async fn empty_selection_sends_nothing() {
        let executor = BulkOperationExecutor::new();
        let calls = AtomicUsize::new(0);
        let result = executor
            .execute(Action::Delete, &ids(&[]), &ids(&[]), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;
        assert!(matches!(result, Err(CoreError::Validation { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reset_password_is_not_bulk_dispatched() {
        let executor = BulkOperationExecutor::new();
        let result = executor
            .execute(Action::ResetPassword, &ids(&[1, 2]), &ids(&[]), |_| async {
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(CoreError::Unsupported { .. })));
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_others() {
        let executor = BulkOperationExecutor::new();
        let calls = AtomicUsize::new(0);
        let report = executor
            .execute(Action::Delete, &ids(&[1, 2, 3]), &ids(&[]), |id| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { if id == 2 { Err(boom()) } else { Ok(()) } }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.total(), 3);
        assert!(!report.all_succeeded());
        assert_eq!(report.failed_ids(), vec![2]);
        assert_eq!(report.succeeded_ids(), vec![1, 3]);
        assert_eq!(report.resolution(), Resolution::Recover);

        match report.to_error().unwrap() {
            CoreError::PartialBulkFailure {
                failed,
                total,
                failures,
                ..
            } => {
                assert_eq!((failed, total), (1, 3));
                assert_eq!(failures[0].id, "2");
            }
            other => panic!("expected PartialBulkFailure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn outcomes_do_not_depend_on_completion_order() {
        let executor = BulkOperationExecutor::new();
        // Later ids finish first.
        let report = executor
            .execute(Action::Deactivate, &ids(&[1, 2, 3]), &ids(&[]), |id| async move {
                tokio::time::sleep(Duration::from_millis(u64::from(10 * (4 - id)))).await;
                Ok(())
            })
            .await
            .unwrap();

        let order: Vec<u32> = report.outcomes.iter().map(|o| o.id).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(report.resolution(), Resolution::Patch { active: false });
    }

    #[tokio::test(start_paused = true)]
    async fn requests_run_concurrently() {
        let executor = BulkOperationExecutor::new();
        let started = tokio::time::Instant::now();
        executor
            .execute(Action::Delete, &ids(&[1, 2, 3, 4]), &ids(&[]), |_| async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await
            .unwrap();
        // Serial dispatch would take four seconds.
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn already_done_ids_are_synthetic_successes() {
        let executor = BulkOperationExecutor::new();
        let calls = AtomicUsize::new(0);
        let report = executor
            .execute(Action::Activate, &ids(&[1, 2, 3]), &ids(&[1, 3]), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.skipped(), 2);
        assert!(report.all_succeeded());
    }

    #[tokio::test]
    async fn delete_success_resolves_to_resync() {
        let executor = BulkOperationExecutor::new();
        let report = executor
            .execute(Action::Delete, &ids(&[5]), &ids(&[]), |_| async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(report.resolution(), Resolution::Resync);
        assert!(report.to_error().is_none());
    }

    #[tokio::test]
    async fn duplicate_submission_is_rejected_but_other_actions_run() {
        let executor = Arc::new(BulkOperationExecutor::new());
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));

        let running = {
            let executor = Arc::clone(&executor);
            let release_rx = Arc::clone(&release_rx);
            tokio::spawn(async move {
                executor
                    .execute(Action::Delete, &ids(&[1]), &ids(&[]), |_| {
                        let release_rx = Arc::clone(&release_rx);
                        async move {
                            let rx = release_rx.lock().await.take();
                            if let Some(rx) = rx {
                                let _ = rx.await;
                            }
                            Ok(())
                        }
                    })
                    .await
            })
        };

        while !executor.is_in_flight(Action::Delete) {
            tokio::task::yield_now().await;
        }

        let duplicate = executor
            .execute(Action::Delete, &ids(&[2]), &ids(&[]), |_| async { Ok(()) })
            .await;
        assert!(matches!(
            duplicate,
            Err(CoreError::BulkInFlight {
                action: Action::Delete
            })
        ));

        let other = executor
            .execute(Action::Activate, &ids(&[2]), &ids(&[]), |_| async { Ok(()) })
            .await;
        assert!(other.is_ok());

        release_tx.send(()).unwrap();
        assert!(running.await.unwrap().is_ok());
        assert!(!executor.is_in_flight(Action::Delete));
    }
}
