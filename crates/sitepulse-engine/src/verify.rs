//! Verification engine
//!
//! Executes verification recipes against pluggable providers and advances
//! each checklist item's state machine:
//!
//! ```text
//! not_started -> in_progress -> { verified | blocked }
//! verified    -> in_progress   (only via a failed re-check)
//! any         -> completed     (only via explicit manual confirmation)
//! ```
//!
//! The engine knows nothing about *how* a check is performed; providers
//! own that. It only maps a boolean outcome onto state transitions, and
//! writes them through the store's compare-and-set so a concurrent
//! verification or user action is never clobbered. Provider failures and
//! timeouts are recorded as failed results with a diagnosis, never raised
//! as fatal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};

use sitepulse_domain::{
    ChecklistItem, ChecklistStatus, FindingId, VerificationKind, VerificationResult,
};
use sitepulse_store::{AuditStore, ItemStatusChange};

use crate::error::{EngineError, Result};

/// Executes one kind of verification check.
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    /// Which recipe kind this provider handles.
    fn kind(&self) -> VerificationKind;

    /// Run the check. An `Err` is treated as a failed check, not a fatal
    /// error.
    async fn check(&self, item: &ChecklistItem) -> anyhow::Result<VerificationResult>;
}

/// Pure transition function for the checklist state machine.
///
/// Total over (status, outcome); `completed` is terminal and `blocked`
/// stays blocked on failure (blocking is an operator decision that a
/// failed automated check must not silently revert).
pub fn next_status(current: ChecklistStatus, passed: bool) -> ChecklistStatus {
    use ChecklistStatus::*;
    match (current, passed) {
        (Completed, _) => Completed,
        (_, true) => Verified,
        (Blocked, false) => Blocked,
        (NotStarted | InProgress | Verified, false) => InProgress,
    }
}

/// Result of verifying one item: the stored item after the transition plus
/// the ephemeral provider result.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub item: ChecklistItem,
    pub result: VerificationResult,
}

/// Dispatches verification recipes to registered providers and applies
/// state transitions.
pub struct VerificationEngine {
    providers: HashMap<VerificationKind, Arc<dyn VerificationProvider>>,
    timeout: Duration,
}

impl VerificationEngine {
    pub fn new(timeout: Duration) -> Self {
        VerificationEngine {
            providers: HashMap::new(),
            timeout,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn VerificationProvider>) {
        self.providers.insert(provider.kind(), provider);
    }

    /// Verify one item and advance its state.
    pub async fn verify(
        &self,
        store: &dyn AuditStore,
        id: &FindingId,
    ) -> Result<VerificationOutcome> {
        let item = store
            .get_item(id)
            .await?
            .ok_or_else(|| EngineError::ItemNotFound {
                id: id.as_str().to_string(),
            })?;

        if item.status.is_terminal() {
            return Ok(VerificationOutcome {
                result: VerificationResult::pass(vec![
                    "item already completed; no check performed".to_string(),
                ]),
                item,
            });
        }

        let result = self.run_check(&item).await;
        let new_status = next_status(item.status, result.passed);

        let change = if result.passed {
            ItemStatusChange {
                status: new_status,
                diagnosis: None,
                verified_at: Some(Utc::now()),
            }
        } else {
            ItemStatusChange {
                status: new_status,
                diagnosis: result.diagnosis.clone(),
                verified_at: None,
            }
        };

        let updated = store.update_item_status(id, item.status, change).await?;

        crate::obs::emit_item_verified(id.short(), item.recipe.kind.as_str(), result.passed);

        Ok(VerificationOutcome {
            item: updated,
            result,
        })
    }

    /// Verify many items in parallel. Each item's transition is local to
    /// its own record, so failures are isolated per item.
    pub async fn verify_all(
        &self,
        store: &dyn AuditStore,
        ids: &[FindingId],
    ) -> Vec<(FindingId, Result<VerificationOutcome>)> {
        let futures = ids.iter().map(|id| async move {
            let outcome = self.verify(store, id).await;
            (id.clone(), outcome)
        });
        join_all(futures).await
    }

    /// Explicit external confirmation: any non-completed state moves to
    /// `completed`. This is the only path into `completed`, used for items
    /// whose recipe is `manual`.
    pub async fn confirm(&self, store: &dyn AuditStore, id: &FindingId) -> Result<ChecklistItem> {
        let item = store
            .get_item(id)
            .await?
            .ok_or_else(|| EngineError::ItemNotFound {
                id: id.as_str().to_string(),
            })?;

        if item.status.is_terminal() {
            return Ok(item);
        }

        let updated = store
            .update_item_status(
                id,
                item.status,
                ItemStatusChange {
                    status: ChecklistStatus::Completed,
                    diagnosis: None,
                    verified_at: item.verified_at,
                },
            )
            .await?;
        info!(id = %id.short(), "item manually confirmed complete");
        Ok(updated)
    }

    /// Operator marks an item blocked with a reason.
    pub async fn block(
        &self,
        store: &dyn AuditStore,
        id: &FindingId,
        reason: &str,
    ) -> Result<ChecklistItem> {
        let item = store
            .get_item(id)
            .await?
            .ok_or_else(|| EngineError::ItemNotFound {
                id: id.as_str().to_string(),
            })?;

        if item.status.is_terminal() {
            return Err(EngineError::ItemCompleted {
                operation: "block".to_string(),
                id: id.as_str().to_string(),
            });
        }

        let updated = store
            .update_item_status(
                id,
                item.status,
                ItemStatusChange {
                    status: ChecklistStatus::Blocked,
                    diagnosis: Some(reason.to_string()),
                    verified_at: item.verified_at,
                },
            )
            .await?;
        Ok(updated)
    }

    /// Run the provider check, converting every failure mode into a
    /// `passed: false` result with a non-empty diagnosis.
    async fn run_check(&self, item: &ChecklistItem) -> VerificationResult {
        if item.recipe.kind == VerificationKind::Manual {
            return VerificationResult::fail(
                "this item requires manual confirmation; use confirm once the fix is in place",
                vec!["manual recipe: no automated check available".to_string()],
            );
        }

        let Some(provider) = self.providers.get(&item.recipe.kind) else {
            warn!(kind = %item.recipe.kind, "no verification provider registered");
            return VerificationResult::fail(
                format!("no verification provider registered for {}", item.recipe.kind),
                vec![],
            );
        };

        match tokio::time::timeout(self.timeout, provider.check(item)).await {
            Ok(Ok(mut result)) => {
                if !result.passed && result.diagnosis.is_none() {
                    result.diagnosis =
                        Some("verification failed without a specific diagnosis".to_string());
                }
                result
            }
            Ok(Err(e)) => VerificationResult::fail(
                format!("verification provider error: {e}"),
                vec![],
            ),
            Err(_) => VerificationResult::fail(
                format!(
                    "verification timed out after {}s",
                    self.timeout.as_secs()
                ),
                vec![],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table_matches_design() {
        use ChecklistStatus::*;

        assert_eq!(next_status(NotStarted, true), Verified);
        assert_eq!(next_status(NotStarted, false), InProgress);
        assert_eq!(next_status(InProgress, true), Verified);
        assert_eq!(next_status(InProgress, false), InProgress);
        assert_eq!(next_status(Verified, true), Verified);
        assert_eq!(next_status(Verified, false), InProgress);
        assert_eq!(next_status(Blocked, true), Verified);
        assert_eq!(next_status(Blocked, false), Blocked);
        assert_eq!(next_status(Completed, true), Completed);
        assert_eq!(next_status(Completed, false), Completed);
    }

    #[test]
    fn test_verify_never_reaches_completed() {
        use ChecklistStatus::*;
        // completed is only reachable via confirm(); no boolean outcome
        // from any non-terminal state lands there.
        for status in [NotStarted, InProgress, Verified, Blocked] {
            for passed in [true, false] {
                assert_ne!(next_status(status, passed), Completed);
            }
        }
    }
}
