//! Storage port for the audit engine
//!
//! One trait, `AuditStore`, covering the five persisted families: findings,
//! checklist items, alerts, metrics snapshots, and weekly digests. All keys
//! are deterministic content hashes (or the digest week), which is what
//! makes repeated ingestion idempotent at the storage boundary.
//!
//! Write semantics:
//! - Findings upsert with last-writer-wins (a newer finding supersedes).
//! - Checklist items and alerts are create-iff-absent; nothing in the
//!   engine can overwrite an existing item's progress or an alert's flags.
//! - Checklist status changes go through compare-and-set so a concurrent
//!   verification or user action is never clobbered.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use sitepulse_domain::{
    Alert, AlertId, AuditFinding, ChecklistItem, ChecklistStatus, FindingId, MetricsSnapshot,
    WeeklyDigest,
};

use crate::error::StoreResult;

/// Status mutation applied through compare-and-set.
///
/// `diagnosis: None` clears any stored diagnosis (a pass wipes the failure
/// trail); `verified_at` is set only on a successful verification.
#[derive(Debug, Clone)]
pub struct ItemStatusChange {
    pub status: ChecklistStatus,
    pub diagnosis: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
}

/// Abstract persistence port.
///
/// Guarantees every backend must uphold:
/// - `insert_item` / `insert_alert` return `false` (and change nothing)
///   when a record with that id already exists.
/// - `update_item_status` fails with `StoreError::StatusConflict` when the
///   item's current status differs from `expected`.
/// - A record is either fully stored or absent; partial writes are never
///   observable.
#[async_trait]
pub trait AuditStore: Send + Sync {
    // -- findings -----------------------------------------------------------

    /// Upsert a finding (last-writer-wins; newer findings supersede).
    async fn put_finding(&self, finding: AuditFinding) -> StoreResult<()>;

    async fn get_finding(&self, id: &FindingId) -> StoreResult<Option<AuditFinding>>;

    async fn list_findings(&self) -> StoreResult<Vec<AuditFinding>>;

    // -- checklist items ----------------------------------------------------

    /// Create an item iff no item with its id exists. Returns whether the
    /// item was created. Never resets an existing item's status.
    async fn insert_item(&self, item: ChecklistItem) -> StoreResult<bool>;

    async fn get_item(&self, id: &FindingId) -> StoreResult<Option<ChecklistItem>>;

    async fn list_items(&self) -> StoreResult<Vec<ChecklistItem>>;

    /// Compare-and-set status transition. Returns the updated item.
    async fn update_item_status(
        &self,
        id: &FindingId,
        expected: ChecklistStatus,
        change: ItemStatusChange,
    ) -> StoreResult<ChecklistItem>;

    /// Mark an item's originating finding as gone from the latest run.
    async fn mark_item_superseded(&self, id: &FindingId, at: DateTime<Utc>) -> StoreResult<()>;

    /// Clear the superseded mark (the finding reappeared).
    async fn clear_item_superseded(&self, id: &FindingId) -> StoreResult<()>;

    // -- alerts -------------------------------------------------------------

    /// Create an alert iff no alert with its id exists. Returns whether the
    /// alert was created.
    async fn insert_alert(&self, alert: Alert) -> StoreResult<bool>;

    async fn get_alert(&self, id: &AlertId) -> StoreResult<Option<Alert>>;

    async fn list_alerts(&self) -> StoreResult<Vec<Alert>>;

    /// Explicit user action; never called by ingestion.
    async fn mark_alert_read(&self, id: &AlertId) -> StoreResult<Alert>;

    /// Explicit user action; never called by ingestion.
    async fn mark_alert_actioned(&self, id: &AlertId) -> StoreResult<Alert>;

    // -- metrics snapshots --------------------------------------------------

    async fn put_snapshot(&self, snapshot: MetricsSnapshot) -> StoreResult<()>;

    /// The `limit` most recent snapshots, newest first.
    async fn latest_snapshots(&self, limit: usize) -> StoreResult<Vec<MetricsSnapshot>>;

    // -- weekly digests -----------------------------------------------------

    /// Upsert the digest for its `week_of` (recomputation replaces).
    async fn put_digest(&self, digest: WeeklyDigest) -> StoreResult<()>;

    async fn get_digest(&self, week_of: NaiveDate) -> StoreResult<Option<WeeklyDigest>>;

    async fn latest_digest(&self) -> StoreResult<Option<WeeklyDigest>>;
}
