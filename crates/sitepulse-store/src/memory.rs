//! In-memory `AuditStore` backed by `Mutex<HashMap>` maps.
//!
//! Doubles as the test backend and as the ephemeral `--store mem` backend
//! in the CLI. Satisfies the full trait contract without any external
//! dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use sitepulse_domain::{
    Alert, AlertId, AuditFinding, ChecklistItem, ChecklistStatus, FindingId, MetricsSnapshot,
    WeeklyDigest,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::{AuditStore, ItemStatusChange};

/// In-memory audit store.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    findings: Mutex<HashMap<String, AuditFinding>>,
    items: Mutex<HashMap<String, ChecklistItem>>,
    alerts: Mutex<HashMap<String, Alert>>,
    snapshots: Mutex<Vec<MetricsSnapshot>>,
    digests: Mutex<HashMap<NaiveDate, WeeklyDigest>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn put_finding(&self, finding: AuditFinding) -> StoreResult<()> {
        let mut findings = self.findings.lock().unwrap();
        findings.insert(finding.id.as_str().to_string(), finding);
        Ok(())
    }

    async fn get_finding(&self, id: &FindingId) -> StoreResult<Option<AuditFinding>> {
        let findings = self.findings.lock().unwrap();
        Ok(findings.get(id.as_str()).cloned())
    }

    async fn list_findings(&self) -> StoreResult<Vec<AuditFinding>> {
        let findings = self.findings.lock().unwrap();
        Ok(findings.values().cloned().collect())
    }

    async fn insert_item(&self, item: ChecklistItem) -> StoreResult<bool> {
        let mut items = self.items.lock().unwrap();
        if items.contains_key(item.id.as_str()) {
            return Ok(false);
        }
        items.insert(item.id.as_str().to_string(), item);
        Ok(true)
    }

    async fn get_item(&self, id: &FindingId) -> StoreResult<Option<ChecklistItem>> {
        let items = self.items.lock().unwrap();
        Ok(items.get(id.as_str()).cloned())
    }

    async fn list_items(&self) -> StoreResult<Vec<ChecklistItem>> {
        let items = self.items.lock().unwrap();
        Ok(items.values().cloned().collect())
    }

    async fn update_item_status(
        &self,
        id: &FindingId,
        expected: ChecklistStatus,
        change: ItemStatusChange,
    ) -> StoreResult<ChecklistItem> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound {
                id: id.as_str().to_string(),
            })?;
        if item.status != expected {
            return Err(StoreError::StatusConflict {
                id: id.as_str().to_string(),
                expected: expected.to_string(),
                actual: item.status.to_string(),
            });
        }
        item.status = change.status;
        item.diagnosis = change.diagnosis;
        if change.verified_at.is_some() {
            item.verified_at = change.verified_at;
        }
        Ok(item.clone())
    }

    async fn mark_item_superseded(&self, id: &FindingId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound {
                id: id.as_str().to_string(),
            })?;
        if item.superseded_at.is_none() {
            item.superseded_at = Some(at);
        }
        Ok(())
    }

    async fn clear_item_superseded(&self, id: &FindingId) -> StoreResult<()> {
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound {
                id: id.as_str().to_string(),
            })?;
        item.superseded_at = None;
        Ok(())
    }

    async fn insert_alert(&self, alert: Alert) -> StoreResult<bool> {
        let mut alerts = self.alerts.lock().unwrap();
        if alerts.contains_key(alert.id.as_str()) {
            return Ok(false);
        }
        alerts.insert(alert.id.as_str().to_string(), alert);
        Ok(true)
    }

    async fn get_alert(&self, id: &AlertId) -> StoreResult<Option<Alert>> {
        let alerts = self.alerts.lock().unwrap();
        Ok(alerts.get(id.as_str()).cloned())
    }

    async fn list_alerts(&self) -> StoreResult<Vec<Alert>> {
        let alerts = self.alerts.lock().unwrap();
        Ok(alerts.values().cloned().collect())
    }

    async fn mark_alert_read(&self, id: &AlertId) -> StoreResult<Alert> {
        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound {
                id: id.as_str().to_string(),
            })?;
        alert.is_read = true;
        Ok(alert.clone())
    }

    async fn mark_alert_actioned(&self, id: &AlertId) -> StoreResult<Alert> {
        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound {
                id: id.as_str().to_string(),
            })?;
        alert.is_actioned = true;
        Ok(alert.clone())
    }

    async fn put_snapshot(&self, snapshot: MetricsSnapshot) -> StoreResult<()> {
        let mut snapshots = self.snapshots.lock().unwrap();
        snapshots.push(snapshot);
        snapshots.sort_by_key(|s| s.captured_at);
        Ok(())
    }

    async fn latest_snapshots(&self, limit: usize) -> StoreResult<Vec<MetricsSnapshot>> {
        let snapshots = self.snapshots.lock().unwrap();
        Ok(snapshots.iter().rev().take(limit).cloned().collect())
    }

    async fn put_digest(&self, digest: WeeklyDigest) -> StoreResult<()> {
        let mut digests = self.digests.lock().unwrap();
        digests.insert(digest.week_of, digest);
        Ok(())
    }

    async fn get_digest(&self, week_of: NaiveDate) -> StoreResult<Option<WeeklyDigest>> {
        let digests = self.digests.lock().unwrap();
        Ok(digests.get(&week_of).cloned())
    }

    async fn latest_digest(&self) -> StoreResult<Option<WeeklyDigest>> {
        let digests = self.digests.lock().unwrap();
        Ok(digests
            .values()
            .max_by_key(|d| d.week_of)
            .cloned())
    }
}
