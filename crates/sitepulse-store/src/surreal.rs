//! SurrealDB-backed `AuditStore` implementation
//!
//! Uses the row structs in [`crate::schema`] for persistence, converting
//! to/from domain types at the boundary. SurrealDB assigns the record id;
//! lookups go through the hash columns (`finding_id`, `item_id`,
//! `alert_id`). Compare-and-set status updates are expressed as
//! conditional `UPDATE ... WHERE item_id AND status` so a concurrent
//! verification or user action can never be clobbered.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use sitepulse_domain::{
    Alert, AlertId, AuditFinding, ChecklistItem, ChecklistStatus, FindingId, MetricsSnapshot,
    WeeklyDigest,
};

use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::schema::{week_key, AlertRow, DigestRow, FindingRow, ItemRow, SnapshotRow};
use crate::traits::{AuditStore, ItemStatusChange};

/// SurrealDB-backed implementation of [`AuditStore`].
pub struct SurrealAuditStore {
    db: Surreal<Any>,
}

impl SurrealAuditStore {
    /// Create an in-memory instance (`mem://`), mainly for tests.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("mem://").await
    }

    /// Connect using the environment:
    /// - `SURREALDB_URL` if set,
    /// - otherwise local persistence at `surrealkv://.sitepulse/db`.
    pub async fn from_env() -> StoreResult<Self> {
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            return Self::connect(&url).await;
        }

        let path = ".sitepulse/db";
        std::fs::create_dir_all(path).map_err(|e| {
            StoreError::Connection(format!("Failed to create database directory {path}: {e}"))
        })?;
        let url = format!("surrealkv://{path}");
        info!("No SURREALDB_URL set, using local persistence: {}", url);
        Self::connect(&url).await
    }

    /// Connect to an explicit endpoint, select `sitepulse/main`, and run
    /// schema initialization.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect to {url}: {e}")))?;

        db.use_ns("sitepulse")
            .use_db("main")
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealAuditStore connected ({})", url);
        Ok(Self { db })
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_one<R>(&self, table: &str, key_col: &str, key: &str) -> StoreResult<Option<R>>
    where
        R: serde::de::DeserializeOwned,
    {
        let key_owned = key.to_string();
        let mut res = self
            .db
            .query(format!("SELECT * FROM {table} WHERE {key_col} = $key"))
            .bind(("key", key_owned))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let rows: Vec<R> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    /// Upsert a row keyed by a hash column: UPDATE CONTENT if present,
    /// CREATE if not.
    async fn upsert_row<R>(&self, table: &str, key_col: &str, key: &str, row: R) -> StoreResult<()>
    where
        R: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let existing: Option<R> = self.fetch_one(table, key_col, key).await?;
        let key_owned = key.to_string();

        if existing.is_some() {
            self.db
                .query(format!("UPDATE {table} CONTENT $row WHERE {key_col} = $key"))
                .bind(("row", row))
                .bind(("key", key_owned))
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        } else {
            let _created: Option<R> = self
                .db
                .create(table.to_string())
                .content(row)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    async fn fetch_item_row(&self, id: &FindingId) -> StoreResult<ItemRow> {
        self.fetch_one("checklist_items", "item_id", id.as_str())
            .await?
            .ok_or_else(|| StoreError::NotFound {
                id: id.as_str().to_string(),
            })
    }
}

#[async_trait]
impl AuditStore for SurrealAuditStore {
    async fn put_finding(&self, finding: AuditFinding) -> StoreResult<()> {
        let row = FindingRow::from(finding);
        let key = row.finding_id.clone();
        debug!(id = %key, issue_type = %row.issue_type, "upserting finding");
        self.upsert_row("findings", "finding_id", &key, row).await
    }

    async fn get_finding(&self, id: &FindingId) -> StoreResult<Option<AuditFinding>> {
        let row: Option<FindingRow> =
            self.fetch_one("findings", "finding_id", id.as_str()).await?;
        row.map(AuditFinding::try_from).transpose()
    }

    async fn list_findings(&self) -> StoreResult<Vec<AuditFinding>> {
        let mut res = self
            .db
            .query("SELECT * FROM findings ORDER BY detected_at ASC")
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<FindingRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(AuditFinding::try_from).collect()
    }

    async fn insert_item(&self, item: ChecklistItem) -> StoreResult<bool> {
        let existing: Option<ItemRow> = self
            .fetch_one("checklist_items", "item_id", item.id.as_str())
            .await?;
        if existing.is_some() {
            return Ok(false);
        }
        let row = ItemRow::try_from(item)?;
        debug!(id = %row.item_id, title = %row.title, "creating checklist item");
        let _created: Option<ItemRow> = self
            .db
            .create("checklist_items")
            .content(row)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(true)
    }

    async fn get_item(&self, id: &FindingId) -> StoreResult<Option<ChecklistItem>> {
        let row: Option<ItemRow> = self
            .fetch_one("checklist_items", "item_id", id.as_str())
            .await?;
        row.map(ChecklistItem::try_from).transpose()
    }

    async fn list_items(&self) -> StoreResult<Vec<ChecklistItem>> {
        let mut res = self
            .db
            .query("SELECT * FROM checklist_items ORDER BY created_at ASC")
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<ItemRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(ChecklistItem::try_from).collect()
    }

    async fn update_item_status(
        &self,
        id: &FindingId,
        expected: ChecklistStatus,
        change: ItemStatusChange,
    ) -> StoreResult<ChecklistItem> {
        // Build the full updated row, then apply it conditionally on the
        // expected status so a concurrent writer loses cleanly.
        let mut row = self.fetch_item_row(id).await?;
        row.status = change.status.to_string();
        row.diagnosis = change.diagnosis;
        if change.verified_at.is_some() {
            row.verified_at = change.verified_at;
        }

        let id_owned = id.as_str().to_string();
        let expected_owned = expected.to_string();
        let mut res = self
            .db
            .query(
                "UPDATE checklist_items CONTENT $row \
                 WHERE item_id = $id AND status = $expected RETURN AFTER",
            )
            .bind(("row", row))
            .bind(("id", id_owned))
            .bind(("expected", expected_owned))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let rows: Vec<ItemRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match rows.into_iter().next() {
            Some(updated) => ChecklistItem::try_from(updated),
            None => {
                // Lost the race (or the status changed since the fetch).
                let current = self.fetch_item_row(id).await?;
                Err(StoreError::StatusConflict {
                    id: id.as_str().to_string(),
                    expected: expected.to_string(),
                    actual: current.status,
                })
            }
        }
    }

    async fn mark_item_superseded(&self, id: &FindingId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut row = self.fetch_item_row(id).await?;
        if row.superseded_at.is_some() {
            return Ok(());
        }
        row.superseded_at = Some(at);
        let id_owned = id.as_str().to_string();
        self.db
            .query("UPDATE checklist_items CONTENT $row WHERE item_id = $id")
            .bind(("row", row))
            .bind(("id", id_owned))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn clear_item_superseded(&self, id: &FindingId) -> StoreResult<()> {
        let mut row = self.fetch_item_row(id).await?;
        row.superseded_at = None;
        let id_owned = id.as_str().to_string();
        self.db
            .query("UPDATE checklist_items CONTENT $row WHERE item_id = $id")
            .bind(("row", row))
            .bind(("id", id_owned))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn insert_alert(&self, alert: Alert) -> StoreResult<bool> {
        let existing: Option<AlertRow> = self
            .fetch_one("alerts", "alert_id", alert.id.as_str())
            .await?;
        if existing.is_some() {
            return Ok(false);
        }
        let row = AlertRow::from(alert);
        debug!(id = %row.alert_id, severity = %row.severity, "creating alert");
        let _created: Option<AlertRow> = self
            .db
            .create("alerts")
            .content(row)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(true)
    }

    async fn get_alert(&self, id: &AlertId) -> StoreResult<Option<Alert>> {
        let row: Option<AlertRow> = self.fetch_one("alerts", "alert_id", id.as_str()).await?;
        row.map(Alert::try_from).transpose()
    }

    async fn list_alerts(&self) -> StoreResult<Vec<Alert>> {
        let mut res = self
            .db
            .query("SELECT * FROM alerts ORDER BY timestamp ASC")
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<AlertRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(Alert::try_from).collect()
    }

    async fn mark_alert_read(&self, id: &AlertId) -> StoreResult<Alert> {
        let id_owned = id.as_str().to_string();
        let mut res = self
            .db
            .query("UPDATE alerts SET is_read = true WHERE alert_id = $id RETURN AFTER")
            .bind(("id", id_owned))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<AlertRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                id: id.as_str().to_string(),
            })
            .and_then(Alert::try_from)
    }

    async fn mark_alert_actioned(&self, id: &AlertId) -> StoreResult<Alert> {
        let id_owned = id.as_str().to_string();
        let mut res = self
            .db
            .query("UPDATE alerts SET is_actioned = true WHERE alert_id = $id RETURN AFTER")
            .bind(("id", id_owned))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<AlertRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                id: id.as_str().to_string(),
            })
            .and_then(Alert::try_from)
    }

    async fn put_snapshot(&self, snapshot: MetricsSnapshot) -> StoreResult<()> {
        let row = SnapshotRow::try_from(snapshot)?;
        let _created: Option<SnapshotRow> = self
            .db
            .create("snapshots")
            .content(row)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn latest_snapshots(&self, limit: usize) -> StoreResult<Vec<MetricsSnapshot>> {
        let mut res = self
            .db
            .query("SELECT * FROM snapshots ORDER BY captured_at DESC LIMIT $limit")
            .bind(("limit", limit as i64))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<SnapshotRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().map(MetricsSnapshot::try_from).collect()
    }

    async fn put_digest(&self, digest: WeeklyDigest) -> StoreResult<()> {
        let row = DigestRow::try_from(digest)?;
        let key = row.week_of.clone();

        let existing: Option<DigestRow> = {
            let key_owned = key.clone();
            let mut res = self
                .db
                .query("SELECT * FROM digests WHERE week_of = $week")
                .bind(("week", key_owned))
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let rows: Vec<DigestRow> = res
                .take(0)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            rows.into_iter().next()
        };

        if existing.is_some() {
            self.db
                .query("UPDATE digests CONTENT $row WHERE week_of = $week")
                .bind(("row", row))
                .bind(("week", key))
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        } else {
            let _created: Option<DigestRow> = self
                .db
                .create("digests")
                .content(row)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    async fn get_digest(&self, week_of: NaiveDate) -> StoreResult<Option<WeeklyDigest>> {
        let key = week_key(week_of);
        let mut res = self
            .db
            .query("SELECT * FROM digests WHERE week_of = $week")
            .bind(("week", key))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<DigestRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().next().map(WeeklyDigest::try_from).transpose()
    }

    async fn latest_digest(&self) -> StoreResult<Option<WeeklyDigest>> {
        let mut res = self
            .db
            .query("SELECT * FROM digests ORDER BY week_of DESC LIMIT 1")
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<DigestRow> = res
            .take(0)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        rows.into_iter().next().map(WeeklyDigest::try_from).transpose()
    }
}
