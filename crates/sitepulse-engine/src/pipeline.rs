//! Ingestion pipeline
//!
//! Drives one batch through normalize → classify → persist findings →
//! generate checklist → evaluate alerts → record snapshot. Every write is
//! keyed by a deterministic id and each record is fully formed before it is
//! stored, so a cancelled run leaves no partial records and a repeated run
//! creates nothing new.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sitepulse_domain::{FindingSummary, MetricsSnapshot, ThresholdConfig};
use sitepulse_store::AuditStore;

use crate::alerts;
use crate::checklist;
use crate::classify::classify_all;
use crate::error::Result;
use crate::normalize::normalize_batch;
use crate::obs;
use crate::sources::AuditBatch;

/// Summary of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub run_id: String,
    pub findings_total: usize,
    pub findings_skipped: usize,
    pub items_created: usize,
    pub items_superseded: usize,
    pub alerts_created: usize,
    pub duration_ms: u64,
}

pub struct IngestPipeline;

impl IngestPipeline {
    /// Run one batch end to end at `now`.
    pub async fn run(
        store: &dyn AuditStore,
        batch: &AuditBatch,
        config: &ThresholdConfig,
        now: DateTime<Utc>,
    ) -> Result<IngestReport> {
        let run_id = Uuid::new_v4().to_string();
        let _span = obs::RunSpan::enter(&run_id);
        let started = Instant::now();

        let sources = batch.tracking.len()
            + batch.search_console.len()
            + batch.backlinks.len()
            + batch.rankings.len();
        obs::emit_run_started(&run_id, sources);

        let normalized = normalize_batch(batch, now);
        obs::emit_batch_normalized(&run_id, normalized.findings.len(), normalized.skipped);

        let classified = classify_all(normalized.findings);

        for cf in &classified {
            store.put_finding(cf.finding.clone()).await?;
        }

        let generation = checklist::generate(store, &classified, now).await?;
        obs::emit_checklist_reconciled(
            &run_id,
            generation.created.len(),
            generation.superseded,
            generation.revived,
        );

        let evaluation = alerts::evaluate(store, &classified, config).await?;
        obs::emit_alerts_evaluated(&run_id, evaluation.created.len(), evaluation.ongoing);

        let snapshot = MetricsSnapshot {
            captured_at: now,
            rankings: normalized.metrics.rankings,
            organic_sessions: normalized.metrics.organic_sessions.unwrap_or(0.0),
            total_backlinks: normalized.metrics.total_backlinks,
            finding_summaries: classified
                .iter()
                .map(|cf| FindingSummary {
                    id: cf.finding.id.clone(),
                    issue_type: cf.finding.issue_type.clone(),
                    priority: cf.priority,
                })
                .collect(),
        };
        store.put_snapshot(snapshot).await?;

        let findings_total = classified.len();
        let duration_ms = started.elapsed().as_millis() as u64;
        obs::emit_run_finished(&run_id, duration_ms, findings_total);

        Ok(IngestReport {
            run_id,
            findings_total,
            findings_skipped: normalized.skipped,
            items_created: generation.created.len(),
            items_superseded: generation.superseded,
            alerts_created: evaluation.created.len(),
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use sitepulse_store::MemoryAuditStore;

    fn tracking_batch() -> AuditBatch {
        serde_json::from_value(json!({
            "tracking": [
                { "domain": "x.example.com", "has_tag": false, "tag_id": null, "issues": [] }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_second_run_creates_nothing() {
        let store = MemoryAuditStore::new();
        let batch = tracking_batch();
        let config = ThresholdConfig::default();
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap();

        let first = IngestPipeline::run(&store, &batch, &config, now).await.unwrap();
        assert_eq!(first.items_created, 1);

        let second = IngestPipeline::run(&store, &batch, &config, now).await.unwrap();
        assert_eq!(second.items_created, 0);
        assert_eq!(second.alerts_created, 0);
        assert_eq!(second.findings_total, first.findings_total);
    }

    #[tokio::test]
    async fn test_empty_batch_still_records_a_snapshot() {
        let store = MemoryAuditStore::new();
        let batch = AuditBatch::default();
        let now = Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap();

        let report = IngestPipeline::run(&store, &batch, &ThresholdConfig::default(), now)
            .await
            .unwrap();
        assert_eq!(report.findings_total, 0);

        let snapshots = store.latest_snapshots(10).await.unwrap();
        assert_eq!(snapshots.len(), 1);
    }
}
