//! Trait contract tests for AuditStore.
//!
//! These verify the behavioral contract of the storage port using both the
//! in-memory backend and the SurrealDB backend. Any conforming
//! implementation must pass these.

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

use sitepulse_domain::{
    Alert, AlertId, AlertSeverity, AuditFinding, ChecklistItem, ChecklistStatus, FindingId,
    FindingSource, KeywordRank, MetricsSnapshot, Priority, RankingsSummary, VerificationRecipe,
    WeeklyDigest,
};
use sitepulse_store::{AuditStore, ItemStatusChange, MemoryAuditStore, StoreError,
    SurrealAuditStore};

fn finding(subject: &str, issue_type: &str) -> AuditFinding {
    AuditFinding::new(
        FindingSource::Tracking,
        subject,
        issue_type,
        Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap(),
        json!({"has_tag": false}),
    )
}

fn item(subject: &str) -> ChecklistItem {
    let id = FindingId::compute(FindingSource::Tracking, subject, "missing_tracking_tag");
    ChecklistItem::new(
        id,
        format!("Install GA4 tracking on {subject}"),
        "No tracking tag was detected",
        Priority::Critical,
        VerificationRecipe::manual(),
        Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap(),
    )
}

fn alert(subject: &str, window: &str) -> Alert {
    Alert {
        id: AlertId::compute(FindingSource::Ranking, subject, "ranking", window),
        source: FindingSource::Ranking,
        subject: subject.to_string(),
        metric: "ranking".to_string(),
        severity: AlertSeverity::Warning,
        message: format!("Ranking dropped for {subject}"),
        previous_value: Some(5.0),
        current_value: Some(8.0),
        change: Some("-3 positions".to_string()),
        is_read: false,
        is_actioned: false,
        timestamp: Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap(),
    }
}

// ===========================================================================
// Contract suite (runs against any backend)
// ===========================================================================

async fn finding_upsert_is_last_writer_wins(store: &dyn AuditStore) {
    let f1 = finding("x.example.com", "missing_tracking_tag");
    let mut f2 = finding("x.example.com", "missing_tracking_tag");
    f2.payload = json!({"has_tag": false, "rechecked": true});

    store.put_finding(f1.clone()).await.unwrap();
    store.put_finding(f2.clone()).await.unwrap();

    let stored = store.get_finding(&f1.id).await.unwrap().unwrap();
    assert_eq!(stored.payload, f2.payload, "Newer finding supersedes");
    assert_eq!(store.list_findings().await.unwrap().len(), 1);
}

async fn item_insert_is_create_iff_absent(store: &dyn AuditStore) {
    let i = item("a.example.com");
    assert!(store.insert_item(i.clone()).await.unwrap());
    assert!(!store.insert_item(i.clone()).await.unwrap(), "Second insert is a no-op");

    // Progress survives a repeated insert
    store
        .update_item_status(
            &i.id,
            ChecklistStatus::NotStarted,
            ItemStatusChange {
                status: ChecklistStatus::InProgress,
                diagnosis: Some("tag still missing".to_string()),
                verified_at: None,
            },
        )
        .await
        .unwrap();
    assert!(!store.insert_item(i.clone()).await.unwrap());
    let stored = store.get_item(&i.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ChecklistStatus::InProgress);
    assert_eq!(stored.diagnosis.as_deref(), Some("tag still missing"));
}

async fn item_status_cas_detects_conflicts(store: &dyn AuditStore) {
    let i = item("b.example.com");
    store.insert_item(i.clone()).await.unwrap();

    let err = store
        .update_item_status(
            &i.id,
            ChecklistStatus::Verified,
            ItemStatusChange {
                status: ChecklistStatus::InProgress,
                diagnosis: None,
                verified_at: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::StatusConflict { .. }));

    // Item is untouched after the failed CAS
    let stored = store.get_item(&i.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ChecklistStatus::NotStarted);
}

async fn item_supersede_round_trip(store: &dyn AuditStore) {
    let i = item("c.example.com");
    store.insert_item(i.clone()).await.unwrap();

    let at = Utc.with_ymd_and_hms(2026, 8, 25, 0, 0, 0).unwrap();
    store.mark_item_superseded(&i.id, at).await.unwrap();
    let stored = store.get_item(&i.id).await.unwrap().unwrap();
    assert_eq!(stored.superseded_at, Some(at));

    store.clear_item_superseded(&i.id).await.unwrap();
    let stored = store.get_item(&i.id).await.unwrap().unwrap();
    assert!(stored.superseded_at.is_none());
}

async fn alert_insert_deduplicates(store: &dyn AuditStore) {
    let a = alert("best running shoes", "2026-W35");
    assert!(store.insert_alert(a.clone()).await.unwrap());
    assert!(!store.insert_alert(a.clone()).await.unwrap(), "Same id is the same ongoing issue");
    assert_eq!(store.list_alerts().await.unwrap().len(), 1);
}

async fn alert_flags_mutate_only_explicitly(store: &dyn AuditStore) {
    let a = alert("trail shoes", "2026-W35");
    store.insert_alert(a.clone()).await.unwrap();

    let read = store.mark_alert_read(&a.id).await.unwrap();
    assert!(read.is_read);
    assert!(!read.is_actioned);

    let actioned = store.mark_alert_actioned(&a.id).await.unwrap();
    assert!(actioned.is_read);
    assert!(actioned.is_actioned);

    // Re-inserting the same alert does not reset the flags
    assert!(!store.insert_alert(a.clone()).await.unwrap());
    let stored = store.get_alert(&a.id).await.unwrap().unwrap();
    assert!(stored.is_read && stored.is_actioned);
}

async fn snapshots_newest_first(store: &dyn AuditStore) {
    for day in [20, 21, 22] {
        store
            .put_snapshot(MetricsSnapshot {
                captured_at: Utc.with_ymd_and_hms(2026, 8, day, 0, 0, 0).unwrap(),
                rankings: vec![KeywordRank {
                    keyword: "k".to_string(),
                    position: i64::from(day),
                }],
                organic_sessions: 1000.0,
                total_backlinks: 50,
                finding_summaries: vec![],
            })
            .await
            .unwrap();
    }

    let latest = store.latest_snapshots(2).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert!(latest[0].captured_at > latest[1].captured_at);
    assert_eq!(latest[0].rankings[0].position, 22);
}

async fn digest_upserts_by_week(store: &dyn AuditStore) {
    let week = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
    let mut d = WeeklyDigest {
        week_of: week,
        rankings_summary: RankingsSummary::default(),
        traffic_change_pct: 1.0,
        backlink_net_change: 0,
        highlights: vec![],
        concerns: vec![],
        opportunities: vec![],
        overall_health_change: 1.0,
    };
    store.put_digest(d.clone()).await.unwrap();

    d.traffic_change_pct = -4.0;
    store.put_digest(d.clone()).await.unwrap();

    let stored = store.get_digest(week).await.unwrap().unwrap();
    assert_eq!(stored.traffic_change_pct, -4.0);
    assert_eq!(store.latest_digest().await.unwrap().unwrap().week_of, week);
}

async fn run_suite(store: &dyn AuditStore) {
    finding_upsert_is_last_writer_wins(store).await;
    item_insert_is_create_iff_absent(store).await;
    item_status_cas_detects_conflicts(store).await;
    item_supersede_round_trip(store).await;
    alert_insert_deduplicates(store).await;
    alert_flags_mutate_only_explicitly(store).await;
    snapshots_newest_first(store).await;
    digest_upserts_by_week(store).await;
}

// ===========================================================================
// Backends
// ===========================================================================

#[tokio::test]
async fn test_memory_store_satisfies_contract() {
    let store = MemoryAuditStore::new();
    run_suite(&store).await;
}

#[tokio::test]
async fn test_surreal_store_satisfies_contract() {
    let store = SurrealAuditStore::in_memory().await.unwrap();
    run_suite(&store).await;
}

#[tokio::test]
async fn test_missing_records_report_not_found() {
    let store = MemoryAuditStore::new();
    let id = FindingId::compute(FindingSource::Tracking, "ghost.example.com", "missing_tracking_tag");

    assert!(store.get_item(&id).await.unwrap().is_none());
    let err = store
        .update_item_status(
            &id,
            ChecklistStatus::NotStarted,
            ItemStatusChange {
                status: ChecklistStatus::InProgress,
                diagnosis: None,
                verified_at: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}
