//! End-to-end pipeline scenarios over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;

use sitepulse_domain::{
    sort_items, ChecklistStatus, Priority, ThresholdConfig, VerificationKind,
};
use sitepulse_engine::{
    AuditBatch, FixedOutcomeProvider, IngestPipeline, VerificationEngine,
};
use sitepulse_store::{AuditStore, MemoryAuditStore};

fn batch(value: serde_json::Value) -> AuditBatch {
    serde_json::from_value(value).unwrap()
}

fn monday() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap()
}

#[tokio::test]
async fn test_double_ingestion_creates_nothing_new() {
    let store = MemoryAuditStore::new();
    let config = ThresholdConfig::default();
    let b = batch(json!({
        "tracking": [
            { "domain": "x.example.com", "has_tag": false }
        ],
        "rankings": [
            { "domain": "x.example.com", "keywords": [
                { "keyword": "best shoes", "current_rank": 9, "previous_rank": 5 }
            ]}
        ]
    }));

    let first = IngestPipeline::run(&store, &b, &config, monday()).await.unwrap();
    assert!(first.items_created > 0);
    assert_eq!(first.alerts_created, 1);

    let second = IngestPipeline::run(&store, &b, &config, monday()).await.unwrap();
    assert_eq!(second.items_created, 0);
    assert_eq!(second.alerts_created, 0);

    // The persisted sets did not grow either.
    assert_eq!(store.list_alerts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_tag_produces_critical_install_item() {
    let store = MemoryAuditStore::new();
    let b = batch(json!({
        "tracking": [
            { "domain": "x.example.com", "has_tag": false }
        ]
    }));

    IngestPipeline::run(&store, &b, &ThresholdConfig::default(), monday())
        .await
        .unwrap();

    let items = store.list_items().await.unwrap();
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.title, "Install GA4 tracking on x.example.com");
    assert_eq!(item.priority, Priority::Critical);
    assert_eq!(item.status, ChecklistStatus::NotStarted);
    assert_eq!(item.recipe.kind, VerificationKind::Tracking);
}

#[tokio::test]
async fn test_failing_verification_moves_item_to_in_progress_with_diagnosis() {
    let store = MemoryAuditStore::new();
    let b = batch(json!({
        "tracking": [
            { "domain": "x.example.com", "has_tag": false }
        ]
    }));
    IngestPipeline::run(&store, &b, &ThresholdConfig::default(), monday())
        .await
        .unwrap();
    let item = store.list_items().await.unwrap().remove(0);

    let mut engine = VerificationEngine::new(Duration::from_secs(5));
    engine.register(Arc::new(FixedOutcomeProvider::failing(
        VerificationKind::Tracking,
        "no GA4 snippet found on https://x.example.com/",
    )));

    let outcome = engine.verify(&store, &item.id).await.unwrap();
    assert!(!outcome.result.passed);
    assert_eq!(outcome.item.status, ChecklistStatus::InProgress);
    let diagnosis = outcome.item.diagnosis.as_deref().unwrap_or_default();
    assert!(!diagnosis.is_empty());
}

#[tokio::test]
async fn test_verification_alone_never_completes_an_item() {
    let store = MemoryAuditStore::new();
    let b = batch(json!({
        "tracking": [
            { "domain": "x.example.com", "has_tag": false }
        ]
    }));
    IngestPipeline::run(&store, &b, &ThresholdConfig::default(), monday())
        .await
        .unwrap();
    let item = store.list_items().await.unwrap().remove(0);

    let mut engine = VerificationEngine::new(Duration::from_secs(5));
    engine.register(Arc::new(FixedOutcomeProvider::passing(
        VerificationKind::Tracking,
    )));

    // Repeated passes settle on verified, never completed.
    for _ in 0..3 {
        let outcome = engine.verify(&store, &item.id).await.unwrap();
        assert_ne!(outcome.item.status, ChecklistStatus::Completed);
    }
    let verified = store.get_item(&item.id).await.unwrap().unwrap();
    assert_eq!(verified.status, ChecklistStatus::Verified);
    assert!(verified.verified_at.is_some());

    // Only the explicit confirmation reaches completed.
    let confirmed = engine.confirm(&store, &item.id).await.unwrap();
    assert_eq!(confirmed.status, ChecklistStatus::Completed);
}

#[tokio::test]
async fn test_ranking_drop_threshold_boundary() {
    let b = batch(json!({
        "rankings": [
            { "domain": "x.example.com", "keywords": [
                { "keyword": "best shoes", "current_rank": 8, "previous_rank": 5 }
            ]}
        ]
    }));

    let at_threshold = MemoryAuditStore::new();
    let report = IngestPipeline::run(
        &at_threshold,
        &b,
        &ThresholdConfig {
            ranking_drop_alert: 3,
            ..Default::default()
        },
        monday(),
    )
    .await
    .unwrap();
    assert_eq!(report.alerts_created, 1);
    let alerts = at_threshold.list_alerts().await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].change.as_deref(), Some("-3 positions"));

    let above_threshold = MemoryAuditStore::new();
    let report = IngestPipeline::run(
        &above_threshold,
        &b,
        &ThresholdConfig {
            ranking_drop_alert: 4,
            ..Default::default()
        },
        monday(),
    )
    .await
    .unwrap();
    assert_eq!(report.alerts_created, 0);
    assert!(above_threshold.list_alerts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checklist_ordering_is_stable_across_priorities() {
    let store = MemoryAuditStore::new();
    let b = batch(json!({
        "tracking": [
            { "domain": "x.example.com", "has_tag": false,
              "issues": [ { "code": "duplicate_tag", "description": "two gtag snippets" } ] }
        ],
        "search_console": [
            { "property": "x.example.com", "verified": true, "analytics_linked": false,
              "sitemaps": [ { "path": "/sitemap.xml", "submitted": true, "errors": 2 } ] }
        ]
    }));
    IngestPipeline::run(&store, &b, &ThresholdConfig::default(), monday())
        .await
        .unwrap();

    let mut items = store.list_items().await.unwrap();
    sort_items(&mut items);
    let priorities: Vec<_> = items.iter().map(|i| i.priority).collect();
    let mut expected = priorities.clone();
    expected.sort();
    assert_eq!(priorities, expected, "items must come out priority-ordered");
    assert_eq!(items[0].priority, Priority::Critical);
}

#[tokio::test]
async fn test_rising_rankings_across_two_runs_yield_positive_digest() {
    let store = MemoryAuditStore::new();
    let config = ThresholdConfig::default();

    let week_one = batch(json!({
        "rankings": [
            { "domain": "x.example.com", "keywords": [
                { "keyword": "best shoes", "current_rank": 14 },
                { "keyword": "trail boots", "current_rank": 18 }
            ]}
        ]
    }));
    let week_two = batch(json!({
        "rankings": [
            { "domain": "x.example.com", "keywords": [
                { "keyword": "best shoes", "current_rank": 6, "previous_rank": 14 },
                { "keyword": "trail boots", "current_rank": 9, "previous_rank": 18 }
            ]}
        ]
    }));

    IngestPipeline::run(&store, &week_one, &config, Utc.with_ymd_and_hms(2026, 8, 17, 9, 0, 0).unwrap())
        .await
        .unwrap();
    IngestPipeline::run(&store, &week_two, &config, monday())
        .await
        .unwrap();

    let digest = sitepulse_engine::run_digest(&store)
        .await
        .unwrap()
        .expect("two snapshots recorded");
    assert!(digest.rankings_summary.improved > 0);
    assert_eq!(digest.rankings_summary.declined, 0);
    assert!(digest.overall_health_change > 0.0);
    assert_eq!(
        digest.week_of,
        chrono::NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
    );

    let stored = store.latest_digest().await.unwrap().expect("digest persisted");
    assert_eq!(stored.week_of, digest.week_of);
}

#[tokio::test]
async fn test_vanished_finding_supersedes_item_and_reappearance_revives_it() {
    let store = MemoryAuditStore::new();
    let config = ThresholdConfig::default();
    let with_issue = batch(json!({
        "tracking": [ { "domain": "x.example.com", "has_tag": false } ]
    }));
    let clean = batch(json!({
        "tracking": [ { "domain": "x.example.com", "has_tag": true, "tag_id": "G-ABC123" } ]
    }));

    IngestPipeline::run(&store, &with_issue, &config, monday()).await.unwrap();
    let item = store.list_items().await.unwrap().remove(0);
    assert!(item.superseded_at.is_none());

    let report = IngestPipeline::run(&store, &clean, &config, monday()).await.unwrap();
    assert_eq!(report.items_superseded, 1);
    let item = store.get_item(&item.id).await.unwrap().unwrap();
    assert!(item.superseded_at.is_some());

    IngestPipeline::run(&store, &with_issue, &config, monday()).await.unwrap();
    let item = store.get_item(&item.id).await.unwrap().unwrap();
    assert!(item.superseded_at.is_none(), "reappearing finding revives the item");
}
