//! Digest aggregator
//!
//! Diffs the two most recent metrics snapshots into a [`WeeklyDigest`].
//! Pure given the snapshots; `run_digest` is the store-backed wrapper that
//! loads them and persists the result keyed by ISO-week Monday.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Weekday};
use tracing::{debug, info};

use sitepulse_domain::{
    MetricsSnapshot, Priority, RankingsSummary, WeeklyDigest,
};
use sitepulse_store::AuditStore;

use crate::error::Result;
use crate::normalize::STRIKING_DISTANCE;

/// Minimum traffic swing (percent) worth calling out in a bucket.
const TRAFFIC_NOTEWORTHY_PCT: f64 = 5.0;

/// Monday of the ISO week containing `date`.
pub fn week_of(date: NaiveDate) -> NaiveDate {
    date.week(Weekday::Mon).first_day()
}

/// Diff two snapshots into a digest. `current` must be the newer of the two.
pub fn build_digest(current: &MetricsSnapshot, previous: &MetricsSnapshot) -> WeeklyDigest {
    let rankings_summary = summarize_rankings(current, previous);

    let traffic_change_pct = if previous.organic_sessions > 0.0 {
        (current.organic_sessions - previous.organic_sessions) / previous.organic_sessions * 100.0
    } else {
        0.0
    };

    let backlink_net_change = current.total_backlinks - previous.total_backlinks;

    let previous_ids: HashSet<_> = previous
        .finding_summaries
        .iter()
        .map(|f| f.id.as_str())
        .collect();
    let new_critical: Vec<_> = current
        .finding_summaries
        .iter()
        .filter(|f| f.priority == Priority::Critical && !previous_ids.contains(f.id.as_str()))
        .collect();

    let mut highlights = Vec::new();
    let mut concerns = Vec::new();
    let mut opportunities = Vec::new();

    if rankings_summary.improved > 0 {
        highlights.push(format!(
            "{} keyword(s) improved in ranking",
            rankings_summary.improved
        ));
    }
    if traffic_change_pct >= TRAFFIC_NOTEWORTHY_PCT {
        highlights.push(format!("Organic traffic up {traffic_change_pct:.1}%"));
    }
    if backlink_net_change > 0 {
        highlights.push(format!("Gained {backlink_net_change} backlink(s)"));
    }

    if rankings_summary.declined > 0 {
        concerns.push(format!(
            "{} keyword(s) declined in ranking",
            rankings_summary.declined
        ));
    }
    if traffic_change_pct <= -TRAFFIC_NOTEWORTHY_PCT {
        concerns.push(format!("Organic traffic down {:.1}%", -traffic_change_pct));
    }
    if backlink_net_change < 0 {
        concerns.push(format!("Lost {} backlink(s)", -backlink_net_change));
    }
    for finding in &new_critical {
        concerns.push(format!("New critical issue: {}", finding.issue_type));
    }

    for rank in &current.rankings {
        if STRIKING_DISTANCE.contains(&rank.position) {
            opportunities.push(format!(
                "\"{}\" at #{} is within striking distance of page one",
                rank.keyword, rank.position
            ));
        }
    }

    let overall_health_change = health_change(
        &rankings_summary,
        traffic_change_pct,
        backlink_net_change,
        new_critical.len(),
    );

    WeeklyDigest {
        week_of: week_of(current.captured_at.date_naive()),
        rankings_summary,
        traffic_change_pct,
        backlink_net_change,
        highlights,
        concerns,
        opportunities,
        overall_health_change,
    }
}

/// Load the two most recent snapshots and persist the digest they produce.
/// Returns `None` when fewer than two snapshots exist yet.
pub async fn run_digest(store: &dyn AuditStore) -> Result<Option<WeeklyDigest>> {
    let snapshots = store.latest_snapshots(2).await?;
    let [current, previous] = snapshots.as_slice() else {
        debug!(
            count = snapshots.len(),
            "need two snapshots to build a digest"
        );
        return Ok(None);
    };

    let digest = build_digest(current, previous);
    store.put_digest(digest.clone()).await?;
    info!(
        week_of = %digest.week_of,
        health = digest.overall_health_change,
        "digest persisted"
    );
    Ok(Some(digest))
}

/// Match keywords across the two snapshots; positions count down toward 1,
/// so a negative change is an improvement.
fn summarize_rankings(current: &MetricsSnapshot, previous: &MetricsSnapshot) -> RankingsSummary {
    let prior: HashMap<&str, i64> = previous
        .rankings
        .iter()
        .map(|r| (r.keyword.as_str(), r.position))
        .collect();

    let mut summary = RankingsSummary::default();
    let mut total_change = 0i64;
    let mut matched = 0u32;

    for rank in &current.rankings {
        let Some(&before) = prior.get(rank.keyword.as_str()) else {
            continue;
        };
        matched += 1;
        total_change += rank.position - before;
        match rank.position.cmp(&before) {
            std::cmp::Ordering::Less => summary.improved += 1,
            std::cmp::Ordering::Greater => summary.declined += 1,
            std::cmp::Ordering::Equal => summary.stable += 1,
        }
    }

    if matched > 0 {
        summary.average_change = total_change as f64 / matched as f64;
    }
    summary
}

/// Signed composite over the period's deltas. Each improved keyword counts
/// +1 and each declined -1; traffic and backlink swings are scaled down so
/// a routine week stays near zero; new criticals weigh against.
fn health_change(
    rankings: &RankingsSummary,
    traffic_change_pct: f64,
    backlink_net_change: i64,
    new_critical: usize,
) -> f64 {
    rankings.improved as f64 - rankings.declined as f64
        + traffic_change_pct / 10.0
        + backlink_net_change as f64 / 10.0
        - new_critical as f64 * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sitepulse_domain::KeywordRank;

    fn snapshot(day: u32, positions: &[(&str, i64)], sessions: f64, backlinks: i64) -> MetricsSnapshot {
        MetricsSnapshot {
            captured_at: Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap(),
            rankings: positions
                .iter()
                .map(|(k, p)| KeywordRank {
                    keyword: k.to_string(),
                    position: *p,
                })
                .collect(),
            organic_sessions: sessions,
            total_backlinks: backlinks,
            finding_summaries: Vec::new(),
        }
    }

    #[test]
    fn test_improvements_drive_positive_health() {
        let previous = snapshot(17, &[("shoes", 9), ("boots", 14)], 1000.0, 40);
        let current = snapshot(24, &[("shoes", 4), ("boots", 11)], 1100.0, 43);

        let digest = build_digest(&current, &previous);
        assert_eq!(digest.rankings_summary.improved, 2);
        assert_eq!(digest.rankings_summary.declined, 0);
        assert!(digest.overall_health_change > 0.0);
        assert!(digest.traffic_change_pct > 9.9 && digest.traffic_change_pct < 10.1);
        assert_eq!(digest.backlink_net_change, 3);
        assert!(!digest.highlights.is_empty());
    }

    #[test]
    fn test_declines_drive_negative_health() {
        let previous = snapshot(17, &[("shoes", 4), ("boots", 6)], 1000.0, 40);
        let current = snapshot(24, &[("shoes", 12), ("boots", 15)], 700.0, 35);

        let digest = build_digest(&current, &previous);
        assert_eq!(digest.rankings_summary.declined, 2);
        assert!(digest.overall_health_change < 0.0);
        assert!(digest.concerns.iter().any(|c| c.contains("declined")));
    }

    #[test]
    fn test_striking_distance_keywords_are_opportunities() {
        let previous = snapshot(17, &[("shoes", 12)], 1000.0, 40);
        let current = snapshot(24, &[("shoes", 12)], 1000.0, 40);

        let digest = build_digest(&current, &previous);
        assert_eq!(digest.opportunities.len(), 1);
        assert!(digest.opportunities[0].contains("striking distance"));
        assert_eq!(digest.rankings_summary.stable, 1);
    }

    #[test]
    fn test_zero_previous_traffic_does_not_divide() {
        let previous = snapshot(17, &[], 0.0, 0);
        let current = snapshot(24, &[], 500.0, 0);

        let digest = build_digest(&current, &previous);
        assert_eq!(digest.traffic_change_pct, 0.0);
    }

    #[test]
    fn test_week_of_is_iso_monday() {
        // 2026-08-30 is a Sunday; its ISO week starts Monday the 24th.
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        assert_eq!(week_of(sunday), NaiveDate::from_ymd_opt(2026, 8, 24).unwrap());
    }

    #[tokio::test]
    async fn test_run_digest_needs_two_snapshots() {
        let store = sitepulse_store::MemoryAuditStore::new();
        assert!(run_digest(&store).await.unwrap().is_none());

        store.put_snapshot(snapshot(17, &[("a", 5)], 100.0, 1)).await.unwrap();
        assert!(run_digest(&store).await.unwrap().is_none());

        store.put_snapshot(snapshot(24, &[("a", 3)], 120.0, 2)).await.unwrap();
        let digest = run_digest(&store).await.unwrap().expect("two snapshots present");
        assert_eq!(digest.rankings_summary.improved, 1);

        let stored = store.latest_digest().await.unwrap().expect("digest persisted");
        assert_eq!(stored.week_of, digest.week_of);
    }
}
