//! Finding normalizer
//!
//! Converts each auditor's native result shape into [`AuditFinding`]s with
//! deterministic ids. Pure function of its input: no store access, no
//! clock reads (the ingestion timestamp is passed in).
//!
//! Error policy: one malformed source record is skipped with a warning and
//! counted, never fatal. Duplicate ids inside one batch keep the first
//! record and warn; the existing record wins.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::warn;

use sitepulse_domain::{AuditFinding, FindingSource, KeywordRank, Priority};

use crate::sources::{
    AuditBatch, BacklinkAuditResult, LinkRecommendation, RankingSnapshot,
    SearchConsoleAuditResult, TrackingAuditResult,
};

/// Spam score at or above which a backlink counts as toxic.
const TOXIC_SPAM_SCORE: u8 = 60;

/// Domain authority below which a linking domain counts as low-authority.
const LOW_AUTHORITY_DA: u8 = 20;

/// Rank range considered "striking distance" of page one.
pub(crate) const STRIKING_DISTANCE: std::ops::RangeInclusive<i64> = 11..=20;

/// Output of one normalization pass.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub findings: Vec<AuditFinding>,

    /// Records skipped because they failed to parse.
    pub skipped: usize,

    /// Aggregate metrics observed while parsing, used for the run's
    /// [`sitepulse_domain::MetricsSnapshot`].
    pub metrics: BatchMetrics,
}

#[derive(Debug, Default)]
pub struct BatchMetrics {
    pub rankings: Vec<KeywordRank>,
    pub organic_sessions: Option<f64>,
    pub total_backlinks: i64,
}

/// Normalize a whole batch. Malformed records are skipped, duplicates
/// deduplicated (first wins).
pub fn normalize_batch(batch: &AuditBatch, detected_at: DateTime<Utc>) -> NormalizedBatch {
    let mut out = NormalizedBatch::default();
    let mut raw = Vec::new();

    for value in &batch.tracking {
        match serde_json::from_value::<TrackingAuditResult>(value.clone()) {
            Ok(r) => {
                raw.extend(normalize_tracking(&r, detected_at, &mut out.metrics));
            }
            Err(e) => {
                warn!(source = "tracking", error = %e, "skipping malformed audit record");
                out.skipped += 1;
            }
        }
    }

    for value in &batch.search_console {
        match serde_json::from_value::<SearchConsoleAuditResult>(value.clone()) {
            Ok(r) => raw.extend(normalize_search_console(&r, detected_at)),
            Err(e) => {
                warn!(source = "search-console", error = %e, "skipping malformed audit record");
                out.skipped += 1;
            }
        }
    }

    for value in &batch.backlinks {
        match serde_json::from_value::<BacklinkAuditResult>(value.clone()) {
            Ok(r) => {
                out.metrics.total_backlinks += r.links.len() as i64;
                raw.extend(normalize_backlinks(&r, detected_at));
            }
            Err(e) => {
                warn!(source = "backlink", error = %e, "skipping malformed audit record");
                out.skipped += 1;
            }
        }
    }

    for value in &batch.rankings {
        match serde_json::from_value::<RankingSnapshot>(value.clone()) {
            Ok(r) => {
                out.metrics.rankings.extend(r.keywords.iter().map(|k| KeywordRank {
                    keyword: k.keyword.clone(),
                    position: k.current_rank,
                }));
                raw.extend(normalize_rankings(&r, detected_at));
            }
            Err(e) => {
                warn!(source = "ranking", error = %e, "skipping malformed audit record");
                out.skipped += 1;
            }
        }
    }

    // Intra-batch dedup: first finding wins; conflicting content warns.
    let mut seen: HashMap<String, usize> = HashMap::new();
    for finding in raw {
        match seen.get(finding.id.as_str()) {
            None => {
                seen.insert(finding.id.as_str().to_string(), out.findings.len());
                out.findings.push(finding);
            }
            Some(&idx) => {
                if out.findings[idx].payload != finding.payload {
                    warn!(
                        id = %finding.id.short(),
                        issue_type = %finding.issue_type,
                        "duplicate finding id with conflicting content; keeping first"
                    );
                }
            }
        }
    }

    out
}

/// Map a tracking audit to findings (and pick up the traffic window).
pub fn normalize_tracking(
    audit: &TrackingAuditResult,
    detected_at: DateTime<Utc>,
    metrics: &mut BatchMetrics,
) -> Vec<AuditFinding> {
    let mut findings = Vec::new();

    if !audit.has_tag {
        findings.push(
            AuditFinding::new(
                FindingSource::Tracking,
                &audit.domain,
                "missing_tracking_tag",
                detected_at,
                json!({ "has_tag": false, "tag_id": audit.tag_id }),
            )
            .with_severity_hint(Priority::Critical),
        );
    }

    for issue in &audit.issues {
        findings.push(AuditFinding::new(
            FindingSource::Tracking,
            &audit.domain,
            format!("tracking_issue.{}", issue.code),
            detected_at,
            json!({ "description": issue.description, "severity": issue.severity }),
        ));
    }

    if let Some(traffic) = &audit.traffic {
        metrics.organic_sessions =
            Some(metrics.organic_sessions.unwrap_or(0.0) + traffic.current_sessions);

        if traffic.previous_sessions > 0.0 && traffic.current_sessions < traffic.previous_sessions {
            let change_pct = (traffic.current_sessions - traffic.previous_sessions)
                / traffic.previous_sessions
                * 100.0;
            findings.push(AuditFinding::new(
                FindingSource::Tracking,
                &audit.domain,
                "traffic_drop",
                detected_at,
                json!({
                    "previous_sessions": traffic.previous_sessions,
                    "current_sessions": traffic.current_sessions,
                    "change_pct": change_pct,
                }),
            ));
        }
    }

    findings
}

/// Map a search-console audit to findings.
pub fn normalize_search_console(
    audit: &SearchConsoleAuditResult,
    detected_at: DateTime<Utc>,
) -> Vec<AuditFinding> {
    let mut findings = Vec::new();

    if !audit.verified {
        findings.push(
            AuditFinding::new(
                FindingSource::SearchConsole,
                &audit.property,
                "property_not_verified",
                detected_at,
                json!({ "verified": false }),
            )
            .with_severity_hint(Priority::Critical),
        );
    }

    for sitemap in &audit.sitemaps {
        if sitemap.errors > 0 || !sitemap.submitted {
            // Two properties can submit the same sitemap path; the subject
            // must carry the property so their findings stay distinct.
            findings.push(AuditFinding::new(
                FindingSource::SearchConsole,
                format!("{}{}", audit.property, sitemap.path),
                "sitemap_errors",
                detected_at,
                json!({
                    "property": audit.property,
                    "path": sitemap.path,
                    "submitted": sitemap.submitted,
                    "errors": sitemap.errors,
                }),
            ));
        }
    }

    for issue in &audit.coverage_issues {
        findings.push(AuditFinding::new(
            FindingSource::SearchConsole,
            &issue.page,
            format!("coverage.{}", slugify(&issue.issue_type)),
            detected_at,
            json!({
                "property": audit.property,
                "issue": issue.issue_type,
                "affected_count": issue.affected_count,
            }),
        ));
    }

    if audit.verified && !audit.analytics_linked {
        findings.push(AuditFinding::new(
            FindingSource::SearchConsole,
            &audit.property,
            "analytics_not_linked",
            detected_at,
            json!({ "analytics_linked": false }),
        ));
    }

    findings
}

/// Map a backlink audit to findings.
pub fn normalize_backlinks(
    audit: &BacklinkAuditResult,
    detected_at: DateTime<Utc>,
) -> Vec<AuditFinding> {
    let mut findings = Vec::new();

    for link in &audit.links {
        let toxic = link.spam_score >= TOXIC_SPAM_SCORE
            || link.recommendation == Some(LinkRecommendation::Disavow);
        if toxic {
            findings.push(AuditFinding::new(
                FindingSource::Backlink,
                &link.source_url,
                "toxic_backlink",
                detected_at,
                json!({
                    "target_domain": audit.domain,
                    "spam_score": link.spam_score,
                    "domain_authority": link.domain_authority,
                    "recommendation": link.recommendation,
                }),
            ));
        }
    }

    // Informational: the profile skews toward low-authority domains.
    let low = audit
        .links
        .iter()
        .filter(|l| l.domain_authority < LOW_AUTHORITY_DA)
        .count();
    if audit.links.len() >= 5 && low * 2 > audit.links.len() {
        findings.push(AuditFinding::new(
            FindingSource::Backlink,
            &audit.domain,
            "low_authority_profile",
            detected_at,
            json!({ "low_authority_links": low, "total_links": audit.links.len() }),
        ));
    }

    findings
}

/// Map a ranking snapshot to findings.
pub fn normalize_rankings(
    snapshot: &RankingSnapshot,
    detected_at: DateTime<Utc>,
) -> Vec<AuditFinding> {
    let mut findings = Vec::new();

    for kw in &snapshot.keywords {
        if let Some(previous) = kw.previous_rank {
            if kw.current_rank > previous {
                findings.push(AuditFinding::new(
                    FindingSource::Ranking,
                    &kw.keyword,
                    "ranking_drop",
                    detected_at,
                    json!({
                        "domain": snapshot.domain,
                        "previous_rank": previous,
                        "current_rank": kw.current_rank,
                        "dropped": kw.current_rank - previous,
                    }),
                ));
            } else if kw.current_rank < previous {
                findings.push(AuditFinding::new(
                    FindingSource::Ranking,
                    &kw.keyword,
                    "ranking_gain",
                    detected_at,
                    json!({
                        "domain": snapshot.domain,
                        "previous_rank": previous,
                        "current_rank": kw.current_rank,
                        "gained": previous - kw.current_rank,
                    }),
                ));
            }
        }

        if STRIKING_DISTANCE.contains(&kw.current_rank) {
            findings.push(AuditFinding::new(
                FindingSource::Ranking,
                &kw.keyword,
                "striking_distance",
                detected_at,
                json!({ "domain": snapshot.domain, "current_rank": kw.current_rank }),
            ));
        }

        for competitor in &kw.competitors {
            findings.push(AuditFinding::new(
                FindingSource::Competitor,
                competitor,
                "new_competitor",
                detected_at,
                json!({ "keyword": kw.keyword, "domain": snapshot.domain }),
            ));
        }
    }

    findings
}

/// Lowercase, alphanumeric-and-underscore slug for issue-type suffixes.
fn slugify(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
