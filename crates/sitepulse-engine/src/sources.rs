//! External auditor result shapes
//!
//! These structs mirror the payloads the per-source auditors emit; the
//! engine consumes them read-only. An [`AuditBatch`] carries each source's
//! records as raw JSON values so that one malformed record can be skipped
//! with a warning instead of failing the whole batch (see
//! [`crate::normalize`]).

use serde::{Deserialize, Serialize};

/// One ingestion batch: whatever the auditors produced this run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditBatch {
    #[serde(default)]
    pub tracking: Vec<serde_json::Value>,

    #[serde(default)]
    pub search_console: Vec<serde_json::Value>,

    #[serde(default)]
    pub backlinks: Vec<serde_json::Value>,

    #[serde(default)]
    pub rankings: Vec<serde_json::Value>,
}

impl AuditBatch {
    pub fn is_empty(&self) -> bool {
        self.tracking.is_empty()
            && self.search_console.is_empty()
            && self.backlinks.is_empty()
            && self.rankings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Site-tracking audit
// ---------------------------------------------------------------------------

/// Per-domain tracking audit result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingAuditResult {
    pub domain: String,

    pub has_tag: bool,

    #[serde(default)]
    pub tag_id: Option<String>,

    #[serde(default)]
    pub issues: Vec<TrackingIssue>,

    /// Session counts for the current and prior window, when the auditor
    /// had analytics access. The engine never fetches analytics itself.
    #[serde(default)]
    pub traffic: Option<TrafficWindow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingIssue {
    /// Stable code, e.g. `no_conversion_events`, `duplicate_tag`.
    pub code: String,

    pub description: String,

    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficWindow {
    pub current_sessions: f64,
    pub previous_sessions: f64,
}

// ---------------------------------------------------------------------------
// Search-console audit
// ---------------------------------------------------------------------------

/// Per-property search-console audit result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConsoleAuditResult {
    pub property: String,

    pub verified: bool,

    #[serde(default)]
    pub analytics_linked: bool,

    #[serde(default)]
    pub sitemaps: Vec<SitemapStatus>,

    #[serde(default)]
    pub coverage_issues: Vec<CoverageIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapStatus {
    pub path: String,
    pub submitted: bool,
    #[serde(default)]
    pub errors: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageIssue {
    pub page: String,

    /// Issue label as reported by search console, e.g. "Not indexed".
    pub issue_type: String,

    #[serde(default)]
    pub affected_count: u32,
}

// ---------------------------------------------------------------------------
// Backlink audit
// ---------------------------------------------------------------------------

/// Per-domain backlink audit result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklinkAuditResult {
    pub domain: String,

    #[serde(default)]
    pub links: Vec<BacklinkRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklinkRecord {
    pub source_url: String,

    /// 0-100; higher is worse.
    pub spam_score: u8,

    /// 0-100 authority of the linking domain.
    pub domain_authority: u8,

    #[serde(default)]
    pub recommendation: Option<LinkRecommendation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRecommendation {
    Keep,
    Monitor,
    Disavow,
}

// ---------------------------------------------------------------------------
// Ranking snapshot
// ---------------------------------------------------------------------------

/// Per-domain keyword ranking snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub domain: String,

    #[serde(default)]
    pub keywords: Vec<KeywordRanking>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordRanking {
    pub keyword: String,

    /// Position in search results; lower is better.
    pub current_rank: i64,

    #[serde(default)]
    pub previous_rank: Option<i64>,

    /// Domains observed ranking for this keyword.
    #[serde(default)]
    pub competitors: Vec<String>,
}
