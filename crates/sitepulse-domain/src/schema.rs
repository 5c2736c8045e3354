//! Domain schema definitions
//!
//! All records are serializable; findings and alerts are content-addressed
//! (SHA-256 of their semantic identity, see [`crate::id`]) so that repeated
//! ingestion of unchanged auditor output yields byte-identical ids.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::{AlertId, FindingId};

// ============================================================================
// 1. SOURCES AND PRIORITY
// ============================================================================

/// Which auditor produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingSource {
    Tracking,
    SearchConsole,
    Backlink,
    Ranking,
    Competitor,
}

impl FindingSource {
    /// Stable string form used in id hashing and storage rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingSource::Tracking => "tracking",
            FindingSource::SearchConsole => "search-console",
            FindingSource::Backlink => "backlink",
            FindingSource::Ranking => "ranking",
            FindingSource::Competitor => "competitor",
        }
    }
}

impl std::fmt::Display for FindingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FindingSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tracking" => Ok(FindingSource::Tracking),
            "search-console" => Ok(FindingSource::SearchConsole),
            "backlink" => Ok(FindingSource::Backlink),
            "ranking" => Ok(FindingSource::Ranking),
            "competitor" => Ok(FindingSource::Competitor),
            other => Err(DomainError::UnknownLabel {
                kind: "source".to_string(),
                label: other.to_string(),
            }),
        }
    }
}

/// Urgency tier for checklist items and findings.
///
/// This enum is the single source of truth for priority ordering: variants
/// are declared most-urgent first, so the derived `Ord` sorts critical
/// before high before medium before low. Consumers sort via this ordinal
/// and never define their own mapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Ordinal position: critical = 0, low = 3.
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Critical => write!(f, "critical"),
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(DomainError::UnknownLabel {
                kind: "priority".to_string(),
                label: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// 2. AUDIT FINDING - one normalized observation
// ============================================================================

/// One normalized problem/observation from any auditor.
///
/// Findings are never mutated; a newer finding with the same id supersedes
/// the stored one on the next ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditFinding {
    /// Deterministic id: SHA-256 of (source, subject, issue_type).
    pub id: FindingId,

    /// Auditor that produced this finding.
    pub source: FindingSource,

    /// What the finding is about (domain, URL, or keyword).
    pub subject: String,

    /// Stable machine-readable issue type, e.g. `missing_tracking_tag`.
    pub issue_type: String,

    /// Severity suggested by the source auditor. Advisory only; the
    /// priority classifier's rule table is authoritative.
    pub severity_hint: Option<Priority>,

    /// When the auditor observed the problem.
    pub detected_at: DateTime<Utc>,

    /// Source-specific details (previous/current rank, spam score, ...).
    pub payload: serde_json::Value,
}

impl AuditFinding {
    /// Create a finding and compute its deterministic id.
    pub fn new(
        source: FindingSource,
        subject: impl Into<String>,
        issue_type: impl Into<String>,
        detected_at: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        let subject = subject.into();
        let issue_type = issue_type.into();
        let id = FindingId::compute(source, &subject, &issue_type);
        AuditFinding {
            id,
            source,
            subject,
            issue_type,
            severity_hint: None,
            detected_at,
            payload,
        }
    }

    /// Attach the severity suggested by the source auditor.
    pub fn with_severity_hint(mut self, hint: Priority) -> Self {
        self.severity_hint = Some(hint);
        self
    }
}

// ============================================================================
// 3. CHECKLIST ITEM - actionable remediation task
// ============================================================================

/// Lifecycle state of a checklist item.
///
/// Transitions happen only through the verification engine:
/// `not_started -> in_progress -> { verified | blocked }`, with `verified`
/// regressing to `in_progress` only when an explicit re-check fails.
/// `completed` is terminal and reachable only via external manual
/// confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    NotStarted,
    InProgress,
    Verified,
    Completed,
    Blocked,
}

impl ChecklistStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecklistStatus::NotStarted => "not_started",
            ChecklistStatus::InProgress => "in_progress",
            ChecklistStatus::Verified => "verified",
            ChecklistStatus::Completed => "completed",
            ChecklistStatus::Blocked => "blocked",
        }
    }

    /// Completed items never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChecklistStatus::Completed)
    }
}

impl std::fmt::Display for ChecklistStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChecklistStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(ChecklistStatus::NotStarted),
            "in_progress" => Ok(ChecklistStatus::InProgress),
            "verified" => Ok(ChecklistStatus::Verified),
            "completed" => Ok(ChecklistStatus::Completed),
            "blocked" => Ok(ChecklistStatus::Blocked),
            other => Err(DomainError::UnknownLabel {
                kind: "status".to_string(),
                label: other.to_string(),
            }),
        }
    }
}

/// How to check whether an item's underlying issue is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKind {
    Tracking,
    Conversion,
    GscVerification,
    Manual,
}

impl VerificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationKind::Tracking => "tracking",
            VerificationKind::Conversion => "conversion",
            VerificationKind::GscVerification => "gsc_verification",
            VerificationKind::Manual => "manual",
        }
    }
}

impl std::fmt::Display for VerificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verification type plus parameters.
///
/// Params use a `BTreeMap` so the serialized form is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecipe {
    pub kind: VerificationKind,
    pub params: BTreeMap<String, String>,
}

impl VerificationRecipe {
    pub fn new(kind: VerificationKind) -> Self {
        VerificationRecipe {
            kind,
            params: BTreeMap::new(),
        }
    }

    /// Fallback recipe for findings with no mapped verification.
    pub fn manual() -> Self {
        Self::new(VerificationKind::Manual)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// An actionable remediation task derived from exactly one finding (1:1 id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Same id as the originating finding.
    pub id: FindingId,

    pub title: String,

    pub description: String,

    pub priority: Priority,

    pub status: ChecklistStatus,

    pub recipe: VerificationRecipe,

    /// Why the last verification attempt failed (cleared on pass).
    pub diagnosis: Option<String>,

    /// When the item last passed verification.
    pub verified_at: Option<DateTime<Utc>>,

    /// Set when the originating finding disappeared from a later run.
    /// Items are never deleted; a reappearing finding clears this.
    pub superseded_at: Option<DateTime<Utc>>,

    /// When the finding first detected the underlying problem.
    pub detected_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl ChecklistItem {
    /// Create a fresh item in `not_started`.
    pub fn new(
        id: FindingId,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
        recipe: VerificationRecipe,
        detected_at: DateTime<Utc>,
    ) -> Self {
        ChecklistItem {
            id,
            title: title.into(),
            description: description.into(),
            priority,
            status: ChecklistStatus::NotStarted,
            recipe,
            diagnosis: None,
            verified_at: None,
            superseded_at: None,
            detected_at,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of one verification attempt. Ephemeral: produced per invocation
/// and not persisted beyond updating the linked checklist item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub passed: bool,

    /// What was checked, step by step.
    pub details: Vec<String>,

    /// Why it failed (when `passed` is false).
    pub diagnosis: Option<String>,

    pub recommended_fix: Option<String>,
}

impl VerificationResult {
    pub fn pass(details: Vec<String>) -> Self {
        VerificationResult {
            passed: true,
            details,
            diagnosis: None,
            recommended_fix: None,
        }
    }

    pub fn fail(diagnosis: impl Into<String>, details: Vec<String>) -> Self {
        VerificationResult {
            passed: false,
            details,
            diagnosis: Some(diagnosis.into()),
            recommended_fix: None,
        }
    }

    pub fn with_recommended_fix(mut self, fix: impl Into<String>) -> Self {
        self.recommended_fix = Some(fix.into());
        self
    }
}

// ============================================================================
// 4. ALERT - threshold-crossing change
// ============================================================================

/// Severity of a reported change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
    Success,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "critical",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Info => "info",
            AlertSeverity::Success => "success",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(AlertSeverity::Critical),
            "warning" => Ok(AlertSeverity::Warning),
            "info" => Ok(AlertSeverity::Info),
            "success" => Ok(AlertSeverity::Success),
            other => Err(DomainError::UnknownLabel {
                kind: "severity".to_string(),
                label: other.to_string(),
            }),
        }
    }
}

/// A reported change requiring attention.
///
/// `is_read`/`is_actioned` are mutated only by explicit user action; an
/// alert whose id already exists in the store is the same ongoing issue and
/// is never recreated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Deterministic id: SHA-256 of (source, subject, metric, window).
    pub id: AlertId,

    pub source: FindingSource,

    pub subject: String,

    /// Metric that crossed a threshold, e.g. `ranking`, `traffic`.
    pub metric: String,

    pub severity: AlertSeverity,

    pub message: String,

    pub previous_value: Option<f64>,

    pub current_value: Option<f64>,

    /// Human-readable delta, e.g. `"-3 positions"`.
    pub change: Option<String>,

    pub is_read: bool,

    pub is_actioned: bool,

    pub timestamp: DateTime<Utc>,
}

/// Tunable alerting sensitivity, supplied by the operator per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum positions lost before a ranking drop alerts.
    pub ranking_drop_alert: i64,

    /// Minimum percent decline before a traffic drop alerts.
    pub traffic_drop_alert: f64,

    /// Whether newly-seen competitors produce alerts.
    pub new_competitor_alert: bool,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            ranking_drop_alert: 3,
            traffic_drop_alert: 20.0,
            new_competitor_alert: true,
        }
    }
}

// ============================================================================
// 5. SNAPSHOTS AND WEEKLY DIGEST
// ============================================================================

/// Position of one keyword at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRank {
    pub keyword: String,
    pub position: i64,
}

/// Compact reference to a finding inside a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingSummary {
    pub id: FindingId,
    pub issue_type: String,
    pub priority: Priority,
}

/// Point-in-time metrics captured at the end of an ingestion run. Two
/// consecutive snapshots are the sole input to the digest aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub captured_at: DateTime<Utc>,

    pub rankings: Vec<KeywordRank>,

    pub organic_sessions: f64,

    pub total_backlinks: i64,

    pub finding_summaries: Vec<FindingSummary>,
}

/// Net ranking movement between two snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingsSummary {
    pub improved: u32,
    pub declined: u32,
    pub stable: u32,
    /// Mean position change across matched keywords; negative is better
    /// (positions count down toward 1).
    pub average_change: f64,
}

/// Rollup over one digest period, recomputed at each period boundary from
/// the two most recent snapshots. Deterministic; no hidden state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyDigest {
    /// Monday of the ISO week this digest covers.
    pub week_of: NaiveDate,

    pub rankings_summary: RankingsSummary,

    pub traffic_change_pct: f64,

    pub backlink_net_change: i64,

    pub highlights: Vec<String>,

    pub concerns: Vec<String>,

    pub opportunities: Vec<String>,

    /// Signed composite of the period's deltas; positive means the site
    /// got healthier.
    pub overall_health_change: f64,
}

// ============================================================================
// ORDERING
// ============================================================================

/// Sort checklist items by priority ordinal, ties broken by `detected_at`
/// ascending (oldest first). Stable and reproducible.
pub fn sort_items(items: &mut [ChecklistItem]) {
    items.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(a.detected_at.cmp(&b.detected_at))
    });
}

/// Sort alerts: critical first, then warning/info/success, ties broken by
/// timestamp ascending.
pub fn sort_alerts(alerts: &mut [Alert]) {
    fn rank(s: AlertSeverity) -> u8 {
        match s {
            AlertSeverity::Critical => 0,
            AlertSeverity::Warning => 1,
            AlertSeverity::Info => 2,
            AlertSeverity::Success => 3,
        }
    }
    alerts.sort_by(|a, b| {
        rank(a.severity)
            .cmp(&rank(b.severity))
            .then(a.timestamp.cmp(&b.timestamp))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 24, h, 0, 0).unwrap()
    }

    #[test]
    fn test_finding_id_stable_across_constructions() {
        let f1 = AuditFinding::new(
            FindingSource::Tracking,
            "x.example.com",
            "missing_tracking_tag",
            at(1),
            json!({}),
        );
        let f2 = AuditFinding::new(
            FindingSource::Tracking,
            "x.example.com",
            "missing_tracking_tag",
            at(9),
            json!({"extra": true}),
        );
        // detected_at and payload are not part of the identity
        assert_eq!(f1.id, f2.id);
    }

    #[test]
    fn test_priority_orders_critical_first() {
        let mut tiers = vec![Priority::Low, Priority::Critical, Priority::Medium, Priority::High];
        tiers.sort();
        assert_eq!(
            tiers,
            vec![Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
        );
        assert_eq!(Priority::Critical.ordinal(), 0);
        assert_eq!(Priority::Low.ordinal(), 3);
    }

    #[test]
    fn test_priority_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::Critical).unwrap(), "\"critical\"");
        assert_eq!(
            serde_json::to_string(&FindingSource::SearchConsole).unwrap(),
            "\"search-console\""
        );
        assert_eq!(
            serde_json::to_string(&ChecklistStatus::NotStarted).unwrap(),
            "\"not_started\""
        );
        assert_eq!(
            serde_json::to_string(&VerificationKind::GscVerification).unwrap(),
            "\"gsc_verification\""
        );
    }

    #[test]
    fn test_sort_items_breaks_ties_by_age() {
        let id = |n: &str| {
            FindingId::compute(FindingSource::Tracking, n, "missing_tracking_tag")
        };
        let item = |n: &str, p: Priority, h: u32| {
            ChecklistItem::new(id(n), n, "", p, VerificationRecipe::manual(), at(h))
        };
        let mut items = vec![
            item("c", Priority::Medium, 3),
            item("a", Priority::Critical, 5),
            item("b", Priority::Critical, 2),
        ];
        sort_items(&mut items);
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_recipe_params_serialize_deterministically() {
        let r1 = VerificationRecipe::new(VerificationKind::Tracking)
            .with_param("domain", "x.example.com")
            .with_param("tag_id", "G-123");
        let r2 = VerificationRecipe::new(VerificationKind::Tracking)
            .with_param("tag_id", "G-123")
            .with_param("domain", "x.example.com");
        assert_eq!(
            serde_json::to_string(&r1).unwrap(),
            serde_json::to_string(&r2).unwrap()
        );
    }
}
