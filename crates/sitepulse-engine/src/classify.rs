//! Priority classifier
//!
//! A fixed, ordered rule table mapping (source, issue type) to a priority
//! tier, evaluated first-match. This table is the single source of truth
//! for urgency: it is total (unmatched combinations default to medium) and
//! deterministic (same finding, same tier, every run), so priority never
//! depends on accumulation order or on the severities individual auditors
//! happen to report.

use sitepulse_domain::{AuditFinding, FindingSource, Priority};

/// How a rule matches an issue type.
#[derive(Debug, Clone, Copy)]
enum IssueMatch {
    Exact(&'static str),
    Prefix(&'static str),
}

impl IssueMatch {
    fn matches(&self, issue_type: &str) -> bool {
        match self {
            IssueMatch::Exact(s) => issue_type == *s,
            IssueMatch::Prefix(p) => issue_type.starts_with(p),
        }
    }
}

struct Rule {
    source: FindingSource,
    issue: IssueMatch,
    tier: Priority,
}

const fn rule(source: FindingSource, issue: IssueMatch, tier: Priority) -> Rule {
    Rule { source, issue, tier }
}

/// The classification table. Order matters: first match wins.
const RULES: &[Rule] = &[
    rule(
        FindingSource::Tracking,
        IssueMatch::Exact("missing_tracking_tag"),
        Priority::Critical,
    ),
    rule(
        FindingSource::SearchConsole,
        IssueMatch::Exact("property_not_verified"),
        Priority::Critical,
    ),
    rule(
        FindingSource::Ranking,
        IssueMatch::Exact("ranking_drop"),
        Priority::High,
    ),
    rule(
        FindingSource::SearchConsole,
        IssueMatch::Prefix("coverage."),
        Priority::High,
    ),
    rule(
        FindingSource::SearchConsole,
        IssueMatch::Exact("sitemap_errors"),
        Priority::High,
    ),
    rule(
        FindingSource::Backlink,
        IssueMatch::Exact("toxic_backlink"),
        Priority::High,
    ),
    rule(
        FindingSource::Tracking,
        IssueMatch::Exact("traffic_drop"),
        Priority::High,
    ),
    rule(
        FindingSource::SearchConsole,
        IssueMatch::Exact("analytics_not_linked"),
        Priority::Medium,
    ),
    rule(
        FindingSource::Tracking,
        IssueMatch::Prefix("tracking_issue."),
        Priority::Medium,
    ),
    rule(
        FindingSource::Backlink,
        IssueMatch::Exact("low_authority_profile"),
        Priority::Low,
    ),
    rule(
        FindingSource::Ranking,
        IssueMatch::Exact("striking_distance"),
        Priority::Low,
    ),
    rule(
        FindingSource::Ranking,
        IssueMatch::Exact("ranking_gain"),
        Priority::Low,
    ),
    rule(
        FindingSource::Competitor,
        IssueMatch::Exact("new_competitor"),
        Priority::Low,
    ),
];

/// Classify a finding. Total: always returns exactly one tier.
pub fn classify(finding: &AuditFinding) -> Priority {
    RULES
        .iter()
        .find(|r| r.source == finding.source && r.issue.matches(&finding.issue_type))
        .map_or(Priority::Medium, |r| r.tier)
}

/// A finding paired with its classified tier; what the checklist generator
/// and alert manager consume.
#[derive(Debug, Clone)]
pub struct ClassifiedFinding {
    pub finding: AuditFinding,
    pub priority: Priority,
}

/// Classify a batch, preserving order.
pub fn classify_all(findings: Vec<AuditFinding>) -> Vec<ClassifiedFinding> {
    findings
        .into_iter()
        .map(|finding| ClassifiedFinding {
            priority: classify(&finding),
            finding,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn finding(source: FindingSource, issue_type: &str) -> AuditFinding {
        AuditFinding::new(
            source,
            "subject",
            issue_type,
            Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap(),
            json!({}),
        )
    }

    #[test]
    fn test_missing_tag_is_critical() {
        let f = finding(FindingSource::Tracking, "missing_tracking_tag");
        assert_eq!(classify(&f), Priority::Critical);
    }

    #[test]
    fn test_coverage_prefix_matches() {
        let f = finding(FindingSource::SearchConsole, "coverage.not_indexed");
        assert_eq!(classify(&f), Priority::High);
    }

    #[test]
    fn test_unmatched_defaults_to_medium() {
        let f = finding(FindingSource::Backlink, "something_nobody_mapped");
        assert_eq!(classify(&f), Priority::Medium);
    }

    #[test]
    fn test_severity_hint_does_not_override_table() {
        let f = finding(FindingSource::Ranking, "ranking_gain")
            .with_severity_hint(Priority::Critical);
        assert_eq!(classify(&f), Priority::Low);
    }

    #[test]
    fn test_classification_is_total_over_all_sources() {
        // Any (source, issue_type) combination yields exactly one tier.
        let sources = [
            FindingSource::Tracking,
            FindingSource::SearchConsole,
            FindingSource::Backlink,
            FindingSource::Ranking,
            FindingSource::Competitor,
        ];
        for source in sources {
            for issue in ["missing_tracking_tag", "coverage.x", "", "unknown"] {
                let f = finding(source, issue);
                let tier = classify(&f);
                assert!(matches!(
                    tier,
                    Priority::Critical | Priority::High | Priority::Medium | Priority::Low
                ));
            }
        }
    }
}
