//! Checklist generator
//!
//! Derives zero or one remediation item per qualifying finding. Purely
//! informational findings (ranking movements, competitor sightings,
//! traffic observations) feed alerts and digests only.
//!
//! Generation upserts, never resets: an existing item keeps its status,
//! diagnosis, and verification timestamps no matter how many times the
//! same finding is re-ingested. Items whose originating finding vanished
//! from the current run are marked superseded (never deleted); a
//! reappearing finding clears the mark.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use sitepulse_domain::{
    AuditFinding, ChecklistItem, Priority, VerificationKind, VerificationRecipe,
};
use sitepulse_store::AuditStore;

use crate::classify::ClassifiedFinding;
use crate::error::Result;

/// Issue types that never produce a checklist item.
const INFORMATIONAL: &[&str] = &[
    "ranking_gain",
    "striking_distance",
    "new_competitor",
    "low_authority_profile",
    "traffic_drop",
];

/// Whether a finding maps to a remediable task.
pub fn is_actionable(finding: &AuditFinding) -> bool {
    !INFORMATIONAL.contains(&finding.issue_type.as_str())
}

/// Outcome of one generation pass.
#[derive(Debug, Default)]
pub struct GenerationOutcome {
    /// Items created this run (existing items are left untouched).
    pub created: Vec<ChecklistItem>,

    /// Existing items whose finding disappeared this run.
    pub superseded: usize,

    /// Previously superseded items whose finding reappeared.
    pub revived: usize,
}

/// Upsert checklist items for a classified batch and reconcile superseded
/// marks against the full set of current finding ids.
pub async fn generate(
    store: &dyn AuditStore,
    classified: &[ClassifiedFinding],
    now: DateTime<Utc>,
) -> Result<GenerationOutcome> {
    let mut outcome = GenerationOutcome::default();

    for cf in classified {
        if !is_actionable(&cf.finding) {
            continue;
        }
        let item = derive_item(&cf.finding, cf.priority);
        if store.insert_item(item.clone()).await? {
            debug!(id = %item.id.short(), title = %item.title, "checklist item created");
            outcome.created.push(item);
        }
    }

    // Reconcile superseded marks against this run's findings.
    let current_ids: HashSet<&str> = classified
        .iter()
        .map(|cf| cf.finding.id.as_str())
        .collect();

    for item in store.list_items().await? {
        let present = current_ids.contains(item.id.as_str());
        if !present && item.superseded_at.is_none() {
            store.mark_item_superseded(&item.id, now).await?;
            outcome.superseded += 1;
        } else if present && item.superseded_at.is_some() {
            store.clear_item_superseded(&item.id).await?;
            outcome.revived += 1;
        }
    }

    if !outcome.created.is_empty() || outcome.superseded > 0 {
        info!(
            created = outcome.created.len(),
            superseded = outcome.superseded,
            revived = outcome.revived,
            "checklist generation complete"
        );
    }

    Ok(outcome)
}

/// Build the item for one actionable finding: title, description, and the
/// verification recipe. Findings with no mapped recipe get a `manual` one
/// rather than being dropped, so every actionable finding is tracked.
pub fn derive_item(finding: &AuditFinding, priority: Priority) -> ChecklistItem {
    let subject = finding.subject.as_str();
    let (title, description, recipe) = match finding.issue_type.as_str() {
        "missing_tracking_tag" => (
            format!("Install GA4 tracking on {subject}"),
            format!("No tracking tag was detected on {subject}. Add the GA4 snippet to every page so traffic and conversions are measured."),
            {
                let mut r = VerificationRecipe::new(VerificationKind::Tracking)
                    .with_param("domain", subject);
                if let Some(tag_id) = finding.payload["tag_id"].as_str() {
                    r = r.with_param("tag_id", tag_id);
                }
                r
            },
        ),
        "property_not_verified" => (
            format!("Verify Search Console property {subject}"),
            format!("The property {subject} is not verified in Search Console, so no index or performance data is available."),
            VerificationRecipe::new(VerificationKind::GscVerification)
                .with_param("property", subject),
        ),
        "sitemap_errors" => (
            format!("Fix sitemap errors in {subject}"),
            format!("The sitemap {subject} has submission or parse errors; pages listed in it may not be discovered."),
            VerificationRecipe::new(VerificationKind::GscVerification)
                .with_param("sitemap", subject),
        ),
        "analytics_not_linked" => (
            format!("Link GA4 to Search Console for {subject}"),
            format!("The Search Console property {subject} is not linked to a GA4 property; search queries will not appear in analytics."),
            VerificationRecipe::manual(),
        ),
        "toxic_backlink" => (
            format!("Disavow toxic backlink from {subject}"),
            format!("The link from {subject} has a high spam score. Add it to the disavow file or request removal."),
            VerificationRecipe::manual().with_param("source_url", subject),
        ),
        "ranking_drop" => (
            format!("Recover ranking for \"{subject}\""),
            ranking_drop_description(finding),
            VerificationRecipe::manual().with_param("keyword", subject),
        ),
        "tracking_issue.no_conversion_events" => (
            format!("Configure conversion events on {subject}"),
            format!("Tracking is installed on {subject} but no conversion events are being recorded."),
            VerificationRecipe::new(VerificationKind::Conversion)
                .with_param("domain", subject),
        ),
        t if t.starts_with("tracking_issue.") => (
            format!("Fix tracking issue on {subject}"),
            finding.payload["description"]
                .as_str()
                .unwrap_or("The tracking auditor reported a configuration issue.")
                .to_string(),
            VerificationRecipe::new(VerificationKind::Tracking).with_param("domain", subject),
        ),
        t if t.starts_with("coverage.") => (
            format!("Resolve index coverage issue on {subject}"),
            format!(
                "Search Console reports \"{}\" for {subject}.",
                finding.payload["issue"].as_str().unwrap_or("a coverage issue")
            ),
            VerificationRecipe::new(VerificationKind::GscVerification)
                .with_param("page", subject),
        ),
        // No mapped recipe: track it anyway as a manual task.
        _ => (
            format!("Investigate {} on {subject}", finding.issue_type),
            format!("The {} auditor reported {}.", finding.source, finding.issue_type),
            VerificationRecipe::manual(),
        ),
    };

    ChecklistItem::new(
        finding.id.clone(),
        title,
        description,
        priority,
        recipe,
        finding.detected_at,
    )
}

fn ranking_drop_description(finding: &AuditFinding) -> String {
    let prev = finding.payload["previous_rank"].as_i64();
    let cur = finding.payload["current_rank"].as_i64();
    match (prev, cur) {
        (Some(p), Some(c)) => format!(
            "\"{}\" dropped from position #{p} to #{c}. Review the ranking pages and refresh content or links.",
            finding.subject
        ),
        _ => format!("\"{}\" lost ranking positions.", finding.subject),
    }
}
