//! Verification providers
//!
//! Concrete implementations of [`VerificationProvider`]. The engine treats
//! these as opaque: each one answers "is the underlying issue fixed?" for
//! one recipe kind.

use async_trait::async_trait;
use tracing::debug;

use sitepulse_domain::{ChecklistItem, VerificationKind, VerificationResult};

use crate::verify::VerificationProvider;

// ---------------------------------------------------------------------------
// HttpTagProvider
// ---------------------------------------------------------------------------

/// Live check for the `tracking` recipe: fetches the domain's homepage and
/// looks for a GA4 snippet (or the specific tag id the recipe names).
pub struct HttpTagProvider {
    client: reqwest::Client,
}

impl HttpTagProvider {
    pub fn new(timeout: std::time::Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sitepulse/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpTagProvider { client })
    }
}

#[async_trait]
impl VerificationProvider for HttpTagProvider {
    fn kind(&self) -> VerificationKind {
        VerificationKind::Tracking
    }

    async fn check(&self, item: &ChecklistItem) -> anyhow::Result<VerificationResult> {
        let domain = item
            .recipe
            .params
            .get("domain")
            .map(String::as_str)
            .unwrap_or(&item.title);
        let url = format!("https://{domain}/");

        let mut details = vec![format!("GET {url}")];
        debug!(url = %url, "fetching page for tag check");

        let response = self.client.get(&url).send().await?;
        details.push(format!("status {}", response.status()));
        let body = response.text().await?;

        // Prefer the exact tag id when the recipe has one.
        if let Some(tag_id) = item.recipe.params.get("tag_id") {
            if body.contains(tag_id.as_str()) {
                details.push(format!("found tag id {tag_id}"));
                return Ok(VerificationResult::pass(details));
            }
            details.push(format!("tag id {tag_id} not present in page source"));
        }

        let has_snippet = body.contains("googletagmanager.com/gtag/js") || body.contains("gtag(");
        if has_snippet {
            details.push("found GA4 snippet".to_string());
            Ok(VerificationResult::pass(details))
        } else {
            Ok(VerificationResult::fail(
                format!("no GA4 snippet found on {url}"),
                details,
            )
            .with_recommended_fix(
                "add the gtag.js snippet to the site's <head> on every page",
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// FixedOutcomeProvider
// ---------------------------------------------------------------------------

/// Provider that always returns a preset outcome. Used in tests and dry
/// runs to exercise the state machine without touching the network.
pub struct FixedOutcomeProvider {
    kind: VerificationKind,
    passed: bool,
    diagnosis: Option<String>,
}

impl FixedOutcomeProvider {
    pub fn passing(kind: VerificationKind) -> Self {
        FixedOutcomeProvider {
            kind,
            passed: true,
            diagnosis: None,
        }
    }

    pub fn failing(kind: VerificationKind, diagnosis: impl Into<String>) -> Self {
        FixedOutcomeProvider {
            kind,
            passed: false,
            diagnosis: Some(diagnosis.into()),
        }
    }
}

#[async_trait]
impl VerificationProvider for FixedOutcomeProvider {
    fn kind(&self) -> VerificationKind {
        self.kind
    }

    async fn check(&self, _item: &ChecklistItem) -> anyhow::Result<VerificationResult> {
        if self.passed {
            Ok(VerificationResult::pass(vec!["fixed outcome: pass".to_string()]))
        } else {
            Ok(VerificationResult::fail(
                self.diagnosis.clone().unwrap_or_else(|| "fixed outcome: fail".to_string()),
                vec![],
            ))
        }
    }
}
