//! Deterministic identity for findings and alerts.
//!
//! Ids are pure functions of semantic content: the same (source, subject,
//! issue/metric, window) always hashes to the same SHA-256 hex string, so
//! re-running ingestion on unchanged input is idempotent by construction.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::DomainError;
use crate::schema::FindingSource;

/// Hash a sequence of components with `\0` separators.
///
/// The separator prevents collisions between e.g. ("ab", "c") and ("a", "bc").
fn hash_components(components: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for component in components {
        hasher.update(component.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

fn validate_hex(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// FindingId
// ---------------------------------------------------------------------------

/// Deterministic identity of an [`crate::schema::AuditFinding`].
///
/// The inner field is private so the string is always valid lowercase hex
/// produced by [`FindingId::compute`] or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingId(String);

impl FindingId {
    /// Compute the id from the finding's semantic content.
    pub fn compute(source: FindingSource, subject: &str, issue_type: &str) -> Self {
        FindingId(hash_components(&[source.as_str(), subject, issue_type]))
    }

    /// Full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars), for logs and CLI output.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for FindingId {
    type Error = DomainError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if !validate_hex(&s) {
            return Err(DomainError::InvalidId { id: s });
        }
        Ok(FindingId(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for FindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AlertId
// ---------------------------------------------------------------------------

/// Deterministic identity of an [`crate::schema::Alert`].
///
/// Includes a time-window bucket so an ongoing issue maps to one alert per
/// window instead of one per ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(String);

impl AlertId {
    /// Compute the id from (source, subject, metric, window).
    pub fn compute(source: FindingSource, subject: &str, metric: &str, window: &str) -> Self {
        AlertId(hash_components(&[source.as_str(), subject, metric, window]))
    }

    /// Full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for AlertId {
    type Error = DomainError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if !validate_hex(&s) {
            return Err(DomainError::InvalidId { id: s });
        }
        Ok(AlertId(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// ISO-week bucket for alert windows, e.g. `"2026-W35"`.
pub fn iso_week_window(at: DateTime<Utc>) -> String {
    let week = at.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}
