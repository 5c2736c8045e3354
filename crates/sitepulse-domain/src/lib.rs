//! SitePulse Domain Model
//!
//! Defines the content-addressed audit domain:
//! - `AuditFinding`: one normalized observation from any auditor
//! - `ChecklistItem`: an actionable remediation task with its own
//!   verification lifecycle
//! - `Alert`: a threshold-crossing change with read/actioned flags
//! - `MetricsSnapshot` / `WeeklyDigest`: periodic rollup inputs and output
//!
//! Finding and alert ids are pure functions of semantic content
//! (SHA-256), so re-running ingestion on unchanged input is idempotent.

pub mod error;
pub mod id;
pub mod schema;

pub use error::{DomainError, Result};
pub use id::{iso_week_window, AlertId, FindingId};
pub use schema::{
    sort_alerts, sort_items, Alert, AlertSeverity, AuditFinding, ChecklistItem, ChecklistStatus,
    FindingSource, FindingSummary, KeywordRank, MetricsSnapshot, Priority, RankingsSummary,
    ThresholdConfig, VerificationKind, VerificationRecipe, VerificationResult, WeeklyDigest,
};

/// SitePulse domain version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
