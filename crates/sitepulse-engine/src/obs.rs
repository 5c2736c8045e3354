//! Structured observability hooks for ingestion run lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans via `RunSpan` RAII guard
//! - Emission functions for key lifecycle events: start, stage completion,
//!   verification, finish
//!
//! Events are emitted at `info!` level (configurable via `RUST_LOG`).

use tracing::info;

/// RAII guard that enters a run-scoped tracing span for the duration of a
/// pipeline run.
///
/// # Example
///
/// ```ignore
/// let _span = RunSpan::enter("run-12345");
/// // All tracing calls now carry run_id = "run-12345"
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run_id.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("sitepulse.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: ingestion run started.
pub fn emit_run_started(run_id: &str, sources: usize) {
    info!(event = "run.started", run_id = %run_id, sources = sources);
}

/// Emit event: normalization stage completed.
pub fn emit_batch_normalized(run_id: &str, findings: usize, skipped: usize) {
    info!(
        event = "run.normalized",
        run_id = %run_id,
        findings = findings,
        skipped = skipped,
    );
}

/// Emit event: checklist reconciliation completed.
pub fn emit_checklist_reconciled(run_id: &str, created: usize, superseded: usize, revived: usize) {
    info!(
        event = "checklist.reconciled",
        run_id = %run_id,
        created = created,
        superseded = superseded,
        revived = revived,
    );
}

/// Emit event: alert evaluation completed.
pub fn emit_alerts_evaluated(run_id: &str, created: usize, ongoing: usize) {
    info!(
        event = "alerts.evaluated",
        run_id = %run_id,
        created = created,
        ongoing = ongoing,
    );
}

/// Emit event: one verification attempt finished.
pub fn emit_item_verified(item_id: &str, kind: &str, passed: bool) {
    info!(
        event = "item.verified",
        item_id = %item_id,
        kind = %kind,
        passed = passed,
    );
}

/// Emit event: run finished with duration.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, findings_total: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        findings_total = findings_total,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_enter_does_not_panic() {
        let _span = RunSpan::enter("test-run-id");
    }
}
