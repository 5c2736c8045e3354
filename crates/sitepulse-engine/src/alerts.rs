//! Alert lifecycle manager
//!
//! Turns classified findings plus a [`ThresholdConfig`] into alerts,
//! deduplicated by deterministic id. The id includes the ISO-week window,
//! so an ongoing issue maps to one alert per week: re-ingestion inside the
//! window never creates a duplicate and never touches the read/actioned
//! flags (those change only through the explicit mark operations).

use tracing::debug;

use sitepulse_domain::{
    iso_week_window, Alert, AlertId, AlertSeverity, ThresholdConfig,
};
use sitepulse_store::AuditStore;

use crate::classify::ClassifiedFinding;
use crate::error::Result;

/// Outcome of one evaluation pass.
#[derive(Debug, Default)]
pub struct AlertEvaluation {
    /// Alerts created this run.
    pub created: Vec<Alert>,

    /// Threshold crossings that matched an existing alert id (the same
    /// ongoing issue).
    pub ongoing: usize,
}

/// Evaluate thresholds over a classified batch and merge with the
/// persisted alert set.
pub async fn evaluate(
    store: &dyn AuditStore,
    classified: &[ClassifiedFinding],
    config: &ThresholdConfig,
) -> Result<AlertEvaluation> {
    let mut outcome = AlertEvaluation::default();

    for cf in classified {
        let Some(candidate) = alert_for(cf, config) else {
            continue;
        };

        if store.get_alert(&candidate.id).await?.is_some() {
            debug!(id = %candidate.id.short(), "alert already exists for this window; ongoing issue");
            outcome.ongoing += 1;
            continue;
        }

        if store.insert_alert(candidate.clone()).await? {
            outcome.created.push(candidate);
        } else {
            outcome.ongoing += 1;
        }
    }

    Ok(outcome)
}

/// Build the alert a finding would produce, or `None` when it does not
/// cross the configured threshold.
fn alert_for(cf: &ClassifiedFinding, config: &ThresholdConfig) -> Option<Alert> {
    let finding = &cf.finding;
    let window = iso_week_window(finding.detected_at);

    match finding.issue_type.as_str() {
        "ranking_drop" => {
            let previous = finding.payload["previous_rank"].as_i64()?;
            let current = finding.payload["current_rank"].as_i64()?;
            let dropped = current - previous;
            if dropped < config.ranking_drop_alert {
                return None;
            }
            let severity = if dropped >= config.ranking_drop_alert * 2 {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Warning
            };
            Some(build(
                finding,
                "ranking",
                &window,
                severity,
                format!(
                    "\"{}\" dropped from #{previous} to #{current}",
                    finding.subject
                ),
                Some(previous as f64),
                Some(current as f64),
                Some(format!("-{dropped} positions")),
            ))
        }
        "ranking_gain" => {
            let previous = finding.payload["previous_rank"].as_i64()?;
            let current = finding.payload["current_rank"].as_i64()?;
            let gained = previous - current;
            if gained < config.ranking_drop_alert {
                return None;
            }
            Some(build(
                finding,
                "ranking",
                &window,
                AlertSeverity::Success,
                format!(
                    "\"{}\" climbed from #{previous} to #{current}",
                    finding.subject
                ),
                Some(previous as f64),
                Some(current as f64),
                Some(format!("+{gained} positions")),
            ))
        }
        "traffic_drop" => {
            let previous = finding.payload["previous_sessions"].as_f64()?;
            let current = finding.payload["current_sessions"].as_f64()?;
            let change_pct = finding.payload["change_pct"].as_f64()?;
            let decline = -change_pct;
            if decline < config.traffic_drop_alert {
                return None;
            }
            let severity = if decline >= config.traffic_drop_alert * 2.0 {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Warning
            };
            Some(build(
                finding,
                "traffic",
                &window,
                severity,
                format!(
                    "Organic traffic on {} down {decline:.1}% week over week",
                    finding.subject
                ),
                Some(previous),
                Some(current),
                Some(format!("{change_pct:.1}%")),
            ))
        }
        "new_competitor" => {
            if !config.new_competitor_alert {
                return None;
            }
            let keyword = finding.payload["keyword"].as_str().unwrap_or("a tracked keyword");
            Some(build(
                finding,
                "competitor",
                &window,
                AlertSeverity::Info,
                format!(
                    "New competitor {} seen ranking for \"{keyword}\"",
                    finding.subject
                ),
                None,
                None,
                None,
            ))
        }
        _ => None,
    }
}

#[allow(clippy::too_many_arguments)]
fn build(
    finding: &sitepulse_domain::AuditFinding,
    metric: &str,
    window: &str,
    severity: AlertSeverity,
    message: String,
    previous_value: Option<f64>,
    current_value: Option<f64>,
    change: Option<String>,
) -> Alert {
    Alert {
        id: AlertId::compute(finding.source, &finding.subject, metric, window),
        source: finding.source,
        subject: finding.subject.clone(),
        metric: metric.to_string(),
        severity,
        message,
        previous_value,
        current_value,
        change,
        is_read: false,
        is_actioned: false,
        timestamp: finding.detected_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use sitepulse_domain::{AuditFinding, FindingSource, Priority};

    fn ranking_drop(previous: i64, current: i64) -> ClassifiedFinding {
        let finding = AuditFinding::new(
            FindingSource::Ranking,
            "best running shoes",
            "ranking_drop",
            Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap(),
            json!({ "previous_rank": previous, "current_rank": current, "dropped": current - previous }),
        );
        ClassifiedFinding {
            priority: Priority::High,
            finding,
        }
    }

    #[test]
    fn test_drop_at_threshold_alerts_above_does_not() {
        let cf = ranking_drop(5, 8);

        let a = alert_for(&cf, &ThresholdConfig { ranking_drop_alert: 3, ..Default::default() });
        let alert = a.expect("drop of 3 with threshold 3 must alert");
        assert_eq!(alert.change.as_deref(), Some("-3 positions"));
        assert_eq!(alert.severity, AlertSeverity::Warning);

        let none = alert_for(&cf, &ThresholdConfig { ranking_drop_alert: 4, ..Default::default() });
        assert!(none.is_none(), "drop of 3 with threshold 4 must not alert");
    }

    #[test]
    fn test_large_drop_escalates_to_critical() {
        let cf = ranking_drop(5, 12);
        let alert = alert_for(&cf, &ThresholdConfig { ranking_drop_alert: 3, ..Default::default() })
            .unwrap();
        assert_eq!(alert.severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_competitor_alert_obeys_flag() {
        let finding = AuditFinding::new(
            FindingSource::Competitor,
            "rival.example.com",
            "new_competitor",
            Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap(),
            json!({ "keyword": "best shoes" }),
        );
        let cf = ClassifiedFinding {
            priority: Priority::Low,
            finding,
        };

        let enabled = ThresholdConfig { new_competitor_alert: true, ..Default::default() };
        let disabled = ThresholdConfig { new_competitor_alert: false, ..Default::default() };

        assert!(alert_for(&cf, &enabled).is_some());
        assert!(alert_for(&cf, &disabled).is_none());
    }

    #[test]
    fn test_traffic_drop_threshold_is_percent_decline() {
        let finding = AuditFinding::new(
            FindingSource::Tracking,
            "x.example.com",
            "traffic_drop",
            Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap(),
            json!({ "previous_sessions": 1000.0, "current_sessions": 750.0, "change_pct": -25.0 }),
        );
        let cf = ClassifiedFinding { priority: Priority::High, finding };

        assert!(alert_for(&cf, &ThresholdConfig { traffic_drop_alert: 20.0, ..Default::default() }).is_some());
        assert!(alert_for(&cf, &ThresholdConfig { traffic_drop_alert: 30.0, ..Default::default() }).is_none());
    }

    #[tokio::test]
    async fn test_evaluate_deduplicates_within_window() {
        let store = sitepulse_store::MemoryAuditStore::new();
        let cf = ranking_drop(5, 8);
        let config = ThresholdConfig::default();

        let first = evaluate(&store, std::slice::from_ref(&cf), &config).await.unwrap();
        assert_eq!(first.created.len(), 1);

        let second = evaluate(&store, std::slice::from_ref(&cf), &config).await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.ongoing, 1);
    }
}
