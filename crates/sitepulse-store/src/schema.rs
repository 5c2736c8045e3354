//! Row schema for the SurrealDB backend
//!
//! Tables:
//! - findings: normalized audit findings (upsert by deterministic id)
//! - checklist_items: remediation tasks with verification lifecycle
//! - alerts: threshold-crossing changes with read/actioned flags
//! - snapshots: per-run metrics snapshots (digest input)
//! - digests: one weekly digest per ISO week
//!
//! Rows convert to/from the domain types at the boundary; enum fields are
//! stored as their stable string forms. SurrealDB owns the record `id`
//! (a `Thing`), so the deterministic hashes live in their own columns
//! (`finding_id`, `item_id`, `alert_id`) that queries and unique indexes
//! key on.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use sitepulse_domain::{
    Alert, AlertId, AlertSeverity, AuditFinding, ChecklistItem, ChecklistStatus, FindingId,
    FindingSource, MetricsSnapshot, Priority, VerificationRecipe, WeeklyDigest,
};

use crate::error::StoreError;

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

fn parse<T: std::str::FromStr>(kind: &str, label: &str) -> Result<T, StoreError> {
    label.parse().map_err(|_| {
        StoreError::Backend(format!("unknown {kind} in stored row: {label}"))
    })
}

// ---------------------------------------------------------------------------
// findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Deterministic finding hash (unique column, lookup key)
    pub finding_id: String,
    pub source: String,
    pub subject: String,
    pub issue_type: String,
    pub severity_hint: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub detected_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl From<AuditFinding> for FindingRow {
    fn from(f: AuditFinding) -> Self {
        FindingRow {
            id: None,
            finding_id: f.id.as_str().to_string(),
            source: f.source.as_str().to_string(),
            subject: f.subject,
            issue_type: f.issue_type,
            severity_hint: f.severity_hint.map(|p| p.to_string()),
            detected_at: f.detected_at,
            payload: f.payload,
        }
    }
}

impl TryFrom<FindingRow> for AuditFinding {
    type Error = StoreError;

    fn try_from(row: FindingRow) -> Result<Self, Self::Error> {
        let id = FindingId::try_from(row.finding_id.clone())
            .map_err(|_| StoreError::InvalidId { id: row.finding_id })?;
        let source: FindingSource = parse("source", &row.source)?;
        let severity_hint = row
            .severity_hint
            .as_deref()
            .map(|s| parse::<Priority>("priority", s))
            .transpose()?;
        Ok(AuditFinding {
            id,
            source,
            subject: row.subject,
            issue_type: row.issue_type,
            severity_hint,
            detected_at: row.detected_at,
            payload: row.payload,
        })
    }
}

// ---------------------------------------------------------------------------
// checklist_items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Originating finding hash (unique column, lookup key)
    pub item_id: String,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub recipe: serde_json::Value,
    pub diagnosis: Option<String>,
    #[serde(default, with = "surreal_datetime_opt")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default, with = "surreal_datetime_opt")]
    pub superseded_at: Option<DateTime<Utc>>,
    #[serde(with = "surreal_datetime")]
    pub detected_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ChecklistItem> for ItemRow {
    type Error = StoreError;

    fn try_from(item: ChecklistItem) -> Result<Self, Self::Error> {
        Ok(ItemRow {
            id: None,
            item_id: item.id.as_str().to_string(),
            title: item.title,
            description: item.description,
            priority: item.priority.to_string(),
            status: item.status.to_string(),
            recipe: serde_json::to_value(&item.recipe)?,
            diagnosis: item.diagnosis,
            verified_at: item.verified_at,
            superseded_at: item.superseded_at,
            detected_at: item.detected_at,
            created_at: item.created_at,
        })
    }
}

impl TryFrom<ItemRow> for ChecklistItem {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let id = FindingId::try_from(row.item_id.clone())
            .map_err(|_| StoreError::InvalidId { id: row.item_id })?;
        let priority: Priority = parse("priority", &row.priority)?;
        let status: ChecklistStatus = parse("status", &row.status)?;
        let recipe: VerificationRecipe = serde_json::from_value(row.recipe)?;
        Ok(ChecklistItem {
            id,
            title: row.title,
            description: row.description,
            priority,
            status,
            recipe,
            diagnosis: row.diagnosis,
            verified_at: row.verified_at,
            superseded_at: row.superseded_at,
            detected_at: row.detected_at,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Deterministic alert hash (unique column, lookup key)
    pub alert_id: String,
    pub source: String,
    pub subject: String,
    pub metric: String,
    pub severity: String,
    pub message: String,
    pub previous_value: Option<f64>,
    pub current_value: Option<f64>,
    pub change: Option<String>,
    pub is_read: bool,
    pub is_actioned: bool,
    #[serde(with = "surreal_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl From<Alert> for AlertRow {
    fn from(a: Alert) -> Self {
        AlertRow {
            id: None,
            alert_id: a.id.as_str().to_string(),
            source: a.source.as_str().to_string(),
            subject: a.subject,
            metric: a.metric,
            severity: a.severity.to_string(),
            message: a.message,
            previous_value: a.previous_value,
            current_value: a.current_value,
            change: a.change,
            is_read: a.is_read,
            is_actioned: a.is_actioned,
            timestamp: a.timestamp,
        }
    }
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let id = AlertId::try_from(row.alert_id.clone())
            .map_err(|_| StoreError::InvalidId { id: row.alert_id })?;
        let source: FindingSource = parse("source", &row.source)?;
        let severity: AlertSeverity = parse("severity", &row.severity)?;
        Ok(Alert {
            id,
            source,
            subject: row.subject,
            metric: row.metric,
            severity,
            message: row.message,
            previous_value: row.previous_value,
            current_value: row.current_value,
            change: row.change,
            is_read: row.is_read,
            is_actioned: row.is_actioned,
            timestamp: row.timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// snapshots and digests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    #[serde(with = "surreal_datetime")]
    pub captured_at: DateTime<Utc>,
    /// Full `MetricsSnapshot` JSON (rankings, sessions, backlinks, findings).
    pub data: serde_json::Value,
}

impl TryFrom<MetricsSnapshot> for SnapshotRow {
    type Error = StoreError;

    fn try_from(s: MetricsSnapshot) -> Result<Self, Self::Error> {
        Ok(SnapshotRow {
            id: None,
            captured_at: s.captured_at,
            data: serde_json::to_value(&s)?,
        })
    }
}

impl TryFrom<SnapshotRow> for MetricsSnapshot {
    type Error = StoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(serde_json::from_value(row.data)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// ISO date (Monday of the week), e.g. "2026-08-24". Unique per week.
    pub week_of: String,
    /// Full `WeeklyDigest` JSON.
    pub data: serde_json::Value,
}

impl TryFrom<WeeklyDigest> for DigestRow {
    type Error = StoreError;

    fn try_from(d: WeeklyDigest) -> Result<Self, Self::Error> {
        Ok(DigestRow {
            id: None,
            week_of: d.week_of.format("%Y-%m-%d").to_string(),
            data: serde_json::to_value(&d)?,
        })
    }
}

impl TryFrom<DigestRow> for WeeklyDigest {
    type Error = StoreError;

    fn try_from(row: DigestRow) -> Result<Self, Self::Error> {
        Ok(serde_json::from_value(row.data)?)
    }
}

/// Key format shared by `put_digest` and `get_digest`.
pub fn week_key(week_of: NaiveDate) -> String {
    week_of.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_rows_keep_hash_out_of_the_record_id() {
        let finding = AuditFinding::new(
            FindingSource::Tracking,
            "x.example.com",
            "missing_tracking_tag",
            Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap(),
            json!({"has_tag": false}),
        );
        let hash = finding.id.as_str().to_string();
        let row = FindingRow::from(finding);

        // The record id is SurrealDB's; the deterministic hash is a plain
        // string column the unique index and WHERE clauses key on.
        assert!(row.id.is_none());
        assert_eq!(row.finding_id, hash);

        let back = AuditFinding::try_from(row).unwrap();
        assert_eq!(back.id.as_str(), hash);
    }

    #[test]
    fn test_rows_round_trip_with_a_backend_assigned_record_id() {
        let finding = AuditFinding::new(
            FindingSource::Ranking,
            "best shoes",
            "ranking_drop",
            Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap(),
            json!({"dropped": 3}),
        );
        let mut row = FindingRow::from(finding.clone());
        row.id = Some(surrealdb::sql::Thing::from(("findings", "abc123")));

        let back = AuditFinding::try_from(row).unwrap();
        assert_eq!(back.id, finding.id);
        assert_eq!(back.subject, "best shoes");
    }
}
