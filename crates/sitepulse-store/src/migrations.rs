//! SurrealDB schema initialization
//!
//! Sets up all SitePulse tables with unique indexes on the deterministic
//! hash columns (`finding_id`, `item_id`, `alert_id`). Safe to call
//! multiple times (idempotent).

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Initialize all SitePulse tables.
///
/// Should be called once per connection; index definitions are idempotent.
pub async fn init_schema(db: &Surreal<Any>) -> StoreResult<()> {
    info!("Initializing SitePulse SurrealDB schema");

    init_findings_table(db).await?;
    init_items_table(db).await?;
    init_alerts_table(db).await?;
    init_snapshots_table(db).await?;
    init_digests_table(db).await?;

    info!("SitePulse schema initialization complete");
    Ok(())
}

async fn run(db: &Surreal<Any>, sql: &str) -> StoreResult<()> {
    db.query(sql)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    Ok(())
}

/// `findings`: upserted by deterministic hash; superseded in place.
async fn init_findings_table(db: &Surreal<Any>) -> StoreResult<()> {
    debug!("Initializing findings table");
    let sql = r#"
        DEFINE TABLE findings SCHEMALESS;

        -- One row per deterministic finding hash
        DEFINE INDEX idx_finding_id ON TABLE findings COLUMNS finding_id UNIQUE;

        -- Filter by auditor
        DEFINE INDEX idx_finding_source ON TABLE findings COLUMNS source;

        -- Time-range queries
        DEFINE INDEX idx_finding_detected_at ON TABLE findings COLUMNS detected_at;
    "#;
    run(db, sql).await
}

/// `checklist_items`: created once per finding hash, status via CAS only.
async fn init_items_table(db: &Surreal<Any>) -> StoreResult<()> {
    debug!("Initializing checklist_items table");
    let sql = r#"
        DEFINE TABLE checklist_items SCHEMALESS;

        -- 1:1 with the originating finding hash
        DEFINE INDEX idx_item_id ON TABLE checklist_items COLUMNS item_id UNIQUE;

        -- Group by priority for the UI
        DEFINE INDEX idx_item_priority ON TABLE checklist_items COLUMNS priority;

        -- Status queries for verification sweeps
        DEFINE INDEX idx_item_status ON TABLE checklist_items COLUMNS status;
    "#;
    run(db, sql).await
}

/// `alerts`: created once per (source, subject, metric, window) id.
async fn init_alerts_table(db: &Surreal<Any>) -> StoreResult<()> {
    debug!("Initializing alerts table");
    let sql = r#"
        DEFINE TABLE alerts SCHEMALESS;

        -- Dedup anchor: one alert per deterministic hash
        DEFINE INDEX idx_alert_id ON TABLE alerts COLUMNS alert_id UNIQUE;

        -- Filter by severity / read state
        DEFINE INDEX idx_alert_severity ON TABLE alerts COLUMNS severity;
        DEFINE INDEX idx_alert_is_read ON TABLE alerts COLUMNS is_read;
    "#;
    run(db, sql).await
}

async fn init_snapshots_table(db: &Surreal<Any>) -> StoreResult<()> {
    debug!("Initializing snapshots table");
    let sql = r#"
        DEFINE TABLE snapshots SCHEMALESS;

        -- Digest aggregation reads the newest two
        DEFINE INDEX idx_snapshot_captured_at ON TABLE snapshots COLUMNS captured_at;
    "#;
    run(db, sql).await
}

async fn init_digests_table(db: &Surreal<Any>) -> StoreResult<()> {
    debug!("Initializing digests table");
    let sql = r#"
        DEFINE TABLE digests SCHEMALESS;

        -- One digest per ISO week
        DEFINE INDEX idx_digest_week ON TABLE digests COLUMNS week_of UNIQUE;
    "#;
    run(db, sql).await
}
