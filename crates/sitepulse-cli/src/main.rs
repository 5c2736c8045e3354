//! SitePulse - SEO audit aggregation and remediation CLI
//!
//! The `sitepulse` command drives the engine from the terminal.
//!
//! ## Commands
//!
//! - `ingest`: Run auditor result files through the ingestion pipeline
//! - `checklist`: Show remediation items grouped by priority
//! - `alerts`: Show the alert stream
//! - `verify`: Run verification checks against checklist items
//! - `confirm` / `block`: Manual lifecycle operations
//! - `digest`: Build and persist the weekly digest

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use sitepulse_domain::{
    sort_alerts, sort_items, AlertId, AlertSeverity, ChecklistItem, FindingId, Priority,
    ThresholdConfig,
};
use sitepulse_engine::{
    AuditBatch, HttpTagProvider, IngestPipeline, VerificationEngine,
};
use sitepulse_store::{AuditStore, MemoryAuditStore, SurrealAuditStore};

#[derive(Parser)]
#[command(name = "sitepulse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SEO audit aggregation and remediation engine", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Store backend to use
    #[arg(long, global = true, value_enum, default_value_t = StoreKind::Surreal)]
    store: StoreKind,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    /// Ephemeral in-memory store (useful for dry runs)
    Mem,
    /// SurrealDB-backed store (SURREALDB_URL, defaults to local surrealkv)
    Surreal,
}

#[derive(Subcommand)]
enum Commands {
    /// Run auditor result files through the ingestion pipeline
    Ingest {
        /// JSON files holding auditor batches (merged in order)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Minimum positions lost before a ranking drop alerts
        #[arg(long, default_value_t = 3)]
        ranking_drop_alert: i64,

        /// Minimum percent decline before a traffic drop alerts
        #[arg(long, default_value_t = 20.0)]
        traffic_drop_alert: f64,

        /// Disable alerts for newly-seen competitors
        #[arg(long)]
        no_competitor_alerts: bool,
    },

    /// Show remediation items grouped by priority
    Checklist {
        /// Only show items at this priority
        #[arg(long)]
        priority: Option<Priority>,

        /// Include items whose finding has disappeared
        #[arg(long)]
        include_superseded: bool,
    },

    /// Show the alert stream, newest first within severity
    Alerts {
        /// Only show alerts at this severity
        #[arg(long)]
        severity: Option<AlertSeverity>,

        /// Only show unread alerts
        #[arg(long)]
        unread: bool,
    },

    /// Mark an alert as read
    MarkRead {
        /// Alert id (full 64-char hex)
        id: String,
    },

    /// Mark an alert as actioned
    MarkActioned {
        /// Alert id (full 64-char hex)
        id: String,
    },

    /// Run verification checks and advance item state
    Verify {
        /// Checklist item id; omit with --all to verify everything
        id: Option<String>,

        /// Verify every non-terminal item
        #[arg(long)]
        all: bool,

        /// Per-check timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },

    /// Manually confirm an item complete (the only path to `completed`)
    Confirm {
        /// Checklist item id
        id: String,
    },

    /// Mark an item blocked with a reason
    Block {
        /// Checklist item id
        id: String,

        /// Why the item cannot progress
        #[arg(long)]
        reason: String,
    },

    /// Build and persist the weekly digest from the latest two snapshots
    Digest,
}

/// Set up the global subscriber; `RUST_LOG` overrides `level` when set.
fn init_tracing(json: bool, level: Level) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let fmt = tracing_subscriber::fmt::layer().with_target(false);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt.json()).try_init().ok();
    } else {
        registry.with(fmt).try_init().ok();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let store: Arc<dyn AuditStore> = match cli.store {
        StoreKind::Mem => Arc::new(MemoryAuditStore::new()),
        StoreKind::Surreal => Arc::new(
            SurrealAuditStore::from_env()
                .await
                .context("Failed to connect to SitePulse database")?,
        ),
    };

    match cli.command {
        Commands::Ingest {
            files,
            ranking_drop_alert,
            traffic_drop_alert,
            no_competitor_alerts,
        } => {
            let config = ThresholdConfig {
                ranking_drop_alert,
                traffic_drop_alert,
                new_competitor_alert: !no_competitor_alerts,
            };
            cmd_ingest(store.as_ref(), &files, &config).await
        }
        Commands::Checklist {
            priority,
            include_superseded,
        } => cmd_checklist(store.as_ref(), priority, include_superseded).await,
        Commands::Alerts { severity, unread } => {
            cmd_alerts(store.as_ref(), severity, unread).await
        }
        Commands::MarkRead { id } => cmd_mark_read(store.as_ref(), &id).await,
        Commands::MarkActioned { id } => cmd_mark_actioned(store.as_ref(), &id).await,
        Commands::Verify {
            id,
            all,
            timeout_secs,
        } => cmd_verify(store.as_ref(), id.as_deref(), all, timeout_secs).await,
        Commands::Confirm { id } => cmd_confirm(store.as_ref(), &id).await,
        Commands::Block { id, reason } => cmd_block(store.as_ref(), &id, &reason).await,
        Commands::Digest => cmd_digest(store.as_ref()).await,
    }
}

async fn cmd_ingest(
    store: &dyn AuditStore,
    files: &[PathBuf],
    config: &ThresholdConfig,
) -> Result<()> {
    let mut batch = AuditBatch::default();
    for path in files {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read batch file: {:?}", path))?;
        let part: AuditBatch = serde_json::from_str(&content)
            .context(format!("Failed to parse batch file: {:?}", path))?;
        batch.tracking.extend(part.tracking);
        batch.search_console.extend(part.search_console);
        batch.backlinks.extend(part.backlinks);
        batch.rankings.extend(part.rankings);
    }

    let report = IngestPipeline::run(store, &batch, config, Utc::now()).await?;

    println!("Run {}", report.run_id);
    println!("Findings:   {} ({} skipped)", report.findings_total, report.findings_skipped);
    println!("Checklist:  {} created, {} superseded", report.items_created, report.items_superseded);
    println!("Alerts:     {} created", report.alerts_created);
    println!("Duration:   {}ms", report.duration_ms);
    Ok(())
}

async fn cmd_checklist(
    store: &dyn AuditStore,
    priority: Option<Priority>,
    include_superseded: bool,
) -> Result<()> {
    let mut items: Vec<ChecklistItem> = store
        .list_items()
        .await?
        .into_iter()
        .filter(|i| include_superseded || i.superseded_at.is_none())
        .filter(|i| priority.map_or(true, |p| i.priority == p))
        .collect();
    sort_items(&mut items);

    if items.is_empty() {
        println!("No checklist items.");
        return Ok(());
    }

    let mut current: Option<Priority> = None;
    for item in &items {
        if current != Some(item.priority) {
            current = Some(item.priority);
            println!("\n== {} ==", item.priority);
        }
        let superseded = if item.superseded_at.is_some() {
            " (superseded)"
        } else {
            ""
        };
        println!("[{}] {} — {}{}", item.status, item.id.short(), item.title, superseded);
        if let Some(diagnosis) = &item.diagnosis {
            println!("         diagnosis: {diagnosis}");
        }
    }
    Ok(())
}

async fn cmd_alerts(
    store: &dyn AuditStore,
    severity: Option<AlertSeverity>,
    unread: bool,
) -> Result<()> {
    let mut alerts: Vec<_> = store
        .list_alerts()
        .await?
        .into_iter()
        .filter(|a| !unread || !a.is_read)
        .filter(|a| severity.map_or(true, |s| a.severity == s))
        .collect();
    sort_alerts(&mut alerts);

    if alerts.is_empty() {
        println!("No alerts.");
        return Ok(());
    }

    for alert in &alerts {
        let mut flags = String::new();
        if !alert.is_read {
            flags.push('*');
        }
        if alert.is_actioned {
            flags.push('a');
        }
        println!(
            "{:9} {} {} {}  {}",
            alert.severity.to_string(),
            alert.timestamp.format("%Y-%m-%d"),
            alert.id.short(),
            flags,
            alert.message
        );
        if let Some(change) = &alert.change {
            println!("          change: {change}");
        }
    }
    Ok(())
}

async fn cmd_mark_read(store: &dyn AuditStore, id: &str) -> Result<()> {
    let id = AlertId::try_from(id.to_string()).context("Invalid alert id")?;
    store.mark_alert_read(&id).await?;
    println!("Alert {} marked read", id.short());
    Ok(())
}

async fn cmd_mark_actioned(store: &dyn AuditStore, id: &str) -> Result<()> {
    let id = AlertId::try_from(id.to_string()).context("Invalid alert id")?;
    store.mark_alert_actioned(&id).await?;
    println!("Alert {} marked actioned", id.short());
    Ok(())
}

fn verification_engine(timeout_secs: u64) -> Result<VerificationEngine> {
    let timeout = Duration::from_secs(timeout_secs);
    let mut engine = VerificationEngine::new(timeout);
    engine.register(Arc::new(
        HttpTagProvider::new(timeout).context("Failed to build HTTP client")?,
    ));
    Ok(engine)
}

async fn cmd_verify(
    store: &dyn AuditStore,
    id: Option<&str>,
    all: bool,
    timeout_secs: u64,
) -> Result<()> {
    let engine = verification_engine(timeout_secs)?;

    let ids: Vec<FindingId> = if all {
        store
            .list_items()
            .await?
            .into_iter()
            .filter(|i| !i.status.is_terminal() && i.superseded_at.is_none())
            .map(|i| i.id)
            .collect()
    } else {
        let id = id.context("Provide an item id or --all")?;
        vec![FindingId::try_from(id.to_string()).context("Invalid item id")?]
    };

    if ids.is_empty() {
        println!("Nothing to verify.");
        return Ok(());
    }

    for (id, outcome) in engine.verify_all(store, &ids).await {
        match outcome {
            Ok(outcome) => {
                let verdict = if outcome.result.passed { "PASS" } else { "FAIL" };
                println!("{verdict} {} -> {}", id.short(), outcome.item.status);
                if let Some(diagnosis) = &outcome.result.diagnosis {
                    println!("     {diagnosis}");
                }
                if let Some(fix) = &outcome.result.recommended_fix {
                    println!("     fix: {fix}");
                }
            }
            Err(err) => println!("ERR  {}: {err}", id.short()),
        }
    }
    Ok(())
}

async fn cmd_confirm(store: &dyn AuditStore, id: &str) -> Result<()> {
    let id = FindingId::try_from(id.to_string()).context("Invalid item id")?;
    let engine = verification_engine(10)?;
    let item = engine.confirm(store, &id).await?;
    println!("{} -> {}", item.id.short(), item.status);
    Ok(())
}

async fn cmd_block(store: &dyn AuditStore, id: &str, reason: &str) -> Result<()> {
    let id = FindingId::try_from(id.to_string()).context("Invalid item id")?;
    let engine = verification_engine(10)?;
    let item = engine.block(store, &id, reason).await?;
    println!("{} -> {}", item.id.short(), item.status);
    Ok(())
}

async fn cmd_digest(store: &dyn AuditStore) -> Result<()> {
    match sitepulse_engine::run_digest(store).await? {
        None => println!("Need at least two snapshots; run ingest twice first."),
        Some(digest) => {
            println!("Week of {}", digest.week_of);
            println!(
                "Rankings:  {} improved, {} declined, {} stable (avg {:+.1})",
                digest.rankings_summary.improved,
                digest.rankings_summary.declined,
                digest.rankings_summary.stable,
                digest.rankings_summary.average_change
            );
            println!("Traffic:   {:+.1}%", digest.traffic_change_pct);
            println!("Backlinks: {:+}", digest.backlink_net_change);
            println!("Health:    {:+.1}", digest.overall_health_change);
            for h in &digest.highlights {
                println!("  + {h}");
            }
            for c in &digest.concerns {
                println!("  - {c}");
            }
            for o in &digest.opportunities {
                println!("  ~ {o}");
            }
        }
    }
    Ok(())
}
