//! SitePulse engine - audit aggregation and remediation
//!
//! Turns heterogeneous auditor findings into:
//! - A deduplicated, severity-ordered alert stream
//! - A checklist of remediation items, each with its own verification
//!   state machine
//! - A periodic digest of net change between metrics snapshots

pub mod alerts;
pub mod checklist;
pub mod classify;
pub mod digest;
pub mod error;
pub mod normalize;
pub mod obs;
pub mod pipeline;
pub mod providers;
pub mod sources;
pub mod verify;

// Re-export key types
pub use alerts::AlertEvaluation;
pub use checklist::GenerationOutcome;
pub use classify::{classify, classify_all, ClassifiedFinding};
pub use digest::{build_digest, run_digest};
pub use error::{EngineError, Result};
pub use normalize::{normalize_batch, NormalizedBatch};
pub use pipeline::{IngestPipeline, IngestReport};
pub use providers::{FixedOutcomeProvider, HttpTagProvider};
pub use sources::AuditBatch;
pub use verify::{next_status, VerificationEngine, VerificationOutcome, VerificationProvider};
