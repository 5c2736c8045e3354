//! SitePulse Store: persistence port and backends
//!
//! The engine only ever talks to the [`AuditStore`] trait; persistence
//! technology stays out of the design. Two backends are provided:
//!
//! - `MemoryAuditStore`: `HashMap`-backed, for tests and ephemeral runs
//! - `SurrealAuditStore`: SurrealDB (in-memory, surrealkv, or remote)
//!
//! All keys are deterministic content hashes, so concurrent upserts to
//! different ids are safe; checklist status and alert flags go through
//! compare-and-set / create-iff-absent operations.

mod error;
pub mod memory;
mod migrations;
pub mod schema;
pub mod surreal;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryAuditStore;
pub use migrations::init_schema;
pub use surreal::SurrealAuditStore;
pub use traits::{AuditStore, ItemStatusChange};
