//! In-memory `SQLite` test doubles for the persistence ports.
//!
//! Downstream crates exercise the Orchestrator's pipeline logic against
//! these instead of a live Postgres instance.
//! Query shapes mirror the Postgres adapters closely; the one semantic gap
//! is vector search, which these doubles do not attempt to approximate.

mod segment_store;
mod state_store;

pub use segment_store::SqliteSegmentStore;
pub use state_store::SqliteStateStore;
