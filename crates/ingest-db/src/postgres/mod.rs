//! Postgres + pgvector adapters for the persistence ports.

mod segment_store;
mod state_store;

pub use segment_store::PostgresSegmentStore;
pub use state_store::PostgresStateStore;
