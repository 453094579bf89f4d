//! Segment Store port.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{Segment, SourceMeta};

/// Batch-inserts segments and updates source rows; owns uniqueness
/// invariants and the vector index.
///
/// The store is the only component that touches the database for writes;
/// `replace_segments` is the idempotence anchor for crash recovery.
#[async_trait]
pub trait SegmentStorePort: Send + Sync {
    /// Idempotent on `(source_type, external_id)`. Returns the row id.
    async fn upsert_source(&self, meta: &SourceMeta) -> Result<i64, RepositoryError>;

    /// Atomic: deletes prior segments for the Source and bulk-inserts the
    /// new set in a single transaction. Per-row failures abort the whole
    /// batch (all-or-nothing).
    async fn replace_segments(
        &self,
        external_id: &str,
        segments: &[Segment],
    ) -> Result<(), RepositoryError>;

    async fn mark_status(
        &self,
        external_id: &str,
        status: &str,
        segments_count: u32,
        embeddings_count: u32,
    ) -> Result<(), RepositoryError>;

    /// Lazy creation of an ANN index over the embedding column; re-running
    /// is a no-op. Called once per process after the first batch of
    /// sufficient size has been inserted.
    async fn ensure_vector_index(&self) -> Result<(), RepositoryError>;
}
