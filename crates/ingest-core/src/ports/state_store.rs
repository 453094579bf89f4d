//! State Store port.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{Source, SourceMeta, SourceStatus};

/// Persists per-item processing state; supports idempotent upserts and
/// validated status transitions.
///
/// All status updates are single-statement atomic writes; the
/// `(source_type, external_id)` unique constraint is the authoritative
/// deduplication mechanism — implementations must not pre-check existence
/// in application code.
#[async_trait]
pub trait StateStorePort: Send + Sync {
    /// Idempotent on `(source_type, external_id)`.
    async fn upsert_source(&self, meta: &SourceMeta) -> Result<(), RepositoryError>;

    async fn get_state(
        &self,
        source_type: &str,
        external_id: &str,
    ) -> Result<Option<Source>, RepositoryError>;

    /// Single-statement atomic write. `fields` carries the auxiliary
    /// counters/flags relevant to the new status (retry count, error
    /// message, segments/embeddings counts).
    async fn update_status(
        &self,
        source_type: &str,
        external_id: &str,
        new_status: SourceStatus,
        fields: StatusUpdate,
    ) -> Result<(), RepositoryError>;

    /// Bulk existence check, used by the Orchestrator to filter a freshly
    /// listed batch before enqueueing.
    async fn batch_check_exists(
        &self,
        ids: &[(String, String)],
    ) -> Result<std::collections::HashMap<(String, String), SourceStatus>, RepositoryError>;
}

/// Auxiliary fields attached to a status transition. Only the fields
/// relevant to the target status need be set; the rest are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub retry_count: Option<u32>,
    pub last_error: Option<String>,
    pub has_manual_captions: Option<bool>,
    pub has_asr: Option<bool>,
    pub segments_count: Option<u32>,
    pub embeddings_count: Option<u32>,
}
