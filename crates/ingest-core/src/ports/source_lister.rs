//! Source Lister port.

use async_trait::async_trait;

use crate::domain::SourceMeta;
use crate::errors::IngestResult;

/// Configuration-enumerated filters applied while listing a channel.
#[derive(Debug, Clone, Default)]
pub struct SourceListerFilters {
    pub skip_shorts: bool,
    pub max_duration_s: Option<u32>,
    pub newest_first: bool,
    pub skip_live: bool,
    pub skip_upcoming: bool,
    pub skip_members_only: bool,
}

/// Enumerates candidate items with metadata. Implementations MUST be
/// resumable: no in-memory channel-wide buffering past the next batch.
///
/// Failure to enumerate is fatal for the whole run (`IngestError::Enumeration`);
/// failure to enrich a single item degrades to [`SourceMeta::minimal`]
/// rather than failing the whole list.
#[async_trait]
pub trait SourceListerPort: Send + Sync {
    async fn list(
        &self,
        channel_reference: &str,
        filters: &SourceListerFilters,
    ) -> IngestResult<Vec<SourceMeta>>;
}
