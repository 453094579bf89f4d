//! Voice Profile Store port.

use async_trait::async_trait;

use crate::domain::VoiceProfile;
use crate::errors::IngestResult;

/// Read-only loader for externally-enrolled voice profiles.
/// Re-read once at Orchestrator startup; never mutated by the pipeline.
#[async_trait]
pub trait VoiceProfileStorePort: Send + Sync {
    async fn load_all(&self) -> IngestResult<Vec<VoiceProfile>>;

    async fn get(&self, name: &str) -> IngestResult<Option<VoiceProfile>>;
}
