//! Embedder port.

use async_trait::async_trait;

use crate::errors::IngestResult;

/// Produces a fixed-dimension vector for each input text. The
/// dimension `D` is a deployment constant, not negotiated per call.
/// Failure of a batch fails the owning Source (retry path).
#[async_trait]
pub trait EmbedderPort: Send + Sync {
    /// Fixed output dimension for this embedder instance.
    fn dimension(&self) -> usize;

    async fn embed(&self, texts: &[String]) -> IngestResult<Vec<Vec<f32>>>;
}
