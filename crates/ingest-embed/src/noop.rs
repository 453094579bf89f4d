use async_trait::async_trait;

use ingest_core::{EmbedderPort, IngestResult};

/// Returns fixed zero vectors of the configured dimension. Used in tests
/// and `--dry-run` style invocations where embedding cost is avoided.
pub struct NoopEmbedder {
    dimension: usize,
}

impl NoopEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbedderPort for NoopEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> IngestResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.0; self.dimension]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn produces_one_zero_vector_per_input() {
        let embedder = NoopEmbedder::new(4);
        let out = embedder.embed(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], vec![0.0; 4]);
    }
}
