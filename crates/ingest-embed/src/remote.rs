//! HTTP embedding backend, modeled on a typical local-model-server
//! embedding API: POST a batch of strings, get back one vector per input.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ingest_core::{EmbedderPort, IngestError, IngestResult};

#[derive(Debug, Clone)]
pub struct RemoteEmbedderConfig {
    pub endpoint: String,
    pub model: String,
    pub dimension: usize,
    /// Requests are chunked to this many texts per call.
    pub batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct RemoteEmbedder {
    client: reqwest::Client,
    config: RemoteEmbedderConfig,
}

impl RemoteEmbedder {
    #[must_use]
    pub fn new(config: RemoteEmbedderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn embed_chunk(&self, chunk: &[String]) -> IngestResult<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.config.model,
            input: chunk,
        };

        let response = self
            .client
            .post(format!("{}/embed", self.config.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| IngestError::embedding_failed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::embedding_failed(format!(
                "embedding service returned {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| IngestError::embedding_failed(format!("malformed response: {e}")))?;

        if parsed.embeddings.len() != chunk.len() {
            return Err(IngestError::embedding_failed(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                parsed.embeddings.len()
            )));
        }

        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl EmbedderPort for RemoteEmbedder {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, texts: &[String]) -> IngestResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            out.extend(self.embed_chunk(chunk).await?);
        }
        Ok(out)
    }
}
