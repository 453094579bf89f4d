//! Diarizer + Voice Identifier: fixed-window speaker-embedding
//! extraction via an ONNX embedding model, compared against the profile
//! centroid per window.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use ingest_core::{DiarizerPort, IngestError, IngestResult, SpeakerTurn, VoiceProfile};

use crate::wav::read_samples;

const WINDOW_S: f64 = 3.0;
const HOP_S: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct OnnxDiarizerConfig {
    pub model_path: PathBuf,
    pub embedding_dimension: usize,
}

/// Speaker-embedding extractor + turn segmenter. Turns are produced on a
/// fixed sliding window rather than full clustering: the attribution policy
/// only needs per-window similarity against one known target
/// profile, not general multi-speaker clustering.
pub struct OnnxDiarizer {
    #[cfg(feature = "local-diarize")]
    session: ort::session::Session,
    config: OnnxDiarizerConfig,
}

impl OnnxDiarizer {
    #[cfg(feature = "local-diarize")]
    pub fn load(config: OnnxDiarizerConfig) -> IngestResult<Self> {
        let session = ort::session::Session::builder()
            .map_err(|e| IngestError::speaker_id_failed(format!("session builder: {e}")))?
            .commit_from_file(&config.model_path)
            .map_err(|e| IngestError::speaker_id_failed(format!("failed to load model: {e}")))?;
        Ok(Self { session, config })
    }

    #[cfg(not(feature = "local-diarize"))]
    pub fn load(config: OnnxDiarizerConfig) -> IngestResult<Self> {
        Ok(Self { config })
    }

    #[cfg(feature = "local-diarize")]
    fn embed_window(&self, samples: &[f32]) -> IngestResult<Vec<f32>> {
        use ndarray::Array2;

        let input = Array2::from_shape_vec((1, samples.len()), samples.to_vec())
            .map_err(|e| IngestError::speaker_id_failed(format!("bad input shape: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs!["audio" => input.view()].map_err(|e| {
                IngestError::speaker_id_failed(format!("failed to bind input: {e}"))
            })?)
            .map_err(|e| IngestError::speaker_id_failed(format!("inference failed: {e}")))?;

        let embedding = outputs["embedding"]
            .try_extract_tensor::<f32>()
            .map_err(|e| IngestError::speaker_id_failed(format!("bad output tensor: {e}")))?
            .view()
            .iter()
            .copied()
            .collect::<Vec<f32>>();

        if embedding.len() != self.config.embedding_dimension {
            return Err(IngestError::speaker_id_failed(format!(
                "expected {}-dim embedding, got {}",
                self.config.embedding_dimension,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    #[cfg(not(feature = "local-diarize"))]
    fn embed_window(&self, _samples: &[f32]) -> IngestResult<Vec<f32>> {
        Err(IngestError::speaker_id_failed(
            "local-diarize feature disabled",
        ))
    }
}

#[async_trait]
impl DiarizerPort for OnnxDiarizer {
    async fn diarize(
        &self,
        audio_path: &Path,
        profile: &VoiceProfile,
    ) -> IngestResult<Vec<SpeakerTurn>> {
        let (samples, rate) = read_samples(audio_path)?;
        let window_len = (WINDOW_S * f64::from(rate)) as usize;
        let hop_len = (HOP_S * f64::from(rate)).max(1.0) as usize;

        if samples.len() < window_len || window_len == 0 {
            return Ok(Vec::new());
        }

        let mut turns = Vec::new();
        let mut offset = 0usize;
        while offset + window_len <= samples.len() {
            let window = &samples[offset..offset + window_len];
            let embedding = self.embed_window(window)?;
            let similarity = profile.similarity(&embedding).ok_or_else(|| {
                IngestError::speaker_id_failed("embedding dimension does not match voice profile")
            })?;

            turns.push(SpeakerTurn {
                start: offset as f64 / f64::from(rate),
                end: (offset + window_len) as f64 / f64::from(rate),
                speaker_tag: format!("turn-{}", turns.len()),
                embedding,
                similarity,
            });

            offset += hop_len;
        }

        Ok(turns)
    }
}
