//! Speech Recognizer: dispatches between the local-GPU and remote-API
//! backends per the mode the Orchestrator's routing policy selects.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use ingest_core::{
    IngestError, IngestResult, RawSegment, RecognizerMode, SegmentMetrics, SpeechRecognizerPort,
};

use crate::metrics::compression_ratio;

#[cfg(feature = "local-asr")]
use crate::local_whisper::{LocalWhisperConfig, LocalWhisperRecognizer};

#[derive(Debug, Clone)]
pub struct RemoteAsrConfig {
    pub endpoint: String,
    pub api_key: String,
    /// USD per minute of audio, used by the Orchestrator's cost ledger; this
    /// adapter does not enforce the budget itself.
    pub rate_per_min: f64,
}

#[derive(Debug, Deserialize)]
struct RemoteSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    avg_logprob: f64,
    #[serde(default)]
    no_speech_prob: f64,
}

#[derive(Debug, Deserialize)]
struct RemoteTranscribeResponse {
    segments: Vec<RemoteSegment>,
}

#[derive(Debug, Clone)]
pub struct HybridRecognizerConfig {
    #[cfg(feature = "local-asr")]
    pub local: Option<LocalWhisperConfig>,
    pub remote: Option<RemoteAsrConfig>,
}

/// Implements [`SpeechRecognizerPort`] by routing to whichever backend
/// `mode` selects. Both backends may be configured at once; the
/// Orchestrator picks `mode` per run, not per call.
pub struct HybridRecognizer {
    #[cfg(feature = "local-asr")]
    local: Option<crate::local_whisper::LocalWhisperRecognizer>,
    remote_client: reqwest::Client,
    remote: Option<RemoteAsrConfig>,
}

impl HybridRecognizer {
    pub fn new(config: HybridRecognizerConfig) -> IngestResult<Self> {
        #[cfg(feature = "local-asr")]
        let local = config
            .local
            .map(LocalWhisperRecognizer::load)
            .transpose()?;

        Ok(Self {
            #[cfg(feature = "local-asr")]
            local,
            remote_client: reqwest::Client::new(),
            remote: config.remote,
        })
    }

    async fn transcribe_remote(&self, audio_path: &Path) -> IngestResult<Vec<RawSegment>> {
        let config = self
            .remote
            .as_ref()
            .ok_or_else(|| IngestError::configuration("remote ASR not configured"))?;

        let bytes = tokio::fs::read(audio_path)
            .await
            .map_err(|e| IngestError::from_io_error(&e))?;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(
                audio_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "audio.wav".to_string()),
            );
        let form = reqwest::multipart::Form::new().part("audio", part);

        let response = self
            .remote_client
            .post(format!("{}/transcribe", config.endpoint))
            .bearer_auth(&config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| IngestError::asr_failed(format!("remote request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IngestError::asr_failed(format!(
                "remote recognizer returned {}",
                response.status()
            )));
        }

        let parsed: RemoteTranscribeResponse = response
            .json()
            .await
            .map_err(|e| IngestError::asr_failed(format!("malformed remote response: {e}")))?;

        Ok(parsed
            .segments
            .into_iter()
            .map(|s| RawSegment {
                start: s.start,
                end: s.end,
                metrics: SegmentMetrics {
                    avg_logprob: s.avg_logprob,
                    compression_ratio: compression_ratio(&s.text),
                    no_speech_prob: s.no_speech_prob,
                    temperature_used: 0.0,
                },
                text: s.text,
            })
            .collect())
    }

    async fn refine_remote(&self, audio_path: &Path, start: f64, end: f64) -> IngestResult<RawSegment> {
        let segments = self.transcribe_remote(audio_path).await?;
        segments
            .into_iter()
            .find(|s| (s.start - start).abs() < 0.5 && (s.end - end).abs() < 0.5)
            .ok_or_else(|| IngestError::asr_failed("remote refinement found no matching span"))
    }
}

#[async_trait]
impl SpeechRecognizerPort for HybridRecognizer {
    async fn transcribe(
        &self,
        audio_path: &Path,
        mode: RecognizerMode,
    ) -> IngestResult<Vec<RawSegment>> {
        match mode {
            RecognizerMode::LocalGpu => {
                #[cfg(feature = "local-asr")]
                {
                    let recognizer = self
                        .local
                        .as_ref()
                        .ok_or_else(|| IngestError::configuration("local ASR not configured"))?;
                    recognizer.transcribe(audio_path)
                }
                #[cfg(not(feature = "local-asr"))]
                {
                    let _ = audio_path;
                    Err(IngestError::configuration("local-asr feature disabled"))
                }
            }
            RecognizerMode::RemoteApi => self.transcribe_remote(audio_path).await,
        }
    }

    async fn refine(&self, audio_path: &Path, start: f64, end: f64) -> IngestResult<RawSegment> {
        #[cfg(feature = "local-asr")]
        if let Some(recognizer) = &self.local {
            return recognizer.refine(audio_path, start, end);
        }
        self.refine_remote(audio_path, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remote_mode_without_config_errors() {
        let recognizer = HybridRecognizer::new(HybridRecognizerConfig {
            #[cfg(feature = "local-asr")]
            local: None,
            remote: None,
        })
        .unwrap();

        let err = recognizer
            .transcribe(Path::new("/tmp/doesnotexist.wav"), RecognizerMode::RemoteApi)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Configuration { .. }));
    }
}
