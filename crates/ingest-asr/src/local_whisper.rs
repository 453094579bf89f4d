//! Local GPU speech recognition via whisper.cpp bindings, with a two-model
//! first-pass/refinement split.

use std::path::{Path, PathBuf};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState};

use ingest_core::{IngestError, IngestResult, RawSegment, SegmentMetrics};

use crate::metrics::compression_ratio;
use crate::wav::read_samples;

#[derive(Debug, Clone)]
pub struct LocalWhisperConfig {
    /// Fast model for the first transcription pass.
    pub primary_model_path: PathBuf,
    /// High-accuracy model for the refinement pass.
    pub refine_model_path: PathBuf,
    pub language: String,
    pub n_threads: u32,
}

pub(crate) struct LocalWhisperRecognizer {
    primary: WhisperContext,
    refine: WhisperContext,
    config: LocalWhisperConfig,
}

impl LocalWhisperRecognizer {
    pub(crate) fn load(config: LocalWhisperConfig) -> IngestResult<Self> {
        let primary = WhisperContext::new_with_params(
            &config.primary_model_path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| IngestError::asr_failed(format!("failed to load primary model: {e}")))?;

        let refine = WhisperContext::new_with_params(
            &config.refine_model_path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| IngestError::asr_failed(format!("failed to load refine model: {e}")))?;

        Ok(Self {
            primary,
            refine,
            config,
        })
    }

    fn build_params(&self) -> FullParams<'_, '_> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        let lang = if self.config.language == "auto" {
            None
        } else {
            Some(self.config.language.as_str())
        };
        params.set_language(lang);
        params.set_translate(false);
        if self.config.n_threads > 0 {
            #[allow(clippy::cast_possible_wrap)]
            params.set_n_threads(self.config.n_threads as i32);
        }
        params.set_single_segment(false);
        params.set_no_timestamps(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_special(false);
        params.set_temperature(0.0);
        params
    }

    fn collect_raw_segments(state: &WhisperState) -> IngestResult<Vec<RawSegment>> {
        let num_segments = state.full_n_segments();
        let mut out = Vec::with_capacity(num_segments.max(0) as usize);

        for i in 0..num_segments {
            let Some(segment) = state.get_segment(i) else {
                continue;
            };
            let Ok(text) = segment.to_str() else {
                continue;
            };
            let text = text.trim().to_string();

            let start = segment.start_timestamp() as f64 * 0.01;
            let end = segment.end_timestamp() as f64 * 0.01;

            let no_speech_prob = f64::from(state.full_get_segment_no_speech_prob(i));
            let avg_logprob = Self::average_token_logprob(&segment);

            out.push(RawSegment {
                start,
                end,
                metrics: SegmentMetrics {
                    avg_logprob,
                    compression_ratio: compression_ratio(&text),
                    no_speech_prob,
                    temperature_used: 0.0,
                },
                text,
            });
        }

        Ok(out)
    }

    /// Averages per-token log-probabilities within a segment. Falls back to
    /// `0.0` (never triggers refinement on its own) if token data is
    /// unavailable for the loaded model.
    fn average_token_logprob(segment: &whisper_rs::WhisperSegment<'_>) -> f64 {
        let n_tokens = segment.n_tokens();
        if n_tokens == 0 {
            return 0.0;
        }
        let mut sum = 0.0_f64;
        let mut counted = 0usize;
        for j in 0..n_tokens {
            if let Some(token) = segment.get_token_data(j) {
                sum += f64::from(token.plog);
                counted += 1;
            }
        }
        if counted == 0 {
            0.0
        } else {
            sum / counted as f64
        }
    }

    pub(crate) fn transcribe(&self, audio_path: &Path) -> IngestResult<Vec<RawSegment>> {
        let (samples, _rate) = read_samples(audio_path)?;
        let mut state = self
            .primary
            .create_state()
            .map_err(|e| IngestError::asr_failed(format!("failed to create state: {e}")))?;
        let params = self.build_params();
        state
            .full(params, &samples)
            .map_err(|e| IngestError::asr_failed(format!("transcription failed: {e}")))?;
        Self::collect_raw_segments(&state)
    }

    pub(crate) fn refine(&self, audio_path: &Path, start: f64, end: f64) -> IngestResult<RawSegment> {
        let (samples, rate) = read_samples(audio_path)?;
        let from = (start * f64::from(rate)).max(0.0) as usize;
        let to = ((end * f64::from(rate)) as usize).min(samples.len());
        let clip = samples.get(from..to).unwrap_or(&[]);

        let mut state = self
            .refine
            .create_state()
            .map_err(|e| IngestError::asr_failed(format!("failed to create state: {e}")))?;
        let params = self.build_params();
        state
            .full(params, clip)
            .map_err(|e| IngestError::asr_failed(format!("refinement failed: {e}")))?;

        let mut segments = Self::collect_raw_segments(&state)?;
        if segments.is_empty() {
            return Err(IngestError::asr_failed("refinement produced no text"));
        }

        // The clip is a single span; stitch multi-segment output back into
        // one RawSegment spanning the original range.
        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let metrics = segments.remove(0).metrics;

        Ok(RawSegment {
            start,
            end,
            text,
            metrics,
        })
    }
}
