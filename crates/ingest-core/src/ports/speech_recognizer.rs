//! Speech Recognizer port.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::SegmentMetrics;
use crate::errors::IngestResult;

/// Which recognizer implementation to invoke, selected by the
/// Orchestrator's cost/routing policy and held sticky for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerMode {
    /// Local GPU inference, first pass with a fast model, optional
    /// refinement pass with a high-accuracy model.
    LocalGpu,
    /// Remote HTTP recognizer, billed per audio minute.
    RemoteApi,
}

/// One timed text segment as produced by the recognizer, before
/// optimization or speaker attribution.
#[derive(Debug, Clone)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub metrics: SegmentMetrics,
}

/// Transforms audio into timed text segments with per-segment quality
/// metrics. Deterministic given the same model and `temperature =
/// 0`; MUST NOT discard empty-text segments — filtering is the caller's
/// responsibility.
#[async_trait]
pub trait SpeechRecognizerPort: Send + Sync {
    async fn transcribe(
        &self,
        audio_path: &Path,
        mode: RecognizerMode,
    ) -> IngestResult<Vec<RawSegment>>;

    /// Re-transcribe a single span with the high-accuracy model, used for
    /// the refinement pass. The returned segment has `re_asr` set
    /// by the caller, not by this port.
    async fn refine(&self, audio_path: &Path, start: f64, end: f64) -> IngestResult<RawSegment>;
}
