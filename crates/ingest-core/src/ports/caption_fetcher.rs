//! Caption Fetcher port.

use async_trait::async_trait;

use crate::errors::IngestResult;

/// A single normalized caption cue.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A normalized, filtered, gap-merged sequence of captions for one item.
#[derive(Debug, Clone, Default)]
pub struct CaptionSet {
    pub captions: Vec<Caption>,
    /// True if the source track was machine-generated. Medical-grade mode
    /// rejects these outright before this type is even constructed,
    /// but the flag is kept for provenance/logging.
    pub auto_generated: bool,
    pub language: String,
}

/// Distinguishes *why* no usable caption was returned, so the Orchestrator
/// can log provenance without re-deriving it from the fallback ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionOutcome {
    Found,
    NoTrackAvailable,
    OnlyAutoGeneratedRejected,
    Disabled,
}

/// Retrieves pre-existing manual captions when available; rejects
/// auto-generated captions in medical-grade mode.
#[async_trait]
pub trait CaptionFetcherPort: Send + Sync {
    async fn fetch(
        &self,
        external_id: &str,
        language_prefs: &[String],
    ) -> IngestResult<(CaptionOutcome, Option<CaptionSet>)>;
}
