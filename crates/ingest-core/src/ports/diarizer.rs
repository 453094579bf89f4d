//! Diarizer + Voice Identifier port.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::VoiceProfile;
use crate::errors::IngestResult;

/// A contiguous span attributed to one speaker by the diarizer, with its
/// similarity against the target voice profile's centroid.
#[derive(Debug, Clone)]
pub struct SpeakerTurn {
    pub start: f64,
    pub end: f64,
    /// Opaque tag from the diarizer, not yet resolved to CHAFFEE/GUEST.
    pub speaker_tag: String,
    pub embedding: Vec<f32>,
    pub similarity: f64,
}

/// Partitions audio into speaker turns and classifies each turn against a
/// stored target voice centroid.
#[async_trait]
pub trait DiarizerPort: Send + Sync {
    async fn diarize(
        &self,
        audio_path: &Path,
        profile: &VoiceProfile,
    ) -> IngestResult<Vec<SpeakerTurn>>;
}
