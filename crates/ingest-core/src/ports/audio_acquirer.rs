//! Audio Acquirer port.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::IngestResult;

/// Constraints governing acquisition.
#[derive(Debug, Clone)]
pub struct AcquireConstraints {
    pub max_size_mb: u32,
    pub max_duration_s: Option<u32>,
    /// Target container, e.g. `"wav16k_mono"` for the local ASR path or
    /// `"mp3"` for the remote-API path (≤25 MB cap enforced separately).
    pub container: String,
}

/// A non-fatal reason acquisition produced no audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Members-only, private, or geo-blocked content.
    Inaccessible { detail: String },
    /// Oversize even after the compression fallback.
    TooLarge { bytes: u64, cap_bytes: u64 },
}

/// The local artifact produced by a successful acquisition.
#[derive(Debug, Clone)]
pub struct AcquiredAudio {
    pub path: PathBuf,
    pub duration_s: f64,
    pub size_bytes: u64,
    /// Whether the compression fallback engaged to meet the size cap.
    pub compressed: bool,
}

/// Obtains a local audio artifact for an item (download + transcode) with
/// size/duration guards.
#[async_trait]
pub trait AudioAcquirerPort: Send + Sync {
    async fn acquire(
        &self,
        external_id: &str,
        constraints: &AcquireConstraints,
    ) -> IngestResult<Result<AcquiredAudio, SkipReason>>;

    /// Release (delete) a previously acquired artifact. Called on every
    /// exit path — success, failure, or cancellation — unless the
    /// retention policy flag is set.
    async fn release(&self, audio: &AcquiredAudio) -> IngestResult<()>;
}
