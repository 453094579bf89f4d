//! Dependency bundle the Orchestrator is constructed with: one trait object
//! per port plus the event sink. Every adapter crate
//! (`ingest-sources`, `ingest-asr`, `ingest-embed`, `ingest-db`) implements
//! one of these traits; wiring concrete instances together is the CLI
//! binary's job, not this crate's (mirrors `WorkerDeps` in the download
//! manager this orchestrator replaces).

use std::sync::Arc;

use ingest_core::{
    AudioAcquirerPort, CaptionFetcherPort, DiarizerPort, EmbedderPort, IngestConfig,
    ProgressEmitterPort, SegmentStorePort, SourceListerPort, SpeechRecognizerPort, StateStorePort,
    VoiceProfileStorePort,
};

/// Everything the Orchestrator needs to run a batch, gathered in one place
/// so `Orchestrator::new` takes a single argument instead of ten.
pub struct OrchestratorDeps {
    pub config: Arc<IngestConfig>,
    pub source_lister: Arc<dyn SourceListerPort>,
    pub audio_acquirer: Arc<dyn AudioAcquirerPort>,
    pub caption_fetcher: Arc<dyn CaptionFetcherPort>,
    pub speech_recognizer: Arc<dyn SpeechRecognizerPort>,
    pub diarizer: Arc<dyn DiarizerPort>,
    pub embedder: Arc<dyn EmbedderPort>,
    pub state_store: Arc<dyn StateStorePort>,
    pub segment_store: Arc<dyn SegmentStorePort>,
    pub voice_profile_store: Arc<dyn VoiceProfileStorePort>,
    pub emitter: Arc<dyn ProgressEmitterPort>,
    /// Whether a local GPU recognizer backend is available in this
    /// deployment, decided by the caller (model files present, feature
    /// compiled in). Feeds the cost/routing policy; this crate has
    /// no way to probe GPU presence itself.
    pub local_gpu_available: bool,
}
