//! Composition root. This is the only place concrete adapters are
//! constructed and wired into the trait-object bundle the orchestrator
//! runs against; every other module in this crate works purely in terms
//! of `ingest_core` ports.

use std::path::PathBuf;
use std::sync::Arc;

use ingest_asr::{HybridRecognizer, HybridRecognizerConfig, LocalWhisperConfig, OnnxDiarizer, OnnxDiarizerConfig, RemoteAsrConfig};
use ingest_core::{IngestConfig, ProgressEmitterPort, SourceBackend};
use ingest_db::{setup_database, FileVoiceProfileStore, PostgresSegmentStore, PostgresStateStore};
use ingest_embed::{NoopEmbedder, RemoteEmbedder, RemoteEmbedderConfig};
use ingest_orchestrator::{FanOutEmitter, Orchestrator, OrchestratorDeps, RingBufferEmitter, RunSummaryReporter, StdoutJsonEmitter};
use ingest_sources::{
    ApiSourceLister, ApiSourceListerConfig, CaptionFetcherConfig, CliAudioAcquirer, CliAudioAcquirerConfig,
    FallbackCaptionFetcher, ScrapeSourceLister, ScrapeSourceListerConfig,
};

use crate::error::CliError;

/// Everything `main` needs after composition: a ready-to-run orchestrator
/// plus the reporter it feeds, so the caller can render the final summary.
pub struct CliContext {
    pub orchestrator: Orchestrator,
    pub run_summary: Arc<RunSummaryReporter>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn build_recognizer(config: &IngestConfig) -> Result<HybridRecognizer, CliError> {
    let local = if std::env::var("INGEST_DISABLE_LOCAL_ASR").is_ok() {
        None
    } else {
        Some(LocalWhisperConfig {
            primary_model_path: PathBuf::from(&config.whisper_model_primary),
            refine_model_path: PathBuf::from(&config.whisper_model_refine),
            language: env_or("INGEST_WHISPER_LANGUAGE", "en"),
            n_threads: env_or("INGEST_WHISPER_THREADS", "4").parse().unwrap_or(4),
        })
    };
    let remote = std::env::var("INGEST_REMOTE_ASR_ENDPOINT").ok().map(|endpoint| RemoteAsrConfig {
        endpoint,
        api_key: config.api_key.clone().unwrap_or_default(),
        rate_per_min: config
            .remote_asr_rate_per_min
            .map(f64::from)
            .unwrap_or(60.0),
    });
    HybridRecognizer::new(HybridRecognizerConfig { local, remote }).map_err(CliError::from)
}

fn build_diarizer(config: &IngestConfig) -> Result<OnnxDiarizer, CliError> {
    let model_path = PathBuf::from(env_or("INGEST_DIARIZER_MODEL_PATH", "./models/diarizer.onnx"));
    OnnxDiarizer::load(OnnxDiarizerConfig {
        model_path,
        embedding_dimension: config.embedding_dimension,
    })
    .map_err(CliError::from)
}

/// Wires every adapter and returns a ready-to-run [`CliContext`].
///
/// # Errors
/// Propagates database setup failures and local-model load failures as
/// [`CliError::Fatal`].
pub async fn bootstrap(config: IngestConfig, local_gpu_available: bool) -> Result<CliContext, CliError> {
    let config = Arc::new(config);

    let source_lister: Arc<dyn ingest_core::SourceListerPort> = match config.source_backend {
        SourceBackend::Scrape => Arc::new(ScrapeSourceLister::new(ScrapeSourceListerConfig::default())),
        SourceBackend::Api => Arc::new(ApiSourceLister::new(ApiSourceListerConfig {
            endpoint: env_or("INGEST_SOURCE_API_ENDPOINT", ""),
            api_key: config.api_key.clone().unwrap_or_default(),
            source_type: env_or("INGEST_SOURCE_TYPE", "youtube"),
            page_size: env_or("INGEST_SOURCE_API_PAGE_SIZE", "50").parse().unwrap_or(50),
        })),
    };

    let audio_acquirer = Arc::new(CliAudioAcquirer::new(CliAudioAcquirerConfig {
        storage_dir: config.storage_dir.clone(),
        ..CliAudioAcquirerConfig::default()
    }));

    let caption_fetcher = Arc::new(FallbackCaptionFetcher::new(CaptionFetcherConfig {
        structured_api_endpoint: std::env::var("INGEST_CAPTIONS_API_ENDPOINT").ok(),
        structured_api_key: config.api_key.clone(),
        medical_grade: config.medical_grade_captions,
        scratch_dir: config.storage_dir.clone(),
        ..CaptionFetcherConfig::default()
    }));

    let speech_recognizer = Arc::new(build_recognizer(&config)?);
    let diarizer = Arc::new(build_diarizer(&config)?);

    let embedder: Arc<dyn ingest_core::EmbedderPort> = match std::env::var("INGEST_EMBEDDER_ENDPOINT") {
        Ok(endpoint) => Arc::new(RemoteEmbedder::new(RemoteEmbedderConfig {
            endpoint,
            model: env_or("INGEST_EMBEDDER_MODEL", "text-embedding-3-small"),
            dimension: config.embedding_dimension,
            batch_size: config.batch_embed_size,
        })),
        Err(_) => Arc::new(NoopEmbedder::new(config.embedding_dimension)),
    };

    let voice_profile_store = Arc::new(FileVoiceProfileStore::new(config.voice_profile_dir.clone()));

    let pool = setup_database(&config.database_url, config.embedding_dimension)
        .await
        .map_err(CliError::Other)?;
    let state_store = Arc::new(PostgresStateStore::new(pool.clone()));
    let segment_store = Arc::new(PostgresSegmentStore::new(pool));

    let run_summary = Arc::new(RunSummaryReporter::new());
    let mut subscribers: Vec<Arc<dyn ProgressEmitterPort>> = vec![Arc::new(StdoutJsonEmitter)];
    if std::env::var("INGEST_RING_BUFFER_EMITTER").is_ok() {
        subscribers.push(Arc::new(RingBufferEmitter::new(1024)));
    }
    subscribers.push(run_summary.clone());
    let emitter = Arc::new(FanOutEmitter::new(subscribers));

    let deps = OrchestratorDeps {
        config,
        source_lister,
        audio_acquirer,
        caption_fetcher,
        speech_recognizer,
        diarizer,
        embedder,
        state_store,
        segment_store,
        voice_profile_store,
        emitter,
        local_gpu_available,
    };

    Ok(CliContext {
        orchestrator: Orchestrator::new(deps),
        run_summary,
    })
}
