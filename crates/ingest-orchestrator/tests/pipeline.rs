//! End-to-end pipeline tests against the `SQLite` test doubles: no real
//! network, ASR, or embedding backend, just the Orchestrator's own
//! state-machine and wiring.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use ingest_core::{
    AcquireConstraints, AcquiredAudio, AsrQualityThresholds, AudioAcquirerPort, Caption,
    CaptionFetcherPort, CaptionOutcome, CaptionSet, DiarizerPort, EmbedderPort, IngestConfig,
    IngestResult, LogFormat, RawSegment, RecognizerMode, SkipReason, SourceBackend,
    SourceListerFilters, SourceListerPort, SourceMeta, SourceStatus, SpeakerTurn,
    SpeechRecognizerPort, VoiceProfile, VoiceProfileStorePort,
};
use ingest_db::setup_test_database;
use ingest_db::testutil::{SqliteSegmentStore, SqliteStateStore};
use ingest_orchestrator::{FanOutEmitter, Orchestrator, OrchestratorDeps, RingBufferEmitter, RunSummaryReporter};

struct FixedSourceLister {
    metas: Vec<SourceMeta>,
}

#[async_trait]
impl SourceListerPort for FixedSourceLister {
    async fn list(&self, _channel_reference: &str, _filters: &SourceListerFilters) -> IngestResult<Vec<SourceMeta>> {
        Ok(self.metas.clone())
    }
}

enum AcquireBehavior {
    Skip(SkipReason),
}

struct StubAudioAcquirer {
    behavior: AcquireBehavior,
}

#[async_trait]
impl AudioAcquirerPort for StubAudioAcquirer {
    async fn acquire(
        &self,
        _external_id: &str,
        _constraints: &AcquireConstraints,
    ) -> IngestResult<Result<AcquiredAudio, SkipReason>> {
        match &self.behavior {
            AcquireBehavior::Skip(reason) => Ok(Err(reason.clone())),
        }
    }

    async fn release(&self, _audio: &AcquiredAudio) -> IngestResult<()> {
        Ok(())
    }
}

struct StubCaptionFetcher {
    outcome: CaptionOutcome,
    captions: Option<CaptionSet>,
}

#[async_trait]
impl CaptionFetcherPort for StubCaptionFetcher {
    async fn fetch(
        &self,
        _external_id: &str,
        _language_prefs: &[String],
    ) -> IngestResult<(CaptionOutcome, Option<CaptionSet>)> {
        Ok((self.outcome.clone(), self.captions.clone()))
    }
}

/// Never invoked by either scenario below: the caption fast path bypasses
/// it, and the members-only scenario never gets past audio acquisition.
struct UnusedSpeechRecognizer;

#[async_trait]
impl SpeechRecognizerPort for UnusedSpeechRecognizer {
    async fn transcribe(&self, _audio_path: &std::path::Path, _mode: RecognizerMode) -> IngestResult<Vec<RawSegment>> {
        unreachable!("speech recognizer should not be called by these scenarios")
    }

    async fn refine(&self, _audio_path: &std::path::Path, _start: f64, _end: f64) -> IngestResult<RawSegment> {
        unreachable!("speech recognizer should not be called by these scenarios")
    }
}

struct UnusedDiarizer;

#[async_trait]
impl DiarizerPort for UnusedDiarizer {
    async fn diarize(&self, _audio_path: &std::path::Path, _profile: &VoiceProfile) -> IngestResult<Vec<SpeakerTurn>> {
        unreachable!("diarizer should not be called by these scenarios")
    }
}

struct EmptyVoiceProfileStore;

#[async_trait]
impl VoiceProfileStorePort for EmptyVoiceProfileStore {
    async fn load_all(&self) -> IngestResult<Vec<VoiceProfile>> {
        Ok(Vec::new())
    }

    async fn get(&self, _name: &str) -> IngestResult<Option<VoiceProfile>> {
        Ok(None)
    }
}

/// Returns a fixed-length all-zero vector per input text, so
/// `batch_embed_size` chunking is exercised without a real model.
struct StubEmbedder {
    dimension: usize,
}

#[async_trait]
impl EmbedderPort for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> IngestResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.0; self.dimension]).collect())
    }
}

fn test_config() -> IngestConfig {
    IngestConfig {
        database_url: "sqlite::memory:".into(),
        source_backend: SourceBackend::Scrape,
        api_key: None,
        channel_reference: "UCexample".into(),
        storage_dir: PathBuf::from("/tmp/ingest-test"),
        store_audio_locally: false,
        production_mode: false,
        n_io: 1,
        n_asr: 1,
        n_db: 1,
        batch_embed_size: 8,
        whisper_model_primary: "medium.en".into(),
        whisper_model_refine: "large-v3".into(),
        asr_quality_thresholds: AsrQualityThresholds::default(),
        target_min_chars: 10,
        target_max_chars: 200,
        max_gap_s: 2.0,
        max_merge_s: 30.0,
        embedding_dimension: 3,
        embed_target_only: false,
        skip_shorts: false,
        max_duration_s: None,
        skip_live: false,
        skip_upcoming: false,
        skip_members_only: false,
        force_reprocess: false,
        retry_max: 2,
        backoff_base_ms: 1,
        voice_profile_name: "target".into(),
        voice_profile_dir: PathBuf::from("/tmp/ingest-test/voices"),
        chaffee_min_sim: 0.62,
        medical_grade_captions: false,
        monologue_assumption: true,
        max_cost_per_run: None,
        remote_asr_rate_per_min: None,
        cancel_on_sigint: true,
        log_format: LogFormat::Pretty,
        log_level: "info".into(),
    }
}

#[tokio::test]
async fn members_only_source_is_skipped_with_single_event() {
    let pool = setup_test_database().await.unwrap();
    let state_store = Arc::new(SqliteStateStore::new(pool.clone()));
    let segment_store = Arc::new(SqliteSegmentStore::new(pool));
    let ring = Arc::new(RingBufferEmitter::new(64));
    let run_summary = Arc::new(RunSummaryReporter::new());
    let subscribers: Vec<Arc<dyn ingest_core::ProgressEmitterPort>> = vec![ring.clone(), run_summary.clone()];
    let emitter = Arc::new(FanOutEmitter::new(subscribers));

    let meta = SourceMeta::minimal("youtube", "members-only-1");
    let deps = OrchestratorDeps {
        config: Arc::new(test_config()),
        source_lister: Arc::new(FixedSourceLister { metas: vec![meta.clone()] }),
        audio_acquirer: Arc::new(StubAudioAcquirer {
            behavior: AcquireBehavior::Skip(SkipReason::Inaccessible {
                detail: "members-only content".to_string(),
            }),
        }),
        caption_fetcher: Arc::new(StubCaptionFetcher {
            outcome: CaptionOutcome::NoTrackAvailable,
            captions: None,
        }),
        speech_recognizer: Arc::new(UnusedSpeechRecognizer),
        diarizer: Arc::new(UnusedDiarizer),
        embedder: Arc::new(StubEmbedder { dimension: 3 }),
        state_store: state_store.clone(),
        segment_store,
        voice_profile_store: Arc::new(EmptyVoiceProfileStore),
        emitter,
        local_gpu_available: false,
    };

    let orchestrator = Orchestrator::new(deps);
    let summary = orchestrator.run(&run_summary).await.unwrap();

    assert_eq!(summary.skipped, 1);

    let source = state_store.get_state("youtube", "members-only-1").await.unwrap().unwrap();
    assert_eq!(source.status, SourceStatus::Skipped);
    assert_eq!(source.last_error.as_deref(), Some("members-only content"));

    let skipped_events: Vec<_> = emitter
        .snapshot()
        .into_iter()
        .filter(|e| matches!(e.kind, ingest_core::PipelineEventKind::Skipped { .. }))
        .collect();
    assert_eq!(skipped_events.len(), 1);
}

#[tokio::test]
async fn manual_captions_flow_to_done_with_segments_persisted() {
    let pool = setup_test_database().await.unwrap();
    let state_store = Arc::new(SqliteStateStore::new(pool.clone()));
    let segment_store = Arc::new(SqliteSegmentStore::new(pool));
    let emitter = Arc::new(RingBufferEmitter::new(64));

    let meta = SourceMeta::minimal("youtube", "captioned-1");
    let captions = CaptionSet {
        captions: vec![
            Caption { start: 0.0, end: 2.0, text: "hello there".into() },
            Caption { start: 2.0, end: 4.0, text: "general kenobi".into() },
        ],
        auto_generated: false,
        language: "en".into(),
    };

    let deps = OrchestratorDeps {
        config: Arc::new(test_config()),
        source_lister: Arc::new(FixedSourceLister { metas: vec![meta.clone()] }),
        audio_acquirer: Arc::new(StubAudioAcquirer {
            behavior: AcquireBehavior::Skip(SkipReason::Inaccessible { detail: "unused".to_string() }),
        }),
        caption_fetcher: Arc::new(StubCaptionFetcher {
            outcome: CaptionOutcome::Found,
            captions: Some(captions),
        }),
        speech_recognizer: Arc::new(UnusedSpeechRecognizer),
        diarizer: Arc::new(UnusedDiarizer),
        embedder: Arc::new(StubEmbedder { dimension: 3 }),
        state_store: state_store.clone(),
        segment_store,
        voice_profile_store: Arc::new(EmptyVoiceProfileStore),
        emitter: emitter.clone(),
        local_gpu_available: false,
    };

    let orchestrator = Orchestrator::new(deps);
    let run_summary = Arc::new(RunSummaryReporter::new());
    orchestrator.run(&run_summary).await.unwrap();

    let source = state_store.get_state("youtube", "captioned-1").await.unwrap().unwrap();
    assert_eq!(source.status, SourceStatus::Done);
    assert!(source.has_manual_captions);
    assert_eq!(source.segments_count, 1, "the two short cues fall under target_min_chars and merge into one");
    assert_eq!(source.embeddings_count, 1);

    let done_events: Vec<_> = emitter
        .snapshot()
        .into_iter()
        .filter(|e| matches!(e.kind, ingest_core::PipelineEventKind::Done { .. }))
        .collect();
    assert_eq!(done_events.len(), 1);
}
