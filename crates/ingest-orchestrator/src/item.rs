//! Per-item pipeline procedure: the work each pool's workers
//! perform on a single [`SourceMeta`], threaded through the three queues.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ingest_core::{
    AcquireConstraints, Caption, CaptionOutcome, CaptionSet, IngestError, IngestResult,
    PipelineEvent, PipelineEventKind, RawSegment, RecognizerMode, Segment, SegmentMetrics,
    SkipReason, SourceMeta, SourceStatus, StatusUpdate,
};

use crate::deps::OrchestratorDeps;
use crate::retry::{self, RetryDecision};

const IO_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const ASR_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const DB_TIMEOUT: Duration = Duration::from_secs(2 * 60);

pub(crate) struct IoJob {
    pub meta: SourceMeta,
}

pub(crate) struct AsrJob {
    pub meta: SourceMeta,
    pub audio: ingest_core::AcquiredAudio,
    pub retry_count: u32,
}

pub(crate) struct DbJob {
    pub meta: SourceMeta,
    pub segments: Vec<Segment>,
    pub embedding_degraded: bool,
}

/// Outcome of a retry-governed stage call: either it produced a value, or
/// the item is done for good (skip/error) and the caller should stop.
enum StageOutcome<T> {
    Value(T),
    Stop,
}

async fn emit(deps: &OrchestratorDeps, meta: &SourceMeta, kind: PipelineEventKind) {
    deps.emitter
        .emit(PipelineEvent::new(&meta.source_type, &meta.external_id, kind))
        .await;
}

async fn set_status(deps: &OrchestratorDeps, meta: &SourceMeta, status: SourceStatus, fields: StatusUpdate) {
    if let Err(e) = deps
        .state_store
        .update_status(&meta.source_type, &meta.external_id, status, fields)
        .await
    {
        tracing::warn!(external_id = %meta.external_id, error = %e, "state store update failed");
    }
}

/// Runs `f` under the stage's wall-clock timeout and the run's
/// cancellation token, retrying recoverable errors with jittered backoff
/// up to `retry_max`. A timeout is handled identically to an ASR failure
/// A timeout is handled identically to an ASR failure.
async fn with_retry<T, F, Fut>(
    deps: &OrchestratorDeps,
    cancel: &CancellationToken,
    meta: &SourceMeta,
    timeout: Duration,
    retry_count: &mut u32,
    mut f: F,
) -> StageOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = IngestResult<T>>,
{
    loop {
        let attempt = tokio::select! {
            biased;
            () = cancel.cancelled() => return StageOutcome::Stop,
            res = tokio::time::timeout(timeout, f()) => res,
        };

        let result = match attempt {
            Ok(inner) => inner,
            Err(_elapsed) => Err(IngestError::asr_failed("stage timed out")),
        };

        match result {
            Ok(value) => return StageOutcome::Value(value),
            Err(err) => match retry::decide(&err, *retry_count, deps.config.retry_max, deps.config.backoff_base()) {
                RetryDecision::Retry { delay } => {
                    *retry_count += 1;
                    emit(
                        deps,
                        meta,
                        PipelineEventKind::Error {
                            message: err.user_message(),
                            retry_count: *retry_count,
                        },
                    )
                    .await;
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return StageOutcome::Stop,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::TerminalSkip => {
                    set_status(
                        deps,
                        meta,
                        SourceStatus::Skipped,
                        StatusUpdate {
                            last_error: Some(err.user_message()),
                            ..Default::default()
                        },
                    )
                    .await;
                    emit(
                        deps,
                        meta,
                        PipelineEventKind::Skipped {
                            reason: err.user_message(),
                        },
                    )
                    .await;
                    return StageOutcome::Stop;
                }
                RetryDecision::TerminalError => {
                    set_status(
                        deps,
                        meta,
                        SourceStatus::Error,
                        StatusUpdate {
                            retry_count: Some(*retry_count),
                            last_error: Some(err.user_message()),
                            ..Default::default()
                        },
                    )
                    .await;
                    emit(
                        deps,
                        meta,
                        PipelineEventKind::Error {
                            message: err.user_message(),
                            retry_count: *retry_count,
                        },
                    )
                    .await;
                    return StageOutcome::Stop;
                }
            },
        }
    }
}

fn captions_to_raw(captions: &CaptionSet) -> Vec<RawSegment> {
    captions
        .captions
        .iter()
        .map(|c: &Caption| RawSegment {
            start: c.start,
            end: c.end,
            text: c.text.clone(),
            metrics: SegmentMetrics::default(),
        })
        .collect()
}

/// I/O worker: caption fetch first, audio acquisition as the fallback.
pub(crate) async fn handle_io_job(
    deps: Arc<OrchestratorDeps>,
    job: IoJob,
    cancel: CancellationToken,
    asr_tx: mpsc::Sender<AsrJob>,
    db_tx: mpsc::Sender<DbJob>,
) {
    let meta = job.meta;
    // Seed the retry budget from the persisted row rather than starting
    // fresh every run: a re-enqueued `error` item (retries < max) must not
    // be granted a brand-new full retry budget on each restart.
    let mut retry_count = match deps.state_store.get_state(&meta.source_type, &meta.external_id).await {
        Ok(Some(source)) => source.retry_count,
        Ok(None) => 0,
        Err(e) => {
            tracing::warn!(external_id = %meta.external_id, error = %e, "failed to read source state, starting retry count at 0");
            0
        }
    };

    emit(&deps, &meta, PipelineEventKind::Started { stage: SourceStatus::Downloading }).await;
    set_status(&deps, &meta, SourceStatus::Downloading, StatusUpdate::default()).await;

    let language_prefs = vec!["en".to_string()];
    let caption_outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        res = tokio::time::timeout(IO_TIMEOUT, deps.caption_fetcher.fetch(&meta.external_id, &language_prefs)) => res,
    };
    // A caption-fetch failure (timeout or port error) is not fatal to the
    // item: it just means the fallback ladder continues to audio
    // acquisition, the same as `NoTrackAvailable`.
    let caption_outcome = caption_outcome.ok().and_then(Result::ok);

    if let Some((CaptionOutcome::Found, Some(captions))) = caption_outcome {
        let raw_segments = captions_to_raw(&captions);
        set_status(
            &deps,
            &meta,
            SourceStatus::Transcribed,
            StatusUpdate {
                has_manual_captions: Some(true),
                ..Default::default()
            },
        )
        .await;
        emit(&deps, &meta, PipelineEventKind::StageComplete { stage: SourceStatus::Transcribed }).await;

        let labeled = crate::finish::attribute_without_diarization(&raw_segments);
        crate::finish::finish_transcribed(&deps, meta, labeled, false, &cancel, &db_tx).await;
        return;
    }

    let constraints = AcquireConstraints {
        max_size_mb: 24,
        max_duration_s: deps.config.max_duration_s.and_then(|d| u32::try_from(d).ok()),
        container: "wav16k_mono".to_string(),
    };

    let acquired = with_retry(&deps, &cancel, &meta, IO_TIMEOUT, &mut retry_count, || {
        deps.audio_acquirer.acquire(&meta.external_id, &constraints)
    })
    .await;

    let Some(outcome) = (match acquired {
        StageOutcome::Value(v) => Some(v),
        StageOutcome::Stop => None,
    }) else {
        return;
    };

    match outcome {
        Ok(audio) => {
            set_status(&deps, &meta, SourceStatus::Downloading, StatusUpdate::default()).await;
            emit(&deps, &meta, PipelineEventKind::StageComplete { stage: SourceStatus::Downloading }).await;
            if asr_tx.send(AsrJob { meta, audio, retry_count }).await.is_err() {
                tracing::warn!("ASR queue closed, dropping item");
            }
        }
        Err(SkipReason::Inaccessible { detail }) => {
            set_status(
                &deps,
                &meta,
                SourceStatus::Skipped,
                StatusUpdate {
                    last_error: Some(detail.clone()),
                    ..Default::default()
                },
            )
            .await;
            emit(&deps, &meta, PipelineEventKind::Skipped { reason: detail }).await;
        }
        Err(SkipReason::TooLarge { bytes, cap_bytes }) => {
            let reason = format!("audio too large: {bytes} bytes exceeds cap of {cap_bytes} bytes");
            set_status(
                &deps,
                &meta,
                SourceStatus::Skipped,
                StatusUpdate {
                    last_error: Some(reason.clone()),
                    ..Default::default()
                },
            )
            .await;
            emit(&deps, &meta, PipelineEventKind::Skipped { reason }).await;
        }
    }
}

/// ASR worker: recognize, diarize/attribute, refine flagged segments,
/// release audio, then hand off to the shared optimize/embed/DB tail.
pub(crate) async fn handle_asr_job(
    deps: Arc<OrchestratorDeps>,
    job: AsrJob,
    cancel: CancellationToken,
    recognizer_mode: RecognizerMode,
    db_tx: mpsc::Sender<DbJob>,
) {
    let AsrJob { meta, audio, mut retry_count } = job;

    emit(&deps, &meta, PipelineEventKind::Started { stage: SourceStatus::Transcribed }).await;

    let audio_path = audio.path.clone();
    let transcribed = with_retry(&deps, &cancel, &meta, ASR_TIMEOUT, &mut retry_count, || {
        deps.speech_recognizer.transcribe(&audio_path, recognizer_mode)
    })
    .await;

    let raw_segments = match transcribed {
        StageOutcome::Value(v) => v,
        StageOutcome::Stop => {
            let _ = deps.audio_acquirer.release(&audio).await;
            return;
        }
    };

    set_status(&deps, &meta, SourceStatus::Transcribed, StatusUpdate::default()).await;
    emit(&deps, &meta, PipelineEventKind::StageComplete { stage: SourceStatus::Transcribed }).await;

    let labeled = if deps.config.monologue_assumption {
        ingest_asr::attribute_as_monologue(&raw_segments)
    } else {
        match deps.voice_profile_store.get(&deps.config.voice_profile_name).await {
            Ok(Some(profile)) => match deps.diarizer.diarize(&audio_path, &profile).await {
                Ok(turns) => crate::finish::attribute(&raw_segments, &turns, &profile),
                Err(e) => {
                    tracing::warn!(external_id = %meta.external_id, error = %e, "diarization failed, downgrading to UNKNOWN");
                    crate::finish::attribute_without_diarization(&raw_segments)
                }
            },
            Ok(None) => {
                tracing::warn!(external_id = %meta.external_id, "voice profile missing, downgrading to UNKNOWN");
                crate::finish::attribute_without_diarization(&raw_segments)
            }
            Err(e) => {
                tracing::warn!(external_id = %meta.external_id, error = %e, "voice profile store failed, downgrading to UNKNOWN");
                crate::finish::attribute_without_diarization(&raw_segments)
            }
        }
    };

    set_status(&deps, &meta, SourceStatus::Diarized, StatusUpdate::default()).await;
    emit(&deps, &meta, PipelineEventKind::StageComplete { stage: SourceStatus::Diarized }).await;

    let refined = crate::finish::refine_flagged(&deps, &audio_path, labeled).await;

    if let Err(e) = deps.audio_acquirer.release(&audio).await {
        tracing::warn!(external_id = %meta.external_id, error = %e, "failed to release acquired audio");
    }

    crate::finish::finish_transcribed(&deps, meta, refined, false, &cancel, &db_tx).await;
}

/// DB worker: the final `upsert_source -> replace_segments -> mark_status`
/// logical unit. `index_guard` ensures the ANN index is built
/// at most once per process, the first time this worker commits a batch.
pub(crate) async fn handle_db_job(
    deps: Arc<OrchestratorDeps>,
    job: DbJob,
    cancel: CancellationToken,
    index_guard: Arc<tokio::sync::OnceCell<()>>,
) {
    let DbJob { meta, segments, embedding_degraded } = job;

    emit(&deps, &meta, PipelineEventKind::Started { stage: SourceStatus::Upserted }).await;

    let mut attempt = 0u32;
    loop {
        let commit = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            res = tokio::time::timeout(DB_TIMEOUT, commit_once(&deps, &meta, &segments)) => res,
        };

        match commit {
            Ok(Ok(())) => break,
            Ok(Err(e)) if matches!(e, ingest_core::RepositoryError::Conflict(_)) && attempt == 0 => {
                attempt += 1;
                continue;
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                set_status(
                    &deps,
                    &meta,
                    SourceStatus::Error,
                    StatusUpdate {
                        last_error: Some(message.clone()),
                        ..Default::default()
                    },
                )
                .await;
                emit(&deps, &meta, PipelineEventKind::Error { message, retry_count: 0 }).await;
                return;
            }
            Err(_elapsed) => {
                let message = "db commit timed out".to_string();
                set_status(
                    &deps,
                    &meta,
                    SourceStatus::Error,
                    StatusUpdate {
                        last_error: Some(message.clone()),
                        ..Default::default()
                    },
                )
                .await;
                emit(&deps, &meta, PipelineEventKind::Error { message, retry_count: 0 }).await;
                return;
            }
        }
    }

    if index_guard
        .get_or_try_init(|| deps.segment_store.ensure_vector_index())
        .await
        .is_err()
    {
        tracing::warn!("failed to ensure vector index");
    }

    let final_status = if embedding_degraded { SourceStatus::Error } else { SourceStatus::Done };
    set_status(
        &deps,
        &meta,
        final_status,
        StatusUpdate {
            segments_count: Some(u32::try_from(segments.len()).unwrap_or(u32::MAX)),
            embeddings_count: Some(
                u32::try_from(segments.iter().filter(|s| s.embedding.is_some()).count()).unwrap_or(u32::MAX),
            ),
            last_error: embedding_degraded.then(|| "embedding failed, stored without vectors".to_string()),
            ..Default::default()
        },
    )
    .await;

    if embedding_degraded {
        emit(
            &deps,
            &meta,
            PipelineEventKind::Error {
                message: "embedding failed, segments stored without vectors".to_string(),
                retry_count: 0,
            },
        )
        .await;
    } else {
        emit(
            &deps,
            &meta,
            PipelineEventKind::Done {
                segments_count: u32::try_from(segments.len()).unwrap_or(u32::MAX),
                embeddings_count: u32::try_from(segments.iter().filter(|s| s.embedding.is_some()).count())
                    .unwrap_or(u32::MAX),
            },
        )
        .await;
    }
}

async fn commit_once(
    deps: &OrchestratorDeps,
    meta: &SourceMeta,
    segments: &[Segment],
) -> Result<(), ingest_core::RepositoryError> {
    let segments_count = u32::try_from(segments.len()).unwrap_or(u32::MAX);
    let embeddings_count =
        u32::try_from(segments.iter().filter(|s| s.embedding.is_some()).count()).unwrap_or(u32::MAX);

    deps.segment_store.upsert_source(meta).await?;
    deps.segment_store.replace_segments(&meta.external_id, segments).await?;
    deps.segment_store
        .mark_status(&meta.external_id, SourceStatus::Done.as_str(), segments_count, embeddings_count)
        .await?;
    Ok(())
}
