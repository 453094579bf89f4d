//! The pipeline's shared tail, reached either directly from an I/O worker
//! (manual-caption fast path) or from an ASR worker after recognition and
//! attribution: run the Segment Optimizer, embed the target-speaker text,
//! and hand the result to the DB pool.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ingest_core::{
    PipelineEvent, PipelineEventKind, RawSegment, Segment, SegmentMetrics, SourceMeta,
    SourceStatus, SpeakerLabel, SpeakerTurn, StatusUpdate, VoiceProfile,
};
use ingest_segment::OptimizerParams;

use crate::deps::OrchestratorDeps;
use crate::item::DbJob;
use crate::retry;

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

/// Delegates to the attribution policy in `ingest-asr`.
#[must_use]
pub(crate) fn attribute(raw_segments: &[RawSegment], turns: &[SpeakerTurn], profile: &VoiceProfile) -> Vec<Segment> {
    ingest_asr::attribute_segments(raw_segments, turns, profile)
}

/// Speaker-ID degraded path: every segment is tagged
/// `UNKNOWN` with no confidence rather than failing the item.
#[must_use]
pub(crate) fn attribute_without_diarization(raw_segments: &[RawSegment]) -> Vec<Segment> {
    raw_segments
        .iter()
        .map(|raw| Segment {
            start: raw.start,
            end: raw.end,
            text: raw.text.clone(),
            speaker_label: SpeakerLabel::Unknown,
            speaker_confidence: None,
            metrics: raw.metrics,
            re_asr: false,
            is_overlap: false,
            needs_refinement: raw.metrics.needs_refinement(),
            embedding: None,
        })
        .collect()
}

/// Re-runs ASR on every segment flagged `needs_refinement` with the
/// high-accuracy model, swapping in the refined text/metrics on success.
/// A failed refinement keeps the original first-pass segment rather than
/// failing the item (refinement is a quality improvement, not a
/// correctness requirement).
pub(crate) async fn refine_flagged(deps: &OrchestratorDeps, audio_path: &Path, mut segments: Vec<Segment>) -> Vec<Segment> {
    for segment in &mut segments {
        if !segment.needs_refinement {
            continue;
        }
        match deps.speech_recognizer.refine(audio_path, segment.start, segment.end).await {
            Ok(refined) => {
                segment.text = refined.text;
                segment.metrics = refined.metrics;
                segment.re_asr = true;
            }
            Err(e) => {
                tracing::warn!(error = %e, "segment refinement failed, keeping first-pass transcript");
            }
        }
    }
    segments
}

/// Shared tail: optimize, embed, then hand off to the DB pool. Used by
/// both the manual-caption fast path and the post-ASR path.
pub(crate) async fn finish_transcribed(
    deps: &Arc<OrchestratorDeps>,
    meta: SourceMeta,
    segments: Vec<Segment>,
    _manual_captions: bool,
    cancel: &CancellationToken,
    db_tx: &mpsc::Sender<DbJob>,
) {
    let params = OptimizerParams {
        target_min_chars: deps.config.target_min_chars,
        target_max_chars: deps.config.target_max_chars,
        max_gap_seconds: deps.config.max_gap_s,
        max_merge_duration_s: deps.config.max_merge_s,
    };
    let optimized = ingest_segment::optimize(&segments, &params);

    set_status(deps, &meta, SourceStatus::Optimized, StatusUpdate::default()).await;
    emit(deps, &meta, PipelineEventKind::StageComplete { stage: SourceStatus::Optimized }).await;

    if cancel.is_cancelled() {
        return;
    }

    let (embedded, degraded) = embed_segments(deps, optimized, cancel).await;

    if !degraded {
        set_status(deps, &meta, SourceStatus::Embedded, StatusUpdate::default()).await;
        emit(deps, &meta, PipelineEventKind::StageComplete { stage: SourceStatus::Embedded }).await;
    }

    if db_tx
        .send(DbJob {
            meta,
            segments: embedded,
            embedding_degraded: degraded,
        })
        .await
        .is_err()
    {
        tracing::warn!("DB queue closed, dropping item");
    }
}

/// Embeds target-speaker text (or every segment, per `embed_target_only`)
/// in batches of `batch_embed_size`. Each batch is retried with jittered
/// backoff up to `retry_max`, same as the other recoverable stages; on
/// persistent failure, segments are returned with `embedding: None` and
/// `degraded = true` so the DB worker still stores them and marks the
/// Source for re-embedding.
async fn embed_segments(
    deps: &OrchestratorDeps,
    mut segments: Vec<Segment>,
    cancel: &CancellationToken,
) -> (Vec<Segment>, bool) {
    let indices: Vec<usize> = segments
        .iter()
        .enumerate()
        .filter(|(_, s)| !deps.config.embed_target_only || s.speaker_label == SpeakerLabel::Chaffee)
        .map(|(i, _)| i)
        .collect();

    if indices.is_empty() {
        return (segments, false);
    }

    let mut degraded = false;
    'chunks: for chunk in indices.chunks(deps.config.batch_embed_size.max(1)) {
        let texts: Vec<String> = chunk.iter().map(|&i| segments[i].text.clone()).collect();
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                degraded = true;
                break 'chunks;
            }

            match deps.embedder.embed(&texts).await {
                Ok(vectors) => {
                    for (&i, vector) in chunk.iter().zip(vectors) {
                        segments[i].embedding = Some(vector);
                    }
                    break;
                }
                Err(e) if attempt < deps.config.retry_max => {
                    tracing::warn!(error = %e, attempt, "embedding batch failed, retrying");
                    let delay = retry::backoff_delay(attempt, deps.config.backoff_base());
                    attempt += 1;
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => { degraded = true; break 'chunks; }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "embedding batch failed after retries, storing segments without vectors");
                    degraded = true;
                    break;
                }
            }
        }
    }

    (segments, degraded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(start: f64, end: f64) -> RawSegment {
        RawSegment {
            start,
            end,
            text: "hello".into(),
            metrics: SegmentMetrics::default(),
        }
    }

    #[test]
    fn degraded_attribution_tags_everything_unknown() {
        let segments = attribute_without_diarization(&[raw(0.0, 1.0)]);
        assert_eq!(segments[0].speaker_label, SpeakerLabel::Unknown);
        assert!(segments[0].speaker_confidence.is_none());
    }
}
