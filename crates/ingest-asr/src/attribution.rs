//! Speaker attribution policy: maps each ASR segment to a label by
//! time-overlap with the diarizer's speaker turns.

use ingest_core::{
    RawSegment, Segment, SegmentMetrics, SpeakerLabel, SpeakerTurn, VoiceProfile,
};

const MARGIN: f64 = 0.05;
const OVERLAP_COVERAGE_THRESHOLD: f64 = 0.2;
/// Ceiling applied to the monologue-assumption fast path's fixed confidence.
const MONOLOGUE_CONFIDENCE: f64 = 0.90;

fn overlap_seconds(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

/// The dominant overlapping turn (by total overlap duration) and every
/// turn's share of this segment's span, `(turn, overlap_s)`.
fn overlapping_turns<'a>(segment_start: f64, segment_end: f64, turns: &'a [SpeakerTurn]) -> Vec<(&'a SpeakerTurn, f64)> {
    turns
        .iter()
        .map(|t| (t, overlap_seconds(segment_start, segment_end, t.start, t.end)))
        .filter(|(_, overlap)| *overlap > 0.0)
        .collect()
}

fn classify(similarity: f64, threshold: f64) -> (SpeakerLabel, f64) {
    if similarity >= threshold {
        (SpeakerLabel::Chaffee, similarity)
    } else if similarity < threshold - MARGIN {
        (SpeakerLabel::Guest, 1.0 - similarity)
    } else {
        let distance = (threshold - similarity).abs();
        (SpeakerLabel::Unknown, (MARGIN - distance).max(0.0) / MARGIN)
    }
}

/// Attributes each raw ASR segment to a speaker by overlap with `turns`,
/// per `profile`'s threshold, and assembles the resulting [`Segment`]s.
/// `needs_refinement`/`re_asr` are seeded from the segment's own ASR
/// metrics; the refinement pass itself runs separately in the Orchestrator.
#[must_use]
pub fn attribute_segments(raw_segments: &[RawSegment], turns: &[SpeakerTurn], profile: &VoiceProfile) -> Vec<Segment> {
    raw_segments
        .iter()
        .map(|raw| {
            let overlaps = overlapping_turns(raw.start, raw.end, turns);
            let span = (raw.end - raw.start).max(f64::EPSILON);

            if overlaps.is_empty() {
                return Segment {
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
                };
            }

            let (dominant, _) = overlaps
                .iter()
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .expect("overlaps is non-empty");
            let (label, confidence) = classify(dominant.similarity, profile.threshold);

            // Overlap (multiple speakers in one segment): some minority share
            // of overlap time disagrees with the dominant turn's side of the
            // threshold, and that minority covers more than the threshold.
            let minority_overlap: f64 = overlaps
                .iter()
                .filter(|(t, _)| (t.similarity >= profile.threshold) != (dominant.similarity >= profile.threshold))
                .map(|(_, o)| *o)
                .sum();
            let is_overlap = overlaps.len() > 1 && (minority_overlap / span) > OVERLAP_COVERAGE_THRESHOLD;

            Segment {
                start: raw.start,
                end: raw.end,
                text: raw.text.clone(),
                speaker_label: label,
                speaker_confidence: Some(confidence),
                metrics: raw.metrics,
                re_asr: false,
                is_overlap,
                needs_refinement: raw.metrics.needs_refinement(),
                embedding: None,
            }
        })
        .collect()
}

/// The monologue-assumption fast path: skips diarization entirely
/// and tags every segment as the target speaker at a fixed, capped
/// confidence.
#[must_use]
pub fn attribute_as_monologue(raw_segments: &[RawSegment]) -> Vec<Segment> {
    raw_segments
        .iter()
        .map(|raw| Segment {
            start: raw.start,
            end: raw.end,
            text: raw.text.clone(),
            speaker_label: SpeakerLabel::Chaffee,
            speaker_confidence: Some(MONOLOGUE_CONFIDENCE),
            metrics: raw.metrics,
            re_asr: false,
            is_overlap: false,
            needs_refinement: raw.metrics.needs_refinement(),
            embedding: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(threshold: f64) -> VoiceProfile {
        VoiceProfile {
            name: "target".into(),
            centroid: vec![1.0, 0.0],
            threshold,
            metadata: None,
        }
    }

    fn raw(start: f64, end: f64) -> RawSegment {
        RawSegment {
            start,
            end,
            text: "hello there".into(),
            metrics: SegmentMetrics::default(),
        }
    }

    fn turn(start: f64, end: f64, similarity: f64) -> SpeakerTurn {
        SpeakerTurn {
            start,
            end,
            speaker_tag: "t".into(),
            embedding: vec![1.0, 0.0],
            similarity,
        }
    }

    #[test]
    fn high_similarity_turn_labels_chaffee() {
        let segments = attribute_segments(&[raw(0.0, 2.0)], &[turn(0.0, 2.0, 0.9)], &profile(0.62));
        assert_eq!(segments[0].speaker_label, SpeakerLabel::Chaffee);
    }

    #[test]
    fn low_similarity_beyond_margin_labels_guest() {
        let segments = attribute_segments(&[raw(0.0, 2.0)], &[turn(0.0, 2.0, 0.3)], &profile(0.62));
        assert_eq!(segments[0].speaker_label, SpeakerLabel::Guest);
    }

    #[test]
    fn similarity_within_margin_labels_unknown() {
        let segments = attribute_segments(&[raw(0.0, 2.0)], &[turn(0.0, 2.0, 0.60)], &profile(0.62));
        assert_eq!(segments[0].speaker_label, SpeakerLabel::Unknown);
    }

    #[test]
    fn no_overlapping_turns_is_unknown_with_no_confidence() {
        let segments = attribute_segments(&[raw(10.0, 12.0)], &[turn(0.0, 2.0, 0.9)], &profile(0.62));
        assert_eq!(segments[0].speaker_label, SpeakerLabel::Unknown);
        assert!(segments[0].speaker_confidence.is_none());
    }

    #[test]
    fn monologue_fast_path_tags_everything_chaffee() {
        let segments = attribute_as_monologue(&[raw(0.0, 2.0), raw(2.0, 4.0)]);
        assert!(segments.iter().all(|s| s.speaker_label == SpeakerLabel::Chaffee));
        assert!(segments
            .iter()
            .all(|s| s.speaker_confidence == Some(MONOLOGUE_CONFIDENCE)));
    }
}
