use ingest_core::{Segment, SegmentMetrics};

use crate::OptimizerParams;

/// Below this length a segment always triggers a merge with its same-speaker
/// neighbor, independent of the target character window.
const ALWAYS_MERGE_LEN: usize = 30;

/// Single forward pass: each segment either extends the open accumulator or
/// closes it and starts a new one. Segments are assumed time-ordered.
pub(crate) fn merge_pass(segments: &[Segment], params: &OptimizerParams) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());

    for segment in segments {
        match out.last_mut() {
            Some(last) if should_merge(last, segment, params) => {
                *last = merge_two(last, segment);
            }
            _ => out.push(segment.clone()),
        }
    }

    out
}

fn should_merge(a: &Segment, b: &Segment, params: &OptimizerParams) -> bool {
    if a.speaker_label != b.speaker_label {
        return false;
    }

    let gap = b.start - a.end;
    if gap < 0.0 || gap > params.max_gap_seconds {
        return false;
    }

    let merged_duration = b.end - a.start;
    if merged_duration > params.max_merge_duration_s {
        return false;
    }

    if a.text.len() < ALWAYS_MERGE_LEN || b.text.len() < ALWAYS_MERGE_LEN {
        return true;
    }

    if a.text.len() >= params.target_min_chars && b.text.len() >= params.target_min_chars {
        return false;
    }

    a.text.len() + b.text.len() + 1 < params.target_max_chars
}

fn merge_two(a: &Segment, b: &Segment) -> Segment {
    let dur_a = (a.end - a.start).max(0.0);
    let dur_b = (b.end - b.start).max(0.0);
    let total = dur_a + dur_b;
    let (weight_a, weight_b) = if total > 0.0 {
        (dur_a / total, dur_b / total)
    } else {
        (0.5, 0.5)
    };

    let metrics = SegmentMetrics {
        avg_logprob: a.metrics.avg_logprob * weight_a + b.metrics.avg_logprob * weight_b,
        compression_ratio: a.metrics.compression_ratio * weight_a
            + b.metrics.compression_ratio * weight_b,
        no_speech_prob: a.metrics.no_speech_prob * weight_a + b.metrics.no_speech_prob * weight_b,
        temperature_used: a.metrics.temperature_used * weight_a
            + b.metrics.temperature_used * weight_b,
    };

    let speaker_confidence = match (a.speaker_confidence, b.speaker_confidence) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) => Some(x),
        (None, Some(y)) => Some(y),
        (None, None) => None,
    };

    Segment {
        start: a.start,
        end: b.end,
        text: format!("{} {}", a.text, b.text),
        speaker_label: a.speaker_label,
        speaker_confidence,
        metrics,
        re_asr: a.re_asr || b.re_asr,
        is_overlap: a.is_overlap || b.is_overlap,
        needs_refinement: a.needs_refinement || b.needs_refinement,
        // A fresh embedding is produced downstream for the merged text; the
        // per-half vectors no longer describe anything real.
        embedding: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::SpeakerLabel;

    fn seg(start: f64, end: f64, text: &str, conf: Option<f64>) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
            speaker_label: SpeakerLabel::Chaffee,
            speaker_confidence: conf,
            metrics: SegmentMetrics {
                avg_logprob: -0.5,
                compression_ratio: 1.0,
                no_speech_prob: 0.1,
                temperature_used: 0.0,
            },
            re_asr: false,
            is_overlap: false,
            needs_refinement: false,
            embedding: None,
        }
    }

    #[test]
    fn short_segments_always_merge_regardless_of_combined_length() {
        let params = OptimizerParams::default();
        let a = seg(0.0, 1.0, "hi", Some(0.5));
        let long_b = "x".repeat(400);
        let b = seg(1.0, 2.0, &long_b, Some(0.9));
        assert!(should_merge(&a, &b, &params));
    }

    #[test]
    fn confidence_takes_the_max() {
        let a = seg(0.0, 1.0, "hi", Some(0.3));
        let b = seg(1.0, 3.0, "there", Some(0.9));
        let merged = merge_two(&a, &b);
        assert_eq!(merged.speaker_confidence, Some(0.9));
    }

    #[test]
    fn metrics_are_duration_weighted() {
        let mut a = seg(0.0, 1.0, "hi", None);
        a.metrics.avg_logprob = -1.0;
        let mut b = seg(1.0, 4.0, "there", None);
        b.metrics.avg_logprob = 0.0;
        let merged = merge_two(&a, &b);
        // a has weight 1/4, b has weight 3/4 -> -0.25
        assert!((merged.metrics.avg_logprob - (-0.25)).abs() < 1e-9);
    }
}
