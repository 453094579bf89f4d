#![deny(unsafe_code)]

//! Pure segment optimizer: merges short same-speaker segments and
//! splits overlong ones to a retrieval-friendly character window. No I/O,
//! no async — a total function over a slice of segments.

mod merge;
mod normalize;
mod split;

use ingest_core::Segment;

/// Tunable thresholds for the merge/split passes.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerParams {
    pub target_min_chars: usize,
    pub target_max_chars: usize,
    pub max_gap_seconds: f64,
    pub max_merge_duration_s: f64,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            target_min_chars: 120,
            target_max_chars: 300,
            max_gap_seconds: 2.0,
            max_merge_duration_s: 30.0,
        }
    }
}

/// Normalizes, merges, and splits raw segments into a retrieval-friendly
/// set. Total for any non-empty input: the result may be empty only if
/// every input segment normalizes away to nothing.
#[must_use]
pub fn optimize(segments: &[Segment], params: &OptimizerParams) -> Vec<Segment> {
    let normalized: Vec<Segment> = segments
        .iter()
        .filter_map(|s| normalize::normalize(s))
        .collect();

    if normalized.is_empty() {
        return Vec::new();
    }

    let merged = merge::merge_pass(&normalized, params);
    split::split_pass(&merged, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::{SegmentMetrics, SpeakerLabel};

    fn seg(start: f64, end: f64, text: &str, speaker: SpeakerLabel) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
            speaker_label: speaker,
            speaker_confidence: Some(0.8),
            metrics: SegmentMetrics::default(),
            re_asr: false,
            is_overlap: false,
            needs_refinement: false,
            embedding: None,
        }
    }

    #[test]
    fn empty_input_after_normalization_yields_empty_output() {
        let segments = vec![seg(0.0, 1.0, "   ", SpeakerLabel::Chaffee)];
        let out = optimize(&segments, &OptimizerParams::default());
        assert!(out.is_empty());
    }

    #[test]
    fn short_same_speaker_segments_merge() {
        let segments = vec![
            seg(0.0, 1.0, "Hi", SpeakerLabel::Chaffee),
            seg(1.2, 2.0, "there", SpeakerLabel::Chaffee),
        ];
        let out = optimize(&segments, &OptimizerParams::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start, 0.0);
        assert_eq!(out[0].end, 2.0);
    }

    #[test]
    fn different_speakers_never_merge() {
        let segments = vec![
            seg(0.0, 1.0, "Hi", SpeakerLabel::Chaffee),
            seg(1.1, 2.0, "there", SpeakerLabel::Guest),
        ];
        let out = optimize(&segments, &OptimizerParams::default());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn large_gap_prevents_merge() {
        let segments = vec![
            seg(0.0, 1.0, "Hi", SpeakerLabel::Chaffee),
            seg(10.0, 11.0, "there", SpeakerLabel::Chaffee),
        ];
        let out = optimize(&segments, &OptimizerParams::default());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn overlong_segment_is_split() {
        let long_text = "This is one sentence. ".repeat(40);
        let segments = vec![seg(0.0, 120.0, long_text.trim(), SpeakerLabel::Chaffee)];
        let out = optimize(&segments, &OptimizerParams::default());
        assert!(out.len() > 1);
        for window in out.windows(2) {
            assert!(window[0].end <= window[1].start + 1e-6);
        }
    }
}
