use ingest_core::Segment;
use regex::Regex;
use std::sync::OnceLock;

use crate::OptimizerParams;

fn sentence_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The `regex` crate has no lookbehind, so the terminal punctuation is
    // captured as part of the match and reattached to the sentence that
    // precedes it; only the trailing whitespace is treated as the cut.
    RE.get_or_init(|| Regex::new(r"[.!?]+\s+").unwrap())
}

/// Splits `text` into sentences, keeping each sentence's terminal
/// punctuation attached.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last = 0;
    for m in sentence_boundary().find_iter(text) {
        let punct_end = m.as_str().trim_end().len() + m.start();
        sentences.push(&text[last..punct_end]);
        last = m.end();
    }
    if last < text.len() {
        sentences.push(&text[last..]);
    }
    sentences.into_iter().filter(|s| !s.is_empty()).collect()
}

pub(crate) fn split_pass(segments: &[Segment], params: &OptimizerParams) -> Vec<Segment> {
    let limit = params.target_max_chars as f64 * 1.5;
    let mut out = Vec::with_capacity(segments.len());

    for segment in segments {
        if (segment.text.len() as f64) <= limit {
            out.push(segment.clone());
            continue;
        }
        out.extend(split_one(segment, params));
    }

    out
}

fn split_one(segment: &Segment, params: &OptimizerParams) -> Vec<Segment> {
    let sentences = split_sentences(segment.text.trim());

    if sentences.len() <= 1 {
        return vec![segment.clone()];
    }

    // Greedily group sentences into chunks under the target window.
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    for sentence in sentences {
        let candidate_len = if current.is_empty() {
            sentence.len()
        } else {
            current.len() + 1 + sentence.len()
        };
        if !current.is_empty() && candidate_len > params.target_max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    // Apportion the original time span proportionally to each chunk's
    // share of total characters.
    let total_chars: usize = chunks.iter().map(String::len).sum();
    let span = segment.end - segment.start;
    let mut cursor = segment.start;

    let mut out = Vec::with_capacity(chunks.len());
    for (i, text) in chunks.iter().enumerate() {
        let share = if total_chars > 0 {
            text.len() as f64 / total_chars as f64
        } else {
            1.0 / chunks.len() as f64
        };
        let is_last = i == chunks.len() - 1;
        let end = if is_last {
            segment.end
        } else {
            cursor + span * share
        };

        out.push(Segment {
            start: cursor,
            end,
            text: text.clone(),
            speaker_label: segment.speaker_label,
            speaker_confidence: segment.speaker_confidence,
            metrics: segment.metrics,
            re_asr: segment.re_asr,
            is_overlap: segment.is_overlap,
            needs_refinement: segment.needs_refinement,
            embedding: None,
        });
        cursor = end;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::{SegmentMetrics, SpeakerLabel};

    fn seg(text: &str) -> Segment {
        Segment {
            start: 0.0,
            end: 100.0,
            text: text.to_string(),
            speaker_label: SpeakerLabel::Chaffee,
            speaker_confidence: Some(0.5),
            metrics: SegmentMetrics::default(),
            re_asr: false,
            is_overlap: false,
            needs_refinement: false,
            embedding: None,
        }
    }

    #[test]
    fn short_segment_is_untouched() {
        let segments = vec![seg("A short sentence.")];
        let out = split_pass(&segments, &OptimizerParams::default());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn overlong_segment_splits_on_sentence_boundaries() {
        let text = "One sentence here. ".repeat(30);
        let segments = vec![seg(text.trim())];
        let out = split_pass(&segments, &OptimizerParams::default());
        assert!(out.len() > 1);
        assert!((out.first().unwrap().start - 0.0).abs() < 1e-9);
        assert!((out.last().unwrap().end - 100.0).abs() < 1e-9);
    }

    #[test]
    fn single_sentence_beyond_limit_is_not_further_split() {
        let text = "x".repeat(500);
        let segments = vec![seg(&text)];
        let out = split_pass(&segments, &OptimizerParams::default());
        assert_eq!(out.len(), 1);
    }
}
