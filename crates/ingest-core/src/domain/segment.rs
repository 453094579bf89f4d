//! Segment domain type: a timed, single-speaker span of transcript text.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Attribution of a [`Segment`] to a speaker.
///
/// Never null at rest: a segment that could not be attributed is
/// `Unknown`, not absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeakerLabel {
    /// The enrolled target speaker.
    Chaffee,
    /// A speaker other than the target.
    Guest,
    /// Attribution could not be determined.
    Unknown,
}

impl SpeakerLabel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chaffee => "CHAFFEE",
            Self::Guest => "GUEST",
            Self::Unknown => "UNKNOWN",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "CHAFFEE" => Self::Chaffee,
            "UNKNOWN" => Self::Unknown,
            _ => Self::Guest,
        }
    }
}

impl std::fmt::Display for SpeakerLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ASR quality metrics carried alongside a [`Segment`], used by the
/// refinement-pass decision in the Speech Recognizer and preserved for
/// downstream diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetrics {
    pub avg_logprob: f64,
    pub compression_ratio: f64,
    pub no_speech_prob: f64,
    pub temperature_used: f64,
}

impl SegmentMetrics {
    /// Whether these metrics fall below the quality thresholds,
    /// marking the owning raw segment for a refinement pass.
    #[must_use]
    pub fn needs_refinement(&self) -> bool {
        self.avg_logprob < -1.0 || self.compression_ratio > 2.4 || self.no_speech_prob > 0.6
    }
}

/// A contiguous timed utterance of a single speaker within one Source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker_label: SpeakerLabel,
    pub speaker_confidence: Option<f64>,
    pub metrics: SegmentMetrics,
    pub re_asr: bool,
    pub is_overlap: bool,
    pub needs_refinement: bool,
    pub embedding: Option<Vec<f32>>,
}

impl Segment {
    /// `start < end`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.start >= 0.0 && self.end > self.start && !self.text.trim().is_empty()
    }

    /// SHA-256 of the trimmed, normalized text, used as the `text_hash`
    /// component of the natural key `(external_id, start, end, text_hash)`.
    #[must_use]
    pub fn text_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.trim().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Natural key for a segment owned by `external_id`.
    #[must_use]
    pub fn natural_key(&self, external_id: &str) -> (String, i64, i64, String) {
        // Times are keyed at millisecond precision: fine enough to
        // distinguish real segments, coarse enough to survive float jitter
        // introduced by duration-weighted merges in the Segment Optimizer.
        #[allow(clippy::cast_possible_truncation)]
        let start_ms = (self.start * 1000.0).round() as i64;
        #[allow(clippy::cast_possible_truncation)]
        let end_ms = (self.end * 1000.0).round() as i64;
        (
            external_id.to_string(),
            start_ms,
            end_ms,
            self.text_hash(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Segment {
        Segment {
            start: 1.0,
            end: 2.0,
            text: text.to_string(),
            speaker_label: SpeakerLabel::Chaffee,
            speaker_confidence: Some(0.9),
            metrics: SegmentMetrics::default(),
            re_asr: false,
            is_overlap: false,
            needs_refinement: false,
            embedding: None,
        }
    }

    #[test]
    fn well_formed_rejects_empty_text_and_bad_timing() {
        assert!(segment("hello").is_well_formed());
        let mut s = segment("");
        assert!(!s.is_well_formed());
        s.text = "hello".into();
        s.end = s.start;
        assert!(!s.is_well_formed());
    }

    #[test]
    fn text_hash_is_stable_and_whitespace_insensitive() {
        let a = segment("hello world");
        let b = segment("  hello world  ");
        assert_eq!(a.text_hash(), b.text_hash());
    }

    #[test]
    fn speaker_label_round_trips() {
        for label in [SpeakerLabel::Chaffee, SpeakerLabel::Guest, SpeakerLabel::Unknown] {
            assert_eq!(SpeakerLabel::parse(label.as_str()), label);
        }
    }

    #[test]
    fn quality_thresholds_trigger_refinement() {
        let mut m = SegmentMetrics::default();
        assert!(!m.needs_refinement());
        m.avg_logprob = -1.5;
        assert!(m.needs_refinement());
    }
}
