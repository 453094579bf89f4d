//! Voice Profile domain type: a persisted fingerprint of the target speaker.

use serde::{Deserialize, Serialize};

/// Default acceptance threshold for cosine similarity against a profile
/// centroid.
pub const DEFAULT_THRESHOLD: f64 = 0.62;

/// Margin below `threshold` beyond which a turn is confidently `GUEST`
/// rather than `UNKNOWN`.
pub const DEFAULT_MARGIN: f64 = 0.05;

/// A unit-normalized embedding representing the target speaker, read-only
/// to the pipeline and created externally by an enrollment tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub name: String,
    pub centroid: Vec<f32>,
    pub threshold: f64,
    pub metadata: Option<serde_json::Value>,
}

impl VoiceProfile {
    /// Cosine similarity between this profile's centroid and an embedding of
    /// the same dimension. Returns `None` on a dimension mismatch rather
    /// than panicking — callers treat that as a speaker-ID failure.
    #[must_use]
    pub fn similarity(&self, embedding: &[f32]) -> Option<f64> {
        if self.centroid.len() != embedding.len() || embedding.is_empty() {
            return None;
        }
        let dot: f32 = self
            .centroid
            .iter()
            .zip(embedding)
            .map(|(a, b)| a * b)
            .sum();
        let norm_a: f32 = self.centroid.iter().map(|v| v * v).sum::<f32>().sqrt();
        let norm_b: f32 = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return None;
        }
        Some(f64::from(dot / (norm_a * norm_b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let profile = VoiceProfile {
            name: "target".into(),
            centroid: vec![1.0, 0.0, 0.0],
            threshold: DEFAULT_THRESHOLD,
            metadata: None,
        };
        let sim = profile.similarity(&[1.0, 0.0, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        let profile = VoiceProfile {
            name: "target".into(),
            centroid: vec![1.0, 0.0],
            threshold: DEFAULT_THRESHOLD,
            metadata: None,
        };
        let sim = profile.similarity(&[0.0, 1.0]).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn dimension_mismatch_returns_none() {
        let profile = VoiceProfile {
            name: "target".into(),
            centroid: vec![1.0, 0.0],
            threshold: DEFAULT_THRESHOLD,
            metadata: None,
        };
        assert!(profile.similarity(&[1.0, 0.0, 0.0]).is_none());
    }
}
