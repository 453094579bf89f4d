//! Error taxonomy for the ingestion engine.
//!
//! Designed to be serializable and not depend on external error types like
//! `std::io::Error`. For I/O errors, we capture the kind and message as
//! strings so the type stays `Clone + Serialize`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for a single item's pipeline run.
///
/// Maps onto the ten-kind taxonomy: variants are categorized, not
/// merely described, so the Orchestrator can dispatch retry/skip policy on
/// the variant alone.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq)]
pub enum IngestError {
    /// Kind 1: missing/invalid required configuration. Fatal at startup.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Kind 2: source enumeration back-end failure. Fatal for the run.
    #[error("source enumeration failed: {message}")]
    Enumeration { message: String },

    /// Kind 3: members-only/private/geo-blocked/unavailable content.
    /// Per-item terminal-skip; never counted against the retry budget.
    #[error("inaccessible content: {reason}")]
    Inaccessible { reason: String },

    /// Kind 4: network timeouts, rate limits, brief 5xx. Retried with
    /// jittered exponential backoff.
    #[error("transient I/O error: {message}")]
    TransientIo { message: String },

    /// Kind 5: ASR model crash, corrupt audio, empty output. Retried up to
    /// `retry_max`.
    #[error("speech recognition failed: {message}")]
    AsrFailed { message: String },

    /// Kind 6: profile missing or diarizer crash. Non-fatal — segments are
    /// downgraded to `UNKNOWN` and processing continues.
    #[error("speaker identification failed: {message}")]
    SpeakerIdFailed { message: String },

    /// Kind 7: embedding upstream service error. Retried; on persistence,
    /// segments are stored without vectors.
    #[error("embedding failed: {message}")]
    EmbeddingFailed { message: String },

    /// Kind 8: unexpected duplicate or schema mismatch. Rolled back,
    /// retried once, then terminal.
    #[error("database conflict: {message}")]
    DbConflict { message: String },

    /// Kind 9: the run's cost ceiling was reached.
    #[error("cost budget exhausted: spent {spent:.4}, ceiling {ceiling:.4}")]
    CostBudgetExhausted { spent: f64, ceiling: f64 },

    /// Kind 10: cooperative cancellation observed at a checkpoint.
    #[error("cancelled")]
    Cancelled,

    /// Audio exceeded the size cap even after the compression fallback.
    #[error("audio too large: {bytes} bytes exceeds cap of {cap_bytes} bytes")]
    TooLarge { bytes: u64, cap_bytes: u64 },

    /// General/uncategorized error, not expected to recur once triaged.
    #[error("{message}")]
    Other { message: String },
}

impl IngestError {
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transient_io(message: impl Into<String>) -> Self {
        Self::TransientIo {
            message: message.into(),
        }
    }

    /// Capture a `std::io::Error` as a transient I/O error, recording the
    /// kind and message as strings rather than the non-serializable type.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        Self::TransientIo {
            message: format!("{:?}: {err}", err.kind()),
        }
    }

    #[must_use]
    pub fn asr_failed(message: impl Into<String>) -> Self {
        Self::AsrFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn speaker_id_failed(message: impl Into<String>) -> Self {
        Self::SpeakerIdFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn embedding_failed(message: impl Into<String>) -> Self {
        Self::EmbeddingFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn db_conflict(message: impl Into<String>) -> Self {
        Self::DbConflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether this error's owning item should be retried by the
    /// Orchestrator rather than moved straight to a terminal state.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TransientIo { .. } | Self::AsrFailed { .. } | Self::EmbeddingFailed { .. }
        )
    }

    /// Whether this error is a terminal-skip that must not count against
    /// the retry budget.
    #[must_use]
    pub const fn is_terminal_skip(&self) -> bool {
        matches!(self, Self::Inaccessible { .. })
    }

    /// Whether this error should abort the whole process rather than being
    /// converted to a per-item state transition.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Enumeration { .. })
    }

    /// Render a short, user-facing message for the run summary.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration { message } => format!("Configuration error: {message}"),
            Self::Enumeration { message } => format!("Could not list sources: {message}"),
            Self::Inaccessible { reason } => format!("Skipped (inaccessible): {reason}"),
            Self::TransientIo { message } => format!("Network error: {message}"),
            Self::AsrFailed { message } => format!("Speech recognition failed: {message}"),
            Self::SpeakerIdFailed { message } => {
                format!("Speaker identification failed, labeling UNKNOWN: {message}")
            }
            Self::EmbeddingFailed { message } => format!("Embedding failed: {message}"),
            Self::DbConflict { message } => format!("Database conflict: {message}"),
            Self::CostBudgetExhausted { spent, ceiling } => {
                format!("Cost budget exhausted: spent {spent:.4} of {ceiling:.4}")
            }
            Self::Cancelled => "Cancelled".to_string(),
            Self::TooLarge { bytes, cap_bytes } => {
                format!("Audio too large: {bytes} bytes exceeds cap of {cap_bytes} bytes")
            }
            Self::Other { message } => message.clone(),
        }
    }
}

/// Convenience result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification_matches_policy() {
        assert!(IngestError::transient_io("timeout").is_recoverable());
        assert!(IngestError::asr_failed("crash").is_recoverable());
        assert!(!IngestError::Cancelled.is_recoverable());
        assert!(!IngestError::db_conflict("dup").is_recoverable());
    }

    #[test]
    fn inaccessible_is_terminal_skip_not_recoverable() {
        let err = IngestError::Inaccessible {
            reason: "members-only".into(),
        };
        assert!(err.is_terminal_skip());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn fatal_classes_match_taxonomy() {
        assert!(IngestError::configuration("missing DATABASE_URL").is_fatal());
        assert!(
            IngestError::Enumeration {
                message: "lister crashed".into()
            }
            .is_fatal()
        );
        assert!(!IngestError::asr_failed("x").is_fatal());
    }

    #[test]
    fn error_serialization_round_trips() {
        let err = IngestError::CostBudgetExhausted {
            spent: 2.5,
            ceiling: 2.0,
        };
        let json = serde_json::to_string(&err).unwrap();
        let parsed: IngestError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }
}
