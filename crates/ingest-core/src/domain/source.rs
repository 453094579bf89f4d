//! Source domain type: a single ingestible video/audio item.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Processing status of a [`Source`], per the pipeline state machine.
///
/// Transitions are validated by the orchestrator, not by this type: any
/// status can move to `Error`, `Error` can move back to `Pending` while
/// `retry_count < retry_max`, and `Done` is terminal unless a force-reprocess
/// flag is set by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SourceStatus {
    #[default]
    Pending,
    Downloading,
    Transcribed,
    Diarized,
    Optimized,
    Embedded,
    Upserted,
    Done,
    Error,
    Skipped,
}

impl SourceStatus {
    /// Canonical lowercase string used in storage and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Transcribed => "transcribed",
            Self::Diarized => "diarized",
            Self::Optimized => "optimized",
            Self::Embedded => "embedded",
            Self::Upserted => "upserted",
            Self::Done => "done",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }

    /// Parse a stored status string, defaulting to `Pending` on an unknown value.
    ///
    /// Unknown values should not occur in practice; defaulting rather than
    /// failing keeps the state-store read path infallible (mirroring how
    /// `DownloadStatus::parse` treats unexpected values in storage).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "downloading" => Self::Downloading,
            "transcribed" => Self::Transcribed,
            "diarized" => Self::Diarized,
            "optimized" => Self::Optimized,
            "embedded" => Self::Embedded,
            "upserted" => Self::Upserted,
            "done" => Self::Done,
            "error" => Self::Error,
            "skipped" => Self::Skipped,
            _ => Self::Pending,
        }
    }

    /// `Done` is terminal and final for a given input unless the caller
    /// explicitly sets `force_reprocess`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Skipped)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata about a [`Source`] as discovered by the Source Lister, before
/// any processing state exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMeta {
    pub source_type: String,
    pub external_id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub channel_name: Option<String>,
    pub channel_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub duration_s: Option<u32>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Option<Json>,
    pub metadata: Option<Json>,
}

impl SourceMeta {
    /// A minimal record carrying nothing but the external id, used when
    /// per-item enrichment fails but enumeration itself succeeded.
    #[must_use]
    pub fn minimal(source_type: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            external_id: external_id.into(),
            title: None,
            url: None,
            channel_name: None,
            channel_url: None,
            published_at: None,
            duration_s: None,
            view_count: None,
            like_count: None,
            comment_count: None,
            description: None,
            thumbnail_url: None,
            tags: None,
            metadata: None,
        }
    }

    /// Composite identity used throughout the system: `(source_type, external_id)`.
    #[must_use]
    pub fn identity(&self) -> (&str, &str) {
        (&self.source_type, &self.external_id)
    }
}

/// A [`Source`] together with its current processing state, as persisted by
/// the State Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub meta: SourceMeta,
    pub status: SourceStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub has_manual_captions: bool,
    pub has_asr: bool,
    pub segments_count: u32,
    pub embeddings_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Source {
    /// Construct a freshly-discovered `Source` with no processing history.
    #[must_use]
    pub fn new_pending(meta: SourceMeta, now: DateTime<Utc>) -> Self {
        Self {
            meta,
            status: SourceStatus::Pending,
            retry_count: 0,
            last_error: None,
            has_manual_captions: false,
            has_asr: false,
            segments_count: 0,
            embeddings_count: 0,
            created_at: now,
            last_updated: now,
            processed_at: None,
        }
    }

    /// True if this Source should be skipped by the current run: already
    /// `done` without force-reprocess, or `error` with
    /// `retry_count >= retry_max`.
    #[must_use]
    pub fn should_skip(&self, retry_max: u32, force_reprocess: bool) -> bool {
        if self.status == SourceStatus::Done && !force_reprocess {
            return true;
        }
        if self.status == SourceStatus::Error && self.retry_count >= retry_max {
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_parse() {
        for s in [
            SourceStatus::Pending,
            SourceStatus::Downloading,
            SourceStatus::Transcribed,
            SourceStatus::Diarized,
            SourceStatus::Optimized,
            SourceStatus::Embedded,
            SourceStatus::Upserted,
            SourceStatus::Done,
            SourceStatus::Error,
            SourceStatus::Skipped,
        ] {
            assert_eq!(SourceStatus::parse(s.as_str()), s);
        }
    }

    #[test]
    fn unknown_status_defaults_to_pending() {
        assert_eq!(SourceStatus::parse("bogus"), SourceStatus::Pending);
    }

    #[test]
    fn done_is_skipped_without_force_reprocess() {
        let meta = SourceMeta::minimal("youtube", "abc123");
        let mut source = Source::new_pending(meta, Utc::now());
        source.status = SourceStatus::Done;
        assert!(source.should_skip(3, false));
        assert!(!source.should_skip(3, true));
    }

    #[test]
    fn error_is_skipped_only_past_retry_max() {
        let meta = SourceMeta::minimal("youtube", "abc123");
        let mut source = Source::new_pending(meta, Utc::now());
        source.status = SourceStatus::Error;
        source.retry_count = 2;
        assert!(!source.should_skip(3, false));
        source.retry_count = 3;
        assert!(source.should_skip(3, false));
    }
}
