//! Per-item progress events emitted by the Orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SourceStatus;

/// Which ASR routing mode the cost/routing policy selected for the
/// run. Sticky for the whole run once decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingMode {
    LocalGpu,
    RemoteApi,
}

/// A single structured progress record. No component reaches across
/// stages — this is the only channel through which the rest of the system
/// observes per-item progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub ts: DateTime<Utc>,
    pub source_type: String,
    pub external_id: String,
    pub kind: PipelineEventKind,
}

impl PipelineEvent {
    #[must_use]
    pub fn new(source_type: impl Into<String>, external_id: impl Into<String>, kind: PipelineEventKind) -> Self {
        Self {
            ts: Utc::now(),
            source_type: source_type.into(),
            external_id: external_id.into(),
            kind,
        }
    }
}

/// The six event kinds a pipeline item can emit over its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEventKind {
    Discovered,
    Started { stage: SourceStatus },
    StageComplete { stage: SourceStatus },
    Done { segments_count: u32, embeddings_count: u32 },
    Error { message: String, retry_count: u32 },
    Skipped { reason: String },
}
