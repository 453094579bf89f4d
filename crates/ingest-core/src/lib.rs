#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{AsrQualityThresholds, ConfigError, IngestConfig, LogFormat, SourceBackend};
pub use domain::{Segment, SegmentMetrics, SpeakerLabel, Source, SourceMeta, SourceStatus, VoiceProfile};
pub use errors::{IngestError, IngestResult};
pub use events::{NoopProgressEmitter, PipelineEvent, PipelineEventKind, ProgressEmitterPort, RoutingMode};
pub use ports::{
    AcquireConstraints, AcquiredAudio, AudioAcquirerPort, Caption, CaptionFetcherPort,
    CaptionOutcome, CaptionSet, DiarizerPort, EmbedderPort, RawSegment, RecognizerMode,
    RepositoryError, SegmentStorePort, SkipReason, SourceListerFilters, SourceListerPort,
    SpeakerTurn, SpeechRecognizerPort, StateStorePort, StatusUpdate, VoiceProfileStorePort,
};

// Silence unused dev-dependency warnings until every crate's test suite exercises these.
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
