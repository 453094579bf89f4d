//! Pure domain types for the ingestion engine.
//!
//! No I/O, no async, no port dependencies — only the data shapes the rest
//! of the workspace agrees on.

mod segment;
mod source;
mod voice_profile;

pub use segment::{Segment, SegmentMetrics, SpeakerLabel};
pub use source::{Source, SourceMeta, SourceStatus};
pub use voice_profile::VoiceProfile;
