//! Port traits: the seams between the pure domain/orchestration logic and
//! every adapter crate in the workspace.

mod audio_acquirer;
mod caption_fetcher;
mod diarizer;
mod embedder;
mod repository_error;
mod segment_store;
mod source_lister;
mod speech_recognizer;
mod state_store;
mod voice_profile_store;

pub use audio_acquirer::{AcquireConstraints, AcquiredAudio, AudioAcquirerPort, SkipReason};
pub use caption_fetcher::{Caption, CaptionFetcherPort, CaptionOutcome, CaptionSet};
pub use diarizer::{DiarizerPort, SpeakerTurn};
pub use embedder::EmbedderPort;
pub use repository_error::RepositoryError;
pub use segment_store::SegmentStorePort;
pub use source_lister::{SourceListerPort, SourceListerFilters};
pub use speech_recognizer::{RawSegment, RecognizerMode, SpeechRecognizerPort};
pub use state_store::{StateStorePort, StatusUpdate};
pub use voice_profile_store::VoiceProfileStorePort;
