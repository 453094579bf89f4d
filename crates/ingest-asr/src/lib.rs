#![deny(unsafe_code)]

//! Speech Recognizer and Diarizer + Voice Identifier adapters.

mod attribution;
mod diarizer;
mod metrics;
mod recognizer;
mod wav;

#[cfg(feature = "local-asr")]
mod local_whisper;

pub use attribution::{attribute_as_monologue, attribute_segments};
pub use diarizer::{OnnxDiarizer, OnnxDiarizerConfig};
pub use recognizer::{HybridRecognizer, HybridRecognizerConfig, RemoteAsrConfig};

#[cfg(feature = "local-asr")]
pub use local_whisper::LocalWhisperConfig;

#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
