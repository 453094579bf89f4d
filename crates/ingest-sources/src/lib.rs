#![deny(unsafe_code)]

//! Source Lister, Audio Acquirer and Caption Fetcher adapters.
//!
//! All three shell out to (or call the same HTTP surface as) a CLI
//! media-downloader: the Source Lister's catalog-scraper back-end, the
//! Audio Acquirer's download+transcode step, and the Caption Fetcher's
//! subtitle-extraction fallback rung all drive the same subprocess.

mod acquirer;
mod captions;
mod lister;
mod process;
mod vtt;

pub use acquirer::{CliAudioAcquirer, CliAudioAcquirerConfig};
pub use captions::{CaptionFetcherConfig, FallbackCaptionFetcher};
pub use lister::{ApiSourceLister, ApiSourceListerConfig, ScrapeSourceLister, ScrapeSourceListerConfig};

#[cfg(test)]
use tempfile as _;
