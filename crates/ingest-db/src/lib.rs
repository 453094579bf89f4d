#![deny(unsafe_code)]

pub mod fs;
pub mod postgres;
pub mod setup;
pub mod vector;

#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

pub use fs::FileVoiceProfileStore;
pub use postgres::{PostgresSegmentStore, PostgresStateStore};
pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;

#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
