//! Configuration Loader: the validated, immutable snapshot handed to
//! every component. Loading itself (layering env/file/CLI overrides) lives
//! in `ingest-cli`, which owns the process boundary; this module defines
//! the shape and the validation rules every loader must satisfy.

mod error;
mod ingest_config;

pub use error::ConfigError;
pub use ingest_config::{AsrQualityThresholds, IngestConfig, LogFormat, SourceBackend};
