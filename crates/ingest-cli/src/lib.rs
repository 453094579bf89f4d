#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Silenced until every path below exercises these in non-test code.
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;

pub mod bootstrap;
pub mod config_loader;
pub mod error;
pub mod parser;

pub use bootstrap::bootstrap;
pub use config_loader::load_config;
pub use error::CliError;
pub use parser::{Cli, Commands};
