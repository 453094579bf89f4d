#![deny(unsafe_code)]

//! Embedder port adapters: a remote HTTP embedding service, and a
//! deterministic no-op used by tests and dry runs.

mod noop;
mod remote;

pub use noop::NoopEmbedder;
pub use remote::{RemoteEmbedder, RemoteEmbedderConfig};

#[cfg(test)]
use tokio_test as _;
