//! Combines several subscriber adapters into the single shared, cloneable
//! handle the Orchestrator holds. Typically the stdout logger plus the
//! run-summary reporter, with the ring buffer added in tests.

use std::sync::Arc;

use async_trait::async_trait;

use ingest_core::{PipelineEvent, ProgressEmitterPort};

pub struct FanOutEmitter {
    subscribers: Vec<Arc<dyn ProgressEmitterPort>>,
}

impl FanOutEmitter {
    #[must_use]
    pub fn new(subscribers: Vec<Arc<dyn ProgressEmitterPort>>) -> Self {
        Self { subscribers }
    }
}

#[async_trait]
impl ProgressEmitterPort for FanOutEmitter {
    async fn emit(&self, event: PipelineEvent) {
        for subscriber in &self.subscribers {
            subscriber.emit(event.clone()).await;
        }
    }
}
