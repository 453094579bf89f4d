//! Observer-sink port: fan-out of [`PipelineEvent`]s to subscribers.

use async_trait::async_trait;

use super::PipelineEvent;

/// Port implemented by every progress-event subscriber (structured logger,
/// run-summary accumulator, in-memory test collector).
///
/// Emission must never meaningfully block a worker: an adapter whose own
/// internal channel is full should drop the event and log a warning rather
/// than propagate backpressure into the pipeline.
#[async_trait]
pub trait ProgressEmitterPort: Send + Sync {
    async fn emit(&self, event: PipelineEvent);
}

/// An emitter that discards every event. Used as the default when no
/// subscriber is configured, and in tests that don't assert on events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressEmitter;

#[async_trait]
impl ProgressEmitterPort for NoopProgressEmitter {
    async fn emit(&self, _event: PipelineEvent) {}
}
