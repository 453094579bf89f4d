//! Progress events and the observer-sink port.

mod emitter;
mod pipeline_event;

pub use emitter::{NoopProgressEmitter, ProgressEmitterPort};
pub use pipeline_event::{PipelineEvent, PipelineEventKind, RoutingMode};
