//! Concrete Event Emitter / Observer Sink adapters. The port itself
//! (`ProgressEmitterPort`) lives in `ingest-core`; this module holds the
//! subscribers that implement it.

mod fan_out;
mod ring_buffer;
mod stdout;

pub use fan_out::FanOutEmitter;
pub use ring_buffer::RingBufferEmitter;
pub use stdout::StdoutJsonEmitter;
