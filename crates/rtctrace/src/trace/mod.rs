//! Trace events and the emitter that formats them

mod emitter;
mod event;

pub use emitter::{to_trace_value, EventSink, MemorySink, TraceEmitter};
pub use event::{ConnectionId, TraceEvent};
