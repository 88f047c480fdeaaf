//! Ports: interfaces between the application layer and the outside world

pub mod completion;
pub mod trace_sink;

pub use completion::{BackendError, CompletionBackend, CompletionRequest};
pub use trace_sink::{NoTraceSink, TraceRecord, TraceSink};
