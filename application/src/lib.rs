//! Application layer for gramcall
//!
//! This crate defines the ports to the outside world (completion
//! backend, trace sink) and the agent orchestrator that drives the
//! decision loop over them. Adapters live in the infrastructure layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    BackendError, CompletionBackend, CompletionRequest, NoTraceSink, TraceRecord, TraceSink,
};
pub use use_cases::{Agent, AgentConfig, AgentError, RunReport};
