//! Use cases: application workflows built on the ports

pub mod run_agent;

pub use run_agent::{Agent, AgentConfig, AgentError, RunReport};
