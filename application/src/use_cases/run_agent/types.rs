//! Configuration, errors, and the run report for the agent loop

use gramcall_domain::trace::ExecutionTrace;
use thiserror::Error;

use crate::ports::completion::BackendError;

/// Configuration for one [`Agent`](super::Agent).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// System prompt defining agent behavior
    pub system_prompt: String,
    /// Maximum number of tool-call iterations per run
    pub max_iterations: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Whether the agent may decline to use any tool
    pub allow_no_tool: bool,
    /// Token budget for the reasoning step; zero skips reasoning entirely
    pub reasoning_tokens: u32,
    /// Literal whose presence in re-reasoning text terminates the loop
    pub completion_marker: String,
}

impl AgentConfig {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_iterations: 10,
            temperature: 0.7,
            allow_no_tool: false,
            reasoning_tokens: 50,
            completion_marker: "PROCESS_COMPLETE".to_string(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_allow_no_tool(mut self, allow_no_tool: bool) -> Self {
        self.allow_no_tool = allow_no_tool;
        self
    }

    pub fn with_reasoning_tokens(mut self, reasoning_tokens: u32) -> Self {
        self.reasoning_tokens = reasoning_tokens;
        self
    }

    pub fn with_completion_marker(mut self, marker: impl Into<String>) -> Self {
        self.completion_marker = marker.into();
        self
    }
}

/// Errors that abort a run.
///
/// Tool and coercion failures are recovered inside the loop and never
/// surface here; only transport failures do.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Outcome of one run.
///
/// `answer` is the count summary (or the bare reasoning text when no
/// tools were registered); argument-level correctness is verified via
/// `trace`, not the answer.
#[derive(Debug)]
pub struct RunReport {
    pub answer: String,
    pub tool_calls: usize,
    pub trace: ExecutionTrace,
}
