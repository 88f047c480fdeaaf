//! Run Agent use case
//!
//! Drives the decision loop against the completion backend:
//!
//! | State          | Generation call                              |
//! |----------------|----------------------------------------------|
//! | REASON         | unconstrained, tool listing in prompt        |
//! | SELECT_TOOL    | constrained by the tool-selection grammar    |
//! | EXTRACT_PARAMS | one call per parameter, grammar by priority  |
//! | EXECUTE        | none - invokes the tool handler              |
//!
//! After the first iteration a re-reasoning step runs before selection;
//! the completion marker in its text, or the `NONE` sentinel at
//! selection, terminates the loop. Transport failures abort the run;
//! tool and coercion failures are recovered in place.

mod params;
mod types;

pub use types::{AgentConfig, AgentError, RunReport};

use std::sync::Arc;

use gramcall_domain::conversation::{ConversationState, Turn};
use gramcall_domain::grammar::{GrammarCompiler, NONE_SENTINEL};
use gramcall_domain::prompt::PromptTemplate;
use gramcall_domain::tool::{ToolArgs, ToolRegistry};
use gramcall_domain::trace::{ExecutionTrace, ToolInvocation};
use serde_json::Value;
use tracing::{info, warn};

use crate::ports::completion::{BackendError, CompletionBackend, CompletionRequest};
use crate::ports::trace_sink::{TraceRecord, TraceSink};

const SELECTION_TOKENS: u32 = 50;

/// The agent orchestrator. One instance drives any number of sequential
/// runs; conversation state and the execution trace are created fresh
/// per run.
pub struct Agent {
    config: AgentConfig,
    backend: Arc<dyn CompletionBackend>,
    trace_sink: Option<Arc<dyn TraceSink>>,
    compiler: GrammarCompiler,
}

impl Agent {
    pub fn new(config: AgentConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            config,
            backend,
            trace_sink: None,
            compiler: GrammarCompiler::new(),
        }
    }

    /// Attach an append-only sink receiving every backend exchange.
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// Issue one completion request, recording the exchange.
    async fn complete(
        &self,
        label: &str,
        request: CompletionRequest,
    ) -> Result<String, BackendError> {
        let prompt = request.prompt.clone();
        let grammar = request.grammar.clone();
        let generated = self.backend.complete(request).await?;
        if let Some(sink) = &self.trace_sink {
            sink.record(&TraceRecord {
                label: label.to_string(),
                prompt,
                grammar,
                generated: generated.clone(),
            });
        }
        Ok(generated)
    }

    /// Run the agent on a user message.
    ///
    /// Always returns a call-count summary (or the bare reasoning text
    /// when no tools are registered) - never the last tool's raw result.
    /// Verify argument-level behavior through [`RunReport::trace`].
    pub async fn run(
        &mut self,
        registry: &ToolRegistry,
        user_message: &str,
    ) -> Result<RunReport, AgentError> {
        info!(message = %user_message, "Agent run started");

        let pending = registry.pending_tools();
        if !pending.is_empty() {
            warn!(
                tools = ?pending,
                "Dependencies declared for tools that never registered; they will not be used"
            );
        }

        let mut history = ConversationState::new();
        let mut trace = ExecutionTrace::new();
        history.push(Turn::user(user_message));

        let reasoning = self.reason(registry, &history, user_message).await?;
        if !reasoning.is_empty() {
            history.push(Turn::reasoning(reasoning.clone()));
        }

        if registry.is_empty() {
            warn!("No tools registered, returning reasoning as final answer");
            return Ok(RunReport {
                answer: reasoning,
                tool_calls: 0,
                trace,
            });
        }

        for iteration in 0..self.config.max_iterations {
            info!(iteration = iteration + 1, "Tool-call iteration");

            if iteration > 0 && self.config.reasoning_tokens > 0 {
                let re_reasoning = self.re_reason(&history).await?;
                history.push(Turn::reasoning(re_reasoning.clone()));

                let marker = self.config.completion_marker.to_lowercase();
                if !marker.is_empty() && re_reasoning.to_lowercase().contains(&marker) {
                    info!("Completion marker found in reasoning, stopping");
                    break;
                }
            }

            let Some(tool_name) = self.select_tool(registry, &history).await? else {
                info!("Agent declined tool use, stopping");
                break;
            };

            let invocation = self
                .execute_tool(registry, &tool_name, user_message, &history)
                .await?;
            history.push(Turn::tool_result(format!(
                "{}: {}",
                tool_name, invocation.result
            )));
            trace.record(invocation);
        }

        let tool_calls = history.tool_result_count();
        Ok(RunReport {
            answer: format!("Completed {} tool calls", tool_calls),
            tool_calls,
            trace,
        })
    }

    /// REASON: one unconstrained generation over the full history plus
    /// the tool listing. Skipped when the reasoning budget is zero.
    async fn reason(
        &self,
        registry: &ToolRegistry,
        history: &ConversationState,
        user_message: &str,
    ) -> Result<String, BackendError> {
        if self.config.reasoning_tokens == 0 {
            return Ok(String::new());
        }

        let tools = registry.all();
        let prompt = PromptTemplate::base(&self.config.system_prompt, history, user_message)
            + &PromptTemplate::reasoning_suffix(&tools, self.config.allow_no_tool);
        let request = CompletionRequest::new(prompt)
            .with_n_predict(self.config.reasoning_tokens)
            .with_temperature(self.config.temperature)
            .with_stop(["Action:", "User:"]);

        let reasoning = self.complete("reason", request).await?;
        let reasoning = reasoning.trim().to_string();
        info!(reasoning = %reasoning, "Reasoning complete");
        Ok(reasoning)
    }

    /// Re-reasoning before each iteration after the first: decide
    /// whether anything remains to process.
    async fn re_reason(&self, history: &ConversationState) -> Result<String, BackendError> {
        let prompt = PromptTemplate::base(&self.config.system_prompt, history, "")
            + &PromptTemplate::re_reasoning_suffix(
                history.tool_result_count(),
                &history.recorded_names(),
                &self.config.completion_marker,
            );
        let request = CompletionRequest::new(prompt)
            .with_n_predict(self.config.reasoning_tokens)
            .with_temperature(self.config.temperature)
            .with_stop(["Action:", "User:"]);

        let reasoning = self.complete("re_reason", request).await?;
        Ok(reasoning.trim().to_string())
    }

    /// SELECT_TOOL: one generation constrained by the tool-selection
    /// grammar. `None` means the agent chose the stop sentinel.
    async fn select_tool(
        &mut self,
        registry: &ToolRegistry,
        history: &ConversationState,
    ) -> Result<Option<String>, BackendError> {
        let grammar = self
            .compiler
            .tool_selection_grammar(registry, self.config.allow_no_tool);

        let prompt = PromptTemplate::base(&self.config.system_prompt, history, "")
            + &PromptTemplate::selection_suffix(history.tool_result_count());
        let request = CompletionRequest::new(prompt)
            .with_n_predict(SELECTION_TOKENS)
            .with_temperature(self.config.temperature)
            .with_grammar(grammar);

        let selected = self.complete("select_tool", request).await?;
        let selected = selected.trim().trim_matches('"').to_string();

        if selected == NONE_SENTINEL {
            return Ok(None);
        }
        info!(tool = %selected, "Tool selected");
        Ok(Some(selected))
    }

    /// EXTRACT_PARAMS + EXECUTE for one selected tool. Handler failures
    /// become an error-string result; they never abort the run.
    async fn execute_tool(
        &mut self,
        registry: &ToolRegistry,
        tool_name: &str,
        user_message: &str,
        history: &ConversationState,
    ) -> Result<ToolInvocation, BackendError> {
        let mut invocation = ToolInvocation::new(tool_name);

        // Unreachable with grammar-constrained selection, but handled as
        // a discrete result rather than a crash.
        let Some(tool) = registry.get(tool_name).cloned() else {
            warn!(tool = %tool_name, "Selected tool not found in registry");
            invocation.result = format!("Error: Tool {} not found", tool_name);
            return Ok(invocation);
        };

        info!(tool = %tool.name, "Executing tool");

        let mut args = ToolArgs::new();
        let mut extracted: Vec<(String, Value)> = Vec::new();
        for param in &tool.parameters {
            let (raw, value) = self
                .extract_parameter(registry, &tool, param, user_message, history, &extracted)
                .await?;
            invocation.record_parameter(&param.name, raw, value.clone());
            args.push(&param.name, value.clone());
            extracted.push((param.name.clone(), value));
        }

        invocation.result = match tool.handler().invoke(&args) {
            Ok(result) => {
                info!(tool = %tool.name, result = %result, "Tool succeeded");
                result
            }
            Err(e) => {
                warn!(tool = %tool.name, error = %e, "Tool failed");
                format!("Error executing tool: {}", e)
            }
        };
        Ok(invocation)
    }
}
