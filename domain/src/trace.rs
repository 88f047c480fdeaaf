//! Execution trace - the per-run record of tool invocations
//!
//! The run's return value is only a call-count summary, so correctness
//! of individual arguments is verified through the trace.

use serde::Serialize;
use serde_json::Value;

/// One extracted parameter: the raw generated text and the value it was
/// coerced to.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterRecord {
    pub name: String,
    pub raw: String,
    pub coerced: Value,
}

/// One tool invocation: every parameter plus the invocation result text
/// (or error string).
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub parameters: Vec<ParameterRecord>,
    pub result: String,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            parameters: Vec::new(),
            result: String::new(),
        }
    }

    pub fn record_parameter(&mut self, name: impl Into<String>, raw: impl Into<String>, coerced: Value) {
        self.parameters.push(ParameterRecord {
            name: name.into(),
            raw: raw.into(),
            coerced,
        });
    }

    /// The coerced value of a named parameter, if it was extracted.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.coerced)
    }
}

/// Ordered record of every tool invocation in one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionTrace {
    invocations: Vec<ToolInvocation>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self {
            invocations: Vec::new(),
        }
    }

    pub fn record(&mut self, invocation: ToolInvocation) {
        self.invocations.push(invocation);
    }

    pub fn invocations(&self) -> &[ToolInvocation] {
        &self.invocations
    }

    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trace_records_invocations() {
        let mut trace = ExecutionTrace::new();

        let mut invocation = ToolInvocation::new("filter");
        invocation.record_parameter("column", "a", json!("a"));
        invocation.result = "2 rows".to_string();
        trace.record(invocation);

        assert_eq!(trace.len(), 1);
        let first = &trace.invocations()[0];
        assert_eq!(first.parameter("column"), Some(&json!("a")));
        assert_eq!(first.parameter("missing"), None);
    }
}
