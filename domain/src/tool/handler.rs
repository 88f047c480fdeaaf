//! Tool handlers - the invocable side of a tool descriptor

use serde_json::Value;
use thiserror::Error;

/// Error raised by a tool handler.
///
/// Handler failures never abort an orchestration run; the loop converts
/// them into an error-string tool-result turn and continues.
#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ToolError::InvalidArgument(message.into())
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        ToolError::ExecutionFailed(message.into())
    }
}

/// Ordered keyword arguments passed to a tool handler.
///
/// Arguments arrive in the tool's declared parameter order, already
/// coerced to their declared types (or left as strings when coercion
/// failed and was recovered).
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    args: Vec<(String, Value)>,
}

impl ToolArgs {
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.args.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Get a string argument
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    /// Get an integer argument
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_i64())
    }

    /// Get a boolean argument
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }

    /// Get a required string argument or fail with an invalid-argument error
    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        self.get_str(name)
            .ok_or_else(|| ToolError::invalid_argument(format!("Missing required argument: {}", name)))
    }

    /// Iterate over arguments in declared order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.args.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl FromIterator<(String, Value)> for ToolArgs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().collect(),
        }
    }
}

/// The invocable attached to a tool descriptor.
///
/// Implemented automatically for any compatible closure, so tools are
/// typically registered as plain functions:
///
/// ```
/// use gramcall_domain::tool::{ToolArgs, ToolError};
///
/// fn mix_colors(args: &ToolArgs) -> Result<String, ToolError> {
///     let first = args.require_str("first")?;
///     let second = args.require_str("second")?;
///     Ok(format!("Mixed {} and {}", first, second))
/// }
/// ```
pub trait ToolHandler: Send + Sync {
    /// Invoke the tool with coerced keyword arguments.
    fn invoke(&self, args: &ToolArgs) -> Result<String, ToolError>;
}

impl<F> ToolHandler for F
where
    F: Fn(&ToolArgs) -> Result<String, ToolError> + Send + Sync,
{
    fn invoke(&self, args: &ToolArgs) -> Result<String, ToolError> {
        self(args)
    }
}
