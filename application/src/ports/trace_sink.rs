//! Trace sink port
//!
//! An optional append-only record of every prompt/grammar/generated-text
//! triple the orchestrator exchanges with the backend, for offline
//! inspection only.

use serde::Serialize;

/// One backend exchange.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    /// What the exchange was for (e.g. `reason`, `select_tool`,
    /// `param:column`)
    pub label: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar: Option<String>,
    pub generated: String,
}

/// Append-only sink for backend exchanges.
///
/// Recording must never fail the run; implementations swallow and log
/// their own I/O errors.
pub trait TraceSink: Send + Sync {
    fn record(&self, record: &TraceRecord);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Default)]
pub struct NoTraceSink;

impl TraceSink for NoTraceSink {
    fn record(&self, _record: &TraceRecord) {}
}
