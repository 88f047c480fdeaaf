//! Completion backend port
//!
//! Defines the request/response contract with the text-generation
//! backend. Any backend exposing a completion endpoint that honors a
//! GBNF `grammar` field is substitutable; the llama.cpp adapter lives in
//! the infrastructure layer.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A single completion request.
///
/// Serializes to the wire shape the backend expects:
/// `{prompt, n_predict, temperature, grammar?, stop?}`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub n_predict: u32,
    pub temperature: f32,
    /// GBNF grammar constraining the output, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar: Option<String>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            n_predict: 512,
            temperature: 0.7,
            grammar: None,
            stop: Vec::new(),
        }
    }

    pub fn with_n_predict(mut self, n_predict: u32) -> Self {
        self.n_predict = n_predict;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_grammar(mut self, grammar: impl Into<String>) -> Self {
        self.grammar = Some(grammar.into());
        self
    }

    pub fn with_stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = stop.into_iter().map(Into::into).collect();
        self
    }
}

/// Errors from the completion backend. All variants are fatal for the
/// run in progress and propagate to the caller.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out")]
    Timeout,
}

/// Gateway to the text-generation backend.
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Issue one completion request and return the generated text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_omits_empty_fields() {
        let request = CompletionRequest::new("hello").with_n_predict(50);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["prompt"], "hello");
        assert_eq!(json["n_predict"], 50);
        assert!(json.get("grammar").is_none());
        assert!(json.get("stop").is_none());
    }

    #[test]
    fn test_request_serialization_includes_grammar() {
        let request = CompletionRequest::new("hello")
            .with_grammar("root ::= \"a\"")
            .with_stop(["User:"]);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["grammar"], "root ::= \"a\"");
        assert_eq!(json["stop"][0], "User:");
    }
}
