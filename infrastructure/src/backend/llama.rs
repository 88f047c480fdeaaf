//! llama.cpp completion backend adapter
//!
//! Posts [`CompletionRequest`]s to a llama.cpp server's `/completion`
//! endpoint and reads the `content` field of the response. Any server
//! honoring that contract (prompt/n_predict/temperature/grammar/stop in,
//! content out) is substitutable.

use std::time::Duration;

use async_trait::async_trait;
use gramcall_application::ports::completion::{BackendError, CompletionBackend, CompletionRequest};
use serde::Deserialize;
use tracing::debug;

/// Default per-request timeout. There is no other cancellation
/// primitive; an in-flight request cannot be aborted early.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

/// HTTP adapter for a llama.cpp-compatible completion server.
#[derive(Debug, Clone)]
pub struct LlamaCppBackend {
    client: reqwest::Client,
    base_url: String,
}

impl LlamaCppBackend {
    /// Connect to a server at `base_url` (e.g. `http://localhost:8080`)
    /// with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::ConnectionError(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionBackend for LlamaCppBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<String, BackendError> {
        debug!(
            prompt_len = request.prompt.len(),
            n_predict = request.n_predict,
            constrained = request.grammar.is_some(),
            "Completion request"
        );

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else if e.is_connect() {
                    BackendError::ConnectionError(e.to_string())
                } else {
                    BackendError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::RequestFailed(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        debug!(generated_len = body.content.len(), "Completion response");
        Ok(body.content)
    }
}
