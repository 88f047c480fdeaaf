//! Configuration file schema

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete configuration, merged from defaults and TOML files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub trace: TraceSection,
}

/// Completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSection {
    /// Base URL of the completion server
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub allow_no_tool: bool,
    #[serde(default = "default_reasoning_tokens")]
    pub reasoning_tokens: u32,
    #[serde(default = "default_completion_marker")]
    pub completion_marker: String,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            temperature: default_temperature(),
            allow_no_tool: false,
            reasoning_tokens: default_reasoning_tokens(),
            completion_marker: default_completion_marker(),
        }
    }
}

/// Trace output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceSection {
    /// File receiving the prompt/grammar/generated log, if any
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_iterations() -> usize {
    10
}

fn default_temperature() -> f32 {
    0.7
}

fn default_reasoning_tokens() -> u32 {
    50
}

fn default_completion_marker() -> String {
    "PROCESS_COMPLETE".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileConfig::default();
        assert_eq!(config.backend.url, "http://localhost:8080");
        assert_eq!(config.backend.timeout_secs, 60);
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.agent.completion_marker, "PROCESS_COMPLETE");
        assert!(config.trace.file.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: FileConfig = toml::from_str(
            r#"
            [backend]
            url = "http://10.0.0.5:8080"

            [agent]
            max_iterations = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.url, "http://10.0.0.5:8080");
        assert_eq!(config.backend.timeout_secs, 60);
        assert_eq!(config.agent.max_iterations, 3);
        assert_eq!(config.agent.reasoning_tokens, 50);
    }
}
