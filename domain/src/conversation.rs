//! Conversation state - the turn history of one orchestration run

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static RECORDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Recorded (.+)").expect("static pattern"));

/// Role of a turn in the run history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Reasoning,
    ToolResult,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Reasoning => "Reasoning",
            Role::ToolResult => "ToolResult",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One turn of the run history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            role: Role::Reasoning,
            text: text.into(),
        }
    }

    pub fn tool_result(text: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResult,
            text: text.into(),
        }
    }
}

/// Ordered turn history scoped to a single orchestration run. Created
/// fresh per run and discarded afterwards; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of tool-result turns so far, i.e. completed tool calls.
    pub fn tool_result_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role == Role::ToolResult)
            .count()
    }

    /// Names extracted from `Recorded <name>` tool results, used by the
    /// re-reasoning prompt to list already-processed entities.
    pub fn recorded_names(&self) -> Vec<String> {
        self.turns
            .iter()
            .filter(|t| t.role == Role::ToolResult)
            .filter_map(|t| RECORDED.captures(&t.text))
            .map(|c| c[1].trim().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_count() {
        let mut state = ConversationState::new();
        state.push(Turn::user("hello"));
        state.push(Turn::reasoning("thinking"));
        state.push(Turn::tool_result("filter: done"));
        state.push(Turn::tool_result("filter: done again"));

        assert_eq!(state.tool_result_count(), 2);
    }

    #[test]
    fn test_recorded_names() {
        let mut state = ConversationState::new();
        state.push(Turn::tool_result("record_patient: Recorded Alice"));
        state.push(Turn::tool_result("filter: 3 rows"));
        state.push(Turn::tool_result("record_patient: Recorded Bob"));

        assert_eq!(state.recorded_names(), vec!["Alice", "Bob"]);
    }
}
