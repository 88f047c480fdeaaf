//! Prompt templates for each stage of the decision loop

use crate::conversation::ConversationState;
use crate::tool::ToolDescriptor;

/// Templates for generating prompts at each loop stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// Base prompt: system prompt, turn history, user message, and the
    /// trailing `Assistant:` cue.
    pub fn base(system_prompt: &str, history: &ConversationState, user_message: &str) -> String {
        let mut parts = vec![system_prompt.to_string()];
        for turn in history.turns() {
            parts.push(format!("{}: {}", turn.role, turn.text));
        }
        parts.push(format!("User: {}", user_message));
        parts.push("Assistant:".to_string());
        parts.join("\n\n")
    }

    /// Suffix appended to the base prompt for the initial reasoning step:
    /// the available-tools listing and the thinking cue.
    pub fn reasoning_suffix(tools: &[ToolDescriptor], allow_no_tool: bool) -> String {
        let mut suffix = String::new();
        if tools.is_empty() {
            return suffix;
        }
        let listing = tools
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n");
        suffix.push_str(&format!("\n\nAvailable tools:\n{}", listing));
        if allow_no_tool {
            suffix.push_str(
                "\nNote: You may choose to use none of the tools if that is the rational decision.",
            );
        }
        suffix.push_str("\n\nThinking: To process the request, I need to");
        suffix
    }

    /// Suffix for the re-reasoning step on iterations after the first.
    /// Lists completed calls and already-processed entity names, and asks
    /// for the completion marker when everything is done.
    pub fn re_reasoning_suffix(
        tool_calls: usize,
        processed_names: &[String],
        completion_marker: &str,
    ) -> String {
        let processed = if processed_names.is_empty() {
            "None".to_string()
        } else {
            processed_names.join(", ")
        };
        format!(
            "\n\nCompleted actions: {} tool calls.\nProcessed entities: {}.\n\
             Based on the above history, what should I do next? Have you processed \
             ALL entities mentioned in the text? If yes, output '{}'. \
             If no, what is the next step? Thinking:",
            tool_calls, processed, completion_marker
        )
    }

    /// Suffix for the grammar-constrained tool-selection step.
    pub fn selection_suffix(tool_calls: usize) -> String {
        format!(
            "\n\n[System] History: {} tools executed so far.\nAction: ",
            tool_calls
        )
    }

    /// Prompt for a code-valued parameter: free-form generation under
    /// strict instructions instead of a grammar constraint.
    pub fn code_parameter(system_prompt: &str, user_message: &str, language: &str) -> String {
        format!(
            "{}\n\nUser request: {}\n\
             Write ONLY executable {} statements for the tool parameter.\n\
             Do not define functions or classes.\n\
             Do not include markdown fences or explanations.\n\
             Use existing variables if provided by the tool context.\n\
             Set RESULT to the final JSON-serializable value.\n",
            system_prompt, user_message, language
        )
    }

    /// Prompt for a list-of-records parameter, showing the expected field
    /// structure.
    pub fn record_list_parameter(
        param_name: &str,
        field_names: &[&str],
        user_message: &str,
        entity_context: &str,
    ) -> String {
        let example_item = format!(
            "{{{}}}",
            field_names
                .iter()
                .map(|f| format!("\"{}\": ...", f))
                .collect::<Vec<_>>()
                .join(", ")
        );
        format!(
            "{}From the text below, extract {} as an array of objects with these fields: {}.\n\
             Example format: [{}]\n\n{}\n\nAnswer:\n",
            Self::focus(entity_context),
            param_name,
            field_names.join(", "),
            example_item,
            user_message
        )
    }

    /// Prompt for a plain list parameter.
    pub fn list_parameter(param_name: &str, user_message: &str, entity_context: &str) -> String {
        format!(
            "{}From the text below, extract {} as an array like [\"item1\", \"item2\"]:\n\n{}\n\nAnswer:\n",
            Self::focus(entity_context),
            param_name,
            user_message
        )
    }

    /// Prompt for a dict/record parameter.
    pub fn object_parameter(param_name: &str, user_message: &str, entity_context: &str) -> String {
        format!(
            "{}From the text below, extract {} as an object:\n\n{}\n\nAnswer:\n",
            Self::focus(entity_context),
            param_name,
            user_message
        )
    }

    /// Prompt for a simple parameter: list every occurrence, one per
    /// line, optionally constrained to the known legal values.
    pub fn simple_parameter(
        param_name: &str,
        user_message: &str,
        entity_context: &str,
        valid_values: Option<&[String]>,
    ) -> String {
        let constraint = match valid_values {
            Some(values) if !values.is_empty() => {
                format!(" Values must be one of: {}.", values.join(", "))
            }
            _ => " Do not include any other text.".to_string(),
        };
        format!(
            "{}List every occurrence of {} found in the text, one per line. \
             Do not number the lines. Do not combine values for different entities.{}\n\n\
             {}\n\n{} list:",
            entity_context, param_name, constraint, user_message, param_name
        )
    }

    /// Render already-extracted scalar parameters as entity context for
    /// later parameter prompts.
    pub fn entity_context(extracted: &[(String, serde_json::Value)]) -> String {
        let items: Vec<String> = extracted
            .iter()
            .filter_map(|(name, value)| {
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some(format!("{}='{}'", name, rendered))
            })
            .collect();
        if items.is_empty() {
            String::new()
        } else {
            format!("Current Entity Context: {}.\n", items.join(", "))
        }
    }

    fn focus(entity_context: &str) -> String {
        if entity_context.is_empty() {
            String::new()
        } else {
            format!("Focus ONLY on the entity described by: {}\n", entity_context)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Turn;
    use serde_json::json;

    #[test]
    fn test_base_prompt_layout() {
        let mut history = ConversationState::new();
        history.push(Turn::user("first question"));
        history.push(Turn::reasoning("I should filter"));

        let prompt = PromptTemplate::base("You are an agent.", &history, "next question");
        assert!(prompt.starts_with("You are an agent."));
        assert!(prompt.contains("User: first question"));
        assert!(prompt.contains("Reasoning: I should filter"));
        assert!(prompt.ends_with("Assistant:"));
    }

    #[test]
    fn test_re_reasoning_mentions_marker() {
        let suffix = PromptTemplate::re_reasoning_suffix(2, &["Alice".to_string()], "PROCESS_COMPLETE");
        assert!(suffix.contains("2 tool calls"));
        assert!(suffix.contains("Alice"));
        assert!(suffix.contains("'PROCESS_COMPLETE'"));
    }

    #[test]
    fn test_simple_parameter_lists_valid_values() {
        let values = vec!["a".to_string(), "b".to_string()];
        let prompt = PromptTemplate::simple_parameter("column", "some text", "", Some(&values));
        assert!(prompt.contains("Values must be one of: a, b."));
        assert!(prompt.ends_with("column list:"));
    }

    #[test]
    fn test_entity_context_skips_structured_values() {
        let extracted = vec![
            ("name".to_string(), json!("Alice")),
            ("age".to_string(), json!(30)),
            ("meds".to_string(), json!(["a", "b"])),
        ];
        let context = PromptTemplate::entity_context(&extracted);
        assert_eq!(context, "Current Entity Context: name='Alice', age='30'.\n");
    }
}
