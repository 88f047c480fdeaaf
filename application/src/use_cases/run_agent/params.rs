//! Parameter extraction: one grammar-guided generation per parameter
//!
//! Grammar priority per parameter: dependency grammar, then a coarse
//! grammar for the declared primitive type, then unconstrained
//! generation under a list-every-occurrence heuristic prompt. Raw text
//! flows through the normalizer and coercer; coercion failures keep the
//! original string.

use gramcall_domain::conversation::ConversationState;
use gramcall_domain::grammar::GrammarCompiler;
use gramcall_domain::output::{coerce, normalize, NormalizeContext};
use gramcall_domain::prompt::PromptTemplate;
use gramcall_domain::tool::{ParamType, ParameterDescriptor, ToolDescriptor, ToolRegistry};
use serde_json::Value;
use tracing::{debug, warn};

use super::Agent;
use crate::ports::completion::{BackendError, CompletionRequest};

const CODE_TOKENS: u32 = 220;
const COMPLEX_TOKENS: u32 = 250;
const SIMPLE_TOKENS: u32 = 50;

impl Agent {
    /// Generate, normalize, and coerce one parameter value.
    ///
    /// Returns the normalized text alongside the coerced value so both
    /// can be traced.
    pub(super) async fn extract_parameter(
        &mut self,
        registry: &ToolRegistry,
        tool: &ToolDescriptor,
        param: &ParameterDescriptor,
        user_message: &str,
        history: &ConversationState,
        extracted: &[(String, Value)],
    ) -> Result<(String, Value), BackendError> {
        let is_complex = param.param_type.is_complex();
        let is_code = param.param_type.is_code();
        let dependency = tool.dependency_for(&param.name);

        let language = param
            .param_type
            .code_language()
            .or_else(|| dependency.and_then(|d| d.language_tag()))
            .unwrap_or("python")
            .to_string();

        let param_grammar = self
            .compiler
            .parameter_value_grammar(registry, &tool.name, &param.name)
            .or_else(|| GrammarCompiler::native_type_grammar(&param.param_type));

        // Language grammars are too permissive for long code outputs;
        // strict prompting plus fence stripping works better there.
        let use_grammar = param_grammar.is_some()
            && !(is_code && dependency.is_some_and(|d| d.is_language_grammar()));

        let entity_context = PromptTemplate::entity_context(extracted);
        let prompt = if is_code {
            PromptTemplate::code_parameter(&self.config.system_prompt, user_message, &language)
        } else if is_complex {
            match &param.param_type {
                ParamType::List(inner) => match inner.as_ref() {
                    ParamType::Record(schema) => {
                        let fields: Vec<&str> = schema.field_names().collect();
                        PromptTemplate::record_list_parameter(
                            &param.name,
                            &fields,
                            user_message,
                            &entity_context,
                        )
                    }
                    _ => PromptTemplate::list_parameter(&param.name, user_message, &entity_context),
                },
                _ => PromptTemplate::object_parameter(&param.name, user_message, &entity_context),
            }
        } else {
            let valid_values = dependency.and_then(|d| d.values());
            PromptTemplate::simple_parameter(&param.name, user_message, &entity_context, valid_values)
        };

        let n_predict = if is_code {
            CODE_TOKENS
        } else if is_complex {
            COMPLEX_TOKENS
        } else {
            SIMPLE_TOKENS
        };

        let mut request = CompletionRequest::new(prompt)
            .with_n_predict(n_predict)
            .with_temperature(self.config.temperature);
        match param_grammar {
            Some(grammar) if use_grammar => {
                debug!(
                    tool = %tool.name,
                    param = %param.name,
                    grammar_bytes = grammar.len(),
                    "Using grammar constraint for parameter"
                );
                request = request.with_grammar(grammar);
            }
            _ => {
                debug!(
                    tool = %tool.name,
                    param = %param.name,
                    "No grammar constraint for parameter, using unconstrained"
                );
                request = request.with_stop(["\n\nUser:", "\n\nAssistant:"]);
            }
        }

        let label = format!("param:{}", param.name);
        let raw = self.complete(&label, request).await?;

        let ctx = NormalizeContext {
            param_name: &param.name,
            is_complex,
            is_code,
            language: Some(&language),
            prior_invocations: history.tool_result_count(),
        };
        let normalized = normalize(&raw, &ctx);

        let coerced = match coerce(&normalized, &param.param_type) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    tool = %tool.name,
                    param = %param.name,
                    error = %e,
                    "Coercion failed, keeping original string"
                );
                Value::String(normalized.clone())
            }
        };

        Ok((normalized, coerced))
    }
}
