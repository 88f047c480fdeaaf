//! Grammar compiler - GBNF grammars built from registry contents
//!
//! Three grammar kinds are produced: tool selection, parameter value, and
//! full tool call. Selection and enumerated parameter grammars are
//! memoized by a content fingerprint (sorted tool names, sorted dependency
//! values), so unchanged registry state returns the cached string and any
//! change invalidates automatically.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::tool::{DependencyKind, ParamType, ToolRegistry};

use super::escape::escape_literal;

/// Literal the agent selects to decline tool use.
pub const NONE_SENTINEL: &str = "NONE";

/// Grammar emitted when the registry holds no tools. Selection never
/// yields an empty or invalid grammar.
pub const NO_TOOLS_GRAMMAR: &str = "root ::= \"NO_TOOLS_AVAILABLE\"";

/// Grammar emitted for an enumerated dependency whose snapshot is empty.
pub const NO_OPTIONS_GRAMMAR: &str = "root ::= \"NO_OPTIONS_AVAILABLE\"";

/// Grammar emitted when a tool-call grammar is requested for an unknown
/// tool name.
pub const TOOL_NOT_FOUND_GRAMMAR: &str = "root ::= \"TOOL_NOT_FOUND\"";

#[derive(Debug, Clone)]
struct CachedGrammar {
    fingerprint: u64,
    grammar: String,
}

/// Builds and memoizes GBNF grammars from a [`ToolRegistry`].
///
/// The cache tolerates concurrent recomputation across runs: entries are
/// derived deterministically from registry content, so a recompute always
/// produces the same string and last-write-wins is safe.
#[derive(Debug, Clone, Default)]
pub struct GrammarCompiler {
    cache: HashMap<String, CachedGrammar>,
}

fn fingerprint<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl GrammarCompiler {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    fn cached_or_build(
        &mut self,
        cache_key: String,
        content_fingerprint: u64,
        build: impl FnOnce() -> String,
    ) -> String {
        if let Some(entry) = self.cache.get(&cache_key)
            && entry.fingerprint == content_fingerprint
        {
            return entry.grammar.clone();
        }
        let grammar = build();
        self.cache.insert(
            cache_key,
            CachedGrammar {
                fingerprint: content_fingerprint,
                grammar: grammar.clone(),
            },
        );
        grammar
    }

    /// Grammar accepting exactly the registered tool names, in sorted
    /// order, optionally prefixed with the [`NONE_SENTINEL`] literal when
    /// declining tool use is permitted.
    pub fn tool_selection_grammar(&mut self, registry: &ToolRegistry, allow_none: bool) -> String {
        let names: Vec<String> = registry
            .sorted_names()
            .into_iter()
            .map(String::from)
            .collect();
        let content = fingerprint(&(&names, allow_none));
        let cache_key = format!("tools_grammar_none_{}", allow_none);

        self.cached_or_build(cache_key, content, || {
            if names.is_empty() {
                return NO_TOOLS_GRAMMAR.to_string();
            }
            let mut alternatives = names
                .iter()
                .map(|name| format!("\"{}\"", escape_literal(name)))
                .collect::<Vec<_>>()
                .join(" | ");
            if allow_none {
                alternatives = format!("\"{}\" | {}", NONE_SENTINEL, alternatives);
            }
            format!("root ::= {}", alternatives)
        })
    }

    /// Grammar for a single parameter's legal values.
    ///
    /// Enumerated dependency: alternation of escaped literals (cached).
    /// Grammar dependency: the raw text, unchanged and uncached.
    /// No dependency, or unknown tool/parameter: `None` (unconstrained).
    pub fn parameter_value_grammar(
        &mut self,
        registry: &ToolRegistry,
        tool_name: &str,
        param_name: &str,
    ) -> Option<String> {
        let tool = registry.get(tool_name)?;
        let dependency = tool.dependency_for(param_name)?;

        match &dependency.kind {
            DependencyKind::Grammar(text) => Some(text.clone()),
            DependencyKind::Enumerated(values) => {
                let mut sorted = values.clone();
                sorted.sort_unstable();
                let content = fingerprint(&sorted);
                let cache_key = format!("{}_{}_grammar", tool_name, param_name);

                Some(self.cached_or_build(cache_key, content, || {
                    if values.is_empty() {
                        return NO_OPTIONS_GRAMMAR.to_string();
                    }
                    let alternatives = values
                        .iter()
                        .map(|value| format!("\"{}\"", escape_literal(value)))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    format!("root ::= {}", alternatives)
                }))
            }
        }
    }

    /// Coarse grammar for a declared primitive type, used when a
    /// parameter has no dependency. `None` for types where unconstrained
    /// generation is the better fallback.
    pub fn native_type_grammar(param_type: &ParamType) -> Option<String> {
        match param_type {
            ParamType::Integer => Some("root ::= \"-\"? [0-9]+".to_string()),
            ParamType::Float => Some("root ::= \"-\"? [0-9]+ (\".\" [0-9]+)?".to_string()),
            ParamType::Boolean => Some("root ::= \"true\" | \"false\"".to_string()),
            _ => None,
        }
    }

    /// Grammar for a complete call expression:
    /// `tool_name(param1=value, param2=value)`.
    ///
    /// Each parameter is typed by its enum alternation when an enumerated
    /// dependency exists, otherwise by a coarse grammar for its declared
    /// type, falling back to a quoted string.
    pub fn tool_call_grammar(&self, registry: &ToolRegistry, tool_name: &str) -> String {
        let Some(tool) = registry.get(tool_name) else {
            return TOOL_NOT_FOUND_GRAMMAR.to_string();
        };

        let mut needs_string_rule = false;
        let mut patterns = Vec::with_capacity(tool.parameters.len());

        for param in &tool.parameters {
            let dependency = tool.dependency_for(&param.name);
            let value_pattern = match dependency.and_then(|d| d.values()) {
                Some(values) if !values.is_empty() => {
                    let alternatives = values
                        .iter()
                        .map(|value| format!("\"{}\"", escape_literal(value)))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    format!("({})", alternatives)
                }
                _ => match &param.param_type {
                    ParamType::Integer => "(\"-\"? [0-9]+)".to_string(),
                    ParamType::Float => "(\"-\"? [0-9]+ (\".\" [0-9]+)?)".to_string(),
                    ParamType::Boolean => "(\"true\" | \"false\")".to_string(),
                    ParamType::List(_) => {
                        needs_string_rule = true;
                        "(\"[\" [ ]* (string-value ([ ]* \",\" [ ]* string-value)*)? [ ]* \"]\")"
                            .to_string()
                    }
                    _ => {
                        needs_string_rule = true;
                        "string-value".to_string()
                    }
                },
            };
            patterns.push(format!("\"{}=\" {}", escape_literal(&param.name), value_pattern));
        }

        if patterns.is_empty() {
            return format!("root ::= \"{}\" \"()\"", escape_literal(&tool.name));
        }

        let params = patterns.join(" [,] [ ]* ");
        let mut grammar = format!("root ::= \"{}\" \"(\" {} \")\"", escape_literal(&tool.name), params);
        if needs_string_rule {
            grammar.push_str("\nstring-value ::= [\"] [^\"]* [\"]");
        }
        grammar
    }

    /// Drop all memoized grammars.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ParamType, ParameterDependency, ToolDescriptor, ToolRegistry};
    use crate::tool::handler::{ToolArgs, ToolError};

    fn noop(_args: &ToolArgs) -> Result<String, ToolError> {
        Ok("ok".to_string())
    }

    fn registry_with(names: &[&str]) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for name in names {
            registry.register(ToolDescriptor::builder(*name, noop).build());
        }
        registry
    }

    #[test]
    fn test_selection_grammar_sorted_names() {
        let registry = registry_with(&["zeta", "alpha", "mid"]);
        let mut compiler = GrammarCompiler::new();

        let grammar = compiler.tool_selection_grammar(&registry, false);
        assert_eq!(grammar, "root ::= \"alpha\" | \"mid\" | \"zeta\"");
    }

    #[test]
    fn test_selection_grammar_with_none() {
        let registry = registry_with(&["filter"]);
        let mut compiler = GrammarCompiler::new();

        let grammar = compiler.tool_selection_grammar(&registry, true);
        assert_eq!(grammar, "root ::= \"NONE\" | \"filter\"");
    }

    #[test]
    fn test_selection_grammar_no_tools() {
        let registry = ToolRegistry::new();
        let mut compiler = GrammarCompiler::new();

        assert_eq!(compiler.tool_selection_grammar(&registry, false), NO_TOOLS_GRAMMAR);
    }

    #[test]
    fn test_selection_grammar_cached_until_registry_changes() {
        let mut registry = registry_with(&["filter"]);
        let mut compiler = GrammarCompiler::new();

        let first = compiler.tool_selection_grammar(&registry, false);
        let second = compiler.tool_selection_grammar(&registry, false);
        assert_eq!(first, second);

        registry.register(ToolDescriptor::builder("aggregate", noop).build());
        let third = compiler.tool_selection_grammar(&registry, false);
        assert_ne!(first, third);
        assert!(third.contains("\"aggregate\""));
    }

    #[test]
    fn test_clear_and_reregister_is_deterministic() {
        let mut registry = registry_with(&["filter", "aggregate"]);
        let mut compiler = GrammarCompiler::new();
        let before = compiler.tool_selection_grammar(&registry, false);

        registry.clear();
        registry.register(ToolDescriptor::builder("aggregate", noop).build());
        registry.register(ToolDescriptor::builder("filter", noop).build());

        let after = compiler.tool_selection_grammar(&registry, false);
        assert_eq!(before, after);
    }

    #[test]
    fn test_parameter_grammar_enumerated() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::builder("filter", noop)
                .parameter("column", ParamType::Text)
                .depends_on_values("column", ["a", "b"], "columns")
                .build(),
        );
        let mut compiler = GrammarCompiler::new();

        let grammar = compiler
            .parameter_value_grammar(&registry, "filter", "column")
            .unwrap();
        assert_eq!(grammar, "root ::= \"a\" | \"b\"");
    }

    #[test]
    fn test_parameter_grammar_escapes_values() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::builder("filter", noop)
                .parameter("column", ParamType::Text)
                .depends_on_values("column", ["say \"hi\"", "a\\b"], "columns")
                .build(),
        );
        let mut compiler = GrammarCompiler::new();

        let grammar = compiler
            .parameter_value_grammar(&registry, "filter", "column")
            .unwrap();
        assert_eq!(grammar, "root ::= \"say \\\"hi\\\"\" | \"a\\\\b\"");
    }

    #[test]
    fn test_parameter_grammar_invalidates_on_value_change() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::builder("filter", noop)
                .parameter("column", ParamType::Text)
                .depends_on_values("column", ["a"], "columns")
                .build(),
        );
        let mut compiler = GrammarCompiler::new();
        let first = compiler
            .parameter_value_grammar(&registry, "filter", "column")
            .unwrap();

        // Re-register with a different snapshot
        registry.register(
            ToolDescriptor::builder("filter", noop)
                .parameter("column", ParamType::Text)
                .depends_on_values("column", ["a", "b"], "columns")
                .build(),
        );
        let second = compiler
            .parameter_value_grammar(&registry, "filter", "column")
            .unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_parameter_grammar_raw_passthrough() {
        let raw = "root ::= object\nobject ::= \"{\" \"}\"";
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::builder("write_json", noop)
                .parameter("content", ParamType::Code(Some("json".into())))
                .depends_on(ParameterDependency::grammar("content", raw, "<language:json>"))
                .build(),
        );
        let mut compiler = GrammarCompiler::new();

        assert_eq!(
            compiler
                .parameter_value_grammar(&registry, "write_json", "content")
                .as_deref(),
            Some(raw)
        );
    }

    #[test]
    fn test_parameter_grammar_none_when_unconstrained() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::builder("filter", noop)
                .parameter("value", ParamType::Text)
                .build(),
        );
        let mut compiler = GrammarCompiler::new();

        assert!(compiler.parameter_value_grammar(&registry, "filter", "value").is_none());
        assert!(compiler.parameter_value_grammar(&registry, "missing", "value").is_none());
    }

    #[test]
    fn test_parameter_grammar_empty_snapshot() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::builder("filter", noop)
                .parameter("column", ParamType::Text)
                .depends_on_values("column", Vec::<String>::new(), "columns")
                .build(),
        );
        let mut compiler = GrammarCompiler::new();

        assert_eq!(
            compiler
                .parameter_value_grammar(&registry, "filter", "column")
                .as_deref(),
            Some(NO_OPTIONS_GRAMMAR)
        );
    }

    #[test]
    fn test_native_type_grammars() {
        assert_eq!(
            GrammarCompiler::native_type_grammar(&ParamType::Integer).unwrap(),
            "root ::= \"-\"? [0-9]+"
        );
        assert!(GrammarCompiler::native_type_grammar(&ParamType::Boolean).is_some());
        assert!(GrammarCompiler::native_type_grammar(&ParamType::Text).is_none());
    }

    #[test]
    fn test_tool_call_grammar_mixed_params() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolDescriptor::builder("record", noop)
                .parameter("name", ParamType::Text)
                .parameter("age", ParamType::Integer)
                .parameter("tags", ParamType::List(Box::new(ParamType::Text)))
                .depends_on_values("name", ["alice", "bob"], "names")
                .build(),
        );
        let compiler = GrammarCompiler::new();

        let grammar = compiler.tool_call_grammar(&registry, "record");
        assert!(grammar.starts_with("root ::= \"record\" \"(\""));
        assert!(grammar.contains("\"name=\" (\"alice\" | \"bob\")"));
        assert!(grammar.contains("\"age=\" (\"-\"? [0-9]+)"));
        assert!(grammar.contains("string-value ::="));
    }

    #[test]
    fn test_tool_call_grammar_no_params() {
        let registry = registry_with(&["ping"]);
        let compiler = GrammarCompiler::new();

        assert_eq!(compiler.tool_call_grammar(&registry, "ping"), "root ::= \"ping\" \"()\"");
    }

    #[test]
    fn test_tool_call_grammar_unknown_tool() {
        let registry = ToolRegistry::new();
        let compiler = GrammarCompiler::new();

        assert_eq!(compiler.tool_call_grammar(&registry, "nope"), TOOL_NOT_FOUND_GRAMMAR);
    }
}
