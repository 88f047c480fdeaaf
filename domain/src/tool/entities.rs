//! Tool descriptors - names, typed parameters, and dependencies
//!
//! A [`ToolDescriptor`] is assembled with [`ToolBuilder`] before a single
//! registration call, so a tool's parameters and dependencies travel
//! together instead of being reflected at call time.

use std::sync::Arc;

use super::dependency::ParameterDependency;
use super::handler::ToolHandler;

/// Explicit field schema for a structured-record parameter type.
///
/// Field order is preserved; it drives the example structure shown to the
/// backend during extraction and the field-by-field coercion of decoded
/// objects.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSchema {
    fields: Vec<(String, ParamType)>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.fields.push((name.into(), param_type));
        self
    }

    pub fn fields(&self) -> &[(String, ParamType)] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn field_type(&self, name: &str) -> Option<&ParamType> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }
}

/// Declared type tag for a tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Integer,
    Float,
    Boolean,
    /// Free-form text (the default)
    Text,
    /// Executable source code, optionally tagged with a language name.
    ///
    /// Code parameters skip enum/array extraction heuristics and get
    /// free-form generation plus language fence stripping.
    Code(Option<String>),
    /// A homogeneous list with a declared element type
    List(Box<ParamType>),
    /// A structured record with an explicit field schema
    Record(RecordSchema),
    /// A JSON object with no declared schema
    Dict,
}

impl ParamType {
    /// List, record and dict values need JSON-shaped extraction prompts
    /// and larger token budgets.
    pub fn is_complex(&self) -> bool {
        matches!(self, ParamType::List(_) | ParamType::Record(_) | ParamType::Dict)
    }

    pub fn is_code(&self) -> bool {
        matches!(self, ParamType::Code(_))
    }

    /// The language tag of a code parameter, when declared.
    pub fn code_language(&self) -> Option<&str> {
        match self {
            ParamType::Code(Some(language)) => Some(language.as_str()),
            _ => None,
        }
    }
}

/// A tool parameter: name plus declared type tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub param_type: ParamType,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
        }
    }
}

/// A registered tool: unique name, invocable handler, ordered typed
/// parameters, description, and parameter dependencies.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub dependencies: Vec<ParameterDependency>,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// Start building a descriptor around a handler.
    pub fn builder<H>(name: impl Into<String>, handler: H) -> ToolBuilder
    where
        H: ToolHandler + 'static,
    {
        ToolBuilder {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            dependencies: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    /// Dependency for a parameter, if one was declared.
    pub fn dependency_for(&self, param_name: &str) -> Option<&ParameterDependency> {
        self.dependencies
            .iter()
            .find(|dep| dep.param_name == param_name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Builder that assembles a complete descriptor (parameters and
/// dependencies included) before a single registration call.
pub struct ToolBuilder {
    name: String,
    description: String,
    parameters: Vec<ParameterDescriptor>,
    dependencies: Vec<ParameterDependency>,
    handler: Arc<dyn ToolHandler>,
}

impl ToolBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.parameters.push(ParameterDescriptor::new(name, param_type));
        self
    }

    /// Constrain a parameter to a finite value set, snapshotting the
    /// values now. The provenance label names the source for logs.
    pub fn depends_on_values<I, S>(
        mut self,
        param_name: impl Into<String>,
        values: I,
        provenance: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .push(ParameterDependency::enumerated(param_name, values, provenance));
        self
    }

    /// Constrain a parameter with raw GBNF grammar text.
    pub fn depends_on_grammar(
        mut self,
        param_name: impl Into<String>,
        grammar_text: impl Into<String>,
        provenance: impl Into<String>,
    ) -> Self {
        self.dependencies
            .push(ParameterDependency::grammar(param_name, grammar_text, provenance));
        self
    }

    /// Attach an already-built dependency.
    pub fn depends_on(mut self, dependency: ParameterDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn build(self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
            dependencies: self.dependencies,
            handler: self.handler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::handler::{ToolArgs, ToolError};

    fn noop(_args: &ToolArgs) -> Result<String, ToolError> {
        Ok("ok".to_string())
    }

    #[test]
    fn test_builder_assembles_descriptor() {
        let tool = ToolDescriptor::builder("filter", noop)
            .description("Filter rows by column value")
            .parameter("column", ParamType::Text)
            .parameter("value", ParamType::Text)
            .depends_on_values("column", ["a", "b", "c"], "columns")
            .build();

        assert_eq!(tool.name, "filter");
        assert_eq!(tool.parameters.len(), 2);
        assert_eq!(tool.parameters[0].name, "column");
        assert!(tool.dependency_for("column").is_some());
        assert!(tool.dependency_for("value").is_none());
    }

    #[test]
    fn test_record_schema_lookup() {
        let schema = RecordSchema::new()
            .field("name", ParamType::Text)
            .field("dosage", ParamType::Integer);

        assert_eq!(schema.field_type("dosage"), Some(&ParamType::Integer));
        assert_eq!(schema.field_type("missing"), None);
        let names: Vec<&str> = schema.field_names().collect();
        assert_eq!(names, vec!["name", "dosage"]);
    }

    #[test]
    fn test_param_type_classification() {
        assert!(ParamType::List(Box::new(ParamType::Text)).is_complex());
        assert!(ParamType::Dict.is_complex());
        assert!(!ParamType::Integer.is_complex());
        assert!(ParamType::Code(None).is_code());
        assert_eq!(
            ParamType::Code(Some("python".into())).code_language(),
            Some("python")
        );
    }
}
