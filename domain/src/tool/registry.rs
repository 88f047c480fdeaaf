//! Tool registry - store of tool descriptors and parameter dependencies
//!
//! The registry is an explicit instance passed to orchestration and
//! registration calls; there is no process-wide singleton. Dependencies
//! may be declared before their tool registers - they are buffered and
//! merged into the descriptor, in declaration order, at the moment the
//! tool appears.

use std::collections::HashMap;

use super::dependency::ParameterDependency;
use super::entities::ToolDescriptor;

/// Registry mapping tool name to descriptor, insertion order preserved.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    /// Dependencies declared for tools that have not registered yet,
    /// keyed by tool name, in declaration order.
    pending: HashMap<String, Vec<ParameterDependency>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            pending: HashMap::new(),
        }
    }

    /// Register a tool, replacing any prior descriptor with the same name
    /// (the original insertion position is kept). Any dependencies
    /// buffered for this name are merged into the descriptor in
    /// declaration order.
    pub fn register(&mut self, mut descriptor: ToolDescriptor) {
        if let Some(buffered) = self.pending.remove(&descriptor.name) {
            descriptor.dependencies.extend(buffered);
        }

        match self.tools.iter_mut().find(|t| t.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => self.tools.push(descriptor),
        }
    }

    /// Attach a dependency to a registered tool, or buffer it if the tool
    /// has not registered yet. Buffered dependencies are never lost while
    /// the registry lives; a dependency whose tool never registers stays
    /// pending and unused (see [`pending_tools`](Self::pending_tools)).
    pub fn add_dependency(&mut self, tool_name: &str, dependency: ParameterDependency) {
        match self.tools.iter_mut().find(|t| t.name == tool_name) {
            Some(tool) => tool.dependencies.push(dependency),
            None => self
                .pending
                .entry(tool_name.to_string())
                .or_default()
                .push(dependency),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Snapshot copy of all registered descriptors, in insertion order.
    pub fn all(&self) -> Vec<ToolDescriptor> {
        self.tools.clone()
    }

    /// Registered tool names in sorted order (the enumeration order used
    /// by grammar compilation).
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Iterate descriptors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names that have buffered dependencies but no registered
    /// descriptor, sorted. Useful for spotting dependencies declared for
    /// a tool that never registers.
    pub fn pending_tools(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pending.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Remove all tools and pending dependencies (test isolation).
    pub fn clear(&mut self) {
        self.tools.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::{ParamType, ToolDescriptor};
    use crate::tool::handler::{ToolArgs, ToolError};

    fn noop(_args: &ToolArgs) -> Result<String, ToolError> {
        Ok("ok".to_string())
    }

    fn simple_tool(name: &str) -> ToolDescriptor {
        ToolDescriptor::builder(name, noop)
            .parameter("value", ParamType::Text)
            .build()
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(simple_tool("filter"));

        assert!(registry.get("filter").is_some());
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(simple_tool("a"));
        registry.register(simple_tool("b"));

        let replacement = ToolDescriptor::builder("a", noop)
            .description("replaced")
            .build();
        registry.register(replacement);

        let order: Vec<&str> = registry.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().description, "replaced");
    }

    #[test]
    fn test_pending_dependency_merged_on_register() {
        let mut registry = ToolRegistry::new();
        registry.add_dependency(
            "filter",
            ParameterDependency::enumerated("column", ["a", "b"], "columns"),
        );
        registry.add_dependency(
            "filter",
            ParameterDependency::enumerated("value", ["x"], "values"),
        );
        assert_eq!(registry.pending_tools(), vec!["filter"]);

        registry.register(simple_tool("filter"));

        let tool = registry.get("filter").unwrap();
        assert_eq!(tool.dependencies.len(), 2);
        // Declaration order preserved
        assert_eq!(tool.dependencies[0].param_name, "column");
        assert_eq!(tool.dependencies[1].param_name, "value");
        assert!(registry.pending_tools().is_empty());
    }

    #[test]
    fn test_dependency_attaches_to_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(simple_tool("filter"));
        registry.add_dependency(
            "filter",
            ParameterDependency::enumerated("value", ["x"], "values"),
        );

        assert_eq!(registry.get("filter").unwrap().dependencies.len(), 1);
    }

    #[test]
    fn test_permanently_pending_is_observable() {
        let mut registry = ToolRegistry::new();
        registry.add_dependency(
            "never_registered",
            ParameterDependency::enumerated("x", ["1"], "xs"),
        );

        assert_eq!(registry.pending_tools(), vec!["never_registered"]);
    }

    #[test]
    fn test_clear() {
        let mut registry = ToolRegistry::new();
        registry.register(simple_tool("filter"));
        registry.add_dependency(
            "later",
            ParameterDependency::enumerated("x", ["1"], "xs"),
        );

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.pending_tools().is_empty());
    }

    #[test]
    fn test_sorted_names() {
        let mut registry = ToolRegistry::new();
        registry.register(simple_tool("zeta"));
        registry.register(simple_tool("alpha"));

        assert_eq!(registry.sorted_names(), vec!["alpha", "zeta"]);
    }
}
