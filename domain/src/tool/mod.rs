//! Tool domain: descriptors, handlers, dependencies, and the registry

pub mod dependency;
pub mod entities;
pub mod handler;
pub mod registry;

pub use dependency::{DependencyKind, ParameterDependency, LANGUAGE_PROVENANCE_PREFIX};
pub use entities::{ParamType, ParameterDescriptor, RecordSchema, ToolBuilder, ToolDescriptor};
pub use handler::{ToolArgs, ToolError, ToolHandler};
pub use registry::ToolRegistry;
