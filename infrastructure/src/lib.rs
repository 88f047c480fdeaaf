//! Infrastructure layer for gramcall
//!
//! Adapters for the application ports: the llama.cpp completion backend,
//! grammar-source resolution (files and bundled languages), the file
//! trace sink, configuration loading, and the batch grammar validator.

pub mod backend;
pub mod config;
pub mod grammar_source;
pub mod trace;
pub mod validator;

// Re-export commonly used types
pub use backend::LlamaCppBackend;
pub use config::{ConfigLoader, FileConfig};
pub use grammar_source::{
    file_dependency, language_dependency, language_grammar, load_grammar_file,
    GrammarResolutionError,
};
pub use trace::FileTraceSink;
pub use validator::{run_validation, ValidationError, ValidationOptions, ValidationOutcome};
