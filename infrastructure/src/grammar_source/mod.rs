//! Grammar sources - resolving dependency grammars at declaration time
//!
//! A grammar dependency can be declared from raw text, a `.gbnf` file on
//! disk, or a recognized language tag resolved against grammars bundled
//! with the crate. File and language resolution fail immediately at
//! declaration time - a missing grammar is a configuration error, never
//! deferred to run time.

use std::path::{Path, PathBuf};

use gramcall_domain::tool::{ParameterDependency, LANGUAGE_PROVENANCE_PREFIX};
use thiserror::Error;
use tracing::debug;

/// Grammars bundled with the crate, keyed by language tag.
const BUNDLED_GRAMMARS: [(&str, &str); 1] = [("json", include_str!("../../grammars/json.gbnf"))];

/// Declaration-time grammar resolution failures. Always fatal.
#[derive(Error, Debug)]
pub enum GrammarResolutionError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Grammar file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read grammar file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Load grammar text from a `.gbnf` file, failing if it is absent.
pub fn load_grammar_file(path: impl AsRef<Path>) -> Result<String, GrammarResolutionError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(GrammarResolutionError::FileNotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| GrammarResolutionError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve a language tag to its bundled grammar text.
pub fn language_grammar(tag: &str) -> Result<&'static str, GrammarResolutionError> {
    let key = tag.trim().to_lowercase();
    BUNDLED_GRAMMARS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, text)| *text)
        .ok_or_else(|| GrammarResolutionError::UnsupportedLanguage(tag.to_string()))
}

/// Declare a grammar dependency from a `.gbnf` file. The file path
/// becomes the provenance label.
pub fn file_dependency(
    param_name: impl Into<String>,
    path: impl AsRef<Path>,
) -> Result<ParameterDependency, GrammarResolutionError> {
    let path = path.as_ref();
    let text = load_grammar_file(path)?;
    debug!(path = %path.display(), bytes = text.len(), "Loaded grammar file dependency");
    Ok(ParameterDependency::grammar(
        param_name,
        text,
        path.display().to_string(),
    ))
}

/// Declare a grammar dependency from a bundled language tag. The
/// provenance label is `<language:tag>`, which the orchestrator uses to
/// relax grammar enforcement for code parameters.
pub fn language_dependency(
    param_name: impl Into<String>,
    tag: &str,
) -> Result<ParameterDependency, GrammarResolutionError> {
    let text = language_grammar(tag)?;
    let key = tag.trim().to_lowercase();
    debug!(language = %key, bytes = text.len(), "Loaded bundled language grammar");
    Ok(ParameterDependency::grammar(
        param_name,
        text,
        format!("{}{}>", LANGUAGE_PROVENANCE_PREFIX, key),
    ))
}
