//! Parameter dependencies - runtime constraints on tool parameter values
//!
//! A dependency ties one tool parameter to either a finite snapshot of
//! legal values ([`DependencyKind::Enumerated`]) or a raw GBNF grammar
//! ([`DependencyKind::Grammar`]). Dependencies may be declared before the
//! owning tool registers; the registry buffers them until then.

use serde::{Deserialize, Serialize};

/// Provenance prefix used for dependencies resolved from a bundled
/// language grammar (e.g. `<language:json>`).
///
/// The orchestrator uses this marker to skip grammar enforcement for
/// code-valued parameters, where language grammars are too permissive
/// for long outputs and strict prompting works better.
pub const LANGUAGE_PROVENANCE_PREFIX: &str = "<language:";

/// The constraint payload of a parameter dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DependencyKind {
    /// A finite snapshot of legal values, taken at declaration time.
    Enumerated(Vec<String>),
    /// Raw GBNF grammar text, passed to the backend unchanged.
    Grammar(String),
}

/// A declared constraint on a single tool parameter.
///
/// Every dependency carries an explicit provenance label naming where the
/// constraint came from (a variable name, a file path, a language tag).
/// The label is required at declaration time and appears in logs and
/// traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDependency {
    /// Name of the parameter this dependency constrains
    pub param_name: String,
    /// The constraint payload
    pub kind: DependencyKind,
    /// Where the constraint came from, for logging and traces
    pub provenance: String,
}

impl ParameterDependency {
    /// Declare an enumerated dependency, snapshotting the values now.
    pub fn enumerated<I, S>(
        param_name: impl Into<String>,
        values: I,
        provenance: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            param_name: param_name.into(),
            kind: DependencyKind::Enumerated(values.into_iter().map(Into::into).collect()),
            provenance: provenance.into(),
        }
    }

    /// Declare a raw-grammar dependency.
    pub fn grammar(
        param_name: impl Into<String>,
        grammar_text: impl Into<String>,
        provenance: impl Into<String>,
    ) -> Self {
        Self {
            param_name: param_name.into(),
            kind: DependencyKind::Grammar(grammar_text.into()),
            provenance: provenance.into(),
        }
    }

    /// The enumerated values, if this is an enumerated dependency.
    pub fn values(&self) -> Option<&[String]> {
        match &self.kind {
            DependencyKind::Enumerated(values) => Some(values),
            DependencyKind::Grammar(_) => None,
        }
    }

    /// The grammar text, if this is a grammar dependency.
    pub fn grammar_text(&self) -> Option<&str> {
        match &self.kind {
            DependencyKind::Grammar(text) => Some(text),
            DependencyKind::Enumerated(_) => None,
        }
    }

    /// Whether this dependency was resolved from a bundled language grammar.
    pub fn is_language_grammar(&self) -> bool {
        matches!(self.kind, DependencyKind::Grammar(_))
            && self.provenance.starts_with(LANGUAGE_PROVENANCE_PREFIX)
    }

    /// The language tag for a language-grammar dependency (`json` from
    /// `<language:json>`).
    pub fn language_tag(&self) -> Option<&str> {
        if !self.is_language_grammar() {
            return None;
        }
        self.provenance
            .strip_prefix(LANGUAGE_PROVENANCE_PREFIX)
            .and_then(|rest| rest.strip_suffix('>'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerated_snapshot() {
        let dep = ParameterDependency::enumerated("column", ["a", "b", "c"], "columns");
        assert_eq!(dep.values(), Some(&["a".to_string(), "b".into(), "c".into()][..]));
        assert!(dep.grammar_text().is_none());
        assert_eq!(dep.provenance, "columns");
    }

    #[test]
    fn test_grammar_dependency() {
        let dep = ParameterDependency::grammar("content", "root ::= \"x\"", "<custom grammar>");
        assert_eq!(dep.grammar_text(), Some("root ::= \"x\""));
        assert!(dep.values().is_none());
        assert!(!dep.is_language_grammar());
    }

    #[test]
    fn test_language_tag() {
        let dep = ParameterDependency::grammar("code", "root ::= \"x\"", "<language:json>");
        assert!(dep.is_language_grammar());
        assert_eq!(dep.language_tag(), Some("json"));

        let plain = ParameterDependency::grammar("code", "root ::= \"x\"", "a/file.gbnf");
        assert_eq!(plain.language_tag(), None);
    }
}
