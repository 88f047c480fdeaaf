//! Batch grammar validation against a source corpus
//!
//! Walks a directory of source files, sanitizes the grammar's recursive
//! rules, and runs an external GBNF validator binary over every file,
//! reporting an approval percentage. The validator binary is discovered
//! on PATH and its flag spellings probed from its help text, since the
//! llama.cpp validators have shipped several CLI shapes.

use std::path::{Path, PathBuf};
use std::process::Command;

use glob::glob;
use gramcall_domain::grammar::sanitize_cycles;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_VALIDATORS: [&str; 3] =
    ["llama-gbnf-validator", "gbnf-validator", "test-gbnf-validator"];

const SKIP_DIR_NAMES: [&str; 8] = [
    ".git",
    ".venv",
    "venv",
    "__pycache__",
    "node_modules",
    "dist",
    "build",
    "target",
];

/// How many failing files to keep verbatim in the outcome.
const MAX_FAILURE_SAMPLES: usize = 5;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Grammar not found: {0}")]
    GrammarNotFound(PathBuf),

    #[error(
        "No GBNF validator found on PATH. Build one from llama.cpp or pass an explicit binary."
    )]
    NoValidator,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad corpus pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Options for one validation sweep.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub grammar_path: PathBuf,
    pub base_path: PathBuf,
    /// Root rule name passed to validators that accept one
    pub root_rule: String,
    /// Explicit validator binary; discovered on PATH when absent
    pub validator: Option<String>,
    /// File extension of the corpus (e.g. `py`)
    pub extension: String,
    /// Limit on files checked; zero means no limit
    pub limit: usize,
    pub sanitize: bool,
}

impl ValidationOptions {
    pub fn new(grammar_path: impl Into<PathBuf>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            grammar_path: grammar_path.into(),
            base_path: base_path.into(),
            root_rule: "root".to_string(),
            validator: None,
            extension: "py".to_string(),
            limit: 0,
            sanitize: true,
        }
    }
}

/// Result of a validation sweep.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub approved: usize,
    pub total: usize,
    /// Rules flattened by cycle sanitization, sorted
    pub sanitized_rules: Vec<String>,
    /// Up to [`MAX_FAILURE_SAMPLES`] failing files with first error line
    pub failures: Vec<(PathBuf, String)>,
}

impl ValidationOutcome {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.approved as f64 / self.total as f64) * 100.0
    }

    pub fn all_approved(&self) -> bool {
        self.approved == self.total
    }
}

/// Find a validator binary: the explicit one, or the first known name on
/// PATH.
pub fn find_validator(explicit: Option<&str>) -> Option<String> {
    if let Some(binary) = explicit {
        return Some(binary.to_string());
    }
    DEFAULT_VALIDATORS
        .iter()
        .find_map(|name| which::which(name).ok())
        .map(|path| path.display().to_string())
}

fn read_help_text(binary: &str) -> String {
    Command::new(binary)
        .arg("--help")
        .output()
        .map(|output| {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            text
        })
        .unwrap_or_default()
}

fn pick_flag<'a>(help_text: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().find(|flag| help_text.contains(**flag)).copied()
}

/// Assemble the validator command line by probing its help text for the
/// flag spellings it understands.
fn build_validator_command(
    binary: &str,
    grammar_path: &Path,
    root_rule: &str,
    input_path: &Path,
) -> Command {
    let help_text = read_help_text(binary);
    let mut command = Command::new(binary);

    // Positional form: validator <grammar_filename> <input_filename>
    if help_text.contains("<grammar_filename>") && help_text.contains("<input_filename>") {
        command.arg(grammar_path).arg(input_path);
        return command;
    }

    let grammar_flag =
        pick_flag(&help_text, &["--grammar", "--grammar-file", "-g"]).unwrap_or("-g");
    command.arg(grammar_flag).arg(grammar_path);

    if let Some(root_flag) = pick_flag(&help_text, &["--root", "-r"]) {
        command.arg(root_flag).arg(root_rule);
    }
    match pick_flag(&help_text, &["--file", "-f", "--input", "-i"]) {
        Some(file_flag) => {
            command.arg(file_flag).arg(input_path);
        }
        None => {
            command.arg(input_path);
        }
    }
    command
}

/// Corpus files under the base directory, skipping build and VCS trees.
fn corpus_files(base: &Path, extension: &str) -> Result<Vec<PathBuf>, ValidationError> {
    let pattern = format!("{}/**/*.{}", base.display(), extension);
    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        let Ok(path) = entry else { continue };
        let skipped = path.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| SKIP_DIR_NAMES.contains(&name))
        });
        if !skipped {
            files.push(path);
        }
    }
    Ok(files)
}

fn validate_file(
    binary: &str,
    grammar_path: &Path,
    root_rule: &str,
    file_path: &Path,
) -> (bool, String) {
    let output = build_validator_command(binary, grammar_path, root_rule, file_path).output();
    match output {
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            (output.status.success(), text.trim().to_string())
        }
        Err(e) => (false, e.to_string()),
    }
}

/// Run one validation sweep.
pub fn run_validation(options: &ValidationOptions) -> Result<ValidationOutcome, ValidationError> {
    if !options.grammar_path.is_file() {
        return Err(ValidationError::GrammarNotFound(
            options.grammar_path.clone(),
        ));
    }
    let binary =
        find_validator(options.validator.as_deref()).ok_or(ValidationError::NoValidator)?;

    let mut files = corpus_files(&options.base_path, &options.extension)?;
    if options.limit > 0 {
        files.truncate(options.limit);
    }

    let grammar_text = std::fs::read_to_string(&options.grammar_path)?;
    let (grammar_text, sanitized_rules) = if options.sanitize {
        sanitize_cycles(&grammar_text)
    } else {
        (grammar_text, Vec::new())
    };
    if !sanitized_rules.is_empty() {
        info!(
            count = sanitized_rules.len(),
            "Sanitized cyclic rules for validator compatibility"
        );
    }

    // Hand the validator the sanitized text through a temp file; the
    // original grammar file is never touched.
    let sanitized_file;
    let grammar_for_validation: &Path = if sanitized_rules.is_empty() {
        &options.grammar_path
    } else {
        let mut temp = tempfile::NamedTempFile::new()?;
        std::io::Write::write_all(&mut temp, grammar_text.as_bytes())?;
        sanitized_file = temp;
        sanitized_file.path()
    };

    let mut approved = 0;
    let mut failures = Vec::new();
    for path in &files {
        let (ok, output) = validate_file(
            &binary,
            grammar_for_validation,
            &options.root_rule,
            path,
        );
        if ok {
            approved += 1;
        } else {
            debug!(file = %path.display(), "Validation failed");
            if failures.len() < MAX_FAILURE_SAMPLES {
                let first_line = output.lines().next().unwrap_or("").to_string();
                failures.push((path.clone(), first_line));
            }
        }
    }

    Ok(ValidationOutcome {
        approved,
        total: files.len(),
        sanitized_rules,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_walk_skips_build_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("src/keep.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/skip.py"), "y = 2\n").unwrap();

        let files = corpus_files(dir.path(), "py").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/keep.py"));
    }

    #[test]
    fn test_pick_flag_prefers_first_match() {
        let help = "usage: validator --grammar FILE --root RULE";
        assert_eq!(pick_flag(help, &["--grammar", "-g"]), Some("--grammar"));
        assert_eq!(pick_flag(help, &["--file", "-f"]), None);
    }

    #[test]
    fn test_outcome_percent() {
        let outcome = ValidationOutcome {
            approved: 3,
            total: 4,
            sanitized_rules: Vec::new(),
            failures: Vec::new(),
        };
        assert!((outcome.percent() - 75.0).abs() < f64::EPSILON);
        assert!(!outcome.all_approved());

        let empty = ValidationOutcome {
            approved: 0,
            total: 0,
            sanitized_rules: Vec::new(),
            failures: Vec::new(),
        };
        assert_eq!(empty.percent(), 0.0);
    }

    #[test]
    fn test_missing_grammar_is_an_error() {
        let options = ValidationOptions::new("/no/such/grammar.gbnf", ".");
        assert!(matches!(
            run_validation(&options),
            Err(ValidationError::GrammarNotFound(_))
        ));
    }
}
