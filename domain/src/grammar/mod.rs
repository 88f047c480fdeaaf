//! Grammar compilation: GBNF generation, literal escaping, and cycle
//! sanitization

pub mod compiler;
pub mod escape;
pub mod sanitizer;

pub use compiler::{
    GrammarCompiler, NO_OPTIONS_GRAMMAR, NO_TOOLS_GRAMMAR, NONE_SENTINEL, TOOL_NOT_FOUND_GRAMMAR,
};
pub use escape::{escape_literal, unescape_literal};
pub use sanitizer::{extract_refs, sanitize_cycles};
