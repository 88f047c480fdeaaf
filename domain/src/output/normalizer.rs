//! Output normalization - cleaning raw generated parameter text
//!
//! Generated text arrives with markdown fences, chatty prefixes, and
//! stray quoting. The pipeline here reduces it to the bare value before
//! type coercion. Code-valued parameters go through language-aware fence
//! selection instead, where competing fenced blocks are scored and the
//! best one kept.

use std::sync::LazyLock;

use regex::Regex;

/// Everything the normalizer needs to know about the parameter whose
/// value is being cleaned.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// Parameter name (used to strip a `name:` prefix)
    pub param_name: &'a str,
    /// List/record/dict parameter - keep all fenced lines
    pub is_complex: bool,
    /// Code parameter - scored fence selection, no punctuation stripping
    pub is_code: bool,
    /// Language tag for code cleanup; defaults to `python`
    pub language: Option<&'a str>,
    /// How many times the owning tool has already been invoked this run.
    /// When one generation answers for several entities, line N belongs
    /// to invocation N.
    pub prior_invocations: usize,
}

const CHATTY_PREFIXES: [&str; 4] = ["Final Answer:", "The answer is:", "value:", "extracted:"];

static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\s*\w*\s*\n(.*?)```").expect("static fence pattern"));

/// Run the full normalization pipeline over one raw generated value.
pub fn normalize(raw: &str, ctx: &NormalizeContext) -> String {
    let mut value = raw.trim().trim_matches('"').to_string();

    if ctx.is_code {
        value = strip_chatty_prefixes(&value, ctx.param_name);
        return normalize_language_output(ctx.language.unwrap_or("python"), &value);
    }

    if value.starts_with("```") {
        value = strip_leading_fence(&value, ctx.is_complex);
    } else if !ctx.is_complex {
        value = select_entity_line(&value, ctx.prior_invocations);
    }

    value = strip_chatty_prefixes(&value, ctx.param_name);

    value
        .trim()
        .trim_matches(|c| "\"'`.:".contains(c))
        .trim()
        .to_string()
}

fn strip_chatty_prefixes(value: &str, param_name: &str) -> String {
    let mut value = value.to_string();
    for prefix in CHATTY_PREFIXES {
        value = strip_prefix_ci(&value, prefix);
    }
    strip_prefix_ci(&value, &format!("{}:", param_name))
}

/// Remove an opening fence line and a matching closing fence. Complex
/// values keep every inner line; simple values keep only the first.
fn strip_leading_fence(value: &str, keep_all_lines: bool) -> String {
    let lines: Vec<&str> = value.split('\n').collect();
    if lines.len() <= 1 {
        return value.replace("```", "").trim().to_string();
    }

    let mut inner = &lines[1..];
    if let [rest @ .., last] = inner
        && last.trim().starts_with("```")
    {
        inner = rest;
    }

    if keep_all_lines {
        inner.join("\n").trim().to_string()
    } else {
        inner.first().map(|l| l.trim()).unwrap_or("").to_string()
    }
}

/// For simple values spanning multiple lines, pick the line belonging to
/// the current invocation (clamped to the last line).
fn select_entity_line(value: &str, prior_invocations: usize) -> String {
    let lines: Vec<&str> = value
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return value.trim().to_string();
    }
    let index = prior_invocations.min(lines.len() - 1);
    lines[index].to_string()
}

fn strip_prefix_ci(value: &str, prefix: &str) -> String {
    match value.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => {
            value[prefix.len()..].trim().to_string()
        }
        _ => value.to_string(),
    }
}

/// Score a fenced block for how likely it is to be the intended output.
/// Blocks that merely redefine the tool's own wrapper score poorly.
fn score_block(block: &str) -> i32 {
    let text = block.trim();
    if text.is_empty() {
        return -100;
    }
    let mut score = 0;
    if text.contains("RESULT") {
        score += 10;
    }
    if text.contains('=') {
        score += 4;
    }
    if text.contains("print(") {
        score += 2;
    }
    if text.contains("def run_python") {
        score -= 8;
    }
    if text.contains('{') && text.contains('}') {
        score += 1;
    }
    score
}

/// Language-specific cleanup for code-valued parameters: prefer fenced
/// blocks tagged with the language, fall back to any fence, keep the
/// best-scoring block, and drop a bare leading language-name line.
pub fn normalize_language_output(language: &str, value: &str) -> String {
    let mut normalized = value.trim().to_string();

    if normalized.contains("```") {
        let tagged = Regex::new(&format!(
            r"(?si)```\s*{}\s*\n(.*?)```",
            regex::escape(language)
        ))
        .expect("escaped language pattern");

        let mut blocks: Vec<String> = tagged
            .captures_iter(&normalized)
            .map(|c| c[1].to_string())
            .collect();
        if blocks.is_empty() {
            blocks = ANY_FENCE
                .captures_iter(&normalized)
                .map(|c| c[1].to_string())
                .collect();
        }

        // First block wins ties
        let mut best: Option<(i32, String)> = None;
        for block in blocks {
            let score = score_block(&block);
            if best.as_ref().is_none_or(|(top, _)| score > *top) {
                best = Some((score, block));
            }
        }
        if let Some((_, block)) = best {
            normalized = block.trim().to_string();
        }
    }

    let lines: Vec<&str> = normalized.lines().collect();
    if let Some(first) = lines.first()
        && first.trim().eq_ignore_ascii_case(language)
        && lines.len() > 1
    {
        normalized = lines[1..].join("\n").trim().to_string();
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_ctx<'a>(param_name: &'a str) -> NormalizeContext<'a> {
        NormalizeContext {
            param_name,
            is_complex: false,
            is_code: false,
            language: None,
            prior_invocations: 0,
        }
    }

    #[test]
    fn test_trims_whitespace_and_quotes() {
        assert_eq!(normalize("  \"Alice\"  ", &simple_ctx("name")), "Alice");
    }

    #[test]
    fn test_strips_chatty_prefixes() {
        assert_eq!(normalize("Final Answer: 42", &simple_ctx("age")), "42");
        assert_eq!(normalize("the answer is: blue", &simple_ctx("color")), "blue");
        assert_eq!(normalize("age: 30", &simple_ctx("age")), "30");
    }

    #[test]
    fn test_fenced_simple_value_takes_first_line() {
        let raw = "```\n42\nextra\n```";
        assert_eq!(normalize(raw, &simple_ctx("age")), "42");
    }

    #[test]
    fn test_fenced_complex_value_keeps_body() {
        let ctx = NormalizeContext {
            is_complex: true,
            ..simple_ctx("items")
        };
        let raw = "```json\n[\"a\",\n \"b\"]\n```";
        assert_eq!(normalize(raw, &ctx), "[\"a\",\n \"b\"]");
    }

    #[test]
    fn test_multi_line_selects_invocation_line() {
        let raw = "Alice\nBob\nCarol";
        let mut ctx = simple_ctx("name");
        assert_eq!(normalize(raw, &ctx), "Alice");

        ctx.prior_invocations = 1;
        assert_eq!(normalize(raw, &ctx), "Bob");

        // Clamped to the last line when out of range
        ctx.prior_invocations = 9;
        assert_eq!(normalize(raw, &ctx), "Carol");
    }

    #[test]
    fn test_residual_punctuation_stripped() {
        assert_eq!(normalize("'blue'.", &simple_ctx("color")), "blue");
        assert_eq!(normalize("`42`:", &simple_ctx("age")), "42");
    }

    #[test]
    fn test_code_block_scoring_prefers_result_assignment() {
        let ctx = NormalizeContext {
            is_code: true,
            language: Some("python"),
            ..simple_ctx("code")
        };
        let raw = concat!(
            "Here is the code:\n",
            "```python\ndef run_python(code):\n    pass\n```\n",
            "```python\nRESULT = 1 + 2\nprint(RESULT)\n```\n",
        );
        assert_eq!(normalize(raw, &ctx), "RESULT = 1 + 2\nprint(RESULT)");
    }

    #[test]
    fn test_code_keeps_trailing_colon() {
        // Punctuation stripping must not mangle code
        let ctx = NormalizeContext {
            is_code: true,
            language: Some("python"),
            ..simple_ctx("code")
        };
        assert_eq!(normalize("for x in xs:", &ctx), "for x in xs:");
    }

    #[test]
    fn test_code_falls_back_to_untagged_fence() {
        let out = normalize_language_output("python", "```\nx = 1\n```");
        assert_eq!(out, "x = 1");
    }

    #[test]
    fn test_code_drops_leading_language_line() {
        let out = normalize_language_output("python", "python\nx = 1");
        assert_eq!(out, "x = 1");
    }
}
