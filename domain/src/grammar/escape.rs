//! Escaping of literal values for embedding in GBNF grammar text

/// Escape a literal for use inside a double-quoted GBNF terminal.
///
/// The replacement order is fixed: backslash first, then double-quote,
/// newline, carriage return, tab. Backslash must come first so the
/// escapes it introduces are not re-escaped.
pub fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Inverse of [`escape_literal`]: decode the escape sequences it emits.
///
/// Unknown escape sequences are kept verbatim (backslash included), so
/// unescaping text that was never escaped is lossless.
pub fn unescape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_order_is_fixed() {
        // A backslash followed by a quote must not double-escape
        assert_eq!(escape_literal("\\\""), "\\\\\\\"");
        assert_eq!(escape_literal("line\nbreak"), "line\\nbreak");
        assert_eq!(escape_literal("tab\there"), "tab\\there");
    }

    #[test]
    fn test_roundtrip() {
        let cases = [
            "plain",
            "with \"quotes\"",
            "back\\slash",
            "multi\nline\r\n",
            "mix \\\" of \t everything\n",
        ];
        for case in cases {
            assert_eq!(unescape_literal(&escape_literal(case)), case, "case: {case:?}");
        }
    }

    #[test]
    fn test_unescape_keeps_unknown_sequences() {
        assert_eq!(unescape_literal("\\d+"), "\\d+");
        assert_eq!(unescape_literal("trailing\\"), "trailing\\");
    }
}
