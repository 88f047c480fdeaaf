//! Cycle sanitization - rewriting recursive grammars for strict consumers
//!
//! Some grammar consumers cannot traverse recursive rule references. This
//! pass finds every rule that participates in a reference cycle (Tarjan's
//! strongly connected components, single pass) and rewrites it to a shared
//! `fallback` rule covering generic token shapes, leaving acyclic input
//! byte-identical.

use std::collections::{HashMap, HashSet};

const FALLBACK_RULE: &str = "fallback ::= tok-name | tok-number | tok-string";

/// Token-shape rules referenced by the fallback, appended when the
/// grammar does not already define them.
const TOKEN_RULES: [(&str, &str); 3] = [
    ("tok-name", "tok-name ::= [a-zA-Z_] [a-zA-Z0-9_]*"),
    ("tok-number", "tok-number ::= [0-9]+ (\".\" [0-9]+)?"),
    ("tok-string", "tok-string ::= [\"] [^\"]* [\"]"),
];

/// Extract rule-reference candidates from a rule's right-hand side.
///
/// A two-state scanner skips characters inside quoted literals and
/// bracketed character classes (both honoring backslash escapes);
/// remaining identifier tokens that start with a lowercase letter are
/// candidate references.
pub fn extract_refs(rhs: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut buf = String::new();
    let mut in_quote = false;
    let mut in_class = false;

    let flush = |buf: &mut String, refs: &mut Vec<String>| {
        if !buf.is_empty() {
            if buf.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
                refs.push(buf.clone());
            }
            buf.clear();
        }
    };

    let mut chars = rhs.chars();
    while let Some(c) = chars.next() {
        if in_quote {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => in_quote = false,
                _ => {}
            }
            continue;
        }
        if in_class {
            match c {
                '\\' => {
                    chars.next();
                }
                ']' => in_class = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                flush(&mut buf, &mut refs);
                in_quote = true;
            }
            '[' => {
                flush(&mut buf, &mut refs);
                in_class = true;
            }
            c if c.is_ascii_alphanumeric() || c == '-' => buf.push(c),
            _ => flush(&mut buf, &mut refs),
        }
    }
    flush(&mut buf, &mut refs);
    refs
}

struct TarjanState<'a> {
    graph: &'a HashMap<&'a str, Vec<&'a str>>,
    index: usize,
    stack: Vec<&'a str>,
    on_stack: HashSet<&'a str>,
    index_map: HashMap<&'a str, usize>,
    lowlink: HashMap<&'a str, usize>,
    cycles: HashSet<String>,
}

impl<'a> TarjanState<'a> {
    fn strongconnect(&mut self, v: &'a str) {
        self.index_map.insert(v, self.index);
        self.lowlink.insert(v, self.index);
        self.index += 1;
        self.stack.push(v);
        self.on_stack.insert(v);

        let graph = self.graph;
        for &w in graph.get(v).into_iter().flatten() {
            if !self.index_map.contains_key(w) {
                self.strongconnect(w);
                let low = self.lowlink[v].min(self.lowlink[w]);
                self.lowlink.insert(v, low);
            } else if self.on_stack.contains(w) {
                let low = self.lowlink[v].min(self.index_map[w]);
                self.lowlink.insert(v, low);
            }
        }

        if self.lowlink[v] == self.index_map[v] {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack.remove(w);
                component.push(w);
                if w == v {
                    break;
                }
            }
            if component.len() > 1 {
                self.cycles.extend(component.iter().map(|s| s.to_string()));
            } else if let [w] = component[..]
                && graph.get(w).is_some_and(|refs| refs.contains(&w))
            {
                self.cycles.insert(w.to_string());
            }
        }
    }
}

/// Rewrite every cyclic rule to the shared fallback, returning the
/// sanitized grammar plus the sorted list of flattened rule names.
///
/// Acyclic input is returned unchanged with an empty list.
pub fn sanitize_cycles(grammar_text: &str) -> (String, Vec<String>) {
    let mut rules: HashMap<&str, &str> = HashMap::new();
    for line in grammar_text.lines() {
        let Some((name, rhs)) = line.split_once("::=") else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        rules.insert(name, rhs.trim());
    }

    let refs_by_rule: HashMap<&str, Vec<String>> = rules
        .iter()
        .map(|(&name, &rhs)| (name, extract_refs(rhs)))
        .collect();
    let graph: HashMap<&str, Vec<&str>> = refs_by_rule
        .iter()
        .map(|(&name, refs)| {
            let edges = refs
                .iter()
                .filter_map(|r| rules.get_key_value(r.as_str()).map(|(&k, _)| k))
                .collect();
            (name, edges)
        })
        .collect();

    let mut state = TarjanState {
        graph: &graph,
        index: 0,
        stack: Vec::new(),
        on_stack: HashSet::new(),
        index_map: HashMap::new(),
        lowlink: HashMap::new(),
        cycles: HashSet::new(),
    };
    for &node in rules.keys() {
        if !state.index_map.contains_key(node) {
            state.strongconnect(node);
        }
    }
    let cycles = state.cycles;

    if cycles.is_empty() {
        return (grammar_text.to_string(), Vec::new());
    }

    let mut out_lines: Vec<String> = Vec::new();
    for line in grammar_text.lines() {
        if let Some((name, _rhs)) = line.split_once("::=") {
            let name = name.trim();
            if cycles.contains(name) {
                out_lines.push(format!("{} ::= fallback", name));
                continue;
            }
        }
        out_lines.push(line.to_string());
    }

    let has_rule = |rule_name: &str, lines: &[String]| {
        lines.iter().any(|l| {
            l.split_once("::=")
                .is_some_and(|(name, _)| name.trim() == rule_name)
        })
    };

    if !has_rule("fallback", &out_lines) {
        out_lines.push(FALLBACK_RULE.to_string());
    }
    for (token_name, definition) in TOKEN_RULES {
        if !has_rule(token_name, &out_lines) {
            out_lines.push(definition.to_string());
        }
    }

    let mut flattened: Vec<String> = cycles.into_iter().collect();
    flattened.sort_unstable();
    (out_lines.join("\n") + "\n", flattened)
}
