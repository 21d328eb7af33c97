//! Tolerant, block-level CSS parsing.
//!
//! The pipeline only needs to reason about the top-level shape of a
//! stylesheet: which nodes are at-rules, what a rule's selector list is,
//! and the raw declaration text of each block. A forgiving scanner is
//! deliberately used instead of a spec-complete parser: malformed
//! fragments are preserved verbatim as [`CssNode::Raw`] so a broken
//! rule never aborts a build or swallows its neighbors.
//!
//! The scanner is quote- and comment-aware, so `content: "}"` and
//! `/* { */` do not confuse block matching.

/// One top-level (or at-rule-nested) stylesheet node.
#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    /// A style rule: comma-joined selector list plus raw declaration text.
    Rule { selectors: String, body: String },
    /// A block at-rule (`@media`, `@font-face`, ...).
    AtRule {
        name: String,
        params: String,
        body: AtRuleBody,
    },
    /// A statement at-rule terminated by `;` (`@charset`, `@import`).
    AtStatement { name: String, params: String },
    /// A comment, delimiters included.
    Comment(String),
    /// An unparsable fragment, preserved verbatim.
    Raw(String),
}

/// Body of a block at-rule.
#[derive(Debug, Clone, PartialEq)]
pub enum AtRuleBody {
    /// Nested nodes (`@media`, `@supports`, `@keyframes`).
    Nodes(Vec<CssNode>),
    /// Plain declaration text (`@font-face`, `@page`).
    Declarations(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CssDocument {
    pub nodes: Vec<CssNode>,
}

impl CssDocument {
    /// Parse CSS text. Never fails; unparsable trailing or stray
    /// fragments become [`CssNode::Raw`] nodes.
    pub fn parse(css: &str) -> Self {
        Self {
            nodes: parse_nodes(css),
        }
    }

    /// Serialize back to readable CSS.
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        write_nodes(&mut out, &self.nodes, 0, false);
        out.trim_end().to_string()
    }

    /// Serialize to compact CSS: comments dropped, whitespace collapsed.
    pub fn to_css_compact(&self) -> String {
        let mut out = String::new();
        write_nodes(&mut out, &self.nodes, 0, true);
        out.trim_end().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn parse_nodes(input: &str) -> Vec<CssNode> {
    let bytes = input.as_bytes();
    let mut nodes = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        pos += leading_ws(&input[pos..]);
        if pos >= bytes.len() {
            break;
        }
        let rest = &input[pos..];

        if rest.starts_with("/*") {
            let end = rest.find("*/").map(|i| i + 2).unwrap_or(rest.len());
            nodes.push(CssNode::Comment(rest[..end].to_string()));
            pos += end;
            continue;
        }

        if rest.starts_with('@') {
            let (node, consumed) = parse_at_rule(rest);
            nodes.push(node);
            pos += consumed;
            continue;
        }

        // A style rule: selector text up to `{`, then a balanced block.
        match scan_to_block(rest) {
            Some((prelude_end, open)) if open => {
                let selectors = rest[..prelude_end].trim().to_string();
                let close = matching_brace(rest, prelude_end);
                let body = rest[prelude_end + 1..close].trim().to_string();
                nodes.push(CssNode::Rule { selectors, body });
                pos += (close + 1).min(rest.len());
            }
            Some((end, _)) => {
                // Stray `something;` at rule position: keep it verbatim.
                let fragment = rest[..end].trim();
                if !fragment.is_empty() {
                    nodes.push(CssNode::Raw(fragment.to_string()));
                }
                pos += end + 1;
            }
            None => {
                let fragment = rest.trim();
                if !fragment.is_empty() {
                    nodes.push(CssNode::Raw(fragment.to_string()));
                }
                break;
            }
        }
    }

    nodes
}

fn parse_at_rule(rest: &str) -> (CssNode, usize) {
    let name_end = rest[1..]
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .map(|i| i + 1)
        .unwrap_or(rest.len());
    let name = rest[1..name_end].to_string();

    match scan_to_block(&rest[name_end..]) {
        Some((offset, true)) => {
            let params = rest[name_end..name_end + offset].trim().to_string();
            let open = name_end + offset;
            let close = matching_brace(rest, open);
            let body_text = &rest[open + 1..close];
            let body = if has_top_level_block(body_text) {
                AtRuleBody::Nodes(parse_nodes(body_text))
            } else {
                AtRuleBody::Declarations(body_text.trim().to_string())
            };
            (CssNode::AtRule { name, params, body }, (close + 1).min(rest.len()))
        }
        Some((offset, false)) => {
            let params = rest[name_end..name_end + offset].trim().to_string();
            (CssNode::AtStatement { name, params }, name_end + offset + 1)
        }
        None => (CssNode::Raw(rest.trim().to_string()), rest.len()),
    }
}

/// Scan forward to the first top-level `{` or `;`.
///
/// Returns `(offset, true)` when a block opens at `offset`, or
/// `(offset, false)` for a `;` statement terminator. `None` means
/// neither occurs before the end of input.
fn scan_to_block(s: &str) -> Option<(usize, bool)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => return Some((i, true)),
            b';' => return Some((i, false)),
            b'"' | b'\'' => i = skip_string(s, i),
            b'/' if s[i..].starts_with("/*") => i = skip_comment(s, i),
            _ => i += 1,
        }
    }
    None
}

/// Index of the `}` matching the `{` at `open`. When the input is
/// truncated, the end of input closes every open block.
fn matching_brace(s: &str, open: usize) -> usize {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
                i += 1;
            }
            b'"' | b'\'' => i = skip_string(s, i),
            b'/' if s[i..].starts_with("/*") => i = skip_comment(s, i),
            _ => i += 1,
        }
    }
    s.len()
}

fn has_top_level_block(s: &str) -> bool {
    scan_to_block(s).is_some_and(|(_, open)| open)
}

fn skip_string(s: &str, start: usize) -> usize {
    let quote = s.as_bytes()[start];
    let bytes = s.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_comment(s: &str, start: usize) -> usize {
    s[start + 2..]
        .find("*/")
        .map(|i| start + i + 4)
        .unwrap_or(s.len())
}

fn leading_ws(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

fn write_nodes(out: &mut String, nodes: &[CssNode], depth: usize, compact: bool) {
    let pad = if compact {
        String::new()
    } else {
        "  ".repeat(depth)
    };
    for node in nodes {
        match node {
            CssNode::Comment(text) => {
                if !compact {
                    out.push_str(&pad);
                    out.push_str(text);
                    out.push('\n');
                }
            }
            CssNode::Raw(text) => {
                out.push_str(&pad);
                out.push_str(text);
                out.push(if compact { ';' } else { '\n' });
            }
            CssNode::AtStatement { name, params } => {
                out.push_str(&pad);
                out.push('@');
                out.push_str(name);
                if !params.is_empty() {
                    out.push(' ');
                    out.push_str(&collapse_ws(params));
                }
                out.push(';');
                if !compact {
                    out.push('\n');
                }
            }
            CssNode::Rule { selectors, body } => {
                out.push_str(&pad);
                if compact {
                    out.push_str(&collapse_ws(selectors));
                    out.push('{');
                    out.push_str(&compact_declarations(body));
                    out.push('}');
                } else {
                    out.push_str(selectors);
                    out.push_str(" {\n");
                    for line in body.lines() {
                        out.push_str(&pad);
                        out.push_str("  ");
                        out.push_str(line.trim());
                        out.push('\n');
                    }
                    out.push_str(&pad);
                    out.push_str("}\n");
                }
            }
            CssNode::AtRule { name, params, body } => {
                out.push_str(&pad);
                out.push('@');
                out.push_str(name);
                if !params.is_empty() {
                    out.push(' ');
                    out.push_str(&collapse_ws(params));
                }
                if compact {
                    out.push('{');
                } else {
                    out.push_str(" {\n");
                }
                match body {
                    AtRuleBody::Nodes(children) => {
                        write_nodes(out, children, depth + 1, compact);
                    }
                    AtRuleBody::Declarations(decls) => {
                        if compact {
                            out.push_str(&compact_declarations(decls));
                        } else {
                            for line in decls.lines() {
                                out.push_str(&pad);
                                out.push_str("  ");
                                out.push_str(line.trim());
                                out.push('\n');
                            }
                        }
                    }
                }
                if compact {
                    out.push('}');
                } else {
                    out.push_str(&pad);
                    out.push_str("}\n");
                }
            }
        }
    }
}

/// Split raw declaration text into `(property, value)` pairs at
/// top-level semicolons. Quote-aware; comments and empty segments are
/// dropped. Malformed segments without a `:` are skipped.
pub fn split_declarations(body: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for segment in split_top_level(body, b';') {
        let segment = strip_comments(&segment);
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        if let Some(colon) = segment.find(':') {
            let prop = segment[..colon].trim();
            let value = segment[colon + 1..].trim();
            if !prop.is_empty() && !value.is_empty() {
                pairs.push((prop.to_ascii_lowercase(), collapse_ws(value)));
            }
        }
    }
    pairs
}

/// Split text at a separator byte, respecting quotes, comments, and
/// parentheses (so `url(a;b)` or `format("x,y")` never splits).
pub fn split_top_level(s: &str, sep: u8) -> Vec<String> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut parens = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(s, i),
            b'/' if s[i..].starts_with("/*") => i = skip_comment(s, i),
            b'(' => {
                parens += 1;
                i += 1;
            }
            b')' => {
                parens = parens.saturating_sub(1);
                i += 1;
            }
            b if b == sep && parens == 0 => {
                parts.push(s[start..i].to_string());
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < s.len() {
        parts.push(s[start..].to_string());
    }
    parts
}

fn strip_comments(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        if s[i..].starts_with("/*") {
            i = skip_comment(s, i);
        } else {
            let c = s[i..].chars().next().unwrap();
            out.push(c);
            i += c.len_utf8();
        }
    }
    out
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn compact_declarations(body: &str) -> String {
    split_declarations(body)
        .into_iter()
        .map(|(prop, value)| format!("{prop}:{value}"))
        .collect::<Vec<_>>()
        .join(";")
}
