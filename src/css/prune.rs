//! Dead-rule pruning.
//!
//! Removes CSS rules whose selectors reference classes or ids that do
//! not occur in the rendered markup. The analysis is syntactic, so the
//! default (conservative) mode keeps any selector it cannot reason
//! about; aggressive mode is reserved for head CSS, where a mistakenly
//! dropped `@media` override degrades gracefully instead of breaking
//! the base layout.

use std::sync::LazyLock;

use regex::Regex;

use super::document::{AtRuleBody, CssDocument, CssNode, split_top_level};
use super::usage::UsageSet;

static CLASS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([_a-zA-Z0-9-]+)").unwrap());
static ID_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([_a-zA-Z0-9-]+)").unwrap());
static ATTR_SELECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\[\s*(class|id)\s*(=|~=|\^=|\$=|\*=)\s*(?:"([^"]*)"|'([^']*)'|([^\]\s]+))\s*\]"#)
        .unwrap()
});

/// Characters that make a selector too risky to analyze syntactically.
const RISKY: &[char] = &['[', '*', ':', '>', '+', '~'];

/// Remove rules whose selectors are provably unused.
///
/// Comma-joined selector lists are pruned per-selector: a rule survives
/// if any one selector survives, and its selector list is rewritten to
/// the surviving subset, source order preserved. Rules nested inside
/// at-rules (`@media` blocks) are pruned with the same policy.
pub fn prune_css(css: &str, used: &UsageSet, aggressive: bool) -> String {
    let doc = CssDocument::parse(css);
    let nodes = prune_nodes(doc.nodes, used, aggressive);
    CssDocument { nodes }.to_css()
}

fn prune_nodes(nodes: Vec<CssNode>, used: &UsageSet, aggressive: bool) -> Vec<CssNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            CssNode::Rule { selectors, body } => {
                let kept: Vec<String> = split_top_level(&selectors, b',')
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .filter(|s| keep_selector(s, used, aggressive))
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(CssNode::Rule {
                        selectors: kept.join(", "),
                        body,
                    })
                }
            }
            CssNode::AtRule {
                name,
                params,
                body: AtRuleBody::Nodes(children),
            } => Some(CssNode::AtRule {
                name,
                params,
                body: AtRuleBody::Nodes(prune_nodes(children, used, aggressive)),
            }),
            other => Some(other),
        })
        .collect()
}

/// Decide whether one selector survives against the usage set.
fn keep_selector(selector: &str, used: &UsageSet, aggressive: bool) -> bool {
    let mut class_tokens: Vec<String> = Vec::new();
    let mut id_tokens: Vec<String> = Vec::new();

    // Attribute selectors of the exact form [class=x] / [class~="x"] /
    // [id=x] contribute tokens. Any other operator (^= $= *=) is a
    // partial match we cannot reason about: in conservative mode it
    // forces a keep, in aggressive mode it is ignored.
    let mut force_keep = false;
    for caps in ATTR_SELECTOR.captures_iter(selector) {
        let attr = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
        let op = caps.get(2).map_or("", |m| m.as_str());
        if op != "=" && op != "~=" {
            force_keep = true;
            break;
        }
        let raw = caps
            .get(3)
            .or_else(|| caps.get(4))
            .or_else(|| caps.get(5))
            .map_or("", |m| m.as_str());
        for token in raw.split_whitespace() {
            match attr.as_str() {
                "class" => class_tokens.push(token.to_string()),
                "id" => id_tokens.push(token.to_string()),
                _ => {}
            }
        }
    }
    if force_keep && !aggressive {
        return true;
    }

    for caps in CLASS_TOKEN.captures_iter(selector) {
        class_tokens.push(caps[1].to_string());
    }
    for caps in ID_TOKEN.captures_iter(selector) {
        id_tokens.push(caps[1].to_string());
    }

    // Conservative mode keeps anything with attribute selectors,
    // pseudos, combinators, or the universal selector.
    if !aggressive && selector.contains(RISKY) {
        return true;
    }

    // No class/id references at all: a tag-based selector, always kept.
    if class_tokens.is_empty() && id_tokens.is_empty() {
        return true;
    }

    class_tokens.iter().all(|c| used.has_class(c)) && id_tokens.iter().all(|i| used.has_id(i))
}

/// Remove at-rules left with no non-comment content.
///
/// Applied after pruning so an emptied `@media { }` shell never reaches
/// the shipped head. Nested at-rules are stripped bottom-up.
pub fn strip_empty_at_rules(css: &str) -> String {
    let doc = CssDocument::parse(css);
    let nodes = strip_nodes(doc.nodes);
    CssDocument { nodes }.to_css()
}

fn strip_nodes(nodes: Vec<CssNode>) -> Vec<CssNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            CssNode::AtRule { name, params, body } => {
                let body = match body {
                    AtRuleBody::Nodes(children) => AtRuleBody::Nodes(strip_nodes(children)),
                    decls => decls,
                };
                if at_rule_body_is_empty(&body) {
                    None
                } else {
                    Some(CssNode::AtRule { name, params, body })
                }
            }
            other => Some(other),
        })
        .collect()
}

fn at_rule_body_is_empty(body: &AtRuleBody) -> bool {
    match body {
        AtRuleBody::Nodes(children) => children
            .iter()
            .all(|n| matches!(n, CssNode::Comment(_))),
        AtRuleBody::Declarations(decls) => {
            let mut rest = decls.as_str();
            // declarations count as content unless only comments remain
            loop {
                rest = rest.trim_start();
                if let Some(idx) = rest.strip_prefix("/*").and_then(|r| r.find("*/")) {
                    rest = &rest[idx + 4..];
                } else {
                    break;
                }
            }
            rest.trim().is_empty()
        }
    }
}
