//! CSS inlining into element `style` attributes.
//!
//! Takes rendered HTML plus the inlineable CSS partition and pushes
//! matching declarations into per-element `style` attributes. Matching
//! is limited to simple compound selectors (optional tag name plus
//! `.class` / `#id` parts, no combinators, pseudos, or attribute
//! selectors); anything else is preserved in a residual `<style>` block
//! before `</head>` so conservative pruning never strands styling.
//! Head-bound CSS is not an input here and is never touched.
//!
//! Declarations merge property-wise in (specificity, source order);
//! content of a pre-existing `style` attribute is applied last and wins.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::css::document::{CssDocument, CssNode, split_declarations, split_top_level};
use crate::html::{Tag, format_attrs, rewrite_tags};

static COMPOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z][a-zA-Z0-9-]*)?((?:[.#][_a-zA-Z0-9-]+)*)$").unwrap()
});
static COMPOUND_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.#])([_a-zA-Z0-9-]+)").unwrap());

/// Elements that never receive a `style` attribute.
const NON_STYLED: &[&str] = &["html", "head", "meta", "title", "link", "style", "script", "base"];

#[derive(Debug, Clone)]
struct CompoundSelector {
    tag: Option<String>,
    classes: Vec<String>,
    ids: Vec<String>,
}

impl CompoundSelector {
    /// Parse a simple compound selector, or `None` when the selector is
    /// not inlineable.
    fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        let caps = COMPOUND.captures(selector)?;
        let tag = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
        let mut classes = Vec::new();
        let mut ids = Vec::new();
        for part in COMPOUND_PART.captures_iter(caps.get(2).map_or("", |m| m.as_str())) {
            match &part[1] {
                "." => classes.push(part[2].to_string()),
                _ => ids.push(part[2].to_string()),
            }
        }
        if tag.is_none() && classes.is_empty() && ids.is_empty() {
            return None;
        }
        Some(Self { tag, classes, ids })
    }

    fn specificity(&self) -> (usize, usize, usize) {
        (
            self.ids.len(),
            self.classes.len(),
            usize::from(self.tag.is_some()),
        )
    }

    fn matches(&self, tag_name: &str, classes: &[&str], id: Option<&str>) -> bool {
        if let Some(t) = &self.tag
            && t != tag_name
        {
            return false;
        }
        if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
            return false;
        }
        self.ids.iter().all(|i| id == Some(i.as_str()))
    }
}

#[derive(Debug)]
struct InlineRule {
    selector: CompoundSelector,
    order: usize,
    declarations: Vec<(String, String)>,
}

/// Inline the given CSS into the HTML's `style` attributes.
pub fn inline_html(html: &str, inline_css: &str) -> Result<String> {
    let (rules, residual) = classify_rules(inline_css);

    let mut out = rewrite_tags(html, |tag| apply_rules(tag, &rules));

    if !residual.trim().is_empty() {
        let block = format!("<style>\n{residual}\n</style>");
        out = insert_before_head_close(&out, &block);
    }

    Ok(out)
}

/// Split the inline CSS into matchable rules and a residual document of
/// everything too complex to inline.
fn classify_rules(inline_css: &str) -> (Vec<InlineRule>, String) {
    let doc = CssDocument::parse(inline_css);
    let mut rules = Vec::new();
    let mut residual = CssDocument::default();
    let mut order = 0;

    for node in doc.nodes {
        match node {
            CssNode::Rule { selectors, body } => {
                let declarations = split_declarations(&body);
                let mut residual_selectors = Vec::new();
                for selector in split_top_level(&selectors, b',') {
                    let selector = selector.trim().to_string();
                    if selector.is_empty() {
                        continue;
                    }
                    match CompoundSelector::parse(&selector) {
                        Some(parsed) if !declarations.is_empty() => {
                            rules.push(InlineRule {
                                selector: parsed,
                                order,
                                declarations: declarations.clone(),
                            });
                        }
                        _ => residual_selectors.push(selector),
                    }
                }
                if !residual_selectors.is_empty() {
                    residual.nodes.push(CssNode::Rule {
                        selectors: residual_selectors.join(", "),
                        body,
                    });
                }
                order += 1;
            }
            CssNode::Comment(_) => {}
            // At-rules should not reach the inline partition, but if one
            // does it belongs in the head, not in a style attribute.
            other @ (CssNode::AtRule { .. } | CssNode::AtStatement { .. } | CssNode::Raw(_)) => {
                residual.nodes.push(other);
            }
        }
    }

    (rules, residual.to_css())
}

fn apply_rules(tag: &Tag, rules: &[InlineRule]) -> Option<String> {
    if NON_STYLED.contains(&tag.name.as_str()) {
        return None;
    }

    let attrs = tag.attrs();
    let class_value = attrs
        .iter()
        .find(|(n, _)| n == "class")
        .map(|(_, v)| v.clone())
        .unwrap_or_default();
    let classes: Vec<&str> = class_value.split_whitespace().collect();
    let id = attrs.iter().find(|(n, _)| n == "id").map(|(_, v)| v.as_str());

    let mut matched: Vec<&InlineRule> = rules
        .iter()
        .filter(|r| r.selector.matches(&tag.name, &classes, id))
        .collect();
    if matched.is_empty() {
        return None;
    }
    matched.sort_by_key(|r| (r.selector.specificity(), r.order));

    // property-wise merge, later writer wins; the element's own style
    // attribute is applied last
    let mut merged: Vec<(String, String)> = Vec::new();
    for rule in &matched {
        for (prop, value) in &rule.declarations {
            set_property(&mut merged, prop, value);
        }
    }
    if let Some((_, existing)) = attrs.iter().find(|(n, _)| n == "style") {
        for (prop, value) in split_declarations(existing) {
            set_property(&mut merged, &prop, &value);
        }
    }

    let style_value = merged
        .iter()
        .map(|(p, v)| format!("{p}:{v}"))
        .collect::<Vec<_>>()
        .join("; ");

    let mut new_attrs: Vec<(String, String)> = attrs
        .iter()
        .filter(|(n, _)| n != "style")
        .cloned()
        .collect();
    new_attrs.push(("style".to_string(), style_value));

    let slash = if tag.self_closing { "/" } else { "" };
    Some(format!("<{} {}{}>", tag.name, format_attrs(&new_attrs), slash))
}

fn set_property(merged: &mut Vec<(String, String)>, prop: &str, value: &str) {
    match merged.iter_mut().find(|(p, _)| p == prop) {
        Some(entry) => entry.1 = value.to_string(),
        None => merged.push((prop.to_string(), value.to_string())),
    }
}

fn insert_before_head_close(html: &str, block: &str) -> String {
    let lower = html.to_ascii_lowercase();
    if let Some(idx) = lower.find("</head>") {
        format!("{}{}\n{}", &html[..idx], block, &html[idx..])
    } else {
        format!("{block}\n{html}")
    }
}
