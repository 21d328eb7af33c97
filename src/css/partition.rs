//! Head / inline CSS partitioning.
//!
//! Email clients only honor a narrow set of constructs inside `<head>`
//! styles, and everything else has to live in per-element `style`
//! attributes. The split is decided purely by top-level at-rule name.

use super::document::{CssDocument, CssNode};

/// At-rules that cannot be inlined and must stay in the document head.
const HEAD_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "font-face",
    "keyframes",
    "-webkit-keyframes",
    "-moz-keyframes",
    "charset",
];

#[derive(Debug, Clone, Default)]
pub struct CssPartition {
    /// CSS that must remain in the head (media queries, keyframes, ...).
    pub head: String,
    /// CSS safe to push into element `style` attributes.
    pub inline: String,
}

/// Split CSS text into head-bound and inlineable partitions.
///
/// Every top-level node lands in exactly one partition; relative order
/// within each partition follows the source.
pub fn split_css(css: &str) -> CssPartition {
    let doc = CssDocument::parse(css);
    let mut head = CssDocument::default();
    let mut inline = CssDocument::default();

    for node in doc.nodes {
        if is_head_node(&node) {
            head.nodes.push(node);
        } else {
            inline.nodes.push(node);
        }
    }

    CssPartition {
        head: head.to_css(),
        inline: inline.to_css(),
    }
}

fn is_head_node(node: &CssNode) -> bool {
    let name = match node {
        CssNode::AtRule { name, .. } => name,
        CssNode::AtStatement { name, .. } => name,
        _ => return false,
    };
    HEAD_AT_RULES.contains(&name.as_str())
}
