//! Selector usage scanning.
//!
//! A syntactic scan of rendered HTML for every class and id token that
//! is actually present in markup. This is deliberately not DOM-accurate:
//! it has to tolerate malformed or partial fragments and never fail,
//! and the pruner compensates for the lost precision by keeping any
//! selector it cannot reason about.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static ID_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bid\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Class and id tokens observed in one rendered HTML snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageSet {
    pub classes: HashSet<String>,
    pub ids: HashSet<String>,
}

impl UsageSet {
    pub fn has_class(&self, token: &str) -> bool {
        self.classes.contains(token)
    }

    pub fn has_id(&self, token: &str) -> bool {
        self.ids.contains(token)
    }
}

/// Collect every `class` token (whitespace-split) and `id` value from
/// the HTML text.
pub fn collect_used_selectors(html: &str) -> UsageSet {
    let mut used = UsageSet::default();

    for caps in CLASS_ATTR.captures_iter(html) {
        let value = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        for token in value.split_whitespace() {
            used.classes.insert(token.to_string());
        }
    }

    for caps in ID_ATTR.captures_iter(html) {
        let value = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        let value = value.trim();
        if !value.is_empty() {
            used.ids.insert(value.to_string());
        }
    }

    used
}
