//! Placeholder localization.
//!
//! Rendered HTML carries tokens of the literal shape
//! `${{ <file-key>.<dotted.key.path> }}$`. Each token resolves against
//! a per-locale translation index: one JSON document per file key,
//! loaded from `vendor/data/<locale>/<file-key>.json`. Substitution is
//! purely textual; substituted values are never re-scanned, so a value
//! containing a token shape stays as-is.

use std::{collections::HashMap, fs, path::Path, sync::LazyLock};

use anyhow::{Result, bail};
use regex::Regex;
use serde_json::Value;

use crate::report;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\{\s*([a-zA-Z0-9_-]+)\.([a-zA-Z0-9_.-]+)\s*\}\}\$").unwrap()
});

/// Per-locale translation data: file key → parsed JSON document.
#[derive(Debug, Default)]
pub struct TranslationIndex {
    documents: HashMap<String, Value>,
}

impl TranslationIndex {
    /// Load every `<file-key>.json` under `<lang_dir>/<locale>/`.
    ///
    /// A missing locale directory yields an empty index (the caller
    /// decides whether that is worth a warning); a broken JSON file is
    /// skipped with a warning so one bad file cannot take down every
    /// translation in the locale.
    pub fn load(lang_dir: &Path, locale: &str) -> Self {
        let mut index = Self::default();
        let dir = lang_dir.join(locale);
        let Ok(entries) = fs::read_dir(&dir) else {
            return index;
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|text| Ok(serde_json::from_str::<Value>(&text)?))
            {
                Ok(json) => {
                    index.documents.insert(stem.to_string(), json);
                }
                Err(err) => {
                    report::warn(
                        "build",
                        &format!("skipping broken translation file {}: {err}", path.display()),
                    );
                }
            }
        }

        index
    }

    #[cfg(test)]
    pub fn from_json(file_key: &str, json: Value) -> Self {
        let mut index = Self::default();
        index.documents.insert(file_key.to_string(), json);
        index
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn document(&self, file_key: &str) -> Option<&Value> {
        self.documents.get(file_key)
    }
}

/// Substitute every placeholder token in the HTML.
///
/// With `fail_on_missing` unset, a token whose file or key cannot be
/// resolved is left verbatim. With it set, the first unresolvable token
/// is an error naming the missing file or `file.key.path`.
pub fn localize_html(
    html: &str,
    index: &TranslationIndex,
    fail_on_missing: bool,
) -> Result<String> {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(html) {
        let whole = caps.get(0).unwrap();
        let file_key = &caps[1];
        let key_path = &caps[2];
        out.push_str(&html[last..whole.start()]);
        last = whole.end();

        let Some(document) = index.document(file_key) else {
            if fail_on_missing {
                bail!("missing translation file: {file_key}.json");
            }
            out.push_str(whole.as_str());
            continue;
        };

        match resolve_path(document, key_path) {
            Some(value) => out.push_str(&value_to_string(value)),
            None => {
                if fail_on_missing {
                    bail!("missing translation key: {file_key}.{key_path}");
                }
                out.push_str(whole.as_str());
            }
        }
    }
    out.push_str(&html[last..]);

    Ok(out)
}

/// Descend a dotted key path, short-circuiting the moment any
/// intermediate value is absent. A null leaf counts as missing.
fn resolve_path<'a>(document: &'a Value, key_path: &str) -> Option<&'a Value> {
    let mut current = document;
    for part in key_path.split('.').filter(|p| !p.is_empty()) {
        current = current.get(part)?;
    }
    if current.is_null() { None } else { Some(current) }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn nav_index() -> TranslationIndex {
        TranslationIndex::from_json("nav", json!({"title": "Hello"}))
    }

    #[test]
    fn test_substitution() {
        let out = localize_html("<p>${{ nav.title }}$</p>", &nav_index(), false).unwrap();
        assert_eq!(out, "<p>Hello</p>");
    }

    #[test]
    fn test_missing_key_non_strict_leaves_token() {
        let html = "<p>${{ nav.missing }}$</p>";
        let out = localize_html(html, &nav_index(), false).unwrap();
        assert_eq!(out, html);
    }

    #[test]
    fn test_missing_key_strict_names_the_key() {
        let err = localize_html("${{ nav.missing }}$", &nav_index(), true).unwrap_err();
        assert!(err.to_string().contains("nav.missing"), "{err}");
    }

    #[test]
    fn test_missing_file_strict_names_the_file() {
        let err = localize_html("${{ footer.legal }}$", &nav_index(), true).unwrap_err();
        assert!(err.to_string().contains("footer.json"), "{err}");
    }

    #[test]
    fn test_missing_file_non_strict_leaves_token() {
        let html = "${{ footer.legal }}$";
        assert_eq!(localize_html(html, &nav_index(), false).unwrap(), html);
    }

    #[test]
    fn test_deep_path_descent() {
        let index = TranslationIndex::from_json(
            "mail",
            json!({"header": {"cta": {"label": "Buy now"}}}),
        );
        let out = localize_html("${{ mail.header.cta.label }}$", &index, true).unwrap();
        assert_eq!(out, "Buy now");
    }

    #[test]
    fn test_intermediate_missing_short_circuits() {
        let index = TranslationIndex::from_json("mail", json!({"header": "flat"}));
        let html = "${{ mail.header.cta.label }}$";
        assert_eq!(localize_html(html, &index, false).unwrap(), html);
    }

    #[test]
    fn test_null_value_is_missing() {
        let index = TranslationIndex::from_json("nav", json!({"title": null}));
        let html = "${{ nav.title }}$";
        assert_eq!(localize_html(html, &index, false).unwrap(), html);
        assert!(localize_html(html, &index, true).is_err());
    }

    #[test]
    fn test_non_string_values_are_stringified() {
        let index = TranslationIndex::from_json("nav", json!({"count": 3, "on": true}));
        let out =
            localize_html("${{ nav.count }}$/${{ nav.on }}$", &index, true).unwrap();
        assert_eq!(out, "3/true");
    }

    #[test]
    fn test_no_recursive_expansion() {
        let index =
            TranslationIndex::from_json("nav", json!({"title": "${{ nav.other }}$"}));
        let out = localize_html("${{ nav.title }}$", &index, false).unwrap();
        // the substituted value is not re-scanned
        assert_eq!(out, "${{ nav.other }}$");
    }

    #[test]
    fn test_load_from_directory_convention() {
        let tmp = tempfile::TempDir::new().unwrap();
        let en = tmp.path().join("en");
        std::fs::create_dir_all(&en).unwrap();
        std::fs::write(en.join("nav.json"), r#"{"title": "Hello"}"#).unwrap();
        std::fs::write(en.join("broken.json"), "{ not json").unwrap();
        std::fs::write(en.join("notes.txt"), "ignored").unwrap();

        let index = TranslationIndex::load(tmp.path(), "en");
        assert!(!index.is_empty());
        let out = localize_html("${{ nav.title }}$", &index, true).unwrap();
        assert_eq!(out, "Hello");
        // broken.json skipped, not loaded
        assert!(index.document("broken").is_none());

        let empty = TranslationIndex::load(tmp.path(), "es");
        assert!(empty.is_empty());
    }
}
