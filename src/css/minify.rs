//! Best-effort CSS minification.
//!
//! A build must never hard-fail because a minifier choked, so the only
//! public entry point returns the input text untouched when anything
//! goes wrong and logs a warning through the shared recovery helper.

use anyhow::ensure;

use super::document::CssDocument;
use crate::report;

/// Minify CSS text, falling back to the input on failure.
pub fn minify_safe(tag: &str, css: &str) -> String {
    if css.trim().is_empty() {
        return css.to_string();
    }
    report::recover_or(tag, "CSS minify", css.to_string(), || minify(css))
}

fn minify(css: &str) -> anyhow::Result<String> {
    let doc = CssDocument::parse(css);
    let out = doc.to_css_compact();
    // A minified stylesheet that lost every node means the input was not
    // CSS-shaped at all; keep the original rather than shipping nothing.
    ensure!(
        !out.trim().is_empty() || css.trim().is_empty(),
        "minified output is empty for non-empty input"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_minify_collapses_rules() {
        assert_eq!(
            minify_safe("test", ".a {\n  color : red ;\n}\n\n.b { margin: 0; }"),
            ".a{color:red}.b{margin:0}"
        );
    }

    #[test]
    fn test_minify_drops_comments() {
        assert_eq!(
            minify_safe("test", "/* header */ .a { color: red; } /* footer */"),
            ".a{color:red}"
        );
    }

    #[test]
    fn test_minify_preserves_media_query_structure() {
        let out = minify_safe("test", "@media (min-width: 600px) {\n  .a { color: red; }\n}");
        assert_eq!(out, "@media (min-width: 600px){.a{color:red}}");
    }

    #[test]
    fn test_unminifiable_input_falls_back_verbatim() {
        // nothing CSS-shaped survives the compact pass, so the original
        // text is returned unchanged
        let input = "/* only a comment */";
        assert_eq!(minify_safe("test", input), input);
    }

    #[test]
    fn test_empty_input_stays_empty() {
        assert_eq!(minify_safe("test", "  \n"), "  \n");
    }
}
