//! Syntactic HTML scanning and rewriting.
//!
//! The pipeline never builds a DOM. It scans tag-by-tag, which is
//! enough for attribute rewriting and whitespace handling, tolerates
//! partial or malformed fragments, and leaves everything it does not
//! understand untouched. The scanner skips `<style>` and `<script>`
//! payloads, comments, and doctypes so CSS combinators like `>` inside
//! a style block are never mistaken for markup.

use std::sync::LazyLock;

use regex::Regex;

static INTER_TAG_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

/// Elements with no closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// An open tag found by [`rewrite_tags`].
#[derive(Debug)]
pub struct Tag<'a> {
    /// Lowercased element name.
    pub name: String,
    /// Raw attribute text between the name and the closing `>`.
    pub attrs_text: &'a str,
    pub self_closing: bool,
}

impl Tag<'_> {
    /// Parse the attribute text into `(name, value)` pairs. Bare
    /// attributes get an empty value; names are lowercased.
    pub fn attrs(&self) -> Vec<(String, String)> {
        parse_attrs(self.attrs_text)
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.attrs()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// Walk every open tag, letting the callback replace the whole tag text
/// (angle brackets included). Content of `<style>`/`<script>`, closing
/// tags, comments, and doctypes pass through untouched.
pub fn rewrite_tags(html: &str, mut f: impl FnMut(&Tag) -> Option<String>) -> String {
    let bytes = html.as_bytes();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(lt) = html[pos..].find('<').map(|i| pos + i) else {
            out.push_str(&html[pos..]);
            break;
        };
        out.push_str(&html[pos..lt]);
        let rest = &html[lt..];

        if rest.starts_with("<!--") {
            let end = rest.find("-->").map(|i| lt + i + 3).unwrap_or(html.len());
            out.push_str(&html[lt..end]);
            pos = end;
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("</") || rest.starts_with("<?") {
            let end = rest.find('>').map(|i| lt + i + 1).unwrap_or(html.len());
            out.push_str(&html[lt..end]);
            pos = end;
            continue;
        }

        let Some((tag, tag_end)) = parse_open_tag(html, lt) else {
            // stray `<` that is not a tag
            out.push('<');
            pos = lt + 1;
            continue;
        };

        match f(&tag) {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&html[lt..tag_end]),
        }
        pos = tag_end;

        // Raw-text elements: copy the payload through verbatim.
        if tag.name == "style" || tag.name == "script" {
            let close = format!("</{}", tag.name);
            let lower = html[pos..].to_ascii_lowercase();
            let end = lower.find(&close).map(|i| pos + i).unwrap_or(html.len());
            out.push_str(&html[pos..end]);
            pos = end;
        }
    }

    out
}

fn parse_open_tag(html: &str, lt: usize) -> Option<(Tag<'_>, usize)> {
    let rest = &html[lt + 1..];
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let name = rest[..name_len].to_ascii_lowercase();

    // find the closing '>', skipping quoted attribute values
    let bytes = html.as_bytes();
    let mut i = lt + 1 + name_len;
    while i < bytes.len() {
        match bytes[i] {
            b'>' => {
                let self_closing = html[..i].ends_with('/');
                let attrs_end = if self_closing { i - 1 } else { i };
                let attrs_text = &html[lt + 1 + name_len..attrs_end];
                return Some((
                    Tag {
                        name,
                        attrs_text,
                        self_closing,
                    },
                    i + 1,
                ));
            }
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

fn parse_attrs(text: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i] as char).is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let name_start = i;
        while i < bytes.len() && !(bytes[i] as char).is_ascii_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        let name = text[name_start..i].to_ascii_lowercase();
        if name.is_empty() {
            i += 1;
            continue;
        }

        while i < bytes.len() && (bytes[i] as char).is_ascii_whitespace() {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && (bytes[i] as char).is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                attrs.push((name, text[value_start..i].to_string()));
                i += 1;
            } else {
                let value_start = i;
                while i < bytes.len() && !(bytes[i] as char).is_ascii_whitespace() {
                    i += 1;
                }
                attrs.push((name, text[value_start..i].to_string()));
            }
        } else {
            attrs.push((name, String::new()));
        }
    }

    attrs
}

/// Serialize attribute pairs back to tag-attribute text.
pub fn format_attrs(attrs: &[(String, String)]) -> String {
    attrs
        .iter()
        .map(|(name, value)| {
            if value.is_empty() {
                name.clone()
            } else {
                format!("{name}=\"{value}\"")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Conservative HTML minification: collapse inter-tag whitespace.
pub fn collapse_whitespace(html: &str) -> String {
    INTER_TAG_WS.replace_all(html, "><").trim().to_string()
}

/// Reindent HTML by tag depth. Readable output for development and
/// review, not for sending. Raw-text payloads keep their own lines.
pub fn beautify(html: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(html.len() * 2);
    let mut depth: usize = 0;
    let mut pos = 0;

    let mut emit = |line: &str, depth: usize, out: &mut String| {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        out.push_str(&"  ".repeat(depth));
        out.push_str(line);
        out.push('\n');
    };

    while pos < html.len() {
        let Some(lt) = html[pos..].find('<').map(|i| pos + i) else {
            emit(&html[pos..], depth, &mut out);
            break;
        };
        emit(&html[pos..lt], depth, &mut out);

        let rest = &html[lt..];
        let end = if rest.starts_with("<!--") {
            rest.find("-->").map(|i| lt + i + 3).unwrap_or(html.len())
        } else {
            find_tag_end(html, lt)
        };
        let tag_text = &html[lt..end];

        if tag_text.starts_with("</") {
            depth = depth.saturating_sub(1);
            emit(tag_text, depth, &mut out);
        } else if tag_text.starts_with("<!") || tag_text.starts_with("<?") {
            emit(tag_text, depth, &mut out);
        } else {
            emit(tag_text, depth, &mut out);
            let name: String = tag_text[1..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect::<String>()
                .to_ascii_lowercase();
            let opens = !tag_text.ends_with("/>") && !VOID_ELEMENTS.contains(&name.as_str());
            if opens {
                depth += 1;
            }
            if name == "style" || name == "script" {
                let close = format!("</{name}");
                let lower = html[end..].to_ascii_lowercase();
                let payload_end = lower.find(&close).map(|i| end + i).unwrap_or(html.len());
                for line in html[end..payload_end].lines() {
                    emit(line, depth, &mut out);
                }
                pos = payload_end;
                continue;
            }
        }
        pos = end;
    }

    Ok(out)
}

fn find_tag_end(html: &str, lt: usize) -> usize {
    let bytes = html.as_bytes();
    let mut i = lt;
    while i < bytes.len() {
        match bytes[i] {
            b'>' => return i + 1,
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    html.len()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_rewrite_tags_visits_open_tags() {
        let html = r#"<div class="a"><p>x</p></div>"#;
        let mut seen = Vec::new();
        let out = rewrite_tags(html, |tag| {
            seen.push(tag.name.clone());
            None
        });
        assert_eq!(out, html);
        assert_eq!(seen, vec!["div", "p"]);
    }

    #[test]
    fn test_rewrite_tags_replaces_tag_text() {
        let out = rewrite_tags("<p>x</p>", |tag| {
            (tag.name == "p").then(|| "<p style=\"color:red\">".to_string())
        });
        assert_eq!(out, "<p style=\"color:red\">x</p>");
    }

    #[test]
    fn test_style_payload_is_not_scanned() {
        let html = "<style>.a > .b { color: red }</style><p>x</p>";
        let mut seen = Vec::new();
        let out = rewrite_tags(html, |tag| {
            seen.push(tag.name.clone());
            None
        });
        assert_eq!(out, html);
        assert_eq!(seen, vec!["style", "p"]);
    }

    #[test]
    fn test_comments_and_doctype_pass_through() {
        let html = "<!DOCTYPE html><!-- <p>not a tag</p> --><div>x</div>";
        let mut seen = Vec::new();
        rewrite_tags(html, |tag| {
            seen.push(tag.name.clone());
            None
        });
        assert_eq!(seen, vec!["div"]);
    }

    #[test]
    fn test_tag_attr_parsing() {
        let html = r#"<td class="cell wide" id='c1' align=center nowrap>"#;
        rewrite_tags(html, |tag| {
            assert_eq!(tag.attr("class").as_deref(), Some("cell wide"));
            assert_eq!(tag.attr("id").as_deref(), Some("c1"));
            assert_eq!(tag.attr("align").as_deref(), Some("center"));
            assert_eq!(tag.attr("nowrap").as_deref(), Some(""));
            None
        });
    }

    #[test]
    fn test_gt_inside_attribute_value() {
        let html = r#"<img alt="a > b" src="x.png">"#;
        let mut seen = 0;
        let out = rewrite_tags(html, |tag| {
            assert_eq!(tag.attr("alt").as_deref(), Some("a > b"));
            seen += 1;
            None
        });
        assert_eq!(out, html);
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("  <div>\n  <p>a</p>\n</div>\n"),
            "<div><p>a</p></div>"
        );
    }

    #[test]
    fn test_beautify_indents_by_depth() {
        let out = beautify("<div><p>hello</p></div>").unwrap();
        assert_eq!(out, "<div>\n  <p>\n    hello\n  </p>\n</div>\n");
    }

    #[test]
    fn test_beautify_does_not_indent_after_void_elements() {
        let out = beautify("<div><br><p>x</p></div>").unwrap();
        assert!(out.contains("\n  <br>\n  <p>"));
    }
}
