//! Template rendering.
//!
//! Templates are Handlebars. The artifact's entry template is
//! registered as `index`; every `.hbs` file under the partial roots
//! (shared `vendor/helpers/` first, then the artifact's own
//! `app/templates/`) is registered as a partial named by its path
//! relative to the root, extension stripped, so templates include
//! shared chrome with `{{> head}}` or `{{> footer/legal}}`. A partial
//! registered by a later root shadows an earlier one of the same name,
//! which lets an artifact override a shared helper.
//!
//! The head CSS local is raw text; templates inject it with a
//! triple-stash (`{{{head_css}}}`) inside their `<style>` tag.
//!
//! Localization tokens (`${{ file.key }}$`) share delimiters with
//! Handlebars expressions, so template sources are escaped on load;
//! tokens pass through rendering verbatim and are substituted later,
//! per locale.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;
use walkdir::WalkDir;

/// Locals available to every template and partial.
#[derive(Debug, Serialize)]
struct RenderLocals<'a> {
    head_css: &'a str,
    head_comment: &'a str,
}

#[derive(Debug)]
pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new(template_file: &Path, partial_roots: &[PathBuf]) -> Result<Self> {
        let mut registry = Handlebars::new();

        for root in partial_roots {
            if !root.is_dir() {
                continue;
            }
            for entry in WalkDir::new(root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("hbs") {
                    continue;
                }
                let name = partial_name(root, path);
                registry
                    .register_template_string(&name, read_template(path)?)
                    .with_context(|| format!("failed to parse partial: {}", path.display()))?;
            }
        }

        registry
            .register_template_string("index", read_template(template_file)?)
            .with_context(|| format!("failed to parse template: {}", template_file.display()))?;

        Ok(Self { registry })
    }

    /// Render the entry template with the given head CSS injected.
    pub fn render(&self, head_css: &str, head_comment: &str) -> Result<String> {
        self.registry
            .render(
                "index",
                &RenderLocals {
                    head_css,
                    head_comment,
                },
            )
            .context("template render failed")
    }
}

/// Read a template source, escaping localization token opens so the
/// Handlebars parser treats them as literal text.
fn read_template(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read template: {}", path.display()))?;
    Ok(text.replace("${{", r"$\{{"))
}

fn partial_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path).with_extension("");
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_render_injects_head_css_raw() {
        let tmp = TempDir::new().unwrap();
        let template = tmp.path().join("index.hbs");
        fs::write(
            &template,
            "<head><!-- {{head_comment}} --><style>{{{head_css}}}</style></head>",
        )
        .unwrap();

        let renderer = TemplateRenderer::new(&template, &[]).unwrap();
        let html = renderer
            .render("@media print { .a > .b { color: red } }", "X_IQ/mail-1")
            .unwrap();
        assert_eq!(
            html,
            "<head><!-- X_IQ/mail-1 --><style>@media print { .a > .b { color: red } }</style></head>"
        );
    }

    #[test]
    fn test_partials_resolve_by_relative_path() {
        let tmp = TempDir::new().unwrap();
        let helpers = tmp.path().join("helpers");
        fs::create_dir_all(helpers.join("footer")).unwrap();
        fs::write(helpers.join("head.hbs"), "<meta charset=\"utf-8\">").unwrap();
        fs::write(helpers.join("footer/legal.hbs"), "<p>legal</p>").unwrap();

        let template = tmp.path().join("index.hbs");
        fs::write(&template, "{{> head}}{{> footer/legal}}").unwrap();

        let renderer = TemplateRenderer::new(&template, &[helpers]).unwrap();
        let html = renderer.render("", "").unwrap();
        assert_eq!(html, "<meta charset=\"utf-8\"><p>legal</p>");
    }

    #[test]
    fn test_later_partial_root_shadows_earlier() {
        let tmp = TempDir::new().unwrap();
        let shared = tmp.path().join("shared");
        let local = tmp.path().join("local");
        fs::create_dir_all(&shared).unwrap();
        fs::create_dir_all(&local).unwrap();
        fs::write(shared.join("head.hbs"), "shared").unwrap();
        fs::write(local.join("head.hbs"), "local").unwrap();

        let template = tmp.path().join("index.hbs");
        fs::write(&template, "{{> head}}").unwrap();

        let renderer = TemplateRenderer::new(&template, &[shared, local]).unwrap();
        assert_eq!(renderer.render("", "").unwrap(), "local");
    }

    #[test]
    fn test_localization_tokens_survive_rendering() {
        let tmp = TempDir::new().unwrap();
        let template = tmp.path().join("index.hbs");
        fs::write(&template, "<p>${{ nav.title }}$</p>").unwrap();

        let renderer = TemplateRenderer::new(&template, &[]).unwrap();
        assert_eq!(renderer.render("", "").unwrap(), "<p>${{ nav.title }}$</p>");
    }

    #[test]
    fn test_broken_template_is_a_render_setup_error() {
        let tmp = TempDir::new().unwrap();
        let template = tmp.path().join("index.hbs");
        fs::write(&template, "{{#if}}unterminated").unwrap();

        assert!(TemplateRenderer::new(&template, &[]).is_err());
    }

    #[test]
    fn test_missing_template_file_is_an_error() {
        let err = TemplateRenderer::new(Path::new("/nonexistent/index.hbs"), &[]).unwrap_err();
        assert!(format!("{err:#}").contains("index.hbs"));
    }
}
