//! Build configuration and directory conventions.
//!
//! `BuildConfig` is constructed exactly once from CLI arguments and then
//! passed by reference through every pipeline step. No component reads
//! argv or environment variables on its own; the struct is the single
//! source of truth for toggles and paths.
//!
//! Directory conventions (not negotiable by callers):
//!
//! - per-artifact root: `<category>/mail-<name>/app/{templates,styles,resources}`
//! - shared assets: `vendor/{styles,data,helpers}`
//! - translations: `vendor/data/<locale>/<file-key>.json`
//! - output: `<dist>/<category>/mail-<name>/index.html` plus one
//!   subdirectory per locale containing the same pair

use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Result, bail};
use regex::Regex;

static LOCALE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}([_-][A-Za-z]{2})?$").unwrap());

/// Default translations directory, relative to the project root.
pub const DEFAULT_LANG_DIR: &str = "vendor/data";

/// Stylesheet auto-imported into every compilation, when present.
pub const AUTO_IMPORT: &str = "tokens.css";

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub project_root: PathBuf,
    pub category: String,
    pub mail: String,
    /// Explicit locale list; `None` means discover from the lang dir.
    pub locales: Option<Vec<String>>,
    pub dist: PathBuf,
    pub lang_dir: PathBuf,
    /// Minify head CSS in the compact variant.
    pub minify_css: bool,
    /// Collapse inter-tag whitespace in the compact variant.
    pub minify_html: bool,
    /// Minify everything (head CSS, inline CSS, HTML) in the compact variant.
    pub minify_all: bool,
    /// Also emit `index.pretty.html` next to each compact output.
    pub pretty: bool,
    /// Prune CSS rules whose selectors are unused in the rendered markup.
    pub trim_css: bool,
    /// Treat a missing translation file or key as fatal for that locale.
    pub fail_on_missing: bool,
    /// Emit the non-localized base output pair at the dist root.
    pub base: bool,
    pub verbose: bool,
}

impl BuildConfig {
    pub fn mail_root(&self) -> PathBuf {
        self.project_root
            .join(&self.category)
            .join(format!("mail-{}", self.mail))
    }

    pub fn templates_root(&self) -> PathBuf {
        self.mail_root().join("app").join("templates")
    }

    pub fn styles_root(&self) -> PathBuf {
        self.mail_root().join("app").join("styles")
    }

    pub fn vendor_styles_root(&self) -> PathBuf {
        self.project_root.join("vendor").join("styles")
    }

    pub fn vendor_helpers_root(&self) -> PathBuf {
        self.project_root.join("vendor").join("helpers")
    }

    pub fn lang_dir_abs(&self) -> PathBuf {
        self.project_root.join(&self.lang_dir)
    }

    pub fn dist_root(&self) -> PathBuf {
        self.project_root
            .join(&self.dist)
            .join(&self.category)
            .join(format!("mail-{}", self.mail))
    }

    /// Human-readable artifact label, used in head comments and logs.
    pub fn artifact_label(&self) -> String {
        format!("{}/mail-{}", self.category, self.mail)
    }

    /// Stylesheet include paths, in lookup order.
    pub fn include_paths(&self) -> Vec<PathBuf> {
        vec![self.styles_root(), self.vendor_styles_root()]
    }

    /// Resolve the template entry file.
    ///
    /// Exactly one of `index.hbs` (current) or `index.handlebars`
    /// (legacy) must exist. Both present is a hard error: editing the
    /// wrong one and seeing "nothing change" wastes more time than the
    /// check does.
    pub fn resolve_template(&self) -> Result<PathBuf> {
        let current = self.templates_root().join("index.hbs");
        let legacy = self.templates_root().join("index.handlebars");

        match (current.exists(), legacy.exists()) {
            (true, true) => bail!(
                "both templates exist, keep only one:\n- {}\n- {}",
                current.display(),
                legacy.display()
            ),
            (true, false) => Ok(current),
            (false, true) => Ok(legacy),
            (false, false) => bail!("template not found: {}", current.display()),
        }
    }

    /// Resolve the main stylesheet entry: `inline.css` if present, else
    /// `common.css`.
    pub fn resolve_style_entry(&self) -> Result<PathBuf> {
        let inline = self.styles_root().join("inline.css");
        if inline.exists() {
            return Ok(inline);
        }
        let common = self.styles_root().join("common.css");
        if common.exists() {
            return Ok(common);
        }
        bail!(
            "stylesheet entry not found (expected inline.css or common.css in {})",
            self.styles_root().display()
        )
    }

    /// The locales to build: the explicit list when given, otherwise
    /// every locale-shaped subdirectory of the lang dir, sorted.
    pub fn effective_locales(&self) -> Vec<String> {
        match &self.locales {
            Some(list) => list.clone(),
            None => list_locales(&self.lang_dir_abs()),
        }
    }
}

/// List locale subdirectories (`en`, `pt-BR`, `zh_CN`) of a directory.
///
/// Missing or unreadable directories yield an empty list; an empty
/// locale set is a warning at the orchestrator level, not an error here.
pub fn list_locales(lang_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(lang_dir) else {
        return Vec::new();
    };
    let mut locales: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| LOCALE_NAME.is_match(name))
        .collect();
    locales.sort();
    locales
}
