//! Stylesheet compilation.
//!
//! Compiles a CSS entry file into one flat CSS string by resolving
//! `@import` statements recursively against the entry's own directory
//! and the configured include paths. Auto-imported partials (design
//! tokens and the like) are prepended when present and skipped silently
//! when not. Each file is inlined at most once per compilation, so
//! diamond imports do not duplicate text and cycles terminate.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::report;

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*@import\s+(?:url\(\s*)?["']?([^"')\s;]+)["']?\s*\)?\s*;[^\S\n]*"#)
        .unwrap()
});

/// A stylesheet compilation request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct StyleSource {
    pub entry: PathBuf,
    pub include_paths: Vec<PathBuf>,
    pub auto_imports: Vec<PathBuf>,
}

/// Compile the source into a single CSS string.
///
/// A missing or unresolvable `@import` is a compile error and aborts
/// the build. A missing auto-import is skipped; a broken one logs a
/// warning and is skipped (compilation stays resilient to optional
/// partials).
pub fn compile(source: &StyleSource) -> Result<String> {
    let mut visited = HashSet::new();
    let mut chunks: Vec<String> = Vec::new();

    for auto in &source.auto_imports {
        if !auto.exists() {
            continue;
        }
        let chunk = report::recover_or("build", &format!("auto-import {}", auto.display()), String::new(), || {
            compile_file(auto, &source.include_paths, &mut visited)
        });
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
    }

    let entry = compile_file(&source.entry, &source.include_paths, &mut visited)
        .with_context(|| format!("failed to compile {}", source.entry.display()))?;
    chunks.push(entry);

    Ok(chunks.join("\n"))
}

fn compile_file(
    path: &Path,
    include_paths: &[PathBuf],
    visited: &mut HashSet<PathBuf>,
) -> Result<String> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("stylesheet not found: {}", path.display()))?;
    if !visited.insert(canonical.clone()) {
        return Ok(String::new());
    }

    let text = fs::read_to_string(&canonical)
        .with_context(|| format!("failed to read stylesheet: {}", canonical.display()))?;
    let current_dir = canonical.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in IMPORT.captures_iter(&text) {
        let whole = caps.get(0).unwrap();
        let spec = &caps[1];
        out.push_str(&text[last..whole.start()]);

        let resolved = resolve_import(spec, &current_dir, include_paths).with_context(|| {
            format!(
                "cannot resolve @import \"{spec}\" from {}",
                canonical.display()
            )
        })?;
        out.push_str(&compile_file(&resolved, include_paths, visited)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);

    Ok(out)
}

/// Find an imported file: the literal name and the name with a `.css`
/// extension appended, looked up in the importing file's directory and
/// then each include path in order.
fn resolve_import(spec: &str, current_dir: &Path, include_paths: &[PathBuf]) -> Result<PathBuf> {
    let names = if spec.ends_with(".css") {
        vec![spec.to_string()]
    } else {
        vec![spec.to_string(), format!("{spec}.css")]
    };

    for base in std::iter::once(current_dir).chain(include_paths.iter().map(PathBuf::as_path)) {
        for name in &names {
            let candidate = base.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    bail!("no such file in include paths")
}
