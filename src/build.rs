//! The build pipeline.
//!
//! One artifact build is a sequential pipeline:
//! compile styles → partition CSS → render a draft → scan usage →
//! prune → render final → inline → per-locale localize → write.
//!
//! The draft/final split is deliberate and the final render is not an
//! optimization: pruning needs rendered HTML to know which selectors
//! are used, but the head CSS that ships must reflect what pruning
//! removed, so the draft render only ever *discovers* usage and the
//! final render produces the document that is actually written.
//!
//! Locales share the already-rendered, already-inlined base HTML and
//! nothing mutable, so they are processed in parallel.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;

use crate::{
    config::{AUTO_IMPORT, BuildConfig},
    css::{collect_used_selectors, minify::minify_safe, prune_css, split_css, strip_empty_at_rules},
    html,
    inline::inline_html,
    localize::{TranslationIndex, localize_html},
    render::TemplateRenderer,
    report,
    styles::{self, StyleSource},
};

const TAG: &str = "build";

/// Compiled CSS inputs for variant construction.
///
/// `head_only` stays in the head unfiltered and never participates in
/// inlining or pruning. `head_extra` stays in the head too, but also
/// joins the inline stream (both placements, by design). `head` and
/// `inline` come from partitioning the main stylesheet.
#[derive(Debug, Default)]
struct CssSources {
    head_only: String,
    head: String,
    inline: String,
    head_extra: String,
}

/// Flags distinguishing one concrete output variant.
#[derive(Debug, Clone, Copy)]
struct VariantFlags {
    minify_head: bool,
    minify_inline: bool,
    minify_html: bool,
}

#[derive(Debug)]
struct Variant {
    html: String,
    head_css: String,
    inline_css: String,
}

/// Build one mail artifact: base outputs plus one directory per locale.
pub fn run_build(cfg: &BuildConfig) -> Result<()> {
    // Configuration errors surface before any compilation work.
    let template_file = cfg.resolve_template()?;
    let style_entry = cfg.resolve_style_entry()?;

    if cfg.verbose {
        report::info(TAG, &format!("Template: {}", template_file.display()));
    }

    let renderer = TemplateRenderer::new(
        &template_file,
        &[cfg.vendor_helpers_root(), cfg.templates_root()],
    )?;

    let include_paths = cfg.include_paths();
    let auto_imports = vec![cfg.vendor_styles_root().join(AUTO_IMPORT)];
    let css_text = styles::compile(&StyleSource {
        entry: style_entry,
        include_paths: include_paths.clone(),
        auto_imports: auto_imports.clone(),
    })
    .context("stylesheet compile failed")?;
    let partition = split_css(&css_text);

    let sources = CssSources {
        head_only: compile_optional_entries(cfg, "head-only.css", &include_paths, &auto_imports),
        head: partition.head,
        inline: partition.inline,
        head_extra: compile_optional_entries(cfg, "head-extra.css", &include_paths, &auto_imports),
    };

    let locales = cfg.effective_locales();
    report::info(TAG, &format!("Locales: {}", locales.join(", ")));

    let compact = build_variant(
        cfg,
        &renderer,
        &sources,
        VariantFlags {
            minify_head: cfg.minify_css || cfg.minify_all,
            minify_inline: cfg.minify_all,
            minify_html: cfg.minify_html || cfg.minify_all,
        },
    )?;
    let pretty = if cfg.pretty {
        Some(build_variant(
            cfg,
            &renderer,
            &sources,
            VariantFlags {
                minify_head: false,
                minify_inline: false,
                minify_html: false,
            },
        )?)
    } else {
        None
    };

    let dist_root = cfg.dist_root();
    if cfg.base {
        write_output_pair(&dist_root, &compact.html, pretty.as_ref().map(|v| v.html.as_str()))?;
        report::info(
            TAG,
            &format!(
                "CSS split: head={:.1} KB, inline={:.1} KB",
                compact.head_css.len() as f64 / 1024.0,
                compact.inline_css.len() as f64 / 1024.0
            ),
        );
    }

    if locales.is_empty() {
        report::warn(
            TAG,
            "no locales found and none specified; only the base HTML was written",
        );
    }

    let failed: Vec<String> = locales
        .par_iter()
        .filter_map(|locale| {
            match process_locale(
                cfg,
                &dist_root,
                locale,
                &compact.html,
                pretty.as_ref().map(|v| v.html.as_str()),
            ) {
                Ok(()) => None,
                Err(err) => {
                    report::error(TAG, &format!("locale '{locale}': {err:#}"));
                    Some(locale.clone())
                }
            }
        })
        .collect();

    if !failed.is_empty() {
        let mut failed = failed;
        failed.sort();
        bail!("localization failed for locale(s): {}", failed.join(", "));
    }

    report::info(TAG, &format!("OK: {}", cfg.artifact_label()));
    report::info(TAG, &format!("Dist: {}", dist_root.display()));
    Ok(())
}

/// Compile the global and per-artifact optional style entries
/// (`vendor/styles/<name>` then `app/styles/<name>`). A missing entry
/// is skipped silently; a broken one logs a warning and is skipped.
fn compile_optional_entries(
    cfg: &BuildConfig,
    name: &str,
    include_paths: &[std::path::PathBuf],
    auto_imports: &[std::path::PathBuf],
) -> String {
    let mut chunks = Vec::new();
    for entry in [
        cfg.vendor_styles_root().join(name),
        cfg.styles_root().join(name),
    ] {
        if !entry.exists() {
            continue;
        }
        let chunk = report::recover_or(TAG, &format!("optional entry {name}"), String::new(), || {
            styles::compile(&StyleSource {
                entry: entry.clone(),
                include_paths: include_paths.to_vec(),
                auto_imports: auto_imports.to_vec(),
            })
        });
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
    }
    chunks.join("\n")
}

fn build_variant(
    cfg: &BuildConfig,
    renderer: &TemplateRenderer,
    sources: &CssSources,
    flags: VariantFlags,
) -> Result<Variant> {
    let head_only = sources.head_only.as_str();
    let head = sources.head.as_str();
    let head_extra = sources.head_extra.as_str();

    // Head order is deliberate: head-only (unfiltered), extracted head
    // CSS, head-extra. head-extra also joins the inline stream.
    let mut head_final = join_blocks(&[head_only, head, head_extra], "\n\n");
    let mut inline_final = join_blocks(&[sources.inline.as_str(), head_extra], "\n");

    // Stage 1: draft render, used only to discover selector usage.
    let draft = renderer.render(&head_final, &cfg.artifact_label())?;

    if cfg.trim_css {
        let used = collect_used_selectors(&draft);

        let before = inline_final.len();
        inline_final = prune_css(&inline_final, &used, false);
        if let Some(saved) = report::format_savings(before, inline_final.len()) {
            report::info(TAG, &format!("CSS trim (inline): {saved}"));
        }

        // head-only is exempt from pruning; the extracted head CSS and
        // head-extra are pruned aggressively since a lost media
        // override degrades instead of breaking the base layout.
        let head_trim_target = join_blocks(&[head, head_extra], "\n\n");
        if !head_trim_target.trim().is_empty() {
            let before = head_trim_target.len();
            let trimmed = prune_css(&head_trim_target, &used, true);
            if let Some(saved) = report::format_savings(before, trimmed.len()) {
                report::info(TAG, &format!("CSS trim (head): {saved}"));
            }
            head_final = join_blocks(&[head_only, &trimmed], "\n\n");
        }
    }
    head_final = strip_empty_at_rules(&head_final);

    // Minify last: pruning re-serializes in readable form, so minifying
    // earlier would be undone.
    if flags.minify_head {
        head_final = minify_safe(TAG, &head_final);
    }
    if flags.minify_inline {
        inline_final = minify_safe(TAG, &inline_final);
    }

    // Stage 2: final render, so the shipped head matches the pruned CSS.
    let rendered = renderer.render(&head_final, &cfg.artifact_label())?;
    let mut html = inline_html(&rendered, &inline_final).context("CSS inlining failed")?;
    if flags.minify_html {
        html = html::collapse_whitespace(&html);
    }

    Ok(Variant {
        html,
        head_css: head_final,
        inline_css: inline_final,
    })
}

fn process_locale(
    cfg: &BuildConfig,
    dist_root: &Path,
    locale: &str,
    compact_html: &str,
    pretty_html: Option<&str>,
) -> Result<()> {
    let index = TranslationIndex::load(&cfg.lang_dir_abs(), locale);
    if index.is_empty() {
        report::warn(
            TAG,
            &format!("locale '{locale}': no JSON found; emitting HTML with placeholders"),
        );
    }

    let localized = localize_html(compact_html, &index, cfg.fail_on_missing)?;
    let localized_pretty = pretty_html
        .map(|h| localize_html(h, &index, cfg.fail_on_missing))
        .transpose()?;

    write_output_pair(
        &dist_root.join(locale),
        &localized,
        localized_pretty.as_deref(),
    )
}

/// Write `index.html` (compact, as-for-production) and, when a pretty
/// variant exists, `index.pretty.html` (reindented, for review).
fn write_output_pair(dir: &Path, compact: &str, pretty: Option<&str>) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;
    let compact_path = dir.join("index.html");
    fs::write(&compact_path, compact)
        .with_context(|| format!("failed to write {}", compact_path.display()))?;

    if let Some(pretty) = pretty {
        let beautified = report::recover_or(TAG, "HTML beautify", pretty.to_string(), || {
            html::beautify(pretty)
        });
        let pretty_path = dir.join("index.pretty.html");
        fs::write(&pretty_path, beautified)
            .with_context(|| format!("failed to write {}", pretty_path.display()))?;
    }
    Ok(())
}

fn join_blocks(blocks: &[&str], sep: &str) -> String {
    blocks
        .iter()
        .filter(|b| !b.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}
