//! Terminal output helpers.
//!
//! This module is separate from the pipeline logic so the library parts
//! stay free of printing side effects. All build output goes through the
//! same `[tag]`-style prefix so logs from the dev loop, the server, and
//! the build itself are distinguishable when interleaved.

use colored::Colorize;

pub fn info(tag: &str, msg: &str) {
    println!("{} {}", format!("[{tag}]").blue(), msg);
}

pub fn warn(tag: &str, msg: &str) {
    eprintln!("{} {}", format!("[{tag}] WARN:").bold().yellow(), msg);
}

pub fn error(tag: &str, msg: &str) {
    eprintln!("{} {}", format!("[{tag}] ERROR:").bold().red(), msg);
}

/// Run a recoverable step, falling back to a default on failure.
///
/// Recoverable vs fatal is one explicit policy: anything routed through
/// here (CSS minification, HTML beautification, optional style entries)
/// logs a warning and continues; everything else propagates with `?`.
pub fn recover_or<T>(
    tag: &str,
    what: &str,
    fallback: T,
    f: impl FnOnce() -> anyhow::Result<T>,
) -> T {
    match f() {
        Ok(value) => value,
        Err(err) => {
            warn(tag, &format!("{what} failed, continuing without it: {err:#}"));
            fallback
        }
    }
}

/// Format a byte delta as `-1.0 KB (50%)` for trim statistics.
///
/// Returns `None` when nothing was saved.
pub fn format_savings(before: usize, after: usize) -> Option<String> {
    let delta = before.saturating_sub(after);
    if delta == 0 {
        return None;
    }
    let percent = (delta as f64 / before.max(1) as f64 * 100.0).round();
    Some(format!("-{:.1} KB ({}%)", delta as f64 / 1024.0, percent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_or_returns_value_on_success() {
        let out = recover_or("test", "step", String::new(), || Ok("ok".to_string()));
        assert_eq!(out, "ok");
    }

    #[test]
    fn test_recover_or_falls_back_on_error() {
        let out = recover_or("test", "step", "fallback".to_string(), || {
            anyhow::bail!("boom")
        });
        assert_eq!(out, "fallback");
    }

    #[test]
    fn test_format_savings() {
        assert_eq!(format_savings(100, 100), None);
        assert_eq!(format_savings(100, 150), None);
        let s = format_savings(2048, 1024).unwrap();
        assert!(s.starts_with("-1.0 KB"), "{s}");
        assert!(s.contains("50%"), "{s}");
    }
}
