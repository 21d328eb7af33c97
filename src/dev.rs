//! Dev loop: watch the artifact's sources, rebuild on change, and push
//! a reload signal to the preview server.
//!
//! Filesystem events arrive in bursts (editors write temp files, then
//! rename), so events are coalesced: the loop blocks for the first
//! event, then drains everything that arrives within a quiet window
//! before rebuilding once. A build failure is logged and the loop keeps
//! watching; the next save gets another chance.

use std::{
    path::{Path, PathBuf},
    sync::mpsc,
    time::Duration,
};

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::broadcast;

use crate::{
    build,
    cli::DevCommand,
    config::{BuildConfig, DEFAULT_LANG_DIR},
    report,
    serve::{self, ServeOptions},
};

const TAG: &str = "dev";

/// Quiet window after the first event before a rebuild starts.
const DEBOUNCE: Duration = Duration::from_millis(120);

pub fn run(cmd: DevCommand, project_root: PathBuf) -> Result<()> {
    let cfg = BuildConfig {
        project_root: project_root.clone(),
        category: cmd.artifact.category,
        mail: cmd.artifact.mail,
        locales: None,
        dist: PathBuf::from("dist"),
        lang_dir: PathBuf::from(DEFAULT_LANG_DIR),
        minify_css: !cmd.no_minify_css,
        minify_html: false,
        minify_all: false,
        pretty: true,
        trim_css: true,
        fail_on_missing: false,
        base: true,
        verbose: cmd.artifact.verbose,
    };

    let (reload, _) = broadcast::channel(16);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let serve_opts = ServeOptions {
        dist_root: cfg.dist_root(),
        host: cmd.host,
        port: cmd.port,
        prefer_pretty: true,
        livereload: !cmd.no_livereload,
    };
    let serve_reload = reload.clone();
    // supervise the server: a bind failure must not be swallowed
    runtime.spawn(async move {
        if let Err(err) = serve::serve(serve_opts, serve_reload).await {
            report::error(TAG, &format!("preview server failed: {err:#}"));
        }
    });

    rebuild(&cfg, &reload);

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |event: notify::Result<notify::Event>| {
            if let Ok(event) = event
                && event.paths.iter().any(|p| is_relevant(p))
            {
                let _ = tx.send(());
            }
        },
        notify::Config::default(),
    )
    .context("failed to create file watcher")?;

    for root in watch_roots(&cfg) {
        if root.is_dir() {
            watcher
                .watch(&root, RecursiveMode::Recursive)
                .with_context(|| format!("failed to watch {}", root.display()))?;
            report::info(TAG, &format!("watching {}", root.display()));
        }
    }

    loop {
        // block for the first event, then drain the burst
        rx.recv().context("watch channel closed")?;
        drain_burst(&rx, DEBOUNCE);
        report::info(TAG, "change detected, rebuilding");
        rebuild(&cfg, &reload);
    }
}

fn rebuild(cfg: &BuildConfig, reload: &broadcast::Sender<()>) {
    match build::run_build(cfg) {
        Ok(()) => {
            let _ = reload.send(());
        }
        Err(err) => report::error(TAG, &format!("build failed: {err:#}")),
    }
}

fn watch_roots(cfg: &BuildConfig) -> Vec<PathBuf> {
    vec![
        cfg.mail_root().join("app"),
        cfg.project_root.join("vendor/helpers"),
        cfg.project_root.join("vendor/styles"),
        cfg.lang_dir_abs(),
    ]
}

/// Keep draining until the channel stays quiet for the full window.
fn drain_burst(rx: &mpsc::Receiver<()>, window: Duration) {
    while rx.recv_timeout(window).is_ok() {}
}

/// Editor noise (swap files, temp files, dotfiles) never triggers a
/// rebuild.
fn is_relevant(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || name.ends_with('~') || name.ends_with(".tmp") {
        return false;
    }
    if let Some((_, ext)) = name.rsplit_once('.')
        && ext.len() == 3
        && ext.starts_with("sw")
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Instant};

    use super::*;

    #[test]
    fn test_noise_files_are_ignored() {
        assert!(!is_relevant(Path::new("app/.index.hbs.kate-swp")));
        assert!(!is_relevant(Path::new("app/index.hbs~")));
        assert!(!is_relevant(Path::new("app/index.hbs.swp")));
        assert!(!is_relevant(Path::new("app/index.hbs.swo")));
        assert!(!is_relevant(Path::new("app/index.hbs.swx")));
        assert!(!is_relevant(Path::new("app/.DS_Store")));
        assert!(!is_relevant(Path::new("app/render.tmp")));
    }

    #[test]
    fn test_source_files_are_relevant() {
        assert!(is_relevant(Path::new("app/templates/index.hbs")));
        assert!(is_relevant(Path::new("app/styles/common.css")));
        assert!(is_relevant(Path::new("vendor/data/en/nav.json")));
        // "swift" sources are not swap files
        assert!(is_relevant(Path::new("app/notes.swift")));
    }

    #[test]
    fn test_burst_of_events_coalesces_into_one_rebuild() {
        let (tx, rx) = mpsc::channel();
        for _ in 0..10 {
            tx.send(()).unwrap();
        }
        let writer = thread::spawn(move || {
            for _ in 0..5 {
                thread::sleep(Duration::from_millis(5));
                let _ = tx.send(());
            }
        });

        // first recv is the loop's blocking wait
        rx.recv().unwrap();
        drain_burst(&rx, Duration::from_millis(50));
        writer.join().unwrap();

        // the burst is gone; the channel is quiet
        let start = Instant::now();
        assert!(rx.recv_timeout(Duration::from_millis(10)).is_err());
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
