//! Preview server.
//!
//! Serves the distribution tree for review in a browser. Directory
//! requests resolve to `index.pretty.html` (when preferred and present)
//! or `index.html`. Responses are never cached so rapid rebuilds show
//! up immediately.
//!
//! Live reload is a broadcast with no delivery guarantee: clients
//! subscribe to `GET /__livereload` (server-sent events) and the dev
//! loop fans a reload signal out with `POST /__livereload/trigger`.
//! A slow subscriber that lags the channel just misses signals.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::stream::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::report;

const TAG: &str = "serve";

const LIVERELOAD_SNIPPET: &str = r#"<script>
(() => {
  try {
    const es = new EventSource('/__livereload');
    es.onmessage = (e) => {
      if (e && e.data === 'reload') location.reload();
    };
  } catch (e) {}
})();
</script>"#;

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub dist_root: PathBuf,
    pub host: String,
    pub port: u16,
    pub prefer_pretty: bool,
    pub livereload: bool,
}

struct ServeState {
    opts: ServeOptions,
    reload: broadcast::Sender<()>,
}

/// Run the server on its own runtime, blocking the calling thread.
pub fn run(opts: ServeOptions) -> Result<()> {
    let (reload, _) = broadcast::channel(16);
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(opts, reload))
}

/// Serve until the process exits. The reload sender is shared with the
/// dev loop so in-process rebuilds can fan out without an HTTP hop.
pub async fn serve(opts: ServeOptions, reload: broadcast::Sender<()>) -> Result<()> {
    let addr = format!("{}:{}", opts.host, opts.port);
    report::info(TAG, &format!("dist: {}", opts.dist_root.display()));
    report::info(
        TAG,
        &format!(
            "http://{addr}/ (prefer_pretty={}, livereload={})",
            opts.prefer_pretty, opts.livereload
        ),
    );

    let state = Arc::new(ServeState { opts, reload });
    let app = Router::new()
        .route("/__livereload", get(livereload_subscribe))
        .route("/__livereload/trigger", post(livereload_trigger))
        .fallback(get(serve_path))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn livereload_subscribe(
    State(state): State<Arc<ServeState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, StatusCode> {
    if !state.opts.livereload {
        return Err(StatusCode::NOT_FOUND);
    }
    let stream = BroadcastStream::new(state.reload.subscribe())
        .filter_map(|msg| async move { msg.ok().map(|_| Ok(Event::default().data("reload"))) });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn livereload_trigger(State(state): State<Arc<ServeState>>) -> StatusCode {
    if !state.opts.livereload {
        return StatusCode::NOT_FOUND;
    }
    // no receivers is fine, the signal is best-effort
    let _ = state.reload.send(());
    StatusCode::NO_CONTENT
}

async fn serve_path(State(state): State<Arc<ServeState>>, uri: Uri) -> Response {
    let Some(file) = resolve_path(&state.opts, uri.path()) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    let content_type = content_type_for(&file);
    let Ok(bytes) = tokio::fs::read(&file).await else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    let body = if content_type.starts_with("text/html") && state.opts.livereload {
        Body::from(inject_livereload(&String::from_utf8_lossy(&bytes)))
    } else {
        Body::from(bytes)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        // avoid stale content during rapid rebuilds
        .header(header::CACHE_CONTROL, "no-store, max-age=0")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Map a request path to a file under the dist root.
///
/// Rejects traversal outside the root, resolves directories to the
/// preferred index file, and returns `None` for anything that does not
/// exist.
fn resolve_path(opts: &ServeOptions, request_path: &str) -> Option<PathBuf> {
    let mut resolved = opts.dist_root.clone();
    for part in request_path.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            part => resolved.push(part),
        }
    }

    let meta = std::fs::metadata(&resolved).ok()?;
    if meta.is_dir() {
        if opts.prefer_pretty {
            let pretty = resolved.join("index.pretty.html");
            if pretty.is_file() {
                return Some(pretty);
            }
        }
        let compact = resolved.join("index.html");
        return compact.is_file().then_some(compact);
    }
    Some(resolved)
}

fn content_type_for(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

fn inject_livereload(html: &str) -> String {
    if let Some(idx) = html.rfind("</body>") {
        format!("{}{}\n{}", &html[..idx], LIVERELOAD_SNIPPET, &html[idx..])
    } else {
        format!("{html}\n{LIVERELOAD_SNIPPET}\n")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn opts(root: &std::path::Path, prefer_pretty: bool) -> ServeOptions {
        ServeOptions {
            dist_root: root.to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            prefer_pretty,
            livereload: true,
        }
    }

    #[test]
    fn test_directory_resolves_to_preferred_index() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("NEWS/mail-weekly/en");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("index.html"), "compact").unwrap();
        fs::write(dir.join("index.pretty.html"), "pretty").unwrap();

        let pretty = resolve_path(&opts(tmp.path(), true), "/NEWS/mail-weekly/en/").unwrap();
        assert!(pretty.ends_with("index.pretty.html"));

        let compact = resolve_path(&opts(tmp.path(), false), "/NEWS/mail-weekly/en/").unwrap();
        assert!(compact.ends_with("index.html"));
    }

    #[test]
    fn test_directory_without_pretty_falls_back_to_compact() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("en");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("index.html"), "compact").unwrap();

        let resolved = resolve_path(&opts(tmp.path(), true), "/en").unwrap();
        assert!(resolved.ends_with("index.html"));
    }

    #[test]
    fn test_traversal_is_rejected() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(resolve_path(&opts(tmp.path(), true), "/../secret"), None);
        assert_eq!(resolve_path(&opts(tmp.path(), true), "/a/../../x"), None);
    }

    #[test]
    fn test_missing_path_is_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(resolve_path(&opts(tmp.path(), true), "/nope.css"), None);
    }

    #[test]
    fn test_busy_port_is_a_bind_error() {
        let tmp = TempDir::new().unwrap();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = taken.local_addr().unwrap().port();

            let mut opts = opts(tmp.path(), true);
            opts.port = port;
            let (reload, _) = broadcast::channel(1);
            let err = serve(opts, reload).await.unwrap_err();
            assert!(format!("{err:#}").contains("bind"), "{err:#}");
        });
    }

    #[test]
    fn test_livereload_injection_before_body_close() {
        let out = inject_livereload("<html><body>x</body></html>");
        let script = out.find("EventSource").unwrap();
        let body_close = out.find("</body>").unwrap();
        assert!(script < body_close);

        // fragments without a body still get the snippet
        let out = inject_livereload("<p>x</p>");
        assert!(out.contains("EventSource"));
    }
}
