//! Preview server with optional live reload

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::commands::build;
use crate::helpers::inject_before_body_end;
use crate::Shiori;

const LIVE_RELOAD_PATH: &str = "/__livereload";

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
"#;

/// Server state
struct ServerState {
    output_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

/// Build once and serve the output directory
pub async fn preview(shiori: &Shiori) -> Result<()> {
    shiori.build()?;
    start(shiori, false).await
}

/// Build, serve and rebuild on changes
pub async fn serve(shiori: &Shiori) -> Result<()> {
    shiori.build()?;
    start(shiori, true).await
}

async fn start(shiori: &Shiori, watch: bool) -> Result<()> {
    let (reload_tx, _) = broadcast::channel::<()>(16);
    let live_reload = watch && shiori.config.preview.live_reload;

    let state = Arc::new(ServerState {
        output_dir: shiori.output_dir.clone(),
        reload_tx: reload_tx.clone(),
        live_reload,
    });

    let mut app: Router<Arc<ServerState>> = Router::new();
    if live_reload {
        app = app.route(LIVE_RELOAD_PATH, get(livereload_handler));
    }
    let app = app
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if watch {
        let shiori = shiori.clone();
        // A plain thread: the runtime must not wait on the watcher when shutting down
        std::thread::Builder::new()
            .name("shiori-watch".to_string())
            .spawn(move || {
                let result = build::watch(&shiori, |_| {
                    // No subscribers is fine
                    let _ = reload_tx.send(());
                });
                if let Err(e) = result {
                    tracing::error!("File watcher error: {:#}", e);
                }
            })
            .context("Failed to start watcher thread")?;
    }

    let port = shiori.config.preview.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server running at http://localhost:{}", port);
    if live_reload {
        tracing::info!("Live reload enabled");
    }
    tracing::info!("Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// HTML page a request path maps to, if any
///
/// Segments are percent-decoded; `..` never escapes the output directory.
fn resolve_html(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(uri_path).decode_utf8().ok()?;
    let mut path = root.to_path_buf();
    for segment in decoded.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if segment == ".." || segment.contains('\\') {
            return None;
        }
        path.push(segment);
    }

    if path.is_dir() {
        path.push("index.html");
    }
    let is_html = path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);
    (is_html && path.is_file()).then_some(path)
}

/// Serves files, injecting the live reload script into HTML pages
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    if state.live_reload {
        if let Some(file_path) = resolve_html(&state.output_dir, request.uri().path()) {
            return match tokio::fs::read_to_string(&file_path).await {
                Ok(content) => Html(inject_before_body_end(&content, LIVE_RELOAD_SCRIPT))
                    .into_response(),
                Err(e) => {
                    tracing::debug!("Failed to read {:?}: {}", file_path, e);
                    (StatusCode::NOT_FOUND, "Not found").into_response()
                }
            };
        }
    }

    let mut service = ServeDir::new(&state.output_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!("Failed to serve file: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}
