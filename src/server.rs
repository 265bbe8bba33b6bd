//! Development server: static files from the output root plus live reload.
//!
//! ```text
//! GET /anything        → ServeDir(output root), index.html for directories
//! GET /__livereload    → WebSocket; receives {"command":"reload",...}
//! ```
//!
//! HTML responses get [`RELOAD_SCRIPT`] inserted before `</body>`. A
//! debounced watcher on the output root feeds a [`ReloadHub`], which fans the
//! change out to every connected browser.

use crate::transform::{Context, StepOutput, Transform, TransformError};
use crate::watch::{root_prefixes, strip_root, watch_dirs};
use axum::Router;
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::future::BoxFuture;
use notify_debouncer_mini::DebounceEventResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// WebSocket endpoint the injected client connects to.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Client injected into every served HTML page.
pub const RELOAD_SCRIPT: &str = r#"<script>
(() => {
  const url = (location.protocol === "https:" ? "wss://" : "ws://") + location.host + "/__livereload";
  const connect = () => {
    const socket = new WebSocket(url);
    socket.onmessage = (event) => {
      const message = JSON.parse(event.data);
      if (message.command === "reload") location.reload();
    };
    socket.onclose = () => setTimeout(connect, 1000);
  };
  connect();
})();
</script>
"#;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server stopped: {0}")]
    Serve(#[source] std::io::Error),
}

/// Message pushed to browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ReloadMessage {
    Reload { paths: Vec<String> },
}

/// Broadcast point between the output watcher and connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Tell every client to reload. Returns how many were listening.
    pub fn notify(&self, paths: Vec<String>) -> usize {
        self.sender
            .send(ReloadMessage::Reload { paths })
            .unwrap_or(0)
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the dev-server router over `output_root`.
pub fn router(output_root: &Path, hub: ReloadHub) -> Router {
    Router::new()
        .route(LIVERELOAD_PATH, get(livereload))
        .with_state(hub)
        .fallback_service(ServeDir::new(output_root))
        .layer(middleware::from_fn(inject_reload_script))
        .layer(TraceLayer::new_for_http())
}

async fn livereload(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> Response {
    let updates = hub.subscribe();
    ws.on_upgrade(move |socket| push_reloads(socket, updates))
}

async fn push_reloads(mut socket: WebSocket, mut updates: broadcast::Receiver<ReloadMessage>) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(message) => {
                    let Ok(text) = serde_json::to_string(&message) else {
                        continue;
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("livereload: client lagged by {skipped} messages");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn inject_reload_script(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html || response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("livereload: cannot buffer HTML response: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let html = inject_script(&bytes, RELOAD_SCRIPT);
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Insert `script` before the last `</body>` (any case), or append it.
///
/// Works on raw bytes, so pages in any ASCII-compatible encoding come back
/// unchanged apart from the script.
pub fn inject_script(html: &[u8], script: &str) -> Vec<u8> {
    const CLOSE_BODY: &[u8] = b"</body>";
    let at = html
        .windows(CLOSE_BODY.len())
        .rposition(|w| w.eq_ignore_ascii_case(CLOSE_BODY))
        .unwrap_or(html.len());
    let mut out = Vec::with_capacity(html.len() + script.len());
    out.extend_from_slice(&html[..at]);
    out.extend_from_slice(script.as_bytes());
    out.extend_from_slice(&html[at..]);
    out
}

/// Long-running leaf serving the output root until the process ends.
#[derive(Debug, Clone, Default)]
pub struct ServerTransform {
    hub: ReloadHub,
}

impl ServerTransform {
    pub fn new() -> Self {
        Self::default()
    }

    async fn serve(&self, ctx: &Context) -> Result<StepOutput, TransformError> {
        let output = ctx.output_root();
        tokio::fs::create_dir_all(&output)
            .await
            .map_err(TransformError::io(&output))?;

        let addr = ctx.config().server.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let debounce = Duration::from_millis(ctx.config().watch.debounce_ms);
        let (_debouncer, changes) = watch_dirs(std::slice::from_ref(&output), debounce)?;
        let forwarder = tokio::spawn(forward_changes(
            changes,
            root_prefixes(&output),
            self.hub.clone(),
        ));

        tracing::info!("server: serving {} at http://{addr}", output.display());
        let served = axum::serve(listener, router(&output, self.hub.clone())).await;
        forwarder.abort();
        served.map_err(ServerError::Serve)?;
        Ok(StepOutput::default())
    }
}

impl Transform for ServerTransform {
    fn name(&self) -> &str {
        "server"
    }

    fn run<'a>(&'a self, ctx: &'a Context) -> BoxFuture<'a, Result<StepOutput, TransformError>> {
        Box::pin(self.serve(ctx))
    }
}

async fn forward_changes(
    mut changes: UnboundedReceiver<DebounceEventResult>,
    prefixes: Vec<PathBuf>,
    hub: ReloadHub,
) {
    while let Some(batch) = changes.recv().await {
        match batch {
            Ok(batch) => {
                let paths: Vec<String> = batch
                    .iter()
                    .filter_map(|event| strip_root(&prefixes, &event.path))
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .collect();
                let clients = hub.notify(paths);
                tracing::debug!("server: output changed, reloading {clients} clients");
            }
            Err(e) => tracing::warn!("server: {e}"),
        }
    }
}
