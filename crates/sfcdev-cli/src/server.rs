//! HTTP server wrapping the serving pipeline.
//!
//! A single fallback route hands every request path to the middleware;
//! recognized shapes come back as JavaScript, everything else falls
//! through to plain static-file serving from the same root.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use sfcdev_core::{
    DefaultCompiler, DevMiddleware, NodeModulesLoader, ServeError, ServeOptions,
};
use tower_http::cors::{Any, CorsLayer};

use crate::cli::Cli;
use crate::error::{CliError, Result};
use crate::ui;

/// Shared application state.
pub struct AppState {
    pub middleware: DevMiddleware,
}

pub type SharedState = Arc<AppState>;

/// Development server.
pub struct DevServer {
    addr: SocketAddr,
    state: SharedState,
}

impl DevServer {
    /// Build a server from parsed CLI arguments.
    pub fn from_args(args: &Cli) -> Result<Self> {
        let root = std::fs::canonicalize(&args.root).map_err(|_| {
            CliError::InvalidArgument(format!(
                "root directory does not exist: {}",
                args.root.display()
            ))
        })?;

        let options = ServeOptions {
            cache: !args.no_cache,
            max_cache_weight: args.cache_weight,
            ..ServeOptions::default()
        };

        let middleware = DevMiddleware::new(
            &root,
            Arc::new(DefaultCompiler::new()),
            Arc::new(NodeModulesLoader::new(&root)),
            options,
        )?;

        let addr = find_available_port(args.port)?;

        Ok(Self {
            addr,
            state: Arc::new(AppState { middleware }),
        })
    }

    /// Start serving until ctrl-c.
    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .fallback(handle_request)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", self.addr, e)))?;

        ui::success(&format!("Dev server running at http://{}", self.addr));

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        ui::info("Shutting down");
    }
}

/// Try the requested port first, then the next ten.
fn find_available_port(requested_port: u16) -> Result<SocketAddr> {
    use std::net::TcpListener;

    for offset in 0..=10 {
        let port = requested_port.saturating_add(offset);
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        if TcpListener::bind(addr).is_ok() {
            if offset > 0 {
                ui::warning(&format!(
                    "Port {} is busy, using port {} instead",
                    requested_port, port
                ));
            }
            return Ok(addr);
        }
    }

    Err(CliError::InvalidArgument(format!(
        "ports {}-{} are all in use",
        requested_port,
        requested_port + 10
    )))
}

/// Handle every request: middleware first, static files second.
async fn handle_request(State(state): State<SharedState>, uri: Uri) -> Response {
    let path = uri.path();

    match state.middleware.handle(path).await {
        Ok(Some(out)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, out.content_type)
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from(out.body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Ok(None) => serve_static(&state, path).await,
        Err(err) => error_response(path, err),
    }
}

fn error_response(path: &str, err: ServeError) -> Response {
    let status = match &err {
        ServeError::Read { .. } | ServeError::PackageNotFound(_) => StatusCode::NOT_FOUND,
        ServeError::OutsideRoot(_) | ServeError::InvalidPackageName(_) => StatusCode::FORBIDDEN,
        ServeError::Compile { .. } | ServeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(path, %err, "request failed");

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(err.to_string()))
        .unwrap_or_else(|_| status.into_response())
}

/// Static fallback for paths the middleware passes through.
async fn serve_static(state: &AppState, path: &str) -> Response {
    let request_path = if path == "/" { "/index.html" } else { path };

    // Reuse the middleware's resolver so the traversal guard applies to
    // static files too.
    let file_path = match resolve_static(state, request_path) {
        Ok(p) => p,
        Err(response) => return response,
    };

    match tokio::fs::read(&file_path).await {
        Ok(content) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, determine_content_type(request_path))
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from(content))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(_) => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(format!("File not found: {}", path)))
            .unwrap_or_else(|_| StatusCode::NOT_FOUND.into_response()),
    }
}

fn resolve_static(state: &AppState, request_path: &str) -> std::result::Result<PathBuf, Response> {
    let root = state.middleware.root();
    let relative = request_path.trim_start_matches('/');
    let candidate = root.join(relative);

    // Lexical guard: the middleware's reader normalizes component and
    // script paths; here a simple component check keeps ".." out.
    if Path::new(relative)
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(Response::builder()
            .status(StatusCode::FORBIDDEN)
            .body(Body::from("Forbidden"))
            .unwrap_or_else(|_| StatusCode::FORBIDDEN.into_response()));
    }

    Ok(candidate)
}

/// Determine content type from file extension.
fn determine_content_type(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn state_for(temp: &TempDir) -> SharedState {
        let args = Cli::parse_from([
            "sfcdev",
            "--root",
            temp.path().to_str().unwrap(),
        ]);
        let server = DevServer::from_args(&args).unwrap();
        server.state
    }

    #[test]
    fn test_determine_content_type() {
        assert_eq!(determine_content_type("/a.js"), "application/javascript");
        assert_eq!(determine_content_type("/a.html"), "text/html; charset=utf-8");
        assert_eq!(determine_content_type("/a.css"), "text/css");
        assert_eq!(determine_content_type("/bin"), "application/octet-stream");
    }

    #[test]
    fn test_find_available_port_skips_busy_port() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let busy = listener.local_addr().unwrap().port();

        let addr = find_available_port(busy).unwrap();
        assert!(addr.port() > busy);
    }

    #[tokio::test]
    async fn test_static_fallback_serves_html() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.html"), "<html></html>").unwrap();

        let state = state_for(&temp);
        let response = serve_static(&state, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_static_fallback_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let state = state_for(&temp);

        let response = serve_static(&state, "/../secret.txt").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_static_fallback_missing_file_is_404() {
        let temp = TempDir::new().unwrap();
        let state = state_for(&temp);

        let response = serve_static(&state, "/nope.png").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
