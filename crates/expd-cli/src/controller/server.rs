//! Local HTTP server: manifest routes plus a reverse proxy to the bundler.

use crate::controller::manifest::ManifestContext;
use crate::error::{CliError, ManifestError, Result};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

/// Header selecting the bundle platform.
pub const PLATFORM_HEADER: &str = "exponent-platform";

/// Header asking for a signed manifest.
pub const ACCEPT_SIGNATURE_HEADER: &str = "exponent-accept-signature";

/// Platform used when the request names none.
pub const DEFAULT_PLATFORM: &str = "ios";

/// Largest request body forwarded to the bundler.
const MAX_FORWARD_BODY: usize = 64 * 1024 * 1024;

/// How long open connections get to finish before the server is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

type SharedContext = Arc<ManifestContext>;

/// Build the router for one server instance.
pub fn router(context: SharedContext) -> Router {
    Router::new()
        .route("/", get(handle_manifest))
        .route("/manifest", get(handle_manifest))
        .route("/index.exp", get(handle_manifest))
        .route("/bundle", any(handle_bundle))
        .route("/map", any(handle_map))
        // Everything else goes to the bundler untouched
        .fallback(handle_forward)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(context)
}

async fn handle_manifest(State(context): State<SharedContext>, headers: HeaderMap) -> Response {
    let accept_signature = headers.contains_key(ACCEPT_SIGNATURE_HEADER);
    match context.respond(accept_signature).await {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e @ ManifestError::ProjectUnreadable { .. }) => {
            error!("{}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!("{}", e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

async fn handle_bundle(State(context): State<SharedContext>, request: Request) -> Response {
    let target = rewrite_target(&context.main_module, "bundle", &request);
    forward(&context, request, target).await
}

async fn handle_map(State(context): State<SharedContext>, request: Request) -> Response {
    let target = rewrite_target(&context.main_module, "map", &request);
    forward(&context, request, target).await
}

async fn handle_forward(State(context): State<SharedContext>, request: Request) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    forward(&context, request, target).await
}

fn rewrite_target(main_module: &str, extension: &str, request: &Request) -> String {
    let platform = request
        .headers()
        .get(PLATFORM_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_PLATFORM);
    bundler_path(main_module, extension, request.uri().query(), platform)
}

/// `/<main>.<ext>?<query>&platform=<platform>`; the query part is omitted
/// when empty.
pub fn bundler_path(
    main_module: &str,
    extension: &str,
    query: Option<&str>,
    platform: &str,
) -> String {
    let mut path = format!("/{}.{}?", main_module, extension);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        path.push_str(query);
        path.push('&');
    }
    path.push_str("platform=");
    path.push_str(platform);
    path
}

async fn forward(context: &ManifestContext, request: Request, target: String) -> Response {
    let url = format!("{}{}", context.packager_url(), target);
    debug!("Forwarding {} {}", request.method(), url);

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_FORWARD_BODY).await {
        Ok(body) => body,
        Err(e) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response();
        }
    };

    let upstream = context
        .client
        .request(parts.method, &url)
        .headers(strip_hop_by_hop(&parts.headers, true))
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(response) => response,
        Err(e) => {
            warn!("Packager unreachable at {}: {}", url, e);
            return (
                StatusCode::BAD_GATEWAY,
                format!("Packager unreachable: {}", e),
            )
                .into_response();
        }
    };

    let status = upstream.status();
    let headers = strip_hop_by_hop(upstream.headers(), false);
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn strip_hop_by_hop(headers: &HeaderMap, strip_host: bool) -> HeaderMap {
    let mut headers = headers.clone();
    for name in HOP_BY_HOP {
        headers.remove(HeaderName::from_static(name));
    }
    if strip_host {
        headers.remove(header::HOST);
    }
    headers
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The local HTTP listener, restartable in place.
#[derive(Default)]
pub struct LocalServer {
    running: Mutex<Option<RunningServer>>,
}

impl LocalServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `bind:<context.ports.port>` and serve, shutting down any
    /// previous instance first.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Server`] if the address can't be bound.
    pub async fn start(&self, bind: IpAddr, context: SharedContext) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            info!("Waiting for server to close...");
            shutdown(previous).await;
            info!("Closed server; restarting...");
        }

        let addr = SocketAddr::new(bind, context.ports.port);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))?;
        let addr = listener.local_addr()?;

        let app = router(context);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        });

        info!("Local server listening at http://{}", addr);
        *running = Some(RunningServer {
            addr,
            shutdown: shutdown_tx,
            task,
        });
        Ok(addr)
    }

    /// Shut the server down and wait for it. No-op when not running.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            shutdown(previous).await;
            info!("Local server stopped");
        }
    }

    /// Address of the running server.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|server| server.addr)
    }
}

async fn shutdown(server: RunningServer) {
    let _ = server.shutdown.send(());
    let mut task = server.task;
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Server task ended abnormally: {}", e),
        Err(_) => {
            warn!("Connections still open after {:?}; aborting server", SHUTDOWN_GRACE);
            task.abort();
            // Dropping the aborted task releases the listener
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundler_path_with_query() {
        assert_eq!(
            bundler_path("index", "bundle", Some("dev=true&minify=false"), "android"),
            "/index.bundle?dev=true&minify=false&platform=android"
        );
    }

    #[test]
    fn test_bundler_path_without_query() {
        assert_eq!(
            bundler_path("app/main", "map", None, "ios"),
            "/app/main.map?platform=ios"
        );
        assert_eq!(
            bundler_path("index", "bundle", Some(""), "ios"),
            "/index.bundle?platform=ios"
        );
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "localhost:19000".parse().unwrap());
        headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        headers.insert(header::ACCEPT, "*/*".parse().unwrap());

        let stripped = strip_hop_by_hop(&headers, true);
        assert!(stripped.get(header::HOST).is_none());
        assert!(stripped.get(header::CONNECTION).is_none());
        assert_eq!(stripped.get(header::ACCEPT).unwrap(), "*/*");

        let kept = strip_hop_by_hop(&headers, false);
        assert!(kept.get(header::HOST).is_some());
    }
}
