//! HTTP server implementation using Axum.

use crate::handler::{handle_health, handle_rpc};
use crate::ws::handle_ws;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use view_event::{LocalHost, RouteObserver};

/// Application state shared across handlers.
pub struct AppState {
    /// The in-process host the observer is installed on
    pub host: Arc<LocalHost>,
    /// Route observer installed on `host`
    pub observer: Arc<RouteObserver>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .route("/ws", get(handle_ws))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    host: Arc<LocalHost>,
    observer: Arc<RouteObserver>,
    bind_host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState { host, observer });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind_host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use view_event::ObserverConfig;

    #[tokio::test]
    async fn test_server_starts() {
        let host = Arc::new(LocalHost::new());
        let observer = RouteObserver::install(&host, ObserverConfig::default()).unwrap();

        let addr = start_server(host, observer, "127.0.0.1", 0).await.unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_rejects_bad_bind_address() {
        let host = Arc::new(LocalHost::new());
        let observer = RouteObserver::install(&host, ObserverConfig::default()).unwrap();

        assert!(start_server(host, observer, "not an address", 0).await.is_err());
    }
}
