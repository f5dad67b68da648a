use crate::config::SecurityConfig;
use crate::protocol::StatusReport;
use crate::server::RelayServer;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handler::websocket_handler;
use super::metrics::{metrics_handler, prometheus_metrics_handler};

/// Create the Axum router with WebSocket support
pub fn create_router(security: &SecurityConfig) -> axum::Router<Arc<RelayServer>> {
    let cors = match security.allowed_origins() {
        None => CorsLayer::permissive(),
        Some(configured) => {
            let origins: Vec<HeaderValue> = configured
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!("No valid CORS origins configured, using permissive CORS");
                CorsLayer::permissive()
            } else {
                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
    };

    axum::Router::new()
        .route("/", get(websocket_handler))
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .route("/metrics/prom", get(prometheus_metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Router with the server attached as state.
pub fn build_app(server: Arc<RelayServer>, security: &SecurityConfig) -> axum::Router {
    create_router(security).with_state(server)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn status_handler(State(server): State<Arc<RelayServer>>) -> Json<StatusReport> {
    Json(server.status())
}

/// Serve `server` on `addr` until the listener fails.
pub async fn run_server(
    addr: SocketAddr,
    server: Arc<RelayServer>,
    security: &SecurityConfig,
) -> anyhow::Result<()> {
    let app = build_app(server, security);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %security.cors_origins,
        "Signal relay listening - WebSocket on / and /ws, status on /status, metrics on /metrics"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
