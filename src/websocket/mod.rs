// WebSocket module - axum transport for the signaling relay
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: per-connection reader/writer tasks
// - sending: message serialization and sending functions
// - routes: HTTP route setup (root, ws, health, status, metrics)
// - metrics: metrics endpoints and authentication
// - prometheus: Prometheus metrics rendering

mod connection;
mod handler;
mod metrics;
mod prometheus;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use metrics::{metrics_handler, prometheus_metrics_handler};
pub use routes::{build_app, create_router, run_server};
