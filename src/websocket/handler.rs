use crate::server::RelayServer;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;

const ROOT_BANNER: &str = "WebSocket Relay Server is running.";

/// Upgrade handler shared by `/` and `/ws`.
///
/// A plain HTTP GET without upgrade headers gets the banner instead of a 4xx.
pub async fn websocket_handler(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<RelayServer>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match ws {
        Ok(upgrade) => upgrade
            .on_failed_upgrade(|err| tracing::warn!(error = %err, "WebSocket upgrade failed"))
            .on_upgrade(move |socket| handle_socket(socket, server, addr)),
        Err(rejection) => {
            tracing::trace!(%addr, %rejection, "Plain HTTP request on WebSocket route");
            ROOT_BANNER.into_response()
        }
    }
}
