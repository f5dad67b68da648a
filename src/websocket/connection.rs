use crate::protocol::{ErrorCode, ServerMessage};
use crate::server::{RelayServer, SignalingSession};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::sending::{send_immediate_server_message, send_text_message};

/// Drive one upgraded socket until either direction ends.
///
/// The writer drains the connection's bounded outbound queue on its own task;
/// the reader runs inline so it can own the session and hand it back for the
/// close transition.
pub(super) async fn handle_socket(socket: WebSocket, server: Arc<RelayServer>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let capacity = server.config().outbound_queue_capacity.max(1);
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(capacity);

    let mut session = match server.register_client(tx, addr) {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(%addr, error = %err, "Rejecting WebSocket connection");
            let rejection = ServerMessage::error(err.error_code());
            if let Err(send_err) = send_immediate_server_message(&mut sender, &rejection).await {
                tracing::debug!(%addr, error = %send_err, "Failed to deliver admission error");
            }
            let _ = sender.close().await;
            return;
        }
    };
    let connection_id = session.id();
    tracing::debug!(%connection_id, %addr, "WebSocket connection established");

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if send_text_message(&mut sender, &message, &connection_id)
                .await
                .is_err()
            {
                break;
            }
        }
        let _ = sender.close().await;
    });

    tokio::select! {
        () = read_frames(&server, &mut session, &mut receiver) => {
            tracing::debug!(%connection_id, "Reader finished");
        }
        _ = &mut send_task => {
            tracing::debug!(%connection_id, "Writer finished");
        }
    }

    server.unregister_client(&mut session);
    send_task.abort();
    tracing::debug!(%connection_id, "WebSocket connection closed");
}

async fn read_frames(
    server: &RelayServer,
    session: &mut SignalingSession,
    receiver: &mut SplitStream<WebSocket>,
) {
    let max_size = server.config().max_message_size;

    while let Some(frame) = receiver.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(err) => {
                server.metrics().increment_websocket_errors();
                tracing::debug!(connection_id = %session.id(), error = %err, "WebSocket read error");
                break;
            }
        };

        match message {
            Message::Text(text) => server.handle_text(session, text.as_str()).await,
            Message::Binary(bytes) => {
                if bytes.len() > max_size {
                    tracing::debug!(
                        connection_id = %session.id(),
                        size = bytes.len(),
                        max = max_size,
                        "Binary frame exceeds size limit"
                    );
                    server.reject(session, ErrorCode::MessageTooLarge);
                    continue;
                }
                match std::str::from_utf8(&bytes) {
                    Ok(text) => server.handle_text(session, text).await,
                    Err(err) => {
                        tracing::debug!(connection_id = %session.id(), error = %err, "Binary frame is not UTF-8");
                        server.reject(session, ErrorCode::InvalidMessageFormat);
                    }
                }
            }
            // axum answers pings itself
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(frame) => {
                tracing::debug!(connection_id = %session.id(), ?frame, "Client sent close frame");
                break;
            }
        }
    }
}
