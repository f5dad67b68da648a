use crate::protocol::{ConnectionId, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

/// Write a message straight to the socket, bypassing the outbound queue.
///
/// Used before a connection is registered (admission rejection).
pub(super) async fn send_immediate_server_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize server message");
            "{\"type\":\"error\",\"message\":\"internal error\"}".to_string()
        }
    };

    sender.send(Message::Text(payload.into())).await
}

/// Serialize one queued message and write it as a text frame.
///
/// `Err` means the socket is gone and the writer should stop; serialization
/// failures only skip the message.
pub(super) async fn send_text_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
    connection_id: &ConnectionId,
) -> Result<(), ()> {
    let json_message = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(%connection_id, kind = message.kind(), "Failed to serialize message: {}", e);
            return Ok(());
        }
    };

    if sender
        .send(Message::Text(json_message.into()))
        .await
        .is_err()
    {
        tracing::debug!(%connection_id, "Failed to send message, connection closed");
        return Err(());
    }

    Ok(())
}
