use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;

use crate::model::tick::StreamFrame;
use crate::relay::TickRelay;

/// GET /ws upgrade; each connection becomes one relay subscriber.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(relay): State<Arc<TickRelay>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

/// Pump relay frames to one socket. Sends the greeting, registers the
/// subscriber, forwards frames until either side goes away, then
/// unsubscribes. Inbound client messages are read and discarded.
async fn handle_socket(mut socket: WebSocket, relay: Arc<TickRelay>) {
    let snap = relay.snapshot();
    let hello = StreamFrame::Info {
        message: format!("connected to {} tick stream", relay.symbol()),
        mode: snap.mode,
    };
    match serde_json::to_string(&hello) {
        Ok(json) => {
            if socket.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode greeting frame");
            return;
        }
    }

    let (id, mut frames) = relay.subscribe();
    tracing::debug!(subscriber_id = id, "Streaming subscriber connected");

    loop {
        tokio::select! {
            frame = frames.recv() => {
                // The relay dropped this subscriber after a failed delivery.
                let Some(frame) = frame else { break };
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to encode stream frame");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    relay.unsubscribe(id);
    tracing::debug!(subscriber_id = id, "Streaming subscriber disconnected");
}
