//! WebSocket handler: one chat session per socket, in-band `authenticate` handshake, outbound
//! frames drained from the connection's channel.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use std::sync::Arc;
use tracing::Instrument;

use crate::chat::{ChatHub, ChatSession};
use crate::error::ChatError;
use crate::ws_registry::ConnectionEntry;
use crate::AppState;

/// Outbound frames buffered per connection before broadcasts to it start dropping.
const OUTBOUND_BUFFER: usize = 64;

/// GET /ws — Upgrade to a chat socket. Authentication happens in-band, not at upgrade time.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let hub = state.chat.clone();
    // Anything bigger cannot hold a body the length check would accept.
    let limit = hub.max_frame_bytes();
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| {
            let (entry, rx) = ConnectionEntry::open(OUTBOUND_BUFFER);
            let span = tracing::info_span!("ws", conn_id = entry.conn_id);
            handle_socket(socket, hub, entry, rx).instrument(span)
        })
}

async fn handle_socket(
    mut socket: WebSocket,
    hub: Arc<ChatHub>,
    entry: Arc<ConnectionEntry>,
    mut rx: tokio::sync::mpsc::Receiver<String>,
) {
    hub.metrics().ws_connections_open.inc();
    tracing::info!("ws connection established");
    let mut session = ChatSession::new(entry);

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        session.handle_text(&hub, text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        session.reply_error(&hub, &ChatError::MalformedFrame);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "ws read failed");
                        break;
                    }
                    // Ping/pong is answered by the transport.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    session.disconnect(&hub);
    hub.metrics().ws_connections_open.dec();
}
