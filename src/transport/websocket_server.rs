use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use tracing::{error, info, warn};

use crate::{
    common::types::AnyResult,
    protocol::{events::OutgoingMessage, opcodes::{IncomingMessage, handle_op}},
    server::{AppState, notifier::{Notifier, Origin}},
};

/// Reply target backed by one open socket. Sessions only hold it weakly, so
/// notices stop once the socket closes.
pub struct WsNotifier {
    tx: flume::Sender<Message>,
}

impl WsNotifier {
    fn push(&self, message: &OutgoingMessage) -> AnyResult<()> {
        let json = serde_json::to_string(message)?;
        self.tx
            .send(Message::Text(json.into()))
            .map_err(|_| "socket closed")?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for WsNotifier {
    async fn send(&self, text: &str) -> AnyResult<()> {
        self.push(&OutgoingMessage::Notice {
            text: text.to_owned(),
        })
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

pub async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let connection_id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = flume::unbounded();
    let notifier = Arc::new(WsNotifier { tx });
    let reply_target: Arc<dyn Notifier> = notifier.clone();
    info!("WebSocket connected: connection={}", connection_id);

    if let Err(e) = notifier.push(&OutgoingMessage::Ready {
        connection_id: connection_id.clone(),
    }) {
        error!("Failed to queue ready frame: connection={} err={}", connection_id, e);
        return;
    }

    loop {
        tokio::select! {
            Ok(msg) = rx.recv_async() => {
                if let Err(e) = socket.send(msg).await {
                    error!("Socket send error: connection={} err={}", connection_id, e);
                    break;
                }
            }
            msg = socket.recv() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("WebSocket error: connection={} err={}", connection_id, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        let reply = match serde_json::from_str::<IncomingMessage>(text.as_str()) {
                            Ok(op) => {
                                let origin = Origin::new(None, Some(&reply_target));
                                handle_op(op, &state, origin).await
                            }
                            Err(e) => {
                                warn!("Invalid frame on connection={}: {}", connection_id, e);
                                OutgoingMessage::Invalid {
                                    message: e.to_string(),
                                }
                            }
                        };
                        if let Err(e) = notifier.push(&reply) {
                            error!("Failed to queue reply: connection={} err={}", connection_id, e);
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket closed: connection={}", connection_id);
}
