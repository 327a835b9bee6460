use serde::Deserialize;

use crate::{
    common::types::{DestinationId, SessionId},
    protocol::events::OutgoingMessage,
    server::{AppState, notifier::Origin},
};

/// Command frames a client sends over the WebSocket.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum IncomingMessage {
    /// Queue a track; joins `destination` first when not connected.
    Play {
        session_id: SessionId,
        query: String,
        destination: Option<DestinationId>,
    },
    Skip {
        session_id: SessionId,
    },
    Stop {
        session_id: SessionId,
    },
    Pause {
        session_id: SessionId,
    },
    Resume {
        session_id: SessionId,
    },
    Join {
        session_id: SessionId,
        destination: DestinationId,
    },
    Leave {
        session_id: SessionId,
    },
    Stay {
        session_id: SessionId,
        destination: Option<DestinationId>,
    },
    Unstay {
        session_id: SessionId,
    },
    Queue {
        session_id: SessionId,
    },
}

impl IncomingMessage {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::Play { session_id, .. }
            | Self::Skip { session_id }
            | Self::Stop { session_id }
            | Self::Pause { session_id }
            | Self::Resume { session_id }
            | Self::Join { session_id, .. }
            | Self::Leave { session_id }
            | Self::Stay { session_id, .. }
            | Self::Unstay { session_id }
            | Self::Queue { session_id } => session_id,
        }
    }
}

/// Runs one command frame. `origin.reply` becomes the session's reply target.
pub async fn handle_op(op: IncomingMessage, state: &AppState, origin: Origin) -> OutgoingMessage {
    let session_id = op.session_id().clone();
    tracing::debug!("[{}] handling {:?}", session_id, op);

    let status = match op {
        IncomingMessage::Play {
            query, destination, ..
        } => {
            let origin = Origin {
                destination: destination.or(origin.destination),
                ..origin
            };
            state.enqueue(&session_id, &query, origin).await
        }
        IncomingMessage::Join { destination, .. } => {
            state.join(&session_id, &destination, origin).await
        }
        IncomingMessage::Stay { destination, .. } => {
            state.set_stay(&session_id, true, destination, origin).await
        }
        IncomingMessage::Unstay { .. } => {
            state.remember_origin(&session_id, &origin).await;
            state.set_stay(&session_id, false, None, origin).await
        }
        IncomingMessage::Leave { .. } => state.leave(&session_id).await,
        other => {
            state.remember_origin(&session_id, &origin).await;
            match other {
                IncomingMessage::Skip { .. } => state.skip(&session_id).await,
                IncomingMessage::Stop { .. } => state.stop(&session_id).await,
                IncomingMessage::Pause { .. } => state.pause(&session_id).await,
                IncomingMessage::Resume { .. } => state.resume(&session_id).await,
                _ => return OutgoingMessage::State(state.query_state(&session_id).await),
            }
        }
    };

    OutgoingMessage::reply(session_id, status)
}
