use serde::Serialize;

use crate::{common::types::SessionId, player::SessionSnapshot, protocol::models::CommandStatus};

/// Messages sent from server to client over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum OutgoingMessage {
    #[serde(rename_all = "camelCase")]
    Ready { connection_id: String },
    /// Answer to one command frame.
    #[serde(rename_all = "camelCase")]
    Reply {
        session_id: SessionId,
        #[serde(flatten)]
        status: CommandStatus,
        message: String,
    },
    /// Answer to a `queue` frame.
    State(SessionSnapshot),
    /// Unsolicited news about a session, e.g. the next track starting.
    Notice { text: String },
    /// A frame that could not be understood.
    Invalid { message: String },
}

impl OutgoingMessage {
    pub fn reply(session_id: SessionId, status: CommandStatus) -> Self {
        Self::Reply {
            message: status.to_string(),
            session_id,
            status,
        }
    }
}
