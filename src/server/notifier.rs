use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    common::types::{AnyResult, DestinationId},
    player::SessionState,
};

/// The conversation a command came from. Notices about the session go back
/// to the most recent one.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> AnyResult<()>;
}

/// Where a command came from.
#[derive(Clone, Default)]
pub struct Origin {
    /// Destination the requester is in, used to join on demand.
    pub destination: Option<DestinationId>,
    pub reply: Option<Weak<dyn Notifier>>,
}

impl Origin {
    pub fn new(destination: Option<DestinationId>, reply: Option<&Arc<dyn Notifier>>) -> Self {
        Self {
            destination,
            reply: reply.map(Arc::downgrade),
        }
    }
}

/// Best-effort notice to the session's reply target. Never holds the
/// target alive and never blocks the caller.
pub fn notify(state: &SessionState, text: String) {
    let Some(target) = state.reply_target.as_ref().and_then(Weak::upgrade) else {
        debug!("[{}] no reply target for notice: {}", state.session_id, text);
        return;
    };
    let session_id = state.session_id.clone();
    tokio::spawn(async move {
        if let Err(e) = target.send(&text).await {
            warn!("[{}] failed to deliver notice: {}", session_id, e);
        }
    });
}
