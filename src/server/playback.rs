use tracing::{debug, info, warn};

use crate::{
    common::types::SessionId,
    player::{Advance, SessionSnapshot, SessionState, manager},
    protocol::models::{CommandStatus, Conflict, Done},
    server::{app_state::AppState, notifier::Origin},
};

impl AppState {
    /// Records where replies for this session should go.
    pub async fn remember_origin(&self, session_id: &SessionId, origin: &Origin) {
        let entry = self.registry.get_or_create(session_id);
        entry.lock().await.remember_reply(origin.reply.clone());
    }

    /// Resolves `query` and appends it to the queue, joining the origin's
    /// destination first when the session has no connection.
    pub async fn enqueue(
        &self,
        session_id: &SessionId,
        query: &str,
        origin: Origin,
    ) -> CommandStatus {
        let entry = self.registry.get_or_create(session_id);

        let (connected, reconnect_pending) = {
            let mut state = entry.lock().await;
            state.remember_reply(origin.reply.clone());
            (
                state.is_connected(),
                state.stay_active && state.last_destination.is_some(),
            )
        };

        if !connected {
            match &origin.destination {
                Some(destination) => {
                    let joined = self.join(session_id, destination, origin.clone()).await;
                    if !joined.is_ok() && !matches!(joined, CommandStatus::AlreadyInState(_)) {
                        return joined;
                    }
                }
                None if reconnect_pending => {
                    debug!("[{}] queueing while the reconnect is pending", session_id);
                }
                None => return CommandStatus::NotConnected,
            }
        }

        let generation = {
            let mut state = entry.lock().await;
            state.pending_resolves += 1;
            state.generation
        };

        let resolved = self.resolver.resolve(query).await;

        let mut state = entry.lock().await;
        state.pending_resolves = state.pending_resolves.saturating_sub(1);

        let track = match resolved {
            Ok(track) => track,
            Err(e) => {
                warn!("[{}] could not resolve `{}`: {}", session_id, query, e);
                return CommandStatus::from(e);
            }
        };
        if state.generation != generation {
            info!(
                "[{}] dropping {}: session was reset while resolving",
                session_id, track.title
            );
            return CommandStatus::AlreadyInState(Conflict::Superseded);
        }

        let was_empty = state.queue.is_empty();
        state.queue.push_back(track.clone());
        debug!("[{}] queued {} at {}", session_id, track.title, state.queue.len());

        if state.current_track.is_none() && state.is_connected() && !state.is_paused() {
            match manager::advance(&mut state, self.playback_ctx()) {
                Advance::Started(_) if was_empty => {
                    return CommandStatus::Ok(Done::NowPlaying { track });
                }
                Advance::Silence | Advance::Idle if was_empty => {
                    return CommandStatus::Error(format!("could not play {}", track.title));
                }
                _ => {}
            }
        }

        let position = state
            .queue
            .iter()
            .rposition(|t| t == &track)
            .map(|i| i + 1)
            .unwrap_or(state.queue.len());
        CommandStatus::Ok(Done::Queued { track, position })
    }

    pub async fn skip(&self, session_id: &SessionId) -> CommandStatus {
        let entry = self.registry.get_or_create(session_id);
        let mut state = entry.lock().await;
        manager::skip(&mut state, self.playback_ctx())
    }

    pub async fn stop(&self, session_id: &SessionId) -> CommandStatus {
        let entry = self.registry.get_or_create(session_id);
        let mut state = entry.lock().await;
        manager::stop(&mut state)
    }

    pub async fn pause(&self, session_id: &SessionId) -> CommandStatus {
        let entry = self.registry.get_or_create(session_id);
        let mut state = entry.lock().await;
        manager::pause(&mut state)
    }

    pub async fn resume(&self, session_id: &SessionId) -> CommandStatus {
        let entry = self.registry.get_or_create(session_id);
        let mut state = entry.lock().await;
        manager::resume(&mut state, self.playback_ctx())
    }

    /// Snapshot of one session. Unknown ids read as a fresh session and are
    /// not registered.
    pub async fn query_state(&self, session_id: &SessionId) -> SessionSnapshot {
        match self.registry.get(session_id) {
            Some(entry) => entry.lock().await.snapshot(),
            None => SessionState::new(session_id.clone()).snapshot(),
        }
    }

    pub async fn query_all(&self) -> Vec<SessionSnapshot> {
        let mut snapshots = Vec::with_capacity(self.registry.len());
        for entry in self.registry.entries() {
            snapshots.push(entry.lock().await.snapshot());
        }
        snapshots.sort_by(|a, b| a.session_id.0.cmp(&b.session_id.0));
        snapshots
    }
}
