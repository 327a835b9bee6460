use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    common::types::SessionId,
    configs::Config,
    player::{Completion, PlaybackCtx, manager},
    server::{connection::spawn_reconnect, session_manager::SessionRegistry},
    sources::TrackResolver,
    voice::VoiceConnector,
};

/// Top-level application state.
pub struct AppState {
    pub config: Config,
    pub registry: SessionRegistry,
    pub connector: Arc<dyn VoiceConnector>,
    pub resolver: Arc<dyn TrackResolver>,
    ctx: PlaybackCtx,
    completions: flume::Receiver<Completion>,
    reconnects: flume::Receiver<SessionId>,
}

impl AppState {
    pub fn new(
        config: Config,
        connector: Arc<dyn VoiceConnector>,
        resolver: Arc<dyn TrackResolver>,
    ) -> Arc<Self> {
        let (completion_tx, completion_rx) = flume::unbounded();
        let (reconnect_tx, reconnect_rx) = flume::unbounded();
        let ctx = PlaybackCtx {
            completions: completion_tx,
            reconnects: reconnect_tx,
            silence_segment: config.player.silence_segment(),
        };

        Arc::new(Self {
            config,
            registry: SessionRegistry::new(),
            connector,
            resolver,
            ctx,
            completions: completion_rx,
            reconnects: reconnect_rx,
        })
    }

    pub fn playback_ctx(&self) -> &PlaybackCtx {
        &self.ctx
    }

    /// Applies one completion under its session's state lock.
    pub async fn handle_completion(&self, completion: Completion) {
        let Some(entry) = self.registry.get(&completion.session_id) else {
            debug!("completion for unknown session {}", completion.session_id);
            return;
        };
        let mut state = entry.lock().await;
        manager::on_track_finished(&mut state, &self.ctx, completion.load, completion.error);
    }

    /// Processes every completion queued so far, including ones produced
    /// while processing. Returns how many were applied.
    #[cfg(test)]
    pub async fn drain_completions(&self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.handle_completion(completion).await;
            applied += 1;
        }
        applied
    }

    /// Runs every queued reconnect request to completion.
    #[cfg(test)]
    pub async fn drain_reconnects(&self) -> usize {
        let mut handled = 0;
        while let Ok(session_id) = self.reconnects.try_recv() {
            self.reconnect(&session_id).await;
            handled += 1;
        }
        handled
    }

    /// Single consumer for completions and reconnect requests. Reconnects are
    /// spawned so a slow connect never delays completions of other sessions.
    pub async fn run_dispatcher(self: Arc<Self>, cancel: CancellationToken) {
        info!("Completion dispatcher started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Ok(completion) = self.completions.recv_async() => {
                    self.handle_completion(completion).await;
                }
                Ok(session_id) = self.reconnects.recv_async() => {
                    spawn_reconnect(&self, session_id);
                }
            }
        }
        info!("Completion dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{server::notifier::Origin, voice::testing::Harness};

    #[tokio::test]
    async fn test_dispatcher_applies_completions_and_reconnects() {
        let h = Harness::new();
        let cancel = CancellationToken::new();
        let dispatcher = tokio::spawn(h.app.clone().run_dispatcher(cancel.clone()));
        let id = SessionId::from("g1");

        h.app
            .set_stay(&id, true, Some("lobby".into()), Origin::default())
            .await;
        h.app.enqueue(&id, "a", Origin::default()).await;
        h.voice().drop_connection();

        for _ in 0..100 {
            if h.app.query_state(&id).await.connected {
                break;
            }
            tokio::task::yield_now().await;
        }

        let snapshot = h.app.query_state(&id).await;
        assert!(snapshot.connected);
        assert_eq!(snapshot.current_track.map(|t| t.title), Some("a".to_owned()));
        assert_eq!(h.connector.voice_count(), 2);
        assert_eq!(h.voice().played(), vec!["a"]);

        cancel.cancel();
        dispatcher.await.expect("dispatcher task");
    }

    #[tokio::test]
    async fn test_completion_for_unknown_session_is_dropped() {
        let h = Harness::new();
        h.app
            .handle_completion(Completion {
                session_id: "ghost".into(),
                load: crate::common::types::LoadId(1),
                error: None,
            })
            .await;
        assert!(h.app.registry.is_empty());
    }
}
