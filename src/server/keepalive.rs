use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    common::types::SessionId,
    player::manager,
    server::{app_state::AppState, session_manager::SessionEntry},
};

/// What one sweep did for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    FilledSilence,
    Reconnected,
    None,
}

/// Periodic supervisor for stay sessions: fills silence on idle
/// connections and reconnects dropped ones.
pub struct KeepAlive {
    state: Arc<AppState>,
    interval: Duration,
}

impl KeepAlive {
    pub fn new(state: Arc<AppState>) -> Self {
        let interval = state.config.keepalive.interval();
        Self { state, interval }
    }

    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!("Keep-alive supervisor running every {:?}", self.interval);
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let actions = self.sweep().await;
                    debug!("keep-alive sweep touched {} session(s)", actions.len());
                }
            }
        }
        info!("Keep-alive supervisor stopped");
    }

    /// One pass over every session. Each session is handled in its own task
    /// so a failure in one never affects the others.
    pub async fn sweep(&self) -> Vec<(SessionId, SweepAction)> {
        let tasks = self.state.registry.entries().into_iter().map(|entry| {
            let state = self.state.clone();
            let session_id = entry.session_id.clone();
            (session_id, tokio::spawn(sweep_one(state, entry)))
        });
        let (ids, handles): (Vec<_>, Vec<_>) = tasks.unzip();

        let mut actions = Vec::new();
        for (session_id, joined) in ids.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(SweepAction::None) => {}
                Ok(action) => actions.push((session_id, action)),
                Err(e) => error!("[{}] keep-alive task failed: {}", session_id, e),
            }
        }
        actions
    }
}

async fn sweep_one(state: Arc<AppState>, entry: Arc<SessionEntry>) -> SweepAction {
    {
        let mut session = entry.lock().await;
        if !session.stay_active {
            return SweepAction::None;
        }
        if session.is_connected() {
            return if manager::fill_if_idle(&mut session, state.playback_ctx()) {
                debug!("[{}] idle stay session, filling silence", session.session_id);
                SweepAction::FilledSilence
            } else {
                SweepAction::None
            };
        }
        if session.last_destination.is_none() {
            return SweepAction::None;
        }
    }

    if state.reconnect(&entry.session_id).await {
        SweepAction::Reconnected
    } else {
        SweepAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        player::Phase,
        protocol::models::{CommandStatus, Done},
        server::notifier::Origin,
        voice::testing::{Behaviour, Harness},
    };

    #[tokio::test]
    async fn test_sweep_fills_idle_stay_session_and_enqueue_preempts() {
        let h = Harness::new();
        let id = SessionId::from("g1");
        h.app.join(&id, &"lobby".into(), Origin::default()).await;
        h.app
            .registry
            .get(&id)
            .expect("session exists")
            .lock()
            .await
            .stay_active = true;

        let keepalive = KeepAlive::new(h.app.clone());
        assert_eq!(
            keepalive.sweep().await,
            vec![(id.clone(), SweepAction::FilledSilence)]
        );
        assert_eq!(h.app.query_state(&id).await.phase, Phase::SilenceFilling);
        // already filling
        assert!(keepalive.sweep().await.is_empty());

        let status = h.app.enqueue(&id, "c", Origin::default()).await;
        assert!(matches!(status, CommandStatus::Ok(Done::NowPlaying { .. })));
        h.app.drain_completions().await;

        let snapshot = h.app.query_state(&id).await;
        assert!(!snapshot.silence_active);
        assert_eq!(snapshot.current_track.map(|t| t.title), Some("c".to_owned()));
        assert_eq!(h.voice().played(), vec!["~", "c"]);
    }

    #[tokio::test]
    async fn test_sweep_reconnects_dropped_session() {
        let h = Harness::new();
        let id = SessionId::from("g1");
        h.app
            .set_stay(&id, true, Some("lobby".into()), Origin::default())
            .await;
        h.voice().drop_connection();
        h.app.drain_completions().await;

        let keepalive = KeepAlive::new(h.app.clone());
        assert_eq!(
            keepalive.sweep().await,
            vec![(id.clone(), SweepAction::Reconnected)]
        );
        assert_eq!(h.connector.voice_count(), 2);
        assert_eq!(h.app.query_state(&id).await.phase, Phase::SilenceFilling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_retries_after_reconnect_timeout() {
        let h = Harness::new();
        let id = SessionId::from("g1");
        h.app
            .set_stay(&id, true, Some("lobby".into()), Origin::default())
            .await;
        h.app.enqueue(&id, "a", Origin::default()).await;
        h.connector.set("lobby", Behaviour::Hang);
        h.voice().drop_connection();
        h.app.drain_completions().await;

        let keepalive = KeepAlive::new(h.app.clone());
        assert!(keepalive.sweep().await.is_empty());
        let snapshot = h.app.query_state(&id).await;
        assert!(snapshot.stay_active);
        assert_eq!(snapshot.last_destination, Some("lobby".into()));
        assert_eq!(snapshot.current_track.map(|t| t.title), Some("a".to_owned()));
        assert_eq!(snapshot.phase, Phase::Disconnected);

        h.connector.set("lobby", Behaviour::Accept);
        assert_eq!(
            keepalive.sweep().await,
            vec![(id.clone(), SweepAction::Reconnected)]
        );
        assert_eq!(h.voice().played(), vec!["a"]);
        assert_eq!(h.app.query_state(&id).await.phase, Phase::Emitting);
    }

    #[tokio::test]
    async fn test_sweep_isolates_a_crashing_session() {
        let h = Harness::new();
        let crashing = SessionId::from("g1");
        let healthy = SessionId::from("g2");

        h.app.join(&crashing, &"lobby".into(), Origin::default()).await;
        let broken = h.voice();
        h.app.join(&healthy, &"hall".into(), Origin::default()).await;
        for id in [&crashing, &healthy] {
            h.app
                .registry
                .get(id)
                .expect("session exists")
                .lock()
                .await
                .stay_active = true;
        }
        broken.break_down();

        assert_eq!(
            KeepAlive::new(h.app.clone()).sweep().await,
            vec![(healthy.clone(), SweepAction::FilledSilence)]
        );
        assert_eq!(
            h.app.query_state(&healthy).await.phase,
            Phase::SilenceFilling
        );
    }

    #[tokio::test]
    async fn test_sweep_leaves_plain_sessions_alone() {
        let h = Harness::new();
        let id = SessionId::from("g1");
        h.app.join(&id, &"lobby".into(), Origin::default()).await;
        h.app.registry.get_or_create(&"never-joined".into());

        assert!(KeepAlive::new(h.app.clone()).sweep().await.is_empty());
        assert_eq!(h.app.query_state(&id).await.phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let h = Harness::new();
        let cancel = CancellationToken::new();
        let handle = KeepAlive::new(h.app.clone()).spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(65)).await;
        cancel.cancel();
        handle.await.expect("supervisor task");
    }
}
