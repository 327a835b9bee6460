use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    common::{
        errors::TransportError,
        types::{DestinationId, SessionId},
    },
    player::manager::{self, start::request_reconnect},
    protocol::models::{CommandStatus, Conflict, Done},
    server::{app_state::AppState, notifier::Origin, notifier::notify, session_manager::SessionEntry},
    voice::BoxedVoice,
};

/// How a join was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attached {
    Already,
    Moved,
    Connected,
}

impl AppState {
    async fn connect_with_timeout(
        &self,
        session_id: &SessionId,
        destination: &DestinationId,
    ) -> Result<BoxedVoice, TransportError> {
        let timeout = self.config.player.connect_timeout();
        match tokio::time::timeout(timeout, self.connector.connect(session_id, destination)).await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                destination: destination.clone(),
                timeout,
            }),
        }
    }

    /// Takes a handle that lost its transport out of the session, so nothing
    /// still awaits its completions.
    async fn take_stale_voice(entry: &SessionEntry) -> Option<BoxedVoice> {
        let mut state = entry.lock().await;
        if state.voice.as_ref().is_some_and(|v| v.is_connected()) {
            return None;
        }
        state.active_load = None;
        state.playing = false;
        state.silence_active = false;
        state.voice.take()
    }

    /// Join body. The caller holds the membership lane.
    async fn attach(
        &self,
        entry: &SessionEntry,
        destination: &DestinationId,
        origin: &Origin,
    ) -> Result<Attached, TransportError> {
        let session_id = &entry.session_id;
        let live = {
            let mut state = entry.lock().await;
            state.remember_reply(origin.reply.clone());
            state.last_destination = Some(destination.clone());
            state.connected_voice()
        };

        if let Some(voice) = live {
            if &voice.destination() == destination {
                return Ok(Attached::Already);
            }
            let timeout = self.config.player.connect_timeout();
            return match tokio::time::timeout(timeout, voice.move_to(destination)).await {
                Ok(Ok(())) => {
                    info!("[{}] moved to {}", session_id, destination);
                    Ok(Attached::Moved)
                }
                Ok(Err(e)) => Err(e),
                Err(_) => Err(TransportError::Timeout {
                    destination: destination.clone(),
                    timeout,
                }),
            };
        }

        if let Some(stale) = Self::take_stale_voice(entry).await {
            debug!("[{}] dropping stale voice handle", session_id);
            stale.disconnect().await;
        }

        let voice = self.connect_with_timeout(session_id, destination).await?;
        let mut state = entry.lock().await;
        state.voice = Some(voice);
        info!("[{}] joined {}", session_id, destination);
        manager::resume_after_connect(&mut state, self.playback_ctx());
        Ok(Attached::Connected)
    }

    /// Connects the session to `destination`, moving an existing connection
    /// when it points elsewhere.
    pub async fn join(
        &self,
        session_id: &SessionId,
        destination: &DestinationId,
        origin: Origin,
    ) -> CommandStatus {
        let entry = self.registry.get_or_create(session_id);
        let _lane = entry.membership().await;

        match self.attach(&entry, destination, &origin).await {
            Ok(Attached::Already) => CommandStatus::AlreadyInState(Conflict::AlreadyConnected),
            Ok(Attached::Moved) => CommandStatus::Ok(Done::Moved {
                destination: destination.clone(),
            }),
            Ok(Attached::Connected) => CommandStatus::Ok(Done::Joined {
                destination: destination.clone(),
            }),
            Err(e) => {
                warn!("[{}] failed to join {}: {}", session_id, destination, e);
                CommandStatus::Error(e.to_string())
            }
        }
    }

    /// Drops the connection and everything the session was doing. Reports
    /// `left` whenever there was something to drop.
    pub async fn leave(&self, session_id: &SessionId) -> CommandStatus {
        let entry = self.registry.get_or_create(session_id);
        let _lane = entry.membership().await;

        let (voice, had_state) = {
            let mut state = entry.lock().await;
            let had_state = state.stay_active
                || state.last_destination.is_some()
                || state.current_track.is_some()
                || !state.queue.is_empty();
            (state.reset(), had_state)
        };
        match voice {
            Some(voice) => {
                voice.stop();
                voice.disconnect().await;
                info!("[{}] left {}", session_id, voice.destination());
                CommandStatus::Ok(Done::Left)
            }
            None if had_state => {
                info!("[{}] cleared a disconnected session", session_id);
                CommandStatus::Ok(Done::Left)
            }
            None => CommandStatus::NotConnected,
        }
    }

    pub async fn set_stay(
        &self,
        session_id: &SessionId,
        on: bool,
        destination: Option<DestinationId>,
        origin: Origin,
    ) -> CommandStatus {
        if on {
            self.enable_stay(session_id, destination, origin).await
        } else {
            self.disable_stay(session_id).await
        }
    }

    async fn enable_stay(
        &self,
        session_id: &SessionId,
        destination: Option<DestinationId>,
        origin: Origin,
    ) -> CommandStatus {
        let entry = self.registry.get_or_create(session_id);
        {
            let mut state = entry.lock().await;
            state.remember_reply(origin.reply.clone());
            if destination.is_none() {
                if state.stay_active {
                    return CommandStatus::AlreadyInState(Conflict::StayAlreadyOn);
                }
                if !state.is_connected() && state.last_destination.is_none() {
                    return CommandStatus::NotConnected;
                }
            }
            state.stay_active = true;
        }

        if let Some(destination) = &destination {
            let _lane = entry.membership().await;
            if let Err(e) = self.attach(&entry, destination, &origin).await {
                warn!("[{}] stay join to {} failed: {}", session_id, destination, e);
                if e.is_permanent() {
                    entry.lock().await.stay_active = false;
                }
                return CommandStatus::Error(e.to_string());
            }
        }

        let mut state = entry.lock().await;
        if state.is_connected() {
            manager::fill_if_idle(&mut state, self.playback_ctx());
        } else {
            request_reconnect(&state, self.playback_ctx());
        }
        info!("[{}] stay enabled", session_id);
        CommandStatus::Ok(Done::StayEnabled)
    }

    async fn disable_stay(&self, session_id: &SessionId) -> CommandStatus {
        let entry = self.registry.get_or_create(session_id);
        let stale = {
            let mut state = entry.lock().await;
            if !state.stay_active {
                return CommandStatus::AlreadyInState(Conflict::StayAlreadyOff);
            }

            state.stay_active = false;
            if state.silence_active {
                state.active_load = None;
                state.silence_active = false;
                state.playing = false;
                if let Some(voice) = &state.voice {
                    voice.stop();
                }
            }

            // nothing will reconnect now, so an interrupted track has ended
            if state.is_connected() {
                None
            } else {
                if let Some(track) = state.current_track.take() {
                    debug!("[{}] dropping interrupted {}", session_id, track);
                }
                state.active_load = None;
                state.playing = false;
                state.silence_active = false;
                state.voice.take()
            }
        };

        if let Some(voice) = stale {
            voice.disconnect().await;
        }
        info!("[{}] stay disabled", session_id);
        CommandStatus::Ok(Done::StayDisabled)
    }

    /// Re-establishes a dropped stay session at its last destination.
    /// Returns true when a new connection was installed.
    pub async fn reconnect(&self, session_id: &SessionId) -> bool {
        let Some(entry) = self.registry.get(session_id) else {
            return false;
        };
        let Some(_lane) = entry.try_membership() else {
            debug!("[{}] membership busy, reconnect deferred", session_id);
            return false;
        };

        let destination = {
            let state = entry.lock().await;
            if !state.stay_active || state.is_connected() {
                return false;
            }
            match state.last_destination.clone() {
                Some(destination) => destination,
                None => return false,
            }
        };

        if let Some(stale) = Self::take_stale_voice(&entry).await {
            stale.disconnect().await;
        }

        info!("[{}] reconnecting to {}", session_id, destination);
        match self.connect_with_timeout(session_id, &destination).await {
            Ok(voice) => {
                let mut state = entry.lock().await;
                state.voice = Some(voice);
                manager::resume_after_connect(&mut state, self.playback_ctx());
                notify(&state, format!("Rejoined {}.", destination));
                true
            }
            Err(e) if e.is_permanent() => {
                let mut state = entry.lock().await;
                warn!(
                    "[{}] {} is gone, disabling stay: {}",
                    session_id, destination, e
                );
                state.stay_active = false;
                state.current_track = None;
                state.playing = false;
                notify(
                    &state,
                    format!("Could not rejoin {}, stay mode disabled.", destination),
                );
                false
            }
            Err(e) => {
                warn!("[{}] reconnect failed, retrying next sweep: {}", session_id, e);
                false
            }
        }
    }
}

/// Reconnect requests are spawned off the dispatcher.
pub(crate) fn spawn_reconnect(state: &Arc<AppState>, session_id: SessionId) {
    let state = state.clone();
    tokio::spawn(async move { state.reconnect(&session_id).await });
}
