use tracing::{info, warn};

use super::{PlaybackCtx, start::advance, start::load_track};
use crate::{
    player::SessionState,
    protocol::models::{CommandStatus, Conflict, Done},
};

pub fn skip(state: &mut SessionState, ctx: &PlaybackCtx) -> CommandStatus {
    let Some(track) = state.current_track.clone() else {
        return CommandStatus::AlreadyInState(Conflict::NothingToSkip);
    };

    match state.connected_voice() {
        Some(voice) if voice.is_playing() || voice.is_paused() => {
            // the active load's completion advances the queue
            voice.stop();
        }
        _ => {
            warn!(
                "[{}] {} is loaded but not emitting, advancing directly",
                state.session_id, track.title
            );
            state.active_load = None;
            state.current_track = None;
            state.playing = false;
            advance(state, ctx);
        }
    }
    info!("[{}] skipped {}", state.session_id, track.title);
    CommandStatus::Ok(Done::Skipped { track })
}

/// Clears the queue and halts emission. Stay mode is left alone.
pub fn stop(state: &mut SessionState) -> CommandStatus {
    let busy = state.current_track.is_some()
        || !state.queue.is_empty()
        || state.silence_active
        || state.pending_resolves > 0;
    if !busy {
        return if state.is_connected() {
            CommandStatus::AlreadyInState(Conflict::NothingPlaying)
        } else {
            CommandStatus::NotConnected
        };
    }

    state.generation += 1;
    state.queue.clear();
    state.current_track = None;
    state.active_load = None;
    state.playing = false;
    state.silence_active = false;
    if let Some(voice) = &state.voice {
        voice.stop();
    }
    info!("[{}] stopped and cleared queue", state.session_id);
    CommandStatus::Ok(Done::Stopped)
}

pub fn pause(state: &mut SessionState) -> CommandStatus {
    let Some(voice) = state.connected_voice() else {
        return CommandStatus::NotConnected;
    };
    if state.current_track.is_none() || state.silence_active || !voice.is_playing() {
        return CommandStatus::AlreadyInState(Conflict::NotPlaying);
    }

    voice.pause();
    state.playing = false;
    CommandStatus::Ok(Done::Paused)
}

pub fn resume(state: &mut SessionState, ctx: &PlaybackCtx) -> CommandStatus {
    let Some(voice) = state.connected_voice() else {
        return CommandStatus::NotConnected;
    };
    let Some(track) = state.current_track.clone() else {
        return CommandStatus::AlreadyInState(Conflict::NotPaused);
    };

    if voice.is_paused() {
        voice.resume();
        state.playing = true;
        return CommandStatus::Ok(Done::Resumed);
    }
    if voice.is_playing() {
        return CommandStatus::AlreadyInState(Conflict::NotPaused);
    }

    warn!(
        "[{}] {} is loaded but the transport is idle, reloading",
        state.session_id, track.title
    );
    state.active_load = None;
    state.current_track = None;
    state.playing = false;
    match load_track(state, ctx, &voice, &track) {
        Ok(()) => CommandStatus::Ok(Done::Resumed),
        Err(e) => {
            advance(state, ctx);
            CommandStatus::from(e)
        }
    }
}
