use tracing::{debug, info, warn};

use super::{Advance, Completion, PlaybackCtx};
use crate::{
    audio::SilenceSource,
    common::{errors::TransportError, types::LoadId},
    player::SessionState,
    protocol::tracks::TrackRef,
    server::notifier::notify,
    voice::{AudioInput, BoxedVoice, FinishCallback},
};

/// Extra attempts for a track the voice session rejects before it is
/// dropped from the queue.
pub const PLAY_RETRIES: usize = 1;

fn completion_callback(ctx: &PlaybackCtx, state: &SessionState, load: LoadId) -> FinishCallback {
    let tx = ctx.completions.clone();
    let session_id = state.session_id.clone();
    Box::new(move |error| {
        let completion = Completion {
            session_id,
            load,
            error,
        };
        if let Err(e) = tx.send(completion) {
            debug!("[{}] completion {} dropped: dispatcher gone", e.0.session_id, e.0.load);
        }
    })
}

/// Hands `input` to the voice session as a new load and makes it the one
/// whose completion is awaited.
fn begin_load(
    state: &mut SessionState,
    ctx: &PlaybackCtx,
    voice: &BoxedVoice,
    input: AudioInput,
) -> Result<LoadId, TransportError> {
    let load = state.next_load_id();
    voice.play(input, completion_callback(ctx, state, load))?;
    state.active_load = Some(load);
    Ok(load)
}

pub(crate) fn request_reconnect(state: &SessionState, ctx: &PlaybackCtx) {
    if state.stay_active && state.last_destination.is_some() {
        debug!("[{}] requesting reconnect", state.session_id);
        let _ = ctx.reconnects.send(state.session_id.clone());
    }
}

/// Loads `track`, retrying a rejected play once.
pub fn load_track(
    state: &mut SessionState,
    ctx: &PlaybackCtx,
    voice: &BoxedVoice,
    track: &TrackRef,
) -> Result<(), TransportError> {
    let mut attempt = 0;
    loop {
        match begin_load(state, ctx, voice, AudioInput::Track(track.clone())) {
            Ok(load) => {
                state.current_track = Some(track.clone());
                state.playing = true;
                state.silence_active = false;
                info!("[{}] now playing {} (load {})", state.session_id, track.title, load);
                return Ok(());
            }
            Err(e) if attempt < PLAY_RETRIES && voice.is_connected() => {
                attempt += 1;
                warn!(
                    "[{}] voice session rejected {}: {}, retrying",
                    state.session_id, track.title, e
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Starts a generated silence segment. Requires a connected voice session
/// and nothing loaded.
pub fn start_silence(state: &mut SessionState, ctx: &PlaybackCtx) -> Result<(), TransportError> {
    let voice = state.connected_voice().ok_or(TransportError::Disconnected)?;
    if state.current_track.is_some() {
        return Err(TransportError::Rejected("a track is loaded".into()));
    }

    let source = SilenceSource::new(ctx.silence_segment);
    let load = begin_load(state, ctx, &voice, AudioInput::Silence(source))?;
    state.silence_active = true;
    state.playing = true;
    debug!("[{}] silence fill started (load {})", state.session_id, load);
    Ok(())
}

/// Enters silence fill for a connected, idle stay session.
pub fn fill_if_idle(state: &mut SessionState, ctx: &PlaybackCtx) -> bool {
    if !state.stay_active || !state.is_connected() || !state.is_idle() {
        return false;
    }
    match start_silence(state, ctx) {
        Ok(()) => true,
        Err(e) => {
            warn!("[{}] could not start silence fill: {}", state.session_id, e);
            false
        }
    }
}

/// Plays the next queued track, or falls back to silence or idle.
pub fn advance(state: &mut SessionState, ctx: &PlaybackCtx) -> Advance {
    let Some(voice) = state.connected_voice() else {
        state.current_track = None;
        state.playing = false;
        state.silence_active = false;
        state.active_load = None;
        request_reconnect(state, ctx);
        return Advance::Disconnected;
    };

    if state.silence_active {
        // superseded first so the stop's completion is stale
        state.active_load = None;
        state.silence_active = false;
        state.playing = false;
        voice.stop();
    }
    state.current_track = None;

    while let Some(track) = state.queue.pop_front() {
        match load_track(state, ctx, &voice, &track) {
            Ok(()) => {
                notify(state, format!("Now playing: {}", track.title));
                return Advance::Started(track);
            }
            Err(TransportError::Disconnected) => {
                state.queue.push_front(track);
                state.playing = false;
                request_reconnect(state, ctx);
                return Advance::Disconnected;
            }
            Err(e) => {
                warn!("[{}] dropping {}: {}", state.session_id, track.title, e);
                notify(state, format!("Could not play {}, skipping.", track.title));
            }
        }
    }

    state.playing = false;
    debug!("[{}] queue empty", state.session_id);
    if state.stay_active {
        match start_silence(state, ctx) {
            Ok(()) => return Advance::Silence,
            Err(e) => warn!("[{}] could not start silence fill: {}", state.session_id, e),
        }
    }
    Advance::Idle
}

/// Picks playback back up on a fresh connection: the interrupted track
/// first, then the queue, then silence for stay sessions.
pub fn resume_after_connect(state: &mut SessionState, ctx: &PlaybackCtx) -> Advance {
    let Some(voice) = state.connected_voice() else {
        return Advance::Disconnected;
    };

    if let Some(track) = state.current_track.take() {
        state.active_load = None;
        state.playing = false;
        state.silence_active = false;
        return match load_track(state, ctx, &voice, &track) {
            Ok(()) => {
                notify(state, format!("Resuming: {}", track.title));
                Advance::Started(track)
            }
            Err(e) => {
                warn!("[{}] could not reload {}: {}", state.session_id, track.title, e);
                advance(state, ctx)
            }
        };
    }

    if !state.queue.is_empty() {
        return advance(state, ctx);
    }
    if fill_if_idle(state, ctx) {
        Advance::Silence
    } else {
        Advance::Idle
    }
}
