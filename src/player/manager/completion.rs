use tracing::{debug, info, warn};

use super::{Advance, PlaybackCtx, start::advance, start::request_reconnect};
use crate::{common::types::LoadId, player::SessionState, server::notifier::notify};

/// Applies the end of a load. Runs once per load; completions for any load
/// other than the active one are ignored.
pub fn on_track_finished(
    state: &mut SessionState,
    ctx: &PlaybackCtx,
    load: LoadId,
    error: Option<String>,
) -> Option<Advance> {
    if state.active_load != Some(load) {
        debug!("[{}] ignoring stale completion {}", state.session_id, load);
        return None;
    }
    state.active_load = None;

    let was_silence = state.silence_active;
    state.playing = false;
    state.silence_active = false;

    if let Some(err) = &error {
        match &state.current_track {
            Some(track) if !was_silence => {
                warn!("[{}] player error on {}: {}", state.session_id, track.title, err);
                notify(state, format!("Error playing {}, moving on.", track.title));
            }
            _ => warn!("[{}] silence fill ended with error: {}", state.session_id, err),
        }
    }

    // A drop mid-track is an interruption, not an ending: keep the track so
    // the reconnect reloads it.
    if !state.is_connected() && state.stay_active && state.last_destination.is_some() {
        if let Some(track) = &state.current_track {
            info!(
                "[{}] transport lost during {}, holding it for reconnect",
                state.session_id, track.title
            );
        }
        request_reconnect(state, ctx);
        return Some(Advance::Disconnected);
    }

    state.current_track = None;
    Some(advance(state, ctx))
}
