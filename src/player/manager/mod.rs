use std::time::Duration;

use crate::{
    common::types::{LoadId, SessionId},
    protocol::tracks::TrackRef,
};

pub mod completion;
pub mod controls;
pub mod start;

pub use completion::on_track_finished;
pub use controls::{pause, resume, skip, stop};
pub use start::{advance, fill_if_idle, load_track, resume_after_connect, start_silence};

/// A finished load, re-marshaled from the voice session's own context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub session_id: SessionId,
    pub load: LoadId,
    pub error: Option<String>,
}

/// Channels and settings a playback step needs besides the session itself.
#[derive(Clone)]
pub struct PlaybackCtx {
    pub completions: flume::Sender<Completion>,
    /// Reconnect requests for the supervisor side; playback steps never
    /// connect inline.
    pub reconnects: flume::Sender<SessionId>,
    pub silence_segment: Duration,
}

/// What `advance` ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Started(TrackRef),
    Silence,
    Idle,
    Disconnected,
}
