use std::{collections::VecDeque, sync::Weak};

use crate::{
    common::types::{DestinationId, LoadId, SessionId},
    player::state::{Phase, SessionSnapshot},
    protocol::tracks::TrackRef,
    server::notifier::Notifier,
    voice::BoxedVoice,
};

/// Mutable state of one session. Only touched while holding the session's
/// state lock.
pub struct SessionState {
    pub session_id: SessionId,
    pub queue: VecDeque<TrackRef>,
    /// Set iff a track is loaded, playing or paused.
    pub current_track: Option<TrackRef>,
    pub playing: bool,
    pub stay_active: bool,
    pub silence_active: bool,
    pub last_destination: Option<DestinationId>,
    pub voice: Option<BoxedVoice>,
    pub reply_target: Option<Weak<dyn Notifier>>,
    /// Bumped by stop and leave; resolutions started earlier are dropped.
    pub generation: u64,
    /// The load whose completion is awaited.
    pub active_load: Option<LoadId>,
    pub pending_resolves: usize,
    next_load: u64,
}

impl SessionState {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            queue: VecDeque::new(),
            current_track: None,
            playing: false,
            stay_active: false,
            silence_active: false,
            last_destination: None,
            voice: None,
            reply_target: None,
            generation: 0,
            active_load: None,
            pending_resolves: 0,
            next_load: 0,
        }
    }

    pub fn next_load_id(&mut self) -> LoadId {
        self.next_load += 1;
        LoadId(self.next_load)
    }

    /// The voice handle, if it is still connected.
    pub fn connected_voice(&self) -> Option<BoxedVoice> {
        self.voice.as_ref().filter(|v| v.is_connected()).cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.connected_voice().is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.current_track.is_some()
            && self.voice.as_ref().map(|v| v.is_paused()).unwrap_or(false)
    }

    /// Nothing loaded, nothing queued and not already filling.
    pub fn is_idle(&self) -> bool {
        self.current_track.is_none()
            && self.queue.is_empty()
            && !self.playing
            && !self.silence_active
    }

    pub fn remember_reply(&mut self, target: Option<Weak<dyn Notifier>>) {
        if target.is_some() {
            self.reply_target = target;
        }
    }

    /// Drops everything the session is doing. Identity and the generation
    /// counter survive.
    pub fn reset(&mut self) -> Option<BoxedVoice> {
        self.generation += 1;
        self.queue.clear();
        self.current_track = None;
        self.playing = false;
        self.stay_active = false;
        self.silence_active = false;
        self.last_destination = None;
        self.reply_target = None;
        self.active_load = None;
        self.voice.take()
    }

    pub fn phase(&self) -> Phase {
        // A session that never connected (or left cleanly) rests in Idle;
        // Disconnected means something expects the connection back.
        if !self.is_connected()
            && (self.voice.is_some() || self.stay_active || self.current_track.is_some())
        {
            return Phase::Disconnected;
        }
        if self.silence_active {
            Phase::SilenceFilling
        } else if self.is_paused() {
            Phase::Paused
        } else if self.current_track.is_some() {
            Phase::Emitting
        } else if self.pending_resolves > 0 {
            Phase::Loading
        } else {
            Phase::Idle
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            phase: self.phase(),
            queue: self.queue.iter().cloned().collect(),
            current_track: self.current_track.clone(),
            playing: self.playing,
            paused: self.is_paused(),
            stay_active: self.stay_active,
            silence_active: self.silence_active,
            connected: self.is_connected(),
            destination: self.connected_voice().map(|v| v.destination()),
            last_destination: self.last_destination.clone(),
        }
    }
}
