use serde::Serialize;

use crate::{
    common::types::{DestinationId, SessionId},
    protocol::tracks::TrackRef,
};

/// Coarse position in the per-session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    /// A requested track is still being resolved.
    Loading,
    Emitting,
    Paused,
    SilenceFilling,
    Disconnected,
}

/// Read-only view of a session as returned by `queryState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub phase: Phase,
    pub queue: Vec<TrackRef>,
    pub current_track: Option<TrackRef>,
    pub playing: bool,
    pub paused: bool,
    pub stay_active: bool,
    pub silence_active: bool,
    pub connected: bool,
    /// Where the live voice session is connected.
    pub destination: Option<DestinationId>,
    pub last_destination: Option<DestinationId>,
}

#[derive(Debug, Serialize)]
pub struct Sessions {
    pub sessions: Vec<SessionSnapshot>,
}
