use serde::Serialize;

use crate::{
    common::{
        errors::{ResolutionError, TransportError},
        types::DestinationId,
    },
    protocol::tracks::TrackRef,
};

/// Structured outcome of every upward-facing command. Expected states are
/// always reported here, never as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum CommandStatus {
    Ok(Done),
    AlreadyInState(Conflict),
    NotConnected,
    Error(String),
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Done {
    /// Appended behind something that is already loaded.
    Queued { track: TrackRef, position: usize },
    /// Appended and loaded straight away.
    NowPlaying { track: TrackRef },
    Skipped { track: TrackRef },
    Stopped,
    Paused,
    Resumed,
    Joined { destination: DestinationId },
    Moved { destination: DestinationId },
    Left,
    StayEnabled,
    StayDisabled,
}

/// Why a command had nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Conflict {
    NothingToSkip,
    NothingPlaying,
    NotPlaying,
    NotPaused,
    AlreadyConnected,
    StayAlreadyOn,
    StayAlreadyOff,
    /// The session was stopped or left while the track was resolving.
    Superseded,
}

impl CommandStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

impl From<TransportError> for CommandStatus {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Disconnected => Self::NotConnected,
            other => Self::Error(other.to_string()),
        }
    }
}

impl From<ResolutionError> for CommandStatus {
    fn from(e: ResolutionError) -> Self {
        Self::Error(e.to_string())
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok(done) => match done {
                Done::Queued { track, position } => {
                    write!(f, "Added to queue: {} (#{})", track, position)
                }
                Done::NowPlaying { track } => write!(f, "Now playing: {}", track),
                Done::Skipped { track } => write!(f, "Skipped {}", track),
                Done::Stopped => write!(f, "Music stopped and queue cleared."),
                Done::Paused => write!(f, "Paused music."),
                Done::Resumed => write!(f, "Resumed music."),
                Done::Joined { destination } => write!(f, "Joined {}.", destination),
                Done::Moved { destination } => write!(f, "Moved to {}.", destination),
                Done::Left => write!(f, "Left the voice channel."),
                Done::StayEnabled => write!(f, "Okay, I will stay connected."),
                Done::StayDisabled => write!(f, "Stay mode disabled."),
            },
            Self::AlreadyInState(conflict) => f.write_str(match conflict {
                Conflict::NothingToSkip => "Not playing anything to skip.",
                Conflict::NothingPlaying => "Nothing is playing and the queue is empty.",
                Conflict::NotPlaying => "Not playing anything to pause.",
                Conflict::NotPaused => "Music is not paused.",
                Conflict::AlreadyConnected => "Already connected to that destination.",
                Conflict::StayAlreadyOn => "Stay mode is already on.",
                Conflict::StayAlreadyOff => "Stay mode is already off.",
                Conflict::Superseded => "Playback was stopped before the track was ready.",
            }),
            Self::NotConnected => write!(f, "Not connected to a voice channel."),
            Self::Error(detail) => write!(f, "Error: {}", detail),
        }
    }
}
