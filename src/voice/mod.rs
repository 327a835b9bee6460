//! Seam to the real-time transport. The orchestrator only talks to these
//! traits; the bundled [`sink`] backend and the test fakes implement them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    audio::silence::SilenceSource,
    common::{
        errors::TransportError,
        types::{DestinationId, SessionId},
    },
    protocol::tracks::TrackRef,
};

pub mod sink;
#[cfg(test)]
pub mod testing;

pub use sink::SinkConnector;

/// Invoked exactly once when a play ends, with the playback error if any.
/// May run on any thread.
pub type FinishCallback = Box<dyn FnOnce(Option<String>) + Send + 'static>;

/// What a voice session is asked to emit.
#[derive(Debug, Clone)]
pub enum AudioInput {
    Track(TrackRef),
    Silence(SilenceSource),
}

impl AudioInput {
    pub fn is_silence(&self) -> bool {
        matches!(self, Self::Silence(_))
    }
}

pub type BoxedVoice = Arc<dyn VoiceSession>;

#[async_trait]
pub trait VoiceConnector: Send + Sync {
    /// Opens a connection to `destination`. Callers bound this with a timeout.
    async fn connect(
        &self,
        session: &SessionId,
        destination: &DestinationId,
    ) -> Result<BoxedVoice, TransportError>;
}

#[async_trait]
pub trait VoiceSession: Send + Sync {
    fn destination(&self) -> DestinationId;

    /// Starts emitting `input`, replacing whatever was playing. `on_finished`
    /// fires once when this input ends for any reason, including `stop`.
    /// A rejected input never fires its callback.
    fn play(&self, input: AudioInput, on_finished: FinishCallback) -> Result<(), TransportError>;

    fn stop(&self);
    fn pause(&self);
    fn resume(&self);

    fn is_playing(&self) -> bool;
    fn is_paused(&self) -> bool;
    fn is_connected(&self) -> bool;

    async fn disconnect(&self);
    async fn move_to(&self, destination: &DestinationId) -> Result<(), TransportError>;
}
