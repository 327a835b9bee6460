use std::sync::{
    Arc,
    atomic::{AtomicU8, AtomicU64, Ordering},
};

use tokio_util::sync::CancellationToken;

use crate::audio::constants::FRAME_MS;

#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(u8)]
pub enum PlaybackState {
    Playing = 0,
    Paused = 1,
    Stopped = 2,
}

impl PlaybackState {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Playing,
            1 => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

/// Control surface shared between a voice session and the task emitting
/// one input.
#[derive(Clone)]
pub struct EmissionHandle {
    state: Arc<AtomicU8>,
    frames: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl EmissionHandle {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(PlaybackState::Playing as u8)),
            frames: Arc::new(AtomicU64::new(0)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn pause(&self) {
        let _ = self.state.compare_exchange(
            PlaybackState::Playing as u8,
            PlaybackState::Paused as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn play(&self) {
        let _ = self.state.compare_exchange(
            PlaybackState::Paused as u8,
            PlaybackState::Playing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn stop(&self) {
        self.state
            .store(PlaybackState::Stopped as u8, Ordering::Release);
        self.cancel.cancel();
    }

    pub fn get_state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn cancelled(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Milliseconds of audio emitted so far.
    pub fn get_position(&self) -> u64 {
        self.frames.load(Ordering::Relaxed) * FRAME_MS
    }
}

impl Default for EmissionHandle {
    fn default() -> Self {
        Self::new()
    }
}
