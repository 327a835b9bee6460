use std::time::Duration;

use bytes::Bytes;

use super::constants::{FRAME_BYTES, FRAME_MS};

static SILENT_FRAME: [u8; FRAME_BYTES] = [0; FRAME_BYTES];

/// Generated silence: zeroed 48 kHz stereo s16le frames for a fixed length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilenceSource {
    total_frames: u64,
    emitted: u64,
}

impl SilenceSource {
    pub fn new(length: Duration) -> Self {
        let frames = length.as_millis() as u64 / FRAME_MS;
        Self {
            total_frames: frames.max(1),
            emitted: 0,
        }
    }

    pub fn frame_duration() -> Duration {
        Duration::from_millis(FRAME_MS)
    }

    pub fn length(&self) -> Duration {
        Duration::from_millis(self.total_frames * FRAME_MS)
    }

    pub fn remaining_frames(&self) -> u64 {
        self.total_frames - self.emitted
    }
}

impl Iterator for SilenceSource {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.emitted >= self.total_frames {
            return None;
        }
        self.emitted += 1;
        Some(Bytes::from_static(&SILENT_FRAME))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining_frames() as usize;
        (n, Some(n))
    }
}
