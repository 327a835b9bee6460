//! Frame geometry shared by the silence generator and the sink pacer.

/// Output sample rate (Hz).
pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// Stereo channel count.
pub const CHANNELS: usize = 2;

/// Frame length in milliseconds.
pub const FRAME_MS: u64 = 20;

/// Samples per channel in one 20 ms frame at 48 kHz.
pub const FRAME_SAMPLES: usize = (TARGET_SAMPLE_RATE as usize / 1000) * FRAME_MS as usize;

/// Bytes in one interleaved s16le frame.
pub const FRAME_BYTES: usize = FRAME_SAMPLES * CHANNELS * 2;

/// Read size when pulling a remote or local source into the sink.
pub const SOURCE_CHUNK_BYTES: usize = 16 * 1_024;
