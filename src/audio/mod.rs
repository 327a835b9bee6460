pub mod constants;
pub mod playback;
pub mod silence;

pub use playback::{EmissionHandle, PlaybackState};
pub use silence::SilenceSource;
