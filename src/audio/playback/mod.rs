pub mod handle;

pub use handle::{EmissionHandle, PlaybackState};
