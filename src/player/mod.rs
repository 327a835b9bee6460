pub mod context;
pub mod manager;
pub mod state;

pub use context::SessionState;
pub use manager::{Advance, Completion, PlaybackCtx};
pub use state::*;
