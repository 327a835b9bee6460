pub mod app_state;
pub mod connection;
pub mod keepalive;
pub mod notifier;
pub mod playback;
pub mod session_manager;

pub use app_state::AppState;
pub use keepalive::{KeepAlive, SweepAction};
pub use notifier::{Notifier, Origin};
pub use session_manager::{SessionEntry, SessionRegistry};
