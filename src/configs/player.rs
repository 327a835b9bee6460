use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    /// Upper bound for a single connect or move.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Length of one generated silence segment. A finished segment is
    /// followed by another while the session stays idle.
    #[serde(default = "default_silence_segment_ms")]
    pub silence_segment_ms: u64,
}

impl PlayerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn silence_segment(&self) -> Duration {
        Duration::from_millis(self.silence_segment_ms)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            silence_segment_ms: default_silence_segment_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeepAliveConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl KeepAliveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_silence_segment_ms() -> u64 {
    300_000
}

fn default_interval_secs() -> u64 {
    30
}
