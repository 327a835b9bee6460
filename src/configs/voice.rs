use serde::{Deserialize, Serialize};

/// Settings for the bundled null-sink voice backend.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VoiceConfig {
    /// Destinations the sink accepts. Anything else is rejected as invalid.
    #[serde(default = "default_destinations")]
    pub destinations: Vec<String>,
    /// Simulated handshake latency.
    #[serde(default)]
    pub connect_delay_ms: u64,
    /// Rate at which remote sources are pulled into the sink.
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            destinations: default_destinations(),
            connect_delay_ms: 0,
            bitrate_kbps: default_bitrate_kbps(),
        }
    }
}

fn default_destinations() -> Vec<String> {
    vec!["lobby".to_string()]
}

fn default_bitrate_kbps() -> u32 {
    160
}
