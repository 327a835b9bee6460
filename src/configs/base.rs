use serde::{Deserialize, Serialize};

use crate::{common::types::AnyResult, configs::*};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub keepalive: KeepAliveConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl Config {
    pub fn load() -> AnyResult<Self> {
        let config_path = if std::path::Path::new("config.toml").exists() {
            "config.toml"
        } else if std::path::Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            crate::log_println!("No config.toml found, using built-in defaults");
            return Ok(Self::default());
        };

        crate::log_println!("Loading configuration from: {}", config_path);

        let config_str = std::fs::read_to_string(config_path)?;
        Self::parse(&config_str).map_err(|e| format!("{}: {}", config_path, e).into())
    }

    pub fn parse(raw: &str) -> AnyResult<Self> {
        if raw.trim().is_empty() {
            return Err("configuration is empty".into());
        }
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::parse(
            r#"
            [keepalive]
            interval_secs = 5

            [voice]
            destinations = ["lobby", "music"]
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.keepalive.interval_secs, 5);
        assert_eq!(config.voice.destinations, vec!["lobby", "music"]);
        assert_eq!(config.player.connect_timeout_ms, 10_000);
        assert_eq!(config.server.port, 2444);
        assert!(config.sources.http);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_empty_config_is_rejected() {
        assert!(Config::parse("   \n").is_err());
    }

    #[test]
    fn test_logging_file_section() {
        let config = Config::parse(
            r#"
            [logging]
            level = "debug"
            [logging.file]
            path = "logs/staytune.log"
            "#,
        )
        .expect("config should parse");

        let logging = config.logging.expect("logging section");
        assert_eq!(logging.level.as_deref(), Some("debug"));
        let file = logging.file.expect("file section");
        assert_eq!(file.max_lines, 10_000);
    }
}
