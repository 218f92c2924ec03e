//! Bridge configuration.
//!
//! Loaded from YAML, with a handful of environment overrides applied on top.
//! Every field has a default, so an empty file (or no file) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::LoopSettings;
use crate::bridge::handshake::DEFAULT_HANDSHAKE_URL;
use crate::capture::CaptureSettings;
use crate::semantic::ExportSettings;

/// Name of the logical channel shared with the agent.
pub const DEFAULT_CHANNEL_NAME: &str = "sus-agent-channel";

pub const ENV_CHANNEL: &str = "SCENE_BRIDGE_CHANNEL";
pub const ENV_HANDSHAKE_URL: &str = "SCENE_BRIDGE_HANDSHAKE_URL";
pub const ENV_BIND: &str = "SCENE_BRIDGE_BIND";
pub const ENV_INTERVAL_SECS: &str = "SCENE_BRIDGE_INTERVAL_SECS";

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub channel_name: String,
    pub handshake_url: String,
    /// Port 0 lets the OS pick; the handshake announces the result.
    pub bind_address: String,
    pub handshake_timeout_ms: u64,
    pub agent_interval_secs: f32,
    pub response_timeout_secs: Option<f32>,
    pub resume_delay_secs: f32,
    /// Intents kept in the controller's action log.
    pub action_log_limit: usize,
    pub capture: CaptureSettings,
    pub export: ExportSettings,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            handshake_url: DEFAULT_HANDSHAKE_URL.to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            handshake_timeout_ms: 5000,
            agent_interval_secs: 1.0,
            response_timeout_secs: Some(30.0),
            resume_delay_secs: 1.0,
            action_log_limit: 256,
            capture: CaptureSettings::default(),
            export: ExportSettings::default_play_mode(),
        }
    }
}

impl BridgeConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Defaults, or `path` if given, with environment overrides applied.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in [`load`](Self::load)).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_CHANNEL) {
            self.channel_name = value;
        }
        if let Some(value) = lookup(ENV_HANDSHAKE_URL) {
            self.handshake_url = value;
        }
        if let Some(value) = lookup(ENV_BIND) {
            self.bind_address = value;
        }
        if let Some(value) = lookup(ENV_INTERVAL_SECS) {
            self.agent_interval_secs = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{} is not a number: '{}'", ENV_INTERVAL_SECS, value)))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_name.is_empty() || self.channel_name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "channel_name must be a non-empty path segment, got '{}'",
                self.channel_name
            )));
        }
        if !(self.agent_interval_secs > 0.0) {
            return Err(ConfigError::Invalid("agent_interval_secs must be positive".to_string()));
        }
        if let Some(timeout) = self.response_timeout_secs {
            if !(timeout > 0.0) {
                return Err(ConfigError::Invalid("response_timeout_secs must be positive".to_string()));
            }
        }
        if self.resume_delay_secs < 0.0 {
            return Err(ConfigError::Invalid("resume_delay_secs must not be negative".to_string()));
        }
        if self.action_log_limit == 0 {
            return Err(ConfigError::Invalid("action_log_limit must be positive".to_string()));
        }
        if self.capture.max_width == 0 {
            return Err(ConfigError::Invalid("capture.max_width must be positive".to_string()));
        }
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(ConfigError::Invalid("capture.jpeg_quality must be in 1..=100".to_string()));
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            interval_secs: self.agent_interval_secs,
            response_timeout_secs: self.response_timeout_secs,
            resume_delay_secs: self.resume_delay_secs,
            action_log_limit: self.action_log_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.channel_name, "sus-agent-channel");
        assert_eq!(config.handshake_url, "ws://127.0.0.1:8765");
        assert_eq!(config.bind_address, "127.0.0.1:0");
        assert_eq!(config.capture.max_width, 1280);
        assert_eq!(config.capture.jpeg_quality, 50);
        assert_eq!(config.export, ExportSettings::default_play_mode());
        assert_eq!(config.handshake_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "agent_interval_secs: 2.5\nresponse_timeout_secs: null\naction_log_limit: 16\ncapture:\n  jpeg_quality: 80\nexport:\n  max_depth: 3\n";
        let config = BridgeConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.agent_interval_secs, 2.5);
        assert_eq!(config.response_timeout_secs, None);
        assert_eq!(config.capture.jpeg_quality, 80);
        assert_eq!(config.capture.max_width, 1280);
        assert_eq!(config.export.max_depth, 3);
        assert!(config.export.include_components);

        let settings = config.loop_settings();
        assert_eq!(settings.interval_secs, 2.5);
        assert_eq!(settings.response_timeout_secs, None);
        assert_eq!(settings.action_log_limit, 16);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(BridgeConfig::from_yaml_str("  \n").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            BridgeConfig::from_yaml_str("agent_interval_secs: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BridgeConfig::from_yaml_str("capture:\n  jpeg_quality: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BridgeConfig::from_yaml_str("action_log_limit: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BridgeConfig::from_yaml_str("channel_name: a/b"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BridgeConfig::from_yaml_str("agent_interval_secs: [1"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_CHANNEL, "test-channel"),
            (ENV_BIND, "127.0.0.1:9100"),
            (ENV_INTERVAL_SECS, " 0.5 "),
        ]
        .into_iter()
        .collect();

        let mut config = BridgeConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.channel_name, "test-channel");
        assert_eq!(config.bind_address, "127.0.0.1:9100");
        assert_eq!(config.agent_interval_secs, 0.5);
        assert_eq!(config.handshake_url, DEFAULT_HANDSHAKE_URL);
    }

    #[test]
    fn test_bad_interval_override() {
        let mut config = BridgeConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_INTERVAL_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.yaml");
        std::fs::write(&path, "channel_name: arena\n").unwrap();
        assert_eq!(BridgeConfig::from_file(&path).unwrap().channel_name, "arena");
        assert!(matches!(
            BridgeConfig::from_file(dir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
