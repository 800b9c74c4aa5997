// src/config.rs
//
// Setup-time configuration for one instrument instance.
//
// Everything the audio thread needs is sized from this struct before the
// real-time handle exists. A config that fails validation never reaches
// the audio thread.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Upper bound on audio channels handled by one instance.
pub const MAX_CHANNELS: usize = 8;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid sample rate: {0}")]
    SampleRate(f64),
    #[error("channel count {0} outside 1..={}", MAX_CHANNELS)]
    Channels(usize),
    #[error("max block frames must be non-zero")]
    BlockFrames,
    #[error("request queue capacity must be non-zero")]
    RequestCapacity,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: f64,

    /// Number of input and output channels.
    pub channels: usize,

    /// Largest block the host will ever deliver.
    pub max_block_frames: usize,

    /// Capacity of the audio -> control program request queue.
    pub request_capacity: usize,

    /// Number of parameter ports.
    pub param_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            channels: 2,
            max_block_frames: 1024,
            request_capacity: 64,
            param_count: 16,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        log::debug!("loading engine config from {}", path.display());
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(ConfigError::Channels(self.channels));
        }
        if self.max_block_frames == 0 {
            return Err(ConfigError::BlockFrames);
        }
        if self.request_capacity == 0 {
            return Err(ConfigError::RequestCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config = EngineConfig::from_json(r#"{ "channels": 1 }"#).unwrap();
        assert_eq!(config.channels, 1);
        assert_eq!(config.sample_rate, 48_000.0);
        assert_eq!(config.request_capacity, 64);
    }

    #[test]
    fn rejects_bad_values() {
        let bad_rate = EngineConfig {
            sample_rate: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(bad_rate.validate(), Err(ConfigError::SampleRate(_))));

        let too_many = EngineConfig {
            channels: MAX_CHANNELS + 1,
            ..Default::default()
        };
        assert!(matches!(too_many.validate(), Err(ConfigError::Channels(9))));

        assert!(matches!(
            EngineConfig::from_json(r#"{ "max_block_frames": 0 }"#),
            Err(ConfigError::BlockFrames)
        ));
        assert!(matches!(
            EngineConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
