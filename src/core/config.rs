//! Playback tuning: inter-line delay, movement timeout, animator parameter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config value for {field}: {value}")]
    Invalid { field: &'static str, value: f32 },
}

/// Timing and naming knobs shared by every sequence a controller plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Pause between one line's clear and the next line, in seconds.
    pub line_delay: f32,
    /// Seconds to wait for a gated walk before giving up on it.
    pub movement_timeout: f32,
    /// Animator boolean toggled while the speaker walks.
    pub walking_parameter: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            line_delay: 0.5,
            movement_timeout: 10.0,
            walking_parameter: "IsWalking".to_string(),
        }
    }
}

impl PlaybackConfig {
    /// Load a config from a RON file. Missing fields keep their defaults.
    pub fn load_from_ron(path: &Path) -> Result<PlaybackConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config from a RON string.
    pub fn parse_ron(input: &str) -> Result<PlaybackConfig, ConfigError> {
        let config: PlaybackConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_seconds("line_delay", self.line_delay)?;
        check_seconds("movement_timeout", self.movement_timeout)?;
        Ok(())
    }

    pub fn line_delay(&self) -> Duration {
        to_duration(self.line_delay)
    }

    pub fn movement_timeout(&self) -> Duration {
        to_duration(self.movement_timeout)
    }
}

fn check_seconds(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 && Duration::try_from_secs_f32(value).is_ok() {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, value })
    }
}

fn to_duration(seconds: f32) -> Duration {
    if seconds > 0.0 {
        Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.line_delay(), Duration::from_millis(500));
        assert_eq!(config.movement_timeout(), Duration::from_secs(10));
        assert_eq!(config.walking_parameter, "IsWalking");
    }

    #[test]
    fn parse_partial_ron() {
        let config = PlaybackConfig::parse_ron("(line_delay: 1.25)").unwrap();
        assert_eq!(config.line_delay(), Duration::from_millis(1250));
        assert_eq!(config.movement_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn parse_rejects_negative() {
        let err = PlaybackConfig::parse_ron("(movement_timeout: -2.0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "movement_timeout", .. }));
    }

    #[test]
    fn parse_rejects_unrepresentable_seconds() {
        let err = PlaybackConfig::parse_ron("(movement_timeout: 1e30)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "movement_timeout", .. }));
        let err = PlaybackConfig::parse_ron("(line_delay: 1e25)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "line_delay", .. }));
    }

    #[test]
    fn oversized_timeout_fails_validation() {
        let config = PlaybackConfig {
            movement_timeout: f32::MAX,
            ..PlaybackConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.movement_timeout(), Duration::ZERO);
    }

    #[test]
    fn zero_delay_allowed() {
        let config = PlaybackConfig::parse_ron("(line_delay: 0.0)").unwrap();
        assert_eq!(config.line_delay(), Duration::ZERO);
    }

    #[test]
    fn load_fixture_config() {
        let path = std::path::PathBuf::from("tests/fixtures/playback_config.ron");
        let config = PlaybackConfig::load_from_ron(&path).unwrap();
        assert_eq!(config.walking_parameter, "Walk");
        assert_eq!(config.movement_timeout(), Duration::from_secs(8));
    }
}
