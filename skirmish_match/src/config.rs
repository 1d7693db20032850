// Data-driven match configuration.
//
// Every tunable the match core reads lives in `MatchConfig`, loaded from JSON
// or built from `Default`. Missing fields in a JSON file fall back to their
// defaults, so a config only has to name what it changes.
//
// All nodes in a room should run the same config. The authority's clock and
// win threshold are the ones that count, but every node evaluates the win
// condition and runs the end-of-match delay locally.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Countdown length in seconds for each match.
    pub match_length_secs: f32,
    /// Kills needed to win. Zero or negative disables win-by-kills.
    pub kills_to_win: i32,
    /// Cadence of the authority's TimerSync broadcast, in seconds.
    pub timer_sync_interval_secs: f32,
    /// How long the end screen stays up before Leave/Continue.
    pub end_screen_delay_secs: f32,
    /// Start another match after the end screen instead of leaving.
    pub continue_after_match: bool,
    /// When continuing, advance through `scenario_rotation` instead of
    /// replaying the current scenario.
    pub rotate_scenarios: bool,
    /// Scenario names, in rotation order. The first is where a room starts.
    pub scenario_rotation: Vec<String>,
    /// Drop StatUpdates whose per-sender sequence was already seen.
    pub dedup_stat_updates: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_length_secs: 180.0,
            kills_to_win: 3,
            timer_sync_interval_secs: 1.0,
            end_screen_delay_secs: 5.0,
            continue_after_match: false,
            rotate_scenarios: false,
            scenario_rotation: Vec::new(),
            dedup_stat_updates: false,
        }
    }
}

impl MatchConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values the clock or the end sequence cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.match_length_secs.is_finite() || self.match_length_secs < 0.0 {
            return Err(ConfigError::Invalid(
                "match_length_secs must be a non-negative number".into(),
            ));
        }
        if !self.timer_sync_interval_secs.is_finite() || self.timer_sync_interval_secs <= 0.0 {
            return Err(ConfigError::Invalid(
                "timer_sync_interval_secs must be positive".into(),
            ));
        }
        if !self.end_screen_delay_secs.is_finite() || self.end_screen_delay_secs < 0.0 {
            return Err(ConfigError::Invalid(
                "end_screen_delay_secs must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = MatchConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = MatchConfig::from_json_str(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = MatchConfig::from_json_str(
            r#"{
                "kills_to_win": 10,
                "continue_after_match": true,
                "scenario_rotation": ["Dunes", "Foundry"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.kills_to_win, 10);
        assert!(config.continue_after_match);
        assert_eq!(config.scenario_rotation, vec!["Dunes", "Foundry"]);
        assert_eq!(config.match_length_secs, 180.0);
        assert_eq!(config.timer_sync_interval_secs, 1.0);
        assert!(!config.dedup_stat_updates);
    }

    #[test]
    fn zero_sync_interval_is_invalid() {
        let err = MatchConfig::from_json_str(r#"{"timer_sync_interval_secs": 0.0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn negative_match_length_is_invalid() {
        let err = MatchConfig::from_json_str(r#"{"match_length_secs": -5.0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn garbage_is_a_json_error() {
        let err = MatchConfig::from_json_str("kills_to_win = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = MatchConfig::from_json_file("/nonexistent/skirmish/match.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
