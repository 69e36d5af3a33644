//! Experiment configuration supplied by the host page as JSON.
//!
//! Every field has a default, so `{}` (or no `configure` call at all) gives
//! the standard three-attempt experiment.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Tick interval per attempt. The last entry repeats for later attempts.
    pub cadences_ms: Vec<u32>,
    /// How long an attempt's outcome stays on screen and blocks new attempts.
    pub feedback_window_ms: u32,
    pub attempts_per_session: usize,
    /// Simulation ids available to the picker.
    pub simulation_pool: Vec<u8>,
    /// Data file path, `{id}` is replaced with the simulation id.
    pub data_path_template: String,
    /// `KeyboardEvent.code` that triggers an attempt.
    pub attempt_key: String,
    pub log_level: String,
    pub user_id_key: String,
    pub results_key: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cadences_ms: vec![750, 500, 250],
            feedback_window_ms: 750,
            attempts_per_session: 3,
            simulation_pool: (1..=6).collect(),
            data_path_template: "/jungle_speed_simulacion_{id}.csv".to_string(),
            attempt_key: "Space".to_string(),
            log_level: "info".to_string(),
            user_id_key: "jungle_speed_user_id".to_string(),
            results_key: "jungle_speed_results".to_string(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: GameConfig = if json.trim().is_empty() {
            GameConfig::default()
        } else {
            serde_json::from_str(json)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.cadences_ms.is_empty() || self.cadences_ms.contains(&0) {
            return Err(EngineError::InvalidConfig(
                "cadences_ms must list at least one non-zero interval".to_string(),
            ));
        }
        if self.attempts_per_session == 0 {
            return Err(EngineError::InvalidConfig(
                "attempts_per_session must be at least 1".to_string(),
            ));
        }
        if self.simulation_pool.is_empty() {
            return Err(EngineError::InvalidConfig(
                "simulation_pool must not be empty".to_string(),
            ));
        }
        if !self.data_path_template.contains("{id}") {
            return Err(EngineError::InvalidConfig(
                "data_path_template must contain {id}".to_string(),
            ));
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(EngineError::InvalidConfig(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

thread_local! {
    static CONFIG: RefCell<GameConfig> = RefCell::new(GameConfig::default());
}

/// Read the active config.
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&GameConfig) -> R,
{
    CONFIG.with(|c| f(&c.borrow()))
}

/// Snapshot of the active config.
pub fn current() -> GameConfig {
    with_config(GameConfig::clone)
}

pub fn replace_config(config: GameConfig) {
    CONFIG.with(|c| {
        *c.borrow_mut() = config;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = GameConfig::from_json("{}").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.cadences_ms, vec![750, 500, 250]);
        assert_eq!(config.simulation_pool, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn blank_input_gives_defaults() {
        assert_eq!(GameConfig::from_json("  ").unwrap(), GameConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = GameConfig::from_json(r#"{"feedback_window_ms": 400, "log_level": "debug"}"#)
            .unwrap();
        assert_eq!(config.feedback_window_ms, 400);
        assert_eq!(config.level_filter(), log::LevelFilter::Debug);
        assert_eq!(config.attempts_per_session, 3);
    }

    #[test]
    fn rejects_empty_pool() {
        let err = GameConfig::from_json(r#"{"simulation_pool": []}"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_cadence() {
        assert!(GameConfig::from_json(r#"{"cadences_ms": [750, 0]}"#).is_err());
    }

    #[test]
    fn rejects_template_without_placeholder() {
        assert!(GameConfig::from_json(r#"{"data_path_template": "/data.csv"}"#).is_err());
    }

    #[test]
    fn rejects_bad_log_level() {
        assert!(GameConfig::from_json(r#"{"log_level": "loud"}"#).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = GameConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, EngineError::Json(_)));
    }
}
