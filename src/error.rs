//! Error type shared by the engine, the session flow and storage.
//!
//! Only a data-load failure is fatal to gameplay. Malformed card tokens,
//! stale timer ticks and attempts during the feedback window are not errors
//! at all; they degrade to absent/no-op values in the engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not load simulation {simulation}: {reason}")]
    DataLoad { simulation: u8, reason: String },

    #[error("simulation {0} has no rounds")]
    EmptySimulation(u8),

    #[error("malformed round data: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("gender and age range are both required")]
    DemographicsIncomplete,

    #[error("cannot {action} from the {screen} screen")]
    InvalidTransition {
        action: &'static str,
        screen: &'static str,
    },

    #[error("received data for simulation {got}, expected {expected}")]
    UnexpectedSimulation { expected: u8, got: u8 },

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// True for failures that mean an attempt cannot start.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            EngineError::DataLoad { .. } | EngineError::EmptySimulation(_) | EngineError::Csv(_)
        )
    }
}
