//! Error types for the weekend engine.

use crate::phase::RacePhase;
use paddock_env::{EnvError, RaceId};
use thiserror::Error;

/// Illegal transition of a race's phase marker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("Race {race_id} already past {phase}")]
    AlreadyProcessed { race_id: RaceId, phase: RacePhase },

    #[error("Race {race_id} not ready: {phase} has not happened")]
    NotReady { race_id: RaceId, phase: RacePhase },
}

/// Failure of one league's phase.
#[derive(Debug, Error)]
pub enum WeekendError {
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Phase(#[from] PhaseError),
}

impl WeekendError {
    pub fn missing(what: impl Into<String>) -> Self {
        WeekendError::MissingData(what.into())
    }
}
