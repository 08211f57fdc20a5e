pub mod algorithm;
pub mod ledger;
pub mod outcome;
pub mod replay;

pub use algorithm::{rate_game, GameOutcome};
pub use ledger::RatingLedger;
pub use outcome::{resolve_outcome, GameResolution};
pub use replay::{IngestMode, ReplayEngine, ReplayRun};

use std::collections::HashMap;
use thiserror::Error;

/// Fail-fast construction errors. These indicate a misconfigured run or a
/// corrupt event feed, never a recoverable in-replay condition.
#[derive(Debug, Error)]
pub enum EloError {
    #[error("revert percentage must be within [0.0, 1.0], got {0}")]
    RevertPercentageOutOfRange(f64),
    #[error("k factor must be a positive number, got {0}")]
    NonPositiveK(f64),
    #[error("rating width must be a positive number, got {0}")]
    NonPositiveWidth(f64),
    #[error("event {event_id} lists team {team_id} on both sides")]
    SameTeamBothSides { event_id: String, team_id: String },
}

/// Immutable rating hyperparameters for one replay run.
#[derive(Debug, Clone)]
pub struct EloParams {
    /// Sensitivity of a rating to a single game's surprise
    pub k: f64,
    /// Rating-point bonus for the home side off neutral sites
    pub home_field_advantage: f64,
    /// Rating every unseen team starts at, and the center regression pulls
    /// toward at season boundaries
    pub mean_rating: f64,
    /// Logistic scale of the expectation curve (the Elo "400-point" constant)
    pub width: f64,
    /// Fraction of each team's distance from the mean removed at a season
    /// boundary; must be within [0, 1]
    pub revert_percentage: f64,
    /// Known pre-season strengths, merged over the lazy defaults. When
    /// non-empty the full event set is replayed from these seeds.
    pub preloaded: HashMap<String, f64>,
    /// Project unplayed games using the model's own expectation instead of
    /// leaving them as probability-only rows
    pub allow_future: bool,
}

impl Default for EloParams {
    fn default() -> Self {
        EloParams {
            k: 20.0,
            home_field_advantage: 100.0,
            mean_rating: 1505.0,
            width: 800.0,
            revert_percentage: 1.0 / 3.0,
            preloaded: HashMap::new(),
            allow_future: false,
        }
    }
}

impl EloParams {
    pub fn validate(&self) -> Result<(), EloError> {
        if !(0.0..=1.0).contains(&self.revert_percentage) {
            return Err(EloError::RevertPercentageOutOfRange(self.revert_percentage));
        }
        if !(self.k > 0.0) || !self.k.is_finite() {
            return Err(EloError::NonPositiveK(self.k));
        }
        if !(self.width > 0.0) || !self.width.is_finite() {
            return Err(EloError::NonPositiveWidth(self.width));
        }
        Ok(())
    }
}
