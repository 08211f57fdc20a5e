use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scheduled or finished game between two teams.
///
/// Rows arrive from the surrounding pipeline in any order; the replay engine
/// sorts by `(season, date)` itself. The `*_elo_*` columns are only populated
/// when a row comes out of a previous run and is being fed back in for an
/// incremental resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Stable external event ID
    pub event_id: String,
    /// Season year the event belongs to (externally assigned, never recomputed)
    pub season: i32,
    pub date: DateTime<Utc>,
    pub neutral_site: bool,
    #[serde(default)]
    pub postseason: bool,
    pub home_team_id: String,
    pub home_team_name: String,
    pub away_team_id: String,
    pub away_team_name: String,
    /// Final score, `None` until the game has been played
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    #[serde(default)]
    pub home_elo_pre: Option<f64>,
    #[serde(default)]
    pub away_elo_pre: Option<f64>,
    #[serde(default)]
    pub home_elo_prob: Option<f64>,
    #[serde(default)]
    pub away_elo_prob: Option<f64>,
    #[serde(default)]
    pub home_elo_post: Option<f64>,
    #[serde(default)]
    pub away_elo_post: Option<f64>,
}

impl EventRecord {
    /// Both final scores are on the board.
    pub fn is_finished(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    /// The row carries pre-game ratings for both sides, i.e. it has already
    /// been through a replay.
    pub fn has_prior_ratings(&self) -> bool {
        self.home_elo_pre.is_some() && self.away_elo_pre.is_some()
    }

    /// Finished *and* already rated, so an upsert run has nothing left to do.
    pub fn is_resolved(&self) -> bool {
        self.is_finished() && self.has_prior_ratings()
    }
}

/// An event annotated with the ratings and probabilities of one replay pass.
///
/// `home_elo_post`/`away_elo_post` stay `None` for unplayed games when future
/// projection is off: the row still carries a win probability but the ledger
/// was not touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatedEvent {
    pub event_id: String,
    pub season: i32,
    pub date: DateTime<Utc>,
    pub neutral_site: bool,
    pub postseason: bool,
    pub home_team_id: String,
    pub home_team_name: String,
    pub away_team_id: String,
    pub away_team_name: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub home_elo_pre: f64,
    pub away_elo_pre: f64,
    pub home_elo_prob: f64,
    pub away_elo_prob: f64,
    pub home_elo_post: Option<f64>,
    pub away_elo_post: Option<f64>,
    /// Implied point spread, negative when the home team is favored.
    /// Filled in by the spread pass after the replay.
    #[serde(default)]
    pub spread: Option<f64>,
}

impl RatedEvent {
    /// Pre-game rating differential from the home side's perspective,
    /// including home-field advantage when the site is not neutral.
    pub fn rating_diff(&self, home_field_advantage: f64) -> f64 {
        let hfa = if self.neutral_site {
            0.0
        } else {
            home_field_advantage
        };
        self.home_elo_pre - self.away_elo_pre + hfa
    }
}

/// Final per-team rating at the end of a replay, for persistence/resumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub team_id: String,
    pub rating: f64,
    /// 1-based position when sorted strongest first
    pub rank: usize,
}
