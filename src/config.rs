use clap::Parser;

use crate::elo::{EloParams, IngestMode};
use crate::sports::Sport;

/// Season-aware Elo rating engine for team sports
#[derive(Parser, Debug, Clone)]
#[command(name = "sportselo", version, about)]
pub struct Config {
    /// Sport key to run (e.g. "nba", "epl", "college-basketball");
    /// omit to run every covered sport
    #[arg(long, env = "SPORT")]
    pub sport: Option<String>,

    /// Directory holding one event table per sport
    /// (<dir>/<sport>.json or <dir>/<sport>.csv)
    #[arg(long, env = "EVENTS_DIR", default_value = "data/events")]
    pub events_dir: String,

    /// Directory rated events and rating snapshots are written to
    #[arg(long, env = "OUT_DIR", default_value = "data/ratings")]
    pub out_dir: String,

    /// Ingest mode: "auto" detects a resume from the rows themselves,
    /// "refresh"/"upsert" force it
    #[arg(long, env = "MODE", default_value = "auto")]
    pub mode: String,

    /// Project unplayed games forward using the model's own expectations
    #[arg(long, env = "ALLOW_FUTURE", default_value = "false")]
    pub allow_future: bool,

    /// JSON file of known pre-season strengths (team id -> rating), seeded
    /// over the lazy defaults before a full replay; requires --sport
    #[arg(long, env = "PRELOAD")]
    pub preload: Option<String>,

    /// Override the per-sport K-factor
    #[arg(long, env = "K_FACTOR")]
    pub k: Option<f64>,

    /// Override the per-sport home-field advantage (rating points)
    #[arg(long, env = "HOME_FIELD_ADVANTAGE")]
    pub home_field_advantage: Option<f64>,

    /// Mean rating unseen teams start at and season reversion pulls toward
    #[arg(long, env = "MEAN_RATING", default_value = "1505.0")]
    pub mean_rating: f64,

    /// Logistic width of the expectation curve
    #[arg(long, env = "RATING_WIDTH", default_value = "800.0")]
    pub width: f64,

    /// Fraction of each rating's distance from the mean removed at a season
    /// boundary (0.0–1.0)
    #[arg(long, env = "REVERT_PERCENTAGE", default_value = "0.3333333333333333")]
    pub revert_percentage: f64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(key) = &self.sport {
            if Sport::from_key(key).is_none() {
                anyhow::bail!(
                    "Unknown sport {key:?}. Known keys: {}",
                    Sport::all()
                        .iter()
                        .map(|s| s.key())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        if !matches!(
            self.mode.trim().to_lowercase().as_str(),
            "auto" | "refresh" | "upsert"
        ) {
            anyhow::bail!(
                "Invalid mode {:?} (expected \"auto\", \"refresh\" or \"upsert\")",
                self.mode
            );
        }
        if !(0.0..=1.0).contains(&self.revert_percentage) {
            anyhow::bail!("revert_percentage must be between 0.0 and 1.0");
        }
        if self.preload.is_some() && self.sport.is_none() {
            anyhow::bail!("--preload seeds one league's ratings; pass --sport with it");
        }
        if let Some(k) = self.k {
            if k <= 0.0 {
                anyhow::bail!("k must be positive");
            }
        }
        if self.width <= 0.0 {
            anyhow::bail!("width must be positive");
        }
        if !self.mean_rating.is_finite() {
            anyhow::bail!("mean_rating must be a finite number");
        }
        Ok(())
    }

    /// The sports this invocation covers.
    pub fn sports(&self) -> Vec<Sport> {
        match self.sport.as_deref().and_then(Sport::from_key) {
            Some(sport) => vec![sport],
            None => Sport::all().to_vec(),
        }
    }

    /// Forced ingest mode; `None` means auto-detect from the event table.
    pub fn forced_mode(&self) -> Option<IngestMode> {
        match self.mode.trim().to_lowercase().as_str() {
            "refresh" => Some(IngestMode::Refresh),
            "upsert" => Some(IngestMode::Upsert),
            _ => None,
        }
    }

    /// Per-sport defaults with any CLI overrides applied on top.
    pub fn params_for(&self, sport: Sport) -> EloParams {
        let mut params = sport.default_params();
        if let Some(k) = self.k {
            params.k = k;
        }
        if let Some(hfa) = self.home_field_advantage {
            params.home_field_advantage = hfa;
        }
        params.mean_rating = self.mean_rating;
        params.width = self.width;
        params.revert_percentage = self.revert_percentage;
        params.allow_future = self.allow_future;
        params
    }
}
