//! The per-game Elo update.
//!
//! Expected win probabilities come from a logistic curve on the rating
//! differential, generalized from the classic 400-point convention by the
//! configurable `width`. The realized result is weighted by a
//! margin-of-victory multiplier that tempers blowouts by the favorite
//! (a 30-point win the model already expected carries little news) while
//! amplifying upsets, which also keeps rating changes from autocorrelating
//! across a favorite's winning streak.
//!
//! The rating transfer is strictly zero-sum: whatever the home side gains,
//! the away side loses.

use tracing::warn;

use super::outcome::{game_result, GameResolution};
use super::EloParams;

/// Result of rating one game. Probabilities are always present; post-game
/// ratings are `None` when the game did not resolve (pending row, or a
/// degenerate update that was skipped).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameOutcome {
    pub home_prob: f64,
    pub away_prob: f64,
    pub home_post: Option<f64>,
    pub away_post: Option<f64>,
}

/// Rate a single game.
///
/// # Arguments
/// * `home_rating`/`away_rating` – pre-game ratings.
/// * `neutral_site` – suppresses the home-field bonus.
/// * `resolution` – what the scoreline resolved to (see `resolve_outcome`).
/// * `params` – run hyperparameters; assumed validated at construction.
pub fn rate_game(
    home_rating: f64,
    away_rating: f64,
    neutral_site: bool,
    resolution: GameResolution,
    params: &EloParams,
) -> GameOutcome {
    debug_assert!(params.width > 0.0, "width must be validated upstream");
    debug_assert!(params.k > 0.0, "k must be validated upstream");

    let hfa = if neutral_site {
        0.0
    } else {
        params.home_field_advantage
    };
    let diff = home_rating - away_rating + hfa;

    // Computed symmetrically rather than as 1 - home to keep the exact
    // floating-point behavior at extreme differentials.
    let home_prob = 1.0 / (10f64.powf(-diff / params.width) + 1.0);
    let away_prob = 1.0 / (10f64.powf(diff / params.width) + 1.0);

    let margin = match resolution {
        GameResolution::Pending => {
            return GameOutcome {
                home_prob,
                away_prob,
                home_post: None,
                away_post: None,
            }
        }
        GameResolution::Projected => home_prob - away_prob,
        GameResolution::Final { margin } => margin,
    };

    let result = game_result(margin);

    // The multiplier shrinks when the favorite wins big (expected) and grows
    // for upsets. Ties skip the favorite adjustment entirely.
    let denom = if result == 0.5 {
        1.0
    } else {
        let favored = if result == 1.0 { diff } else { -diff };
        favored * 0.001 + 2.2
    };
    let mult = (margin.abs().max(1.0) + 1.0).ln() * (2.2 / denom);

    let shift = params.k * mult * (result - home_prob);
    let home_post = home_rating + shift;
    let away_post = away_rating - shift;

    // A pathological differential can zero out `denom`; one bad row must not
    // poison the ledger or abort the replay.
    if !home_post.is_finite() || !away_post.is_finite() {
        warn!(
            home_rating,
            away_rating, margin, "degenerate rating update skipped"
        );
        return GameOutcome {
            home_prob,
            away_prob,
            home_post: None,
            away_post: None,
        };
    }

    GameOutcome {
        home_prob,
        away_prob,
        home_post: Some(home_post),
        away_post: Some(away_post),
    }
}
