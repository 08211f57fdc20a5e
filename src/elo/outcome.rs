//! Normalizes a raw scoreline into what the rating update should do with it.

/// What a single event contributes to the rating system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameResolution {
    /// Not played yet and projection is off: the event is a look-ahead query
    /// that yields probabilities but no rating change.
    Pending,
    /// Not played yet, but the run projects forward by treating the model's
    /// own expectation as the margin.
    Projected,
    /// Played to a final score.
    Final { margin: f64 },
}

/// Classify raw scores. A half-filled scoreline is ambiguous feed data, not a
/// future game, so it never gets projected; it degrades to a probability-only
/// row even when `allow_future` is set.
pub fn resolve_outcome(
    home_score: Option<i32>,
    away_score: Option<i32>,
    allow_future: bool,
) -> GameResolution {
    match (home_score, away_score) {
        (Some(home), Some(away)) => GameResolution::Final {
            margin: f64::from(home - away),
        },
        (None, None) if allow_future => GameResolution::Projected,
        _ => GameResolution::Pending,
    }
}

/// Map a signed margin to the game result: 1.0 win, 0.5 tie, 0.0 loss, from
/// the home side's perspective.
pub fn game_result(margin: f64) -> f64 {
    if margin > 0.0 {
        1.0
    } else if margin < 0.0 {
        0.0
    } else {
        0.5
    }
}
