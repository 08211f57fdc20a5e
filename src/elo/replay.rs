//! Chronological replay of an event table through the rating update.
//!
//! The replay is a Markov chain over (ledger, season): every event sees the
//! ledger exactly as the previous event left it, and the whole ledger
//! regresses toward the mean before the first event of each new season.
//! Events are sorted by `(season, date)` internally; caller ordering is
//! never trusted.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::models::{EventRecord, RatedEvent};

use super::{algorithm, outcome, EloError, EloParams, RatingLedger};

/// How the run ingests its event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Recompute everything from the mean (or preloaded seeds).
    Refresh,
    /// Resume: seed the ledger from previously rated rows and replay only
    /// what they don't cover.
    Upsert,
}

/// Everything a replay run produces.
#[derive(Debug, Clone)]
pub struct ReplayRun {
    /// Replayed events in chronological order, rating-annotated.
    pub events: Vec<RatedEvent>,
    /// Final rating per team, for persistence or the next upsert.
    pub ratings: HashMap<String, f64>,
}

/// Drives one sport's history through the rating update in date order.
#[derive(Debug)]
pub struct ReplayEngine {
    params: EloParams,
    ledger: RatingLedger,
    to_process: Vec<EventRecord>,
    mode: IngestMode,
}

impl ReplayEngine {
    /// Build an engine, detecting the ingest mode from the rows themselves:
    /// any row already carrying pre-game ratings for both sides marks the
    /// table as a resume. Use [`ReplayEngine::with_mode`] when the caller
    /// knows better (a partially populated table can fool the heuristic).
    pub fn new(events: Vec<EventRecord>, params: EloParams) -> Result<Self, EloError> {
        let mode = detect_mode(&events);
        Self::with_mode(events, params, mode)
    }

    pub fn with_mode(
        mut events: Vec<EventRecord>,
        params: EloParams,
        mode: IngestMode,
    ) -> Result<Self, EloError> {
        params.validate()?;
        for ev in &events {
            if ev.home_team_id == ev.away_team_id {
                return Err(EloError::SameTeamBothSides {
                    event_id: ev.event_id.clone(),
                    team_id: ev.home_team_id.clone(),
                });
            }
        }
        events.sort_by(|a, b| (a.season, a.date).cmp(&(b.season, b.date)));

        let mut ledger = RatingLedger::new(params.mean_rating, params.revert_percentage)?;

        // Preloaded seeds force a full replay on top of them, even when the
        // rows look like a resume: known pre-season strengths outrank
        // whatever an earlier run left behind.
        let to_process = if !params.preloaded.is_empty() {
            ledger.seed(&params.preloaded);
            events
        } else {
            match mode {
                IngestMode::Refresh => events,
                IngestMode::Upsert => seed_from_resolved(&mut ledger, events),
            }
        };

        Ok(ReplayEngine {
            params,
            ledger,
            to_process,
            mode,
        })
    }

    pub fn mode(&self) -> IngestMode {
        self.mode
    }

    /// Number of events this run will actually replay.
    pub fn pending_events(&self) -> usize {
        self.to_process.len()
    }

    /// Replay every pending event in chronological order. Consumes the
    /// engine; the ledger's final state comes back in the result.
    pub fn run(self) -> ReplayRun {
        let ReplayEngine {
            params,
            mut ledger,
            to_process,
            mode,
        } = self;

        let mut rated = Vec::with_capacity(to_process.len());
        let mut current_season = to_process.first().map(|ev| ev.season);

        for ev in &to_process {
            if Some(ev.season) != current_season {
                debug!(season = ev.season, "season boundary, regressing ratings");
                ledger.regress_to_mean();
                current_season = Some(ev.season);
            }

            let home_pre = ledger.get(&ev.home_team_id);
            let away_pre = ledger.get(&ev.away_team_id);
            let resolution =
                outcome::resolve_outcome(ev.home_score, ev.away_score, params.allow_future);
            let out = algorithm::rate_game(home_pre, away_pre, ev.neutral_site, resolution, &params);

            if let (Some(home_post), Some(away_post)) = (out.home_post, out.away_post) {
                ledger.set(&ev.home_team_id, home_post);
                ledger.set(&ev.away_team_id, away_post);
            }

            rated.push(RatedEvent {
                event_id: ev.event_id.clone(),
                season: ev.season,
                date: ev.date,
                neutral_site: ev.neutral_site,
                postseason: ev.postseason,
                home_team_id: ev.home_team_id.clone(),
                home_team_name: ev.home_team_name.clone(),
                away_team_id: ev.away_team_id.clone(),
                away_team_name: ev.away_team_name.clone(),
                home_score: ev.home_score,
                away_score: ev.away_score,
                home_elo_pre: home_pre,
                away_elo_pre: away_pre,
                home_elo_prob: out.home_prob,
                away_elo_prob: out.away_prob,
                home_elo_post: out.home_post,
                away_elo_post: out.away_post,
                spread: None,
            });
        }

        info!(
            mode = ?mode,
            events = rated.len(),
            teams = ledger.len(),
            "replay complete"
        );

        ReplayRun {
            events: rated,
            ratings: ledger.into_ratings(),
        }
    }
}

fn detect_mode(events: &[EventRecord]) -> IngestMode {
    if events.iter().any(|ev| ev.has_prior_ratings()) {
        IngestMode::Upsert
    } else {
        IngestMode::Refresh
    }
}

/// Split off the rows an earlier run already resolved, seed the ledger with
/// each team's chronologically latest known rating, and hand back only the
/// rows left to replay. Teams that never appear in the resolved set simply
/// keep the lazy mean default. Resuming across a season gap costs one
/// reversion pass up front.
fn seed_from_resolved(ledger: &mut RatingLedger, events: Vec<EventRecord>) -> Vec<EventRecord> {
    let (resolved, pending): (Vec<_>, Vec<_>) =
        events.into_iter().partition(|ev| ev.is_resolved());

    // `resolved` is already date-sorted, so later inserts win.
    let mut latest: HashMap<String, f64> = HashMap::new();
    for ev in &resolved {
        if let Some(post) = ev.home_elo_post {
            latest.insert(ev.home_team_id.clone(), post);
        }
        if let Some(post) = ev.away_elo_post {
            latest.insert(ev.away_team_id.clone(), post);
        }
    }
    ledger.seed(&latest);

    let resolved_start = resolved.iter().map(|ev| ev.season).min();
    let pending_start = pending.iter().map(|ev| ev.season).min();
    if let (Some(resolved_start), Some(pending_start)) = (resolved_start, pending_start) {
        if resolved_start != pending_start {
            debug!(
                resolved_start,
                pending_start, "resuming across a season gap, regressing once"
            );
            ledger.regress_to_mean();
        }
    }

    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};

    fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 19, 0, 0).unwrap()
    }

    fn game(
        id: &str,
        season: i32,
        day: (i32, u32, u32),
        home: &str,
        away: &str,
        score: Option<(i32, i32)>,
    ) -> EventRecord {
        EventRecord {
            event_id: id.to_string(),
            season,
            date: date(day.0, day.1, day.2),
            neutral_site: true,
            postseason: false,
            home_team_id: home.to_string(),
            home_team_name: home.to_uppercase(),
            away_team_id: away.to_string(),
            away_team_name: away.to_uppercase(),
            home_score: score.map(|s| s.0),
            away_score: score.map(|s| s.1),
            home_elo_pre: None,
            away_elo_pre: None,
            home_elo_prob: None,
            away_elo_prob: None,
            home_elo_post: None,
            away_elo_post: None,
        }
    }

    /// Feed a rated output row back in as a resolved input row.
    fn as_resolved(rated: &RatedEvent) -> EventRecord {
        EventRecord {
            event_id: rated.event_id.clone(),
            season: rated.season,
            date: rated.date,
            neutral_site: rated.neutral_site,
            postseason: rated.postseason,
            home_team_id: rated.home_team_id.clone(),
            home_team_name: rated.home_team_name.clone(),
            away_team_id: rated.away_team_id.clone(),
            away_team_name: rated.away_team_name.clone(),
            home_score: rated.home_score,
            away_score: rated.away_score,
            home_elo_pre: Some(rated.home_elo_pre),
            away_elo_pre: Some(rated.away_elo_pre),
            home_elo_prob: Some(rated.home_elo_prob),
            away_elo_prob: Some(rated.away_elo_prob),
            home_elo_post: rated.home_elo_post,
            away_elo_post: rated.away_elo_post,
        }
    }

    fn base_params() -> EloParams {
        EloParams {
            k: 20.0,
            home_field_advantage: 0.0,
            mean_rating: 1505.0,
            width: 400.0,
            ..EloParams::default()
        }
    }

    #[test]
    fn single_game_season_end_to_end() {
        let events = vec![game("g1", 2024, (2024, 1, 10), "home", "away", Some((10, 0)))];
        let engine = ReplayEngine::new(events, base_params()).unwrap();
        assert_eq!(engine.mode(), IngestMode::Refresh);
        let run = engine.run();

        let rated = &run.events[0];
        assert_relative_eq!(rated.home_elo_prob, 0.5, epsilon = 1e-12);
        assert_relative_eq!(rated.away_elo_prob, 0.5, epsilon = 1e-12);

        let home = run.ratings["home"];
        let away = run.ratings["away"];
        assert!(home > 1505.0 && away < 1505.0);
        assert_relative_eq!(home - 1505.0, 1505.0 - away, epsilon = 1e-9);

        // Resuming from this output with nothing new to play changes nothing.
        let resumed = ReplayEngine::new(vec![as_resolved(rated)], base_params()).unwrap();
        assert_eq!(resumed.mode(), IngestMode::Upsert);
        assert_eq!(resumed.pending_events(), 0);
        let resumed = resumed.run();
        assert!(resumed.events.is_empty());
        assert_relative_eq!(resumed.ratings["home"], home, epsilon = 1e-12);
        assert_relative_eq!(resumed.ratings["away"], away, epsilon = 1e-12);
    }

    #[test]
    fn caller_ordering_is_not_trusted() {
        let ordered = vec![
            game("g1", 2024, (2024, 1, 1), "a", "b", Some((3, 0))),
            game("g2", 2024, (2024, 1, 8), "a", "c", Some((2, 1))),
            game("g3", 2024, (2024, 1, 15), "b", "c", Some((0, 1))),
        ];
        let mut shuffled = ordered.clone();
        shuffled.reverse();

        let from_ordered = ReplayEngine::new(ordered, base_params()).unwrap().run();
        let from_shuffled = ReplayEngine::new(shuffled, base_params()).unwrap().run();

        assert_eq!(
            from_ordered.events[0].event_id,
            from_shuffled.events[0].event_id
        );
        for team in ["a", "b", "c"] {
            assert_relative_eq!(
                from_ordered.ratings[team],
                from_shuffled.ratings[team],
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn split_replay_matches_full_replay() {
        // Same season throughout: replaying in one pass or in two (rate the
        // first half, feed it back, upsert the second half) must agree.
        let first_half = vec![
            game("g1", 2024, (2024, 1, 1), "a", "b", Some((5, 2))),
            game("g2", 2024, (2024, 1, 5), "c", "a", Some((1, 4))),
        ];
        let second_half = vec![
            game("g3", 2024, (2024, 1, 12), "b", "c", Some((2, 2))),
            game("g4", 2024, (2024, 1, 20), "a", "c", Some((0, 3))),
        ];

        let mut full = first_half.clone();
        full.extend(second_half.clone());
        let full_run = ReplayEngine::new(full, base_params()).unwrap().run();

        let first_run = ReplayEngine::new(first_half, base_params()).unwrap().run();
        let mut resumed: Vec<EventRecord> =
            first_run.events.iter().map(as_resolved).collect();
        resumed.extend(second_half);
        let engine = ReplayEngine::new(resumed, base_params()).unwrap();
        assert_eq!(engine.mode(), IngestMode::Upsert);
        assert_eq!(engine.pending_events(), 2);
        let second_run = engine.run();

        for team in ["a", "b", "c"] {
            assert_relative_eq!(
                full_run.ratings[team],
                second_run.ratings[team],
                epsilon = 1e-9,
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn season_boundary_regresses_before_the_first_new_game() {
        let mut params = base_params();
        params.revert_percentage = 0.5;
        let events = vec![
            game("g1", 2023, (2023, 3, 1), "a", "b", Some((20, 0))),
            // unplayed opener of the next season: pre-game ratings must
            // already reflect the reversion
            game("g2", 2024, (2024, 3, 1), "a", "b", None),
        ];
        let run = ReplayEngine::new(events, params).unwrap().run();

        let post_2023 = run.events[0].home_elo_post.unwrap();
        let opener_pre = run.events[1].home_elo_pre;
        assert_relative_eq!(
            opener_pre - 1505.0,
            (post_2023 - 1505.0) * 0.5,
            epsilon = 1e-9
        );
    }

    #[test]
    fn upsert_across_a_season_gap_regresses_once() {
        let first = ReplayEngine::new(
            vec![game("g1", 2023, (2023, 3, 1), "a", "b", Some((10, 0)))],
            base_params(),
        )
        .unwrap()
        .run();
        let a_after_2023 = first.ratings["a"];

        let mut resumed: Vec<EventRecord> = first.events.iter().map(as_resolved).collect();
        resumed.push(game("g2", 2024, (2024, 3, 1), "a", "b", None));
        let run = ReplayEngine::new(resumed, base_params()).unwrap().run();

        let expected = 1505.0 + (a_after_2023 - 1505.0) * (1.0 - 1.0 / 3.0);
        assert_relative_eq!(run.events[0].home_elo_pre, expected, epsilon = 1e-9);
    }

    #[test]
    fn upsert_seeds_unseen_teams_at_the_mean() {
        let first = ReplayEngine::new(
            vec![game("g1", 2024, (2024, 1, 1), "a", "b", Some((2, 1)))],
            base_params(),
        )
        .unwrap()
        .run();

        let mut resumed: Vec<EventRecord> = first.events.iter().map(as_resolved).collect();
        // An expansion team shows up mid-season with no history
        resumed.push(game("g2", 2024, (2024, 2, 1), "newcomer", "a", None));
        let run = ReplayEngine::new(resumed, base_params()).unwrap().run();
        assert_relative_eq!(run.events[0].home_elo_pre, 1505.0, epsilon = 1e-12);
    }

    #[test]
    fn unplayed_games_contribute_probabilities_without_touching_the_ledger() {
        let events = vec![
            game("g1", 2024, (2024, 1, 1), "a", "b", Some((4, 2))),
            game("g2", 2024, (2024, 1, 8), "a", "b", None),
        ];
        let run = ReplayEngine::new(events, base_params()).unwrap().run();
        let future = &run.events[1];
        assert!(future.home_elo_post.is_none());
        assert!(future.away_elo_post.is_none());
        assert!(future.home_elo_prob > 0.5, "winner of g1 should be favored");
        // ledger still holds the post-g1 ratings
        assert_relative_eq!(
            run.ratings["a"],
            run.events[0].home_elo_post.unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn future_projection_rolls_ratings_forward() {
        let mut params = base_params();
        params.allow_future = true;
        let events = vec![
            game("g1", 2024, (2024, 1, 1), "a", "b", Some((4, 0))),
            game("g2", 2024, (2024, 1, 8), "a", "b", None),
        ];
        let run = ReplayEngine::new(events, params).unwrap().run();
        let future = &run.events[1];
        assert!(future.home_elo_post.is_some());
        assert!(future.home_elo_post.unwrap() > future.home_elo_pre);
    }

    #[test]
    fn preloaded_seeds_force_a_full_replay() {
        let first = ReplayEngine::new(
            vec![game("g1", 2024, (2024, 1, 1), "a", "b", Some((2, 0)))],
            base_params(),
        )
        .unwrap()
        .run();

        let mut params = base_params();
        params.preloaded.insert("a".to_string(), 1700.0);
        let resumed: Vec<EventRecord> = first.events.iter().map(as_resolved).collect();
        let engine = ReplayEngine::new(resumed, params).unwrap();
        // resolved rows would normally be skipped; seeds replay them
        assert_eq!(engine.pending_events(), 1);
        let run = engine.run();
        assert_relative_eq!(run.events[0].home_elo_pre, 1700.0, epsilon = 1e-12);
    }

    #[test]
    fn a_team_playing_itself_is_rejected_up_front() {
        let events = vec![game("g1", 2024, (2024, 1, 1), "a", "a", Some((1, 0)))];
        let err = ReplayEngine::new(events, base_params()).unwrap_err();
        assert!(matches!(err, EloError::SameTeamBothSides { .. }));
    }

    #[test]
    fn invalid_hyperparameters_are_rejected_up_front() {
        let mut params = base_params();
        params.revert_percentage = 1.5;
        let err = ReplayEngine::new(vec![], params).unwrap_err();
        assert!(matches!(err, EloError::RevertPercentageOutOfRange(_)));
    }

    #[test]
    fn empty_event_set_runs_to_an_empty_result() {
        let run = ReplayEngine::new(vec![], base_params()).unwrap().run();
        assert!(run.events.is_empty());
        assert!(run.ratings.is_empty());
    }
}
