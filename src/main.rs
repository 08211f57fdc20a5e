use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

mod config;
mod elo;
mod models;
mod sports;
mod spread;
mod store;

use config::Config;
use elo::{EloParams, ReplayEngine};
use models::EventRecord;
use sports::{Sport, SpreadStrategy};
use spread::{GammaParams, SpreadModel};

fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Sports replay independently; one bad feed must not sink the others
    let mut statuses: Vec<(Sport, bool)> = Vec::new();
    for sport in config.sports() {
        match run_sport(&config, sport) {
            Ok(()) => statuses.push((sport, true)),
            Err(err) => {
                error!("{sport}: {err:#}");
                statuses.push((sport, false));
            }
        }
    }

    info!("Rating pump status report");
    for (sport, ok) in &statuses {
        info!("  {sport}: {}", if *ok { "PASSED" } else { "FAILED" });
    }
    let failures = statuses.iter().filter(|(_, ok)| !ok).count();
    if failures > 0 {
        anyhow::bail!("{failures} sport run(s) failed");
    }
    Ok(())
}

fn run_sport(config: &Config, sport: Sport) -> Result<()> {
    let table = event_table_path(&config.events_dir, sport)?;
    let events = store::load_events(&table)?;
    if events.is_empty() {
        warn!("{sport}: event table {} is empty, skipping", table.display());
        return Ok(());
    }

    log_table_coverage(sport, &events);

    // Margins for spread calibration come from the full history, including
    // rows an upsert run won't replay
    let margins = finished_margins(&events);

    let mut params = config.params_for(sport);
    if let Some(preload) = &config.preload {
        params.preloaded = store::load_preloads(Path::new(preload))?;
        info!(
            "{sport}: seeding {} preloaded rating(s) from {preload}",
            params.preloaded.len()
        );
    }
    let engine = match config.forced_mode() {
        Some(mode) => ReplayEngine::with_mode(events, params.clone(), mode)?,
        None => ReplayEngine::new(events, params.clone())?,
    };
    info!(
        "{sport}: {:?} mode, {} event(s) to replay",
        engine.mode(),
        engine.pending_events()
    );
    let run = engine.run();

    let mut rated = run.events;
    if let Some(model) = spread_model_for(sport, &params, &margins) {
        for ev in &mut rated {
            ev.spread = Some(model.spread(
                ev.home_elo_prob,
                ev.rating_diff(params.home_field_advantage),
            ));
        }
    }

    let out_dir = Path::new(&config.out_dir);
    store::write_rated_events(&out_dir.join(format!("{}.json", sport.key())), &rated)
        .context("Failed to write rated events")?;
    store::write_snapshots(
        &out_dir.join(format!("{}-teams.json", sport.key())),
        &store::team_snapshots(&run.ratings),
    )
    .context("Failed to write team snapshots")?;
    info!(
        "{sport}: wrote {} rated event(s) and {} team rating(s)",
        rated.len(),
        run.ratings.len()
    );
    Ok(())
}

/// `<events_dir>/<sport>.json`, falling back to `.csv`.
fn event_table_path(events_dir: &str, sport: Sport) -> Result<PathBuf> {
    let dir = Path::new(events_dir);
    for ext in ["json", "csv"] {
        let candidate = dir.join(format!("{}.{ext}", sport.key()));
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    anyhow::bail!(
        "No event table for {sport} under {events_dir} (expected {key}.json or {key}.csv)",
        key = sport.key()
    )
}

/// Flag event tables that look stale or partial. Season labels are assigned
/// by the feed and never recomputed here; the calendar only drives
/// diagnostics.
fn log_table_coverage(sport: Sport, events: &[EventRecord]) {
    let current = sport.season_for_date(chrono::Utc::now());
    if let Some(latest) = events.iter().map(|ev| ev.season).max() {
        if latest < current {
            warn!("{sport}: event table ends at season {latest}, current season is {current}");
        }
    }
    if let Some(earliest) = events.iter().map(|ev| ev.season).min() {
        if earliest > sport.start_season() {
            debug!(
                "{sport}: table starts at season {earliest}, full history begins {}",
                sport.start_season()
            );
        }
    }
}

/// Signed margins (away - home) of finished games in chronological order.
fn finished_margins(events: &[EventRecord]) -> Vec<f64> {
    let mut finished: Vec<&EventRecord> = events.iter().filter(|ev| ev.is_finished()).collect();
    finished.sort_by(|a, b| (a.season, a.date).cmp(&(b.season, b.date)));
    finished
        .iter()
        .filter_map(|ev| match (ev.home_score, ev.away_score) {
            (Some(home), Some(away)) => Some(f64::from(away - home)),
            _ => None,
        })
        .collect()
}

fn spread_model_for(sport: Sport, params: &EloParams, margins: &[f64]) -> Option<SpreadModel> {
    match sport.spread_strategy() {
        SpreadStrategy::Linear { volatility } => Some(SpreadModel::Linear {
            adjusted_k: params.k * volatility,
        }),
        SpreadStrategy::GammaFit => match GammaParams::fit(margins) {
            Some(fitted) => Some(SpreadModel::Gamma(fitted)),
            None => {
                warn!("{sport}: margin history too thin to calibrate spreads");
                None
            }
        },
    }
}
