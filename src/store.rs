use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;

use crate::models::{EventRecord, RatedEvent, TeamSnapshot};

/// Load an event table from disk. JSON (an array of records) and CSV (one
/// record per row, empty cells for unknown scores/ratings) are accepted;
/// which one the surrounding pipeline emits varies by sport.
pub fn load_events(path: &Path) -> Result<Vec<EventRecord>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "json" => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read event table {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse event table {}", path.display()))
        }
        "csv" => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open event table {}", path.display()))?;
            read_csv_events(file)
                .with_context(|| format!("Failed to parse event table {}", path.display()))
        }
        other => bail!("Unsupported event table format {other:?} (expected .json or .csv)"),
    }
}

fn read_csv_events<R: std::io::Read>(reader: R) -> Result<Vec<EventRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut events = Vec::new();
    for row in csv_reader.deserialize() {
        events.push(row?);
    }
    Ok(events)
}

/// Known pre-season strengths: a JSON object of team id -> rating.
pub fn load_preloads(path: &Path) -> Result<HashMap<String, f64>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read preloaded ratings {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse preloaded ratings {}", path.display()))
}

/// Write the rated event table as pretty JSON, creating parent directories
/// as needed.
pub fn write_rated_events(path: &Path, events: &[RatedEvent]) -> Result<()> {
    write_json(path, events)
}

/// Write the final per-team snapshot, strongest team first.
pub fn write_snapshots(path: &Path, snapshots: &[TeamSnapshot]) -> Result<()> {
    write_json(path, snapshots)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))
}

/// Rank the final ratings map into snapshot rows, strongest first. Ties
/// break alphabetically so the output is deterministic.
pub fn team_snapshots(ratings: &HashMap<String, f64>) -> Vec<TeamSnapshot> {
    let mut rows: Vec<(String, f64)> = ratings
        .iter()
        .map(|(team_id, rating)| (team_id.clone(), *rating))
        .collect();
    rows.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    rows.into_iter()
        .enumerate()
        .map(|(i, (team_id, rating))| TeamSnapshot {
            team_id,
            rating,
            rank: i + 1,
        })
        .collect()
}
