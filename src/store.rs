//! Local dataset cache.
//!
//! One refresh writes the whole snapshot as plain csv/json under a single
//! cache directory, so files stay inspectable between runs. Writes go
//! through a temp file and rename; a crash mid-write never leaves a torn
//! file behind.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::difficulty::TeamFixture;
use crate::rankings::PlayerMeta;
use crate::scoring::{MatchEvent, ScoringRules, ScoringThresholds};

const DATA_DIR: &str = "fpl_xp";
const PLAYERS_FILE: &str = "players.csv";
const HISTORY_FILE: &str = "player_histories.csv";
const FIXTURES_FILE: &str = "fixture_difficulty.csv";
const SCORING_FILE: &str = "scoring.json";
const PARAMETERS_FILE: &str = "parameters.json";

/// Everything one refresh produces and one ranking run consumes.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub players: Vec<PlayerMeta>,
    pub events: Vec<MatchEvent>,
    pub team_fixtures: Vec<TeamFixture>,
    pub scoring: ScoringRules,
}

pub fn data_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("FPLXP_DATA_DIR") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base));
        }
    }
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(DATA_DIR));
        }
    }
    // Fallback to ~/.cache on linux-like systems.
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(DATA_DIR))
}

pub fn dataset_present(dir: &Path) -> bool {
    [PLAYERS_FILE, HISTORY_FILE, FIXTURES_FILE, SCORING_FILE]
        .iter()
        .all(|name| dir.join(name).is_file())
}

pub fn save_dataset(dir: &Path, dataset: &Dataset) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create data dir {}", dir.display()))?;
    write_csv(&dir.join(PLAYERS_FILE), &dataset.players)?;
    write_csv(&dir.join(HISTORY_FILE), &dataset.events)?;
    write_csv(&dir.join(FIXTURES_FILE), &dataset.team_fixtures)?;
    write_json(&dir.join(SCORING_FILE), &dataset.scoring)?;
    Ok(())
}

pub fn load_dataset(dir: &Path) -> Result<Dataset> {
    let players = read_csv_file(&dir.join(PLAYERS_FILE))?;
    let events = read_csv_file(&dir.join(HISTORY_FILE))?;
    let team_fixtures = read_csv_file(&dir.join(FIXTURES_FILE))?;
    let scoring = read_json_file(&dir.join(SCORING_FILE))?;
    Ok(Dataset {
        players,
        events,
        team_fixtures,
        scoring,
    })
}

/// Score cutoffs from `parameters.json`, or the published defaults when the
/// file is absent or unreadable.
pub fn load_thresholds(dir: &Path) -> ScoringThresholds {
    let path = dir.join(PARAMETERS_FILE);
    let Ok(raw) = fs::read_to_string(&path) else {
        return ScoringThresholds::default();
    };
    match serde_json::from_str(&raw) {
        Ok(thresholds) => thresholds,
        Err(err) => {
            warn!("ignoring malformed {}: {err}", path.display());
            ScoringThresholds::default()
        }
    }
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let bytes =
        encode_csv(rows).with_context(|| format!("encode rows for {}", path.display()))?;
    write_atomic(path, &bytes)
}

fn encode_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|err| anyhow!("flush csv buffer: {err}"))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json =
        serde_json::to_string(value).with_context(|| format!("encode {}", path.display()))?;
    write_atomic(path, json.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("move {} into place", tmp.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => path.with_extension(format!("{ext}.tmp")),
        None => path.with_extension("tmp"),
    }
}

fn read_csv_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(read_csv_rows(file, &path.display().to_string()))
}

/// Row-tolerant csv read. A malformed row is logged and skipped; the rest
/// of the file still loads.
fn read_csv_rows<T: DeserializeOwned, R: Read>(reader: R, label: &str) -> Vec<T> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => warn!("skipping malformed row in {label}: {err}"),
        }
    }
    rows
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Position;

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let csv = "team_id,round,fixture_difficulty\n1,3,2\noops,not,numbers\n2,3,4\n";
        let rows: Vec<TeamFixture> = read_csv_rows(csv.as_bytes(), "inline");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].team_id, 1);
        assert_eq!(rows[1].fixture_difficulty, 4);
    }

    #[test]
    fn events_survive_the_csv_encoding() {
        let event = MatchEvent {
            player_id: 5,
            round: 2,
            opponent: "Villa".to_string(),
            position: Position::Def,
            minutes: 90,
            goals_scored: 0,
            assists: 1,
            goals_conceded: 2,
            own_goals: 0,
            penalties_saved: 0,
            penalties_missed: 0,
            yellow_cards: 1,
            red_cards: 0,
            saves: 0,
            bonus: 0,
            defensive_contribution: 11,
            expected_goals: 0.12,
            expected_assists: 0.4,
            expected_goals_conceded: 1.7,
            fixture_difficulty: None,
            total_points: 4,
        };
        let bytes = encode_csv(std::slice::from_ref(&event)).unwrap();
        let rows: Vec<MatchEvent> = read_csv_rows(bytes.as_slice(), "inline");
        assert_eq!(rows, vec![event]);
    }

    #[test]
    fn missing_parameters_file_falls_back_to_defaults() {
        let thresholds = load_thresholds(Path::new("/definitely/not/a/real/dir"));
        assert_eq!(thresholds, ScoringThresholds::default());
    }

    #[test]
    fn tmp_files_sit_next_to_the_target() {
        assert_eq!(
            tmp_path(Path::new("/data/players.csv")),
            PathBuf::from("/data/players.csv.tmp")
        );
        assert_eq!(
            tmp_path(Path::new("/data/scoring.json")),
            PathBuf::from("/data/scoring.json.tmp")
        );
    }
}
