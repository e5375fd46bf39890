//! Per-player match history download.
//!
//! One `element-summary/{id}/` request per player, fanned out over a bounded
//! rayon pool. A failed player never aborts the season pull; the error is
//! collected next to whatever did arrive.

use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use crate::fixture_fetch::FixtureTable;
use crate::http_client::{api_base, get_text};
use crate::rankings::PlayerMeta;
use crate::scoring::MatchEvent;

/// Result of a season-wide history pull. Partial data plus per-player
/// failure notes, never all-or-nothing.
#[derive(Debug, Default)]
pub struct HistoryFetch {
    pub events: Vec<MatchEvent>,
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ElementSummaryRaw {
    #[serde(default)]
    history: Vec<HistoryRowRaw>,
}

#[derive(Debug, Deserialize)]
struct HistoryRowRaw {
    #[serde(default)]
    fixture: u32,
    #[serde(default)]
    opponent_team: u32,
    #[serde(default)]
    was_home: bool,
    #[serde(default)]
    round: u32,
    #[serde(default)]
    minutes: u32,
    #[serde(default)]
    goals_scored: u32,
    #[serde(default)]
    assists: u32,
    #[serde(default)]
    goals_conceded: u32,
    #[serde(default)]
    own_goals: u32,
    #[serde(default)]
    penalties_saved: u32,
    #[serde(default)]
    penalties_missed: u32,
    #[serde(default)]
    yellow_cards: u32,
    #[serde(default)]
    red_cards: u32,
    #[serde(default)]
    saves: u32,
    #[serde(default)]
    bonus: u32,
    #[serde(default)]
    defensive_contribution: u32,
    #[serde(default)]
    total_points: i32,
    #[serde(default)]
    expected_goals: Value,
    #[serde(default)]
    expected_assists: Value,
    #[serde(default)]
    expected_goals_conceded: Value,
}

/// Fetch the finished-match history for every given player.
///
/// Events come back sorted by (player, round) so downstream grouping is
/// reproducible no matter which request landed first.
pub fn fetch_all_histories(
    players: &[PlayerMeta],
    team_names: &HashMap<u32, String>,
    fixtures: &FixtureTable,
) -> HistoryFetch {
    let results: Vec<Result<Vec<MatchEvent>, String>> = with_fetch_pool(|| {
        players
            .par_iter()
            .map(|player| {
                fetch_player_history(player, team_names, fixtures).map_err(|err| {
                    format!("history fetch failed for {} (id {}): {err}", player.web_name, player.id)
                })
            })
            .collect()
    });

    let mut events = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(rows) => events.extend(rows),
            Err(err) => errors.push(err),
        }
    }
    events.sort_by_key(|event| (event.player_id, event.round));
    HistoryFetch { events, errors }
}

pub fn fetch_player_history(
    player: &PlayerMeta,
    team_names: &HashMap<u32, String>,
    fixtures: &FixtureTable,
) -> Result<Vec<MatchEvent>> {
    let url = format!("{}/element-summary/{}/", api_base(), player.id);
    let body = get_text(&url).context("element summary request failed")?;
    parse_history_json(&body, player, team_names, fixtures)
}

/// Parse one player's element summary into match events.
///
/// The upstream payload carries the expected-goal figures as decimal strings;
/// anything unparseable degrades to zero rather than failing the player.
pub fn parse_history_json(
    raw: &str,
    player: &PlayerMeta,
    team_names: &HashMap<u32, String>,
    fixtures: &FixtureTable,
) -> Result<Vec<MatchEvent>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(anyhow!("element summary response was empty"));
    }
    let parsed: ElementSummaryRaw =
        serde_json::from_str(trimmed).context("element summary response was not valid json")?;

    let events = parsed
        .history
        .into_iter()
        .map(|row| {
            let opponent = team_names
                .get(&row.opponent_team)
                .cloned()
                .unwrap_or_else(|| format!("#{}", row.opponent_team));
            MatchEvent {
                player_id: player.id,
                round: row.round,
                opponent,
                position: player.position,
                minutes: row.minutes,
                goals_scored: row.goals_scored,
                assists: row.assists,
                goals_conceded: row.goals_conceded,
                own_goals: row.own_goals,
                penalties_saved: row.penalties_saved,
                penalties_missed: row.penalties_missed,
                yellow_cards: row.yellow_cards,
                red_cards: row.red_cards,
                saves: row.saves,
                bonus: row.bonus,
                defensive_contribution: row.defensive_contribution,
                expected_goals: stat_value(&row.expected_goals),
                expected_assists: stat_value(&row.expected_assists),
                expected_goals_conceded: stat_value(&row.expected_goals_conceded),
                fixture_difficulty: fixtures.difficulty_for(row.fixture, row.was_home),
                total_points: row.total_points,
            }
        })
        .collect();
    Ok(events)
}

/// String-or-number coercion for the expected-stat columns.
fn stat_value(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

fn with_fetch_pool<T>(action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    let threads = fetch_parallelism();
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

fn fetch_parallelism() -> usize {
    env::var("FPLXP_FETCH_PARALLELISM")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(20)
        .clamp(2, 32)
}
