use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::difficulty::{DifficultyCurve, TeamFixture, horizon_factors};
use crate::scoring::{Position, ScoredEvent};

/// Display metadata for one player, keyed by the element id the history
/// rows use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMeta {
    pub id: u32,
    pub web_name: String,
    pub team_id: u32,
    pub team_name: String,
    pub position: Position,
    /// Wire units: tenths of a million.
    pub now_cost: u32,
}

/// Query knobs for [`rank`]. `mins_threshold` is a fraction of available
/// minutes, not a minute count.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankQuery {
    pub position: Option<Position>,
    pub mins_threshold: Option<f64>,
    pub recent_rounds: Option<u32>,
    pub horizon: Option<u32>,
}

/// One ranked row. Rank position is implied by order, 1-indexed at the
/// display layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAggregate {
    pub player_id: u32,
    pub web_name: String,
    pub team_name: String,
    pub position: Position,
    pub now_cost: u32,
    pub fixtures: u32,
    pub total_minutes: u32,
    pub average_difficulty: f64,
    /// Applied schedule adjustment, 1.0 when none.
    pub scale: f64,
    pub expected_points_per_90: f64,
    pub actual_points_per_90: f64,
    pub minutes_share: f64,
    pub expected_points: f64,
    pub actual_points: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub rows: Vec<PlayerAggregate>,
    pub total: usize,
}

struct PlayerTotals {
    position: Position,
    minutes: u32,
    expected: f64,
    actual: f64,
    difficulty_sum: f64,
    fixtures: u32,
}

/// Aggregates scored events into one ranked row per player.
///
/// The recency window is measured from the newest round in the full input,
/// and the curve must likewise come from the full history. A schedule
/// adjustment is applied only when the curve, a fixture table and a
/// horizon are all supplied; every degenerate case falls back to an exact
/// 1.0 scale. Zero matching rows is a valid outcome, not an error.
pub fn rank(
    scored: &[ScoredEvent],
    meta: &HashMap<u32, PlayerMeta>,
    query: &RankQuery,
    curve: Option<&DifficultyCurve>,
    fixtures: Option<&[TeamFixture]>,
) -> Ranking {
    let Some(current_round) = scored.iter().map(|row| row.event.round).max() else {
        return Ranking::default();
    };

    let team_factors = match (curve, fixtures, query.horizon) {
        (Some(curve), Some(fixtures), Some(horizon)) => {
            Some(horizon_factors(fixtures, current_round, horizon, curve))
        }
        _ => None,
    };

    let window_start = query
        .recent_rounds
        .map(|rounds| current_round.saturating_sub(rounds));

    // Double gameweeks produce two legitimate rows per round with distinct
    // opponents; identical (player, round, opponent) rows are feed
    // duplicates and collapse to the first seen.
    let mut seen: HashSet<(u32, u32, &str)> = HashSet::new();
    let mut totals: HashMap<u32, PlayerTotals> = HashMap::new();
    for row in scored {
        if let Some(start) = window_start
            && row.event.round <= start
        {
            continue;
        }
        if let Some(position) = query.position
            && row.event.position != position
        {
            continue;
        }
        if !seen.insert((row.event.player_id, row.event.round, row.event.opponent.as_str())) {
            continue;
        }

        let entry = totals
            .entry(row.event.player_id)
            .or_insert_with(|| PlayerTotals {
                position: row.event.position,
                minutes: 0,
                expected: 0.0,
                actual: 0.0,
                difficulty_sum: 0.0,
                fixtures: 0,
            });
        entry.minutes += row.event.minutes;
        entry.expected += row.expected_points;
        entry.actual += f64::from(row.event.total_points);
        entry.difficulty_sum += f64::from(row.event.difficulty_level());
        entry.fixtures += 1;
    }

    let mut player_ids: Vec<u32> = totals.keys().copied().collect();
    player_ids.sort_unstable();

    let mut rows = Vec::with_capacity(player_ids.len());
    for player_id in player_ids {
        let Some(totals) = totals.get(&player_id) else {
            continue;
        };
        let average_difficulty = totals.difficulty_sum / f64::from(totals.fixtures);

        let scale = match (curve, &team_factors) {
            (Some(curve), Some(team_factors)) => {
                let recency = curve.interpolate(average_difficulty);
                let horizon = meta
                    .get(&player_id)
                    .and_then(|m| team_factors.get(&m.team_id))
                    .copied()
                    .unwrap_or(1.0);
                let ratio = horizon / recency;
                if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 }
            }
            _ => 1.0,
        };

        let expected_points_per_90 = if totals.minutes == 0 {
            0.0
        } else {
            totals.expected / f64::from(totals.minutes) * 90.0 * scale
        };
        let actual_points_per_90 = if totals.minutes == 0 {
            0.0
        } else {
            totals.actual / f64::from(totals.minutes) * 90.0
        };
        let minutes_share = f64::from(totals.minutes) / (f64::from(totals.fixtures) * 90.0);

        if let Some(threshold) = query.mins_threshold
            && minutes_share < threshold
        {
            continue;
        }

        let player_meta = meta.get(&player_id);
        rows.push(PlayerAggregate {
            player_id,
            web_name: player_meta
                .map(|m| m.web_name.clone())
                .unwrap_or_else(|| "-".to_string()),
            team_name: player_meta
                .map(|m| m.team_name.clone())
                .unwrap_or_else(|| "-".to_string()),
            position: player_meta.map(|m| m.position).unwrap_or(totals.position),
            now_cost: player_meta.map(|m| m.now_cost).unwrap_or(0),
            fixtures: totals.fixtures,
            total_minutes: totals.minutes,
            average_difficulty,
            scale,
            expected_points_per_90,
            actual_points_per_90,
            minutes_share,
            expected_points: expected_points_per_90 * minutes_share,
            actual_points: totals.actual / f64::from(totals.fixtures),
        });
    }

    rows.sort_by(|a, b| {
        b.expected_points
            .partial_cmp(&a.expected_points)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total = rows.len();
    Ranking { rows, total }
}

/// Display-layer sort column over already-ranked rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    ExpectedPoints,
    ActualPoints,
    ExpectedPer90,
    ActualPer90,
    MinutesShare,
    Cost,
    Name,
    Team,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<SortKey> {
        match raw.trim().to_lowercase().as_str() {
            "xp" | "xpoints" | "expected_points" => Some(SortKey::ExpectedPoints),
            "points" | "actual_points" => Some(SortKey::ActualPoints),
            "xp90" | "expected_points_per_90" => Some(SortKey::ExpectedPer90),
            "points90" | "actual_points_per_90" => Some(SortKey::ActualPer90),
            "mins" | "minutes_share" => Some(SortKey::MinutesShare),
            "cost" | "price" | "now_cost" => Some(SortKey::Cost),
            "name" | "player" | "web_name" => Some(SortKey::Name),
            "team" | "team_name" => Some(SortKey::Team),
            _ => None,
        }
    }
}

/// Re-sorts ranked rows by an arbitrary displayed column. Ties always
/// break toward the cheaper player, whatever the main direction.
pub fn sort_rows(rows: &mut [PlayerAggregate], key: SortKey, ascending: bool) {
    rows.sort_by(|a, b| {
        let ordering = match key {
            SortKey::ExpectedPoints => cmp_f64(a.expected_points, b.expected_points),
            SortKey::ActualPoints => cmp_f64(a.actual_points, b.actual_points),
            SortKey::ExpectedPer90 => {
                cmp_f64(a.expected_points_per_90, b.expected_points_per_90)
            }
            SortKey::ActualPer90 => cmp_f64(a.actual_points_per_90, b.actual_points_per_90),
            SortKey::MinutesShare => cmp_f64(a.minutes_share, b.minutes_share),
            SortKey::Cost => a.now_cost.cmp(&b.now_cost),
            SortKey::Name => a.web_name.cmp(&b.web_name),
            SortKey::Team => a.team_name.cmp(&b.team_name),
        };
        let ordering = if ascending { ordering } else { ordering.reverse() };
        ordering.then_with(|| a.now_cost.cmp(&b.now_cost))
    });
}

fn cmp_f64(a: f64, b: f64) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}
