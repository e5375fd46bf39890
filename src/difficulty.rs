use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::scoring::ScoredEvent;

/// One team's difficulty rating for one scheduled round, from the fixture
/// feed. Covers past and future rounds alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamFixture {
    pub team_id: u32,
    pub round: u32,
    pub fixture_difficulty: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum DifficultyError {
    #[error("no difficulty-{level} fixtures to normalize against")]
    DataUnavailable { level: u8 },
}

/// Scaling factor per difficulty level, normalized so a neutral fixture
/// maps to exactly 1.0. Levels nobody has played yet stay empty and the
/// lookup bridges across them.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyCurve {
    factors: [Option<f64>; 5],
}

impl DifficultyCurve {
    pub const NEUTRAL_LEVEL: u8 = 3;

    /// Derives the curve from scored events grouped by the difficulty each
    /// player faced: mean expected points per level, divided by the neutral
    /// level's mean. Callers pass the full history; recency windows apply
    /// downstream of the curve, never to it.
    pub fn build(scored: &[ScoredEvent]) -> Result<DifficultyCurve, DifficultyError> {
        let mut sums = [0.0_f64; 5];
        let mut counts = [0_u32; 5];
        for row in scored {
            let idx = usize::from(row.event.difficulty_level()) - 1;
            sums[idx] += row.expected_points;
            counts[idx] += 1;
        }

        let neutral = usize::from(Self::NEUTRAL_LEVEL) - 1;
        if counts[neutral] == 0 {
            return Err(DifficultyError::DataUnavailable {
                level: Self::NEUTRAL_LEVEL,
            });
        }
        let baseline = sums[neutral] / f64::from(counts[neutral]);
        if baseline == 0.0 || !baseline.is_finite() {
            return Err(DifficultyError::DataUnavailable {
                level: Self::NEUTRAL_LEVEL,
            });
        }

        let mut factors = [None; 5];
        for idx in 0..factors.len() {
            if counts[idx] > 0 {
                factors[idx] = Some(sums[idx] / f64::from(counts[idx]) / baseline);
            }
        }
        Ok(DifficultyCurve { factors })
    }

    pub fn factor_at(&self, level: u8) -> Option<f64> {
        if (1..=5).contains(&level) {
            self.factors[usize::from(level) - 1]
        } else {
            None
        }
    }

    /// Piecewise-linear lookup between the levels that have data. The input
    /// clamps to [1, 5] and the curve extends flat beyond its known ends.
    pub fn interpolate(&self, average_difficulty: f64) -> f64 {
        let avg = average_difficulty.clamp(1.0, 5.0);
        let mut prev: Option<(f64, f64)> = None;
        for (idx, factor) in self.factors.iter().enumerate() {
            let Some(factor) = *factor else { continue };
            let level = (idx + 1) as f64;
            match prev {
                None if avg <= level => return factor,
                Some((prev_level, prev_factor)) if avg <= level => {
                    if avg == level {
                        return factor;
                    }
                    let t = (avg - prev_level) / (level - prev_level);
                    return prev_factor + t * (factor - prev_factor);
                }
                _ => {}
            }
            prev = Some((level, factor));
        }
        match prev {
            Some((_, factor)) => factor,
            None => 1.0,
        }
    }
}

/// Projects each team's upcoming schedule onto the curve: mean difficulty
/// over the rounds in `(current_round, current_round + horizon]`, run
/// through [`DifficultyCurve::interpolate`]. Teams with nothing scheduled
/// inside the window are absent from the map; callers treat them as
/// neutral.
pub fn horizon_factors(
    fixtures: &[TeamFixture],
    current_round: u32,
    horizon: u32,
    curve: &DifficultyCurve,
) -> HashMap<u32, f64> {
    let window_end = current_round.saturating_add(horizon);
    let mut sums: HashMap<u32, (f64, u32)> = HashMap::new();
    for fixture in fixtures {
        if fixture.round <= current_round || fixture.round > window_end {
            continue;
        }
        let entry = sums.entry(fixture.team_id).or_insert((0.0, 0));
        entry.0 += f64::from(fixture.fixture_difficulty);
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(team_id, (sum, count))| (team_id, curve.interpolate(sum / f64::from(count))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{MatchEvent, Position, ScoredEvent};

    fn scored_stub(difficulty: u8, expected_points: f64) -> ScoredEvent {
        let event = MatchEvent {
            player_id: 1,
            round: 1,
            opponent: "Everton".to_string(),
            position: Position::Mid,
            minutes: 90,
            goals_scored: 0,
            assists: 0,
            goals_conceded: 0,
            own_goals: 0,
            penalties_saved: 0,
            penalties_missed: 0,
            yellow_cards: 0,
            red_cards: 0,
            saves: 0,
            bonus: 0,
            defensive_contribution: 0,
            expected_goals: 0.0,
            expected_assists: 0.0,
            expected_goals_conceded: 0.0,
            fixture_difficulty: Some(difficulty),
            total_points: 0,
        };
        ScoredEvent {
            expected_points,
            expected_points_per_90: expected_points,
            actual_points_per_90: 0.0,
            minutes_share: 1.0,
            event,
        }
    }

    #[test]
    fn neutral_level_normalizes_to_exactly_one() {
        let scored = vec![
            scored_stub(2, 6.0),
            scored_stub(3, 4.0),
            scored_stub(3, 4.0),
            scored_stub(4, 3.0),
        ];
        let curve = DifficultyCurve::build(&scored).unwrap();
        assert_eq!(curve.factor_at(3), Some(1.0));
        assert_eq!(curve.factor_at(2), Some(1.5));
        assert_eq!(curve.factor_at(4), Some(0.75));
        assert_eq!(curve.factor_at(1), None);
    }

    #[test]
    fn missing_neutral_level_is_unavailable() {
        let scored = vec![scored_stub(4, 3.0), scored_stub(5, 2.0)];
        let err = DifficultyCurve::build(&scored).unwrap_err();
        assert!(matches!(err, DifficultyError::DataUnavailable { level: 3 }));
    }

    #[test]
    fn zero_baseline_is_unavailable() {
        let scored = vec![scored_stub(3, 0.0), scored_stub(2, 4.0)];
        assert!(DifficultyCurve::build(&scored).is_err());
    }

    #[test]
    fn interpolation_is_linear_between_levels() {
        let curve = DifficultyCurve {
            factors: [Some(1.4), Some(1.2), Some(1.0), Some(0.8), Some(0.6)],
        };
        assert_eq!(curve.interpolate(3.0), 1.0);
        assert!((curve.interpolate(3.5) - 0.9).abs() < 1e-12);
        assert!((curve.interpolate(1.25) - 1.35).abs() < 1e-12);
    }

    #[test]
    fn interpolation_clamps_and_extends_flat() {
        let curve = DifficultyCurve {
            factors: [None, Some(1.2), Some(1.0), None, Some(0.5)],
        };
        // Below the lowest known level and outside [1, 5].
        assert_eq!(curve.interpolate(1.0), 1.2);
        assert_eq!(curve.interpolate(0.0), 1.2);
        assert_eq!(curve.interpolate(9.0), 0.5);
        // Bridging the missing level 4.
        assert!((curve.interpolate(4.0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn horizon_factors_cover_only_the_window() {
        let curve = DifficultyCurve {
            factors: [Some(1.4), Some(1.2), Some(1.0), Some(0.8), Some(0.6)],
        };
        let fixtures = vec![
            TeamFixture { team_id: 1, round: 3, fixture_difficulty: 5 },
            TeamFixture { team_id: 1, round: 4, fixture_difficulty: 2 },
            TeamFixture { team_id: 1, round: 5, fixture_difficulty: 4 },
            TeamFixture { team_id: 1, round: 6, fixture_difficulty: 5 },
            TeamFixture { team_id: 2, round: 9, fixture_difficulty: 1 },
        ];

        let factors = horizon_factors(&fixtures, 3, 2, &curve);
        // Rounds 4 and 5 only: mean difficulty 3.0.
        assert_eq!(factors.get(&1), Some(&1.0));
        // Nothing scheduled for team 2 inside the window.
        assert!(!factors.contains_key(&2));
    }
}
