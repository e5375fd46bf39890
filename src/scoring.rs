use serde::{Deserialize, Serialize};

const NEUTRAL_DIFFICULTY: u8 = 3;

/// Squad slot used by the game's scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Gkp,
    Def,
    Mid,
    Fwd,
}

impl Position {
    pub const ALL: [Position; 4] = [Position::Gkp, Position::Def, Position::Mid, Position::Fwd];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Gkp => "GKP",
            Position::Def => "DEF",
            Position::Mid => "MID",
            Position::Fwd => "FWD",
        }
    }

    pub fn parse(raw: &str) -> Option<Position> {
        match raw.trim().to_uppercase().as_str() {
            "GKP" | "GK" | "GOALKEEPER" => Some(Position::Gkp),
            "DEF" | "DEFENDER" => Some(Position::Def),
            "MID" | "MIDFIELDER" => Some(Position::Mid),
            "FWD" | "FWD." | "FORWARD" => Some(Position::Fwd),
            _ => None,
        }
    }

    /// Maps the API's `element_type` id. Ids beyond the four playing slots
    /// (the 2025/26 assistant-manager chip) have no position here.
    pub fn from_element_type(id: u8) -> Option<Position> {
        match id {
            1 => Some(Position::Gkp),
            2 => Some(Position::Def),
            3 => Some(Position::Mid),
            4 => Some(Position::Fwd),
            _ => None,
        }
    }
}

/// One player's line from a single fixture, as ingested from the
/// element-summary history feed. Immutable once built; derived values live
/// on [`ScoredEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub player_id: u32,
    pub round: u32,
    pub opponent: String,
    pub position: Position,
    pub minutes: u32,
    pub goals_scored: u32,
    pub assists: u32,
    pub goals_conceded: u32,
    pub own_goals: u32,
    pub penalties_saved: u32,
    pub penalties_missed: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub saves: u32,
    pub bonus: u32,
    pub defensive_contribution: u32,
    pub expected_goals: f64,
    pub expected_assists: f64,
    pub expected_goals_conceded: f64,
    pub fixture_difficulty: Option<u8>,
    pub total_points: i32,
}

impl MatchEvent {
    /// Difficulty with unknown or out-of-range ratings treated as neutral.
    pub fn difficulty_level(&self) -> u8 {
        match self.fixture_difficulty {
            Some(level) if (1..=5).contains(&level) => level,
            _ => NEUTRAL_DIFFICULTY,
        }
    }
}

/// Point value of one stat per position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct PositionValues {
    pub gkp: f64,
    pub def: f64,
    pub mid: f64,
    pub fwd: f64,
}

impl PositionValues {
    pub fn for_position(&self, position: Position) -> f64 {
        match position {
            Position::Gkp => self.gkp,
            Position::Def => self.def,
            Position::Mid => self.mid,
            Position::Fwd => self.fwd,
        }
    }
}

/// The game's scoring table (`game_config.scoring` in the bootstrap
/// payload). Keys the payload omits fall back to the published 2025/26
/// rules so a trimmed `scoring.json` still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    pub long_play: f64,
    pub short_play: f64,
    pub goals_scored: PositionValues,
    pub assists: f64,
    pub clean_sheets: PositionValues,
    pub goals_conceded: PositionValues,
    pub own_goals: f64,
    pub penalties_saved: f64,
    pub penalties_missed: f64,
    pub yellow_cards: f64,
    pub red_cards: f64,
    pub saves: f64,
    pub bonus: f64,
    pub defensive_contribution: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            long_play: 2.0,
            short_play: 1.0,
            goals_scored: PositionValues {
                gkp: 10.0,
                def: 6.0,
                mid: 5.0,
                fwd: 4.0,
            },
            assists: 3.0,
            clean_sheets: PositionValues {
                gkp: 4.0,
                def: 4.0,
                mid: 1.0,
                fwd: 0.0,
            },
            goals_conceded: PositionValues {
                gkp: -1.0,
                def: -1.0,
                mid: 0.0,
                fwd: 0.0,
            },
            own_goals: -2.0,
            penalties_saved: 5.0,
            penalties_missed: -2.0,
            yellow_cards: -1.0,
            red_cards: -3.0,
            saves: 1.0,
            bonus: 1.0,
            defensive_contribution: 2.0,
        }
    }
}

/// Cutoffs kept separate from point values (`parameters.json`) so a league
/// tweak does not require refetching the scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringThresholds {
    pub long_play_threshold: u32,
    pub defensive_contribution_threshold: ContributionThresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContributionThresholds {
    pub def: u32,
    pub non_def: u32,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            long_play_threshold: 60,
            defensive_contribution_threshold: ContributionThresholds::default(),
        }
    }
}

impl Default for ContributionThresholds {
    fn default() -> Self {
        Self {
            def: 10,
            non_def: 12,
        }
    }
}

/// A match event annotated with its projected score. Source stats ride
/// along untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEvent {
    pub event: MatchEvent,
    pub expected_points: f64,
    pub expected_points_per_90: f64,
    pub actual_points_per_90: f64,
    pub minutes_share: f64,
}

/// Projects one match line onto the scoring table.
///
/// Goals and assists contribute at their expected rates rather than their
/// realized counts, and the clean sheet enters as the Poisson probability
/// of conceding zero, so the result is an expectation over the match the
/// player actually produced.
pub fn score_event(
    event: &MatchEvent,
    rules: &ScoringRules,
    thresholds: &ScoringThresholds,
) -> ScoredEvent {
    let long_play = event.minutes >= thresholds.long_play_threshold;

    let appearance = if long_play {
        rules.long_play
    } else if event.minutes > 0 {
        rules.short_play
    } else {
        0.0
    };

    let contribution_cutoff = match event.position {
        Position::Def => thresholds.defensive_contribution_threshold.def,
        _ => thresholds.defensive_contribution_threshold.non_def,
    };
    let contribution = if event.defensive_contribution >= contribution_cutoff {
        rules.defensive_contribution
    } else {
        0.0
    };

    let xgc = numeric_or_zero(event.expected_goals_conceded);
    let clean_sheet = if long_play {
        (-xgc).exp() * rules.clean_sheets.for_position(event.position)
    } else {
        0.0
    };
    // The game docks points per two goals conceded, so the expectation is
    // discretized the same way: whole pairs only.
    let conceded = (xgc / 2.0).floor() * rules.goals_conceded.for_position(event.position);

    let expected_points = numeric_or_zero(event.expected_goals)
        * rules.goals_scored.for_position(event.position)
        + numeric_or_zero(event.expected_assists) * rules.assists
        + clean_sheet
        + conceded
        + f64::from(event.own_goals) * rules.own_goals
        + f64::from(event.penalties_saved) * rules.penalties_saved
        + f64::from(event.penalties_missed) * rules.penalties_missed
        + f64::from(event.yellow_cards) * rules.yellow_cards
        + f64::from(event.red_cards) * rules.red_cards
        + f64::from(event.saves / 3) * rules.saves
        + f64::from(event.bonus) * rules.bonus
        + contribution
        + appearance;

    ScoredEvent {
        expected_points,
        expected_points_per_90: per_90(expected_points, event.minutes, event.red_cards),
        actual_points_per_90: per_90(f64::from(event.total_points), event.minutes, event.red_cards),
        minutes_share: f64::from(event.minutes) / 90.0,
        event: event.clone(),
    }
}

pub fn score_events(
    events: &[MatchEvent],
    rules: &ScoringRules,
    thresholds: &ScoringThresholds,
) -> Vec<ScoredEvent> {
    events
        .iter()
        .map(|event| score_event(event, rules, thresholds))
        .collect()
}

/// A red card ends the player's match, so the raw total stands instead of
/// a 90-minute extrapolation.
fn per_90(total: f64, minutes: u32, red_cards: u32) -> f64 {
    if minutes == 0 {
        0.0
    } else if red_cards > 0 {
        total
    } else {
        (total / f64::from(minutes)) * 90.0
    }
}

fn numeric_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_event(position: Position, minutes: u32) -> MatchEvent {
        MatchEvent {
            player_id: 1,
            round: 1,
            opponent: "Arsenal".to_string(),
            position,
            minutes,
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
            fixture_difficulty: Some(3),
            total_points: 0,
        }
    }

    fn score(event: &MatchEvent) -> ScoredEvent {
        score_event(event, &ScoringRules::default(), &ScoringThresholds::default())
    }

    #[test]
    fn zero_minutes_rates_are_zero() {
        let mut event = stub_event(Position::Mid, 0);
        event.expected_goals = 0.8;
        event.bonus = 2;
        event.total_points = 7;
        let scored = score(&event);
        assert_eq!(scored.expected_points_per_90, 0.0);
        assert_eq!(scored.actual_points_per_90, 0.0);
        assert_eq!(scored.minutes_share, 0.0);
    }

    #[test]
    fn red_card_rate_is_the_raw_total() {
        let mut event = stub_event(Position::Def, 35);
        event.red_cards = 1;
        event.expected_goals = 0.4;
        event.total_points = -2;
        let scored = score(&event);
        assert_eq!(scored.expected_points_per_90, scored.expected_points);
        assert_eq!(scored.actual_points_per_90, -2.0);
    }

    #[test]
    fn appearance_points_split_at_long_play_cutoff() {
        // FWD has a zero clean-sheet value, isolating the appearance term.
        assert_eq!(score(&stub_event(Position::Fwd, 60)).expected_points, 2.0);
        assert_eq!(score(&stub_event(Position::Fwd, 59)).expected_points, 1.0);
        assert_eq!(score(&stub_event(Position::Fwd, 0)).expected_points, 0.0);
    }

    #[test]
    fn clean_sheet_expectation_needs_long_play() {
        let mut short = stub_event(Position::Mid, 59);
        short.expected_goals_conceded = 1.2;
        let mut long = short.clone();
        long.minutes = 60;

        let gap = score(&long).expected_points - score(&short).expected_points;
        let expected_gap = (-1.2_f64).exp() * 1.0 + (2.0 - 1.0);
        assert!((gap - expected_gap).abs() < 1e-12);
    }

    #[test]
    fn contribution_cutoff_depends_on_position() {
        let mut defender = stub_event(Position::Def, 90);
        defender.defensive_contribution = 10;
        let mut defender_below = defender.clone();
        defender_below.defensive_contribution = 9;
        assert_eq!(
            score(&defender).expected_points - score(&defender_below).expected_points,
            2.0
        );

        let mut midfielder = stub_event(Position::Mid, 90);
        midfielder.defensive_contribution = 10;
        let mut midfielder_above = midfielder.clone();
        midfielder_above.defensive_contribution = 12;
        assert_eq!(
            score(&midfielder_above).expected_points - score(&midfielder).expected_points,
            2.0
        );
    }

    #[test]
    fn saves_and_conceded_pairs_are_floored() {
        let mut keeper = stub_event(Position::Gkp, 90);
        keeper.saves = 7;
        keeper.expected_goals_conceded = 3.9;
        let scored = score(&keeper);

        // 2 save points, exp(-3.9) * 4 clean sheet, -1 for one whole pair
        // conceded, 2 appearance.
        let expected = 2.0 + (-3.9_f64).exp() * 4.0 - 1.0 + 2.0;
        assert!((scored.expected_points - expected).abs() < 1e-12);
    }

    #[test]
    fn non_finite_stats_contribute_nothing() {
        let mut event = stub_event(Position::Mid, 90);
        event.expected_goals = f64::NAN;
        event.expected_assists = f64::INFINITY;
        let baseline = score(&stub_event(Position::Mid, 90));
        assert_eq!(score(&event).expected_points, baseline.expected_points);
    }

    #[test]
    fn unknown_difficulty_reads_as_neutral() {
        let mut event = stub_event(Position::Mid, 90);
        event.fixture_difficulty = None;
        assert_eq!(event.difficulty_level(), 3);
        event.fixture_difficulty = Some(9);
        assert_eq!(event.difficulty_level(), 3);
        event.fixture_difficulty = Some(5);
        assert_eq!(event.difficulty_level(), 5);
    }
}
