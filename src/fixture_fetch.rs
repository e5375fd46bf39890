//! Fixture list download and difficulty lookup.
//!
//! The `fixtures/` endpoint returns every match of the season, scheduled or
//! not. Each fixture carries a difficulty rating per side; we keep two views
//! of that data: a per-team round table for horizon adjustment and a
//! per-fixture map for stamping match history rows.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::difficulty::TeamFixture;
use crate::http_client::{api_base, get_text};

/// Parsed fixture list.
#[derive(Debug, Clone, Default)]
pub struct FixtureTable {
    /// One row per team per scheduled fixture, sorted by (round, team).
    pub team_rounds: Vec<TeamFixture>,
    difficulty_by_fixture: HashMap<u32, (u8, u8)>,
}

impl FixtureTable {
    /// Difficulty of a finished fixture from one side's perspective.
    pub fn difficulty_for(&self, fixture_id: u32, was_home: bool) -> Option<u8> {
        self.difficulty_by_fixture
            .get(&fixture_id)
            .map(|&(home, away)| if was_home { home } else { away })
    }
}

#[derive(Debug, Deserialize)]
struct FixtureRaw {
    id: u32,
    #[serde(default)]
    event: Option<u32>,
    #[serde(default)]
    team_h: u32,
    #[serde(default)]
    team_a: u32,
    #[serde(default)]
    team_h_difficulty: Option<u8>,
    #[serde(default)]
    team_a_difficulty: Option<u8>,
}

pub fn fetch_fixtures() -> Result<FixtureTable> {
    let url = format!("{}/fixtures/", api_base());
    let body = get_text(&url).context("fixtures request failed")?;
    parse_fixtures_json(&body)
}

/// Parse the fixtures payload.
///
/// Fixtures without a difficulty pair are dropped entirely; fixtures without
/// a scheduled round keep their difficulty entry (a played match always has
/// an id) but produce no horizon row.
pub fn parse_fixtures_json(raw: &str) -> Result<FixtureTable> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(anyhow!("fixtures response was empty"));
    }
    let parsed: Vec<FixtureRaw> =
        serde_json::from_str(trimmed).context("fixtures response was not valid json")?;

    let mut team_rounds = Vec::with_capacity(parsed.len() * 2);
    let mut difficulty_by_fixture = HashMap::with_capacity(parsed.len());
    for fixture in parsed {
        let (Some(home), Some(away)) = (fixture.team_h_difficulty, fixture.team_a_difficulty)
        else {
            continue;
        };
        difficulty_by_fixture.insert(fixture.id, (home, away));
        if let Some(round) = fixture.event {
            team_rounds.push(TeamFixture {
                team_id: fixture.team_h,
                round,
                fixture_difficulty: home,
            });
            team_rounds.push(TeamFixture {
                team_id: fixture.team_a,
                round,
                fixture_difficulty: away,
            });
        }
    }
    team_rounds.sort_unstable_by_key(|row| (row.round, row.team_id));

    Ok(FixtureTable {
        team_rounds,
        difficulty_by_fixture,
    })
}
