use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::http_client::{api_base, get_text};
use crate::rankings::PlayerMeta;
use crate::scoring::{Position, ScoringRules};

/// Everything the bootstrap payload contributes: the player metadata
/// table, the team-name lookup and the scoring table.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub players: Vec<PlayerMeta>,
    pub team_names: HashMap<u32, String>,
    pub scoring: ScoringRules,
}

#[derive(Debug, Deserialize)]
struct BootstrapRaw {
    #[serde(default)]
    elements: Vec<ElementRaw>,
    #[serde(default)]
    teams: Vec<TeamRaw>,
    #[serde(default)]
    game_config: Option<GameConfigRaw>,
}

#[derive(Debug, Deserialize)]
struct ElementRaw {
    id: u32,
    web_name: String,
    team: u32,
    element_type: u8,
    #[serde(default)]
    now_cost: u32,
}

#[derive(Debug, Deserialize)]
struct TeamRaw {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GameConfigRaw {
    #[serde(default)]
    scoring: Option<ScoringRules>,
}

pub fn fetch_bootstrap() -> Result<Bootstrap> {
    let url = format!("{}/bootstrap-static/", api_base());
    let body = get_text(&url)?;
    parse_bootstrap_json(&body)
}

pub fn parse_bootstrap_json(raw: &str) -> Result<Bootstrap> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(anyhow!("empty bootstrap response"));
    }
    let parsed: BootstrapRaw = serde_json::from_str(trimmed).context("invalid bootstrap json")?;

    let team_names: HashMap<u32, String> = parsed
        .teams
        .into_iter()
        .map(|team| (team.id, team.name))
        .collect();

    let mut players = Vec::with_capacity(parsed.elements.len());
    for element in parsed.elements {
        // Entries outside the four playing slots (manager cards) are not
        // rankable and carry no history worth fetching.
        let Some(position) = Position::from_element_type(element.element_type) else {
            continue;
        };
        let team_name = team_names
            .get(&element.team)
            .cloned()
            .unwrap_or_else(|| "-".to_string());
        players.push(PlayerMeta {
            id: element.id,
            web_name: element.web_name,
            team_id: element.team,
            team_name,
            position,
            now_cost: element.now_cost,
        });
    }
    players.sort_unstable_by_key(|player| player.id);

    let scoring = parsed
        .game_config
        .and_then(|config| config.scoring)
        .unwrap_or_default();

    Ok(Bootstrap {
        players,
        team_names,
        scoring,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_players_teams_and_scoring() {
        let raw = r#"{
            "teams": [
                {"id": 1, "name": "Arsenal", "short_name": "ARS"},
                {"id": 2, "name": "Aston Villa", "short_name": "AVL"}
            ],
            "elements": [
                {"id": 10, "web_name": "Raya", "team": 1, "element_type": 1, "now_cost": 55},
                {"id": 11, "web_name": "Watkins", "team": 2, "element_type": 4, "now_cost": 90},
                {"id": 12, "web_name": "Arteta", "team": 1, "element_type": 5, "now_cost": 15}
            ],
            "game_config": {
                "scoring": {
                    "long_play": 2,
                    "goals_scored": {"GKP": 10, "DEF": 6, "MID": 5, "FWD": 4},
                    "assists": 3
                }
            }
        }"#;
        let bootstrap = parse_bootstrap_json(raw).expect("bootstrap should parse");

        // The manager card (element_type 5) is dropped.
        assert_eq!(bootstrap.players.len(), 2);
        assert_eq!(bootstrap.players[0].web_name, "Raya");
        assert_eq!(bootstrap.players[0].position, Position::Gkp);
        assert_eq!(bootstrap.players[1].team_name, "Aston Villa");
        assert_eq!(bootstrap.team_names.get(&1).map(String::as_str), Some("Arsenal"));

        assert_eq!(bootstrap.scoring.goals_scored.fwd, 4.0);
        assert_eq!(bootstrap.scoring.assists, 3.0);
        // Keys missing from the payload take the published defaults.
        assert_eq!(bootstrap.scoring.red_cards, -3.0);
    }

    #[test]
    fn missing_game_config_falls_back_to_defaults() {
        let raw = r#"{"teams": [], "elements": []}"#;
        let bootstrap = parse_bootstrap_json(raw).expect("bootstrap should parse");
        assert_eq!(bootstrap.scoring, ScoringRules::default());
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(parse_bootstrap_json("").is_err());
        assert!(parse_bootstrap_json("null").is_err());
    }
}
