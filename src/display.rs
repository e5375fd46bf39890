//! Ranked-table rendering.
//!
//! Output mimics a psql result set: bordered, numeric columns right-aligned,
//! one rank column counting from 1. The same formatted cells feed the xlsx
//! export so the two surfaces never disagree on rounding.

use crate::rankings::PlayerAggregate;

pub const HEADERS: [&str; 9] = [
    "Rank", "Player", "xPts", "Pts", "xPts/90", "Pts/90", "%Mins", "Cost", "Team",
];

/// Player and Team read left to right; everything else is numeric.
fn is_left_aligned(column: usize) -> bool {
    matches!(column, 1 | 8)
}

/// Render rows as display cells. Costs arrive in tenths of a million and
/// leave in millions; this is the only place that conversion happens.
pub fn format_rows(rows: &[PlayerAggregate]) -> Vec<Vec<String>> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            vec![
                (idx + 1).to_string(),
                row.web_name.clone(),
                format!("{:.2}", row.expected_points),
                format!("{:.2}", row.actual_points),
                format!("{:.2}", row.expected_points_per_90),
                format!("{:.2}", row.actual_points_per_90),
                format!("{:.2}%", row.minutes_share * 100.0),
                format!("{:.2}", f64::from(row.now_cost) / 10.0),
                row.team_name.clone(),
            ]
        })
        .collect()
}

pub fn render_table(rows: &[PlayerAggregate]) -> String {
    let cells = format_rows(rows);
    let mut widths: Vec<usize> = HEADERS.iter().map(|header| header.chars().count()).collect();
    for row in &cells {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&rule(&widths, '+'));
    out.push('\n');
    out.push_str(&line(
        &HEADERS.map(str::to_string),
        &widths,
    ));
    out.push('\n');
    out.push_str(&rule(&widths, '|'));
    out.push('\n');
    for row in &cells {
        out.push_str(&line(row, &widths));
        out.push('\n');
    }
    out.push_str(&rule(&widths, '+'));
    out
}

fn rule(widths: &[usize], edge: char) -> String {
    let mut out = String::new();
    out.push(edge);
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            out.push('+');
        }
        out.push_str(&"-".repeat(width + 2));
    }
    out.push(edge);
    out
}

fn line(cells: &[String], widths: &[usize]) -> String {
    let mut out = String::from("|");
    for (idx, cell) in cells.iter().enumerate() {
        if is_left_aligned(idx) {
            out.push_str(&format!(" {:<width$} |", cell, width = widths[idx]));
        } else {
            out.push_str(&format!(" {:>width$} |", cell, width = widths[idx]));
        }
    }
    out
}

/// Narrowing applied after ranking: a team name match (case-insensitive
/// substring) and a price ceiling in millions. Neither touches the rank
/// arithmetic, only which rows get shown.
pub fn apply_display_filters(
    rows: &mut Vec<PlayerAggregate>,
    team: Option<&str>,
    max_price: Option<f64>,
) {
    if let Some(team) = team {
        let needle = team.trim().to_lowercase();
        if !needle.is_empty() {
            rows.retain(|row| row.team_name.to_lowercase().contains(&needle));
        }
    }
    if let Some(ceiling) = max_price {
        rows.retain(|row| f64::from(row.now_cost) / 10.0 <= ceiling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Position;

    fn aggregate(name: &str, team: &str, now_cost: u32, xp: f64) -> PlayerAggregate {
        PlayerAggregate {
            player_id: 1,
            web_name: name.to_string(),
            team_name: team.to_string(),
            position: Position::Mid,
            now_cost,
            fixtures: 2,
            total_minutes: 180,
            average_difficulty: 3.0,
            scale: 1.0,
            expected_points_per_90: xp / 2.0,
            actual_points_per_90: 4.5,
            minutes_share: 1.0,
            expected_points: xp,
            actual_points: 9.0,
        }
    }

    #[test]
    fn cells_carry_two_decimals_and_converted_cost() {
        let rows = vec![aggregate("Salah", "Liverpool", 125, 12.345)];
        let cells = format_rows(&rows);
        assert_eq!(cells[0][0], "1");
        assert_eq!(cells[0][2], "12.35");
        assert_eq!(cells[0][6], "100.00%");
        assert_eq!(cells[0][7], "12.50");
        assert_eq!(cells[0][8], "Liverpool");
    }

    #[test]
    fn table_has_psql_borders_and_alignment() {
        let rows = vec![aggregate("Saka", "Arsenal", 102, 8.0)];
        let table = render_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("+-"));
        assert!(lines[0].ends_with("-+"));
        assert!(lines[1].contains("| Player"));
        assert!(lines[2].starts_with("|-"));
        assert!(lines[3].contains("| Saka"));
        assert!(lines[4].starts_with("+-"));
        // every line is the same width once padding is applied
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn team_filter_is_case_insensitive_substring() {
        let mut rows = vec![
            aggregate("Saka", "Arsenal", 102, 8.0),
            aggregate("Salah", "Liverpool", 125, 12.0),
        ];
        apply_display_filters(&mut rows, Some("arse"), None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].web_name, "Saka");
    }

    #[test]
    fn price_ceiling_is_inclusive_in_millions() {
        let mut rows = vec![
            aggregate("Saka", "Arsenal", 102, 8.0),
            aggregate("Salah", "Liverpool", 125, 12.0),
        ];
        apply_display_filters(&mut rows, None, Some(10.2));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].web_name, "Saka");
    }
}
