use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fpl_xp::bootstrap_fetch;
use fpl_xp::difficulty::DifficultyCurve;
use fpl_xp::display;
use fpl_xp::export;
use fpl_xp::fixture_fetch;
use fpl_xp::history_fetch;
use fpl_xp::rankings::{self, PlayerMeta, RankQuery, SortKey};
use fpl_xp::scoring::{self, Position};
use fpl_xp::store::{self, Dataset};
use fpl_xp::update_guard;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if has_flag("--help") || has_flag("-h") {
        print_usage();
        return Ok(());
    }

    let position = match parse_string_arg("--position") {
        Some(raw) => match Position::parse(&raw) {
            Some(position) => Some(position),
            None => {
                return Err(anyhow!(
                    "unknown position '{raw}' (expected GKP, DEF, MID or FWD)"
                ));
            }
        },
        None => None,
    };
    let sort_key = match parse_string_arg("--sort") {
        Some(raw) => match SortKey::parse(&raw) {
            Some(key) => Some(key),
            None => {
                return Err(anyhow!(
                    "unknown sort key '{raw}' (try xp, points, xp90, points90, mins, cost, name, team)"
                ));
            }
        },
        None => None,
    };
    let mins_percent = parse_f64_arg("--mins").unwrap_or(70.0);
    let games = parse_u32_arg("--games").unwrap_or(5);
    let horizon = parse_u32_arg("--horizon").unwrap_or(5);
    let top = parse_usize_arg("--top").unwrap_or(10);
    let use_difficulty = !has_flag("--no-difficulty");
    let ascending = has_flag("--asc");
    let team = parse_string_arg("--team");
    let max_price = parse_f64_arg("--max-price");
    let export_path = parse_string_arg("--export").map(PathBuf::from);

    let dir = store::data_dir()
        .ok_or_else(|| anyhow!("no usable data directory; set FPLXP_DATA_DIR or HOME"))?;

    let dataset = if has_flag("--refresh")
        || update_guard::should_update(&dir)
        || !store::dataset_present(&dir)
    {
        refresh_dataset(&dir)?
    } else {
        store::load_dataset(&dir)
            .with_context(|| format!("load cached dataset from {}", dir.display()))?
    };
    info!(
        "dataset ready: {} players, {} match rows",
        dataset.players.len(),
        dataset.events.len()
    );

    let thresholds = store::load_thresholds(&dir);
    let scored = scoring::score_events(&dataset.events, &dataset.scoring, &thresholds);

    let curve = if use_difficulty {
        match DifficultyCurve::build(&scored) {
            Ok(curve) => Some(curve),
            Err(err) => {
                warn!("difficulty adjustment disabled: {err}");
                None
            }
        }
    } else {
        None
    };

    let meta: HashMap<u32, PlayerMeta> = dataset
        .players
        .iter()
        .map(|player| (player.id, player.clone()))
        .collect();
    let query = RankQuery {
        position,
        mins_threshold: Some(mins_percent / 100.0),
        recent_rounds: (games > 0).then_some(games),
        horizon: Some(horizon),
    };
    let fixtures = curve.is_some().then_some(dataset.team_fixtures.as_slice());
    let ranking = rankings::rank(&scored, &meta, &query, curve.as_ref(), fixtures);

    let mut rows = ranking.rows;
    display::apply_display_filters(&mut rows, team.as_deref(), max_price);
    if let Some(key) = sort_key {
        rankings::sort_rows(&mut rows, key, ascending);
    } else if ascending {
        rankings::sort_rows(&mut rows, SortKey::ExpectedPoints, true);
    }
    if top > 0 {
        rows.truncate(top);
    }

    println!("{}", display::render_table(&rows));
    println!("{} of {} qualifying players shown", rows.len(), ranking.total);

    if let Some(path) = export_path {
        export::export_rankings(&path, &rows)?;
        info!("rankings written to {}", path.display());
    }

    Ok(())
}

fn refresh_dataset(dir: &Path) -> Result<Dataset> {
    info!("refreshing dataset from the FPL API");
    let bootstrap = bootstrap_fetch::fetch_bootstrap()?;
    let fixtures = fixture_fetch::fetch_fixtures()?;
    info!("pulling match histories for {} players", bootstrap.players.len());
    let history =
        history_fetch::fetch_all_histories(&bootstrap.players, &bootstrap.team_names, &fixtures);
    if !history.errors.is_empty() {
        warn!("{} player history fetches failed", history.errors.len());
        for err in &history.errors {
            warn!("{err}");
        }
    }
    let dataset = Dataset {
        players: bootstrap.players,
        events: history.events,
        team_fixtures: fixtures.team_rounds,
        scoring: bootstrap.scoring,
    };
    store::save_dataset(dir, &dataset)?;
    update_guard::mark_updated(dir)?;
    Ok(dataset)
}

fn print_usage() {
    println!("fpl_xp - rank FPL players by expected points");
    println!();
    println!("Options:");
    println!("  --position=POS     only GKP, DEF, MID or FWD");
    println!("  --mins=P           minimum share of minutes, percent (default 70)");
    println!("  --games=N          recent rounds to consider, 0 = all (default 5)");
    println!("  --horizon=N        upcoming rounds for difficulty adjustment (default 5)");
    println!("  --no-difficulty    skip the opponent-difficulty adjustment");
    println!("  --top=N            rows to show, 0 = all (default 10)");
    println!("  --sort=KEY         xp, points, xp90, points90, mins, cost, name, team");
    println!("  --asc              sort ascending instead of descending");
    println!("  --team=NAME        only teams whose name contains NAME");
    println!("  --max-price=M      only players costing at most M million");
    println!("  --export=PATH      also write the table to an .xlsx workbook");
    println!("  --refresh          force a fresh pull even if today's data is cached");
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_f64_arg(name: &str) -> Option<f64> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<f64>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<f64>()
        {
            return Some(v);
        }
    }
    None
}

fn parse_u32_arg(name: &str) -> Option<u32> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<u32>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<u32>()
        {
            return Some(v);
        }
    }
    None
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<usize>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<usize>()
        {
            return Some(v);
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
