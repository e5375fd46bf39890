//! Once-a-day refresh stamp.
//!
//! The upstream data only moves when matches are played, so one pull per
//! UTC day is plenty. The stamp is a plain date string next to the cached
//! snapshot.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

const STAMP_FILE: &str = "last_update.txt";

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// True when the snapshot under `dir` has not been refreshed today.
/// A missing or garbled stamp counts as stale.
pub fn should_update(dir: &Path) -> bool {
    match fs::read_to_string(dir.join(STAMP_FILE)) {
        Ok(stamp) => stamp.trim() != today(),
        Err(_) => true,
    }
}

pub fn mark_updated(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create data dir {}", dir.display()))?;
    let path = dir.join(STAMP_FILE);
    fs::write(&path, today()).with_context(|| format!("write {}", path.display()))
}
