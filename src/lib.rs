//! Expected-points engine for Fantasy Premier League.
//!
//! Pulls the public FPL feeds (bootstrap, per-player match histories, the
//! fixture list), scores every finished match line against the published
//! scoring rules, and ranks players by expected points per 90 with an
//! optional opponent-difficulty adjustment over upcoming fixtures.
//!
//! The scoring/difficulty/ranking core is pure and synchronous; network,
//! disk and terminal concerns live in the edge modules around it.

pub mod bootstrap_fetch;
pub mod difficulty;
pub mod display;
pub mod export;
pub mod fixture_fetch;
pub mod history_fetch;
pub mod http_client;
pub mod rankings;
pub mod scoring;
pub mod store;
pub mod update_guard;
