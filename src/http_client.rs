use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_BASE: &str = "https://fantasy.premierleague.com/api";

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("fpl_xp/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")
    })
}

/// Base URL for the fantasy API, overridable for mirrors or local stubs.
pub fn api_base() -> String {
    std::env::var("FPLXP_API_BASE")
        .ok()
        .map(|base| base.trim().trim_end_matches('/').to_string())
        .filter(|base| !base.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

pub fn get_text(url: &str) -> Result<String> {
    let client = http_client()?;
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("request failed: {url}"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading response body")?;
    if !status.is_success() {
        let snippet = body
            .trim()
            .replace(['\n', '\r'], " ")
            .chars()
            .take(220)
            .collect::<String>();
        return Err(anyhow!("request to {url} returned {status}: {snippet}"));
    }
    Ok(body)
}
