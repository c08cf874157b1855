pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod utils;

pub use api::*;
pub use error::*;
pub use ledger::{Ledger, SharedLedger};
pub use models::*;
pub use utils::*;

use anyhow::{Context, Result};
use api::openfootball_api::{generate_standings, upcoming_matches, FeedMatch, OpenFootballClient};
use chrono::Utc;
use config::LeagueConfig;
use serde::Serialize;
use std::sync::Arc;
use utils::data::{JsonFileStore, SnapshotStore};

/// Number of upcoming La Liga fixtures shown by default
pub const DEFAULT_UPCOMING_LIMIT: usize = 10;

/// La Liga data derived from the season feed
#[derive(Debug, Clone, Serialize)]
pub struct LaLigaData {
    pub standings: Vec<StandingRow>,
    pub upcoming: Vec<FeedMatch>,
}

/// Open the custom league ledger backed by JSON files in the configured data directory
pub fn open_ledger(config: &LeagueConfig) -> Result<SharedLedger> {
    let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(&config.data_dir));
    Ledger::from_config(config, store)
        .with_context(|| format!("Failed to open ledger in {}", config.data_dir.display()))
}

/// Fetch the season feed and derive the table and upcoming fixtures
pub async fn fetch_laliga_data(feed_url: &str, upcoming_limit: usize) -> Result<LaLigaData> {
    let client =
        OpenFootballClient::new(feed_url.to_string()).context("Failed to build HTTP client")?;
    let matches = client
        .fetch_matches()
        .await
        .context("Failed to fetch La Liga matches")?;

    let today = Utc::now().date_naive();
    Ok(LaLigaData {
        standings: generate_standings(&matches),
        upcoming: upcoming_matches(&matches, today, upcoming_limit),
    })
}

/// Install the `tracing` subscriber, filtered by `RUST_LOG` (default `info`)
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
