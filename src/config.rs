use crate::models::TeamId;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

pub const DEFAULT_TEAMS: [&str; 4] = ["Nike FC", "Adidas FC", "Puma FC", "Kappa FC"];
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_LALIGA_FEED_URL: &str =
    "https://raw.githubusercontent.com/openfootball/football.json/master/2025-26/es.1.json";

/// Runtime settings for both binaries
#[derive(Debug, Clone)]
pub struct LeagueConfig {
    pub teams: Vec<TeamId>,
    pub data_dir: PathBuf,
    pub max_fixtures_per_round: usize,
    pub bind_addr: String,
    pub laliga_feed_url: String,
}

/// One round-robin slate: every team plays once
pub fn default_max_fixtures(team_count: usize) -> usize {
    (team_count / 2).max(1)
}

/// Split a comma separated roster, dropping blanks and repeats
fn parse_roster(raw: &str) -> Vec<TeamId> {
    let mut teams: Vec<TeamId> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let team = TeamId::from(name);
        if !teams.contains(&team) {
            teams.push(team);
        }
    }
    teams
}

impl LeagueConfig {
    /// Load from the process environment, after reading `.env` if present
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let teams = match lookup("LEAGUE_TEAMS") {
            Some(raw) => parse_roster(&raw),
            None => DEFAULT_TEAMS.iter().map(|t| TeamId::from(*t)).collect(),
        };
        if teams.is_empty() {
            bail!("LEAGUE_TEAMS must name at least one team");
        }

        let max_fixtures_per_round = match lookup("LEAGUE_MAX_FIXTURES_PER_ROUND") {
            Some(raw) => {
                let value: usize = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("LEAGUE_MAX_FIXTURES_PER_ROUND is not a number: {raw}"))?;
                if value == 0 {
                    bail!("LEAGUE_MAX_FIXTURES_PER_ROUND must be at least 1");
                }
                value
            }
            None => default_max_fixtures(teams.len()),
        };

        Ok(Self {
            data_dir: lookup("LEAGUE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            bind_addr: lookup("LEAGUE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            laliga_feed_url: lookup("LALIGA_FEED_URL")
                .unwrap_or_else(|| DEFAULT_LALIGA_FEED_URL.to_string()),
            teams,
            max_fixtures_per_round,
        })
    }
}
