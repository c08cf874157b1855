use crate::models::{EventKind, StandingRow, TeamId};
use crate::utils::standings::{empty_table, fold_event, rank_table};
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Used when the season feed has no fixtures yet
pub const DEFAULT_LALIGA_TEAMS: [&str; 20] = [
    "Real Madrid",
    "FC Barcelona",
    "Atlético Madrid",
    "Athletic Club",
    "Real Sociedad",
    "Villarreal",
    "Real Betis",
    "Sevilla",
    "Valencia",
    "Espanyol",
    "Osasuna",
    "Celta de Vigo",
    "Rayo Vallecano",
    "Mallorca",
    "Levante",
    "Alavés",
    "Getafe",
    "Girona",
    "Elche",
    "Real Oviedo",
];

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeasonFeed {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub matches: Vec<FeedMatch>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FeedMatch {
    pub round: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<String>,
    pub team1: String,
    pub team2: String,
    #[serde(default)]
    pub score: Option<Score>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Score {
    #[serde(default)]
    pub ht: Option<Vec<u32>>,
    #[serde(default)]
    pub ft: Option<Vec<u32>>,
}

impl FeedMatch {
    /// Full-time score, if the match has been played
    pub fn full_time(&self) -> Option<(u32, u32)> {
        match self.score.as_ref()?.ft.as_deref()? {
            [home, away] => Some((*home, *away)),
            _ => None,
        }
    }
}

pub struct OpenFootballClient {
    client: Client,
    feed_url: String,
}

impl OpenFootballClient {
    pub fn new(feed_url: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, feed_url })
    }

    pub async fn fetch_matches(&self) -> Result<Vec<FeedMatch>, reqwest::Error> {
        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await?
            .error_for_status()?;

        let feed: SeasonFeed = response.json().await?;
        tracing::info!(matches = feed.matches.len(), "fetched season feed");
        Ok(feed.matches)
    }
}

/// League table from every played match in the feed
pub fn generate_standings(matches: &[FeedMatch]) -> Vec<StandingRow> {
    let mut teams: Vec<TeamId> = Vec::new();
    for m in matches {
        for name in [&m.team1, &m.team2] {
            let team = TeamId::from(name.as_str());
            if !teams.contains(&team) {
                teams.push(team);
            }
        }
    }
    if teams.is_empty() {
        teams = DEFAULT_LALIGA_TEAMS.iter().map(|t| TeamId::from(*t)).collect();
    }

    let mut table = empty_table(&teams);
    for m in matches {
        let Some((home_goals, away_goals)) = m.full_time() else {
            continue;
        };
        let kind = EventKind::Paired {
            home_team: TeamId::from(m.team1.as_str()),
            away_team: TeamId::from(m.team2.as_str()),
            home_goals,
            away_goals,
        };
        if let Err(e) = fold_event(&mut table, &kind) {
            tracing::warn!(error = %e, "skipping feed match");
        }
    }

    rank_table(table.values())
}

/// Matches dated `today` or later, in feed order
///
/// Feed dates carry no timezone, so a fixture stays listed for the whole of
/// its matchday, including after kick-off.
pub fn upcoming_matches(matches: &[FeedMatch], today: NaiveDate, limit: usize) -> Vec<FeedMatch> {
    matches
        .iter()
        .filter(|m| m.date >= today)
        .take(limit)
        .cloned()
        .collect()
}

pub fn matchday(matches: &[FeedMatch], number: u32) -> Vec<FeedMatch> {
    let label = format!("Matchday {}", number);
    matches.iter().filter(|m| m.round == label).cloned().collect()
}
