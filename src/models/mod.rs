use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Number of outcomes kept in a team's recent form
pub const FORM_LENGTH: usize = 5;

/// Identifier of a team known to the league
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Result of one match from a single team's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "L")]
    Loss,
}

impl Outcome {
    /// Classify a scoreline from the side that scored `goals_for`
    pub fn from_goals(goals_for: u32, goals_against: u32) -> Self {
        match goals_for.cmp(&goals_against) {
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::Loss,
        }
    }

    pub fn points(self) -> u32 {
        match self {
            Outcome::Win => 3,
            Outcome::Draw => 1,
            Outcome::Loss => 0,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Outcome::Win => "W",
            Outcome::Draw => "D",
            Outcome::Loss => "L",
        }
    }
}

/// The two shapes a recorded result can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A full fixture between two known teams
    Paired {
        home_team: TeamId,
        away_team: TeamId,
        home_goals: u32,
        away_goals: u32,
    },
    /// Points awarded to a single team without an opponent record
    Direct {
        team: TeamId,
        points_awarded: u8,
        goals_for: u32,
        goals_against: u32,
    },
}

impl EventKind {
    /// Teams affected by this event
    pub fn teams(&self) -> Vec<&TeamId> {
        match self {
            EventKind::Paired {
                home_team,
                away_team,
                ..
            } => vec![home_team, away_team],
            EventKind::Direct { team, .. } => vec![team],
        }
    }

    pub fn total_goals(&self) -> u64 {
        match self {
            EventKind::Paired {
                home_goals,
                away_goals,
                ..
            } => u64::from(*home_goals) + u64::from(*away_goals),
            EventKind::Direct {
                goals_for,
                goals_against,
                ..
            } => u64::from(*goals_for) + u64::from(*goals_against),
        }
    }
}

/// An immutable entry in the results log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub id: u64,
    pub round: u32,
    #[serde(flatten)]
    pub kind: EventKind,
    pub recorded_at: DateTime<Utc>,
    /// Audit marker, set once the event has been folded into the table
    pub processed: bool,
}

/// Cumulative standings row for one team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAggregate {
    pub team: TeamId,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
    pub last_results: VecDeque<Outcome>,
    pub current_streak: Option<Outcome>,
}

impl TeamAggregate {
    pub fn new(team: TeamId) -> Self {
        Self {
            team,
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
            last_results: VecDeque::with_capacity(FORM_LENGTH),
            current_streak: None,
        }
    }

    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }
}

/// A ranked row as returned by standings queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingRow {
    pub rank: usize,
    #[serde(flatten)]
    pub aggregate: TeamAggregate,
    pub goal_difference: i64,
}

impl StandingRow {
    pub fn format(&self) -> String {
        let form: String = self
            .aggregate
            .last_results
            .iter()
            .map(|o| o.code())
            .collect();
        format!(
            "{:>2}. {:<20} P:{:>2} W:{:>2} D:{:>2} L:{:>2} GF:{:>3} GA:{:>3} GD:{:>+4} Pts:{:>3}  {}",
            self.rank,
            self.aggregate.team,
            self.aggregate.played,
            self.aggregate.won,
            self.aggregate.drawn,
            self.aggregate.lost,
            self.aggregate.goals_for,
            self.aggregate.goals_against,
            self.goal_difference,
            self.aggregate.points,
            form
        )
    }
}

/// A fixture result submitted by a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairedSubmission {
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_goals: u32,
    pub away_goals: u32,
    pub round: u32,
}

/// A single-team points award submitted by a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectSubmission {
    pub team: TeamId,
    pub points: u8,
    pub goals_for: u32,
    pub goals_against: u32,
    pub round: u32,
}

/// Season summary
#[derive(Debug, Clone, Serialize)]
pub struct LeagueStats {
    pub total_matches: usize,
    pub rounds_played: u32,
    pub next_round: u32,
    pub total_goals: u64,
    pub teams: Vec<TeamId>,
    pub standings: Vec<StandingRow>,
}
