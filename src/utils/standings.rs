use crate::error::ValidationError;
use crate::models::{
    EventKind, MatchEvent, Outcome, StandingRow, TeamAggregate, TeamId, FORM_LENGTH,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Aggregate rows keyed by team
pub type Table = BTreeMap<TeamId, TeamAggregate>;

/// A zeroed table with one row per team
pub fn empty_table(teams: &[TeamId]) -> Table {
    teams
        .iter()
        .map(|team| (team.clone(), TeamAggregate::new(team.clone())))
        .collect()
}

/// One outcome applied to a copy of a team's row, or `None` if a total overflows
fn record(
    row: &TeamAggregate,
    outcome: Outcome,
    points: u32,
    goals_for: u32,
    goals_against: u32,
) -> Option<TeamAggregate> {
    let mut next = row.clone();
    next.played = next.played.checked_add(1)?;
    match outcome {
        Outcome::Win => next.won = next.won.checked_add(1)?,
        Outcome::Draw => next.drawn = next.drawn.checked_add(1)?,
        Outcome::Loss => next.lost = next.lost.checked_add(1)?,
    }
    next.goals_for = next.goals_for.checked_add(goals_for)?;
    next.goals_against = next.goals_against.checked_add(goals_against)?;
    next.points = next.points.checked_add(points)?;

    next.last_results.push_back(outcome);
    while next.last_results.len() > FORM_LENGTH {
        next.last_results.pop_front();
    }
    next.current_streak = Some(outcome);
    Some(next)
}

fn recorded_row(
    table: &Table,
    team: &TeamId,
    outcome: Outcome,
    points: u32,
    goals_for: u32,
    goals_against: u32,
) -> Result<TeamAggregate, ValidationError> {
    let row = table
        .get(team)
        .ok_or_else(|| ValidationError::UnknownTeam(team.clone()))?;
    record(row, outcome, points, goals_for, goals_against)
        .ok_or_else(|| ValidationError::TotalsOverflow(team.clone()))
}

/// Fold one event's effect into the table
///
/// Every affected row is computed before any is written back, so the table
/// is left untouched when a team is missing or a total would overflow.
pub fn fold_event(table: &mut Table, kind: &EventKind) -> Result<(), ValidationError> {
    match kind {
        EventKind::Paired {
            home_team,
            away_team,
            home_goals,
            away_goals,
        } => {
            let home_outcome = Outcome::from_goals(*home_goals, *away_goals);
            let away_outcome = Outcome::from_goals(*away_goals, *home_goals);

            let away = recorded_row(
                table,
                away_team,
                away_outcome,
                away_outcome.points(),
                *away_goals,
                *home_goals,
            )?;
            let home = recorded_row(
                table,
                home_team,
                home_outcome,
                home_outcome.points(),
                *home_goals,
                *away_goals,
            )?;
            table.insert(away_team.clone(), away);
            table.insert(home_team.clone(), home);
        }
        EventKind::Direct {
            team,
            points_awarded,
            goals_for,
            goals_against,
        } => {
            let outcome = match points_awarded {
                3 => Outcome::Win,
                1 => Outcome::Draw,
                _ => Outcome::Loss,
            };
            let row = recorded_row(
                table,
                team,
                outcome,
                u32::from(*points_awarded),
                *goals_for,
                *goals_against,
            )?;
            table.insert(team.clone(), row);
        }
    }
    Ok(())
}

/// Rebuild a table from scratch by folding every event in log order
pub fn replay(teams: &[TeamId], events: &[MatchEvent]) -> Result<Table, ValidationError> {
    let mut table = empty_table(teams);
    for event in events {
        fold_event(&mut table, &event.kind)?;
    }
    Ok(table)
}

/// Points, then goal difference, then goals scored, all descending.
/// Full ties fall back to team name so the order never depends on input order.
fn compare_rows(a: &TeamAggregate, b: &TeamAggregate) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.goal_difference().cmp(&a.goal_difference()))
        .then_with(|| b.goals_for.cmp(&a.goals_for))
        .then_with(|| a.team.cmp(&b.team))
}

/// Sort rows into league order and number them from 1
pub fn rank_table<'a>(rows: impl IntoIterator<Item = &'a TeamAggregate>) -> Vec<StandingRow> {
    let mut sorted: Vec<&TeamAggregate> = rows.into_iter().collect();
    sorted.sort_by(|a, b| compare_rows(a, b));

    sorted
        .into_iter()
        .enumerate()
        .map(|(i, row)| StandingRow {
            rank: i + 1,
            goal_difference: row.goal_difference(),
            aggregate: row.clone(),
        })
        .collect()
}

/// Merge two ranked tables into one league and rank them again
pub fn combine_standings(first: &[StandingRow], second: &[StandingRow]) -> Vec<StandingRow> {
    rank_table(first.iter().chain(second).map(|row| &row.aggregate))
}
