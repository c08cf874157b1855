use crate::error::ValidationError;
use crate::models::{DirectSubmission, EventKind, MatchEvent, PairedSubmission, TeamId};

fn check_round(round: u32) -> Result<(), ValidationError> {
    if round == 0 {
        return Err(ValidationError::InvalidRound(round));
    }
    Ok(())
}

fn check_known(team: &TeamId, known: &[TeamId]) -> Result<(), ValidationError> {
    if !known.contains(team) {
        return Err(ValidationError::UnknownTeam(team.clone()));
    }
    Ok(())
}

/// True when `event` is a paired fixture between `a` and `b` (either way round) in `round`
fn is_same_fixture(event: &MatchEvent, a: &TeamId, b: &TeamId, round: u32) -> bool {
    if event.round != round {
        return false;
    }
    match &event.kind {
        EventKind::Paired {
            home_team,
            away_team,
            ..
        } => (home_team == a && away_team == b) || (home_team == b && away_team == a),
        EventKind::Direct { .. } => false,
    }
}

/// Check a fixture result against the roster and the existing log
pub fn validate_paired(
    submission: &PairedSubmission,
    known: &[TeamId],
    log: &[MatchEvent],
) -> Result<EventKind, ValidationError> {
    check_round(submission.round)?;
    check_known(&submission.home_team, known)?;
    check_known(&submission.away_team, known)?;

    if submission.home_team == submission.away_team {
        return Err(ValidationError::SelfMatch(submission.home_team.clone()));
    }

    if log.iter().any(|event| {
        is_same_fixture(
            event,
            &submission.home_team,
            &submission.away_team,
            submission.round,
        )
    }) {
        return Err(ValidationError::DuplicateFixture {
            home: submission.home_team.clone(),
            away: submission.away_team.clone(),
            round: submission.round,
        });
    }

    Ok(EventKind::Paired {
        home_team: submission.home_team.clone(),
        away_team: submission.away_team.clone(),
        home_goals: submission.home_goals,
        away_goals: submission.away_goals,
    })
}

/// Check a direct points award. Duplicate fixtures are not a concept here.
pub fn validate_direct(
    submission: &DirectSubmission,
    known: &[TeamId],
) -> Result<EventKind, ValidationError> {
    check_round(submission.round)?;
    check_known(&submission.team, known)?;

    if !matches!(submission.points, 0 | 1 | 3) {
        return Err(ValidationError::InvalidPoints(submission.points));
    }

    let consistent = match submission.points {
        3 => submission.goals_for > submission.goals_against,
        1 => submission.goals_for == submission.goals_against,
        _ => submission.goals_for < submission.goals_against,
    };
    if !consistent {
        return Err(ValidationError::InconsistentResult {
            points: submission.points,
            goals_for: submission.goals_for,
            goals_against: submission.goals_against,
        });
    }

    Ok(EventKind::Direct {
        team: submission.team.clone(),
        points_awarded: submission.points,
        goals_for: submission.goals_for,
        goals_against: submission.goals_against,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn roster() -> Vec<TeamId> {
        ["A", "B", "C", "D"].into_iter().map(TeamId::from).collect()
    }

    fn paired(home: &str, away: &str, round: u32) -> PairedSubmission {
        PairedSubmission {
            home_team: home.into(),
            away_team: away.into(),
            home_goals: 1,
            away_goals: 0,
            round,
        }
    }

    fn direct(team: &str, points: u8, goals_for: u32, goals_against: u32) -> DirectSubmission {
        DirectSubmission {
            team: team.into(),
            points,
            goals_for,
            goals_against,
            round: 1,
        }
    }

    fn logged(home: &str, away: &str, round: u32) -> MatchEvent {
        MatchEvent {
            id: 1,
            round,
            kind: EventKind::Paired {
                home_team: home.into(),
                away_team: away.into(),
                home_goals: 1,
                away_goals: 1,
            },
            recorded_at: Utc::now(),
            processed: true,
        }
    }

    #[test]
    fn test_unknown_team() {
        let err = validate_paired(&paired("A", "Z", 1), &roster(), &[]).unwrap_err();
        assert_eq!(err, ValidationError::UnknownTeam("Z".into()));

        let err = validate_direct(&direct("Z", 3, 1, 0), &roster()).unwrap_err();
        assert_eq!(err, ValidationError::UnknownTeam("Z".into()));
    }

    #[test]
    fn test_unknown_team_checked_before_self_match() {
        let err = validate_paired(&paired("Z", "Z", 1), &roster(), &[]).unwrap_err();
        assert_eq!(err, ValidationError::UnknownTeam("Z".into()));
    }

    #[test]
    fn test_self_match() {
        let err = validate_paired(&paired("A", "A", 1), &roster(), &[]).unwrap_err();
        assert_eq!(err, ValidationError::SelfMatch("A".into()));
    }

    #[test]
    fn test_duplicate_fixture_is_unordered() {
        let log = vec![logged("A", "B", 1)];
        let err = validate_paired(&paired("B", "A", 1), &roster(), &log).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateFixture { round: 1, .. }));

        // Same pair in another round is fine
        assert!(validate_paired(&paired("B", "A", 2), &roster(), &log).is_ok());
        // Different pair in the same round is fine
        assert!(validate_paired(&paired("C", "D", 1), &roster(), &log).is_ok());
    }

    #[test]
    fn test_invalid_round() {
        let err = validate_paired(&paired("A", "B", 0), &roster(), &[]).unwrap_err();
        assert_eq!(err, ValidationError::InvalidRound(0));
    }

    #[test]
    fn test_invalid_points() {
        let err = validate_direct(&direct("C", 2, 1, 0), &roster()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidPoints(2));
    }

    #[test]
    fn test_inconsistent_result() {
        let err = validate_direct(&direct("D", 1, 1, 2), &roster()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InconsistentResult {
                points: 1,
                goals_for: 1,
                goals_against: 2
            }
        );
        assert!(validate_direct(&direct("D", 3, 0, 0), &roster()).is_err());
        assert!(validate_direct(&direct("D", 0, 2, 2), &roster()).is_err());
    }

    #[test]
    fn test_valid_direct_results() {
        assert!(validate_direct(&direct("C", 3, 2, 0), &roster()).is_ok());
        assert!(validate_direct(&direct("C", 1, 2, 2), &roster()).is_ok());
        assert!(validate_direct(&direct("C", 0, 0, 1), &roster()).is_ok());
    }
}
