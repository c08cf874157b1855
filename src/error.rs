use crate::models::TeamId;

/// Reasons a submission is rejected before it reaches the ledger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("round must be 1 or greater, got {0}")]
    InvalidRound(u32),

    #[error("unknown team: {0}")]
    UnknownTeam(TeamId),

    #[error("{0} cannot play against itself")]
    SelfMatch(TeamId),

    #[error("a result for {home} vs {away} already exists in round {round}")]
    DuplicateFixture {
        home: TeamId,
        away: TeamId,
        round: u32,
    },

    #[error("points must be 0, 1 or 3, got {0}")]
    InvalidPoints(u8),

    #[error("{points} points do not match a {goals_for}-{goals_against} scoreline")]
    InconsistentResult {
        points: u8,
        goals_for: u32,
        goals_against: u32,
    },

    #[error("totals for {0} would overflow")]
    TotalsOverflow(TeamId),
}

/// Failures of the snapshot store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to persist ledger: {0}")]
    Persistence(#[from] StoreError),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
