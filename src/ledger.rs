use crate::config::LeagueConfig;
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::models::{
    DirectSubmission, EventKind, LeagueStats, MatchEvent, PairedSubmission, StandingRow, TeamId,
};
use crate::utils::data::{Snapshot, SnapshotStore};
use crate::utils::standings::{empty_table, fold_event, rank_table, replay};
use crate::utils::validator::{validate_direct, validate_paired};
use chrono::Utc;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

/// A ledger over a type-erased store, as shared by the binaries
pub type SharedLedger = Ledger<Arc<dyn SnapshotStore>>;

/// Results log plus the standings table derived from it
///
/// Mutations are serialized and persisted before they become visible, so a
/// failed save leaves both the store and the in-memory state as they were.
/// Reads never block each other and always see a fully folded table.
pub struct Ledger<S: SnapshotStore> {
    teams: Vec<TeamId>,
    max_fixtures_per_round: usize,
    store: S,
    state: RwLock<Snapshot>,
    writer: Mutex<()>,
}

impl<S: SnapshotStore> Ledger<S> {
    /// Open a ledger over `store`, rebuilding the table from the stored log
    pub fn open(teams: Vec<TeamId>, max_fixtures_per_round: usize, store: S) -> LedgerResult<Self> {
        let stored = store.load()?;
        let aggregates = replay(&teams, &stored.events).map_err(|e| {
            LedgerError::CorruptSnapshot(format!("stored results do not fit the roster: {e}"))
        })?;

        if !stored.aggregates.is_empty() && stored.aggregates != aggregates {
            tracing::warn!("stored standings disagree with the results log, using the log");
        }

        let mut events = stored.events;
        for event in &mut events {
            event.processed = true;
        }

        tracing::info!(
            teams = teams.len(),
            events = events.len(),
            "ledger opened"
        );

        Ok(Self {
            teams,
            max_fixtures_per_round: max_fixtures_per_round.max(1),
            store,
            state: RwLock::new(Snapshot { events, aggregates }),
            writer: Mutex::new(()),
        })
    }

    pub fn from_config(config: &LeagueConfig, store: S) -> LedgerResult<Self> {
        Self::open(config.teams.clone(), config.max_fixtures_per_round, store)
    }

    pub fn teams(&self) -> &[TeamId] {
        &self.teams
    }

    pub fn max_fixtures_per_round(&self) -> usize {
        self.max_fixtures_per_round
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persist `next` and then make it the visible state
    fn publish(&self, next: Snapshot) -> LedgerResult<()> {
        self.store.save(&next)?;
        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
        Ok(())
    }

    fn append(
        &self,
        round: u32,
        validate: impl FnOnce(&Snapshot) -> Result<EventKind, ValidationError>,
    ) -> LedgerResult<MatchEvent> {
        let _guard = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = self.read_state().clone();

        let kind = validate(&next)?;
        fold_event(&mut next.aggregates, &kind)?;

        let event = MatchEvent {
            id: next.events.iter().map(|e| e.id).max().unwrap_or(0) + 1,
            round,
            kind,
            recorded_at: Utc::now(),
            processed: true,
        };
        next.events.push(event.clone());
        tracing::debug!(id = event.id, round, "folded result");

        self.publish(next)?;
        tracing::info!(id = event.id, round, teams = ?event.kind.teams(), "result recorded");
        Ok(event)
    }

    pub fn submit_paired(&self, submission: &PairedSubmission) -> LedgerResult<MatchEvent> {
        self.append(submission.round, |state| {
            validate_paired(submission, &self.teams, &state.events)
        })
    }

    pub fn submit_direct(&self, submission: &DirectSubmission) -> LedgerResult<MatchEvent> {
        self.append(submission.round, |_| validate_direct(submission, &self.teams))
    }

    pub fn current_standings(&self) -> Vec<StandingRow> {
        rank_table(self.read_state().aggregates.values())
    }

    /// Results in a round, in the order they were recorded
    pub fn results_for_round(&self, round: u32) -> Vec<MatchEvent> {
        self.read_state()
            .events
            .iter()
            .filter(|e| e.round == round)
            .cloned()
            .collect()
    }

    /// Every result, latest round first and newest first within a round
    pub fn all_results(&self) -> Vec<MatchEvent> {
        let mut events = self.read_state().events.clone();
        events.sort_by(|a, b| {
            b.round
                .cmp(&a.round)
                .then_with(|| b.recorded_at.cmp(&a.recorded_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        events
    }

    /// The round a new submission should go into
    pub fn next_round(&self) -> u32 {
        next_round_for(&self.read_state().events, self.max_fixtures_per_round)
    }

    /// Drop every result and zero every team. Cannot be undone.
    pub fn reset_season(&self) -> LedgerResult<()> {
        let _guard = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.publish(Snapshot {
            events: Vec::new(),
            aggregates: empty_table(&self.teams),
        })?;
        tracing::info!(teams = self.teams.len(), "season reset");
        Ok(())
    }

    pub fn stats(&self) -> LeagueStats {
        let state = self.read_state();
        LeagueStats {
            total_matches: state.events.len(),
            rounds_played: state.events.iter().map(|e| e.round).max().unwrap_or(0),
            next_round: next_round_for(&state.events, self.max_fixtures_per_round),
            total_goals: state.events.iter().map(|e| e.kind.total_goals()).sum(),
            teams: self.teams.clone(),
            standings: rank_table(state.aggregates.values()),
        }
    }
}

fn next_round_for(events: &[MatchEvent], max_fixtures_per_round: usize) -> u32 {
    let Some(latest) = events.iter().map(|e| e.round).max() else {
        return 1;
    };
    let fixtures = events.iter().filter(|e| e.round == latest).count();
    if fixtures < max_fixtures_per_round {
        latest
    } else {
        latest + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::Outcome;
    use crate::utils::data::{JsonFileStore, MemoryStore};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn teams() -> Vec<TeamId> {
        ["A", "B", "C", "D"].into_iter().map(TeamId::from).collect()
    }

    fn ledger() -> Ledger<MemoryStore> {
        Ledger::open(teams(), 2, MemoryStore::new()).unwrap()
    }

    fn paired(home: &str, away: &str, home_goals: u32, away_goals: u32, round: u32) -> PairedSubmission {
        PairedSubmission {
            home_team: home.into(),
            away_team: away.into(),
            home_goals,
            away_goals,
            round,
        }
    }

    fn direct(team: &str, points: u8, goals_for: u32, goals_against: u32, round: u32) -> DirectSubmission {
        DirectSubmission {
            team: team.into(),
            points,
            goals_for,
            goals_against,
            round,
        }
    }

    fn row<'a>(rows: &'a [StandingRow], team: &str) -> &'a StandingRow {
        rows.iter().find(|r| r.aggregate.team.as_str() == team).unwrap()
    }

    /// Saves succeed until `fail` is flipped
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail: AtomicBool,
    }

    impl SnapshotStore for FlakyStore {
        fn load(&self) -> Result<Snapshot, StoreError> {
            self.inner.load()
        }

        fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save(snapshot)
        }
    }

    #[test]
    fn test_new_ledger_has_zeroed_roster() {
        let ledger = ledger();
        let rows = ledger.current_standings();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.aggregate.played == 0 && r.aggregate.points == 0));
        assert_eq!(ledger.next_round(), 1);
    }

    #[test]
    fn test_paired_result_scenario() {
        let ledger = ledger();
        let event = ledger.submit_paired(&paired("A", "B", 2, 1, 1)).unwrap();
        assert_eq!(event.id, 1);
        assert_eq!(event.round, 1);
        assert!(event.processed);

        let rows = ledger.current_standings();
        let a = row(&rows, "A");
        assert_eq!((a.aggregate.played, a.aggregate.won, a.aggregate.points), (1, 1, 3));
        assert_eq!((a.aggregate.goals_for, a.aggregate.goals_against, a.goal_difference), (2, 1, 1));
        let b = row(&rows, "B");
        assert_eq!((b.aggregate.played, b.aggregate.lost, b.aggregate.points), (1, 1, 0));
        assert_eq!((b.aggregate.goals_for, b.aggregate.goals_against, b.goal_difference), (1, 2, -1));
        assert!(a.rank < b.rank);
        assert_eq!(a.rank, 1);
    }

    #[test]
    fn test_duplicate_fixture_leaves_standings_unchanged() {
        let ledger = ledger();
        ledger.submit_paired(&paired("A", "B", 1, 1, 1)).unwrap();
        let before = ledger.current_standings();

        let err = ledger.submit_paired(&paired("B", "A", 2, 0, 1)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::DuplicateFixture { round: 1, .. })
        ));
        assert_eq!(ledger.current_standings(), before);
        assert_eq!(ledger.all_results().len(), 1);
    }

    #[test]
    fn test_direct_results_skip_fixture_rule() {
        let ledger = ledger();
        ledger.submit_direct(&direct("C", 3, 2, 0, 1)).unwrap();
        ledger.submit_direct(&direct("C", 0, 0, 1, 1)).unwrap();

        let rows = ledger.current_standings();
        let c = row(&rows, "C");
        assert_eq!(c.aggregate.played, 2);
        assert_eq!(c.aggregate.points, 3);
        assert_eq!(c.aggregate.won, 1);
        assert_eq!(c.aggregate.lost, 1);
    }

    #[test]
    fn test_inconsistent_direct_result_rejected() {
        let ledger = ledger();
        let err = ledger.submit_direct(&direct("D", 1, 1, 2, 1)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::InconsistentResult { .. })
        ));
        assert!(ledger.all_results().is_empty());
    }

    #[test]
    fn test_standings_reads_are_idempotent() {
        let ledger = ledger();
        ledger.submit_paired(&paired("A", "B", 0, 0, 1)).unwrap();
        ledger.submit_paired(&paired("C", "D", 0, 0, 1)).unwrap();
        assert_eq!(ledger.current_standings(), ledger.current_standings());
    }

    #[test]
    fn test_reset_season_zeroes_everything() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::open(teams(), 2, Arc::clone(&store)).unwrap();
        ledger.submit_paired(&paired("A", "B", 3, 0, 1)).unwrap();
        ledger.submit_direct(&direct("C", 1, 1, 1, 1)).unwrap();

        ledger.reset_season().unwrap();

        let rows = ledger.current_standings();
        assert_eq!(rows.len(), 4);
        for r in &rows {
            let a = &r.aggregate;
            assert_eq!(
                (a.played, a.won, a.drawn, a.lost, a.points, a.goals_for, a.goals_against),
                (0, 0, 0, 0, 0, 0, 0)
            );
            assert!(a.last_results.is_empty());
            assert_eq!(a.current_streak, None);
        }
        assert!(ledger.all_results().is_empty());
        assert_eq!(ledger.next_round(), 1);

        let saved = store.load().unwrap();
        assert!(saved.events.is_empty());
        assert_eq!(saved.aggregates.len(), 4);
    }

    #[test]
    fn test_next_round_fills_then_advances() {
        let ledger = ledger();
        assert_eq!(ledger.next_round(), 1);
        ledger.submit_paired(&paired("A", "B", 1, 0, 1)).unwrap();
        assert_eq!(ledger.next_round(), 1);
        ledger.submit_paired(&paired("C", "D", 1, 0, 1)).unwrap();
        assert_eq!(ledger.next_round(), 2);
        ledger.submit_paired(&paired("A", "C", 1, 0, 2)).unwrap();
        assert_eq!(ledger.next_round(), 2);
    }

    #[test]
    fn test_next_round_uses_configured_capacity() {
        let ledger = Ledger::open(teams(), 1, MemoryStore::new()).unwrap();
        ledger.submit_paired(&paired("A", "B", 1, 0, 1)).unwrap();
        assert_eq!(ledger.next_round(), 2);
    }

    #[test]
    fn test_result_queries() {
        let ledger = ledger();
        ledger.submit_paired(&paired("A", "B", 1, 0, 1)).unwrap();
        ledger.submit_paired(&paired("C", "D", 2, 2, 1)).unwrap();
        ledger.submit_direct(&direct("A", 3, 4, 1, 2)).unwrap();

        let round_one = ledger.results_for_round(1);
        assert_eq!(round_one.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(ledger.results_for_round(9).is_empty());

        let all = ledger.all_results();
        assert_eq!(all.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn test_stats() {
        let ledger = ledger();
        ledger.submit_paired(&paired("A", "B", 1, 0, 1)).unwrap();
        ledger.submit_direct(&direct("C", 1, 2, 2, 1)).unwrap();

        let stats = ledger.stats();
        assert_eq!(stats.total_matches, 2);
        assert_eq!(stats.rounds_played, 1);
        assert_eq!(stats.next_round, 2);
        assert_eq!(stats.total_goals, 5);
        assert_eq!(stats.teams.len(), 4);
        assert_eq!(stats.standings[0].aggregate.team.as_str(), "A");
    }

    #[test]
    fn test_overflowing_totals_are_rejected() {
        let ledger = ledger();
        ledger.submit_paired(&paired("A", "B", u32::MAX, 0, 1)).unwrap();
        let before = ledger.current_standings();

        let err = ledger.submit_paired(&paired("A", "B", 1, 0, 2)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::TotalsOverflow(_))
        ));
        assert_eq!(ledger.current_standings(), before);
        assert_eq!(ledger.all_results().len(), 1);
        assert_eq!(ledger.stats().total_goals, u64::from(u32::MAX));
    }

    #[test]
    fn test_failed_save_is_not_observable() {
        let ledger = Ledger::open(teams(), 2, FlakyStore::default()).unwrap();
        ledger.submit_paired(&paired("A", "B", 1, 0, 1)).unwrap();
        let before = ledger.current_standings();

        ledger.store.fail.store(true, Ordering::SeqCst);
        let err = ledger.submit_paired(&paired("C", "D", 1, 0, 1)).unwrap_err();
        assert!(matches!(err, LedgerError::Persistence(_)));
        assert_eq!(ledger.current_standings(), before);
        assert_eq!(ledger.all_results().len(), 1);
        assert!(ledger.reset_season().is_err());
        assert_eq!(ledger.current_standings(), before);

        // The same fixture goes through once the store recovers
        ledger.store.fail.store(false, Ordering::SeqCst);
        let event = ledger.submit_paired(&paired("C", "D", 1, 0, 1)).unwrap();
        assert_eq!(event.id, 2);
    }

    #[test]
    fn test_reopen_from_file_store() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = Ledger::open(teams(), 2, JsonFileStore::new(dir.path())).unwrap();
            ledger.submit_paired(&paired("A", "B", 2, 1, 1)).unwrap();
            ledger.submit_direct(&direct("D", 0, 0, 2, 1)).unwrap();
        }
        let ledger = Ledger::open(teams(), 2, JsonFileStore::new(dir.path())).unwrap();
        assert_eq!(ledger.all_results().len(), 2);
        let rows = ledger.current_standings();
        assert_eq!(row(&rows, "A").aggregate.points, 3);
        assert_eq!(row(&rows, "D").aggregate.current_streak, Some(Outcome::Loss));
        assert_eq!(ledger.next_round(), 2);

        let event = ledger.submit_paired(&paired("C", "D", 0, 0, 2)).unwrap();
        assert_eq!(event.id, 3);
    }

    #[test]
    fn test_failed_file_save_is_not_replayed_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let ledger = Ledger::open(teams(), 2, store.clone()).unwrap();
        ledger.submit_paired(&paired("C", "D", 1, 1, 1)).unwrap();

        // A directory in the way makes the rename onto the table file fail
        std::fs::remove_file(store.standings_path()).unwrap();
        std::fs::create_dir(store.standings_path()).unwrap();
        let err = ledger.submit_paired(&paired("A", "B", 2, 0, 1)).unwrap_err();
        assert!(matches!(err, LedgerError::Persistence(_)));
        assert_eq!(ledger.all_results().len(), 1);
        drop(ledger);

        std::fs::remove_dir(store.standings_path()).unwrap();
        let reopened = Ledger::open(teams(), 2, store).unwrap();
        assert_eq!(reopened.all_results().len(), 1);
        let rows = reopened.current_standings();
        assert_eq!(row(&rows, "A").aggregate.played, 0);
        assert_eq!(row(&rows, "C").aggregate.points, 1);
    }

    #[test]
    fn test_open_prefers_log_over_table_written_ahead_of_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        {
            let ledger = Ledger::open(teams(), 2, store.clone()).unwrap();
            ledger.submit_paired(&paired("A", "B", 2, 0, 1)).unwrap();
        }
        // Table saved, log rename never happened
        let mut ahead = store.load().unwrap();
        fold_event(
            &mut ahead.aggregates,
            &EventKind::Paired {
                home_team: "C".into(),
                away_team: "D".into(),
                home_goals: 3,
                away_goals: 0,
            },
        )
        .unwrap();
        std::fs::write(
            store.standings_path(),
            serde_json::to_vec_pretty(&ahead.aggregates).unwrap(),
        )
        .unwrap();

        let reopened = Ledger::open(teams(), 2, store).unwrap();
        let rows = reopened.current_standings();
        assert_eq!(row(&rows, "A").aggregate.points, 3);
        assert_eq!(row(&rows, "C").aggregate.played, 0);
    }

    #[test]
    fn test_open_rebuilds_stale_table() {
        let reference = ledger();
        reference.submit_paired(&paired("A", "B", 2, 0, 1)).unwrap();
        let mut snapshot = reference.store.load().unwrap();
        snapshot.aggregates = empty_table(&teams());

        let reopened = Ledger::open(teams(), 2, MemoryStore::with_snapshot(snapshot)).unwrap();
        assert_eq!(reopened.current_standings(), reference.current_standings());
    }

    #[test]
    fn test_open_adds_new_roster_teams() {
        let reference = ledger();
        reference.submit_paired(&paired("A", "B", 2, 0, 1)).unwrap();
        let snapshot = reference.store.load().unwrap();

        let mut roster = teams();
        roster.push(TeamId::from("E"));
        let reopened = Ledger::open(roster, 2, MemoryStore::with_snapshot(snapshot)).unwrap();
        let rows = reopened.current_standings();
        assert_eq!(rows.len(), 5);
        assert_eq!(row(&rows, "E").aggregate.played, 0);
    }

    #[test]
    fn test_open_rejects_results_outside_roster() {
        let reference = ledger();
        reference.submit_paired(&paired("A", "B", 2, 0, 1)).unwrap();
        let snapshot = reference.store.load().unwrap();

        let roster: Vec<TeamId> = ["A", "C", "D"].into_iter().map(TeamId::from).collect();
        let err = Ledger::open(roster, 2, MemoryStore::with_snapshot(snapshot))
            .err()
            .unwrap();
        assert!(matches!(err, LedgerError::CorruptSnapshot(_)));
    }

    #[test]
    fn test_concurrent_submissions_are_serialized() {
        let ledger = Arc::new(ledger());
        let handles: Vec<_> = ["A", "B", "C", "D"]
            .into_iter()
            .map(|team| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for round in 1..=10 {
                        ledger.submit_direct(&direct(team, 3, 1, 0, round)).unwrap();
                        let _ = ledger.current_standings();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let rows = ledger.current_standings();
        assert!(rows.iter().all(|r| r.aggregate.played == 10 && r.aggregate.points == 30));
        let mut ids: Vec<u64> = ledger.all_results().iter().map(|e| e.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=40).collect::<Vec<u64>>());
    }
}
