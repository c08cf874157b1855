use crate::error::StoreError;
use crate::models::{MatchEvent, StandingRow};
use crate::utils::standings::Table;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

const RESULTS_FILE: &str = "custom-results.json";
const STANDINGS_FILE: &str = "custom-standings.json";

/// Everything the ledger needs to come back after a restart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub events: Vec<MatchEvent>,
    pub aggregates: Table,
}

/// Durable home for the results log and the aggregate table
pub trait SnapshotStore: Send + Sync {
    /// Returns an empty snapshot when nothing has been saved yet
    fn load(&self) -> Result<Snapshot, StoreError>;

    /// Must leave the previous snapshot readable if the write fails part way
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for Arc<T> {
    fn load(&self) -> Result<Snapshot, StoreError> {
        (**self).load()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        (**self).save(snapshot)
    }
}

/// Stores the log and the table as two pretty-printed JSON files in one directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(RESULTS_FILE)
    }

    pub fn standings_path(&self) -> PathBuf {
        self.dir.join(STANDINGS_FILE)
    }
}

/// Write to a sibling temp file, then rename over the target
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn read_json_or_default<T>(path: &Path) -> Result<T, StoreError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        Ok(Snapshot {
            events: read_json_or_default(&self.results_path())?,
            aggregates: read_json_or_default(&self.standings_path())?,
        })
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let events = serde_json::to_vec_pretty(&snapshot.events)?;
        let aggregates = serde_json::to_vec_pretty(&snapshot.aggregates)?;
        // The log rename is the commit point. A table written ahead of a failed
        // log write is stale and gets rebuilt from the log on load.
        write_atomic(&self.standings_path(), &aggregates)?;
        write_atomic(&self.results_path(), &events)?;
        tracing::debug!(dir = %self.dir.display(), events = snapshot.events.len(), "snapshot saved");
        Ok(())
    }
}

/// Keeps the snapshot in memory. Useful for tests and throwaway leagues.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        Ok(self
            .snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot.clone();
        Ok(())
    }
}

#[derive(Serialize)]
struct StandingCsvRecord<'a> {
    #[serde(rename = "Rank")]
    rank: usize,
    #[serde(rename = "Team")]
    team: &'a str,
    #[serde(rename = "Played")]
    played: u32,
    #[serde(rename = "Won")]
    won: u32,
    #[serde(rename = "Drawn")]
    drawn: u32,
    #[serde(rename = "Lost")]
    lost: u32,
    #[serde(rename = "Goals For")]
    goals_for: u32,
    #[serde(rename = "Goals Against")]
    goals_against: u32,
    #[serde(rename = "Goal Difference")]
    goal_difference: i64,
    #[serde(rename = "Points")]
    points: u32,
    #[serde(rename = "Form")]
    form: String,
}

/// Write the ranked table as CSV to any writer
pub fn write_standings_csv<W: Write>(rows: &[StandingRow], writer: W) -> Result<(), StoreError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(StandingCsvRecord {
            rank: row.rank,
            team: row.aggregate.team.as_str(),
            played: row.aggregate.played,
            won: row.aggregate.won,
            drawn: row.aggregate.drawn,
            lost: row.aggregate.lost,
            goals_for: row.aggregate.goals_for,
            goals_against: row.aggregate.goals_against,
            goal_difference: row.goal_difference,
            points: row.aggregate.points,
            form: row.aggregate.last_results.iter().map(|o| o.code()).collect(),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Save the ranked table to a CSV file
pub fn save_standings_to_csv(rows: &[StandingRow], filename: &str) -> Result<(), StoreError> {
    let file = std::fs::File::create(filename)?;
    write_standings_csv(rows, file)
}
