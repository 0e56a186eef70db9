use crate::config::write_json_atomic;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, io::ErrorKind, path::PathBuf};

/// Participant-count mode a score was earned in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum PlayMode {
    OnePlayer,
    TwoPlayer,
}

impl PlayMode {
    pub(crate) fn for_players(n: usize) -> Self {
        if n > 1 {
            PlayMode::TwoPlayer
        } else {
            PlayMode::OnePlayer
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ScoreRecord {
    pub(crate) mode: PlayMode,
    pub(crate) name: String,
    pub(crate) score: u32,
    #[serde(default = "Utc::now")]
    pub(crate) achieved_at: DateTime<Utc>,
}

impl ScoreRecord {
    fn same_entry(&self, other: &ScoreRecord) -> bool {
        self.mode == other.mode && self.name == other.name && self.score == other.score
    }
}

/// Persistence seam for the high-score table.
pub(crate) trait ScoreStore: Send + Sync {
    fn load(&self) -> Result<Vec<ScoreRecord>>;
    fn save(&self, records: &[ScoreRecord]) -> Result<()>;
}

pub(crate) struct JsonScoreStore {
    path: PathBuf,
}

impl JsonScoreStore {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ScoreStore for JsonScoreStore {
    fn load(&self) -> Result<Vec<ScoreRecord>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        serde_json::from_str(&data).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn save(&self, records: &[ScoreRecord]) -> Result<()> {
        write_json_atomic(&self.path, &records)
    }
}

/// In-memory high scores: per mode, zero scores ignored, no duplicates,
/// highest first, at most `cap` entries.
#[derive(Clone, Debug)]
pub(crate) struct ScoreBoard {
    records: Vec<ScoreRecord>,
    cap: usize,
}

impl ScoreBoard {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            records: Vec::new(),
            cap: cap.max(1),
        }
    }

    pub(crate) fn from_records(records: Vec<ScoreRecord>, cap: usize) -> Self {
        let mut board = Self::new(cap);
        for r in records {
            board.insert(r);
        }
        board
    }

    /// Loads from `store`; a failed read leaves an empty board.
    pub(crate) fn load(store: &dyn ScoreStore, cap: usize) -> Self {
        match store.load() {
            Ok(records) => Self::from_records(records, cap),
            Err(e) => {
                tracing::warn!("high scores unavailable: {e:#}");
                Self::new(cap)
            }
        }
    }

    /// Offers a finished run. Returns true if the table changed.
    pub(crate) fn submit(&mut self, mode: PlayMode, name: &str, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        self.insert(ScoreRecord {
            mode,
            name: name.to_string(),
            score,
            achieved_at: Utc::now(),
        })
    }

    fn insert(&mut self, record: ScoreRecord) -> bool {
        if record.score == 0 || self.records.iter().any(|r| r.same_entry(&record)) {
            return false;
        }
        let mode = record.mode;
        let entry = (record.name.clone(), record.score);
        self.records.push(record);
        self.records.sort_by(|a, b| b.score.cmp(&a.score));

        let mut kept = 0;
        let cap = self.cap;
        self.records.retain(|r| {
            if r.mode != mode {
                return true;
            }
            kept += 1;
            kept <= cap
        });
        self.records
            .iter()
            .any(|r| r.mode == mode && r.name == entry.0 && r.score == entry.1)
    }

    pub(crate) fn for_mode(&self, mode: PlayMode) -> impl Iterator<Item = &ScoreRecord> {
        self.records.iter().filter(move |r| r.mode == mode)
    }

    #[cfg(test)]
    pub(crate) fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    /// Writes through `store`; failures are logged and the board stays as is.
    pub(crate) fn persist(&self, store: &dyn ScoreStore) {
        if let Err(e) = store.save(&self.records) {
            tracing::warn!("could not save high scores: {e:#}");
        }
    }
}
