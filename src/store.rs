//! Key-value persistence boundary: high score, options and achievement state
//! each live under an independent named blob. Read failures fall back to
//! defaults and never block gameplay.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tuning::Tier;

pub const HIGH_SCORE_KEY: &str = "score";
pub const OPTIONS_KEY: &str = "options.json";
pub const ACHIEVEMENTS_KEY: &str = "achievements.json";

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Missing(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store io error: {e}"),
            StoreError::Missing(key) => write!(f, "no blob for key {key:?}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

pub trait Store: Send + Sync {
    fn exists(&self, key: &str) -> bool;
    fn read_text(&self, key: &str) -> Result<String, StoreError>;
    fn write_text(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Blob-per-file store under a data directory.
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl Store for FsStore {
    fn exists(&self, key: &str) -> bool {
        self.path(key).is_file()
    }

    fn read_text(&self, key: &str) -> Result<String, StoreError> {
        if !self.exists(key) {
            return Err(StoreError::Missing(key.to_string()));
        }
        Ok(fs::read_to_string(self.path(key))?)
    }

    fn write_text(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }
}

/// In-memory store for tests and persistence-failure fallback.
#[derive(Default)]
pub struct MemStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl Store for MemStore {
    fn exists(&self, key: &str) -> bool {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.contains_key(key)
    }

    fn read_text(&self, key: &str) -> Result<String, StoreError> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::Missing(key.to_string()))
    }

    fn write_text(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Missing or corrupt score blobs read as zero.
pub fn load_high_score(store: &dyn Store) -> u64 {
    match store.read_text(HIGH_SCORE_KEY) {
        Ok(text) => text.trim().parse().unwrap_or(0),
        Err(StoreError::Missing(_)) => 0,
        Err(e) => {
            warn!(error = %e, "failed to load high score, using 0");
            0
        }
    }
}

/// Best-effort; a failed write is logged and the in-memory score stands.
pub fn save_high_score(store: &dyn Store, score: u64) {
    if let Err(e) = store.write_text(HIGH_SCORE_KEY, &score.to_string()) {
        warn!(error = %e, score, "failed to persist high score");
    }
}

/// Player-facing options persisted as one JSON blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub difficulty: Tier,
    pub volume: u8,
    pub player_color: String,
    pub tutorial_seen: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            difficulty: Tier::Normal,
            volume: 50,
            player_color: "#ffffff".to_string(),
            tutorial_seen: false,
        }
    }
}

impl Options {
    /// Loads the options blob, falling back to defaults on any failure.
    pub fn load(store: &dyn Store) -> Self {
        match store.read_text(OPTIONS_KEY) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(error = %e, "corrupt options blob, using defaults");
                Options::default()
            }),
            Err(StoreError::Missing(_)) => Options::default(),
            Err(e) => {
                warn!(error = %e, "failed to load options, using defaults");
                Options::default()
            }
        }
    }

    pub fn save(&self, store: &dyn Store) {
        match serde_json::to_string_pretty(self) {
            Ok(text) => {
                if let Err(e) = store.write_text(OPTIONS_KEY, &text) {
                    warn!(error = %e, "failed to persist options");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize options"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_score_defaults_to_zero_and_round_trips() {
        let store = MemStore::default();
        assert_eq!(load_high_score(&store), 0);
        save_high_score(&store, 600);
        assert_eq!(load_high_score(&store), 600);
    }

    #[test]
    fn corrupt_score_blob_reads_as_zero() {
        let store = MemStore::default();
        store.write_text(HIGH_SCORE_KEY, "not a number").unwrap();
        assert_eq!(load_high_score(&store), 0);
    }

    #[test]
    fn options_round_trip_and_defaults() {
        let store = MemStore::default();
        assert_eq!(Options::load(&store), Options::default());

        let mut opts = Options::default();
        opts.difficulty = Tier::Hard;
        opts.player_color = "#ff00ff".to_string();
        opts.tutorial_seen = true;
        opts.save(&store);
        assert_eq!(Options::load(&store), opts);
    }

    #[test]
    fn fs_store_round_trips_in_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().to_path_buf());
        assert!(!store.exists("score"));
        store.write_text("score", "42").unwrap();
        assert!(store.exists("score"));
        assert_eq!(store.read_text("score").unwrap(), "42");
    }
}
