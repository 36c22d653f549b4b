//! Denormalized per-user statistics shared by every user in one JSON file.
//!
//! The engine's output is authoritative; this store only keeps the last
//! computed averages per user for quick display. Read-modify-write cycles run
//! under the file's sidecar [`LockFile`], so concurrent writers for different
//! users never drop each other's entries.

use crate::lock::LockFile;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Last recomputed averages for one user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserStatistics {
    pub average_cycle_length: i64,
    pub all_time_average_cycle_length: i64,
    pub updated_at: DateTime<Utc>,
}

/// All users' stored statistics, keyed by user id
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StoredStatistics {
    pub users: BTreeMap<String, UserStatistics>,
}

impl StoredStatistics {
    /// Snapshot of the store under a shared lock.
    ///
    /// A missing file is an empty store. A corrupt one is logged and treated
    /// as empty; the next write replaces it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let _lock = LockFile::shared(path)?;
        Ok(Self::read_unlocked(path))
    }

    /// Replace the whole store
    pub fn save(&self, path: &Path) -> Result<()> {
        let _lock = LockFile::exclusive(path)?;
        self.write_unlocked(path)
    }

    /// Load, modify and save back while holding the exclusive lock
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut StoredStatistics) -> Result<()>,
    {
        let _lock = LockFile::exclusive(path)?;
        let mut stored = Self::read_unlocked(path);
        f(&mut stored)?;
        stored.write_unlocked(path)?;
        Ok(stored)
    }

    /// Store one user's averages, keeping every other user's entry
    pub fn record(path: &Path, user_id: &str, stats: &UserStatistics) -> Result<()> {
        Self::update(path, |stored| {
            stored.users.insert(user_id.to_string(), stats.clone());
            Ok(())
        })?;
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Option<&UserStatistics> {
        self.users.get(user_id)
    }

    fn read_unlocked(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("Unable to read statistics {:?}: {}. Starting empty.", path, e);
                return Self::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!("Corrupt statistics {:?}: {}. Starting empty.", path, e);
            Self::default()
        })
    }

    fn write_unlocked(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| Error::State("statistics path missing parent".into()))?;
        std::fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, self)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved statistics for {} users to {:?}", self.users.len(), path);
        Ok(())
    }
}
