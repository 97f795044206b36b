use crate::activity::{Action, ActivityLog};
use crate::domain::Collection;
use crate::error::{Result, StoreError};
use crate::persistence::backup::BackupManager;
use crate::persistence::files::{self, atomic_write};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Durable JSON-backed storage for the full task+category snapshot.
///
/// The store location is an explicit constructor argument, initialized once
/// per process run. The primary snapshot lives at `data/tasks.json` as
/// `{ "tasks": [...], "categories": [...] }`; daily backups live next to it
/// under `backups/`.
#[derive(Debug)]
pub struct Store {
    base: PathBuf,
    backups: BackupManager,
}

impl Store {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base = base_dir.into();
        let backups = BackupManager::new(files::backups_dir(&base));
        Self { base, backups }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn snapshot_path(&self) -> PathBuf {
        files::data_dir(&self.base).join("tasks.json")
    }

    pub fn activity_log_path(&self) -> PathBuf {
        files::data_dir(&self.base).join("activity.log")
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Read and validate the persisted snapshot.
    ///
    /// A missing primary file is a normal first run and yields an empty
    /// collection. A corrupt primary is never surfaced: the most recent valid
    /// backup is restored instead (and the recovery logged). Only when no
    /// valid backup exists either does this fail, with `StoreUnavailable`.
    pub fn load(&self, log: &mut ActivityLog) -> Result<Collection> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(Collection::default());
        }

        match read_snapshot(&path) {
            Ok(collection) => Ok(collection),
            Err(StoreError::Corrupt(reason)) => self.recover(log, reason),
            Err(other) => Err(other),
        }
    }

    /// Serialize the full collection and write it atomically, then take the
    /// daily backup if today doesn't have one yet.
    pub fn save(&self, collection: &Collection) -> Result<()> {
        self.write_snapshot(collection)?;

        let today = Local::now().date_naive();
        if !self.backups.has_snapshot_for(today) {
            self.backups.snapshot(collection, today)?;
        }
        Ok(())
    }

    fn recover(&self, log: &mut ActivityLog, reason: String) -> Result<Collection> {
        match self.backups.latest_valid(log)? {
            Some(collection) => {
                // Rewrite the primary so the next load doesn't recover again
                self.write_snapshot(&collection)?;
                log.record(
                    Action::Recovered,
                    None,
                    format!("primary snapshot invalid ({reason}); restored latest valid backup"),
                )?;
                Ok(collection)
            }
            None => Err(StoreError::StoreUnavailable),
        }
    }

    fn write_snapshot(&self, collection: &Collection) -> Result<()> {
        fs::create_dir_all(files::data_dir(&self.base))?;
        atomic_write(
            self.snapshot_path(),
            &serde_json::to_string_pretty(collection)?,
        )?;
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<Collection> {
    let content = fs::read_to_string(path)?;
    let collection: Collection =
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    collection.validate().map_err(StoreError::Corrupt)?;
    Ok(collection)
}
