use crate::activity::{Action, ActivityLog};
use crate::domain::Collection;
use crate::error::Result;
use crate::persistence::files::atomic_write;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes and ranks dated full-state snapshots under `backups/`.
///
/// One file per calendar day, named `state_YYYYMMDD.json`; writing twice on
/// the same day overwrites that day's file, never another day's.
#[derive(Debug)]
pub struct BackupManager {
    dir: PathBuf,
}

impl BackupManager {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Backup file path for a calendar date.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("state_{}.json", date.format("%Y%m%d")))
    }

    pub fn has_snapshot_for(&self, date: NaiveDate) -> bool {
        self.path_for(date).exists()
    }

    /// Write a dated snapshot of the collection.
    pub fn snapshot(&self, collection: &Collection, date: NaiveDate) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(date);
        atomic_write(&path, &serde_json::to_string_pretty(collection)?)?;
        Ok(path)
    }

    /// All backup files, newest first. The date-stamped names sort
    /// chronologically, so a name sort is a date sort.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with("state_") && name.ends_with(".json") {
                    files.push(path);
                }
            }
        }

        files.sort();
        files.reverse();
        Ok(files)
    }

    /// The most recent backup that parses and validates, or `None`.
    ///
    /// Corrupt backups are skipped (and the skip logged), continuing to older
    /// ones; a bad newest backup must not block recovery from an older good one.
    pub fn latest_valid(&self, log: &mut ActivityLog) -> Result<Option<Collection>> {
        for path in self.list()? {
            match read_backup(&path) {
                Ok(collection) => return Ok(Some(collection)),
                Err(reason) => {
                    let name = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("backup")
                        .to_string();
                    log.record(Action::BackupSkipped, None, format!("{name}: {reason}"))?;
                }
            }
        }
        Ok(None)
    }
}

fn read_backup(path: &Path) -> std::result::Result<Collection, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let collection: Collection = serde_json::from_str(&content).map_err(|e| e.to_string())?;
    collection.validate()?;
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Collection {
        let mut collection = Collection::default();
        collection.tasks.push(Task::new("Backed up"));
        collection
    }

    fn open_log(dir: &std::path::Path) -> ActivityLog {
        ActivityLog::open(dir.join("activity.log")).unwrap()
    }

    #[test]
    fn test_snapshot_naming_and_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(temp_dir.path().join("backups"));
        let day = date(2024, 3, 5);

        let path = manager.snapshot(&sample(), day).unwrap();
        assert!(path.ends_with("state_20240305.json"));
        assert!(manager.has_snapshot_for(day));
        assert!(!manager.has_snapshot_for(date(2024, 3, 6)));

        // Same-day snapshot overwrites, it does not accumulate
        manager.snapshot(&sample(), day).unwrap();
        assert_eq!(manager.list().unwrap().len(), 1);
    }

    #[test]
    fn test_latest_valid_prefers_newest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(temp_dir.path().join("backups"));
        let mut log = open_log(temp_dir.path());

        let mut old = Collection::default();
        old.tasks.push(Task::new("Old"));
        let mut new = Collection::default();
        new.tasks.push(Task::new("New"));

        manager.snapshot(&old, date(2024, 3, 1)).unwrap();
        manager.snapshot(&new, date(2024, 3, 2)).unwrap();

        let restored = manager.latest_valid(&mut log).unwrap().unwrap();
        assert_eq!(restored.tasks[0].title, "New");
    }

    #[test]
    fn test_latest_valid_skips_corrupt_newest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(temp_dir.path().join("backups"));
        let mut log = open_log(temp_dir.path());

        let mut good = Collection::default();
        good.tasks.push(Task::new("Good"));
        manager.snapshot(&good, date(2024, 3, 1)).unwrap();

        fs::create_dir_all(temp_dir.path().join("backups")).unwrap();
        fs::write(manager.path_for(date(2024, 3, 2)), "{ not json").unwrap();

        let restored = manager.latest_valid(&mut log).unwrap().unwrap();
        assert_eq!(restored.tasks[0].title, "Good");

        // The skip is auditable
        assert!(log
            .entries()
            .iter()
            .any(|e| e.action == Action::BackupSkipped));
    }

    #[test]
    fn test_latest_valid_rejects_invalid_schema() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(temp_dir.path().join("backups"));
        let mut log = open_log(temp_dir.path());

        // Parses as JSON but violates referential integrity
        let mut bad = Collection::default();
        let mut task = Task::new("Dangling");
        task.category_id = Some(uuid::Uuid::new_v4());
        bad.tasks.push(task);
        fs::create_dir_all(temp_dir.path().join("backups")).unwrap();
        fs::write(
            manager.path_for(date(2024, 3, 2)),
            serde_json::to_string(&bad).unwrap(),
        )
        .unwrap();

        assert!(manager.latest_valid(&mut log).unwrap().is_none());
    }

    #[test]
    fn test_latest_valid_with_no_backups() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(temp_dir.path().join("backups"));
        let mut log = open_log(temp_dir.path());

        assert!(manager.latest_valid(&mut log).unwrap().is_none());
    }
}
