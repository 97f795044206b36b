use crate::error::Result;
use crate::persistence::{append_line, read_file};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// What kind of mutation an activity entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    SubtaskAdded,
    Retagged,
    CategoryReassigned,
    CategoryCreated,
    CategoryRenamed,
    CategoryDeleted,
    Recovered,
    BackupSkipped,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::StatusChanged => "status_changed",
            Self::SubtaskAdded => "subtask_added",
            Self::Retagged => "retagged",
            Self::CategoryReassigned => "category_reassigned",
            Self::CategoryCreated => "category_created",
            Self::CategoryRenamed => "category_renamed",
            Self::CategoryDeleted => "category_deleted",
            Self::Recovered => "recovered",
            Self::BackupSkipped => "backup_skipped",
        }
    }
}

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub timestamp: DateTime<Local>,
    pub action: Action,
    #[serde(default)]
    pub task_id: Option<Uuid>,
    #[serde(default)]
    pub detail: String,
}

/// Append-only audit trail of mutations and recovery events, one JSON object
/// per line in `data/activity.log`. Entries are never mutated or reordered.
#[derive(Debug)]
pub struct ActivityLog {
    path: PathBuf,
    entries: Vec<Entry>,
}

impl ActivityLog {
    /// Load the log from disk. Unparseable lines are skipped, not fatal: a
    /// torn final line must not take the whole history down.
    pub fn open(path: PathBuf) -> Result<Self> {
        let content = read_file(&path)?;
        let entries = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        Ok(Self { path, entries })
    }

    /// Append one entry, durably, and keep it in memory for analytics.
    pub fn record(
        &mut self,
        action: Action,
        task_id: Option<Uuid>,
        detail: impl Into<String>,
    ) -> Result<()> {
        let entry = Entry {
            timestamp: Local::now(),
            action,
            task_id,
            detail: detail.into(),
        };
        append_line(&self.path, &serde_json::to_string(&entry)?)?;
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}
