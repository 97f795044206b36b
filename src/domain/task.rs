use super::enums::{Priority, Status};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

/// Display name for tasks whose `category_id` is `None`.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A task or subtask. Subtasks form an owned tree: parent-to-child is the
/// only direction, and every node is addressable by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    /// `None` means Uncategorized. A `Some` id must resolve to an existing
    /// category, see [`Collection::validate`].
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub subtasks: Vec<Task>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Local>>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Local>>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            status: Status::Pending,
            priority: Priority::default(),
            category_id: None,
            tags: BTreeSet::new(),
            due_date: None,
            subtasks: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            archived_at: None,
        }
    }

    /// The status queries should report: a pure projection of the stored
    /// status against the due date.
    ///
    /// Open tasks (Pending/In Progress) past their due date read as Overdue;
    /// a stored Overdue whose due date is today or later reads as Pending.
    pub fn effective_status(&self, today: NaiveDate) -> Status {
        match (self.status, self.due_date) {
            (s, Some(due)) if s.is_open() && due < today => Status::Overdue,
            (Status::Overdue, Some(due)) if due >= today => Status::Pending,
            (s, _) => s,
        }
    }

    /// Set the status and keep the completion/archive timestamps consistent
    /// with it. Advances `updated_at`.
    pub fn apply_status(&mut self, status: Status) {
        let now = Local::now();
        self.status = status;
        match status {
            Status::Done => {
                if self.completed_at.is_none() {
                    self.completed_at = Some(now);
                }
            }
            _ => self.completed_at = None,
        }
        match status {
            Status::Archived => {
                if self.archived_at.is_none() {
                    self.archived_at = Some(now);
                }
            }
            _ => self.archived_at = None,
        }
        self.updated_at = now;
    }

    /// Advance `updated_at` after a field edit.
    pub fn touch(&mut self) {
        self.updated_at = Local::now();
    }

    /// Case-insensitive keyword match over title and description.
    pub fn matches_keyword(&self, keyword_lower: &str) -> bool {
        if self.title.to_lowercase().contains(keyword_lower) {
            return true;
        }
        self.description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(keyword_lower))
    }

    /// Find a node in this subtree by id.
    pub fn find(&self, id: Uuid) -> Option<&Task> {
        if self.id == id {
            return Some(self);
        }
        self.subtasks.iter().find_map(|st| st.find(id))
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        if self.id == id {
            return Some(self);
        }
        self.subtasks.iter_mut().find_map(|st| st.find_mut(id))
    }
}

/// A user-defined category. Tasks reference categories by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            color: String::new(),
        }
    }
}

/// The complete in-memory state: all tasks and categories. One `Collection`
/// is the unit of persistence and of backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Collection {
    /// Find a task at any subtask depth.
    pub fn find_task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find_map(|t| t.find(id))
    }

    pub fn find_task_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        self.tasks.iter_mut().find_map(|t| t.find_mut(id))
    }

    /// Flatten the task tree in collection order, parents before children.
    pub fn all_tasks(&self) -> Vec<&Task> {
        fn walk<'a>(tasks: &'a [Task], out: &mut Vec<&'a Task>) {
            for task in tasks {
                out.push(task);
                walk(&task.subtasks, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.tasks, &mut out);
        out
    }

    /// Remove a task (and its subtree) from wherever it sits in the tree.
    pub fn remove_task(&mut self, id: Uuid) -> Option<Task> {
        remove_from(&mut self.tasks, id)
    }

    pub fn category(&self, id: Uuid) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_by_name(&self, name: &str) -> Option<&Category> {
        let target = name.trim().to_lowercase();
        self.categories
            .iter()
            .find(|c| c.name.to_lowercase() == target)
    }

    /// Resolve a task's category reference to a display name.
    pub fn category_name(&self, category_id: Option<Uuid>) -> &str {
        category_id
            .and_then(|id| self.category(id))
            .map_or(UNCATEGORIZED, |c| c.name.as_str())
    }

    /// Structural validation applied to every loaded snapshot and backup
    /// candidate: non-empty titles and unique ids at every subtask depth,
    /// every category reference resolving, unique non-empty category names.
    pub fn validate(&self) -> Result<(), String> {
        let mut category_ids = HashSet::new();
        let mut category_names = HashSet::new();
        for cat in &self.categories {
            if cat.name.trim().is_empty() {
                return Err(format!("category {} has an empty name", cat.id));
            }
            if !category_ids.insert(cat.id) {
                return Err(format!("duplicate category id {}", cat.id));
            }
            if !category_names.insert(cat.name.trim().to_lowercase()) {
                return Err(format!("duplicate category name '{}'", cat.name));
            }
        }

        let mut task_ids = HashSet::new();
        for task in &self.tasks {
            validate_task(task, &category_ids, &mut task_ids)?;
        }
        Ok(())
    }
}

fn validate_task(
    task: &Task,
    category_ids: &HashSet<Uuid>,
    seen: &mut HashSet<Uuid>,
) -> Result<(), String> {
    if task.title.trim().is_empty() {
        return Err(format!("task {} has an empty title", task.id));
    }
    if !seen.insert(task.id) {
        return Err(format!("duplicate task id {}", task.id));
    }
    if let Some(cat_id) = task.category_id {
        if !category_ids.contains(&cat_id) {
            return Err(format!(
                "task {} references missing category {}",
                task.id, cat_id
            ));
        }
    }
    for subtask in &task.subtasks {
        validate_task(subtask, category_ids, seen)?;
    }
    Ok(())
}

fn remove_from(tasks: &mut Vec<Task>, id: Uuid) -> Option<Task> {
    if let Some(pos) = tasks.iter().position(|t| t.id == id) {
        return Some(tasks.remove(pos));
    }
    tasks
        .iter_mut()
        .find_map(|t| remove_from(&mut t.subtasks, id))
}
