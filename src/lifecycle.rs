//! Mutations over the in-memory collection: task CRUD, status transitions
//! (including the derived-overdue refresh), tag bulk edits and the category
//! deletion cascade. Every mutation appends one activity entry per task
//! affected; persistence stays with the caller.

use crate::activity::{Action, ActivityLog};
use crate::domain::{Category, Collection, Priority, Status, Task, UNCATEGORIZED};
use crate::error::{Result, StoreError};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Fields for creating a task or subtask.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category_id: Option<Uuid>,
    pub tags: BTreeSet<String>,
    pub due_date: Option<NaiveDate>,
}

/// Partial update for a task. Outer `None` leaves a field alone; for the
/// double-wrapped fields, `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub category: Option<Option<Uuid>>,
    pub due_date: Option<Option<NaiveDate>>,
}

/// Per-item outcome of a bulk retag: unknown ids are reported, not fatal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetagSummary {
    pub updated: Vec<Uuid>,
    pub skipped: Vec<Uuid>,
}

/// Create a top-level task. Status defaults to Pending.
pub fn create_task(
    collection: &mut Collection,
    log: &mut ActivityLog,
    new: NewTask,
) -> Result<Task> {
    let task = build_task(collection, new)?;
    collection.tasks.push(task.clone());
    log.record(Action::Created, Some(task.id), task.title.clone())?;
    Ok(task)
}

/// Attach a subtask to an existing task at any depth.
pub fn add_subtask(
    collection: &mut Collection,
    log: &mut ActivityLog,
    parent_id: Uuid,
    new: NewTask,
) -> Result<Task> {
    let subtask = build_task(collection, new)?;
    let parent = collection
        .find_task_mut(parent_id)
        .ok_or_else(|| StoreError::NotFound(format!("task {parent_id}")))?;
    parent.subtasks.push(subtask.clone());
    parent.touch();
    log.record(
        Action::SubtaskAdded,
        Some(subtask.id),
        format!("'{}' under {}", subtask.title, parent_id),
    )?;
    Ok(subtask)
}

/// Apply a partial field update. All validation happens before any mutation,
/// so a rejected patch leaves the task untouched.
pub fn update_task(
    collection: &mut Collection,
    log: &mut ActivityLog,
    id: Uuid,
    patch: TaskPatch,
) -> Result<Task> {
    if let Some(title) = &patch.title {
        if title.trim().is_empty() {
            return Err(StoreError::Validation("title must not be empty".into()));
        }
    }
    if let Some(Some(cat_id)) = patch.category {
        if collection.category(cat_id).is_none() {
            return Err(StoreError::NotFound(format!("category {cat_id}")));
        }
    }

    let task = collection
        .find_task_mut(id)
        .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;

    if let Some(title) = patch.title {
        task.title = title.trim().to_string();
    }
    if let Some(description) = patch.description {
        task.description = description.filter(|d| !d.trim().is_empty());
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(category) = patch.category {
        task.category_id = category;
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = due_date;
    }
    task.touch();

    let snapshot = task.clone();
    log.record(Action::Updated, Some(id), snapshot.title.clone())?;
    Ok(snapshot)
}

/// Remove a task and its whole subtree.
pub fn delete_task(collection: &mut Collection, log: &mut ActivityLog, id: Uuid) -> Result<Task> {
    let removed = collection
        .remove_task(id)
        .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
    log.record(Action::Deleted, Some(id), removed.title.clone())?;
    Ok(removed)
}

/// Explicit status transition. Any of the five values is legal, including a
/// manual `Overdue`; the next [`refresh_overdue`] pass realigns derived state.
pub fn set_status(
    collection: &mut Collection,
    log: &mut ActivityLog,
    id: Uuid,
    status: Status,
) -> Result<Task> {
    let task = collection
        .find_task_mut(id)
        .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
    task.apply_status(status);
    let snapshot = task.clone();
    log.record(Action::StatusChanged, Some(id), status.as_str())?;
    Ok(snapshot)
}

/// Realign stored status with the derived-overdue projection, at every
/// subtask depth: open tasks past due become Overdue, Overdue tasks whose due
/// date is today or later fall back to Pending. Returns the changed ids.
pub fn refresh_overdue(
    collection: &mut Collection,
    log: &mut ActivityLog,
    today: NaiveDate,
) -> Result<Vec<Uuid>> {
    let mut changed = Vec::new();
    refresh_tree(&mut collection.tasks, today, &mut changed);
    for (id, status) in &changed {
        log.record(
            Action::StatusChanged,
            Some(*id),
            format!("auto {}", status.as_str()),
        )?;
    }
    Ok(changed.into_iter().map(|(id, _)| id).collect())
}

fn refresh_tree(tasks: &mut [Task], today: NaiveDate, changed: &mut Vec<(Uuid, Status)>) {
    for task in tasks {
        let projected = task.effective_status(today);
        if projected != task.status {
            task.status = projected;
            task.touch();
            changed.push((task.id, projected));
        }
        refresh_tree(&mut task.subtasks, today, changed);
    }
}

/// Bulk-move every task referencing `old_id` to another category (or to
/// Uncategorized). Idempotent; used by category deletion. Returns the number
/// of tasks moved.
pub fn reassign_category(
    collection: &mut Collection,
    log: &mut ActivityLog,
    old_id: Uuid,
    new: Option<Uuid>,
) -> Result<usize> {
    if let Some(new_id) = new {
        if collection.category(new_id).is_none() {
            return Err(StoreError::NotFound(format!("category {new_id}")));
        }
    }
    let target = collection.category_name(new).to_string();

    let mut moved = Vec::new();
    reassign_tree(&mut collection.tasks, old_id, new, &mut moved);
    for id in &moved {
        log.record(Action::CategoryReassigned, Some(*id), target.clone())?;
    }
    Ok(moved.len())
}

fn reassign_tree(tasks: &mut [Task], old_id: Uuid, new: Option<Uuid>, moved: &mut Vec<Uuid>) {
    for task in tasks {
        if task.category_id == Some(old_id) {
            task.category_id = new;
            task.touch();
            moved.push(task.id);
        }
        reassign_tree(&mut task.subtasks, old_id, new, moved);
    }
}

/// Add and remove tags on a batch of tasks, atomically per task. Unknown ids
/// land in `skipped` instead of failing the batch.
pub fn bulk_retag(
    collection: &mut Collection,
    log: &mut ActivityLog,
    ids: &[Uuid],
    add: &BTreeSet<String>,
    remove: &BTreeSet<String>,
) -> Result<RetagSummary> {
    let mut summary = RetagSummary::default();

    for &id in ids {
        let Some(task) = collection.find_task_mut(id) else {
            summary.skipped.push(id);
            continue;
        };
        for tag in add {
            task.tags.insert(tag.clone());
        }
        for tag in remove {
            task.tags.remove(tag);
        }
        task.touch();
        summary.updated.push(id);

        let added: Vec<_> = add.iter().map(|t| format!("+{t}")).collect();
        let removed: Vec<_> = remove.iter().map(|t| format!("-{t}")).collect();
        log.record(
            Action::Retagged,
            Some(id),
            added.into_iter().chain(removed).collect::<Vec<_>>().join(" "),
        )?;
    }

    Ok(summary)
}

/// Create a category with a unique, non-empty name.
pub fn create_category(
    collection: &mut Collection,
    log: &mut ActivityLog,
    name: &str,
    description: &str,
    color: &str,
) -> Result<Category> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::Validation("category name must not be empty".into()));
    }
    if collection.category_by_name(name).is_some() {
        return Err(StoreError::Validation(format!(
            "category '{name}' already exists"
        )));
    }

    let mut category = Category::new(name);
    category.description = description.trim().to_string();
    category.color = color.trim().to_string();
    collection.categories.push(category.clone());
    log.record(Action::CategoryCreated, None, name)?;
    Ok(category)
}

pub fn rename_category(
    collection: &mut Collection,
    log: &mut ActivityLog,
    id: Uuid,
    new_name: &str,
) -> Result<Category> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(StoreError::Validation("category name must not be empty".into()));
    }
    if collection
        .category_by_name(new_name)
        .is_some_and(|c| c.id != id)
    {
        return Err(StoreError::Validation(format!(
            "category '{new_name}' already exists"
        )));
    }

    let category = collection
        .categories
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| StoreError::NotFound(format!("category {id}")))?;
    let old_name = std::mem::replace(&mut category.name, new_name.to_string());
    let snapshot = category.clone();
    log.record(
        Action::CategoryRenamed,
        None,
        format!("'{old_name}' -> '{new_name}'"),
    )?;
    Ok(snapshot)
}

/// Delete a category, cascading every task that referenced it to
/// Uncategorized so no reference is ever left dangling. Returns the number of
/// tasks reassigned.
pub fn delete_category(
    collection: &mut Collection,
    log: &mut ActivityLog,
    id: Uuid,
) -> Result<usize> {
    let pos = collection
        .categories
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| StoreError::NotFound(format!("category {id}")))?;
    let removed = collection.categories.remove(pos);

    let moved = reassign_category(collection, log, id, None)?;
    log.record(
        Action::CategoryDeleted,
        None,
        format!("'{}' ({moved} tasks -> {UNCATEGORIZED})", removed.name),
    )?;
    Ok(moved)
}

fn build_task(collection: &Collection, new: NewTask) -> Result<Task> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(StoreError::Validation("title must not be empty".into()));
    }
    if let Some(cat_id) = new.category_id {
        if collection.category(cat_id).is_none() {
            return Err(StoreError::NotFound(format!("category {cat_id}")));
        }
    }

    let mut task = Task::new(title);
    task.description = new.description.filter(|d| !d.trim().is_empty());
    task.priority = new.priority;
    task.category_id = new.category_id;
    task.tags = new
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    task.due_date = new.due_date;
    Ok(task)
}
