use crate::activity::Entry;
use crate::domain::{Collection, Status};
use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated analytics over a collection and its activity log. A pure value:
/// building one has no side effects, exporting it is the generator's job.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Done / total non-Archived, zero when there is nothing to complete.
    pub completion_rate: f64,
    pub by_status: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    /// Completed task counts keyed by ISO week ("2024-W23").
    pub completed_per_week: BTreeMap<String, usize>,
    pub avg_completion_hours: Option<f64>,
    pub activity_by_action: BTreeMap<String, usize>,
}

/// Build the analytics report. Status counts use the derived-overdue
/// projection against `today`. With a range, only tasks created inside it and
/// activity stamped inside it are aggregated.
pub fn build_report(
    collection: &Collection,
    entries: &[Entry],
    today: NaiveDate,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Report {
    let in_range = |date: NaiveDate| match range {
        Some((from, to)) => date >= from && date <= to,
        None => true,
    };

    let tasks: Vec<_> = collection
        .tasks
        .iter()
        .filter(|t| in_range(t.created_at.date_naive()))
        .collect();

    let mut by_status = BTreeMap::new();
    let mut by_category = BTreeMap::new();
    let mut by_priority = BTreeMap::new();
    let mut completed_per_week = BTreeMap::new();
    let mut completed = 0usize;
    let mut non_archived = 0usize;
    let mut completion_seconds = 0i64;
    let mut completion_samples = 0usize;

    for task in &tasks {
        let status = task.effective_status(today);
        *by_status.entry(status.as_str().to_string()).or_insert(0) += 1;
        *by_category
            .entry(collection.category_name(task.category_id).to_string())
            .or_insert(0) += 1;
        *by_priority
            .entry(task.priority.as_str().to_string())
            .or_insert(0) += 1;

        if status != Status::Archived {
            non_archived += 1;
        }
        if status == Status::Done {
            completed += 1;
        }
        if let Some(completed_at) = task.completed_at {
            let iso = completed_at.iso_week();
            let key = format!("{}-W{:02}", iso.year(), iso.week());
            *completed_per_week.entry(key).or_insert(0) += 1;

            completion_seconds += (completed_at - task.created_at).num_seconds();
            completion_samples += 1;
        }
    }

    let completion_rate = if non_archived > 0 {
        completed as f64 / non_archived as f64
    } else {
        0.0
    };

    let avg_completion_hours = (completion_samples > 0).then(|| {
        let hours = completion_seconds as f64 / completion_samples as f64 / 3600.0;
        (hours * 100.0).round() / 100.0
    });

    let mut activity_by_action = BTreeMap::new();
    for entry in entries {
        if in_range(entry.timestamp.date_naive()) {
            *activity_by_action
                .entry(entry.action.as_str().to_string())
                .or_insert(0) += 1;
        }
    }

    Report {
        generated_at: Local::now(),
        range,
        total_tasks: tasks.len(),
        completed_tasks: completed,
        completion_rate,
        by_status,
        by_category,
        by_priority,
        completed_per_week,
        avg_completion_hours,
        activity_by_action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Action, ActivityLog};
    use crate::domain::{Category, Priority, Task};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mixed_collection() -> Collection {
        let mut collection = Collection::default();
        let cat = Category::new("Work");
        let cat_id = cat.id;
        collection.categories.push(cat);

        let mut done = Task::new("Done one");
        done.apply_status(Status::Done);
        done.category_id = Some(cat_id);
        done.priority = Priority::High;

        let mut overdue = Task::new("Late one");
        overdue.due_date = Some(date(2024, 1, 1));

        let mut archived = Task::new("Old one");
        archived.apply_status(Status::Archived);

        collection.tasks.extend([done, overdue, archived]);
        collection
    }

    #[test]
    fn test_counts_and_completion_rate() {
        let collection = mixed_collection();
        let report = build_report(&collection, &[], date(2024, 6, 1), None);

        assert_eq!(report.total_tasks, 3);
        assert_eq!(report.completed_tasks, 1);
        assert_eq!(report.by_status["Done"], 1);
        // Derived overdue shows up in the aggregation without a refresh pass
        assert_eq!(report.by_status["Overdue"], 1);
        assert_eq!(report.by_status["Archived"], 1);
        assert_eq!(report.by_category["Work"], 1);
        assert_eq!(report.by_category["Uncategorized"], 2);
        assert_eq!(report.by_priority["High"], 1);
        // 1 done of 2 non-archived
        assert!((report.completion_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_completed_per_week_and_avg_hours() {
        let mut collection = Collection::default();
        let mut task = Task::new("Quick win");
        task.created_at = Local::now() - chrono::Duration::hours(2);
        task.apply_status(Status::Done);
        collection.tasks.push(task);

        let report = build_report(&collection, &[], Local::now().date_naive(), None);
        assert_eq!(report.completed_per_week.len(), 1);
        assert_eq!(report.completed_per_week.values().sum::<usize>(), 1);
        let hours = report.avg_completion_hours.unwrap();
        assert!((1.9..=2.1).contains(&hours), "got {hours}");
    }

    #[test]
    fn test_activity_counts_by_action() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut log = ActivityLog::open(temp_dir.path().join("activity.log")).unwrap();
        log.record(Action::Created, None, "a").unwrap();
        log.record(Action::Created, None, "b").unwrap();
        log.record(Action::Deleted, None, "a").unwrap();

        let report = build_report(
            &Collection::default(),
            log.entries(),
            Local::now().date_naive(),
            None,
        );
        assert_eq!(report.activity_by_action["created"], 2);
        assert_eq!(report.activity_by_action["deleted"], 1);
    }

    #[test]
    fn test_range_excludes_tasks_created_outside() {
        let collection = mixed_collection();
        // All fixture tasks are created "now"; a range far in the past sees none
        let report = build_report(
            &collection,
            &[],
            date(2024, 6, 1),
            Some((date(2000, 1, 1), date(2000, 12, 31))),
        );
        assert_eq!(report.total_tasks, 0);
        assert_eq!(report.completion_rate, 0.0);
    }
}
