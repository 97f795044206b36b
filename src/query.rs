//! Read-side operations over the in-memory collection: keyword search,
//! multi-predicate filtering, calendar grouping and urgency ranking. Every
//! status read goes through the derived-overdue projection, so an overdue
//! task is reported as such even if no refresh pass has stored it yet.

use crate::domain::{Priority, Status, Task};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Category predicate: a concrete category, or the Uncategorized sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    Uncategorized,
    Id(Uuid),
}

impl CategoryFilter {
    fn matches(&self, category_id: Option<Uuid>) -> bool {
        match self {
            Self::Uncategorized => category_id.is_none(),
            Self::Id(id) => category_id == Some(*id),
        }
    }
}

/// Independently-optional predicates, AND-ed together. An empty filter
/// matches every task.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<Status>,
    pub category: Option<CategoryFilter>,
    pub priority: Option<Priority>,
    pub tag: Option<String>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        if let Some(status) = self.status {
            if task.effective_status(today) != status {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !category.matches(task.category_id) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !task.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        if self.due_from.is_some() || self.due_to.is_some() {
            // A date-range predicate excludes undated tasks
            let Some(due) = task.due_date else {
                return false;
            };
            if self.due_from.is_some_and(|from| due < from) {
                return false;
            }
            if self.due_to.is_some_and(|to| due > to) {
                return false;
            }
        }
        true
    }
}

/// Case-insensitive substring search over title and description, in
/// collection order. Lazy and restartable; an empty keyword matches nothing.
pub fn search<'a>(tasks: &'a [Task], keyword: &str) -> impl Iterator<Item = &'a Task> + 'a {
    let needle = keyword.trim().to_lowercase();
    tasks
        .iter()
        .filter(move |t| !needle.is_empty() && t.matches_keyword(&needle))
}

/// Apply a [`TaskFilter`] in collection order.
pub fn filter<'a>(
    tasks: &'a [Task],
    predicate: &'a TaskFilter,
    today: NaiveDate,
) -> impl Iterator<Item = &'a Task> + 'a {
    tasks.iter().filter(move |t| predicate.matches(t, today))
}

/// Group tasks by due date, optionally bounded to an inclusive date range.
/// Undated tasks are excluded; within a date, collection order is kept.
pub fn calendar_view<'a>(
    tasks: &'a [Task],
    range: Option<(NaiveDate, NaiveDate)>,
) -> BTreeMap<NaiveDate, Vec<&'a Task>> {
    let mut groups: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        let Some(due) = task.due_date else { continue };
        if let Some((from, to)) = range {
            if due < from || due > to {
                continue;
            }
        }
        groups.entry(due).or_default().push(task);
    }
    groups
}

/// Tasks due within the next `within_days` days (today inclusive).
pub fn upcoming<'a>(tasks: &'a [Task], today: NaiveDate, within_days: i64) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| {
            t.due_date.is_some_and(|due| {
                let diff = (due - today).num_days();
                (0..=within_days).contains(&diff)
            })
        })
        .collect()
}

/// Heuristic urgency ranking: overdue dominates, then status and priority
/// weights, then due-date proximity.
pub fn urgency_score(task: &Task, today: NaiveDate) -> i64 {
    let mut score = 0;

    score += match task.effective_status(today) {
        Status::Overdue => 1000,
        Status::InProgress => 80,
        Status::Pending => 50,
        Status::Done => -100,
        Status::Archived => -200,
    };

    score += match task.priority {
        Priority::High => 100,
        Priority::Medium => 50,
        Priority::Low => 10,
    };

    if let Some(due) = task.due_date {
        let diff = (due - today).num_days();
        if diff < 0 {
            score += 500;
        } else {
            score += (200 - diff * 10).max(0);
        }
    }

    score
}

/// Sort references most-urgent-first, keeping collection order for ties.
pub fn sort_by_urgency(tasks: &mut [&Task], today: NaiveDate) {
    tasks.sort_by_key(|t| std::cmp::Reverse(urgency_score(t, today)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Collection;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(title: &str, status: Status, due: Option<NaiveDate>) -> Task {
        let mut t = Task::new(title);
        t.status = status;
        t.due_date = due;
        t
    }

    /// T1 Pending and T2 Done, both due 2024-01-01, queried at 2024-06-01.
    fn overdue_pair() -> Collection {
        let mut collection = Collection::default();
        collection
            .tasks
            .push(task("T1", Status::Pending, Some(date(2024, 1, 1))));
        collection
            .tasks
            .push(task("T2", Status::Done, Some(date(2024, 1, 1))));
        collection
    }

    #[test]
    fn test_overdue_filter_sees_derived_status() {
        let collection = overdue_pair();
        let predicate = TaskFilter {
            status: Some(Status::Overdue),
            ..TaskFilter::default()
        };
        let hits: Vec<_> = filter(&collection.tasks, &predicate, date(2024, 6, 1)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "T1");
    }

    #[test]
    fn test_calendar_groups_by_due_date_in_order() {
        let collection = overdue_pair();
        let view = calendar_view(&collection.tasks, None);
        assert_eq!(view.len(), 1);
        let day = &view[&date(2024, 1, 1)];
        assert_eq!(day[0].title, "T1");
        assert_eq!(day[1].title, "T2");
    }

    #[test]
    fn test_calendar_excludes_undated_and_respects_range() {
        let mut collection = overdue_pair();
        collection.tasks.push(task("No due", Status::Pending, None));
        collection
            .tasks
            .push(task("Later", Status::Pending, Some(date(2024, 7, 1))));

        let view = calendar_view(
            &collection.tasks,
            Some((date(2024, 6, 1), date(2024, 12, 31))),
        );
        assert_eq!(view.len(), 1);
        assert_eq!(view[&date(2024, 7, 1)][0].title, "Later");
    }

    #[test]
    fn test_empty_filter_returns_everything_in_order() {
        let collection = overdue_pair();
        let predicate = TaskFilter::default();
        let all: Vec<_> = filter(&collection.tasks, &predicate, date(2024, 6, 1)).collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "T1");
    }

    #[test]
    fn test_filter_predicates_and_together() {
        let mut collection = Collection::default();
        let mut a = task("Done high", Status::Done, None);
        a.priority = Priority::High;
        let mut b = task("Done low", Status::Done, None);
        b.priority = Priority::Low;
        let mut c = task("Pending high", Status::Pending, None);
        c.priority = Priority::High;
        collection.tasks.extend([a, b, c]);

        let predicate = TaskFilter {
            status: Some(Status::Done),
            priority: Some(Priority::High),
            ..TaskFilter::default()
        };
        let hits: Vec<_> = filter(&collection.tasks, &predicate, date(2024, 6, 1)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Done high");
    }

    #[test]
    fn test_filter_by_tag_and_category() {
        let mut collection = Collection::default();
        let cat_id = Uuid::new_v4();
        let mut a = task("Tagged", Status::Pending, None);
        a.tags.insert("Urgent".to_string());
        a.category_id = Some(cat_id);
        let b = task("Plain", Status::Pending, None);
        collection.tasks.extend([a, b]);

        let predicate = TaskFilter {
            tag: Some("urgent".to_string()),
            category: Some(CategoryFilter::Id(cat_id)),
            ..TaskFilter::default()
        };
        let hits: Vec<_> = filter(&collection.tasks, &predicate, date(2024, 6, 1)).collect();
        assert_eq!(hits.len(), 1);

        let predicate = TaskFilter {
            category: Some(CategoryFilter::Uncategorized),
            ..TaskFilter::default()
        };
        let hits: Vec<_> = filter(&collection.tasks, &predicate, date(2024, 6, 1)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Plain");
    }

    #[test]
    fn test_due_range_is_inclusive_and_excludes_undated() {
        let mut collection = Collection::default();
        collection
            .tasks
            .push(task("On from", Status::Pending, Some(date(2024, 5, 1))));
        collection
            .tasks
            .push(task("On to", Status::Pending, Some(date(2024, 5, 31))));
        collection
            .tasks
            .push(task("Outside", Status::Pending, Some(date(2024, 6, 1))));
        collection.tasks.push(task("Undated", Status::Pending, None));

        let predicate = TaskFilter {
            due_from: Some(date(2024, 5, 1)),
            due_to: Some(date(2024, 5, 31)),
            ..TaskFilter::default()
        };
        let hits: Vec<_> = filter(&collection.tasks, &predicate, date(2024, 6, 1)).collect();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_search_is_case_insensitive_and_restartable() {
        let mut collection = Collection::default();
        let mut a = Task::new("Write REPORT");
        a.description = Some("quarterly numbers".to_string());
        collection.tasks.push(a);
        collection.tasks.push(Task::new("Walk dog"));

        let hits: Vec<_> = search(&collection.tasks, "report").collect();
        assert_eq!(hits.len(), 1);

        // Restartable: a fresh call over the same data yields the same hits
        let again: Vec<_> = search(&collection.tasks, "QUARTERLY").collect();
        assert_eq!(again.len(), 1);

        let none: Vec<_> = search(&collection.tasks, "").collect();
        assert!(none.is_empty());
    }

    #[test]
    fn test_upcoming_window() {
        let today = date(2024, 6, 1);
        let mut collection = Collection::default();
        collection
            .tasks
            .push(task("Today", Status::Pending, Some(today)));
        collection
            .tasks
            .push(task("In a week", Status::Pending, Some(date(2024, 6, 8))));
        collection
            .tasks
            .push(task("Past", Status::Pending, Some(date(2024, 5, 1))));

        // Window is inclusive on both ends; past-due tasks are not "upcoming"
        let soon = upcoming(&collection.tasks, today, 7);
        let titles: Vec<_> = soon.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Today", "In a week"]);

        let tight = upcoming(&collection.tasks, today, 3);
        assert_eq!(tight.len(), 1);
    }

    #[test]
    fn test_urgency_orders_overdue_first() {
        let today = date(2024, 6, 1);
        let overdue = task("Overdue", Status::Pending, Some(date(2024, 1, 1)));
        let mut high = task("High", Status::Pending, None);
        high.priority = Priority::High;
        let done = task("Done", Status::Done, None);

        let mut refs = vec![&done, &high, &overdue];
        sort_by_urgency(&mut refs, today);
        let titles: Vec<_> = refs.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Overdue", "High", "Done"]);
    }
}
