//! Demo data, useful for trying the tool on a fresh vault.

use crate::domain::{Category, Collection, Priority, Task};
use crate::lifecycle::NewTask;
use std::collections::BTreeSet;

fn tags(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn task_from(new: NewTask) -> Task {
    let mut task = Task::new(new.title);
    task.description = new.description;
    task.priority = new.priority;
    task.category_id = new.category_id;
    task.tags = new.tags;
    task.due_date = new.due_date;
    task
}

/// A small, valid collection: three categories and three tagged tasks.
pub fn sample_collection() -> Collection {
    let mut collection = Collection::default();

    let mut school = Category::new("School");
    school.description = "Assignments and exams".to_string();
    school.color = "blue".to_string();
    let mut work = Category::new("Work");
    work.description = "Client work and deliverables".to_string();
    work.color = "green".to_string();
    let mut personal = Category::new("Personal");
    personal.description = "Personal errands".to_string();
    personal.color = "yellow".to_string();

    collection.tasks.push(task_from(NewTask {
        title: "Finish term project".to_string(),
        description: Some("Implement CLI + persistence + tests".to_string()),
        priority: Priority::High,
        category_id: Some(school.id),
        tags: tags(&["rust", "deadline"]),
        due_date: None,
    }));
    collection.tasks.push(task_from(NewTask {
        title: "Prepare weekly plan".to_string(),
        description: Some("List next week priorities".to_string()),
        priority: Priority::Medium,
        category_id: Some(personal.id),
        tags: tags(&["planning"]),
        due_date: None,
    }));
    collection.tasks.push(task_from(NewTask {
        title: "Client email follow-up".to_string(),
        description: Some("Send updated proposal".to_string()),
        priority: Priority::High,
        category_id: Some(work.id),
        tags: tags(&["email", "client"]),
        due_date: None,
    }));

    collection.categories.extend([school, work, personal]);
    collection
}
