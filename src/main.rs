mod activity;
mod domain;
mod error;
mod lifecycle;
mod persistence;
mod query;
mod report;
mod sample;

use activity::ActivityLog;
use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use domain::{Collection, Priority, Status, Task, UNCATEGORIZED};
use lifecycle::{NewTask, TaskPatch};
use persistence::Store;
use query::{CategoryFilter, TaskFilter};
use std::collections::BTreeSet;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "taskvault")]
#[command(about = "A personal task tracker with durable JSON storage and automatic backup recovery", long_about = None)]
struct Cli {
    /// Vault directory (defaults to a local .taskvault, falling back to ~/.taskvault)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .taskvault directory in the current directory
    Init,
    /// Populate the vault with a small sample data set
    Sample,
    /// Add a new task
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Category name
        #[arg(short, long)]
        category: Option<String>,
        /// Low, Medium or High
        #[arg(short, long)]
        priority: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// List tasks, with optional filter predicates (AND-ed together)
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// Due on or after this date (YYYY-MM-DD)
        #[arg(long)]
        due_from: Option<String>,
        /// Due on or before this date (YYYY-MM-DD)
        #[arg(long)]
        due_to: Option<String>,
        /// Sort most urgent first instead of collection order
        #[arg(long)]
        by_urgency: bool,
    },
    /// Search tasks by keyword over title and description
    Search { keyword: String },
    /// Set a task's status
    Status {
        /// Task id or unique id prefix
        id: String,
        /// Pending, "In Progress", Done, Archived or Overdue
        status: String,
    },
    /// Update task fields; omitted fields are left alone
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// New description; pass an empty string to clear it
        #[arg(long)]
        description: Option<String>,
        /// Category name, or "Uncategorized"
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Remove the due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
    },
    /// Delete a task and its subtasks
    Delete { id: String },
    /// Add a subtask under an existing task
    Subtask { parent: String, title: String },
    /// Add/remove tags on a batch of tasks; unknown ids are skipped, not fatal
    Retag {
        /// Task ids or unique id prefixes
        ids: Vec<String>,
        #[arg(long)]
        add: Vec<String>,
        #[arg(long)]
        remove: Vec<String>,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Tasks due within the next N days (today inclusive)
    Upcoming {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Group tasks by due date
    Calendar {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Export an analytics report to reports/
    Report {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// Output file path (defaults to reports/report_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Take a backup snapshot now
    Backup,
}

#[derive(Subcommand)]
enum CategoryCommands {
    List,
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        color: String,
    },
    Rename { name: String, new_name: String },
    /// Delete a category; its tasks move to Uncategorized
    Delete { name: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let vault_dir = persistence::init_local_vault()?;
            println!("Initialized vault directory: {}", vault_dir.display());
            println!();
            println!("taskvault will now use this local directory for task storage.");
            Ok(())
        }
        Commands::Sample => {
            let base = resolve_vault(cli.vault)?;
            persistence::ensure_vault_dirs(&base)?;
            let store = Store::new(base);
            let collection = sample::sample_collection();
            store.save(&collection)?;
            println!(
                "Sample data saved: {} tasks, {} categories.",
                collection.tasks.len(),
                collection.categories.len()
            );
            Ok(())
        }
        command => {
            let mut app = App::open(cli.vault)?;
            app.run(command)
        }
    }
}

/// An opened vault: the store, its activity log and the loaded collection.
struct App {
    store: Store,
    log: ActivityLog,
    collection: Collection,
}

impl App {
    /// Load (recovering if needed), then realign derived overdue state and
    /// persist it when anything changed.
    fn open(vault: Option<PathBuf>) -> Result<Self> {
        let base = resolve_vault(vault)?;
        persistence::ensure_vault_dirs(&base)?;
        let store = Store::new(base);
        let mut log = ActivityLog::open(store.activity_log_path())?;
        let mut collection = store.load(&mut log)?;

        let changed = lifecycle::refresh_overdue(&mut collection, &mut log, today())?;
        if !changed.is_empty() {
            store.save(&collection)?;
            eprintln!("{} task(s) marked overdue.", changed.len());
        }

        Ok(Self {
            store,
            log,
            collection,
        })
    }

    fn save(&self) -> Result<()> {
        self.store.save(&self.collection)?;
        Ok(())
    }

    fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Init | Commands::Sample => unreachable!("handled before opening the vault"),
            Commands::Add {
                title,
                description,
                category,
                priority,
                due,
                tag,
            } => {
                let new = NewTask {
                    title,
                    description,
                    priority: priority.as_deref().map(parse_priority).transpose()?.unwrap_or_default(),
                    category_id: category.as_deref().map(|c| self.resolve_category_id(c)).transpose()?.flatten(),
                    tags: tag.into_iter().collect(),
                    due_date: due.as_deref().map(parse_date).transpose()?,
                };
                let task = lifecycle::create_task(&mut self.collection, &mut self.log, new)?;
                self.save()?;
                self.print_tasks(&[&task]);
                Ok(())
            }
            Commands::List {
                status,
                category,
                priority,
                tag,
                due_from,
                due_to,
                by_urgency,
            } => {
                let predicate = TaskFilter {
                    status: status.as_deref().map(parse_status).transpose()?,
                    category: category.as_deref().map(|c| self.resolve_category_filter(c)).transpose()?,
                    priority: priority.as_deref().map(parse_priority).transpose()?,
                    tag,
                    due_from: due_from.as_deref().map(parse_date).transpose()?,
                    due_to: due_to.as_deref().map(parse_date).transpose()?,
                };
                let mut hits: Vec<&Task> =
                    query::filter(&self.collection.tasks, &predicate, today()).collect();
                if by_urgency {
                    query::sort_by_urgency(&mut hits, today());
                }
                self.print_tasks(&hits);
                Ok(())
            }
            Commands::Search { keyword } => {
                let hits: Vec<&Task> = query::search(&self.collection.tasks, &keyword).collect();
                self.print_tasks(&hits);
                Ok(())
            }
            Commands::Status { id, status } => {
                let id = self.resolve_task_id(&id)?;
                let status = parse_status(&status)?;
                let task = lifecycle::set_status(&mut self.collection, &mut self.log, id, status)?;
                self.save()?;
                self.print_tasks(&[&task]);
                Ok(())
            }
            Commands::Update {
                id,
                title,
                description,
                category,
                priority,
                due,
                clear_due,
            } => {
                let id = self.resolve_task_id(&id)?;
                let due_date = if clear_due {
                    Some(None)
                } else {
                    due.as_deref().map(parse_date).transpose()?.map(Some)
                };
                let patch = TaskPatch {
                    title,
                    description: description.map(Some),
                    priority: priority.as_deref().map(parse_priority).transpose()?,
                    category: category.as_deref().map(|c| self.resolve_category_id(c)).transpose()?,
                    due_date,
                };
                let task = lifecycle::update_task(&mut self.collection, &mut self.log, id, patch)?;
                self.save()?;
                self.print_tasks(&[&task]);
                Ok(())
            }
            Commands::Delete { id } => {
                let id = self.resolve_task_id(&id)?;
                let removed = lifecycle::delete_task(&mut self.collection, &mut self.log, id)?;
                self.save()?;
                println!("Deleted '{}'.", removed.title);
                Ok(())
            }
            Commands::Subtask { parent, title } => {
                let parent_id = self.resolve_task_id(&parent)?;
                let new = NewTask {
                    title,
                    ..NewTask::default()
                };
                let subtask =
                    lifecycle::add_subtask(&mut self.collection, &mut self.log, parent_id, new)?;
                self.save()?;
                self.print_tasks(&[&subtask]);
                Ok(())
            }
            Commands::Retag { ids, add, remove } => {
                let mut resolved = Vec::new();
                let mut unknown = Vec::new();
                for input in &ids {
                    match self.resolve_task_id(input) {
                        Ok(id) => resolved.push(id),
                        Err(_) => unknown.push(input.clone()),
                    }
                }

                let add: BTreeSet<String> = add.into_iter().collect();
                let remove: BTreeSet<String> = remove.into_iter().collect();
                let summary = lifecycle::bulk_retag(
                    &mut self.collection,
                    &mut self.log,
                    &resolved,
                    &add,
                    &remove,
                )?;
                self.save()?;

                println!("Retagged {} task(s).", summary.updated.len());
                let skipped = summary.skipped.len() + unknown.len();
                if skipped > 0 {
                    println!("Skipped {skipped} unknown id(s).");
                }
                Ok(())
            }
            Commands::Category { command } => self.run_category(command),
            Commands::Upcoming { days } => {
                let soon = query::upcoming(&self.collection.tasks, today(), days);
                self.print_tasks(&soon);
                Ok(())
            }
            Commands::Calendar { from, to } => {
                let range = parse_range(from.as_deref(), to.as_deref())?;
                let view = query::calendar_view(&self.collection.tasks, range);
                if view.is_empty() {
                    println!("No tasks with due dates.");
                }
                for (due, tasks) in view {
                    println!("=== {due} ===");
                    self.print_tasks(&tasks);
                    println!();
                }
                Ok(())
            }
            Commands::Report { from, to, output } => {
                let range = parse_range(from.as_deref(), to.as_deref())?;
                let report =
                    report::build_report(&self.collection, self.log.entries(), today(), range);
                let path = report::export_report(self.store.base_dir(), &report, output)?;
                println!("Report exported: {}", path.display());
                Ok(())
            }
            Commands::Backup => {
                let path = self.store.backups().snapshot(&self.collection, today())?;
                println!("Backup written: {}", path.display());
                Ok(())
            }
        }
    }

    fn run_category(&mut self, command: CategoryCommands) -> Result<()> {
        match command {
            CategoryCommands::List => {
                for category in &self.collection.categories {
                    let count = self
                        .collection
                        .all_tasks()
                        .iter()
                        .filter(|t| t.category_id == Some(category.id))
                        .count();
                    println!("{:<16} {} task(s)  {}", category.name, count, category.description);
                }
                Ok(())
            }
            CategoryCommands::Add {
                name,
                description,
                color,
            } => {
                lifecycle::create_category(
                    &mut self.collection,
                    &mut self.log,
                    &name,
                    &description,
                    &color,
                )?;
                self.save()?;
                println!("Added category '{name}'.");
                Ok(())
            }
            CategoryCommands::Rename { name, new_name } => {
                let id = self.require_category(&name)?;
                lifecycle::rename_category(&mut self.collection, &mut self.log, id, &new_name)?;
                self.save()?;
                println!("Renamed '{name}' to '{new_name}'.");
                Ok(())
            }
            CategoryCommands::Delete { name } => {
                let id = self.require_category(&name)?;
                let moved = lifecycle::delete_category(&mut self.collection, &mut self.log, id)?;
                self.save()?;
                println!("Deleted '{name}'; {moved} task(s) moved to {UNCATEGORIZED}.");
                Ok(())
            }
        }
    }

    /// Resolve a category name to a task reference: `None` for Uncategorized.
    fn resolve_category_id(&self, name: &str) -> Result<Option<Uuid>> {
        if name.trim().is_empty() || name.eq_ignore_ascii_case(UNCATEGORIZED) {
            return Ok(None);
        }
        Ok(Some(self.require_category(name)?))
    }

    fn resolve_category_filter(&self, name: &str) -> Result<CategoryFilter> {
        match self.resolve_category_id(name)? {
            Some(id) => Ok(CategoryFilter::Id(id)),
            None => Ok(CategoryFilter::Uncategorized),
        }
    }

    fn require_category(&self, name: &str) -> Result<Uuid> {
        self.collection
            .category_by_name(name)
            .map(|c| c.id)
            .ok_or_else(|| anyhow!("unknown category '{name}'"))
    }

    /// Accept a full task id or a unique prefix of its hex form.
    fn resolve_task_id(&self, input: &str) -> Result<Uuid> {
        if let Ok(id) = Uuid::parse_str(input) {
            if self.collection.find_task(id).is_some() {
                return Ok(id);
            }
            bail!("no task with id {input}");
        }

        let needle = input.to_lowercase();
        let matches: Vec<Uuid> = self
            .collection
            .all_tasks()
            .into_iter()
            .filter(|t| t.id.simple().to_string().starts_with(&needle))
            .map(|t| t.id)
            .collect();
        match matches.as_slice() {
            [id] => Ok(*id),
            [] => bail!("no task matching id '{input}'"),
            _ => bail!("id prefix '{input}' is ambiguous"),
        }
    }

    fn print_tasks(&self, tasks: &[&Task]) {
        if tasks.is_empty() {
            println!("No tasks.");
            return;
        }

        let now = today();
        for task in tasks {
            self.print_task_line(task, now, 0);
        }
    }

    fn print_task_line(&self, task: &Task, now: NaiveDate, indent: usize) {
        let due = task
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let tags = if task.tags.is_empty() {
            String::new()
        } else {
            format!("  #{}", task.tags.iter().cloned().collect::<Vec<_>>().join(" #"))
        };
        println!(
            "{}{} {} {:<32} {:<12} {:<6} {}{}",
            "  ".repeat(indent),
            short_id(task.id),
            status_icon(task.effective_status(now)),
            clip(&task.title, 32),
            clip(self.collection.category_name(task.category_id), 12),
            task.priority.as_str(),
            due,
            tags,
        );
        for subtask in &task.subtasks {
            self.print_task_line(subtask, now, indent + 1);
        }
    }
}

fn resolve_vault(vault: Option<PathBuf>) -> Result<PathBuf> {
    match vault {
        Some(path) => Ok(path),
        None => persistence::get_vault_dir(),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid date '{input}', expected YYYY-MM-DD"))
}

fn parse_range(from: Option<&str>, to: Option<&str>) -> Result<Option<(NaiveDate, NaiveDate)>> {
    match (from, to) {
        (Some(from), Some(to)) => Ok(Some((parse_date(from)?, parse_date(to)?))),
        (None, None) => Ok(None),
        _ => bail!("--from and --to must be given together"),
    }
}

fn parse_status(input: &str) -> Result<Status> {
    Status::from_input(input)
        .ok_or_else(|| anyhow!("invalid status '{input}', expected Pending, In Progress, Done, Archived or Overdue"))
}

fn parse_priority(input: &str) -> Result<Priority> {
    Priority::from_input(input)
        .ok_or_else(|| anyhow!("invalid priority '{input}', expected Low, Medium or High"))
}

fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Pending => "[ ]",
        Status::InProgress => "[~]",
        Status::Done => "[x]",
        Status::Archived => "[-]",
        Status::Overdue => "[!]",
    }
}

fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let clipped: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{clipped}…")
    }
}
