//! Task CLI commands: list, add, done, update, delete, clear-completed, stats.

use anyhow::{Result, anyhow, bail};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use uuid::Uuid;

use taskpilot_core::repository::task::TaskRepository;
use taskpilot_types::task::{
    NewTask, Priority, Task, TaskFilter, TaskStatistics, TaskStatus, TaskUpdate,
};

use crate::state::AppState;

#[derive(Subcommand)]
pub enum TaskCommand {
    /// List tasks, unfinished first.
    #[command(alias = "ls")]
    List {
        /// Only tasks with this status (pending, in_progress, completed, cancelled).
        #[arg(long)]
        status: Option<String>,

        /// Only tasks with this priority (low, medium, high).
        #[arg(long)]
        priority: Option<String>,

        /// Case-insensitive text search.
        #[arg(long, short)]
        search: Option<String>,

        /// Only tasks carrying this tag.
        #[arg(long)]
        tag: Option<String>,
    },

    /// Add a task.
    Add {
        /// Task text.
        text: String,

        #[arg(long, short)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        due: Option<String>,

        /// Tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Mark a task completed.
    Done {
        /// Task ID or unique ID prefix.
        id: String,
    },

    /// Edit a task.
    Update {
        /// Task ID or unique ID prefix.
        id: String,

        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long, short)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        due: Option<String>,

        /// Replace tags (repeatable).
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },

    /// Delete a task.
    #[command(alias = "rm")]
    Delete {
        /// Task ID or unique ID prefix.
        id: String,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Delete every completed task.
    #[command(name = "clear-completed")]
    ClearCompleted {
        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Show task counts by status.
    Stats,
}

pub async fn handle_task_command(cmd: TaskCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        TaskCommand::List {
            status,
            priority,
            search,
            tag,
        } => {
            let filter = TaskFilter {
                status: status.as_deref().map(parse_status).transpose()?,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                search,
                tag,
                ..Default::default()
            };
            list_tasks(state, filter, json).await
        }
        TaskCommand::Add {
            text,
            priority,
            due,
            tags,
        } => {
            let task = NewTask {
                text,
                priority: priority.as_deref().map(parse_priority).transpose()?.unwrap_or_default(),
                due_date: due.as_deref().map(parse_due_date).transpose()?,
                tags,
            };
            add_task(state, task, json).await
        }
        TaskCommand::Done { id } => {
            let update = TaskUpdate {
                completed: Some(true),
                ..Default::default()
            };
            update_task(state, &id, update, json).await
        }
        TaskCommand::Update {
            id,
            text,
            status,
            priority,
            due,
            tags,
        } => {
            let update = TaskUpdate {
                text,
                status: status.as_deref().map(parse_status).transpose()?,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                due_date: due.as_deref().map(parse_due_date).transpose()?,
                tags,
                ..Default::default()
            };
            update_task(state, &id, update, json).await
        }
        TaskCommand::Delete { id, force } => delete_task(state, &id, force, json).await,
        TaskCommand::ClearCompleted { force } => clear_completed(state, force, json).await,
        TaskCommand::Stats => {
            let stats = state.task_repo.statistics().await?;
            print_statistics(&stats, json)
        }
    }
}

async fn list_tasks(state: &AppState, filter: TaskFilter, json: bool) -> Result<()> {
    let tasks = state.task_repo.list(Some(filter)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!();
        println!(
            "  {} No tasks found. Add one with: {}",
            style("i").blue().bold(),
            style("tpilot task add \"...\"").yellow()
        );
        println!();
        return Ok(());
    }

    print_task_table(&tasks);
    Ok(())
}

async fn add_task(state: &AppState, task: NewTask, json: bool) -> Result<()> {
    let task = state.task_repo.create(&task).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Added {} {}",
        style("✓").green().bold(),
        style(short_id(&task.id)).dim(),
        task.text
    );
    println!();
    Ok(())
}

async fn update_task(state: &AppState, id: &str, update: TaskUpdate, json: bool) -> Result<()> {
    let id = resolve_id(state, id).await?;
    let task = state.task_repo.update(&id, update).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} {} [{}]",
        style("✓").green().bold(),
        style(short_id(&task.id)).dim(),
        task.text,
        format_status(task.status)
    );
    println!();
    Ok(())
}

async fn delete_task(state: &AppState, id: &str, force: bool, json: bool) -> Result<()> {
    let id = resolve_id(state, id).await?;
    let task = state
        .task_repo
        .get(&id)
        .await?
        .ok_or_else(|| anyhow!("task {id} not found"))?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete \"{}\"?", task.text))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.task_repo.delete(&id).await?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("  {} Deleted {}", style("✓").green().bold(), task.text);
    }
    Ok(())
}

async fn clear_completed(state: &AppState, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt("Delete all completed tasks?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let removed = state.task_repo.delete_completed().await?;

    if json {
        println!("{}", serde_json::json!({ "deleted": removed }));
    } else {
        println!("  {} Removed {removed} completed task(s)", style("✓").green().bold());
    }
    Ok(())
}

/// Print tasks in a table. Shared with the chat `/tasks` command.
pub fn print_task_table(tasks: &[Task]) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Priority").fg(Color::White),
        Cell::new("Task").fg(Color::White),
        Cell::new("Due").fg(Color::White),
        Cell::new("Tags").fg(Color::White),
    ]);

    for task in tasks {
        let status_cell = match task.status {
            TaskStatus::Pending => Cell::new("○ pending").fg(Color::Yellow),
            TaskStatus::InProgress => Cell::new("◐ in progress").fg(Color::Cyan),
            TaskStatus::Completed => Cell::new("● completed").fg(Color::Green),
            TaskStatus::Cancelled => Cell::new("◌ cancelled").fg(Color::DarkGrey),
        };
        let priority_cell = match task.priority {
            Priority::High => Cell::new("high").fg(Color::Red),
            Priority::Medium => Cell::new("medium"),
            Priority::Low => Cell::new("low").fg(Color::DarkGrey),
        };

        table.add_row(vec![
            Cell::new(short_id(&task.id)).fg(Color::DarkGrey),
            status_cell,
            priority_cell,
            Cell::new(&task.text),
            Cell::new(task.due_date.as_deref().unwrap_or("-")),
            Cell::new(task.tags.join(", ")),
        ]);
    }

    println!();
    println!("{table}");
    println!();
}

/// Print statistics. Shared with the chat `/stats` command.
pub fn print_statistics(stats: &TaskStatistics, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!();
    println!("  {}  {}", style("Total:").bold(), stats.total);
    println!("  {}  {}", style("Pending:").bold(), stats.pending);
    println!("  {}  {}", style("In progress:").bold(), stats.in_progress);
    println!(
        "  {}  {}",
        style("Completed:").bold(),
        style(stats.completed).green()
    );
    println!(
        "  {}  {}",
        style("Cancelled:").bold(),
        style(stats.cancelled).dim()
    );
    println!();
    Ok(())
}

fn format_status(status: TaskStatus) -> String {
    match status {
        TaskStatus::Completed => format!("{}", style(status).green()),
        TaskStatus::Cancelled => format!("{}", style(status).dim()),
        _ => status.to_string(),
    }
}

fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

async fn resolve_id(state: &AppState, input: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(input) {
        return Ok(id);
    }
    let tasks = state.task_repo.list(None).await?;
    match_id_prefix(&tasks, input)
}

/// Resolve an ID prefix (hyphens optional) to exactly one task.
fn match_id_prefix(tasks: &[Task], prefix: &str) -> Result<Uuid> {
    let needle = prefix.trim().replace('-', "").to_lowercase();
    if needle.is_empty() {
        bail!("task ID is empty");
    }

    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.id.simple().to_string().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [task] => Ok(task.id),
        [] => bail!("no task matches ID '{prefix}'"),
        many => bail!("ID '{prefix}' matches {} tasks; use more characters", many.len()),
    }
}

fn parse_status(value: &str) -> Result<TaskStatus> {
    value.parse().map_err(|e: String| anyhow!(e))
}

fn parse_priority(value: &str) -> Result<Priority> {
    value.parse().map_err(|e: String| anyhow!(e))
}

fn parse_due_date(value: &str) -> Result<String> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| anyhow!("invalid due date '{value}', expected YYYY-MM-DD"))
}
