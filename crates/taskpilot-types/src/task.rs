//! Task domain types.
//!
//! A `Task` is owned by the task store. The assistant only ever proposes
//! new tasks (`ProposedTask`); it never edits an existing task's identity.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Whether the task still needs work (pending or in progress).
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "active" => Ok(TaskStatus::Pending),
            "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "cancelled" | "archived" => Ok(TaskStatus::Cancelled),
            other => Err(format!("invalid task status: '{other}'")),
        }
    }
}

/// Task priority.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    /// Numeric rank stored in the database (0 = low).
    pub fn as_i64(&self) -> i64 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }

    /// Inverse of [`Priority::as_i64`]. Unknown ranks fall back to `Low`.
    pub fn from_i64(value: i64) -> Self {
        match value {
            2 => Priority::High,
            1 => Priority::Medium,
            _ => Priority::Low,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "normal" => Ok(Priority::Medium),
            "high" | "urgent" => Ok(Priority::High),
            other => Err(format!("invalid priority: '{other}'")),
        }
    }
}

/// A persisted task record.
///
/// Invariant: `completed == true` exactly when `status == Completed`.
/// Use [`Task::apply_update`] to mutate fields so the pair stays consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a fresh pending task from creation input.
    pub fn from_new(new: NewTask) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            text: new.text.trim().to_string(),
            completed: false,
            status: TaskStatus::Pending,
            priority: new.priority,
            due_date: new.due_date,
            tags: new.tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, keeping `completed` and `status` in sync.
    ///
    /// An explicit `completed` flag wins over an explicit `status` when the
    /// two disagree.
    pub fn apply_update(&mut self, update: TaskUpdate) {
        if let Some(text) = update.text {
            self.text = text.trim().to_string();
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            self.due_date = Some(due_date);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(status) = update.status {
            self.status = status;
            self.completed = status == TaskStatus::Completed;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
            if completed {
                self.status = TaskStatus::Completed;
            } else if self.status == TaskStatus::Completed {
                self.status = TaskStatus::Pending;
            }
        }
        self.updated_at = Utc::now();
    }
}

/// Input for creating a single task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub text: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Partial update for an existing task. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Filter criteria for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring match on the task text.
    pub search: Option<String>,
    pub tag: Option<String>,
}

impl TaskFilter {
    /// Evaluate the filter against one task in memory.
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.completed.is_some_and(|c| c != task.completed) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        let tag_matches = self
            .tag
            .as_ref()
            .is_none_or(|tag| task.tags.iter().any(|t| t == tag));
        tag_matches && self.matches_search(&task.text)
    }

    /// Unicode case-insensitive substring match. Blank searches match all.
    pub fn matches_search(&self, text: &str) -> bool {
        match self.search.as_deref().map(str::trim) {
            Some(search) if !search.is_empty() => {
                text.to_lowercase().contains(&search.to_lowercase())
            }
            _ => true,
        }
    }
}

/// Aggregate counts over the whole task store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total: u32,
    pub completed: u32,
    pub pending: u32,
    pub in_progress: u32,
    pub cancelled: u32,
}

impl TaskStatistics {
    /// Compute statistics from an in-memory snapshot.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut stats = Self {
            total: tasks.len() as u32,
            ..Default::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

/// A task suggested by the assistant that has not been persisted yet.
///
/// New tasks always start as `pending` and not completed; only the text
/// and an optional priority hint come from the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProposedTask {
    /// Concrete, actionable task text.
    pub text: String,
    /// Optional priority hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl ProposedTask {
    /// Create a proposal from raw text. Returns `None` for blank text.
    pub fn new(text: impl AsRef<str>) -> Option<Self> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            priority: None,
        })
    }

    pub fn with_priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority;
        self
    }

    /// Convert into creation input for the task store.
    pub fn to_new_task(&self) -> NewTask {
        NewTask {
            text: self.text.clone(),
            priority: self.priority.unwrap_or_default(),
            due_date: None,
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_roundtrip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            let parsed: TaskStatus = status.to_string().parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_task_status_aliases() {
        assert_eq!("active".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert_eq!("archived".parse::<TaskStatus>().unwrap(), TaskStatus::Cancelled);
        assert!("later".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_priority_rank_roundtrip() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::from_i64(p.as_i64()), p);
        }
        assert_eq!(Priority::from_i64(42), Priority::Low);
    }

    #[test]
    fn test_search_folds_unicode_case_and_ignores_blank() {
        let filter = |search: &str| TaskFilter {
            search: Some(search.to_string()),
            ..Default::default()
        };
        assert!(filter("ÜBER").matches_search("überweisung"));
        assert!(filter("  plan ").matches_search("Weekly PLAN"));
        assert!(filter("   ").matches_search("anything"));
        assert!(!filter("50%").matches_search("500"));
        assert!(TaskFilter::default().matches_search(""));
    }

    #[test]
    fn test_new_task_starts_pending() {
        let task = Task::from_new(NewTask::new("  write report  "));
        assert_eq!(task.text, "write report");
        assert!(!task.completed);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_completing_sets_status() {
        let mut task = Task::from_new(NewTask::new("a"));
        task.apply_update(TaskUpdate {
            completed: Some(true),
            ..Default::default()
        });
        assert!(task.completed);
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn test_status_completed_sets_flag() {
        let mut task = Task::from_new(NewTask::new("a"));
        task.apply_update(TaskUpdate {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        });
        assert!(task.completed);
    }

    #[test]
    fn test_uncompleting_returns_to_pending() {
        let mut task = Task::from_new(NewTask::new("a"));
        task.apply_update(TaskUpdate {
            completed: Some(true),
            ..Default::default()
        });
        task.apply_update(TaskUpdate {
            completed: Some(false),
            ..Default::default()
        });
        assert!(!task.completed);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_conflicting_update_prefers_completed_flag() {
        let mut task = Task::from_new(NewTask::new("a"));
        task.apply_update(TaskUpdate {
            completed: Some(true),
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        });
        assert!(task.completed);
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn test_statistics_from_tasks() {
        let mut done = Task::from_new(NewTask::new("done"));
        done.apply_update(TaskUpdate {
            completed: Some(true),
            ..Default::default()
        });
        let mut doing = Task::from_new(NewTask::new("doing"));
        doing.apply_update(TaskUpdate {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        });
        let todo = Task::from_new(NewTask::new("todo"));

        let stats = TaskStatistics::from_tasks(&[done, doing, todo]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.pending, 1);
    }

    #[test]
    fn test_proposed_task_rejects_blank() {
        assert!(ProposedTask::new("   ").is_none());
        let p = ProposedTask::new(" a ").unwrap();
        assert_eq!(p.text, "a");
        assert_eq!(p.to_new_task().priority, Priority::Low);
    }

    #[test]
    fn test_filter_matches() {
        let mut task = Task::from_new(NewTask {
            text: "Write Report".to_string(),
            tags: vec!["work".to_string()],
            ..Default::default()
        });
        assert!(TaskFilter::default().matches(&task));

        let search = TaskFilter {
            search: Some("report".to_string()),
            tag: Some("work".to_string()),
            ..Default::default()
        };
        assert!(search.matches(&task));

        task.apply_update(TaskUpdate {
            completed: Some(true),
            ..Default::default()
        });
        let open_only = TaskFilter {
            completed: Some(false),
            ..Default::default()
        };
        assert!(!open_only.matches(&task));
    }
}
