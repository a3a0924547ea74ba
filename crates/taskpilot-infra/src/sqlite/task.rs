//! SQLite task repository implementation.
//!
//! Implements `TaskRepository` from `taskpilot-core` using sqlx with split
//! read/write pools. Tags are a JSON text column; priority is stored as its
//! integer rank so it sorts naturally.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, warn};
use uuid::Uuid;

use taskpilot_core::repository::task::TaskRepository;
use taskpilot_types::error::{BatchCreateError, FailedItem, RepositoryError};
use taskpilot_types::task::{
    NewTask, Priority, ProposedTask, Task, TaskFilter, TaskStatistics, TaskStatus, TaskUpdate,
};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `TaskRepository`.
pub struct SqliteTaskRepository {
    pool: DatabasePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn insert(&self, task: &Task) -> Result<(), RepositoryError> {
        let tags_json =
            serde_json::to_string(&task.tags).map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO tasks (id, text, completed, status, priority, due_date, tags, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.to_string())
        .bind(&task.text)
        .bind(task.completed)
        .bind(task.status.to_string())
        .bind(task.priority.as_i64())
        .bind(&task.due_date)
        .bind(&tags_json)
        .bind(format_datetime(&task.created_at))
        .bind(format_datetime(&task.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}

/// Internal row type for mapping SQLite rows to domain Task.
struct TaskRow {
    id: String,
    text: String,
    completed: bool,
    status: String,
    priority: i64,
    due_date: Option<String>,
    tags: String,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            text: row.try_get("text")?,
            completed: row.try_get("completed")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            due_date: row.try_get("due_date")?,
            tags: row.try_get("tags")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_task(self) -> Result<Task, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid task id: {e}")))?;

        let status: TaskStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| RepositoryError::Query(format!("invalid tags JSON: {e}")))?;

        Ok(Task {
            id,
            text: self.text,
            completed: self.completed,
            status,
            priority: Priority::from_i64(self.priority),
            due_date: self.due_date,
            tags,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn rows_to_tasks(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Task>, RepositoryError> {
    let mut tasks = Vec::with_capacity(rows.len());
    for row in rows {
        let task_row = TaskRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        tasks.push(task_row.into_task()?);
    }
    Ok(tasks)
}

impl TaskRepository for SqliteTaskRepository {
    async fn list(&self, filter: Option<TaskFilter>) -> Result<Vec<Task>, RepositoryError> {
        let filter = filter.unwrap_or_default();
        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT * FROM tasks WHERE 1 = 1");

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.to_string());
        }
        if let Some(completed) = filter.completed {
            query.push(" AND completed = ").push_bind(completed);
        }
        if let Some(priority) = filter.priority {
            query.push(" AND priority = ").push_bind(priority.as_i64());
        }
        if let Some(tag) = &filter.tag {
            query
                .push(" AND EXISTS (SELECT 1 FROM json_each(tasks.tags) WHERE json_each.value = ")
                .push_bind(tag.clone())
                .push(")");
        }
        query.push(" ORDER BY completed ASC, created_at DESC");

        let rows = query
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        // Text search runs here rather than as SQL LIKE: LIKE folds ASCII
        // case only and treats `%`/`_` in user input as wildcards.
        let mut tasks = rows_to_tasks(&rows)?;
        tasks.retain(|task| filter.matches_search(&task.text));
        Ok(tasks)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let task_row =
                    TaskRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(task_row.into_task()?))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, task: &NewTask) -> Result<Task, RepositoryError> {
        if task.text.trim().is_empty() {
            return Err(RepositoryError::Query("task text must not be empty".to_string()));
        }
        let task = Task::from_new(task.clone());
        self.insert(&task).await?;
        debug!(task_id = %task.id, "Task created");
        Ok(task)
    }

    async fn batch_create(&self, tasks: &[ProposedTask]) -> Result<Vec<Task>, BatchCreateError> {
        let mut created = Vec::with_capacity(tasks.len());
        let mut failed = Vec::new();

        for proposed in tasks {
            if proposed.text.trim().is_empty() {
                failed.push(FailedItem {
                    text: proposed.text.clone(),
                    reason: "task text must not be empty".to_string(),
                });
                continue;
            }
            let task = Task::from_new(proposed.to_new_task());
            match self.insert(&task).await {
                Ok(()) => created.push(task),
                Err(e) => {
                    warn!(error = %e, "Failed to insert proposed task");
                    failed.push(FailedItem {
                        text: proposed.text.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if failed.is_empty() {
            Ok(created)
        } else if created.is_empty() {
            Err(BatchCreateError::Failed {
                reason: failed[0].reason.clone(),
            })
        } else {
            Err(BatchCreateError::Partial { created, failed })
        }
    }

    async fn update(&self, id: &Uuid, update: TaskUpdate) -> Result<Task, RepositoryError> {
        if update.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(RepositoryError::Query("task text must not be empty".to_string()));
        }
        let mut task = self.get(id).await?.ok_or(RepositoryError::NotFound)?;
        task.apply_update(update);

        let tags_json =
            serde_json::to_string(&task.tags).map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE tasks SET text = ?, completed = ?, status = ?, priority = ?, due_date = ?, tags = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&task.text)
        .bind(task.completed)
        .bind(task.status.to_string())
        .bind(task.priority.as_i64())
        .bind(&task.due_date)
        .bind(&tags_json)
        .bind(format_datetime(&task.updated_at))
        .bind(task.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(task)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_completed(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM tasks WHERE completed = 1")
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn statistics(&self) -> Result<TaskStatistics, RepositoryError> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS count FROM tasks GROUP BY status")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut stats = TaskStatistics::default();
        for row in &rows {
            let status: String = row
                .try_get("status")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let count: i64 = row
                .try_get("count")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let count = count as u32;
            match status.parse::<TaskStatus>().map_err(RepositoryError::Query)? {
                TaskStatus::Pending => stats.pending += count,
                TaskStatus::InProgress => stats.in_progress += count,
                TaskStatus::Completed => stats.completed += count,
                TaskStatus::Cancelled => stats.cancelled += count,
            }
            stats.total += count;
        }

        Ok(stats)
    }
}
