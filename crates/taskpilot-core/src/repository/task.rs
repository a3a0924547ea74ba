//! Task repository trait definition.

use taskpilot_types::error::{BatchCreateError, RepositoryError};
use taskpilot_types::task::{NewTask, ProposedTask, Task, TaskFilter, TaskStatistics, TaskUpdate};
use uuid::Uuid;

/// Repository trait for task persistence.
///
/// Implementations live in taskpilot-infra (e.g., SqliteTaskRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait TaskRepository: Send + Sync {
    /// List tasks, unfinished first, newest first within each group.
    fn list(
        &self,
        filter: Option<TaskFilter>,
    ) -> impl std::future::Future<Output = Result<Vec<Task>, RepositoryError>> + Send;

    /// Get a task by its unique ID.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Task>, RepositoryError>> + Send;

    /// Create a single task. Returns the stored record.
    fn create(
        &self,
        task: &NewTask,
    ) -> impl std::future::Future<Output = Result<Task, RepositoryError>> + Send;

    /// Persist a batch of proposed tasks as one logical operation.
    ///
    /// Every created task is `pending` and not completed. Items are durable
    /// individually: when some fail, the ones already created stay and are
    /// returned inside [`BatchCreateError::Partial`].
    fn batch_create(
        &self,
        tasks: &[ProposedTask],
    ) -> impl std::future::Future<Output = Result<Vec<Task>, BatchCreateError>> + Send;

    /// Apply a partial update. Returns the updated task.
    fn update(
        &self,
        id: &Uuid,
        update: TaskUpdate,
    ) -> impl std::future::Future<Output = Result<Task, RepositoryError>> + Send;

    /// Permanently delete a task by ID.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete every completed task. Returns how many were removed.
    fn delete_completed(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Aggregate counts by status.
    fn statistics(
        &self,
    ) -> impl std::future::Future<Output = Result<TaskStatistics, RepositoryError>> + Send;
}
