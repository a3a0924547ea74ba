//! Persist proposed tasks through one batch call to the task store.

use tracing::{info, warn};

use taskpilot_types::chat::ChatMessage;
use taskpilot_types::error::{BatchCreateError, FailedItem};
use taskpilot_types::task::{ProposedTask, Task};

use crate::repository::task::TaskRepository;

/// Result of materializing one generation reply.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterializeOutcome {
    Created(Vec<Task>),
    /// Some tasks were created and stay in the store.
    Partial {
        created: Vec<Task>,
        failed: Vec<FailedItem>,
    },
    Failed {
        reason: String,
    },
}

impl MaterializeOutcome {
    /// Tasks that exist in the store after the batch.
    pub fn created(&self) -> &[Task] {
        match self {
            MaterializeOutcome::Created(created) | MaterializeOutcome::Partial { created, .. } => {
                created
            }
            MaterializeOutcome::Failed { .. } => &[],
        }
    }

    /// The single system message that reports this outcome.
    pub fn transcript_message(&self, total: usize) -> ChatMessage {
        let content = match self {
            MaterializeOutcome::Created(created) => {
                format!("✓ 已自动添加 {} 个任务到列表", created.len())
            }
            MaterializeOutcome::Partial { created, failed } => {
                let reason = failed
                    .first()
                    .map(|item| item.reason.as_str())
                    .unwrap_or("未知错误");
                format!(
                    "⚠️ 仅添加了 {}/{total} 个任务，{} 个未能保存（{reason}）。已添加的任务会保留在列表中。",
                    created.len(),
                    failed.len()
                )
            }
            MaterializeOutcome::Failed { reason } => {
                format!("⚠️ 任务添加失败：{reason}。请稍后重试。")
            }
        };
        ChatMessage::system(content)
    }
}

pub struct ActionMaterializer<'a, T: TaskRepository> {
    tasks: &'a T,
}

impl<'a, T: TaskRepository> ActionMaterializer<'a, T> {
    pub fn new(tasks: &'a T) -> Self {
        Self { tasks }
    }

    /// Create every proposed task in one batch. Never rolls back.
    #[tracing::instrument(name = "materialize", skip_all, fields(count = proposed.len()))]
    pub async fn materialize(&self, proposed: &[ProposedTask]) -> MaterializeOutcome {
        match self.tasks.batch_create(proposed).await {
            Ok(created) => {
                info!(created = created.len(), "Proposed tasks created");
                MaterializeOutcome::Created(created)
            }
            Err(BatchCreateError::Partial { created, failed }) => {
                warn!(
                    created = created.len(),
                    failed = failed.len(),
                    "Batch creation partially failed"
                );
                MaterializeOutcome::Partial { created, failed }
            }
            Err(BatchCreateError::Failed { reason }) => {
                warn!(reason = %reason, "Batch creation failed");
                MaterializeOutcome::Failed { reason }
            }
        }
    }
}
