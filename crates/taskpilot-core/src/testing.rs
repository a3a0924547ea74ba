//! In-memory fakes of the repository and model-client ports for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use uuid::Uuid;

use taskpilot_types::error::{AiCallError, BatchCreateError, FailedItem, RepositoryError};
use taskpilot_types::llm::{Dialect, LlmError, ModelRequest, ModelResponse, ToolInvocation, WireFormat};
use taskpilot_types::settings::AssistantSettings;
use taskpilot_types::task::{
    NewTask, ProposedTask, Task, TaskFilter, TaskStatistics, TaskUpdate,
};

use crate::llm::ModelConnector;
use crate::llm::box_client::BoxModelClient;
use crate::llm::client::ModelClient;
use crate::repository::settings::SettingsRepository;
use crate::repository::task::TaskRepository;

pub(crate) fn text_response(content: &str) -> Result<ModelResponse, LlmError> {
    Ok(ModelResponse {
        content: Some(content.to_string()),
        calls: Vec::new(),
    })
}

pub(crate) fn call_response(
    dialect: Dialect,
    name: &str,
    arguments: &str,
    content: Option<&str>,
) -> Result<ModelResponse, LlmError> {
    Ok(ModelResponse {
        content: content.map(str::to_string),
        calls: vec![ToolInvocation {
            name: name.to_string(),
            arguments: arguments.to_string(),
            dialect,
        }],
    })
}

pub(crate) fn remote_settings() -> AssistantSettings {
    AssistantSettings {
        api_key: Some("sk-test-key-123456".to_string()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Task store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct InMemoryTaskRepository {
    tasks: Mutex<Vec<Task>>,
    /// `batch_create` fails every item after this many were created.
    fail_batch_after: Option<usize>,
    fail_reads: bool,
}

impl InMemoryTaskRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Default::default()
        }
    }

    pub(crate) fn failing_batch_after(count: usize) -> Self {
        Self {
            fail_batch_after: Some(count),
            ..Default::default()
        }
    }

    pub(crate) fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Default::default()
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }
}

impl TaskRepository for InMemoryTaskRepository {
    async fn list(&self, filter: Option<TaskFilter>) -> Result<Vec<Task>, RepositoryError> {
        if self.fail_reads {
            return Err(RepositoryError::Connection);
        }
        let filter = filter.unwrap_or_default();
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tasks.lock().unwrap().iter().find(|t| t.id == *id).cloned())
    }

    async fn create(&self, task: &NewTask) -> Result<Task, RepositoryError> {
        let task = Task::from_new(task.clone());
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn batch_create(&self, tasks: &[ProposedTask]) -> Result<Vec<Task>, BatchCreateError> {
        let mut created = Vec::new();
        let mut failed = Vec::new();
        for proposed in tasks {
            if self.fail_batch_after.is_some_and(|limit| created.len() >= limit) {
                failed.push(FailedItem {
                    text: proposed.text.clone(),
                    reason: "disk full".to_string(),
                });
                continue;
            }
            let task = Task::from_new(proposed.to_new_task());
            self.tasks.lock().unwrap().push(task.clone());
            created.push(task);
        }
        match (created.is_empty(), failed.is_empty()) {
            (_, true) => Ok(created),
            (true, false) => Err(BatchCreateError::Failed {
                reason: failed[0].reason.clone(),
            }),
            (false, false) => Err(BatchCreateError::Partial { created, failed }),
        }
    }

    async fn update(&self, id: &Uuid, update: TaskUpdate) -> Result<Task, RepositoryError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        task.apply_update(update);
        Ok(task.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id != *id);
        if tasks.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_completed(&self) -> Result<u64, RepositoryError> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| !t.completed);
        Ok((before - tasks.len()) as u64)
    }

    async fn statistics(&self) -> Result<TaskStatistics, RepositoryError> {
        Ok(TaskStatistics::from_tasks(&self.tasks.lock().unwrap()))
    }
}

// ---------------------------------------------------------------------------
// Settings store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct InMemorySettingsRepository {
    settings: Mutex<AssistantSettings>,
}

impl InMemorySettingsRepository {
    pub(crate) fn new(settings: AssistantSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsRepository for InMemorySettingsRepository {
    async fn get(&self) -> Result<AssistantSettings, RepositoryError> {
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn save(&self, settings: &AssistantSettings) -> Result<(), RepositoryError> {
        *self.settings.lock().unwrap() = settings.clone();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Model client
// ---------------------------------------------------------------------------

type Script = Arc<Mutex<VecDeque<Result<ModelResponse, LlmError>>>>;

/// Replays queued responses in order and records every request.
///
/// Clones share the queue and the request log.
#[derive(Clone)]
pub(crate) struct ScriptedClient {
    script: Script,
    requests: Arc<Mutex<Vec<ModelRequest>>>,
    supported: Vec<Dialect>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedClient {
    pub(crate) fn new(responses: Vec<Result<ModelResponse, LlmError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(responses.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            supported: vec![Dialect::Tools, Dialect::Functions, Dialect::Text],
            gate: None,
        }
    }

    pub(crate) fn with_supported(mut self, dialects: &[Dialect]) -> Self {
        self.supported = dialects.to_vec();
        self
    }

    /// Hold every reply until the gate is notified.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn requests(&self) -> Arc<Mutex<Vec<ModelRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl ModelClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    fn wire_format(&self) -> WireFormat {
        WireFormat::OpenAiChat
    }

    fn supports(&self, dialect: Dialect) -> bool {
        self.supported.contains(&dialect)
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(LlmError::Transport("script exhausted".to_string())))
    }
}

/// Hands out clones of one scripted client and counts connections.
pub(crate) struct ScriptedConnector {
    client: ScriptedClient,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    pub(crate) fn new(client: ScriptedClient) -> Self {
        Self {
            client,
            connects: AtomicUsize::new(0),
        }
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl ModelConnector for ScriptedConnector {
    fn connect(&self, settings: &AssistantSettings) -> Result<BoxModelClient, AiCallError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if settings.credential().is_none() {
            return Err(AiCallError::MissingCredential);
        }
        Ok(BoxModelClient::new(self.client.clone()))
    }
}
