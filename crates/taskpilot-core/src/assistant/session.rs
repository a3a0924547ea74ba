//! Chat session state machine.
//!
//! `Idle -> AwaitingReply -> Idle`, one request in flight at a time. Every
//! failure still ends the turn with an assistant message and returns the
//! session to `Idle`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use taskpilot_types::chat::{AssistantReply, ChatMessage};
use taskpilot_types::error::{AiCallError, SessionError};
use taskpilot_types::llm::Dialect;
use taskpilot_types::settings::{AssistantMode, AssistantSettings};
use taskpilot_types::task::Task;

use super::materializer::ActionMaterializer;
use super::mode::select_mode;
use super::parser::classify;
use super::prompt::DEFAULT_MAX_CONTEXT_TASKS;
use super::remote::{RemoteAdapter, RemoteOutcome};
use super::simulator::LocalSimulator;
use crate::llm::ModelConnector;
use crate::repository::settings::SettingsRepository;
use crate::repository::task::TaskRepository;

const WARNING_PREFIX: &str = "⚠️ ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply,
}

/// What one accepted submission produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub mode: AssistantMode,
    pub reply: AssistantReply,
    pub dialect: Option<Dialect>,
    /// Tasks persisted by this turn.
    pub created: Vec<Task>,
    /// Messages appended to the transcript by this turn, in order.
    pub messages: Vec<ChatMessage>,
}

pub struct ChatSession<T, S, C>
where
    T: TaskRepository,
    S: SettingsRepository,
    C: ModelConnector,
{
    tasks: Arc<T>,
    settings: Arc<S>,
    connector: C,
    simulator: LocalSimulator,
    max_context_tasks: usize,
    state: Mutex<SessionState>,
    transcript: Mutex<Vec<ChatMessage>>,
}

/// Resets the session to `Idle` when the turn ends, however it ends.
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *lock(self.state) = SessionState::Idle;
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T, S, C> ChatSession<T, S, C>
where
    T: TaskRepository,
    S: SettingsRepository,
    C: ModelConnector,
{
    pub fn new(tasks: Arc<T>, settings: Arc<S>, connector: C) -> Self {
        Self {
            tasks,
            settings,
            connector,
            simulator: LocalSimulator::default(),
            max_context_tasks: DEFAULT_MAX_CONTEXT_TASKS,
            state: Mutex::new(SessionState::Idle),
            transcript: Mutex::new(Vec::new()),
        }
    }

    pub fn with_simulator(mut self, simulator: LocalSimulator) -> Self {
        self.simulator = simulator;
        self
    }

    pub fn with_max_context_tasks(mut self, max_context_tasks: usize) -> Self {
        self.max_context_tasks = max_context_tasks;
        self
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    pub fn is_busy(&self) -> bool {
        self.state() == SessionState::AwaitingReply
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        lock(&self.transcript).clone()
    }

    pub fn clear_transcript(&self) {
        lock(&self.transcript).clear();
    }

    fn begin(&self) -> Result<InFlight<'_>, SessionError> {
        let mut state = lock(&self.state);
        if *state == SessionState::AwaitingReply {
            return Err(SessionError::Busy);
        }
        *state = SessionState::AwaitingReply;
        Ok(InFlight { state: &self.state })
    }

    fn append(&self, message: ChatMessage, turn: &mut Vec<ChatMessage>) {
        lock(&self.transcript).push(message.clone());
        turn.push(message);
    }

    /// Submit one user message and run the turn to completion.
    ///
    /// Rejected with [`SessionError::Busy`] while another turn is in flight
    /// and with [`SessionError::EmptyMessage`] for blank input; in both
    /// cases nothing is appended.
    pub async fn submit(&self, text: &str) -> Result<TurnOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let _in_flight = self.begin()?;

        let mut messages = Vec::new();
        self.append(ChatMessage::user(text), &mut messages);

        let (mode, outcome) = self.respond(text).await;
        let RemoteOutcome {
            reply,
            dialect,
            warnings,
            ..
        } = outcome;

        self.append(ChatMessage::assistant(reply.text()), &mut messages);
        for warning in &warnings {
            self.append(
                ChatMessage::system(format!("{WARNING_PREFIX}{warning}")),
                &mut messages,
            );
        }

        let mut created = Vec::new();
        if let Some(proposed) = reply.proposed_tasks() {
            let result = ActionMaterializer::new(self.tasks.as_ref())
                .materialize(proposed)
                .await;
            self.append(result.transcript_message(proposed.len()), &mut messages);
            created = result.created().to_vec();
        }

        info!(
            %mode,
            kind = %reply.kind(),
            created = created.len(),
            "Turn complete"
        );

        Ok(TurnOutcome {
            mode,
            reply,
            dialect,
            created,
            messages,
        })
    }

    /// Produce the classified reply for one message. Never fails.
    async fn respond(&self, text: &str) -> (AssistantMode, RemoteOutcome) {
        let settings = match self.settings.get().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Failed to load settings");
                return (
                    AssistantMode::Local,
                    RemoteOutcome::from_reply(AssistantReply::error(format!(
                        "无法读取设置: {e}。请检查数据目录是否可写。"
                    ))),
                );
            }
        };
        let mode = select_mode(&settings);

        let snapshot = match self.tasks.list(None).await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "Failed to load task snapshot");
                return (
                    mode,
                    RemoteOutcome::from_reply(AssistantReply::error(format!(
                        "无法读取任务列表: {e}。请稍后重试。"
                    ))),
                );
            }
        };

        let mut outcome = match mode {
            AssistantMode::Local => {
                RemoteOutcome::from_reply(self.simulator.respond(text, &snapshot).await)
            }
            AssistantMode::Remote => self.ask_remote(text, &snapshot, &settings).await,
        };
        outcome.reply = classify(outcome.reply);
        (mode, outcome)
    }

    async fn ask_remote(
        &self,
        text: &str,
        snapshot: &[Task],
        settings: &AssistantSettings,
    ) -> RemoteOutcome {
        let client = match self.connector.connect(settings) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Failed to build model client");
                return RemoteOutcome::from_reply(AssistantReply::error(call_error_text(&e)));
            }
        };

        RemoteAdapter::new(client, self.max_context_tasks)
            .ask(text, snapshot, settings)
            .await
            .unwrap_or_else(|e| RemoteOutcome::from_reply(AssistantReply::error(call_error_text(&e))))
    }
}

/// User-facing text for a call that produced no reply, with one hint.
pub fn call_error_text(error: &AiCallError) -> String {
    match error {
        AiCallError::MissingCredential => {
            "请先在「设置」中配置 API Key，再使用 AI 功能。".to_string()
        }
        AiCallError::Transport(message) => {
            format!("AI 请求失败: {message}。请检查设置中的 API Key 和网络。")
        }
        AiCallError::Configuration(message) => {
            format!("AI 配置有误: {message}。请检查设置中的接口地址和模型名称。")
        }
    }
}
