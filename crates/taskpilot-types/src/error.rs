use thiserror::Error;

use crate::task::Task;

/// Errors from repository operations (used by trait definitions in taskpilot-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// A proposed task the store refused to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub text: String,
    pub reason: String,
}

/// Failure of a batch creation.
///
/// Items are persisted one by one, so a batch can fail part-way; tasks
/// created before the failure stay in the store and are reported here.
#[derive(Debug, Error)]
pub enum BatchCreateError {
    #[error("created {} of {} tasks", created.len(), created.len() + failed.len())]
    Partial {
        created: Vec<Task>,
        failed: Vec<FailedItem>,
    },

    #[error("batch creation failed: {reason}")]
    Failed { reason: String },
}

/// Failure to get any reply from the remote assistant.
///
/// Distinct from an error-shaped reply: this means nothing usable came back.
#[derive(Debug, Error)]
pub enum AiCallError {
    #[error("{0}")]
    Transport(String),

    #[error("no API key configured")]
    MissingCredential,

    #[error("invalid assistant configuration: {0}")]
    Configuration(String),
}

/// Errors surfaced by the chat session state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a request is already in flight")]
    Busy,

    #[error("message is empty")]
    EmptyMessage,
}
