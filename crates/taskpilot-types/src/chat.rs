//! Chat transcript and assistant reply types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::task::ProposedTask;

/// Role of a message in the chat transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single transcript entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique render/dedup key, `{role}-{uuid v7}`.
    pub id: String,
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: format!("{role}-{}", Uuid::now_v7()),
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

/// Discriminant of an [`AssistantReply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Chat,
    Generation,
    Summary,
    Error,
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyKind::Chat => write!(f, "chat"),
            ReplyKind::Generation => write!(f, "generation"),
            ReplyKind::Summary => write!(f, "summary"),
            ReplyKind::Error => write!(f, "error"),
        }
    }
}

/// The normalized, typed answer of either assistant backend.
///
/// Proposed tasks exist only on the `Generation` variant, so "tasks present
/// iff kind is generation" holds by construction. Non-emptiness of that list
/// is enforced by the classifier before a reply leaves the assistant layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantReply {
    Chat {
        text: String,
    },
    Generation {
        text: String,
        proposed_tasks: Vec<ProposedTask>,
    },
    Summary {
        text: String,
    },
    Error {
        text: String,
    },
}

impl AssistantReply {
    pub fn chat(text: impl Into<String>) -> Self {
        AssistantReply::Chat { text: text.into() }
    }

    pub fn summary(text: impl Into<String>) -> Self {
        AssistantReply::Summary { text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        AssistantReply::Error { text: text.into() }
    }

    pub fn generation(text: impl Into<String>, proposed_tasks: Vec<ProposedTask>) -> Self {
        AssistantReply::Generation {
            text: text.into(),
            proposed_tasks,
        }
    }

    pub fn kind(&self) -> ReplyKind {
        match self {
            AssistantReply::Chat { .. } => ReplyKind::Chat,
            AssistantReply::Generation { .. } => ReplyKind::Generation,
            AssistantReply::Summary { .. } => ReplyKind::Summary,
            AssistantReply::Error { .. } => ReplyKind::Error,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            AssistantReply::Chat { text }
            | AssistantReply::Generation { text, .. }
            | AssistantReply::Summary { text }
            | AssistantReply::Error { text } => text,
        }
    }

    /// Proposed tasks, present only for generation replies.
    pub fn proposed_tasks(&self) -> Option<&[ProposedTask]> {
        match self {
            AssistantReply::Generation { proposed_tasks, .. } => Some(proposed_tasks),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_roundtrip() {
        for role in [MessageRole::User, MessageRole::Assistant, MessageRole::System] {
            let parsed: MessageRole = role.to_string().parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_message_ids_are_unique_and_prefixed() {
        let a = ChatMessage::user("hi");
        let b = ChatMessage::user("hi");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("user-"));
        assert!(ChatMessage::system("x").id.starts_with("system-"));
    }

    #[test]
    fn test_reply_accessors() {
        let reply = AssistantReply::generation(
            "ok",
            vec![ProposedTask::new("a").unwrap(), ProposedTask::new("b").unwrap()],
        );
        assert_eq!(reply.kind(), ReplyKind::Generation);
        assert_eq!(reply.text(), "ok");
        assert_eq!(reply.proposed_tasks().map(|t| t.len()), Some(2));

        let chat = AssistantReply::chat("hello");
        assert_eq!(chat.kind(), ReplyKind::Chat);
        assert!(chat.proposed_tasks().is_none());
    }

    #[test]
    fn test_reply_serde_is_tagged() {
        let json = serde_json::to_value(AssistantReply::summary("done")).unwrap();
        assert_eq!(json["kind"], "summary");
        assert_eq!(json["text"], "done");
        assert!(json.get("proposed_tasks").is_none());
    }
}
