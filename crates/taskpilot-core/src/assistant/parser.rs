//! Trust-boundary parsing of model output into [`AssistantReply`].
//!
//! Model text is expected to be a bare `{"response": ..., "new_tasks": [...]}`
//! object but often arrives wrapped in markdown fences, surrounded by prose,
//! or not as JSON at all. Malformed output degrades to a chat reply carrying
//! the raw text; it never fails.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use taskpilot_types::chat::AssistantReply;
use taskpilot_types::task::ProposedTask;

/// Used when a reply proposes tasks without any accompanying text.
pub const DEFAULT_GENERATION_TEXT: &str = "好的，我为你整理了以下任务：";

const RESPONSE_KEYS: [&str; 3] = ["response", "reply", "message"];
const TASK_LIST_KEYS: [&str; 3] = ["new_tasks", "new_todos", "tasks"];
const TASK_TEXT_KEYS: [&str; 4] = ["text", "title", "task", "content"];

/// Remove a surrounding markdown code fence (```` ```json ... ``` ````).
///
/// Returns the trimmed input unchanged when there is no fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[start + 3..];
    let tag_len = after_open
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(after_open.len());
    let body = &after_open[tag_len..];
    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        // Unterminated fence, usually a truncated reply.
        None => body.trim(),
    }
}

/// Slice from the first `{` to the last `}`, for JSON embedded in prose.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse free-form model text into a typed reply.
pub fn parse_reply_text(raw: &str) -> AssistantReply {
    let body = strip_code_fence(raw);
    let value = serde_json::from_str::<Value>(body).ok().or_else(|| {
        extract_json_object(body).and_then(|slice| serde_json::from_str::<Value>(slice).ok())
    });

    let Some(Value::Object(object)) = value else {
        debug!(
            content_preview = %preview(raw),
            "Model reply is not a JSON object; treating as chat"
        );
        return AssistantReply::chat(raw);
    };

    match interpret_object(&object) {
        Some(reply) => reply,
        None => {
            warn!(
                content_preview = %preview(raw),
                "Model JSON lacks a response or task list; treating as chat"
            );
            AssistantReply::chat(raw)
        }
    }
}

/// Map a parsed JSON object onto a reply. `None` when it matches no shape.
fn interpret_object(object: &Map<String, Value>) -> Option<AssistantReply> {
    let response = RESPONSE_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim);

    let tasks: Vec<ProposedTask> = TASK_LIST_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
        .map(|items| items.iter().filter_map(proposed_from_value).collect())
        .unwrap_or_default();

    if !tasks.is_empty() {
        let text = response
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_GENERATION_TEXT);
        return Some(AssistantReply::generation(text, tasks));
    }

    let text = response?;
    let is_summary = object
        .get("type")
        .or_else(|| object.get("kind"))
        .and_then(Value::as_str)
        .is_some_and(|shape| shape.eq_ignore_ascii_case("summary"));

    if is_summary {
        Some(AssistantReply::summary(text))
    } else {
        Some(AssistantReply::chat(text))
    }
}

/// Accept a task entry given either as a bare string or as an object
/// with a text field and an optional priority.
pub fn proposed_from_value(value: &Value) -> Option<ProposedTask> {
    match value {
        Value::String(text) => ProposedTask::new(text),
        Value::Object(entry) => {
            let text = TASK_TEXT_KEYS
                .iter()
                .find_map(|key| entry.get(*key).and_then(Value::as_str))?;
            let priority = entry
                .get("priority")
                .and_then(Value::as_str)
                .and_then(|p| p.parse().ok());
            ProposedTask::new(text).map(|task| task.with_priority(priority))
        }
        _ => None,
    }
}

/// Enforce the reply invariant before a reply leaves the assistant layer:
/// a generation with no usable tasks is downgraded to chat.
pub fn classify(reply: AssistantReply) -> AssistantReply {
    match reply {
        AssistantReply::Generation {
            text,
            proposed_tasks,
        } => {
            let proposed_tasks: Vec<ProposedTask> = proposed_tasks
                .into_iter()
                .filter_map(|task| {
                    ProposedTask::new(&task.text).map(|clean| clean.with_priority(task.priority))
                })
                .collect();
            if proposed_tasks.is_empty() {
                debug!("Generation reply without tasks downgraded to chat");
                AssistantReply::Chat { text }
            } else {
                AssistantReply::Generation {
                    text,
                    proposed_tasks,
                }
            }
        }
        other => other,
    }
}

/// First 200 characters, for log fields.
pub(crate) fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}
