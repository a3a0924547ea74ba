//! Remote adapter: prompt, dialect negotiation and reply normalization.
//!
//! Callers always get an [`AssistantReply`] back, except when no reply
//! arrived at all ([`AiCallError::Transport`]). Provider errors, rejected
//! dialects and malformed output all become replies.

use tracing::{info, warn};

use taskpilot_types::chat::AssistantReply;
use taskpilot_types::error::AiCallError;
use taskpilot_types::llm::{Dialect, LlmError, ModelRequest, ToolInvocation};
use taskpilot_types::settings::AssistantSettings;
use taskpilot_types::task::Task;

use super::dialect::{Exchange, negotiate, negotiation_plan};
use super::parser::{DEFAULT_GENERATION_TEXT, classify, parse_reply_text, preview};
use super::prompt::build_system_prompt;
use super::tool::{add_tasks_tool, is_add_tasks, parse_add_tasks_arguments};
use crate::llm::box_client::BoxModelClient;

pub const TEXT_FALLBACK_WARNING: &str = "当前接口不支持结构化函数调用，已改用文本解析。";

const EMPTY_REPLY_TEXT: &str = "（AI 没有返回内容）";

const RAW_SAMPLE_CHARS: usize = 300;

/// Everything one remote round produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOutcome {
    /// The classified reply.
    pub reply: AssistantReply,
    /// Dialect that answered, if any did.
    pub dialect: Option<Dialect>,
    /// The first function call in the reply, recognized or not.
    pub call: Option<ToolInvocation>,
    /// Non-fatal notes for the transcript.
    pub warnings: Vec<String>,
    /// Leading characters of the raw reply, for diagnostics.
    pub raw_sample: Option<String>,
}

impl RemoteOutcome {
    pub(crate) fn from_reply(reply: AssistantReply) -> Self {
        Self {
            reply,
            dialect: None,
            call: None,
            warnings: Vec::new(),
            raw_sample: None,
        }
    }
}

pub struct RemoteAdapter {
    client: BoxModelClient,
    max_context_tasks: usize,
}

impl RemoteAdapter {
    pub fn new(client: BoxModelClient, max_context_tasks: usize) -> Self {
        Self {
            client,
            max_context_tasks,
        }
    }

    /// Build the request for one dialect.
    pub fn build_request(
        &self,
        input: &str,
        tasks: &[Task],
        settings: &AssistantSettings,
        dialect: Dialect,
    ) -> ModelRequest {
        ModelRequest {
            model: settings.model.clone(),
            system: build_system_prompt(settings, tasks, self.max_context_tasks, dialect),
            user: input.to_string(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            dialect,
            tool: dialect.is_structured().then(add_tasks_tool),
        }
    }

    /// Send one user message to the remote model.
    #[tracing::instrument(
        name = "remote_ask",
        skip_all,
        fields(
            provider = self.client.name(),
            model = %settings.model,
            mode = %settings.function_calling_mode,
        )
    )]
    pub async fn ask(
        &self,
        input: &str,
        tasks: &[Task],
        settings: &AssistantSettings,
    ) -> Result<RemoteOutcome, AiCallError> {
        let plan = negotiation_plan(settings.function_calling_mode, settings.enable_text_fallback);

        let negotiation = match negotiate(&self.client, &plan, |dialect| {
            self.build_request(input, tasks, settings, dialect)
        })
        .await
        {
            Ok(negotiation) => negotiation,
            Err(LlmError::Transport(message)) => {
                warn!(error = %message, "No reply from model endpoint");
                return Err(AiCallError::Transport(message));
            }
            Err(e) => {
                warn!(error = %e, "Model endpoint returned an error");
                return Ok(RemoteOutcome::from_reply(AssistantReply::error(
                    provider_error_text(&e),
                )));
            }
        };

        let fell_back = negotiation.fell_back();
        let Some(exchange) = negotiation.exchange else {
            let tried: Vec<String> = negotiation
                .skipped
                .iter()
                .map(|(dialect, reason)| format!("{dialect}: {reason}"))
                .collect();
            warn!(tried = ?tried, "Every allowed dialect was rejected");
            return Ok(RemoteOutcome::from_reply(AssistantReply::error(format!(
                "AI 请求失败: 当前接口不支持所选的函数调用方式（{}）。请在设置中开启文本解析回退，或更换函数调用模式。",
                tried.join("；")
            ))));
        };

        let mut outcome = interpret_exchange(exchange);
        if fell_back && outcome.dialect == Some(Dialect::Text) {
            outcome.warnings.insert(0, TEXT_FALLBACK_WARNING.to_string());
        }
        info!(
            kind = %outcome.reply.kind(),
            dialect = ?outcome.dialect,
            warnings = outcome.warnings.len(),
            "Remote reply classified"
        );
        Ok(outcome)
    }
}

/// Normalize an answered exchange into a classified reply.
fn interpret_exchange(exchange: Exchange) -> RemoteOutcome {
    let Exchange { dialect, response } = exchange;
    let content = response
        .content
        .filter(|c| !c.trim().is_empty());
    let mut warnings = Vec::new();
    let call = response.calls.into_iter().next();

    let raw_sample = match (&call, &content) {
        (Some(call), _) => Some(sample(&call.arguments)),
        (None, Some(content)) => Some(sample(content)),
        (None, None) => None,
    };

    let text_reply = content.as_deref().map(parse_reply_text);

    let reply = match &call {
        Some(call) if is_add_tasks(call) => match parse_add_tasks_arguments(&call.arguments) {
            Ok(tasks) => {
                let text = text_reply
                    .as_ref()
                    .map(AssistantReply::text)
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or(DEFAULT_GENERATION_TEXT);
                AssistantReply::generation(text, tasks)
            }
            Err(reason) => {
                warn!(
                    reason = %reason,
                    content_preview = %preview(&call.arguments),
                    "Unreadable add_tasks arguments"
                );
                warnings.push(format!("AI 调用了 {}，但参数无法解析：{reason}", call.name));
                text_reply.unwrap_or_else(|| AssistantReply::chat(EMPTY_REPLY_TEXT))
            }
        },
        Some(call) => {
            warn!(function = %call.name, "Model called an unknown function");
            warnings.push(format!("AI 调用了未知函数 {}，已忽略。", call.name));
            text_reply.unwrap_or_else(|| AssistantReply::chat(EMPTY_REPLY_TEXT))
        }
        None => text_reply.unwrap_or_else(|| AssistantReply::chat(EMPTY_REPLY_TEXT)),
    };

    RemoteOutcome {
        reply: classify(reply),
        dialect: Some(dialect),
        call,
        warnings,
        raw_sample,
    }
}

/// User-facing text for a provider-side failure, with one hint.
fn provider_error_text(error: &LlmError) -> String {
    let hint = match error {
        LlmError::AuthenticationFailed(_) => "请检查设置中的 API Key 是否正确。",
        LlmError::RateLimited { .. } => "请求过于频繁，请稍后再试。",
        _ => "请检查设置中的 API Key 和网络。",
    };
    format!("AI 请求失败: {error}。{hint}")
}

fn sample(text: &str) -> String {
    text.chars().take(RAW_SAMPLE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedClient, call_response, remote_settings, text_response};
    use taskpilot_types::chat::ReplyKind;
    use taskpilot_types::llm::ModelResponse;
    use taskpilot_types::settings::FunctionCallingMode;
    use taskpilot_types::task::{NewTask, Priority};

    fn adapter(responses: Vec<Result<ModelResponse, LlmError>>) -> RemoteAdapter {
        RemoteAdapter::new(BoxModelClient::new(ScriptedClient::new(responses)), 50)
    }

    #[tokio::test]
    async fn test_fenced_new_todos_become_generation() {
        let adapter = adapter(vec![text_response(
            "```json\n{\"response\":\"ok\",\"new_todos\":[\"a\",\"b\"]}\n```",
        )]);
        let outcome = adapter.ask("plan", &[], &remote_settings()).await.unwrap();
        assert_eq!(outcome.reply.kind(), ReplyKind::Generation);
        let texts: Vec<&str> = outcome
            .reply
            .proposed_tasks()
            .unwrap()
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_plain_text_is_verbatim_chat() {
        let adapter = adapter(vec![text_response("Just chatting.")]);
        let outcome = adapter.ask("hi", &[], &remote_settings()).await.unwrap();
        assert_eq!(outcome.reply, AssistantReply::chat("Just chatting."));
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_typed_error() {
        let adapter = adapter(vec![Err(LlmError::Transport("timeout".to_string()))]);
        let err = adapter.ask("hi", &[], &remote_settings()).await.unwrap_err();
        assert!(matches!(err, AiCallError::Transport(ref m) if m == "timeout"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_error_reply() {
        let adapter = adapter(vec![Err(LlmError::Provider {
            message: "HTTP 500: upstream exploded".to_string(),
        })]);
        let outcome = adapter.ask("hi", &[], &remote_settings()).await.unwrap();
        assert_eq!(outcome.reply.kind(), ReplyKind::Error);
        assert!(outcome.reply.text().contains("upstream exploded"));
        assert!(outcome.reply.text().contains("API Key"));
    }

    #[tokio::test]
    async fn test_auth_failure_hint() {
        let adapter = adapter(vec![Err(LlmError::AuthenticationFailed(
            "invalid key".to_string(),
        ))]);
        let outcome = adapter.ask("hi", &[], &remote_settings()).await.unwrap();
        assert!(outcome.reply.text().contains("invalid key"));
        assert!(outcome.reply.text().contains("是否正确"));
    }

    #[tokio::test]
    async fn test_tool_call_becomes_generation_with_priority() {
        let adapter = adapter(vec![call_response(
            Dialect::Tools,
            "add_tasks",
            r#"{"tasks":[{"text":"draft outline","priority":"high"},{"text":"review"}]}"#,
            None,
        )]);
        let outcome = adapter.ask("plan it", &[], &remote_settings()).await.unwrap();
        assert_eq!(outcome.dialect, Some(Dialect::Tools));
        assert_eq!(outcome.reply.text(), DEFAULT_GENERATION_TEXT);
        let tasks = outcome.reply.proposed_tasks().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].priority, Some(Priority::High));
        assert_eq!(outcome.call.unwrap().name, "add_tasks");
    }

    #[tokio::test]
    async fn test_tool_call_keeps_model_text() {
        let adapter = adapter(vec![call_response(
            Dialect::Functions,
            "add_todos",
            r#"{"todos":["x"]}"#,
            Some("{\"response\":\"已为你添加\"}"),
        )]);
        let outcome = adapter.ask("plan", &[], &remote_settings()).await.unwrap();
        assert_eq!(outcome.reply.text(), "已为你添加");
        assert_eq!(outcome.reply.kind(), ReplyKind::Generation);
    }

    #[tokio::test]
    async fn test_empty_tool_call_downgrades_to_chat() {
        let adapter = adapter(vec![call_response(
            Dialect::Tools,
            "add_tasks",
            r#"{"tasks":[]}"#,
            Some("nothing to add"),
        )]);
        let outcome = adapter.ask("plan", &[], &remote_settings()).await.unwrap();
        assert_eq!(outcome.reply, AssistantReply::chat("nothing to add"));
    }

    #[tokio::test]
    async fn test_unknown_function_warns() {
        let adapter = adapter(vec![call_response(
            Dialect::Tools,
            "delete_everything",
            "{}",
            None,
        )]);
        let outcome = adapter.ask("hi", &[], &remote_settings()).await.unwrap();
        assert_eq!(outcome.reply.kind(), ReplyKind::Chat);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("delete_everything"));
    }

    #[tokio::test]
    async fn test_text_fallback_adds_warning() {
        let adapter = adapter(vec![
            Err(LlmError::DialectRejected {
                dialect: Dialect::Tools,
                message: "tools not supported".to_string(),
            }),
            Err(LlmError::DialectRejected {
                dialect: Dialect::Functions,
                message: "functions not supported".to_string(),
            }),
            text_response("{\"response\":\"hello\"}"),
        ]);
        let outcome = adapter.ask("hi", &[], &remote_settings()).await.unwrap();
        assert_eq!(outcome.dialect, Some(Dialect::Text));
        assert_eq!(outcome.reply, AssistantReply::chat("hello"));
        assert_eq!(outcome.warnings, vec![TEXT_FALLBACK_WARNING.to_string()]);
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_error_with_hint() {
        let adapter = adapter(vec![Err(LlmError::DialectRejected {
            dialect: Dialect::Tools,
            message: "tools not supported".to_string(),
        })]);
        let settings = AssistantSettings {
            function_calling_mode: FunctionCallingMode::Tools,
            enable_text_fallback: false,
            ..remote_settings()
        };
        let outcome = adapter.ask("hi", &[], &settings).await.unwrap();
        assert_eq!(outcome.reply.kind(), ReplyKind::Error);
        assert!(outcome.reply.text().contains("文本解析回退"));
    }

    #[tokio::test]
    async fn test_disabled_mode_sends_text_request_without_tool() {
        let scripted = ScriptedClient::new(vec![text_response("{\"response\":\"ok\"}")]);
        let requests = scripted.requests();
        let adapter = RemoteAdapter::new(BoxModelClient::new(scripted), 50);
        let settings = AssistantSettings {
            function_calling_mode: FunctionCallingMode::Disabled,
            ..remote_settings()
        };
        let tasks = vec![Task::from_new(NewTask::new("existing task"))];
        adapter.ask("hi", &tasks, &settings).await.unwrap();

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].dialect, Dialect::Text);
        assert!(requests[0].tool.is_none());
        assert!(requests[0].system.contains("existing task"));
        assert!(!requests[0].system.contains(&tasks[0].id.to_string()));
        assert_eq!(requests[0].user, "hi");
    }

    #[tokio::test]
    async fn test_structured_request_offers_tool() {
        let scripted = ScriptedClient::new(vec![text_response("ok")]);
        let requests = scripted.requests();
        let adapter = RemoteAdapter::new(BoxModelClient::new(scripted), 50);
        adapter.ask("hi", &[], &remote_settings()).await.unwrap();
        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].tool.as_ref().unwrap().name, "add_tasks");
    }

    #[tokio::test]
    async fn test_empty_content_is_placeholder_chat() {
        let adapter = adapter(vec![Ok(ModelResponse::default())]);
        let outcome = adapter.ask("hi", &[], &remote_settings()).await.unwrap();
        assert_eq!(outcome.reply, AssistantReply::chat(EMPTY_REPLY_TEXT));
        assert!(outcome.raw_sample.is_none());
    }
}
