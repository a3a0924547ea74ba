//! OpenAI-compatible chat-completions client.
//!
//! Covers OpenAI itself and every provider that mirrors its
//! `/chat/completions` endpoint (DeepSeek, Moonshot, Zhipu, local gateways).
//! Both structured dialects are spoken here: modern `tools`/`tool_calls`
//! and legacy `functions`/`function_call`.

pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use taskpilot_core::llm::client::ModelClient;
use taskpilot_types::llm::{
    Dialect, LlmError, ModelRequest, ModelResponse, ToolInvocation, WireFormat,
};

use self::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, FunctionSpec, ToolSpec,
    error_message,
};
use super::{build_http_client, map_failure, retry_after_ms, transport_message};

/// Request fields whose mention in an error body means the dialect itself
/// was refused.
const TOOLS_MARKERS: &[&str] = &["tools", "tool_choice", "tool_calls"];
const FUNCTIONS_MARKERS: &[&str] = &["functions", "function_call"];

/// Client for an OpenAI-compatible endpoint.
///
/// The API key lives in a [`SecretString`] and is exposed only when the
/// `Authorization` header is built.
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    provider_name: String,
}

impl OpenAiCompatClient {
    pub fn new(
        provider_name: impl Into<String>,
        base_url: &str,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            provider_name: provider_name.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Translate a wire-agnostic request into a chat-completions body.
pub(crate) fn build_body(request: &ModelRequest) -> ChatCompletionRequest {
    let mut body = ChatCompletionRequest {
        model: request.model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: request.system.clone(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: request.user.clone(),
            },
        ],
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        tools: None,
        tool_choice: None,
        functions: None,
        function_call: None,
    };

    let Some(tool) = &request.tool else {
        return body;
    };
    let function = FunctionSpec {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.parameters.clone(),
    };
    match request.dialect {
        Dialect::Tools => {
            body.tools = Some(vec![ToolSpec {
                kind: "function".to_string(),
                function,
            }]);
            body.tool_choice = Some("auto".to_string());
        }
        Dialect::Functions => {
            body.functions = Some(vec![function]);
            body.function_call = Some("auto".to_string());
        }
        Dialect::Text => {}
    }
    body
}

/// Normalize a successful reply.
///
/// `tool_calls` entries are read before a legacy `function_call`, whatever
/// dialect was requested; a model may answer in either.
pub(crate) fn map_response(response: ChatCompletionResponse) -> Result<ModelResponse, LlmError> {
    if let Some(error) = &response.error {
        return Err(LlmError::Provider {
            message: error_message(error),
        });
    }

    let Some(choice) = response.choices.into_iter().next() else {
        return Err(LlmError::Deserialization(
            "response contained no choices".to_string(),
        ));
    };
    let message = choice.message;

    let mut calls: Vec<ToolInvocation> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolInvocation {
            arguments: call.function.arguments_text(),
            name: call.function.name,
            dialect: Dialect::Tools,
        })
        .collect();
    if let Some(call) = message.function_call {
        calls.push(ToolInvocation {
            arguments: call.arguments_text(),
            name: call.name,
            dialect: Dialect::Functions,
        });
    }

    Ok(ModelResponse {
        content: message.content.filter(|text| !text.trim().is_empty()),
        calls,
    })
}

fn markers_for(dialect: Dialect) -> &'static [&'static str] {
    match dialect {
        Dialect::Tools => TOOLS_MARKERS,
        Dialect::Functions => FUNCTIONS_MARKERS,
        Dialect::Text => &[],
    }
}

impl ModelClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn wire_format(&self) -> WireFormat {
        WireFormat::OpenAiChat
    }

    fn supports(&self, _dialect: Dialect) -> bool {
        true
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        let body = build_body(request);

        let response = self
            .client
            .post(self.url("/chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(transport_message(e)))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_ms(response.headers());
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_failure(
                status,
                &error_body,
                retry_after,
                request.dialect,
                markers_for(request.dialect),
            ));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            LlmError::Deserialization(format!("failed to parse response: {}", e.without_url()))
        })?;
        map_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskpilot_types::llm::ToolDefinition;

    fn request(dialect: Dialect) -> ModelRequest {
        ModelRequest {
            model: "gpt-4o-mini".to_string(),
            system: "sys".to_string(),
            user: "plan my week".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            dialect,
            tool: dialect.is_structured().then(|| ToolDefinition {
                name: "add_tasks".to_string(),
                description: "add".to_string(),
                parameters: json!({"type": "object"}),
            }),
        }
    }

    fn parse(value: serde_json::Value) -> ChatCompletionResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_tools_body() {
        let body = serde_json::to_value(build_body(&request(Dialect::Tools))).unwrap();
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "add_tasks");
        assert_eq!(body["tool_choice"], "auto");
        assert!(body.get("functions").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "plan my week");
    }

    #[test]
    fn test_functions_body() {
        let body = serde_json::to_value(build_body(&request(Dialect::Functions))).unwrap();
        assert_eq!(body["functions"][0]["name"], "add_tasks");
        assert_eq!(body["function_call"], "auto");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_text_body_has_no_function_fields() {
        let body = serde_json::to_value(build_body(&request(Dialect::Text))).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("functions").is_none());
        assert_eq!(body["max_tokens"], 2048);
    }

    #[test]
    fn test_map_tool_calls() {
        let response = map_response(parse(json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{"id": "call_1", "type": "function", "function": {
                    "name": "add_tasks",
                    "arguments": "{\"tasks\":[{\"text\":\"a\"}]}"
                }}]
            }}]
        })))
        .unwrap();
        assert!(response.content.is_none());
        assert_eq!(response.calls.len(), 1);
        assert_eq!(response.calls[0].dialect, Dialect::Tools);
        assert_eq!(response.calls[0].arguments, "{\"tasks\":[{\"text\":\"a\"}]}");
    }

    #[test]
    fn test_map_legacy_function_call_with_object_arguments() {
        let response = map_response(parse(json!({
            "choices": [{"message": {
                "content": "好的",
                "function_call": {"name": "add_tasks", "arguments": {"tasks": ["a"]}}
            }}]
        })))
        .unwrap();
        assert_eq!(response.content.as_deref(), Some("好的"));
        assert_eq!(response.calls[0].dialect, Dialect::Functions);
        assert_eq!(response.calls[0].arguments, r#"{"tasks":["a"]}"#);
    }

    #[test]
    fn test_map_error_payload() {
        let err = map_response(parse(json!({"error": {"message": "model overloaded"}})))
            .unwrap_err();
        assert!(matches!(err, LlmError::Provider { message } if message == "model overloaded"));
    }

    #[test]
    fn test_map_empty_choices() {
        let err = map_response(parse(json!({"choices": []}))).unwrap_err();
        assert!(matches!(err, LlmError::Deserialization(_)));
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = OpenAiCompatClient::new(
            "deepseek",
            "https://api.deepseek.com/v1/",
            SecretString::from("sk-test"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.url("/chat/completions"),
            "https://api.deepseek.com/v1/chat/completions"
        );
        assert_eq!(client.name(), "deepseek");
        assert!(client.supports(Dialect::Functions));
    }
}
