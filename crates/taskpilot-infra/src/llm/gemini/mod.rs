//! Google Gemini generateContent client.
//!
//! Gemini has a single structured dialect (`functionDeclarations` in the
//! request, `functionCall` parts in the reply), mapped onto
//! [`Dialect::Tools`]. The legacy functions dialect does not exist here, so
//! [`ModelClient::supports`] lets the negotiation skip it without a request.

pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use taskpilot_core::llm::client::ModelClient;
use taskpilot_types::llm::{
    Dialect, LlmError, ModelRequest, ModelResponse, ToolInvocation, WireFormat,
};

use self::types::{
    Content, FunctionDeclaration, GeminiErrorEnvelope, GeminiTool, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, TextPart,
};
use super::{build_http_client, map_failure, retry_after_ms, transport_message};

const TOOLS_MARKERS: &[&str] = &["tools", "function_declarations", "functiondeclarations"];

/// Client for the Gemini REST API.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: SecretString, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

/// Rewrite a JSON schema into the OpenAPI subset Gemini accepts.
///
/// Meta keys are dropped. Nullable unions (`"type": [T, "null"]`, `null`
/// enum entries, an `anyOf` with a null branch) become `"nullable": true`,
/// since Gemini requires `type` to be a single string.
fn strip_unsupported_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("$schema");
            map.remove("additionalProperties");
            let mut nullable = false;

            if let Some(Value::Array(types)) = map.get("type") {
                let concrete: Vec<Value> = types
                    .iter()
                    .filter(|t| t.as_str() != Some("null"))
                    .cloned()
                    .collect();
                nullable |= concrete.len() < types.len();
                match concrete.into_iter().next() {
                    Some(first) => map.insert("type".to_string(), first),
                    None => map.remove("type"),
                };
            }

            if let Some(Value::Array(variants)) = map.get_mut("enum") {
                let before = variants.len();
                variants.retain(|v| !v.is_null());
                nullable |= variants.len() < before;
            }

            for key in ["anyOf", "oneOf"] {
                let Some(Value::Array(mut branches)) = map.remove(key) else {
                    continue;
                };
                let before = branches.len();
                branches.retain(|b| b.get("type").and_then(Value::as_str) != Some("null"));
                nullable |= branches.len() < before;
                match branches.pop() {
                    Some(Value::Object(only)) if branches.is_empty() => {
                        for (k, v) in only {
                            map.entry(k).or_insert(v);
                        }
                    }
                    Some(last) => {
                        branches.push(last);
                        map.insert(key.to_string(), Value::Array(branches));
                    }
                    None => {}
                }
            }

            if nullable {
                map.insert("nullable".to_string(), Value::Bool(true));
            }
            for v in map.values_mut() {
                strip_unsupported_fields(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                strip_unsupported_fields(v);
            }
        }
        _ => {}
    }
}

pub(crate) fn build_body(request: &ModelRequest) -> GenerateContentRequest {
    let tools = match (&request.tool, request.dialect) {
        (Some(tool), Dialect::Tools) => {
            let mut parameters = tool.parameters.clone();
            strip_unsupported_fields(&mut parameters);
            Some(vec![GeminiTool {
                function_declarations: vec![FunctionDeclaration {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters,
                }],
            }])
        }
        _ => None,
    };

    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![TextPart {
                text: request.system.clone(),
            }],
        },
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![TextPart {
                text: request.user.clone(),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        },
        tools,
    }
}

pub(crate) fn map_response(response: GenerateContentResponse) -> Result<ModelResponse, LlmError> {
    if let Some(error) = response.error {
        return Err(LlmError::Provider {
            message: error.message,
        });
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|reason| format!("prompt blocked: {reason}"))
            .unwrap_or_else(|| "response contained no candidates".to_string());
        return Err(LlmError::Provider { message: reason });
    };

    let parts = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default();

    let mut text = String::new();
    let mut calls = Vec::new();
    for part in parts {
        if let Some(chunk) = part.text {
            text.push_str(&chunk);
        }
        if let Some(call) = part.function_call {
            let arguments = match call.args {
                Value::Null => "{}".to_string(),
                args => args.to_string(),
            };
            calls.push(ToolInvocation {
                name: call.name,
                arguments,
                dialect: Dialect::Tools,
            });
        }
    }

    if text.trim().is_empty() && calls.is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r != "STOP") {
            return Err(LlmError::Provider {
                message: format!("generation stopped: {reason}"),
            });
        }
    }

    Ok(ModelResponse {
        content: (!text.trim().is_empty()).then_some(text),
        calls,
    })
}

/// The `error.message` of an error envelope, or the raw body.
fn error_text(body: &str) -> String {
    serde_json::from_str::<GeminiErrorEnvelope>(body)
        .map(|envelope| match envelope.error.status {
            Some(status) => format!("{status}: {}", envelope.error.message),
            None => envelope.error.message,
        })
        .unwrap_or_else(|_| body.to_string())
}

impl ModelClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn wire_format(&self) -> WireFormat {
        WireFormat::GeminiGenerateContent
    }

    fn supports(&self, dialect: Dialect) -> bool {
        !matches!(dialect, Dialect::Functions)
    }

    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        if request.dialect == Dialect::Functions {
            return Err(LlmError::DialectRejected {
                dialect: Dialect::Functions,
                message: "gemini has no legacy functions dialect".to_string(),
            });
        }
        let body = build_body(request);

        // the key is a query parameter; transport_message drops the URL
        let response = self
            .client
            .post(self.url(&request.model))
            .query(&[("key", self.api_key.expose_secret())])
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
                &error_text(&error_body),
                retry_after,
                request.dialect,
                if request.dialect == Dialect::Tools {
                    TOOLS_MARKERS
                } else {
                    &[]
                },
            ));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
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
            model: "gemini-1.5-flash".to_string(),
            system: "sys".to_string(),
            user: "hello".to_string(),
            temperature: 0.5,
            max_tokens: 1024,
            dialect,
            tool: Some(ToolDefinition {
                name: "add_tasks".to_string(),
                description: "add".to_string(),
                parameters: json!({
                    "$schema": "http://json-schema.org/draft-07/schema#",
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {"tasks": {"type": "array", "items": {
                        "type": "object", "additionalProperties": false
                    }}}
                }),
            }),
        }
    }

    fn parse(value: Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_body_uses_camel_case_and_strips_schema_keys() {
        let body = serde_json::to_value(build_body(&request(Dialect::Tools))).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);

        let params = &body["tools"][0]["functionDeclarations"][0]["parameters"];
        assert!(params.get("$schema").is_none());
        assert!(params.get("additionalProperties").is_none());
        assert!(
            params["properties"]["tasks"]["items"]
                .get("additionalProperties")
                .is_none()
        );
    }

    /// Every `type` is a single string and no `enum` lists `null`.
    fn assert_gemini_schema(value: &Value) {
        match value {
            Value::Object(map) => {
                if let Some(kind) = map.get("type") {
                    assert!(kind.is_string() || kind.is_object(), "array type in {value}");
                }
                if let Some(Value::Array(variants)) = map.get("enum") {
                    assert!(variants.iter().all(|v| !v.is_null()), "null enum in {value}");
                }
                map.values().for_each(assert_gemini_schema);
            }
            Value::Array(items) => items.iter().for_each(assert_gemini_schema),
            _ => {}
        }
    }

    #[test]
    fn test_add_tasks_schema_fits_gemini_subset() {
        let request = ModelRequest {
            tool: Some(taskpilot_core::assistant::tool::add_tasks_tool()),
            ..request(Dialect::Tools)
        };
        let body = serde_json::to_value(build_body(&request)).unwrap();
        let params = &body["tools"][0]["functionDeclarations"][0]["parameters"];
        assert_gemini_schema(params);

        let priority = &params["properties"]["tasks"]["items"]["properties"]["priority"];
        assert_eq!(priority["type"], "string");
        assert_eq!(priority["nullable"], true);
        assert_eq!(priority["enum"], json!(["low", "medium", "high"]));
    }

    #[test]
    fn test_nullable_unions_collapse() {
        let mut schema = json!({
            "type": "object",
            "properties": {
                "due": {"type": ["string", "null"]},
                "tag": {"anyOf": [{"type": "string", "maxLength": 20}, {"type": "null"}]},
                "count": {"type": "integer"}
            }
        });
        strip_unsupported_fields(&mut schema);
        assert_eq!(schema["properties"]["due"], json!({"type": "string", "nullable": true}));
        assert_eq!(
            schema["properties"]["tag"],
            json!({"type": "string", "maxLength": 20, "nullable": true})
        );
        assert_eq!(schema["properties"]["count"], json!({"type": "integer"}));
    }

    #[test]
    fn test_text_body_has_no_tools() {
        let body = serde_json::to_value(build_body(&request(Dialect::Text))).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_map_function_call_part() {
        let response = map_response(parse(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "好的，"},
                {"functionCall": {"name": "add_tasks", "args": {"tasks": [{"text": "a"}]}}}
            ]}, "finishReason": "STOP"}]
        })))
        .unwrap();
        assert_eq!(response.content.as_deref(), Some("好的，"));
        assert_eq!(response.calls[0].name, "add_tasks");
        assert_eq!(response.calls[0].dialect, Dialect::Tools);
        let args: Value = serde_json::from_str(&response.calls[0].arguments).unwrap();
        assert_eq!(args["tasks"][0]["text"], "a");
    }

    #[test]
    fn test_map_blocked_prompt() {
        let err = map_response(parse(json!({"promptFeedback": {"blockReason": "SAFETY"}})))
            .unwrap_err();
        assert!(matches!(err, LlmError::Provider { message } if message.contains("SAFETY")));
    }

    #[test]
    fn test_map_empty_candidate_with_stop_reason() {
        let err = map_response(parse(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]
        })))
        .unwrap_err();
        assert!(matches!(err, LlmError::Provider { message } if message.contains("MAX_TOKENS")));
    }

    #[test]
    fn test_error_text_reads_envelope() {
        let body = r#"{"error":{"code":400,"message":"Invalid JSON payload received. Unknown name \"tools\"","status":"INVALID_ARGUMENT"}}"#;
        assert!(error_text(body).starts_with("INVALID_ARGUMENT: Invalid JSON payload"));
        assert_eq!(error_text("gateway down"), "gateway down");
    }

    #[test]
    fn test_supports_no_legacy_functions() {
        let client =
            GeminiClient::new("https://example.test/v1beta/", SecretString::from("k"), Duration::from_secs(5))
                .unwrap();
        assert!(client.supports(Dialect::Tools));
        assert!(client.supports(Dialect::Text));
        assert!(!client.supports(Dialect::Functions));
        assert_eq!(
            client.url("gemini-1.5-flash"),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
