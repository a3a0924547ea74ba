//! Model request/response types shared by the remote adapter and the
//! HTTP clients that implement it.
//!
//! These types are wire-agnostic: the infra clients translate them to the
//! OpenAI chat-completions or Gemini generateContent formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A wire dialect for structured function invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Modern `tools` request field, `tool_calls` in the reply.
    Tools,
    /// Legacy `functions` request field, `function_call` in the reply.
    Functions,
    /// No structured calling; the reply is plain text expected to hold JSON.
    Text,
}

impl Dialect {
    pub fn is_structured(&self) -> bool {
        !matches!(self, Dialect::Text)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Tools => write!(f, "tools"),
            Dialect::Functions => write!(f, "functions"),
            Dialect::Text => write!(f, "text"),
        }
    }
}

/// HTTP wire format spoken by a provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// `POST {base}/chat/completions` with a bearer token.
    OpenAiChat,
    /// `POST {base}/models/{model}:generateContent?key=...`.
    GeminiGenerateContent,
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::OpenAiChat => write!(f, "openai_chat"),
            WireFormat::GeminiGenerateContent => write!(f, "gemini"),
        }
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai_chat" | "openai" => Ok(WireFormat::OpenAiChat),
            "gemini" => Ok(WireFormat::GeminiGenerateContent),
            other => Err(format!("invalid wire format: '{other}'")),
        }
    }
}

/// A well-known provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub base_url: &'static str,
    pub wire_format: WireFormat,
    pub default_model: &'static str,
}

/// Provider configuration table. Adding a provider is a row here, not code.
pub const PROVIDER_PRESETS: &[ProviderPreset] = &[
    ProviderPreset {
        id: "openai",
        name: "OpenAI",
        base_url: "https://api.openai.com/v1",
        wire_format: WireFormat::OpenAiChat,
        default_model: "gpt-4o-mini",
    },
    ProviderPreset {
        id: "deepseek",
        name: "DeepSeek",
        base_url: "https://api.deepseek.com/v1",
        wire_format: WireFormat::OpenAiChat,
        default_model: "deepseek-chat",
    },
    ProviderPreset {
        id: "moonshot",
        name: "Moonshot (Kimi)",
        base_url: "https://api.moonshot.cn/v1",
        wire_format: WireFormat::OpenAiChat,
        default_model: "moonshot-v1-8k",
    },
    ProviderPreset {
        id: "zhipu",
        name: "Zhipu (GLM)",
        base_url: "https://open.bigmodel.cn/api/paas/v4",
        wire_format: WireFormat::OpenAiChat,
        default_model: "glm-4-flash",
    },
    ProviderPreset {
        id: "gemini",
        name: "Google Gemini",
        base_url: "https://generativelanguage.googleapis.com/v1beta",
        wire_format: WireFormat::GeminiGenerateContent,
        default_model: "gemini-1.5-flash",
    },
];

/// Look up a provider preset by id (case-insensitive).
pub fn find_preset(id: &str) -> Option<&'static ProviderPreset> {
    PROVIDER_PRESETS
        .iter()
        .find(|preset| preset.id.eq_ignore_ascii_case(id))
}

/// Infer the wire format from a base URL.
///
/// Google's host speaks generateContent natively, except under its
/// `/openai` compatibility prefix.
pub fn infer_wire_format(base_url: &str) -> WireFormat {
    let url = base_url.trim_end_matches('/').to_lowercase();
    if url.contains("generativelanguage.googleapis.com") && !url.ends_with("/openai") {
        WireFormat::GeminiGenerateContent
    } else {
        WireFormat::OpenAiChat
    }
}

/// A callable function offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// One call to the remote model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub dialect: Dialect,
    /// Offered only for structured dialects.
    pub tool: Option<ToolDefinition>,
}

/// A function call found in a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    /// Raw JSON text of the arguments object.
    pub arguments: String,
    /// Which dialect the call arrived in.
    pub dialect: Dialect,
}

/// Normalized model reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub content: Option<String>,
    pub calls: Vec<ToolInvocation>,
}

/// Errors from model transport operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// No reply at all: connection refused, DNS failure, timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a failure (non-2xx or error payload).
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    /// The endpoint does not understand the requested dialect.
    #[error("{dialect} dialect rejected: {message}")]
    DialectRejected { dialect: Dialect, message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::Tools.to_string(), "tools");
        assert_eq!(Dialect::Functions.to_string(), "functions");
        assert!(!Dialect::Text.is_structured());
    }

    #[test]
    fn test_find_preset_case_insensitive() {
        let preset = find_preset("DeepSeek").unwrap();
        assert_eq!(preset.base_url, "https://api.deepseek.com/v1");
        assert!(find_preset("nope").is_none());
    }

    #[test]
    fn test_infer_wire_format() {
        assert_eq!(
            infer_wire_format("https://generativelanguage.googleapis.com/v1beta"),
            WireFormat::GeminiGenerateContent
        );
        assert_eq!(
            infer_wire_format("https://generativelanguage.googleapis.com/v1beta/openai/"),
            WireFormat::OpenAiChat
        );
        assert_eq!(infer_wire_format("http://localhost:11434/v1"), WireFormat::OpenAiChat);
    }

    #[test]
    fn test_preset_ids_unique() {
        let mut ids: Vec<&str> = PROVIDER_PRESETS.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), PROVIDER_PRESETS.len());
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::DialectRejected {
            dialect: Dialect::Tools,
            message: "unknown field tools".to_string(),
        };
        assert_eq!(err.to_string(), "tools dialect rejected: unknown field tools");
    }
}
