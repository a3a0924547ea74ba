//! Model client implementations for TaskPilot.
//!
//! Provides concrete clients for the two wire formats, the connector that
//! picks one from the current settings, and the connection test.

pub mod gemini;
pub mod openai_compat;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};

use taskpilot_core::llm::ModelConnector;
use taskpilot_core::llm::box_client::BoxModelClient;
use taskpilot_types::error::AiCallError;
use taskpilot_types::llm::{Dialect, LlmError, WireFormat, find_preset, infer_wire_format};
use taskpilot_types::settings::AssistantSettings;

use self::gemini::GeminiClient;
use self::openai_compat::OpenAiCompatClient;

/// Default request timeout when no config file sets one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Wording providers use when a request field is refused outright.
const REJECTION_WORDING: &[&str] = &[
    "not supported",
    "does not support",
    "unsupported",
    "unrecognized",
    "unknown parameter",
    "unknown field",
    "unknown name",
    "unknown argument",
];

/// Phrases naming structured calling itself, in either dialect.
const CAPABILITY_PHRASES: &[&str] = &["function calling", "tool calling", "tool use"];

/// Longest error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::InvalidRequest(format!("failed to create HTTP client: {e}")))
}

pub(crate) fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|secs| secs * 1000)
}

/// Text for a request that got no HTTP answer.
///
/// reqwest's top-level message is generic ("error sending request"); the
/// cause sits in the source chain. The URL is dropped first because the
/// Gemini key travels in the query string.
pub(crate) fn transport_message(error: reqwest::Error) -> String {
    let error = error.without_url();
    let mut message = if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else {
        error.to_string()
    };

    let mut source = std::error::Error::source(&error);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = std::error::Error::source(cause);
    }
    message
}

/// `error.param` of an OpenAI-style error body, if present.
fn rejected_param(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("param")?
        .as_str()
        .map(str::to_lowercase)
}

/// Whether an error body says the structured dialect itself was refused.
///
/// The body must name the dialect, through one of its request fields or a
/// capability phrase, next to refusal wording. When the provider reports
/// the offending parameter, that parameter alone decides.
pub(crate) fn is_capability_mismatch(body: &str, markers: &[&str]) -> bool {
    if let Some(param) = rejected_param(body) {
        return markers.iter().any(|marker| {
            param == *marker
                || param.starts_with(&format!("{marker}."))
                || param.starts_with(&format!("{marker}["))
        });
    }

    let body = body.to_lowercase();
    let names_dialect = markers.iter().any(|marker| body.contains(marker))
        || CAPABILITY_PHRASES.iter().any(|phrase| body.contains(phrase));
    names_dialect && REJECTION_WORDING.iter().any(|wording| body.contains(wording))
}

/// Map a non-2xx answer to an [`LlmError`].
pub(crate) fn map_failure(
    status: StatusCode,
    body: &str,
    retry_after_ms: Option<u64>,
    dialect: Dialect,
    markers: &[&str],
) -> LlmError {
    let mismatch = dialect.is_structured() && is_capability_mismatch(body, markers);
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed(format!("HTTP {status}: {body}")),
        429 => LlmError::RateLimited { retry_after_ms },
        400 | 404 | 422 if mismatch => {
            LlmError::DialectRejected {
                dialect,
                message: format!("HTTP {status}: {body}"),
            }
        }
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

/// Where a settings object points: provider name and wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub provider: String,
    pub wire_format: WireFormat,
}

/// Resolve the endpoint from an explicit preset id, else from the base URL.
pub fn resolve_endpoint(settings: &AssistantSettings) -> Endpoint {
    if let Some(preset) = settings.provider.as_deref().and_then(find_preset) {
        return Endpoint {
            provider: preset.id.to_string(),
            wire_format: preset.wire_format,
        };
    }

    let wire_format = infer_wire_format(settings.base_url());
    let provider = match settings.provider.as_deref() {
        Some(custom) if !custom.trim().is_empty() => custom.trim().to_string(),
        _ => match wire_format {
            WireFormat::GeminiGenerateContent => "gemini".to_string(),
            WireFormat::OpenAiChat => "openai-compatible".to_string(),
        },
    };
    Endpoint {
        provider,
        wire_format,
    }
}

/// Builds HTTP clients from settings, once per remote request.
#[derive(Debug, Clone)]
pub struct HttpModelConnector {
    timeout: Duration,
}

impl HttpModelConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpModelConnector {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl ModelConnector for HttpModelConnector {
    fn connect(&self, settings: &AssistantSettings) -> Result<BoxModelClient, AiCallError> {
        let api_key = settings
            .credential()
            .map(|key| SecretString::from(key.to_string()))
            .ok_or(AiCallError::MissingCredential)?;
        let endpoint = resolve_endpoint(settings);

        tracing::debug!(
            provider = %endpoint.provider,
            wire_format = %endpoint.wire_format,
            model = %settings.model,
            "Connecting model client"
        );

        let client = match endpoint.wire_format {
            WireFormat::OpenAiChat => OpenAiCompatClient::new(
                endpoint.provider,
                settings.base_url(),
                api_key,
                self.timeout,
            )
            .map(BoxModelClient::new),
            WireFormat::GeminiGenerateContent => {
                GeminiClient::new(settings.base_url(), api_key, self.timeout)
                    .map(BoxModelClient::new)
            }
        };
        client.map_err(|e| AiCallError::Configuration(e.to_string()))
    }
}

/// Check that the endpoint accepts the configured key.
///
/// Lists models rather than sending a completion, so nothing is billed.
/// Returns `Ok(false)` when the endpoint answers with a failure status.
pub async fn test_connection(
    settings: &AssistantSettings,
    timeout: Duration,
) -> Result<bool, AiCallError> {
    let api_key = settings
        .credential()
        .map(|key| SecretString::from(key.to_string()))
        .ok_or(AiCallError::MissingCredential)?;
    let endpoint = resolve_endpoint(settings);
    let client = build_http_client(timeout).map_err(|e| AiCallError::Configuration(e.to_string()))?;

    let url = format!("{}/models", settings.base_url());
    let request = match endpoint.wire_format {
        WireFormat::OpenAiChat => client.get(&url).bearer_auth(api_key.expose_secret()),
        WireFormat::GeminiGenerateContent => {
            client.get(&url).query(&[("key", api_key.expose_secret())])
        }
    };

    let response = request
        .send()
        .await
        .map_err(|e| AiCallError::Transport(transport_message(e)))?;
    let status = response.status();

    if status.is_success() {
        tracing::info!(provider = %endpoint.provider, "Connection test succeeded");
    } else {
        tracing::warn!(provider = %endpoint.provider, %status, "Connection test failed");
    }
    Ok(status.is_success())
}
