//! User-editable assistant settings.
//!
//! Loaded from the settings store at the start of every request, so an
//! edit made mid-session applies to the next request only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个高效的任务助手，帮助用户规划和管理待办事项。\n\
回复时使用简洁友好的中文。\n\
当用户提出一个较大的目标时，把它拆解成具体、可执行的小任务。\n\
当用户要求总结或回顾时，根据当前任务列表给出简短的进展小结。";

/// How the remote adapter negotiates structured function calling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCallingMode {
    /// Try the modern tools dialect, then the legacy functions dialect,
    /// then plain-text JSON (when text fallback is enabled).
    #[default]
    Auto,
    /// Modern `tools` / `tool_calls` dialect only.
    Tools,
    /// Legacy `functions` / `function_call` dialect only.
    Functions,
    /// No structured calling; plain-text JSON only.
    Disabled,
}

impl fmt::Display for FunctionCallingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionCallingMode::Auto => write!(f, "auto"),
            FunctionCallingMode::Tools => write!(f, "tools"),
            FunctionCallingMode::Functions => write!(f, "functions"),
            FunctionCallingMode::Disabled => write!(f, "disabled"),
        }
    }
}

impl FromStr for FunctionCallingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(FunctionCallingMode::Auto),
            "tools" | "modern" | "modern-only" => Ok(FunctionCallingMode::Tools),
            "functions" | "legacy" | "legacy-only" => Ok(FunctionCallingMode::Functions),
            "disabled" | "off" | "none" => Ok(FunctionCallingMode::Disabled),
            other => Err(format!("invalid function calling mode: '{other}'")),
        }
    }
}

/// Which backend serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantMode {
    /// Keyword-driven local simulator, no network.
    Local,
    /// Remote model endpoint.
    Remote,
}

impl fmt::Display for AssistantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssistantMode::Local => write!(f, "local"),
            AssistantMode::Remote => write!(f, "remote"),
        }
    }
}

/// Assistant configuration as stored in the settings store.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub function_calling_mode: FunctionCallingMode,
    pub enable_text_fallback: bool,
    /// Provider preset id (e.g. "openai", "gemini"). `None` means infer
    /// the wire format from `api_base_url`.
    pub provider: Option<String>,
}

impl AssistantSettings {
    /// The configured credential, if it is non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Masked credential for display, e.g. `sk-a...xyz9`.
    pub fn masked_api_key(&self) -> Option<String> {
        self.credential().map(mask_secret)
    }
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            function_calling_mode: FunctionCallingMode::Auto,
            enable_text_fallback: true,
            provider: None,
        }
    }
}

// Hand-written so the API key never reaches logs through `{:?}`.
impl fmt::Debug for AssistantSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantSettings")
            .field("api_key", &self.masked_api_key())
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("function_calling_mode", &self.function_calling_mode)
            .field("enable_text_fallback", &self.enable_text_fallback)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

/// Mask a secret for display: first 4 and last 4 characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
