//! OpenTelemetry GenAI Semantic Convention attribute names.
//!
//! Model-call spans in `taskpilot-core` carry these as field names; tracing
//! macros need the names as literal tokens, so the constants are the
//! reference list for exporters and tests rather than macro arguments.

/// The name of the operation being performed (e.g., "chat").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "deepseek", "gemini").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

/// The model ID requested (e.g., "gpt-4o-mini").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

/// Function-calling dialect of the request (tools, functions, text).
/// Not part of the upstream conventions.
pub const GEN_AI_REQUEST_DIALECT: &str = "gen_ai.request.dialect";

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

/// Span name of a single model call.
pub const SPAN_COMPLETE: &str = "gen_ai.complete";

/// Every attribute name a model-call span carries.
pub const MODEL_CALL_FIELDS: &[&str] = &[
    GEN_AI_OPERATION_NAME,
    GEN_AI_PROVIDER_NAME,
    GEN_AI_REQUEST_MODEL,
    GEN_AI_REQUEST_MAX_TOKENS,
    GEN_AI_REQUEST_TEMPERATURE,
    GEN_AI_REQUEST_DIALECT,
];

/// Whether a span is a model call, judged by its name.
pub fn is_model_call_span(name: &str) -> bool {
    name == SPAN_COMPLETE
}
