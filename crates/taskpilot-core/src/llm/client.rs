//! ModelClient trait definition.
//!
//! This is the abstraction every remote wire format implements.

use taskpilot_types::llm::{Dialect, LlmError, ModelRequest, ModelResponse, WireFormat};

/// Trait for remote model endpoints (OpenAI-compatible, Gemini).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in taskpilot-infra.
pub trait ModelClient: Send + Sync {
    /// Human-readable provider name (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// Wire format this client speaks.
    fn wire_format(&self) -> WireFormat;

    /// Whether the wire format has the given dialect at all.
    ///
    /// Returning `false` lets the negotiation skip a dialect without a
    /// network round trip.
    fn supports(&self, dialect: Dialect) -> bool;

    /// Send one request and return the normalized reply.
    ///
    /// A capability mismatch must be reported as
    /// [`LlmError::DialectRejected`]; a missing reply as
    /// [`LlmError::Transport`].
    fn complete(
        &self,
        request: &ModelRequest,
    ) -> impl std::future::Future<Output = Result<ModelResponse, LlmError>> + Send;
}
