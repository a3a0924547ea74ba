//! Observability setup for TaskPilot: tracing subscriber installation and
//! GenAI semantic-convention attribute names.

pub mod genai_attrs;
pub mod tracing_setup;
