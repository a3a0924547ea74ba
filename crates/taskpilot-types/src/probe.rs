//! Result of the function-calling diagnostic probe.

use serde::{Deserialize, Serialize};

use crate::llm::Dialect;
use crate::settings::FunctionCallingMode;

/// What the probe observed when asking the configured endpoint to create tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// A structured call was detected and at least one task was created.
    pub success: bool,
    pub message: String,
    /// The function-calling mode the probe ran with.
    pub mode: FunctionCallingMode,
    /// Dialect of the exchange that produced the final answer.
    pub dialect: Option<Dialect>,
    pub function_called: bool,
    pub function_name: Option<String>,
    pub tasks_created: usize,
    pub raw_response_sample: Option<String>,
    pub recommendations: Vec<String>,
}
