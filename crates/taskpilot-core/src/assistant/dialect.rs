//! Function-calling dialect negotiation.
//!
//! An ordered list of dialect strategies. Each one either answers or
//! reports "not applicable, try next"; any other failure stops the chain.

use tracing::{Instrument, debug, info, info_span};

use taskpilot_types::llm::{Dialect, LlmError, ModelRequest, ModelResponse};
use taskpilot_types::settings::FunctionCallingMode;

use crate::llm::box_client::BoxModelClient;

/// Dialects to try, in order, for a negotiation mode.
pub fn negotiation_plan(mode: FunctionCallingMode, text_fallback: bool) -> Vec<Dialect> {
    let mut plan = match mode {
        FunctionCallingMode::Auto => vec![Dialect::Tools, Dialect::Functions],
        FunctionCallingMode::Tools => vec![Dialect::Tools],
        FunctionCallingMode::Functions => vec![Dialect::Functions],
        FunctionCallingMode::Disabled => return vec![Dialect::Text],
    };
    if text_fallback {
        plan.push(Dialect::Text);
    }
    plan
}

/// A reply together with the dialect that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub dialect: Dialect,
    pub response: ModelResponse,
}

/// Outcome of a single strategy.
#[derive(Debug)]
pub enum Attempt {
    Answered(Exchange),
    NotApplicable { dialect: Dialect, reason: String },
}

/// Outcome of a whole negotiation.
#[derive(Debug, Default)]
pub struct Negotiation {
    /// `None` when every strategy was not applicable.
    pub exchange: Option<Exchange>,
    /// Dialects that were skipped, with the reason.
    pub skipped: Vec<(Dialect, String)>,
}

impl Negotiation {
    /// Whether a structured dialect was skipped before the answer.
    pub fn fell_back(&self) -> bool {
        self.skipped.iter().any(|(dialect, _)| dialect.is_structured())
    }
}

/// One dialect attempt.
pub struct DialectStrategy {
    dialect: Dialect,
}

impl DialectStrategy {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Try this dialect. Wire formats that lack it are skipped without a
    /// network call.
    pub async fn attempt(
        &self,
        client: &BoxModelClient,
        request: &ModelRequest,
    ) -> Result<Attempt, LlmError> {
        if !client.supports(self.dialect) {
            return Ok(Attempt::NotApplicable {
                dialect: self.dialect,
                reason: format!("{} does not offer this dialect", client.wire_format()),
            });
        }

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = client.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.dialect = %self.dialect,
        );

        match client.complete(request).instrument(span).await {
            Ok(response) => Ok(Attempt::Answered(Exchange {
                dialect: self.dialect,
                response,
            })),
            Err(LlmError::DialectRejected { dialect, message }) => {
                Ok(Attempt::NotApplicable { dialect, reason: message })
            }
            Err(e) => Err(e),
        }
    }
}

/// Run the strategies in `plan` until one answers.
///
/// `build_request` is called once per attempted dialect so each request
/// carries the prompt and tool schema for that dialect.
pub async fn negotiate<F>(
    client: &BoxModelClient,
    plan: &[Dialect],
    build_request: F,
) -> Result<Negotiation, LlmError>
where
    F: Fn(Dialect) -> ModelRequest,
{
    let mut negotiation = Negotiation::default();

    for strategy in plan.iter().copied().map(DialectStrategy::new) {
        let request = build_request(strategy.dialect());
        match strategy.attempt(client, &request).await? {
            Attempt::Answered(exchange) => {
                debug!(dialect = %exchange.dialect, "Dialect answered");
                negotiation.exchange = Some(exchange);
                return Ok(negotiation);
            }
            Attempt::NotApplicable { dialect, reason } => {
                info!(%dialect, reason = %reason, "Dialect not applicable, trying next");
                negotiation.skipped.push((dialect, reason));
            }
        }
    }

    Ok(negotiation)
}
