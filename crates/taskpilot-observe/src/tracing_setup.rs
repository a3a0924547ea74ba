//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! use taskpilot_observe::tracing_setup::{TracingOptions, init_tracing};
//!
//! init_tracing(&TracingOptions::default()).unwrap();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::genai_attrs::is_model_call_span;

/// Env var that turns on the OpenTelemetry stdout exporter.
pub const OTEL_ENV: &str = "TASKPILOT_OTEL";

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// How the subscriber is assembled.
#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
    /// Bridge model-call spans to OpenTelemetry (stdout exporter).
    pub otel: bool,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
            json: false,
            otel: otel_requested(),
        }
    }
}

/// Filter directive for a CLI verbosity level.
///
/// `quiet` wins over any `-v` count.
pub fn filter_for_verbosity(verbose: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => "warn",
        1 => "info,taskpilot_core=info,taskpilot_infra=info",
        2 => "info,taskpilot_core=debug,taskpilot_infra=debug",
        _ => "debug,sqlx=info,hyper=info,reqwest=debug",
    }
    .to_string()
}

/// Whether `TASKPILOT_OTEL` asks for trace export.
pub fn otel_requested() -> bool {
    std::env::var(OTEL_ENV).is_ok_and(|value| matches!(value.trim(), "1" | "true" | "yes"))
}

/// Initialize the global tracing subscriber.
///
/// - Always writes to stderr so stdout stays clean for `--json` output.
/// - `RUST_LOG` overrides `options.filter` when set.
/// - With `options.otel`, model-call spans are additionally exported
///   through OpenTelemetry to stdout.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or the global
/// subscriber has already been set.
pub fn init_tracing(options: &TracingOptions) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)?,
        _ => EnvFilter::try_new(&options.filter)?,
    };

    let text_layer = (!options.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let json_layer = options.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
    });

    let otel_layer = if options.otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("taskpilot");

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        Some(
            tracing_opentelemetry::layer()
                .with_tracer(tracer)
                .with_filter(filter_fn(|meta| {
                    !meta.is_span() || is_model_call_span(meta.name())
                })),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// Safe to call even when OTel was not enabled (no-op in that case).
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_overrides_verbose() {
        assert_eq!(filter_for_verbosity(3, true), "error");
    }

    #[test]
    fn test_verbosity_levels_parse() {
        for level in 0..4 {
            let filter = filter_for_verbosity(level, false);
            assert!(EnvFilter::try_new(&filter).is_ok(), "bad filter: {filter}");
        }
        assert_eq!(filter_for_verbosity(0, false), "warn");
    }

    #[test]
    fn test_shutdown_without_otel_is_noop() {
        shutdown_tracing();
    }
}
