//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! Logs go to stderr so that answers streamed on stdout stay clean.
//!
//! # Usage
//!
//! ```no_run
//! use juno_observe::tracing_setup::{LogFormat, init_tracing, shutdown_tracing};
//!
//! init_tracing("info,juno=debug", LogFormat::Pretty, false).unwrap();
//! // ... run ...
//! shutdown_tracing();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Shape of the log lines written to stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Build the level filter. A non-empty `RUST_LOG` value wins over `default`.
pub fn build_filter(rust_log: Option<&str>, default: &str) -> Result<EnvFilter, ParseError> {
    match rust_log.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives),
        None => EnvFilter::try_new(default),
    }
}

/// Initialize the global tracing subscriber.
///
/// `default_filter` applies unless `RUST_LOG` is set. When `enable_otel` is
/// true, spans are also bridged to OpenTelemetry with a stdout exporter.
///
/// # Errors
///
/// Returns an error if a filter directive is invalid or a global subscriber
/// was already installed.
pub fn init_tracing(
    default_filter: &str,
    format: LogFormat,
    enable_otel: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let env_filter = build_filter(rust_log.as_deref(), default_filter)?;

    let pretty_layer = (format == LogFormat::Pretty).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
    });
    let json_layer = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE)
    });

    let otel_layer = enable_otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("juno");
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending spans and shut down the OpenTelemetry tracer provider.
///
/// No-op when OTel was not enabled.
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
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_default_filter_applies_without_rust_log() {
        let filter = build_filter(None, "warn,juno=debug").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_rust_log_overrides_default() {
        let filter = build_filter(Some("trace"), "warn").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));

        let blank = build_filter(Some("  "), "error").unwrap();
        assert_eq!(blank.max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_invalid_directive_is_an_error() {
        assert!(build_filter(Some("juno=loud"), "warn").is_err());
    }

    #[test]
    fn test_shutdown_without_otel_is_noop() {
        shutdown_tracing();
    }
}
