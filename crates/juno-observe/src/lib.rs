//! Observability setup for Juno: structured logging to stderr and optional
//! OpenTelemetry span export.

pub mod tracing_setup;
