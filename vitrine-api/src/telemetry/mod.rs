//! VITRINE Telemetry
//!
//! Structured logging for the API process via `tracing-subscriber`.

pub mod tracer;

pub use tracer::{init_tracing, TelemetryConfig};
