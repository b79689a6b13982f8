//! Run tracing and metrics for the genaiops agent.
//!
//! Every orchestrator run becomes a [`Trace`]: a root `Run` span with one
//! child span per guard check, reasoning step and tool execution. Running
//! counters mirror the classic agent metrics (iterations, tool calls,
//! guard blocks) and everything can be exported to a JSON file.

pub mod engine;
pub mod model;
pub mod observer;

pub use engine::TelemetryEngine;
pub use model::{ExportDocument, MetricsSnapshot, RunOutcome, Span, SpanKind, Trace};
pub use observer::TelemetryObserver;

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
