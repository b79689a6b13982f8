//! Data model for run traces, spans and aggregated metrics.

use chrono::{DateTime, Duration, Utc};
use genaiops_core::StopReason;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Span ──────────────────────────────────────────────────────────────────

/// The kind of work a span represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// Top-level run (query → final answer).
    Run,
    /// One reasoning step.
    Reasoning,
    /// A tool execution.
    ToolExecution,
    /// An input or output guard check.
    GuardCheck,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::Reasoning => write!(f, "reasoning"),
            Self::ToolExecution => write!(f, "tool_execution"),
            Self::GuardCheck => write!(f, "guard_check"),
        }
    }
}

/// A single traced execution unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// Unique identifier.
    pub id: String,
    /// Parent span id (None for root spans).
    pub parent_id: Option<String>,
    /// What kind of work this represents.
    pub kind: SpanKind,
    /// Human-readable label (e.g. tool name, "guard.input").
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    /// Prompt tokens (reasoning spans).
    pub input_tokens: Option<u32>,
    /// Completion tokens (reasoning spans).
    pub output_tokens: Option<u32>,
    pub success: Option<bool>,
    /// Arbitrary attributes.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Span {
    /// Create a new open span with the given kind and label.
    pub fn new(kind: SpanKind, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: None,
            kind,
            label: label.into(),
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            input_tokens: None,
            output_tokens: None,
            success: None,
            attributes: serde_json::Map::new(),
        }
    }

    /// A span for work that already finished `duration_ms` ago.
    pub fn completed(kind: SpanKind, label: impl Into<String>, duration_ms: u64, success: bool) -> Self {
        let ended = Utc::now();
        let mut span = Self::new(kind, label);
        span.started_at = ended - Duration::milliseconds(duration_ms as i64);
        span.ended_at = Some(ended);
        span.duration_ms = Some(duration_ms);
        span.success = Some(success);
        span
    }

    /// Set the parent span.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    /// Mark the span as ended with the given success status.
    pub fn end(&mut self, success: bool) {
        let now = Utc::now();
        self.ended_at = Some(now);
        self.duration_ms = Some(
            now.signed_duration_since(self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.success = Some(success);
    }

    pub fn record_tokens(&mut self, input: u32, output: u32) {
        self.input_tokens = Some(input);
        self.output_tokens = Some(output);
    }

    /// Total tokens (input + output), or 0 if not recorded.
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.unwrap_or(0) + self.output_tokens.unwrap_or(0)
    }
}

// ── Trace ─────────────────────────────────────────────────────────────────

/// How a traced run ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub stop_reason: StopReason,
    pub iterations: u32,
    pub tool_calls: u32,
    pub error: Option<String>,
}

/// All spans of one run. The first span is always the open/closed `Run` root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// Trace id; equal to the orchestrator's run id.
    pub id: String,
    pub query: String,
    pub spans: Vec<Span>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: Option<RunOutcome>,
}

impl Trace {
    /// Create a new trace with its root span.
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        let root = Span::new(SpanKind::Run, "agent.run");
        Self {
            id: id.into(),
            query: query.into(),
            started_at: root.started_at,
            spans: vec![root],
            ended_at: None,
            outcome: None,
        }
    }

    pub fn root_span_id(&self) -> &str {
        &self.spans[0].id
    }

    /// Add a span under the root.
    pub fn add_span(&mut self, span: Span) {
        let root = self.root_span_id().to_string();
        self.spans.push(span.with_parent(root));
    }

    /// Close the root span and record the outcome.
    pub fn end(&mut self, outcome: RunOutcome) {
        self.spans[0].end(outcome.success);
        self.ended_at = self.spans[0].ended_at;
        self.outcome = Some(outcome);
    }

    /// Total tokens across all spans.
    pub fn total_tokens(&self) -> u32 {
        self.spans.iter().map(|s| s.total_tokens()).sum()
    }

    pub fn count(&self, kind: SpanKind) -> usize {
        self.spans.iter().filter(|s| s.kind == kind).count()
    }
}

// ── Aggregated views ──────────────────────────────────────────────────────

/// Running counters across all runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub runs: u64,
    pub run_errors: u64,
    pub iterations: u64,
    pub reasoning_failures: u64,
    pub tool_calls: u64,
    pub tool_failures: u64,
    pub guard_checks: u64,
    pub guard_blocks: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub avg_run_duration_ms: f64,
    pub avg_tool_duration_ms: f64,
    pub trace_count: u64,
}

/// The document written by `TelemetryEngine::export_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub span_count: usize,
    pub metrics: MetricsSnapshot,
    pub traces: Vec<Trace>,
}
