//! Thread-safe telemetry engine: collects run traces, keeps running
//! counters and exports everything as JSON.

use crate::TelemetryError;
use crate::model::*;
use chrono::Utc;
use std::path::Path;
use std::sync::RwLock;
use tracing::info;

/// Maximum traces kept in memory before the oldest finished ones are pruned.
const MAX_TRACES: usize = 5_000;

/// The core telemetry engine.
///
/// Thread-safe via `RwLock`. Every recorded span also feeds the running
/// counters, so metrics stay correct after old traces are pruned.
pub struct TelemetryEngine {
    traces: RwLock<Vec<Trace>>,
    totals: RwLock<RunningTotals>,
}

#[derive(Debug, Default)]
struct RunningTotals {
    runs: u64,
    run_errors: u64,
    run_duration_ms: u64,
    iterations: u64,
    reasoning_failures: u64,
    tool_calls: u64,
    tool_failures: u64,
    tool_duration_ms: u64,
    guard_checks: u64,
    guard_blocks: u64,
    input_tokens: u64,
    output_tokens: u64,
}

impl TelemetryEngine {
    pub fn new() -> Self {
        Self {
            traces: RwLock::new(Vec::new()),
            totals: RwLock::new(RunningTotals::default()),
        }
    }

    // ── Trace management ──────────────────────────────────────────────

    /// Start a trace for a run. Returns the trace id (the run id).
    pub fn start_trace(&self, run_id: impl Into<String>, query: impl Into<String>) -> String {
        let trace = Trace::new(run_id, query);
        let id = trace.id.clone();
        let mut traces = self.traces.write().unwrap();

        if traces.len() >= MAX_TRACES {
            let drain_count = MAX_TRACES / 10;
            let mut removed = 0;
            traces.retain(|t| {
                if removed >= drain_count {
                    return true;
                }
                if t.ended_at.is_some() {
                    removed += 1;
                    return false;
                }
                true
            });
        }

        traces.push(trace);
        id
    }

    /// Close a trace and count the run.
    pub fn end_trace(&self, trace_id: &str, outcome: RunOutcome) {
        let success = outcome.success;
        let duration = {
            let mut traces = self.traces.write().unwrap();
            let Some(trace) = traces.iter_mut().find(|t| t.id == trace_id) else {
                return;
            };
            trace.end(outcome);
            trace.spans[0].duration_ms.unwrap_or(0)
        };

        let mut totals = self.totals.write().unwrap();
        totals.runs += 1;
        totals.run_duration_ms += duration;
        if !success {
            totals.run_errors += 1;
        }
    }

    /// Record a completed span in a trace and update running totals.
    pub fn record_span(&self, trace_id: &str, span: Span) {
        {
            let mut totals = self.totals.write().unwrap();
            totals.input_tokens += span.input_tokens.unwrap_or(0) as u64;
            totals.output_tokens += span.output_tokens.unwrap_or(0) as u64;

            match span.kind {
                // A failed reasoning call produced no decision, so it is not an iteration
                SpanKind::Reasoning if span.success == Some(false) => totals.reasoning_failures += 1,
                SpanKind::Reasoning => totals.iterations += 1,
                SpanKind::ToolExecution => {
                    totals.tool_calls += 1;
                    totals.tool_duration_ms += span.duration_ms.unwrap_or(0);
                    if span.success == Some(false) {
                        totals.tool_failures += 1;
                    }
                }
                SpanKind::GuardCheck => {
                    totals.guard_checks += 1;
                    if span.success == Some(false) {
                        totals.guard_blocks += 1;
                    }
                }
                SpanKind::Run => {}
            }
        }

        let mut traces = self.traces.write().unwrap();
        if let Some(trace) = traces.iter_mut().find(|t| t.id == trace_id) {
            trace.add_span(span);
        }
    }

    // ── Queries ───────────────────────────────────────────────────────

    pub fn get_trace(&self, trace_id: &str) -> Option<Trace> {
        let traces = self.traces.read().unwrap();
        traces.iter().find(|t| t.id == trace_id).cloned()
    }

    /// List recent traces (most recent first).
    pub fn recent_traces(&self, limit: usize) -> Vec<Trace> {
        let traces = self.traces.read().unwrap();
        traces.iter().rev().take(limit).cloned().collect()
    }

    pub fn trace_count(&self) -> usize {
        self.traces.read().unwrap().len()
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let trace_count = self.trace_count() as u64;
        let totals = self.totals.read().unwrap();
        let avg = |sum: u64, n: u64| if n == 0 { 0.0 } else { sum as f64 / n as f64 };

        MetricsSnapshot {
            runs: totals.runs,
            run_errors: totals.run_errors,
            iterations: totals.iterations,
            reasoning_failures: totals.reasoning_failures,
            tool_calls: totals.tool_calls,
            tool_failures: totals.tool_failures,
            guard_checks: totals.guard_checks,
            guard_blocks: totals.guard_blocks,
            input_tokens: totals.input_tokens,
            output_tokens: totals.output_tokens,
            avg_run_duration_ms: avg(totals.run_duration_ms, totals.runs),
            avg_tool_duration_ms: avg(totals.tool_duration_ms, totals.tool_calls),
            trace_count,
        }
    }

    // ── Export ────────────────────────────────────────────────────────

    pub fn export_document(&self) -> ExportDocument {
        let traces = self.traces.read().unwrap().clone();
        ExportDocument {
            exported_at: Utc::now(),
            span_count: traces.iter().map(|t| t.spans.len()).sum(),
            metrics: self.metrics_snapshot(),
            traces,
        }
    }

    /// Write all traces to `path` as pretty JSON. Returns the span count.
    pub fn export_json(&self, path: &Path) -> Result<usize, TelemetryError> {
        let doc = self.export_document();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
        info!(path = %path.display(), spans = doc.span_count, "Telemetry exported");
        Ok(doc.span_count)
    }

    /// Drop all traces and counters.
    pub fn reset(&self) {
        self.traces.write().unwrap().clear();
        *self.totals.write().unwrap() = RunningTotals::default();
    }
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genaiops_core::StopReason;

    fn outcome(success: bool) -> RunOutcome {
        RunOutcome {
            success,
            stop_reason: if success { StopReason::FinalAnswer } else { StopReason::ReasonerFailure },
            iterations: 1,
            tool_calls: 1,
            error: (!success).then(|| "boom".to_string()),
        }
    }

    #[test]
    fn start_and_end_trace() {
        let engine = TelemetryEngine::new();
        let trace_id = engine.start_trace("run-1", "hello");
        assert_eq!(trace_id, "run-1");
        assert_eq!(engine.trace_count(), 1);

        engine.end_trace(&trace_id, outcome(true));
        let trace = engine.get_trace(&trace_id).unwrap();
        assert!(trace.ended_at.is_some());
        assert_eq!(engine.metrics_snapshot().runs, 1);
    }

    #[test]
    fn record_span_updates_totals() {
        let engine = TelemetryEngine::new();
        let trace_id = engine.start_trace("run-1", "q");

        let mut reasoning = Span::completed(SpanKind::Reasoning, "iteration 1", 30, true);
        reasoning.record_tokens(1000, 500);
        engine.record_span(&trace_id, reasoning);
        engine.record_span(&trace_id, Span::completed(SpanKind::ToolExecution, "cost_estimator", 10, true));
        engine.record_span(&trace_id, Span::completed(SpanKind::ToolExecution, "missing", 20, false));
        engine.record_span(&trace_id, Span::completed(SpanKind::GuardCheck, "guard.output", 1, false));
        engine.end_trace(&trace_id, outcome(false));

        let m = engine.metrics_snapshot();
        assert_eq!(m.iterations, 1);
        assert_eq!(m.tool_calls, 2);
        assert_eq!(m.tool_failures, 1);
        assert_eq!(m.guard_checks, 1);
        assert_eq!(m.guard_blocks, 1);
        assert_eq!(m.input_tokens, 1000);
        assert_eq!(m.output_tokens, 500);
        assert_eq!(m.run_errors, 1);
        assert!((m.avg_tool_duration_ms - 15.0).abs() < 1e-9);
    }

    #[test]
    fn spans_for_unknown_trace_still_count() {
        let engine = TelemetryEngine::new();
        engine.record_span("nope", Span::completed(SpanKind::Reasoning, "iteration 1", 1, true));
        assert_eq!(engine.metrics_snapshot().iterations, 1);
        assert_eq!(engine.trace_count(), 0);
    }

    #[test]
    fn recent_traces_newest_first() {
        let engine = TelemetryEngine::new();
        engine.start_trace("a", "1");
        engine.start_trace("b", "2");
        engine.start_trace("c", "3");
        let ids: Vec<String> = engine.recent_traces(2).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn export_writes_document() {
        let engine = TelemetryEngine::new();
        let id = engine.start_trace("run-1", "q");
        engine.record_span(&id, Span::completed(SpanKind::Reasoning, "iteration 1", 5, true));
        engine.end_trace(&id, outcome(true));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("trace.json");
        let spans = engine.export_json(&path).unwrap();
        assert_eq!(spans, 2);

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["span_count"], 2);
        assert_eq!(doc["traces"][0]["id"], "run-1");
        assert_eq!(doc["traces"][0]["outcome"]["stop_reason"], "final_answer");
        assert!(doc["exported_at"].is_string());
    }

    #[test]
    fn reset_clears_everything() {
        let engine = TelemetryEngine::new();
        let id = engine.start_trace("run-1", "q");
        engine.end_trace(&id, outcome(true));
        engine.reset();
        assert_eq!(engine.trace_count(), 0);
        assert_eq!(engine.metrics_snapshot().runs, 0);
    }
}
