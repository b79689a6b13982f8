//! Bridges orchestrator run events into the telemetry engine.

use crate::engine::TelemetryEngine;
use crate::model::{RunOutcome, Span, SpanKind};
use genaiops_core::{RunEvent, RunObserver};
use std::sync::Arc;

/// A [`RunObserver`] that turns every run into a [`Trace`](crate::Trace).
#[derive(Clone)]
pub struct TelemetryObserver {
    engine: Arc<TelemetryEngine>,
}

impl TelemetryObserver {
    pub fn new(engine: Arc<TelemetryEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<TelemetryEngine> {
        &self.engine
    }
}

impl RunObserver for TelemetryObserver {
    fn observe(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { run_id, query, .. } => {
                self.engine.start_trace(run_id.clone(), query.clone());
            }
            RunEvent::GuardChecked { run_id, stage, passed, reason, duration_ms } => {
                let mut span = Span::completed(SpanKind::GuardCheck, format!("guard.{stage}"), *duration_ms, *passed);
                if let Some(reason) = reason {
                    span = span.with_attribute("guard.reason", reason.clone());
                }
                self.engine.record_span(run_id, span);
            }
            // Spans are recorded whole when the step ends
            RunEvent::IterationStarted { .. } | RunEvent::ToolStarted { .. } => {}
            RunEvent::IterationCompleted { run_id, iteration, success, error, tool_calls_requested, usage, duration_ms } => {
                let mut span = Span::completed(SpanKind::Reasoning, format!("iteration {iteration}"), *duration_ms, *success)
                    .with_attribute("agent.iteration", *iteration)
                    .with_attribute("agent.tool_calls_requested", *tool_calls_requested);
                if let Some(error) = error {
                    span = span.with_attribute("reasoner.error", error.clone());
                }
                if let Some(usage) = usage {
                    span.record_tokens(usage.prompt_tokens, usage.completion_tokens);
                }
                self.engine.record_span(run_id, span);
            }
            RunEvent::ToolExecuted { run_id, iteration, call_id, tool_name, success, error, duration_ms } => {
                let mut span = Span::completed(SpanKind::ToolExecution, tool_name.clone(), *duration_ms, *success)
                    .with_attribute("agent.iteration", *iteration)
                    .with_attribute("tool.call_id", call_id.clone());
                if let Some(error) = error {
                    span = span.with_attribute("tool.error", error.clone());
                }
                self.engine.record_span(run_id, span);
            }
            RunEvent::RunCompleted { run_id, success, stop_reason, iterations, tool_calls, error, .. } => {
                self.engine.end_trace(
                    run_id,
                    RunOutcome {
                        success: *success,
                        stop_reason: *stop_reason,
                        iterations: *iterations,
                        tool_calls: *tool_calls,
                        error: error.clone(),
                    },
                );
            }
        }
    }
}
