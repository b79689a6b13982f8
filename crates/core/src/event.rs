//! Run events and the observer seam.
//!
//! The orchestrator reports every lifecycle step of a run as a [`RunEvent`]
//! to a [`RunObserver`]. Observers are a side channel: they cannot fail and
//! they cannot influence control flow. Telemetry, live CLI output and tests
//! all plug in here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use crate::provider::Usage;

/// Which boundary a guard check ran at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardStage {
    Input,
    Output,
}

impl std::fmt::Display for GuardStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardStage::Input => write!(f, "input"),
            GuardStage::Output => write!(f, "output"),
        }
    }
}

/// Why a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The reasoner produced final content and it passed the output check
    FinalAnswer,
    /// The input check refused the query
    InputBlocked,
    /// The output check replaced the answer with a refusal
    OutputBlocked,
    /// The iteration budget ran out
    IterationBudget,
    /// The reasoner call failed
    ReasonerFailure,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::FinalAnswer => "final_answer",
            StopReason::InputBlocked => "input_blocked",
            StopReason::OutputBlocked => "output_blocked",
            StopReason::IterationBudget => "iteration_budget",
            StopReason::ReasonerFailure => "reasoner_failure",
        };
        write!(f, "{s}")
    }
}

/// Everything an observer can see about a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        query: String,
        max_iterations: u32,
        timestamp: DateTime<Utc>,
    },

    GuardChecked {
        run_id: String,
        stage: GuardStage,
        passed: bool,
        reason: Option<String>,
        duration_ms: u64,
    },

    /// The reasoner is about to be called
    IterationStarted {
        run_id: String,
        iteration: u32,
    },

    /// A reasoning step ended. `success` is false when the reasoner call
    /// failed; that step produced no decision.
    IterationCompleted {
        run_id: String,
        iteration: u32,
        success: bool,
        error: Option<String>,
        tool_calls_requested: usize,
        usage: Option<Usage>,
        duration_ms: u64,
    },

    ToolStarted {
        run_id: String,
        iteration: u32,
        call_id: String,
        tool_name: String,
    },

    ToolExecuted {
        run_id: String,
        iteration: u32,
        call_id: String,
        tool_name: String,
        success: bool,
        error: Option<String>,
        duration_ms: u64,
    },

    RunCompleted {
        run_id: String,
        success: bool,
        stop_reason: StopReason,
        iterations: u32,
        tool_calls: u32,
        error: Option<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> &str {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::GuardChecked { run_id, .. }
            | RunEvent::IterationStarted { run_id, .. }
            | RunEvent::IterationCompleted { run_id, .. }
            | RunEvent::ToolStarted { run_id, .. }
            | RunEvent::ToolExecuted { run_id, .. }
            | RunEvent::RunCompleted { run_id, .. } => run_id,
        }
    }
}

/// Receives run events. Implementations must not block for long.
pub trait RunObserver: Send + Sync {
    fn observe(&self, event: &RunEvent);
}

/// Fans one event stream out to several observers, in order.
///
/// An empty set is the null observer: events are dropped.
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn RunObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl RunObserver for ObserverSet {
    fn observe(&self, event: &RunEvent) {
        for observer in &self.observers {
            observer.observe(event);
        }
    }
}

/// A broadcast-based event bus for run events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub, so a CLI or a
/// test can follow a run live without touching the orchestrator.
pub struct EventBus {
    sender: broadcast::Sender<Arc<RunEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: RunEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RunEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl RunObserver for EventBus {
    fn observe(&self, event: &RunEvent) {
        self.publish(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl RunObserver for Recorder {
        fn observe(&self, event: &RunEvent) {
            self.0.lock().unwrap().push(event.run_id().to_string());
        }
    }

    fn tool_event(run_id: &str) -> RunEvent {
        RunEvent::ToolExecuted {
            run_id: run_id.into(),
            iteration: 1,
            call_id: "call_1".into(),
            tool_name: "cost_estimator".into(),
            success: true,
            error: None,
            duration_ms: 42,
        }
    }

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.observe(&tool_event("run-1"));

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            RunEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "cost_estimator");
                assert!(success);
            }
            _ => panic!("Expected ToolExecuted event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(tool_event("run-1"));
    }

    #[test]
    fn observer_set_fans_out() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let set = ObserverSet::new().with(a.clone()).with(b.clone());
        set.observe(&tool_event("run-7"));
        assert_eq!(set.len(), 2);
        assert_eq!(a.0.lock().unwrap().as_slice(), ["run-7"]);
        assert_eq!(b.0.lock().unwrap().as_slice(), ["run-7"]);
    }

    #[test]
    fn empty_observer_set_drops_events() {
        let set = ObserverSet::new();
        assert!(set.is_empty());
        set.observe(&tool_event("run-0"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(tool_event("run-1")).unwrap();
        assert_eq!(json["type"], "tool_executed");
        assert_eq!(StopReason::IterationBudget.to_string(), "iteration_budget");
    }
}
