//! The guarded reason → act → observe loop.
//!
//! ```text
//!  query ──► check_input ──► Reasoning ──(tool calls)──► ToolExecution
//!                │              ▲  │                          │
//!             blocked           │  └─(final content)──► check_output ──► Terminated
//!                │              └───────────────────────────┘
//!                ▼
//!           Terminated
//! ```
//!
//! The loop never panics on a misbehaving collaborator: reasoner errors end
//! the run with `success = false`, tool failures are folded back into the
//! conversation, and the iteration budget is a hard cap.

use crate::prompts::{self, NO_ANSWER, OUTPUT_REFUSAL, SYSTEM_PROMPT, TOOL_CALL_PLACEHOLDER};
use crate::state::{ConversationState, Phase, route_after_reasoning, route_after_tools};
use chrono::Utc;
use genaiops_core::event::{GuardStage, ObserverSet, RunEvent, RunObserver, StopReason};
use genaiops_core::message::Message;
use genaiops_core::provider::{Provider, ProviderRequest};
use genaiops_core::tool::ToolRegistry;
use genaiops_guard::{Guard, GuardContext, GuardDecision};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// The outcome of one `run()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    /// Final answer, refusal, sentinel, or `Error: …` text.
    pub answer: String,
    /// Tool calls actually dispatched.
    pub tool_calls: u32,
    /// Reasoning steps taken.
    pub iterations: u32,
    /// One line per dispatched tool call.
    pub observations: String,
    /// False only when the reasoner failed.
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stop_reason: StopReason,
}

/// Drives runs against one reasoner, tool registry and guard.
///
/// Cheap to share: every collaborator is behind an `Arc`, and each `run()`
/// creates its own [`ConversationState`].
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    guard: Arc<Guard>,
    max_iterations: u32,
    system_prompt: String,
    observers: ObserverSet,
}

struct Termination {
    stop_reason: StopReason,
    error: Option<String>,
}

impl Termination {
    fn ok(stop_reason: StopReason) -> Self {
        Self { stop_reason, error: None }
    }
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        guard: Arc<Guard>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: genaiops_core::provider::default_temperature(),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            tools,
            guard,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: SYSTEM_PROMPT.to_string(),
            observers: ObserverSet::new(),
        }
    }

    /// Set the iteration budget. Values below one are raised to one.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Add an observer. Observers see every run event in emission order.
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers = self.observers.with(observer);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn guard(&self) -> &Arc<Guard> {
        &self.guard
    }

    /// Answer one query.
    ///
    /// Never returns an error: failures are reported through
    /// [`RunResult::success`] and [`RunResult::error`].
    pub async fn run(&self, query: &str) -> RunResult {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let mut state = ConversationState::new(self.max_iterations);

        info!(run_id = %run_id, max_iterations = state.max_iterations, "Run starting");
        self.observers.observe(&RunEvent::RunStarted {
            run_id: run_id.clone(),
            query: query.to_string(),
            max_iterations: state.max_iterations,
            timestamp: Utc::now(),
        });

        let termination = self.drive(&run_id, query, &mut state).await;
        let success = termination.error.is_none();
        let duration_ms = started.elapsed().as_millis() as u64;

        if success {
            info!(
                run_id = %run_id,
                iterations = state.iteration_count,
                tool_calls = state.tool_call_count,
                stop_reason = %termination.stop_reason,
                "Run completed"
            );
        } else {
            warn!(run_id = %run_id, stop_reason = %termination.stop_reason, "Run failed");
        }

        self.observers.observe(&RunEvent::RunCompleted {
            run_id: run_id.clone(),
            success,
            stop_reason: termination.stop_reason,
            iterations: state.iteration_count,
            tool_calls: state.tool_call_count,
            error: termination.error.clone(),
            duration_ms,
            timestamp: Utc::now(),
        });

        RunResult {
            run_id,
            answer: state.final_answer,
            tool_calls: state.tool_call_count,
            iterations: state.iteration_count,
            observations: state.observations,
            success,
            error: termination.error,
            stop_reason: termination.stop_reason,
        }
    }

    async fn drive(&self, run_id: &str, query: &str, state: &mut ConversationState) -> Termination {
        loop {
            match state.phase {
                Phase::Reasoning => {
                    if state.is_first_iteration() {
                        let decision = self
                            .checked(run_id, GuardStage::Input, self.guard.check_input(query))
                            .await;
                        if !decision.passed {
                            let reason = decision.reason.unwrap_or_default();
                            state.record_input_block(prompts::input_refusal(&reason));
                            return Termination::ok(StopReason::InputBlocked);
                        }
                        state.push(Message::system(self.system_prompt.clone()));
                        state.push(Message::user(query));
                    }

                    if state.budget_exhausted() {
                        state.abort(NO_ANSWER);
                        return Termination::ok(StopReason::IterationBudget);
                    }

                    if let Some(termination) = self.reason(run_id, query, state).await {
                        return termination;
                    }
                }
                Phase::ToolExecution => {
                    self.execute_tools(run_id, state).await;
                    state.phase = route_after_tools(state);
                }
                // `reason` returns as soon as it terminates the state.
                Phase::Terminated => return Termination::ok(StopReason::IterationBudget),
            }
        }
    }

    /// One reasoning step. Returns `Some` when the run is over.
    async fn reason(&self, run_id: &str, query: &str, state: &mut ConversationState) -> Option<Termination> {
        let iteration = state.iteration_count + 1;
        info!(run_id = %run_id, iteration, "Reasoning");

        let mut request = ProviderRequest::new(self.model.clone(), state.messages.clone());
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request.tools = self.tools.definitions();

        debug!(
            messages = request.messages.len(),
            tools = ?self.tools.names(),
            "Preparing reasoner call"
        );

        self.observers.observe(&RunEvent::IterationStarted {
            run_id: run_id.to_string(),
            iteration,
        });

        let started = Instant::now();
        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(run_id = %run_id, iteration, error = %e, "Reasoner call failed");
                self.observers.observe(&RunEvent::IterationCompleted {
                    run_id: run_id.to_string(),
                    iteration,
                    success: false,
                    error: Some(e.to_string()),
                    tool_calls_requested: 0,
                    usage: None,
                    duration_ms: started.elapsed().as_millis() as u64,
                });
                state.abort(format!("Error: {e}"));
                return Some(Termination {
                    stop_reason: StopReason::ReasonerFailure,
                    error: Some(e.to_string()),
                });
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let Message { content, tool_calls, .. } = response.message;
        self.observers.observe(&RunEvent::IterationCompleted {
            run_id: run_id.to_string(),
            iteration,
            success: true,
            error: None,
            tool_calls_requested: tool_calls.len(),
            usage: response.usage,
            duration_ms,
        });

        if !tool_calls.is_empty() {
            info!(run_id = %run_id, count = tool_calls.len(), "Reasoner requested tool call(s)");
            for tc in &tool_calls {
                debug!(id = %tc.id, tool = %tc.name, arguments = %tc.arguments, "Requested tool call");
            }
            let content = if content.trim().is_empty() {
                TOOL_CALL_PLACEHOLDER.to_string()
            } else {
                content
            };
            state.record_tool_request(Message::assistant_with_tool_calls(content, tool_calls));
            state.phase = route_after_reasoning(state);
            if state.phase == Phase::Terminated {
                info!(run_id = %run_id, max_iterations = state.max_iterations, "Iteration budget reached");
                state.abort(NO_ANSWER);
                return Some(Termination::ok(StopReason::IterationBudget));
            }
            return None;
        }

        info!(run_id = %run_id, iteration, "Reasoner provided final answer");
        let context = GuardContext::for_query(query);
        let decision = self
            .checked(run_id, GuardStage::Output, self.guard.check_output(&content, Some(&context)))
            .await;

        let (answer, stop_reason) = if !decision.passed {
            (OUTPUT_REFUSAL.to_string(), StopReason::OutputBlocked)
        } else if content.trim().is_empty() {
            (NO_ANSWER.to_string(), StopReason::FinalAnswer)
        } else {
            (content, StopReason::FinalAnswer)
        };
        debug!(answer = %answer, "Final answer");

        state.record_final_answer(Message::assistant(answer.clone()), answer);
        Some(Termination::ok(stop_reason))
    }

    /// Dispatch every pending call in request order, one at a time.
    async fn execute_tools(&self, run_id: &str, state: &mut ConversationState) {
        let iteration = state.iteration_count;
        let calls = state.pending_tool_calls().to_vec();

        for call in calls {
            info!(run_id = %run_id, tool = %call.name, "Executing tool");
            self.observers.observe(&RunEvent::ToolStarted {
                run_id: run_id.to_string(),
                iteration,
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
            });
            let started = Instant::now();
            let result = self.tools.execute(&call.name, &call.arguments).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            if result.success {
                info!(tool = %call.name, duration_ms, "✓ Tool succeeded");
            } else {
                warn!(tool = %call.name, error = ?result.error, "✗ Tool failed");
            }

            let content = serde_json::to_string(&result).unwrap_or_else(|e| {
                serde_json::json!({"success": false, "data": null, "error": e.to_string()}).to_string()
            });
            let observation = prompts::observation(&call.name, &result);
            state.record_tool_result(Message::tool_result(call.id.clone(), call.name.clone(), content), &observation);

            self.observers.observe(&RunEvent::ToolExecuted {
                run_id: run_id.to_string(),
                iteration,
                call_id: call.id,
                tool_name: call.name,
                success: result.success,
                error: result.error,
                duration_ms,
            });
        }
    }

    /// Run a guard check and report it to observers.
    async fn checked(
        &self,
        run_id: &str,
        stage: GuardStage,
        check: impl std::future::Future<Output = GuardDecision>,
    ) -> GuardDecision {
        let started = Instant::now();
        let decision = check.await;
        if !decision.passed {
            warn!(run_id = %run_id, stage = %stage, reason = ?decision.reason, "Guard blocked");
        }
        self.observers.observe(&RunEvent::GuardChecked {
            run_id: run_id.to_string(),
            stage,
            passed: decision.passed,
            reason: decision.reason.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        decision
    }
}
