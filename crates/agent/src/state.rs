//! Per-run conversation state and the phase transitions of the loop.
//!
//! The orchestrator owns one [`ConversationState`] per `run()`. Every
//! transition is decided by the pure functions at the bottom of this file,
//! so the routing rules can be tested without a reasoner.

use genaiops_core::message::Message;

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting on the reasoner for the next decision.
    Reasoning,
    /// Dispatching the tool calls of the last decision.
    ToolExecution,
    /// Done; `final_answer` is the result.
    Terminated,
}

/// Mutable state of a single run. Discarded when the run ends.
#[derive(Debug, Clone)]
pub struct ConversationState {
    /// Append-only message history.
    pub messages: Vec<Message>,
    /// Human-readable log of tool results, one entry per dispatched call.
    pub observations: String,
    /// Tool calls actually dispatched.
    pub tool_call_count: u32,
    /// Reasoning steps that yielded a decision (plus one for an input block).
    pub iteration_count: u32,
    pub max_iterations: u32,
    pub should_continue: bool,
    pub has_final_answer: bool,
    pub final_answer: String,
    pub phase: Phase,
}

impl ConversationState {
    /// Fresh state for a run. `max_iterations` is clamped to at least one.
    pub fn new(max_iterations: u32) -> Self {
        Self {
            messages: Vec::new(),
            observations: String::new(),
            tool_call_count: 0,
            iteration_count: 0,
            max_iterations: max_iterations.max(1),
            should_continue: true,
            has_final_answer: false,
            final_answer: String::new(),
            phase: Phase::Reasoning,
        }
    }

    /// Whether the input check is still due.
    pub fn is_first_iteration(&self) -> bool {
        self.iteration_count == 0
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Record one reasoning decision that requested tools.
    pub fn record_tool_request(&mut self, message: Message) {
        self.messages.push(message);
        self.iteration_count += 1;
        self.should_continue = true;
        self.has_final_answer = false;
    }

    /// Record one reasoning decision that produced final content.
    pub fn record_final_answer(&mut self, message: Message, answer: impl Into<String>) {
        self.messages.push(message);
        self.iteration_count += 1;
        self.finish(answer);
    }

    /// The input was refused before the reasoner ran. Counts as one step.
    pub fn record_input_block(&mut self, answer: impl Into<String>) {
        self.iteration_count += 1;
        self.finish(answer);
    }

    /// Append one tool result message and its observation line.
    pub fn record_tool_result(&mut self, message: Message, observation: &str) {
        self.messages.push(message);
        self.tool_call_count += 1;
        self.observations.push_str(observation);
        self.observations.push('\n');
    }

    /// End without a decision (reasoner failure or exhausted budget).
    pub fn abort(&mut self, answer: impl Into<String>) {
        self.finish(answer);
    }

    fn finish(&mut self, answer: impl Into<String>) {
        self.final_answer = answer.into();
        self.should_continue = false;
        self.has_final_answer = true;
        self.phase = Phase::Terminated;
    }

    pub fn budget_exhausted(&self) -> bool {
        budget_exhausted(self.iteration_count, self.max_iterations)
    }

    /// The last tool calls requested by the reasoner, if the newest message has any.
    pub fn pending_tool_calls(&self) -> &[genaiops_core::MessageToolCall] {
        self.messages
            .last()
            .map(|m| m.tool_calls.as_slice())
            .unwrap_or_default()
    }
}

pub fn budget_exhausted(iteration_count: u32, max_iterations: u32) -> bool {
    iteration_count >= max_iterations
}

/// Route after a reasoning step. Budget wins over pending tool calls.
pub fn route_after_reasoning(state: &ConversationState) -> Phase {
    if state.budget_exhausted() || state.has_final_answer {
        Phase::Terminated
    } else if state.should_continue {
        Phase::ToolExecution
    } else {
        Phase::Terminated
    }
}

/// Tool execution always hands back to the reasoner.
pub fn route_after_tools(_state: &ConversationState) -> Phase {
    Phase::Reasoning
}
