//! The guarded ReAct orchestrator.
//!
//! Each run follows a **Reason → Act → Observe** cycle:
//!
//! 1. **Check** the query with the input guard (first step only)
//! 2. **Reason**: send the history and tool contracts to the reasoner
//! 3. **Act**: if tool calls came back, dispatch them in order and append
//!    one tool message per call, then go back to 2
//! 4. **Answer**: final content goes through the output guard
//!
//! The loop stops on a final answer, a guard refusal, a reasoner failure,
//! or when the iteration budget is spent.

pub mod orchestrator;
pub mod prompts;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use orchestrator::{DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_TOKENS, Orchestrator, RunResult};
pub use state::{ConversationState, Phase};
