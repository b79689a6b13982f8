//! The Guard: input and output safety checks for a run.
//!
//! The fallback [`PolicyChecker`] always runs. When a primary evaluator is
//! configured and initialized it runs first; the text is blocked if either
//! of them flags it. A primary that errors is skipped for that call only.

use crate::policy::PolicyChecker;
use crate::primary::{
    contains_block_phrase, GuardContext, PrimaryEvaluator, INPUT_BLOCK_PHRASES,
    OUTPUT_BLOCK_PHRASES,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub const PRIMARY_INPUT_REASON: &str = "Input blocked by primary safety policy";
pub const PRIMARY_OUTPUT_REASON: &str = "Output flagged by primary safety policy";

/// Name reported for the fallback evaluator.
pub const FALLBACK_NAME: &str = "PolicyChecker";

/// Pass/block outcome of one guard check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardDecision {
    pub passed: bool,
    pub reason: Option<String>,
}

impl GuardDecision {
    pub fn pass() -> Self {
        Self { passed: true, reason: None }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self { passed: false, reason: Some(reason.into()) }
    }
}

/// Snapshot of how the guard is currently evaluating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardStatus {
    /// A primary evaluator was supplied
    pub primary_configured: bool,
    pub primary_name: Option<String>,
    /// The primary evaluator initialized and is consulted on every check
    pub primary_enabled: bool,
    /// Only the fallback rules are deciding
    pub using_fallback: bool,
    pub fallback: String,
    pub fallback_rules: usize,
}

pub struct Guard {
    fallback: PolicyChecker,
    primary: Option<Arc<dyn PrimaryEvaluator>>,
    primary_ready: OnceCell<bool>,
}

impl Guard {
    pub fn new(fallback: PolicyChecker) -> Self {
        Self {
            fallback,
            primary: None,
            primary_ready: OnceCell::new(),
        }
    }

    /// Guard using only the built-in fallback rules.
    pub fn fallback_only() -> Self {
        Self::new(PolicyChecker::builtin())
    }

    pub fn with_primary(mut self, primary: Arc<dyn PrimaryEvaluator>) -> Self {
        self.primary = Some(primary);
        self
    }

    pub fn fallback(&self) -> &PolicyChecker {
        &self.fallback
    }

    /// Initialize the primary evaluator if there is one.
    ///
    /// Runs the initialization once; concurrent callers wait for the first.
    /// Returns whether the primary is usable.
    pub async fn ensure_initialized(&self) -> bool {
        let Some(primary) = &self.primary else {
            return false;
        };
        *self
            .primary_ready
            .get_or_init(|| async {
                match primary.initialize().await {
                    Ok(()) => {
                        info!(evaluator = %primary.name(), "Primary safety evaluator enabled");
                        true
                    }
                    Err(e) => {
                        warn!(evaluator = %primary.name(), error = %e, "Primary safety evaluator unavailable, using fallback rules only");
                        false
                    }
                }
            })
            .await
    }

    /// Whether the primary evaluator is active.
    pub fn is_enabled(&self) -> bool {
        self.primary_ready.get().copied().unwrap_or(false)
    }

    pub fn status(&self) -> GuardStatus {
        let enabled = self.is_enabled();
        GuardStatus {
            primary_configured: self.primary.is_some(),
            primary_name: self.primary.as_ref().map(|p| p.name().to_string()),
            primary_enabled: enabled,
            using_fallback: !enabled,
            fallback: FALLBACK_NAME.to_string(),
            fallback_rules: self.fallback.rule_count(),
        }
    }

    pub async fn check_input(&self, text: &str) -> GuardDecision {
        if text.trim().is_empty() {
            return GuardDecision::pass();
        }

        let mut reasons = Vec::new();
        if let Some(primary) = self.active_primary().await {
            match primary.evaluate_input(text).await {
                Ok(verdict) if contains_block_phrase(&verdict, INPUT_BLOCK_PHRASES) => {
                    warn!(evaluator = "primary", "Input blocked");
                    reasons.push(PRIMARY_INPUT_REASON.to_string());
                }
                Ok(_) => debug!(evaluator = "primary", "Input passed"),
                Err(e) => warn!(error = %e, "Primary input check failed, relying on fallback"),
            }
        }

        if let Some(reason) = self.fallback.check(text).reason() {
            warn!(evaluator = "fallback", "Input blocked: {reason}");
            reasons.push(reason);
        }

        decide(reasons)
    }

    pub async fn check_output(&self, text: &str, context: Option<&GuardContext>) -> GuardDecision {
        if text.trim().is_empty() {
            return GuardDecision::pass();
        }

        let mut reasons = Vec::new();
        if let Some(primary) = self.active_primary().await {
            match primary.evaluate_output(text, context).await {
                Ok(verdict) if contains_block_phrase(&verdict, OUTPUT_BLOCK_PHRASES) => {
                    warn!(evaluator = "primary", "Output flagged");
                    reasons.push(PRIMARY_OUTPUT_REASON.to_string());
                }
                Ok(_) => debug!(evaluator = "primary", "Output passed"),
                Err(e) => warn!(error = %e, "Primary output check failed, relying on fallback"),
            }
        }

        if let Some(reason) = self.fallback.check(text).reason() {
            warn!(evaluator = "fallback", "Output flagged: {reason}");
            reasons.push(reason);
        }

        decide(reasons)
    }

    async fn active_primary(&self) -> Option<&Arc<dyn PrimaryEvaluator>> {
        let primary = self.primary.as_ref()?;
        self.ensure_initialized().await.then_some(primary)
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::fallback_only()
    }
}

fn decide(reasons: Vec<String>) -> GuardDecision {
    if reasons.is_empty() {
        GuardDecision::pass()
    } else {
        GuardDecision::block(reasons.join("; "))
    }
}
