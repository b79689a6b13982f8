//! Primary evaluator: an optional model-backed safety oracle.
//!
//! The primary evaluator returns free text; the [`Guard`](crate::Guard)
//! decides by scanning that text for refusal phrases. Any error it returns
//! is treated as "no opinion" by the guard.

use async_trait::async_trait;
use genaiops_core::{GuardError, Message, Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, info};

/// Phrases in a primary verdict that mean the input should be refused.
pub const INPUT_BLOCK_PHRASES: &[&str] = &[
    "cannot help with that",
    "cannot provide",
    "cannot assist",
    "against our policies",
    "not appropriate",
    "i'm not able to",
];

/// Phrases in a primary verdict that mean the output should be withheld.
pub const OUTPUT_BLOCK_PHRASES: &[&str] = &[
    "not safe",
    "inappropriate",
    "violates",
    "should not",
    "cannot be shared",
];

/// Does `verdict` contain any of `phrases` (case-insensitive)?
pub fn contains_block_phrase(verdict: &str, phrases: &[&str]) -> bool {
    let lower = verdict.to_lowercase();
    phrases.iter().any(|p| lower.contains(p))
}

/// Extra information available when checking an answer.
#[derive(Debug, Clone, Default)]
pub struct GuardContext {
    /// The query the answer responds to
    pub query: Option<String>,
}

impl GuardContext {
    pub fn for_query(query: impl Into<String>) -> Self {
        Self { query: Some(query.into()) }
    }
}

#[async_trait]
pub trait PrimaryEvaluator: Send + Sync {
    fn name(&self) -> &str;

    /// Prepare the evaluator. Called at most once per guard.
    async fn initialize(&self) -> Result<(), GuardError>;

    /// Free-text verdict on a user input.
    async fn evaluate_input(&self, text: &str) -> Result<String, GuardError>;

    /// Free-text verdict on a generated answer.
    async fn evaluate_output(
        &self,
        text: &str,
        context: Option<&GuardContext>,
    ) -> Result<String, GuardError>;
}

pub const DEFAULT_RAILS_PROMPT: &str = "You are a safety reviewer for an enterprise operations assistant. \
Decide whether the conversation is safe to continue. \
If the user asks for credentials, help with hacking, malware, or bypassing security controls, \
reply with \"I cannot help with that\" and a short reason. \
If an assistant response is unsafe or discloses secrets, reply that it is not safe and why. \
Otherwise reply with \"OK\".";

/// Primary evaluator backed by any chat [`Provider`].
pub struct ProviderSafetyEvaluator {
    provider: Arc<dyn Provider>,
    model: String,
    system_prompt: String,
    max_tokens: u32,
}

impl ProviderSafetyEvaluator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: DEFAULT_RAILS_PROMPT.to_string(),
            max_tokens: 256,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    async fn ask(&self, messages: Vec<Message>) -> Result<String, GuardError> {
        let mut request = ProviderRequest::new(&self.model, messages);
        request.temperature = 0.0;
        request.max_tokens = Some(self.max_tokens);
        let response = self.provider.complete(request).await?;
        debug!(provider = %self.provider.name(), "Primary evaluator responded");
        Ok(response.message.content)
    }
}

#[async_trait]
impl PrimaryEvaluator for ProviderSafetyEvaluator {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn initialize(&self) -> Result<(), GuardError> {
        match self.provider.health_check().await {
            Ok(true) => {
                info!(provider = %self.provider.name(), model = %self.model, "Primary safety evaluator ready");
                Ok(())
            }
            Ok(false) => Err(GuardError::Unavailable(format!(
                "provider '{}' failed its health check",
                self.provider.name()
            ))),
            Err(e) => Err(GuardError::Unavailable(e.to_string())),
        }
    }

    async fn evaluate_input(&self, text: &str) -> Result<String, GuardError> {
        self.ask(vec![Message::system(&self.system_prompt), Message::user(text)])
            .await
    }

    async fn evaluate_output(
        &self,
        text: &str,
        context: Option<&GuardContext>,
    ) -> Result<String, GuardError> {
        let mut instruction = String::from("Check if the following response is safe");
        if let Some(query) = context.and_then(|c| c.query.as_deref()) {
            instruction.push_str(&format!("\nOriginal question: {query}"));
        }
        self.ask(vec![
            Message::system(&self.system_prompt),
            Message::user(instruction),
            Message::assistant(text),
        ])
        .await
    }
}
