//! Error types for the genaiops domain.
//!
//! Uses `thiserror`. Each bounded context has its own error type; the
//! binary adds context with `anyhow`.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool panicked: {tool_name}: {message}")]
    Panicked { tool_name: String, message: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, Error)]
pub enum GuardError {
    #[error("Primary evaluator unavailable: {0}")]
    Unavailable(String),

    #[error("Primary evaluator failed: {0}")]
    EvaluationFailed(String),
}

impl From<ProviderError> for GuardError {
    fn from(err: ProviderError) -> Self {
        GuardError::EvaluationFailed(err.to_string())
    }
}
