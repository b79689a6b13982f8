//! # genaiops Core
//!
//! Domain types, traits, and error definitions for the guarded ReAct agent.
//! This crate has **no transport dependencies**: it defines the model that
//! every other crate implements against.
//!
//! - [`Provider`] is the reasoner seam.
//! - [`Tool`] and [`ToolRegistry`] are the capability seam.
//! - [`RunObserver`] is the observability seam.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{GuardError, ProviderError, ToolError};
pub use event::{EventBus, GuardStage, ObserverSet, RunEvent, RunObserver, StopReason};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolRegistry, ToolResult, parse_arguments};
