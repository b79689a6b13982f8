//! Built-in tool implementations for the genaiops agent.
//!
//! - `security_policy_checker`: is a library approved for production?
//! - `cost_estimator`: monthly GPU inference cost for a model size.
//! - `internal_docs_search`: search internal DevOps documentation.

pub mod cost_estimator;
pub mod docs_search;
pub mod security_checker;

use genaiops_core::tool::ToolRegistry;
use std::sync::Arc;

pub use cost_estimator::CostEstimator;
pub use docs_search::{DocumentIndex, InternalDocsSearch, KeywordIndex};
pub use security_checker::{SecurityPolicyChecker, APPROVED_LIBRARIES};

/// Create a registry with the built-in tools.
///
/// The docs search tool is only registered when an index is supplied.
pub fn default_registry(
    approved_libraries: &[String],
    docs: Option<Arc<dyn DocumentIndex>>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SecurityPolicyChecker::new(approved_libraries.iter().cloned())));
    registry.register(Box::new(CostEstimator));
    if let Some(index) = docs {
        registry.register(Box::new(InternalDocsSearch::new(index)));
    }
    registry
}
