//! Guard: safety checks at the edges of an agent run.
//!
//! Every query is checked before the reasoner sees it, and every final answer
//! is checked before the caller does.
//!
//! # Architecture
//!
//! ```text
//!   text ──▶ ┌───────────────────┐   verdict phrases
//!            │ Primary evaluator │ ──────────────┐
//!            │ (optional, model) │               │
//!            └───────────────────┘               ▼
//!            ┌───────────────────┐        ┌─────────────┐
//!   text ──▶ │  PolicyChecker    │ ─────▶ │ GuardDecision│
//!            │  (regex rules)    │        │ pass / block │
//!            └───────────────────┘        └─────────────┘
//! ```
//!
//! # Custom rules
//!
//! ```toml
//! [[rules]]
//! name = "internal-hostnames"
//! pattern = '\bcorp\.internal\b'
//! description = "Internal hostname disclosure"
//! ```

mod guard;
mod policy;
mod primary;
mod rules;

pub use guard::{Guard, GuardDecision, GuardStatus, FALLBACK_NAME, PRIMARY_INPUT_REASON, PRIMARY_OUTPUT_REASON};
pub use policy::{PolicyChecker, PolicyVerdict, Violation};
pub use primary::{
    contains_block_phrase, GuardContext, PrimaryEvaluator, ProviderSafetyEvaluator,
    DEFAULT_RAILS_PROMPT, INPUT_BLOCK_PHRASES, OUTPUT_BLOCK_PHRASES,
};
pub use rules::{PolicyRule, RuleSet};

/// Errors from loading policy rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("invalid policy rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    #[error("rule file error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Load a rule file and append it to the built-in rules.
pub fn load_rules_file(path: &std::path::Path) -> Result<RuleSet, RuleError> {
    let contents = std::fs::read_to_string(path)?;
    let mut set = RuleSet::builtin();
    set.extend(RuleSet::from_toml(&contents)?);
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rules_file_appends_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(
            &path,
            "[[rules]]\nname = \"codename\"\npattern = 'project\\s+falcon'\ndescription = \"Codename disclosure\"\n",
        )
        .unwrap();

        let set = load_rules_file(&path).unwrap();
        assert_eq!(set.rules.len(), 9);
        let checker = PolicyChecker::new(set).unwrap();
        assert!(!checker.check("Tell me about Project  Falcon").passed());
    }

    #[test]
    fn missing_rules_file_is_io_error() {
        let err = load_rules_file(std::path::Path::new("/nonexistent/rules.toml")).unwrap_err();
        assert!(matches!(err, RuleError::IoError(_)));
    }
}
