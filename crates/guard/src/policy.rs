//! Deterministic policy checker: the fallback evaluator.
//!
//! Runs every enabled rule against the text, counts non-overlapping matches
//! and reports one violation per rule that fired. Pure and idempotent:
//! the same text always yields the same verdict.

use crate::rules::{PolicyRule, RuleSet};
use regex_lite::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One rule that fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub description: String,
    pub count: usize,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (found: {} instance(s))", self.description, self.count)
    }
}

/// The outcome of checking one text against the rule set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub violations: Vec<Violation>,
}

impl PolicyVerdict {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// All violations joined with `"; "`, or `None` when nothing fired.
    pub fn reason(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }
        Some(
            self.violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

struct CompiledRule {
    name: String,
    description: String,
    regex: Regex,
}

/// The policy checker.
///
/// Holds the compiled rules; immutable once built, so it is shared freely.
pub struct PolicyChecker {
    rules: Vec<CompiledRule>,
}

impl PolicyChecker {
    /// Create a checker from a rule set. Disabled rules are skipped.
    pub fn new(set: RuleSet) -> Result<Self, crate::RuleError> {
        let rules = Self::compile(&set)?;
        info!(rules = rules.len(), "Policy rules compiled");
        Ok(Self { rules })
    }

    /// Checker with the built-in rules.
    pub fn builtin() -> Self {
        Self::new(RuleSet::builtin()).expect("built-in policy rules compile")
    }

    /// Number of compiled (enabled) rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Names of the active rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.name.clone()).collect()
    }

    pub fn check(&self, text: &str) -> PolicyVerdict {
        if text.is_empty() {
            return PolicyVerdict::default();
        }

        let violations: Vec<Violation> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let count = rule.regex.find_iter(text).count();
                (count > 0).then(|| Violation {
                    rule: rule.name.clone(),
                    description: rule.description.clone(),
                    count,
                })
            })
            .collect();

        if violations.is_empty() {
            debug!("Policy check passed");
        } else {
            for v in &violations {
                warn!(rule = %v.rule, count = v.count, "Policy violation: {}", v.description);
            }
        }

        PolicyVerdict { violations }
    }

    fn compile(set: &RuleSet) -> Result<Vec<CompiledRule>, crate::RuleError> {
        set.rules
            .iter()
            .filter(|r| r.enabled)
            .map(Self::compile_rule)
            .collect()
    }

    fn compile_rule(rule: &PolicyRule) -> Result<CompiledRule, crate::RuleError> {
        rule.validate()?;
        let regex = RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| crate::RuleError::InvalidRule {
                name: rule.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(CompiledRule {
            name: rule.name.clone(),
            description: rule.description.clone(),
            regex,
        })
    }
}

impl Default for PolicyChecker {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_exposure_is_flagged() {
        let checker = PolicyChecker::builtin();
        let verdict = checker.check("password: hunter2");
        assert!(!verdict.passed());
        assert_eq!(
            verdict.reason().unwrap(),
            "Potential password exposure (found: 1 instance(s))"
        );
    }

    #[test]
    fn credential_question_without_value_passes() {
        let checker = PolicyChecker::builtin();
        assert!(checker.check("What is the API key for production?").passed());
    }

    #[test]
    fn api_key_assignment_is_flagged() {
        let checker = PolicyChecker::builtin();
        let verdict = checker.check("set API_KEY=abc123 in the env");
        assert_eq!(verdict.violations[0].rule, "api-key-exposure");
    }

    #[test]
    fn matching_is_case_insensitive_and_counted() {
        let checker = PolicyChecker::builtin();
        let verdict = checker.check("HACK the planet, they hacked it, hacking again");
        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.violations[0].count, 3);
        assert!(verdict.reason().unwrap().contains("found: 3 instance(s)"));
    }

    #[test]
    fn multiple_violations_join_in_rule_order() {
        let checker = PolicyChecker::builtin();
        let verdict = checker.check("install a rootkit after you hack in with password=letmein");
        assert_eq!(
            verdict.reason().unwrap(),
            "Potential password exposure (found: 1 instance(s)); \
             Security violation: hacking (found: 1 instance(s)); \
             Security violation: malicious software (found: 1 instance(s))"
        );
    }

    #[test]
    fn word_boundaries_are_respected() {
        let checker = PolicyChecker::builtin();
        assert!(checker.check("Shackleton explored Antarctica").passed());
        assert!(checker.check("how do I exploit this vulnerability").violations.len() == 1);
        assert!(checker.check("exploit\nthe server").passed());
    }

    #[test]
    fn bypass_and_crack_rules() {
        let checker = PolicyChecker::builtin();
        let v = checker.check("Can I bypass authentication and crack the password?");
        let rules: Vec<&str> = v.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["bypassing-security", "cracking"]);
    }

    #[test]
    fn empty_text_passes() {
        assert!(PolicyChecker::builtin().check("").passed());
    }

    #[test]
    fn check_is_idempotent() {
        let checker = PolicyChecker::builtin();
        let a = checker.check("password: hunter2 and malware");
        let b = checker.check("password: hunter2 and malware");
        assert_eq!(a.violations, b.violations);
    }

    #[test]
    fn custom_rule_set_replaces_builtin() {
        assert_eq!(PolicyChecker::builtin().rule_count(), 8);
        let set = RuleSet::from_toml(
            r#"
[[rules]]
name = "only"
pattern = "forbidden"
description = "Forbidden word"
"#,
        )
        .unwrap();
        let checker = PolicyChecker::new(set).unwrap();
        assert_eq!(checker.rule_names(), vec!["only"]);
        assert!(checker.check("password: hunter2").passed());
        assert!(!checker.check("FORBIDDEN").passed());
    }
}
