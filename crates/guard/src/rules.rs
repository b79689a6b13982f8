//! Policy rule model: the patterns the fallback checker enforces.

use serde::{Deserialize, Serialize};

/// A set of policy rules, evaluated in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in rules: credential exposure and security-abuse language.
    pub fn builtin() -> Self {
        let rules = [
            ("password-exposure", r#"password\s*[:=]\s*['"]?\S+"#, "Potential password exposure"),
            ("api-key-exposure", r#"api[_-]?key\s*[:=]\s*['"]?\S+"#, "Potential API key exposure"),
            ("secret-key-exposure", r#"secret[_-]?key\s*[:=]\s*['"]?\S+"#, "Potential secret key exposure"),
            ("hacking", r"\b(hack|hacking|hacked)\b", "Security violation: hacking"),
            (
                "exploitation",
                r"\bexploit\b.*\b(vulnerability|system|server|application)",
                "Security violation: exploitation",
            ),
            (
                "bypassing-security",
                r"\b(bypass|circumvent)\b.*\b(security|authentication|auth)",
                "Security violation: bypassing security",
            ),
            ("cracking", r"\bcrack\b.*\b(password|encryption|system)", "Security violation: cracking"),
            ("malicious-software", r"\b(backdoor|rootkit|malware)\b", "Security violation: malicious software"),
        ];

        Self {
            rules: rules
                .into_iter()
                .map(|(name, pattern, description)| PolicyRule {
                    name: name.into(),
                    pattern: pattern.into(),
                    description: description.into(),
                    enabled: true,
                })
                .collect(),
        }
    }

    /// Load rules from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, crate::RuleError> {
        let set: RuleSet = toml::from_str(toml_str)?;
        set.validate()?;
        Ok(set)
    }

    /// Append rules after the existing ones.
    pub fn extend(&mut self, other: RuleSet) {
        self.rules.extend(other.rules);
    }

    pub fn validate(&self) -> Result<(), crate::RuleError> {
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }

    /// Number of enabled rules.
    pub fn active_count(&self) -> usize {
        self.rules.iter().filter(|r| r.enabled).count()
    }
}

/// One case-insensitive pattern and the violation it reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,

    /// Regular expression, matched case-insensitively.
    pub pattern: String,

    /// Reported as `"<description> (found: N instance(s))"`.
    pub description: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl PolicyRule {
    pub fn validate(&self) -> Result<(), crate::RuleError> {
        if self.name.is_empty() {
            return Err(crate::RuleError::InvalidRule {
                name: "(empty)".into(),
                reason: "rule name cannot be empty".into(),
            });
        }
        if self.description.is_empty() {
            return Err(crate::RuleError::InvalidRule {
                name: self.name.clone(),
                reason: "rule description cannot be empty".into(),
            });
        }
        regex_lite::Regex::new(&self.pattern).map_err(|e| crate::RuleError::InvalidRule {
            name: self.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
