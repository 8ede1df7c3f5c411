//! Rule natural key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Natural key of a rule: the repository providing it and its key within the
/// repository. Displayed and parsed as `repository:rule`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleKey {
    repository: String,
    rule: String,
}

/// A string is not a valid `repository:rule` key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid rule key '{0}', expected 'repository:rule'")]
pub struct ParseRuleKeyError(String);

impl RuleKey {
    /// Creates a key.
    pub fn new(repository: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            rule: rule.into(),
        }
    }

    /// Returns the repository key (`rules.plugin_name`).
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the rule key within the repository (`rules.plugin_rule_key`).
    pub fn rule(&self) -> &str {
        &self.rule
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.rule)
    }
}

impl FromStr for RuleKey {
    type Err = ParseRuleKeyError;

    /// Splits on the first `:`; the rule part may itself contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((repository, rule)) if !repository.is_empty() && !rule.is_empty() => {
                Ok(Self::new(repository, rule))
            }
            _ => Err(ParseRuleKeyError(s.to_string())),
        }
    }
}
