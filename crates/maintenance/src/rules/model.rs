//! Rule rows as read from the store and rule documents as written to the index.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RuleKey;
use crate::error::TransformError;
use crate::index::IndexDocument;

/// Rule severity, stored as an ordinal in `rules.priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Severity {
    Info,
    Minor,
    Major,
    Critical,
    Blocker,
}

impl Severity {
    /// All severities, ordered by ordinal.
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Minor,
        Severity::Major,
        Severity::Critical,
        Severity::Blocker,
    ];

    /// Resolves a stored ordinal.
    pub fn from_ordinal(ordinal: i64) -> Result<Self, TransformError> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(TransformError::UnknownSeverity(ordinal))
    }

    /// Returns the stored ordinal.
    pub fn ordinal(self) -> i64 {
        self as i64
    }

    /// Returns the name used in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Minor => "MINOR",
            Severity::Major => "MAJOR",
            Severity::Critical => "CRITICAL",
            Severity::Blocker => "BLOCKER",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule type, stored as an integer in `rules.rule_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum RuleType {
    CodeSmell,
    Bug,
    Vulnerability,
}

impl RuleType {
    /// Resolves a stored value. Zero and anything above 3 have no type.
    pub fn from_db_constant(value: i64) -> Result<Self, TransformError> {
        match value {
            1 => Ok(RuleType::CodeSmell),
            2 => Ok(RuleType::Bug),
            3 => Ok(RuleType::Vulnerability),
            other => Err(TransformError::UnknownRuleType(other)),
        }
    }

    /// Returns the stored value.
    pub fn db_constant(self) -> i64 {
        match self {
            RuleType::CodeSmell => 1,
            RuleType::Bug => 2,
            RuleType::Vulnerability => 3,
        }
    }

    /// Returns the name used in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            RuleType::CodeSmell => "CODE_SMELL",
            RuleType::Bug => "BUG",
            RuleType::Vulnerability => "VULNERABILITY",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format of a stored rule description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionFormat {
    /// Stored as HTML, indexed as is.
    Html,
    /// Stored as markup, rendered to HTML before indexing.
    Markdown,
}

impl FromStr for DescriptionFormat {
    type Err = TransformError;

    /// Format tags are matched exactly (`HTML`, `MARKDOWN`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTML" => Ok(DescriptionFormat::Html),
            "MARKDOWN" => Ok(DescriptionFormat::Markdown),
            other => Err(TransformError::UnknownDescriptionFormat(other.to_string())),
        }
    }
}

/// One row of the rule scroll. Nullable columns are `None` when null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleRow {
    /// `rules.plugin_rule_key`.
    pub rule_key: String,
    /// `rules.plugin_name`.
    pub repository_key: String,
    /// Display name.
    pub name: Option<String>,
    /// Raw description, in `description_format`.
    pub description: Option<String>,
    /// Format tag of the description.
    pub description_format: Option<String>,
    /// Severity ordinal (`rules.priority`).
    pub severity: Option<i64>,
    /// Lifecycle status (`READY`, `BETA`, `DEPRECATED`, `REMOVED`).
    pub status: Option<String>,
    /// Whether the rule is a template for custom rules.
    pub is_template: Option<bool>,
    /// Tags set by the tenant (`rules_metadata.tags`), comma separated.
    pub tags: Option<String>,
    /// Tags set by the rule provider (`rules.system_tags`), comma separated.
    pub system_tags: Option<String>,
    /// Rule key of the template, null when the rule has no template.
    pub template_rule_key: Option<String>,
    /// Repository of the template, null when the rule has no template.
    pub template_repository_key: Option<String>,
    /// Engine-specific key (`rules.plugin_config_key`).
    pub internal_key: Option<String>,
    /// Language key.
    pub language: Option<String>,
    /// Rule type constant.
    pub rule_type: Option<i64>,
    /// Creation time, epoch millis.
    pub created_at: Option<i64>,
    /// Last update time, epoch millis.
    pub updated_at: Option<i64>,
}

impl RuleRow {
    /// Returns the natural key of the row.
    pub fn key(&self) -> RuleKey {
        RuleKey::new(self.repository_key.as_str(), self.rule_key.as_str())
    }
}

/// Denormalized rule as stored in the rules index.
///
/// Every field is always serialized; absent values are written as `null` or an
/// empty array, never omitted.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDocument {
    /// `repository:rule`, also the document id.
    pub key: String,
    pub rule_key: String,
    pub repository: String,
    pub name: Option<String>,
    pub html_description: Option<String>,
    pub severity: Severity,
    pub status: Option<String>,
    pub is_template: bool,
    pub all_tags: BTreeSet<String>,
    pub template_key: Option<String>,
    pub internal_key: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub created_at: i64,
    pub updated_at: i64,
}

impl RuleDocument {
    /// Returns the document id.
    pub fn id(&self) -> &str {
        &self.key
    }

    /// Converts the document into an index write.
    pub fn to_index_document(&self) -> Result<IndexDocument, serde_json::Error> {
        Ok(IndexDocument::new(self.key.clone(), serde_json::to_value(self)?))
    }
}
