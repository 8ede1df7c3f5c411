//! Rule row to rule document conversion.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::RuleKey;
use super::markup::MarkupRenderer;
use super::model::{DescriptionFormat, RuleDocument, RuleRow, RuleType, Severity};
use crate::error::TransformError;

/// Converts [`RuleRow`]s into [`RuleDocument`]s.
///
/// Pure apart from the renderer, which must be pure as well: converting the same
/// row twice yields equal documents.
#[derive(Clone)]
pub struct RuleDocumentTransform {
    renderer: Arc<dyn MarkupRenderer>,
}

impl fmt::Debug for RuleDocumentTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDocumentTransform").finish_non_exhaustive()
    }
}

impl RuleDocumentTransform {
    /// Creates a transform rendering non-HTML descriptions with `renderer`.
    pub fn new(renderer: Arc<dyn MarkupRenderer>) -> Self {
        Self { renderer }
    }

    /// Converts one row.
    ///
    /// A null severity reads as `INFO`, a null template flag as `false` and null
    /// timestamps as 0. A null or unknown rule type fails the row.
    pub fn transform(&self, row: &RuleRow) -> Result<RuleDocument, TransformError> {
        let key = row.key();

        let html_description = match (&row.description, &row.description_format) {
            (Some(description), Some(format)) => Some(self.describe(description, format)?),
            _ => None,
        };

        let template_key = match (&row.template_repository_key, &row.template_rule_key) {
            (Some(repository), Some(rule)) => {
                Some(RuleKey::new(repository.as_str(), rule.as_str()).to_string())
            }
            _ => None,
        };

        Ok(RuleDocument {
            key: key.to_string(),
            rule_key: row.rule_key.clone(),
            repository: row.repository_key.clone(),
            name: row.name.clone(),
            html_description,
            severity: Severity::from_ordinal(row.severity.unwrap_or(0))?,
            status: row.status.clone(),
            is_template: row.is_template.unwrap_or(false),
            all_tags: union_tags(row.tags.as_deref(), row.system_tags.as_deref()),
            template_key,
            internal_key: row.internal_key.clone(),
            language: row.language.clone(),
            rule_type: RuleType::from_db_constant(row.rule_type.unwrap_or(0))?,
            created_at: row.created_at.unwrap_or(0),
            updated_at: row.updated_at.unwrap_or(0),
        })
    }

    fn describe(&self, description: &str, format: &str) -> Result<String, TransformError> {
        match format.parse::<DescriptionFormat>()? {
            DescriptionFormat::Html => Ok(description.to_string()),
            DescriptionFormat::Markdown => Ok(self.renderer.render(description)?),
        }
    }
}

/// Splits a comma-separated tag list: entries are trimmed and empty ones dropped.
pub fn split_tags(tags: Option<&str>) -> impl Iterator<Item = &str> {
    tags.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Union of two comma-separated tag lists.
pub fn union_tags(tags: Option<&str>, system_tags: Option<&str>) -> BTreeSet<String> {
    split_tags(tags)
        .chain(split_tags(system_tags))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::rules::RuleMarkdown;

    fn transform() -> RuleDocumentTransform {
        RuleDocumentTransform::new(Arc::new(RuleMarkdown::new().unwrap()))
    }

    fn row() -> RuleRow {
        RuleRow {
            rule_key: "S100".to_string(),
            repository_key: "java".to_string(),
            name: Some("Method names should comply with a naming convention".to_string()),
            description: Some("**Rename** it".to_string()),
            description_format: Some("MARKDOWN".to_string()),
            severity: Some(1),
            status: Some("READY".to_string()),
            is_template: Some(false),
            tags: Some("a, b".to_string()),
            system_tags: Some("b,c".to_string()),
            template_rule_key: None,
            template_repository_key: None,
            internal_key: Some("S100".to_string()),
            language: Some("java".to_string()),
            rule_type: Some(1),
            created_at: Some(1_500_000_000_000),
            updated_at: Some(1_600_000_000_000),
        }
    }

    #[test]
    fn test_full_row() {
        let doc = transform().transform(&row()).unwrap();
        assert_eq!(doc.key, "java:S100");
        assert_eq!(doc.rule_key, "S100");
        assert_eq!(doc.repository, "java");
        assert_eq!(doc.html_description.as_deref(), Some("<strong>Rename</strong> it"));
        assert_eq!(doc.severity, Severity::Minor);
        assert_eq!(doc.rule_type, RuleType::CodeSmell);
        assert_eq!(
            doc.all_tags,
            ["a", "b", "c"].into_iter().map(String::from).collect()
        );
        assert_eq!(doc.template_key, None);
        assert_eq!(doc.created_at, 1_500_000_000_000);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let t = transform();
        assert_eq!(t.transform(&row()).unwrap(), t.transform(&row()).unwrap());
    }

    #[test]
    fn test_html_passes_through() {
        let row = RuleRow {
            description: Some("<p>**kept**</p>".to_string()),
            description_format: Some("HTML".to_string()),
            ..row()
        };
        let doc = transform().transform(&row).unwrap();
        assert_eq!(doc.html_description.as_deref(), Some("<p>**kept**</p>"));
    }

    #[test]
    fn test_description_absent_when_either_part_is_null() {
        let no_format = RuleRow {
            description_format: None,
            ..row()
        };
        let no_text = RuleRow {
            description: None,
            ..row()
        };
        assert_eq!(transform().transform(&no_format).unwrap().html_description, None);
        assert_eq!(transform().transform(&no_text).unwrap().html_description, None);
    }

    #[test]
    fn test_template_key_requires_both_parts() {
        let both = RuleRow {
            template_repository_key: Some("java".to_string()),
            template_rule_key: Some("XPath".to_string()),
            ..row()
        };
        let repo_only = RuleRow {
            template_repository_key: Some("java".to_string()),
            ..row()
        };
        let rule_only = RuleRow {
            template_rule_key: Some("XPath".to_string()),
            ..row()
        };
        assert_eq!(
            transform().transform(&both).unwrap().template_key.as_deref(),
            Some("java:XPath")
        );
        assert_eq!(transform().transform(&repo_only).unwrap().template_key, None);
        assert_eq!(transform().transform(&rule_only).unwrap().template_key, None);
    }

    #[test]
    fn test_null_columns_use_defaults() {
        let row = RuleRow {
            name: None,
            severity: None,
            status: None,
            is_template: None,
            tags: None,
            system_tags: None,
            created_at: None,
            updated_at: None,
            ..row()
        };
        let doc = transform().transform(&row).unwrap();
        assert_eq!(doc.name, None);
        assert_eq!(doc.severity, Severity::Info);
        assert!(!doc.is_template);
        assert!(doc.all_tags.is_empty());
        assert_eq!(doc.updated_at, 0);
    }

    #[test]
    fn test_unknown_values_fail() {
        let t = transform();
        let bad_type = RuleRow {
            rule_type: None,
            ..row()
        };
        let bad_severity = RuleRow {
            severity: Some(7),
            ..row()
        };
        let bad_format = RuleRow {
            description_format: Some("WIKI".to_string()),
            ..row()
        };
        assert_eq!(
            t.transform(&bad_type),
            Err(TransformError::UnknownRuleType(0))
        );
        assert_eq!(
            t.transform(&bad_severity),
            Err(TransformError::UnknownSeverity(7))
        );
        assert_eq!(
            t.transform(&bad_format),
            Err(TransformError::UnknownDescriptionFormat("WIKI".to_string()))
        );
    }

    #[test]
    fn test_renderer_failure() {
        let failing = |_: &str| -> Result<String, RenderError> {
            Err(RenderError {
                line: 3,
                message: "boom".to_string(),
            })
        };
        let t = RuleDocumentTransform::new(Arc::new(failing));
        assert!(matches!(
            t.transform(&row()),
            Err(TransformError::Render(RenderError { line: 3, .. }))
        ));
    }

    #[test]
    fn test_tag_union_is_commutative() {
        assert_eq!(
            union_tags(Some("x,y"), Some(" z ,,x")),
            union_tags(Some(" z ,,x"), Some("x,y"))
        );
        assert_eq!(
            union_tags(Some("a, b,a"), Some("b,c")),
            ["a", "b", "c"].into_iter().map(String::from).collect()
        );
        assert_eq!(split_tags(Some(" , ,")).count(), 0);
        assert_eq!(split_tags(None).count(), 0);
    }
}
