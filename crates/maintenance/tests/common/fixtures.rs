//! Rule fixtures.

/// A rule row to insert.
#[derive(Debug, Clone)]
pub struct RuleFixture {
    pub repository: String,
    pub rule_key: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub description_format: Option<String>,
    pub severity: Option<i64>,
    pub status: Option<String>,
    pub is_template: bool,
    pub system_tags: Option<String>,
    /// (repository, rule key) of an already inserted template.
    pub template: Option<(String, String)>,
    pub internal_key: Option<String>,
    pub language: Option<String>,
    pub rule_type: Option<i64>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl RuleFixture {
    /// Creates a ready, major code smell with a markup description.
    pub fn new(repository: impl Into<String>, rule_key: impl Into<String>) -> Self {
        let rule_key = rule_key.into();
        Self {
            repository: repository.into(),
            name: Some(format!("Rule {}", rule_key)),
            description: Some(format!("Description of *{}*", rule_key)),
            description_format: Some("MARKDOWN".to_string()),
            severity: Some(2),
            status: Some("READY".to_string()),
            is_template: false,
            system_tags: None,
            template: None,
            internal_key: None,
            language: Some("java".to_string()),
            rule_type: Some(1),
            created_at: Some(1_500_000_000_000),
            updated_at: Some(1_600_000_000_000),
            rule_key,
        }
    }

    /// Sets the description and its format.
    pub fn with_description(mut self, description: &str, format: &str) -> Self {
        self.description = Some(description.to_string());
        self.description_format = Some(format.to_string());
        self
    }

    /// Sets the system tags.
    pub fn with_system_tags(mut self, tags: &str) -> Self {
        self.system_tags = Some(tags.to_string());
        self
    }

    /// Marks the rule as a template.
    pub fn as_template(mut self) -> Self {
        self.is_template = true;
        self
    }

    /// Sets the template of the rule.
    pub fn with_template(mut self, repository: &str, rule_key: &str) -> Self {
        self.template = Some((repository.to_string(), rule_key.to_string()));
        self
    }

    /// Sets the stored severity ordinal.
    pub fn with_severity(mut self, severity: i64) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Sets the stored rule type.
    pub fn with_rule_type(mut self, rule_type: Option<i64>) -> Self {
        self.rule_type = rule_type;
        self
    }
}
