//! Configuration of the reset engines.
//!
//! The defaults match a fresh installation: the reserved rows a reset must keep,
//! and the indexes whose backing tables `reset_data` truncates.

use serde::{Deserialize, Serialize};

/// Key of the organization created at installation time.
pub const DEFAULT_ORGANIZATION_KEY: &str = "default-organization";

/// Login of the administrator account created at installation time.
pub const ADMIN_LOGIN: &str = "admin";

/// Internal property holding the uuid of the default organization.
pub const DEFAULT_ORGANIZATION_PROPERTY: &str = "organization.default";

/// Plugin name of rules authored by hand rather than provided by a plugin.
pub const MANUAL_RULE_PLUGIN: &str = "manual";

/// Rows that survive every reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedRows {
    /// `organizations.kee` of the organization to keep.
    #[serde(default = "default_organization_key")]
    pub default_organization_key: String,

    /// `users.login` of the account to keep.
    #[serde(default = "default_admin_login")]
    pub admin_login: String,

    /// `internal_properties.kee` of the property to keep.
    #[serde(default = "default_organization_property")]
    pub default_organization_property: String,

    /// `rules.plugin_name` marking manually authored rules, deleted by `reset_data`.
    #[serde(default = "default_manual_rule_plugin")]
    pub manual_rule_plugin: String,
}

fn default_organization_key() -> String {
    DEFAULT_ORGANIZATION_KEY.to_string()
}

fn default_admin_login() -> String {
    ADMIN_LOGIN.to_string()
}

fn default_organization_property() -> String {
    DEFAULT_ORGANIZATION_PROPERTY.to_string()
}

fn default_manual_rule_plugin() -> String {
    MANUAL_RULE_PLUGIN.to_string()
}

impl Default for ReservedRows {
    fn default() -> Self {
        Self {
            default_organization_key: default_organization_key(),
            admin_login: default_admin_login(),
            default_organization_property: default_organization_property(),
            manual_rule_plugin: default_manual_rule_plugin(),
        }
    }
}

/// What `reset_data` clears besides the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetDataConfig {
    /// Indexes backed by tables that `reset_data` truncates.
    #[serde(default = "default_reset_indexes")]
    pub indexes: Vec<String>,
}

fn default_reset_indexes() -> Vec<String> {
    ["issues", "views", "projectmeasures", "components"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ResetDataConfig {
    fn default() -> Self {
        Self {
            indexes: default_reset_indexes(),
        }
    }
}

/// Configuration for [`BackendCleanup`](crate::cleanup::BackendCleanup).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Rows kept by every reset.
    #[serde(default)]
    pub reserved: ReservedRows,

    /// Scope of `reset_data`.
    #[serde(default)]
    pub reset_data: ResetDataConfig,
}
