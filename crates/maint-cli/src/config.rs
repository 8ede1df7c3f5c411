//! Command line configuration for the maintenance binary.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MAINT_DATABASE` | platform.db | SQLite database file |
//! | `MAINT_ELASTICSEARCH_NODES` | http://localhost:9200 | Comma-separated ES node URLs |
//! | `MAINT_ELASTICSEARCH_INDEX_PREFIX` | (none) | Index name prefix |
//! | `MAINT_ELASTICSEARCH_USERNAME` | (none) | Basic auth username |
//! | `MAINT_ELASTICSEARCH_PASSWORD` | (none) | Basic auth password |
//! | `MAINT_DEFAULT_ORGANIZATION` | default-organization | Organization kept by resets |
//! | `MAINT_ADMIN_LOGIN` | admin | User kept by resets |
//! | `MAINT_LOG_LEVEL` | info | Log level |
//! | `MAINT_TENANT` | (required by `index-rules`) | Organization whose rule tags are indexed |
//! | `MAINT_BATCH_SIZE` | 500 | Documents per bulk request |

use clap::{Parser, Subcommand};

use backend_maintenance::config::{CleanupConfig, ReservedRows};
use backend_maintenance::index::elasticsearch::{ElasticsearchAuth, ElasticsearchConfig};
use backend_maintenance::rules::{RuleIndexerConfig, RuleKey};

/// Resets the relational store and the search index, and reindexes rules.
#[derive(Debug, Clone, Parser)]
#[command(name = "backend-maint")]
#[command(about = "Backend reset and rule reindexing")]
#[command(version)]
pub struct MaintenanceCli {
    /// SQLite database file.
    #[arg(long, env = "MAINT_DATABASE", default_value = "platform.db")]
    pub database: String,

    /// Elasticsearch node URLs (comma-separated).
    #[arg(
        long,
        env = "MAINT_ELASTICSEARCH_NODES",
        default_value = "http://localhost:9200"
    )]
    pub elasticsearch_nodes: String,

    /// Prefix of the managed index names.
    #[arg(long, env = "MAINT_ELASTICSEARCH_INDEX_PREFIX", default_value = "")]
    pub elasticsearch_index_prefix: String,

    /// Elasticsearch basic auth username.
    #[arg(long, env = "MAINT_ELASTICSEARCH_USERNAME")]
    pub elasticsearch_username: Option<String>,

    /// Elasticsearch basic auth password.
    #[arg(long, env = "MAINT_ELASTICSEARCH_PASSWORD", hide_env_values = true)]
    pub elasticsearch_password: Option<String>,

    /// Key of the organization kept by resets.
    #[arg(
        long,
        env = "MAINT_DEFAULT_ORGANIZATION",
        default_value = "default-organization"
    )]
    pub default_organization: String,

    /// Login of the user kept by resets.
    #[arg(long, env = "MAINT_ADMIN_LOGIN", default_value = "admin")]
    pub admin_login: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "MAINT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Maintenance operations.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Empties the store down to its reserved rows and clears every index.
    ClearAll,

    /// Deletes analysis data and clears the analysis indexes.
    ResetData,

    /// Scrolls the rule table into the rules index.
    IndexRules {
        /// Organization whose rule tags are indexed.
        #[arg(long, env = "MAINT_TENANT")]
        tenant: String,

        /// Index only this rule (`repository:rule`).
        #[arg(long)]
        rule: Option<RuleKey>,

        /// Documents per bulk request.
        #[arg(long, env = "MAINT_BATCH_SIZE", default_value = "500")]
        batch_size: usize,
    },
}

impl MaintenanceCli {
    /// Validates the configuration.
    ///
    /// Returns every problem found rather than only the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.trim().is_empty() {
            errors.push("Database path cannot be empty".to_string());
        }

        if self.node_urls().is_empty() {
            errors.push("At least one Elasticsearch node is required".to_string());
        }

        if self.elasticsearch_username.is_some() != self.elasticsearch_password.is_some() {
            errors.push("Elasticsearch username and password must be set together".to_string());
        }

        if self.default_organization.is_empty() {
            errors.push("Default organization cannot be empty".to_string());
        }

        if self.admin_login.is_empty() {
            errors.push("Admin login cannot be empty".to_string());
        }

        if let Command::IndexRules {
            tenant, batch_size, ..
        } = &self.command
        {
            if tenant.is_empty() {
                errors.push("Tenant cannot be empty".to_string());
            }
            if *batch_size == 0 {
                errors.push("Batch size cannot be 0".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn node_urls(&self) -> Vec<String> {
        self.elasticsearch_nodes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Builds the Elasticsearch client configuration.
    pub fn elasticsearch_config(&self) -> ElasticsearchConfig {
        let auth = match (&self.elasticsearch_username, &self.elasticsearch_password) {
            (Some(username), Some(password)) => Some(ElasticsearchAuth::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        ElasticsearchConfig {
            nodes: self.node_urls(),
            index_prefix: self.elasticsearch_index_prefix.clone(),
            auth,
            ..Default::default()
        }
    }

    /// Builds the cleanup configuration.
    pub fn cleanup_config(&self) -> CleanupConfig {
        CleanupConfig {
            reserved: ReservedRows {
                default_organization_key: self.default_organization.clone(),
                admin_login: self.admin_login.clone(),
                ..ReservedRows::default()
            },
            ..CleanupConfig::default()
        }
    }

    /// Builds the rule indexer configuration.
    pub fn indexer_config(&self) -> RuleIndexerConfig {
        match &self.command {
            Command::IndexRules { batch_size, .. } => RuleIndexerConfig {
                batch_size: *batch_size,
                ..RuleIndexerConfig::default()
            },
            _ => RuleIndexerConfig::default(),
        }
    }
}
