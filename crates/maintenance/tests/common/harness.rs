//! Temp-file SQLite stores.
//!
//! File databases are used rather than `:memory:` so that several pooled
//! connections see the same data.

use std::sync::Arc;

use rusqlite::{Connection, params};
use tempfile::TempDir;

use super::fixtures::RuleFixture;

use backend_maintenance::rules::{RuleDocumentTransform, RuleMarkdown};
use backend_maintenance::store::sqlite::{SqliteStore, SqliteStoreConfig};

/// A store living in a temporary directory, deleted on drop.
pub struct TestStore {
    pub store: SqliteStore,
    _dir: TempDir,
}

impl TestStore {
    /// Creates a store with the platform schema.
    pub fn new() -> Self {
        Self::with_config(SqliteStoreConfig::default())
    }

    /// Creates a store with the platform schema and a custom pool configuration.
    pub fn with_config(config: SqliteStoreConfig) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = SqliteStore::with_config(dir.path().join("platform.db"), config)
            .expect("Failed to open SQLite store");
        store.init_schema().expect("Failed to initialize schema");
        Self { store, _dir: dir }
    }

    /// Runs `f` on a pooled connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.store.get_connection().expect("Failed to get connection");
        f(&conn)
    }

    /// Returns the number of rows of `table`.
    pub fn count(&self, table: &str) -> i64 {
        self.with_conn(|conn| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .expect("Failed to count rows")
        })
    }

    /// Returns the values of one text column, sorted.
    pub fn strings(&self, sql: &str) -> Vec<String> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql).expect("Failed to prepare");
            let mut values: Vec<String> = stmt
                .query_map([], |row| row.get(0))
                .expect("Failed to query")
                .collect::<Result<_, _>>()
                .expect("Failed to read rows");
            values.sort();
            values
        })
    }

    /// Executes a batch of statements.
    pub fn execute(&self, sql: &str) {
        self.with_conn(|conn| conn.execute_batch(sql).expect("Failed to execute batch"));
    }
}

/// Returns a transform using the built-in markup renderer.
pub fn markdown_transform() -> RuleDocumentTransform {
    RuleDocumentTransform::new(Arc::new(
        RuleMarkdown::new().expect("Failed to compile markup renderer"),
    ))
}

/// Populates every table touched by a reset with reserved and ordinary rows.
pub fn seed_platform(store: &TestStore) {
    store.execute(
        "
        INSERT INTO organizations (uuid, kee, name) VALUES
            ('org-default', 'default-organization', 'Default'),
            ('org-acme', 'acme', 'Acme');
        INSERT INTO users (login, name, is_root) VALUES
            ('admin', 'Administrator', 1),
            ('bob', 'Bob', 1);
        INSERT INTO internal_properties (kee, text_value) VALUES
            ('organization.default', 'org-default'),
            ('installation.date', '1500000000000');
        INSERT INTO organization_members (organization_uuid, user_id) VALUES ('org-acme', 2);
        INSERT INTO groups (organization_uuid, name) VALUES ('org-default', 'sonar-users');
        INSERT INTO group_roles (organization_uuid, group_id, resource_id, role) VALUES
            ('org-default', 1, NULL, 'scan'),
            ('org-default', 1, 10, 'user');
        INSERT INTO user_roles (organization_uuid, user_id, resource_id, role) VALUES
            ('org-default', 1, NULL, 'admin'),
            ('org-default', 2, 10, 'codeviewer');
        INSERT INTO properties (prop_key, resource_id, text_value) VALUES
            ('sonar.core.serverBaseURL', NULL, 'http://localhost'),
            ('sonar.exclusions', 10, '**/generated/**');
        INSERT INTO projects (uuid, kee, organization_uuid, name, qualifier) VALUES
            ('p1', 'my:project', 'org-default', 'My Project', 'TRK');
        INSERT INTO snapshots (uuid, component_uuid, islast) VALUES ('a1', 'p1', 1);
        INSERT INTO metrics (name, val_type) VALUES ('ncloc', 'INT');
        INSERT INTO project_measures (component_uuid, analysis_uuid, metric_id, value)
            VALUES ('p1', 'a1', 1, 42);
        INSERT INTO issues (kee, component_uuid, project_uuid, severity, status)
            VALUES ('i1', 'p1', 'p1', 'MAJOR', 'OPEN');
        INSERT INTO issue_changes (issue_key, change_type) VALUES ('i1', 'comment');
        INSERT INTO events (uuid, analysis_uuid, name, category) VALUES ('e1', 'a1', '1.0', 'Version');
        INSERT INTO file_sources (project_uuid, file_uuid) VALUES ('p1', 'f1');
        INSERT INTO ce_activity (uuid, task_type, status) VALUES ('t1', 'REPORT', 'SUCCESS');
        ",
    );
    store.with_conn(|conn| {
        insert_rule(conn, &RuleFixture::new("java", "S100"));
        insert_rule(conn, &RuleFixture::new("manual", "my-manual-rule"));
    });
}

/// Inserts a rule row and returns its id.
pub fn insert_rule(conn: &Connection, rule: &RuleFixture) -> i64 {
    let template_id: Option<i64> = rule.template.as_ref().map(|(repository, key)| {
        conn.query_row(
            "SELECT id FROM rules WHERE plugin_name = ?1 AND plugin_rule_key = ?2",
            params![repository, key],
            |row| row.get(0),
        )
        .expect("Template rule must be inserted first")
    });

    conn.execute(
        "INSERT INTO rules (plugin_rule_key, plugin_name, name, description, description_format,
            priority, status, is_template, system_tags, template_id, plugin_config_key,
            language, rule_type, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            rule.rule_key,
            rule.repository,
            rule.name,
            rule.description,
            rule.description_format,
            rule.severity,
            rule.status,
            rule.is_template,
            rule.system_tags,
            template_id,
            rule.internal_key,
            rule.language,
            rule.rule_type,
            rule.created_at,
            rule.updated_at,
        ],
    )
    .expect("Failed to insert rule");
    conn.last_insert_rowid()
}

/// Attaches tenant tags to a rule.
pub fn insert_rule_tags(conn: &Connection, rule_id: i64, organization_uuid: &str, tags: &str) {
    conn.execute(
        "INSERT INTO rules_metadata (rule_id, organization_uuid, tags) VALUES (?1, ?2, ?3)",
        params![rule_id, organization_uuid, tags],
    )
    .expect("Failed to insert rule metadata");
}
