//! SQLite schema of the platform tables.
//!
//! Applied migrations are recorded in `schema_migrations`, one row per version.
//! That table is written once when the schema is created and never touched by a
//! data reset.

use rusqlite::{Connection, OptionalExtension};

use crate::error::BackendError;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Every platform table, in dependency-safe deletion order: tables holding
/// foreign keys come before the tables they reference.
pub const TABLES: &[&str] = &[
    "active_rule_parameters",
    "active_rules",
    "rules_parameters",
    "rules_metadata",
    "rules",
    "rules_profiles",
    "authors",
    "ce_activity",
    "ce_queue",
    "duplications_index",
    "events",
    "file_sources",
    "issue_changes",
    "issues",
    "manual_measures",
    "project_measures",
    "metrics",
    "notifications",
    "project_links",
    "snapshots",
    "projects",
    "group_roles",
    "user_roles",
    "groups_users",
    "groups",
    "properties",
    "user_tokens",
    "organization_members",
    "internal_properties",
    "users",
    "organizations",
    "schema_migrations",
];

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS organizations (
    uuid TEXT PRIMARY KEY,
    kee TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    created_at INTEGER,
    updated_at INTEGER
);
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    login TEXT NOT NULL UNIQUE,
    name TEXT,
    email TEXT,
    is_root INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER,
    updated_at INTEGER
);
CREATE TABLE IF NOT EXISTS internal_properties (
    kee TEXT PRIMARY KEY,
    is_empty INTEGER NOT NULL DEFAULT 0,
    text_value TEXT,
    created_at INTEGER
);
CREATE TABLE IF NOT EXISTS organization_members (
    organization_uuid TEXT NOT NULL REFERENCES organizations(uuid) ON DELETE CASCADE,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (organization_uuid, user_id)
);
CREATE TABLE IF NOT EXISTS user_tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    login TEXT NOT NULL,
    name TEXT NOT NULL,
    token_hash TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_uuid TEXT,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS groups_users (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE
);
CREATE TABLE IF NOT EXISTS group_roles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_uuid TEXT,
    group_id INTEGER,
    resource_id INTEGER,
    role TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS user_roles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_uuid TEXT,
    user_id INTEGER,
    resource_id INTEGER,
    role TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS properties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    prop_key TEXT NOT NULL,
    resource_id INTEGER,
    user_id INTEGER,
    text_value TEXT
);
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    kee TEXT,
    organization_uuid TEXT,
    name TEXT,
    qualifier TEXT,
    enabled INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    component_uuid TEXT NOT NULL,
    status TEXT,
    islast INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER
);
CREATE TABLE IF NOT EXISTS project_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    component_uuid TEXT NOT NULL,
    link_type TEXT,
    href TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data BLOB
);
CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    val_type TEXT
);
CREATE TABLE IF NOT EXISTS project_measures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    component_uuid TEXT NOT NULL,
    analysis_uuid TEXT NOT NULL,
    metric_id INTEGER NOT NULL,
    value REAL,
    text_value TEXT
);
CREATE TABLE IF NOT EXISTS manual_measures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    metric_id INTEGER NOT NULL,
    component_uuid TEXT,
    value REAL,
    text_value TEXT
);
CREATE TABLE IF NOT EXISTS issues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kee TEXT NOT NULL UNIQUE,
    rule_id INTEGER,
    component_uuid TEXT,
    project_uuid TEXT,
    severity TEXT,
    status TEXT,
    message TEXT
);
CREATE TABLE IF NOT EXISTS issue_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kee TEXT,
    issue_key TEXT NOT NULL,
    change_type TEXT,
    change_data TEXT
);
CREATE TABLE IF NOT EXISTS file_sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_uuid TEXT NOT NULL,
    file_uuid TEXT NOT NULL,
    data_type TEXT,
    binary_data BLOB
);
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL,
    analysis_uuid TEXT,
    name TEXT,
    category TEXT,
    created_at INTEGER
);
CREATE TABLE IF NOT EXISTS duplications_index (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    analysis_uuid TEXT NOT NULL,
    component_uuid TEXT NOT NULL,
    hash TEXT NOT NULL,
    index_in_file INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS ce_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    task_type TEXT NOT NULL,
    status TEXT
);
CREATE TABLE IF NOT EXISTS ce_activity (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    task_type TEXT NOT NULL,
    status TEXT
);
CREATE TABLE IF NOT EXISTS authors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id INTEGER NOT NULL,
    login TEXT
);
CREATE TABLE IF NOT EXISTS rules_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kee TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    language TEXT,
    organization_uuid TEXT
);
CREATE TABLE IF NOT EXISTS rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    plugin_rule_key TEXT NOT NULL,
    plugin_name TEXT NOT NULL,
    name TEXT,
    description TEXT,
    description_format TEXT,
    priority INTEGER,
    status TEXT,
    is_template INTEGER NOT NULL DEFAULT 0,
    system_tags TEXT,
    template_id INTEGER REFERENCES rules(id) ON DELETE SET NULL,
    plugin_config_key TEXT,
    language TEXT,
    rule_type INTEGER,
    created_at INTEGER,
    updated_at INTEGER,
    UNIQUE (plugin_name, plugin_rule_key)
);
CREATE TABLE IF NOT EXISTS rules_metadata (
    rule_id INTEGER NOT NULL REFERENCES rules(id) ON DELETE CASCADE,
    organization_uuid TEXT NOT NULL,
    tags TEXT,
    note_data TEXT,
    created_at INTEGER,
    updated_at INTEGER,
    PRIMARY KEY (rule_id, organization_uuid)
);
CREATE TABLE IF NOT EXISTS rules_parameters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_id INTEGER NOT NULL REFERENCES rules(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    param_type TEXT,
    default_value TEXT
);
CREATE TABLE IF NOT EXISTS active_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id INTEGER NOT NULL REFERENCES rules_profiles(id) ON DELETE CASCADE,
    rule_id INTEGER NOT NULL REFERENCES rules(id) ON DELETE CASCADE,
    failure_level INTEGER
);
CREATE TABLE IF NOT EXISTS active_rule_parameters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    active_rule_id INTEGER NOT NULL REFERENCES active_rules(id) ON DELETE CASCADE,
    rules_parameter_id INTEGER,
    value TEXT
);
";

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> Result<(), BackendError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (version TEXT NOT NULL UNIQUE)",
        [],
    )
    .map_err(|e| BackendError::sqlite("Failed to create schema_migrations table", e))?;

    let current_version = get_schema_version(conn)?;
    if current_version < SCHEMA_VERSION {
        conn.execute_batch(SCHEMA_V1)
            .map_err(|e| BackendError::sqlite("Failed to create platform tables", e))?;
        conn.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [SCHEMA_VERSION.to_string()],
        )
        .map_err(|e| BackendError::sqlite("Failed to record schema version", e))?;
        tracing::info!(version = SCHEMA_VERSION, "Created platform schema");
    }

    Ok(())
}

/// Returns the highest applied version, 0 on a fresh database.
fn get_schema_version(conn: &Connection) -> Result<i32, BackendError> {
    let version: Option<i32> = conn
        .query_row(
            "SELECT MAX(CAST(version AS INTEGER)) FROM schema_migrations",
            [],
            |row| row.get::<_, Option<i32>>(0),
        )
        .optional()
        .map_err(|e| BackendError::sqlite("Failed to read schema version", e))?
        .flatten();

    Ok(version.unwrap_or(0))
}
