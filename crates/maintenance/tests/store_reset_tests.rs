//! Relational store reset integration tests.
//!
//! Run against a temp-file SQLite database carrying the platform schema.

mod common;

use backend_maintenance::cleanup::{ANALYSIS_TABLES, StoreResetEngine};
use backend_maintenance::config::ReservedRows;
use backend_maintenance::store::sqlite::{SCHEMA_VERSION, SqliteStore, TABLES};

use common::{TestStore, seed_platform};

fn engine(test: &TestStore) -> StoreResetEngine<&SqliteStore> {
    StoreResetEngine::new(&test.store, ReservedRows::default(), TABLES.iter().copied())
}

// ============================================================================
// clear_all
// ============================================================================

#[test]
fn test_clear_all_empties_unmapped_tables() {
    let test = TestStore::new();
    seed_platform(&test);

    engine(&test).clear_all().unwrap();

    for table in TABLES {
        match *table {
            "organizations" | "users" | "internal_properties" | "schema_migrations" => {}
            other => assert_eq!(test.count(other), 0, "table {} should be empty", other),
        }
    }
}

#[test]
fn test_clear_all_keeps_reserved_rows() {
    let test = TestStore::new();
    seed_platform(&test);

    engine(&test).clear_all().unwrap();

    assert_eq!(
        test.strings("SELECT kee FROM organizations"),
        vec!["default-organization"]
    );
    assert_eq!(test.strings("SELECT login FROM users"), vec!["admin"]);
    assert_eq!(
        test.count("users WHERE is_root = 0"),
        1,
        "the kept administrator must not be root"
    );
    assert_eq!(
        test.strings("SELECT kee FROM internal_properties"),
        vec!["organization.default"]
    );
}

#[test]
fn test_clear_all_leaves_schema_migrations() {
    let test = TestStore::new();
    seed_platform(&test);

    engine(&test).clear_all().unwrap();

    assert_eq!(
        test.strings("SELECT version FROM schema_migrations"),
        vec![SCHEMA_VERSION.to_string()]
    );
}

#[test]
fn test_clear_all_on_empty_store() {
    let test = TestStore::new();
    let summary = engine(&test).clear_all().unwrap();

    assert_eq!(summary.rows_affected, 0);
    assert_eq!(test.count("organizations"), 0);
}

#[test]
fn test_clear_all_stops_at_missing_table() {
    let test = TestStore::new();
    seed_platform(&test);

    let engine = StoreResetEngine::new(
        &test.store,
        ReservedRows::default(),
        ["issues", "no_such_table", "events"],
    );
    let err = engine.clear_all().unwrap_err();

    assert_eq!(err.step, "table no_such_table");
    assert_eq!(test.count("issues"), 0, "applied steps stay applied");
    assert_eq!(test.count("events"), 1, "later steps are not reached");
}

#[test]
fn test_clear_all_with_custom_reserved_rows() {
    let test = TestStore::new();
    seed_platform(&test);

    let reserved = ReservedRows {
        default_organization_key: "acme".to_string(),
        admin_login: "bob".to_string(),
        ..ReservedRows::default()
    };
    StoreResetEngine::new(&test.store, reserved, TABLES.iter().copied())
        .clear_all()
        .unwrap();

    assert_eq!(test.strings("SELECT kee FROM organizations"), vec!["acme"]);
    assert_eq!(test.strings("SELECT login FROM users"), vec!["bob"]);
}

// ============================================================================
// reset_data
// ============================================================================

#[test]
fn test_reset_data_truncates_analysis_tables() {
    let test = TestStore::new();
    seed_platform(&test);

    engine(&test).reset_data().unwrap();

    for table in ANALYSIS_TABLES {
        assert_eq!(test.count(table), 0, "table {} should be empty", table);
    }
}

#[test]
fn test_reset_data_keeps_global_permissions_and_settings() {
    let test = TestStore::new();
    seed_platform(&test);

    engine(&test).reset_data().unwrap();

    assert_eq!(test.strings("SELECT role FROM group_roles"), vec!["scan"]);
    assert_eq!(test.strings("SELECT role FROM user_roles"), vec!["admin"]);
    assert_eq!(
        test.strings("SELECT prop_key FROM properties"),
        vec!["sonar.core.serverBaseURL"]
    );
}

#[test]
fn test_reset_data_deletes_manual_rules_only() {
    let test = TestStore::new();
    seed_platform(&test);

    engine(&test).reset_data().unwrap();

    assert_eq!(test.strings("SELECT plugin_name FROM rules"), vec!["java"]);
}

#[test]
fn test_reset_data_keeps_reserved_rows_and_untouched_tables() {
    let test = TestStore::new();
    seed_platform(&test);

    engine(&test).reset_data().unwrap();

    assert_eq!(
        test.strings("SELECT kee FROM organizations"),
        vec!["default-organization"]
    );
    assert_eq!(test.strings("SELECT login FROM users"), vec!["admin"]);
    assert_eq!(test.count("users WHERE is_root = 1"), 0);
    assert_eq!(test.count("metrics"), 1, "metrics are not analysis data");
    assert_eq!(test.count("ce_activity"), 1);
    assert_eq!(test.count("groups"), 1);
}

#[test]
fn test_reset_data_is_repeatable() {
    let test = TestStore::new();
    seed_platform(&test);

    let engine = engine(&test);
    let first = engine.reset_data().unwrap();
    let second = engine.reset_data().unwrap();

    assert_eq!(first.statements, second.statements);
    // only the root flag reset still matches the kept administrator
    assert_eq!(second.rows_affected, 1);
    assert_eq!(test.strings("SELECT login FROM users"), vec!["admin"]);
}
