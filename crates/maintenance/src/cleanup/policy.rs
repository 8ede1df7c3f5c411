//! Per-table cleanup policy.
//!
//! A reset empties every table except where this mapping says otherwise. Adding a
//! protected table means adding one entry to [`CleanupPolicy::new`].

use std::collections::HashMap;

use crate::config::ReservedRows;
use crate::store::{SqlDialect, SqlStatement};

/// What a reset does to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableCleanupAction {
    /// Remove every row.
    TruncateAll,

    /// Remove every row except the one whose `column` equals `protected_value`.
    /// When `cleared_flag` is set, that boolean column is then reset to false on
    /// every remaining row.
    TruncateAllButOne {
        /// Column identifying the kept row.
        column: &'static str,
        /// Value of `column` on the kept row.
        protected_value: String,
        /// Boolean column reset to false after the delete.
        cleared_flag: Option<&'static str>,
    },

    /// Remove the rows where `column` is not null.
    DeleteWhereColumnIsSet {
        /// Nullable column marking the rows to remove.
        column: &'static str,
    },

    /// Leave the table untouched.
    NoOp,
}

static TRUNCATE_ALL: TableCleanupAction = TableCleanupAction::TruncateAll;

impl TableCleanupAction {
    /// Renders the statements applying this action to `table`, in execution order.
    ///
    /// Each statement is meant to be committed on its own.
    pub fn statements(&self, table: &str, dialect: SqlDialect) -> Vec<SqlStatement> {
        match self {
            TableCleanupAction::TruncateAll => vec![SqlStatement::new(dialect.truncate(table))],
            TableCleanupAction::TruncateAllButOne {
                column,
                protected_value,
                cleared_flag,
            } => {
                let mut statements = vec![
                    SqlStatement::new(format!("delete from {} where {} <> ?1", table, column))
                        .bind(protected_value.as_str()),
                ];
                if let Some(flag) = cleared_flag {
                    statements.push(
                        SqlStatement::new(format!("update {} set {}=?1", table, flag)).bind(false),
                    );
                }
                statements
            }
            TableCleanupAction::DeleteWhereColumnIsSet { column } => vec![SqlStatement::new(
                format!("DELETE FROM {} WHERE {} IS NOT NULL", table, column),
            )],
            TableCleanupAction::NoOp => Vec::new(),
        }
    }
}

/// Maps table names to cleanup actions. Unmapped tables are truncated.
#[derive(Debug, Clone)]
pub struct CleanupPolicy {
    actions: HashMap<&'static str, TableCleanupAction>,
}

impl CleanupPolicy {
    /// Builds the policy protecting the given reserved rows.
    pub fn new(reserved: &ReservedRows) -> Self {
        let actions = HashMap::from([
            (
                "organizations",
                TableCleanupAction::TruncateAllButOne {
                    column: "kee",
                    protected_value: reserved.default_organization_key.clone(),
                    cleared_flag: None,
                },
            ),
            (
                "users",
                TableCleanupAction::TruncateAllButOne {
                    column: "login",
                    protected_value: reserved.admin_login.clone(),
                    // the kept administrator is not root on a fresh installation
                    cleared_flag: Some("is_root"),
                },
            ),
            (
                "internal_properties",
                TableCleanupAction::TruncateAllButOne {
                    column: "kee",
                    protected_value: reserved.default_organization_property.clone(),
                    cleared_flag: None,
                },
            ),
            // written when the database is created, never altered afterwards
            ("schema_migrations", TableCleanupAction::NoOp),
        ]);
        Self { actions }
    }

    /// Returns the action for `table`. Lookup ignores ASCII case.
    pub fn resolve(&self, table: &str) -> &TableCleanupAction {
        self.actions
            .get(table.to_ascii_lowercase().as_str())
            .unwrap_or(&TRUNCATE_ALL)
    }

    /// Renders the statements cleaning `table`.
    pub fn statements(&self, table: &str, dialect: SqlDialect) -> Vec<SqlStatement> {
        self.resolve(table)
            .statements(&table.to_ascii_lowercase(), dialect)
    }
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self::new(&ReservedRows::default())
    }
}
