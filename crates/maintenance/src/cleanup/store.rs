//! Relational store reset.
//!
//! Every statement is committed on its own. Some engines auto-commit `TRUNCATE`
//! anyway, so committing after each statement keeps the behavior identical on all
//! of them. The flip side is that there is no rollback across tables: a failure
//! leaves the statements already applied in place.

use crate::config::ReservedRows;
use crate::error::StoreResetError;
use crate::store::{SessionProvider, SqlStatement, StoreSession};

use super::policy::{CleanupPolicy, TableCleanupAction};

/// Tables holding analysis results, truncated by `reset_data`.
pub const ANALYSIS_TABLES: &[&str] = &[
    "authors",
    "duplications_index",
    "events",
    "issues",
    "issue_changes",
    "manual_measures",
    "notifications",
    "project_links",
    "project_measures",
    "projects",
    "snapshots",
    "file_sources",
];

/// Tables mixing global rows and rows attached to a resource.
/// `reset_data` keeps the global ones (null `resource_id`).
pub const RESOURCE_RELATED_TABLES: &[&str] = &["group_roles", "user_roles", "properties"];

/// Tables whose reserved rows `reset_data` restores, in order.
const PROTECTED_TABLES: &[&str] = &["internal_properties", "users", "organizations"];

/// Outcome of a successful store reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    /// Statements executed (and committed).
    pub statements: usize,
    /// Rows affected across all statements.
    pub rows_affected: usize,
}

/// Resets the relational store.
#[derive(Debug)]
pub struct StoreResetEngine<P: SessionProvider> {
    provider: P,
    policy: CleanupPolicy,
    reserved: ReservedRows,
    tables: Vec<String>,
}

impl<P: SessionProvider> StoreResetEngine<P> {
    /// Creates an engine cleaning `tables`, which must be listed in
    /// dependency-safe deletion order.
    pub fn new<I, S>(provider: P, reserved: ReservedRows, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            provider,
            policy: CleanupPolicy::new(&reserved),
            reserved,
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the cleanup policy.
    pub fn policy(&self) -> &CleanupPolicy {
        &self.policy
    }

    /// Applies the cleanup policy to every known table.
    ///
    /// Unmapped tables end up empty; protected tables keep their reserved row;
    /// `schema_migrations` is left untouched.
    pub fn clear_all(&self) -> Result<ResetSummary, StoreResetError> {
        let mut session = self.open()?;
        let dialect = session.dialect();
        let mut summary = ResetSummary::default();

        for table in &self.tables {
            let statements = self.policy.statements(table, dialect);
            tracing::debug!(table = %table, statements = statements.len(), "Cleaning table");
            apply(&mut session, &format!("table {}", table), &statements, &mut summary)?;
        }

        tracing::info!(
            tables = self.tables.len(),
            rows = summary.rows_affected,
            "Relational store cleared"
        );
        Ok(summary)
    }

    /// Brings the store back to a fresh installation without dropping anything.
    ///
    /// In order: truncates the analysis tables, deletes resource-bound rows of the
    /// resource related tables, deletes manual rules, then restores the reserved
    /// rows of internal properties, users and organizations.
    pub fn reset_data(&self) -> Result<ResetSummary, StoreResetError> {
        let mut session = self.open()?;
        let dialect = session.dialect();
        let mut summary = ResetSummary::default();

        for table in ANALYSIS_TABLES {
            let statements = TableCleanupAction::TruncateAll.statements(table, dialect);
            apply(&mut session, &format!("analysis table {}", table), &statements, &mut summary)?;
        }

        let resource_bound = TableCleanupAction::DeleteWhereColumnIsSet {
            column: "resource_id",
        };
        for table in RESOURCE_RELATED_TABLES {
            let statements = resource_bound.statements(table, dialect);
            apply(&mut session, &format!("resource table {}", table), &statements, &mut summary)?;
        }

        let manual_rules = SqlStatement::new("DELETE FROM rules WHERE rules.plugin_name=?1")
            .bind(self.reserved.manual_rule_plugin.as_str());
        apply(&mut session, "manual rules", &[manual_rules], &mut summary)?;

        for table in PROTECTED_TABLES {
            let statements = self.policy.statements(table, dialect);
            apply(&mut session, &format!("table {}", table), &statements, &mut summary)?;
        }

        tracing::info!(rows = summary.rows_affected, "Relational store data reset");
        Ok(summary)
    }

    fn open(&self) -> Result<P::Session, StoreResetError> {
        self.provider
            .open_session()
            .map_err(|e| StoreResetError::new("open session", e))
    }
}

/// Executes and commits each statement in turn.
fn apply<S: StoreSession>(
    session: &mut S,
    step: &str,
    statements: &[SqlStatement],
    summary: &mut ResetSummary,
) -> Result<(), StoreResetError> {
    for statement in statements {
        let rows = session
            .execute(statement)
            .map_err(|e| StoreResetError::new(step, e))?;
        session
            .commit()
            .map_err(|e| StoreResetError::new(step, e))?;
        summary.statements += 1;
        summary.rows_affected += rows;
    }
    Ok(())
}
