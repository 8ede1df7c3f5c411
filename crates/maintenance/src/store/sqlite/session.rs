//! SQLite session: a pooled connection with an open transaction.

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ToSqlOutput;
use rusqlite::{Connection, ToSql, params_from_iter};

use crate::error::BackendError;
use crate::store::{SqlDialect, SqlStatement, SqlValue, StoreSession};

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlValue::Text(value) => value.to_sql(),
            SqlValue::Bool(value) => value.to_sql(),
            SqlValue::Integer(value) => value.to_sql(),
        }
    }
}

/// A SQLite session.
///
/// The session always has a transaction open: one is started when the session is
/// created and a new one right after each commit. Dropping the session rolls back
/// whatever was executed since the last commit.
pub struct SqliteSession {
    conn: PooledConnection<SqliteConnectionManager>,
    /// Statements executed since the last commit.
    pending: usize,
}

impl std::fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSession")
            .field("pending", &self.pending)
            .finish()
    }
}

impl SqliteSession {
    pub(crate) fn begin(
        conn: PooledConnection<SqliteConnectionManager>,
    ) -> Result<Self, BackendError> {
        conn.execute_batch("BEGIN")
            .map_err(|e| BackendError::sqlite("Failed to begin transaction", e))?;
        Ok(Self { conn, pending: 0 })
    }

    /// Returns the underlying connection, e.g. to open a rule scroll inside the
    /// session's transaction.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl StoreSession for SqliteSession {
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }

    fn execute(&mut self, statement: &SqlStatement) -> Result<usize, BackendError> {
        let affected = self
            .conn
            .execute(&statement.sql, params_from_iter(statement.params.iter()))
            .map_err(|e| BackendError::sqlite(format!("Failed to execute '{}'", statement), e))?;
        self.pending += 1;
        Ok(affected)
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| BackendError::sqlite("Failed to commit", e))?;
        self.pending = 0;
        self.conn
            .execute_batch("BEGIN")
            .map_err(|e| BackendError::sqlite("Failed to begin transaction", e))
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.pending > 0 {
            tracing::warn!(
                pending = self.pending,
                "SQLite session dropped with uncommitted statements, rolling back"
            );
        }
        if !self.conn.is_autocommit() {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}
