//! Relational store abstractions.
//!
//! The reset engine only needs two things from the relational store: a scoped
//! session that executes parameterized statements, and an explicit commit. Both
//! are expressed as traits so the engine can run against SQLite or against a
//! recording session in tests.

pub mod sqlite;

use std::fmt;
use std::sync::Arc;

use crate::error::BackendError;

/// SQL flavor spoken by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    /// SQLite. Has no `TRUNCATE`; tables are emptied with an unqualified `DELETE`.
    Sqlite,
    /// Engines accepting `TRUNCATE TABLE` and numbered `?N` placeholders.
    Standard,
}

impl SqlDialect {
    /// Renders the statement that removes every row of `table`.
    pub fn truncate(&self, table: &str) -> String {
        match self {
            SqlDialect::Sqlite => format!("DELETE FROM {}", table),
            SqlDialect::Standard => format!("TRUNCATE TABLE {}", table),
        }
    }
}

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// A text value.
    Text(String),
    /// A boolean, stored as 0/1 where the engine has no boolean type.
    Bool(bool),
    /// A 64-bit integer.
    Integer(i64),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

/// A SQL statement with positional parameters (`?1`, `?2`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    /// The statement text.
    pub sql: String,
    /// Values bound to the placeholders, in order.
    pub params: Vec<SqlValue>,
}

impl SqlStatement {
    /// Creates a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Appends a positional parameter.
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// A scoped unit of work against the relational store.
///
/// Work executed since the last [`commit`](StoreSession::commit) is discarded when
/// the session is dropped.
pub trait StoreSession {
    /// Returns the SQL dialect of the underlying engine.
    fn dialect(&self) -> SqlDialect;

    /// Executes a statement and returns the number of affected rows.
    fn execute(&mut self, statement: &SqlStatement) -> Result<usize, BackendError>;

    /// Makes all work executed so far durable.
    fn commit(&mut self) -> Result<(), BackendError>;
}

/// Opens sessions against the relational store.
pub trait SessionProvider {
    /// The session type handed out by this provider.
    type Session: StoreSession;

    /// Opens a new session.
    fn open_session(&self) -> Result<Self::Session, BackendError>;
}

impl<P: SessionProvider + ?Sized> SessionProvider for Arc<P> {
    type Session = P::Session;

    fn open_session(&self) -> Result<Self::Session, BackendError> {
        (**self).open_session()
    }
}

impl<P: SessionProvider + ?Sized> SessionProvider for &P {
    type Session = P::Session;

    fn open_session(&self) -> Result<Self::Session, BackendError> {
        (**self).open_session()
    }
}
