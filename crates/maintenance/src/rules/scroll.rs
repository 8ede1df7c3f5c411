//! Streaming scroll over the rule table.
//!
//! A scroll reads one row per advance from a forward-only cursor and converts it
//! into a [`RuleDocument`]. Nothing is buffered: memory use does not depend on the
//! number of rules.
//!
//! The cursor is reset (and its read lock released) as soon as the sequence is
//! exhausted, fails, or is dropped before the end.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use backend_maintenance::rules::{RuleDocumentTransform, RuleMarkdown, RuleScroll};
//! use backend_maintenance::store::sqlite::SqliteStore;
//! use backend_maintenance::TenantId;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("platform.db")?;
//! let conn = store.get_connection()?;
//! let transform = RuleDocumentTransform::new(Arc::new(RuleMarkdown::new()?));
//!
//! let mut scroll = RuleScroll::prepare(&conn, &TenantId::new("org-1"), None, transform)?;
//! for document in scroll.documents()? {
//!     println!("{}", document?.key);
//! }
//! # Ok(())
//! # }
//! ```

use std::ops::ControlFlow;

use rusqlite::{Connection, Row, Rows, Statement, params};

use super::RuleKey;
use super::model::{RuleDocument, RuleRow};
use super::transform::RuleDocumentTransform;
use crate::error::{BackendError, ExtractionError};
use crate::tenant::TenantId;

/// Selects every rule with its template key and the tenant's tags.
pub const SQL_ALL: &str = "SELECT r.plugin_rule_key, r.plugin_name, r.name, r.description, \
    r.description_format, r.priority, r.status, r.is_template, rm.tags, r.system_tags, \
    t.plugin_rule_key, t.plugin_name, r.plugin_config_key, r.language, r.rule_type, \
    r.created_at, r.updated_at \
    FROM rules r \
    LEFT OUTER JOIN rules t ON t.id=r.template_id \
    LEFT OUTER JOIN rules_metadata rm ON rm.rule_id = r.id and rm.organization_uuid=?1";

/// Restricts [`SQL_ALL`] to a single natural key.
pub const SQL_RULE_KEY: &str = " WHERE r.plugin_name=?2 AND r.plugin_rule_key=?3";

/// Receives the documents of a scroll.
pub trait RuleDocumentSink {
    /// Takes ownership of one document. Returning `Break` stops the scroll.
    fn accept(&mut self, document: RuleDocument) -> ControlFlow<()>;
}

impl RuleDocumentSink for Vec<RuleDocument> {
    fn accept(&mut self, document: RuleDocument) -> ControlFlow<()> {
        self.push(document);
        ControlFlow::Continue(())
    }
}

impl RuleDocumentSink for tokio::sync::mpsc::Sender<RuleDocument> {
    /// Blocks while the channel is full; stops once the receiver is gone.
    ///
    /// Must not be called from within an async runtime thread.
    fn accept(&mut self, document: RuleDocument) -> ControlFlow<()> {
        match self.blocking_send(document) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }
}

/// A prepared scroll over the rule table.
pub struct RuleScroll<'conn> {
    statement: Statement<'conn>,
    tenant: TenantId,
    key: Option<RuleKey>,
    transform: RuleDocumentTransform,
}

impl std::fmt::Debug for RuleScroll<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleScroll")
            .field("tenant", &self.tenant)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<'conn> RuleScroll<'conn> {
    /// Prepares a scroll over every rule, or over the single rule `key`.
    ///
    /// Tenant tags are those of `tenant`; rules without metadata for it have none.
    pub fn prepare(
        conn: &'conn Connection,
        tenant: &TenantId,
        key: Option<&RuleKey>,
        transform: RuleDocumentTransform,
    ) -> Result<Self, ExtractionError> {
        let sql = match key {
            Some(_) => format!("{}{}", SQL_ALL, SQL_RULE_KEY),
            None => SQL_ALL.to_string(),
        };

        let statement = conn.prepare(&sql).map_err(|e| ExtractionError::Setup {
            message: "failed to prepare the rule query".to_string(),
            source: BackendError::sqlite("Failed to prepare rule scroll", e),
        })?;

        Ok(Self {
            statement,
            tenant: tenant.clone(),
            key: key.cloned(),
            transform,
        })
    }

    /// Starts the cursor and returns the lazy document sequence.
    ///
    /// The sequence can be started again once the previous one is dropped.
    pub fn documents(&mut self) -> Result<RuleDocuments<'_>, ExtractionError> {
        let Self {
            statement,
            tenant,
            key,
            transform,
        } = self;

        let rows = match key {
            Some(key) => statement.query(params![tenant.as_str(), key.repository(), key.rule()]),
            None => statement.query(params![tenant.as_str()]),
        }
        .map_err(|e| ExtractionError::Setup {
            message: "failed to bind the rule query".to_string(),
            source: BackendError::sqlite("Failed to start rule scroll", e),
        })?;

        tracing::debug!(tenant = %tenant, key = ?key, "Rule scroll started");

        Ok(RuleDocuments {
            rows: Some(rows),
            transform,
            rows_read: 0,
        })
    }
}

/// Lazy sequence of rule documents.
///
/// Yields at most one error, after which it is exhausted. Documents yielded
/// before an error remain valid.
pub struct RuleDocuments<'s> {
    rows: Option<Rows<'s>>,
    transform: &'s RuleDocumentTransform,
    rows_read: u64,
}

impl RuleDocuments<'_> {
    /// Returns the number of rows read so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Hands every remaining document to `sink` and returns how many it accepted.
    ///
    /// Stops early, releasing the cursor, when the sink breaks.
    pub fn drain_into<S: RuleDocumentSink + ?Sized>(
        mut self,
        sink: &mut S,
    ) -> Result<u64, ExtractionError> {
        let mut accepted = 0;
        while let Some(document) = self.next() {
            if sink.accept(document?).is_break() {
                tracing::debug!(accepted, "Rule sink closed, scroll abandoned");
                break;
            }
            accepted += 1;
        }
        Ok(accepted)
    }

    fn release(&mut self) {
        self.rows = None;
    }
}

impl Iterator for RuleDocuments<'_> {
    type Item = Result<RuleDocument, ExtractionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rows = self.rows.as_mut()?;

        let row = match rows.next() {
            Ok(Some(row)) => read_row(row),
            Ok(None) => {
                self.release();
                return None;
            }
            Err(e) => Err(e),
        };

        let result = match row {
            Ok(row) => {
                self.rows_read += 1;
                self.transform
                    .transform(&row)
                    .map_err(|source| ExtractionError::Transform {
                        rule_key: row.key(),
                        source,
                    })
            }
            Err(e) => Err(ExtractionError::Read {
                rows_read: self.rows_read,
                source: BackendError::sqlite("Failed to read rule row", e),
            }),
        };

        if result.is_err() {
            self.release();
        }
        Some(result)
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RuleRow> {
    Ok(RuleRow {
        rule_key: row.get(0)?,
        repository_key: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        description_format: row.get(4)?,
        severity: row.get(5)?,
        status: row.get(6)?,
        is_template: row.get(7)?,
        tags: row.get(8)?,
        system_tags: row.get(9)?,
        template_rule_key: row.get(10)?,
        template_repository_key: row.get(11)?,
        internal_key: row.get(12)?,
        language: row.get(13)?,
        rule_type: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}
