//! Error types for the maintenance layer.
//!
//! Every failure surfaced by this crate is terminal for the operation that raised
//! it: nothing is retried and nothing is rolled back across steps. Each error
//! carries enough context (the failing step or table, the index, the rule key) to
//! be reported to an operator as is.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::rules::RuleKey;

/// The primary error type for all maintenance operations.
#[derive(Error, Debug)]
pub enum MaintenanceError {
    /// Connection or backend-level errors outside of a reset or a scroll.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Relational store reset errors.
    #[error(transparent)]
    StoreReset(#[from] StoreResetError),

    /// Search index reset errors.
    #[error(transparent)]
    IndexReset(#[from] IndexResetError),

    /// Rule extraction errors.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Rule document bulk-write errors.
    #[error(transparent)]
    Indexing(#[from] IndexingError),
}

/// Errors raised by a store or index backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Backend is unavailable.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BackendError {
    /// Wraps a SQLite error with a message describing what was attempted.
    pub(crate) fn sqlite(message: impl Into<String>, source: rusqlite::Error) -> Self {
        BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: format!("{}: {}", message.into(), source),
            source: Some(Box::new(source)),
        }
    }
}

/// The relational store could not be reset.
///
/// Statements applied before the failing step stay applied.
#[derive(Error, Debug)]
#[error("failed to reset the relational store at {step}")]
pub struct StoreResetError {
    /// The failing step, usually `table <name>` or a reset_data stage.
    pub step: String,
    #[source]
    pub source: BackendError,
}

impl StoreResetError {
    pub(crate) fn new(step: impl Into<String>, source: BackendError) -> Self {
        Self {
            step: step.into(),
            source,
        }
    }
}

/// The search index could not be reset.
#[derive(Error, Debug)]
pub enum IndexResetError {
    /// The query cache could not be cleared.
    #[error("failed to clear the search index query cache")]
    ClearCache {
        #[source]
        source: BackendError,
    },

    /// The concrete index names could not be listed.
    #[error("failed to list search indices")]
    ListIndices {
        #[source]
        source: BackendError,
    },

    /// Documents of one index could not be deleted.
    #[error("failed to clear index {index}")]
    ClearIndex {
        index: String,
        #[source]
        source: BackendError,
    },
}

impl IndexResetError {
    /// Returns the index that failed to clear, if the failure was index specific.
    pub fn index(&self) -> Option<&str> {
        match self {
            IndexResetError::ClearIndex { index, .. } => Some(index),
            _ => None,
        }
    }
}

/// Errors raised while scrolling the rule table.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The scroll query could not be prepared or started. No document was yielded.
    #[error("failed to prepare the rule scroll: {message}")]
    Setup {
        message: String,
        #[source]
        source: BackendError,
    },

    /// The cursor failed partway through. Documents yielded before stay yielded.
    #[error("failed to read rule row after {rows_read} rows")]
    Read {
        rows_read: u64,
        #[source]
        source: BackendError,
    },

    /// A row could not be converted into a document; the scan stops.
    #[error("failed to build the document of rule {rule_key}")]
    Transform {
        rule_key: RuleKey,
        #[source]
        source: TransformError,
    },
}

impl ExtractionError {
    /// Returns `true` if the failure happened before any row was read.
    pub fn is_setup(&self) -> bool {
        matches!(self, ExtractionError::Setup { .. })
    }
}

/// A rule row could not be converted into a rule document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The stored severity ordinal has no named level.
    #[error("unknown severity ordinal {0}")]
    UnknownSeverity(i64),

    /// The stored rule type has no named type.
    #[error("unsupported rule type value {0}")]
    UnknownRuleType(i64),

    /// The description format tag is not a known format.
    #[error("unknown description format '{0}'")]
    UnknownDescriptionFormat(String),

    /// The markup renderer rejected the description.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// The markup renderer rejected its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed markup at line {line}: {message}")]
pub struct RenderError {
    pub line: usize,
    pub message: String,
}

/// Rule documents could not be written to the search index.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// A bulk request was rejected or could not be sent.
    #[error("bulk write of {documents} documents to index {index} failed")]
    BulkWrite {
        index: String,
        documents: usize,
        #[source]
        source: BackendError,
    },

    /// A rule document could not be serialized.
    #[error("failed to serialize the document of rule {rule_key}")]
    Serialize {
        rule_key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The blocking scroll task did not complete.
    #[error("rule scroll task aborted: {message}")]
    ScrollAborted { message: String },
}

/// Result type for maintenance operations.
pub type MaintenanceResult<T> = Result<T, MaintenanceError>;
