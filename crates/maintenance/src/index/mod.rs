//! Search index client abstraction.
//!
//! The reset engine and the rule indexer talk to the search index only through
//! [`SearchIndexClient`]. Two implementations ship with the crate:
//!
//! - [`InMemoryIndexClient`]: a process-local index used by tests and dry runs
//! - `ElasticsearchIndexClient`: the production client (feature `elasticsearch`)

mod memory;

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;

pub use memory::{InMemoryIndexClient, IndexFailure};

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::BackendError;

/// A document ready to be written to the search index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    /// Document id, unique within its index.
    pub id: String,
    /// Document body.
    pub source: Value,
}

impl IndexDocument {
    /// Creates a document.
    pub fn new(id: impl Into<String>, source: Value) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// Returns the query matching every document of an index.
pub fn match_all() -> Value {
    json!({ "match_all": {} })
}

/// Operations the maintenance layer needs from the search index.
#[async_trait]
pub trait SearchIndexClient: Send + Sync {
    /// Returns a short name identifying the client, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Lists the concrete (non-alias) indices managed by this client.
    async fn list_concrete_indices(&self) -> Result<BTreeSet<String>, BackendError>;

    /// Clears the query caches of every index.
    async fn clear_query_cache(&self) -> Result<(), BackendError>;

    /// Deletes the documents of `index` matching `query` and returns how many were
    /// deleted. Deleting from a missing index deletes nothing.
    async fn delete_by_query(&self, index: &str, query: &Value) -> Result<u64, BackendError>;

    /// Writes (creates or replaces) `documents` into `index` in one request.
    async fn bulk_index(&self, index: &str, documents: Vec<IndexDocument>)
    -> Result<(), BackendError>;
}

#[async_trait]
impl<C: SearchIndexClient + ?Sized> SearchIndexClient for Arc<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn list_concrete_indices(&self) -> Result<BTreeSet<String>, BackendError> {
        (**self).list_concrete_indices().await
    }

    async fn clear_query_cache(&self) -> Result<(), BackendError> {
        (**self).clear_query_cache().await
    }

    async fn delete_by_query(&self, index: &str, query: &Value) -> Result<u64, BackendError> {
        (**self).delete_by_query(index, query).await
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: Vec<IndexDocument>,
    ) -> Result<(), BackendError> {
        (**self).bulk_index(index, documents).await
    }
}
