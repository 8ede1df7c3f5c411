//! In-memory search index client.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::{IndexDocument, SearchIndexClient, match_all};
use crate::error::BackendError;

const BACKEND_NAME: &str = "memory";

/// An operation the in-memory client can be told to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexFailure {
    /// `list_concrete_indices` fails.
    ListIndices,
    /// `clear_query_cache` fails.
    ClearCache,
    /// `delete_by_query` fails for the named index.
    DeleteByQuery(String),
    /// `bulk_index` fails once this many bulk requests have succeeded.
    BulkIndexAfter(usize),
}

#[derive(Debug, Default)]
struct State {
    indices: BTreeMap<String, BTreeMap<String, Value>>,
    failures: Vec<IndexFailure>,
    cache_clears: usize,
    delete_calls: Vec<String>,
    bulk_sizes: Vec<usize>,
}

/// A search index held in process memory.
///
/// Only match-all deletions are supported. Every call is recorded so tests can
/// assert on what was sent.
#[derive(Debug, Default)]
pub struct InMemoryIndexClient {
    state: RwLock<State>,
}

impl InMemoryIndexClient {
    /// Creates an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index if it does not exist.
    pub fn create_index(&self, index: &str) {
        self.state.write().indices.entry(index.to_string()).or_default();
    }

    /// Stores a document, creating the index if needed.
    pub fn insert(&self, index: &str, id: &str, source: Value) {
        self.state
            .write()
            .indices
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), source);
    }

    /// Registers a failure for subsequent calls.
    pub fn fail_on(&self, failure: IndexFailure) {
        self.state.write().failures.push(failure);
    }

    /// Returns the documents of `index` keyed by id.
    pub fn documents(&self, index: &str) -> BTreeMap<String, Value> {
        self.state
            .read()
            .indices
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of documents in `index`.
    pub fn document_count(&self, index: &str) -> usize {
        self.state.read().indices.get(index).map_or(0, BTreeMap::len)
    }

    /// Returns how many times the query cache was cleared.
    pub fn cache_clear_count(&self) -> usize {
        self.state.read().cache_clears
    }

    /// Returns the indices passed to `delete_by_query`, in call order.
    pub fn delete_calls(&self) -> Vec<String> {
        self.state.read().delete_calls.clone()
    }

    /// Returns the size of each successful bulk request, in call order.
    pub fn bulk_sizes(&self) -> Vec<usize> {
        self.state.read().bulk_sizes.clone()
    }

    fn injected(&self, failure: &IndexFailure) -> bool {
        self.state.read().failures.contains(failure)
    }
}

fn injected_error(operation: &str) -> BackendError {
    BackendError::Unavailable {
        backend_name: BACKEND_NAME.to_string(),
        message: format!("injected failure on {}", operation),
    }
}

#[async_trait]
impl SearchIndexClient for InMemoryIndexClient {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn list_concrete_indices(&self) -> Result<BTreeSet<String>, BackendError> {
        if self.injected(&IndexFailure::ListIndices) {
            return Err(injected_error("list indices"));
        }
        Ok(self.state.read().indices.keys().cloned().collect())
    }

    async fn clear_query_cache(&self) -> Result<(), BackendError> {
        if self.injected(&IndexFailure::ClearCache) {
            return Err(injected_error("clear cache"));
        }
        self.state.write().cache_clears += 1;
        Ok(())
    }

    async fn delete_by_query(&self, index: &str, query: &Value) -> Result<u64, BackendError> {
        if self.injected(&IndexFailure::DeleteByQuery(index.to_string())) {
            return Err(injected_error("delete by query"));
        }
        if *query != match_all() {
            return Err(BackendError::Internal {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("unsupported query {}", query),
                source: None,
            });
        }

        let mut state = self.state.write();
        state.delete_calls.push(index.to_string());
        let deleted = state.indices.get_mut(index).map_or(0, |docs| {
            let count = docs.len();
            docs.clear();
            count
        });
        Ok(deleted as u64)
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: Vec<IndexDocument>,
    ) -> Result<(), BackendError> {
        let mut state = self.state.write();
        let succeeded = state.bulk_sizes.len();
        let fails = state
            .failures
            .iter()
            .any(|f| matches!(f, IndexFailure::BulkIndexAfter(n) if *n <= succeeded));
        if fails {
            return Err(injected_error("bulk index"));
        }

        state.bulk_sizes.push(documents.len());
        let docs = state.indices.entry(index.to_string()).or_default();
        for document in documents {
            docs.insert(document.id, document.source);
        }
        Ok(())
    }
}
