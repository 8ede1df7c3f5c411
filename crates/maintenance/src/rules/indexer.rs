//! Bulk indexing of rule documents.
//!
//! The rule scroll is blocking and runs on a blocking task; documents cross to the
//! async side through a bounded channel and are written to the search index in
//! batches. When a bulk write fails the receiver is dropped, which stops the
//! scroll and releases its cursor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::RuleKey;
use super::model::RuleDocument;
use super::scroll::RuleScroll;
use super::transform::RuleDocumentTransform;
use crate::error::{ExtractionError, IndexingError, MaintenanceResult};
use crate::index::{IndexDocument, SearchIndexClient};
use crate::store::sqlite::SqliteStore;
use crate::tenant::TenantId;

/// Configuration for the rule indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleIndexerConfig {
    /// Index receiving the rule documents.
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Documents per bulk request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Documents buffered between the scroll and the bulk writer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_index_name() -> String {
    "rules".to_string()
}

fn default_batch_size() -> usize {
    500
}

fn default_channel_capacity() -> usize {
    1000
}

impl Default for RuleIndexerConfig {
    fn default() -> Self {
        Self {
            index_name: default_index_name(),
            batch_size: default_batch_size(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Outcome of an indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingReport {
    /// Documents written to the index.
    pub documents_indexed: u64,
    /// Bulk requests sent.
    pub batches: usize,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the last batch was written.
    pub finished_at: DateTime<Utc>,
}

impl IndexingReport {
    /// Returns how long the run took.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Scrolls the rule table into the search index.
#[derive(Debug)]
pub struct RuleIndexer<C: SearchIndexClient> {
    store: SqliteStore,
    client: C,
    transform: RuleDocumentTransform,
    config: RuleIndexerConfig,
}

impl<C: SearchIndexClient> RuleIndexer<C> {
    /// Creates an indexer.
    pub fn new(
        store: SqliteStore,
        client: C,
        transform: RuleDocumentTransform,
        config: RuleIndexerConfig,
    ) -> Self {
        Self {
            store,
            client,
            transform,
            config,
        }
    }

    /// Returns the indexer configuration.
    pub fn config(&self) -> &RuleIndexerConfig {
        &self.config
    }

    /// Indexes every rule with the tags of `tenant`.
    pub async fn index_all(&self, tenant: &TenantId) -> MaintenanceResult<IndexingReport> {
        self.run(tenant, None).await
    }

    /// Indexes the single rule `key`. Indexes nothing if the rule does not exist.
    pub async fn index_rule(
        &self,
        tenant: &TenantId,
        key: &RuleKey,
    ) -> MaintenanceResult<IndexingReport> {
        self.run(tenant, Some(key.clone())).await
    }

    async fn run(
        &self,
        tenant: &TenantId,
        key: Option<RuleKey>,
    ) -> MaintenanceResult<IndexingReport> {
        let started_at = Utc::now();
        tracing::info!(
            tenant = %tenant,
            index = %self.config.index_name,
            key = ?key,
            "Indexing rules"
        );

        let (mut tx, mut rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let store = self.store.clone();
        let transform = self.transform.clone();
        let scroll_tenant = tenant.clone();

        let producer = tokio::task::spawn_blocking(move || -> Result<u64, ExtractionError> {
            let conn = store
                .get_connection()
                .map_err(|source| ExtractionError::Setup {
                    message: "failed to get a store connection".to_string(),
                    source,
                })?;
            let mut scroll = RuleScroll::prepare(&conn, &scroll_tenant, key.as_ref(), transform)?;
            scroll.documents()?.drain_into(&mut tx)
        });

        let consumed = self.consume(&mut rx).await;
        // unblocks the producer when the consumer stopped early
        drop(rx);

        let produced = producer
            .await
            .map_err(|e| IndexingError::ScrollAborted {
                message: e.to_string(),
            })?;

        let (documents_indexed, batches) = consumed?;
        produced?;

        let report = IndexingReport {
            documents_indexed,
            batches,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            documents = report.documents_indexed,
            batches = report.batches,
            elapsed_ms = report.elapsed().num_milliseconds(),
            "Rules indexed"
        );
        Ok(report)
    }

    /// Writes received documents in batches until the channel closes.
    async fn consume(
        &self,
        rx: &mut mpsc::Receiver<RuleDocument>,
    ) -> Result<(u64, usize), IndexingError> {
        let batch_size = self.config.batch_size.max(1);
        let mut batch = Vec::with_capacity(batch_size);
        let mut indexed = 0u64;
        let mut batches = 0usize;

        while let Some(document) = rx.recv().await {
            let indexed_document =
                document
                    .to_index_document()
                    .map_err(|source| IndexingError::Serialize {
                        rule_key: document.key.clone(),
                        source,
                    })?;
            batch.push(indexed_document);

            if batch.len() >= batch_size {
                indexed += self.flush(&mut batch).await?;
                batches += 1;
            }
        }

        if !batch.is_empty() {
            indexed += self.flush(&mut batch).await?;
            batches += 1;
        }
        Ok((indexed, batches))
    }

    async fn flush(&self, batch: &mut Vec<IndexDocument>) -> Result<u64, IndexingError> {
        let documents = std::mem::take(batch);
        let count = documents.len();
        self.client
            .bulk_index(&self.config.index_name, documents)
            .await
            .map_err(|source| IndexingError::BulkWrite {
                index: self.config.index_name.clone(),
                documents: count,
                source,
            })?;
        tracing::debug!(index = %self.config.index_name, documents = count, "Bulk written");
        Ok(count as u64)
    }
}
