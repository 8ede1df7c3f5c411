//! Backend reset and cleanup.
//!
//! [`BackendCleanup`] restores the relational store and the search index to the
//! state of a fresh installation. Store work runs synchronously on the calling
//! task; index work is awaited on the search index client.
//!
//! Neither store is rolled back when the other fails: a failed index reset after
//! a successful store reset leaves the store reset in place.

mod index;
mod policy;
mod store;

pub use index::IndexResetEngine;
pub use policy::{CleanupPolicy, TableCleanupAction};
pub use store::{ANALYSIS_TABLES, RESOURCE_RELATED_TABLES, ResetSummary, StoreResetEngine};

use crate::config::CleanupConfig;
use crate::error::MaintenanceResult;
use crate::index::SearchIndexClient;
use crate::store::SessionProvider;
use crate::store::sqlite::TABLES;

/// What a full cleanup removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Store side of the cleanup.
    pub store: ResetSummary,
    /// Documents deleted from the search index.
    pub documents_deleted: u64,
}

/// Resets both the relational store and the search index.
#[derive(Debug)]
pub struct BackendCleanup<P: SessionProvider, C: SearchIndexClient> {
    store: StoreResetEngine<P>,
    index: IndexResetEngine<C>,
    config: CleanupConfig,
}

impl<P: SessionProvider, C: SearchIndexClient> BackendCleanup<P, C> {
    /// Creates a cleanup over every table of the platform schema.
    pub fn new(provider: P, client: C, config: CleanupConfig) -> Self {
        Self::with_tables(provider, client, config, TABLES.iter().copied())
    }

    /// Creates a cleanup over an explicit table list, in deletion order.
    pub fn with_tables<I, S>(provider: P, client: C, config: CleanupConfig, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            store: StoreResetEngine::new(provider, config.reserved.clone(), tables),
            index: IndexResetEngine::new(client),
            config,
        }
    }

    /// Returns the store reset engine.
    pub fn store(&self) -> &StoreResetEngine<P> {
        &self.store
    }

    /// Returns the index reset engine.
    pub fn index(&self) -> &IndexResetEngine<C> {
        &self.index
    }

    /// Clears the store, then every search index.
    pub async fn clear_all(&self) -> MaintenanceResult<CleanupReport> {
        let store = self.clear_db()?;
        let documents_deleted = self.clear_indexes().await?;
        Ok(CleanupReport {
            store,
            documents_deleted,
        })
    }

    /// Applies the cleanup policy to every table.
    pub fn clear_db(&self) -> MaintenanceResult<ResetSummary> {
        Ok(self.store.clear_all()?)
    }

    /// Clears the query cache and every search index.
    pub async fn clear_indexes(&self) -> MaintenanceResult<u64> {
        Ok(self.index.clear_all_indexes().await?)
    }

    /// Resets the store data, then the indexes backed by the truncated tables.
    pub async fn reset_data(&self) -> MaintenanceResult<CleanupReport> {
        let store = self.store.reset_data()?;

        let mut documents_deleted = 0;
        for index in &self.config.reset_data.indexes {
            documents_deleted += self.index.clear_index(index).await?;
        }

        tracing::info!(
            rows = store.rows_affected,
            documents = documents_deleted,
            "Backend data reset"
        );
        Ok(CleanupReport {
            store,
            documents_deleted,
        })
    }

    /// Deletes every document of one index.
    pub async fn clear_index(&self, index: &str) -> MaintenanceResult<u64> {
        Ok(self.index.clear_index(index).await?)
    }
}
