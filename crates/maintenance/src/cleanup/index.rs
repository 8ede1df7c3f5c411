//! Search index reset.

use crate::error::IndexResetError;
use crate::index::{SearchIndexClient, match_all};

/// Empties search indices without dropping them.
#[derive(Debug)]
pub struct IndexResetEngine<C: SearchIndexClient> {
    client: C,
}

impl<C: SearchIndexClient> IndexResetEngine<C> {
    /// Creates an engine over `client`.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Deletes every document of `index`. Clearing an empty or missing index
    /// succeeds and deletes nothing.
    pub async fn clear_index(&self, index: &str) -> Result<u64, IndexResetError> {
        let deleted = self
            .client
            .delete_by_query(index, &match_all())
            .await
            .map_err(|source| IndexResetError::ClearIndex {
                index: index.to_string(),
                source,
            })?;
        tracing::debug!(index = %index, deleted, "Index cleared");
        Ok(deleted)
    }

    /// Clears the query cache then every concrete index, in name order.
    ///
    /// Stops at the first failure; indices cleared before it stay cleared.
    pub async fn clear_all_indexes(&self) -> Result<u64, IndexResetError> {
        tracing::info!(client = self.client.name(), "Truncate search indices");

        self.client
            .clear_query_cache()
            .await
            .map_err(|source| IndexResetError::ClearCache { source })?;

        let indices = self
            .client
            .list_concrete_indices()
            .await
            .map_err(|source| IndexResetError::ListIndices { source })?;

        let mut deleted = 0;
        for index in &indices {
            deleted += self.clear_index(index).await?;
        }
        tracing::info!(indices = indices.len(), deleted, "Search indices truncated");
        Ok(deleted)
    }
}
