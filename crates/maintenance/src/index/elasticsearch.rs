//! Elasticsearch search index client.
//!
//! Index names handed to and returned by this client are logical names. When an
//! index prefix is configured, the concrete index is `{prefix}_{name}` and only
//! indices carrying the prefix are listed; otherwise every visible index is.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::auth::Credentials;
use elasticsearch::cat::CatIndicesParts;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::{IndicesClearCacheParts, IndicesRefreshParts};
use elasticsearch::params::Conflicts;
use elasticsearch::{BulkOperation, BulkParts, DeleteByQueryParts, Elasticsearch};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{IndexDocument, SearchIndexClient};
use crate::error::BackendError;

const BACKEND_NAME: &str = "elasticsearch";

/// Authentication configuration for Elasticsearch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ElasticsearchAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Configuration for the Elasticsearch client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Elasticsearch node URLs (e.g., `["http://localhost:9200"]`).
    /// Only the first node is used (single-node connection pool).
    pub nodes: Vec<String>,

    /// Index name prefix (default: none).
    #[serde(default)]
    pub index_prefix: String,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["http://localhost:9200".to_string()],
            index_prefix: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
        }
    }
}

/// Search index client backed by an Elasticsearch cluster.
pub struct ElasticsearchIndexClient {
    client: Elasticsearch,
    config: ElasticsearchConfig,
}

impl Debug for ElasticsearchIndexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchIndexClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn internal_error(message: String) -> BackendError {
    BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message,
        source: None,
    }
}

impl ElasticsearchIndexClient {
    /// Creates a client. No request is sent until the first operation.
    pub fn new(config: ElasticsearchConfig) -> Result<Self, BackendError> {
        let client = Self::build_client(&config)?;
        Ok(Self { client, config })
    }

    fn build_client(config: &ElasticsearchConfig) -> Result<Elasticsearch, BackendError> {
        let url = config
            .nodes
            .first()
            .cloned()
            .unwrap_or_else(|| "http://localhost:9200".to_string());

        let parsed_url: elasticsearch::http::Url =
            url.parse().map_err(|e| BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Invalid URL: {}", e),
            })?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);

        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                ElasticsearchAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                ElasticsearchAuth::Bearer { token } => {
                    builder.auth(Credentials::Bearer(token.clone()))
                }
            };
        }

        let transport = builder.build().map_err(|e| BackendError::ConnectionFailed {
            backend_name: BACKEND_NAME.to_string(),
            message: format!("Failed to build transport: {}", e),
        })?;

        Ok(Elasticsearch::new(transport))
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// Returns the concrete index name of a logical index.
    pub fn index_name(&self, name: &str) -> String {
        if self.config.index_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", self.config.index_prefix, name)
        }
    }

    /// Maps a concrete index name back to its logical name, or `None` when the
    /// index is not managed by this client.
    fn logical_name(&self, concrete: &str) -> Option<String> {
        if concrete.starts_with('.') {
            return None;
        }
        if self.config.index_prefix.is_empty() {
            return Some(concrete.to_string());
        }
        concrete
            .strip_prefix(self.config.index_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }

    /// Checks that the cluster answers and is not red.
    pub async fn health_check(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .cluster()
            .health(elasticsearch::cluster::ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Health check failed: {}", e),
            })?;

        let body = json_body(response, "cluster health").await?;
        let cluster_status = body
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown");

        if cluster_status == "red" {
            return Err(BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Cluster status is red: {:?}", body),
            });
        }
        Ok(())
    }

    /// Refreshes an index to make recently written documents searchable.
    pub async fn refresh_index(&self, name: &str) -> Result<(), BackendError> {
        let index = self.index_name(name);
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[&index]))
            .send()
            .await
            .map_err(|e| internal_error(format!("Failed to refresh index {}: {}", index, e)))?;
        json_body(response, "refresh").await.map(|_| ())
    }
}

/// Fails on a non-success status, otherwise parses the body as JSON.
async fn json_body(response: Response, operation: &str) -> Result<Value, BackendError> {
    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(internal_error(format!(
            "{} failed (status {}): {}",
            operation, status, body
        )));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| internal_error(format!("Failed to parse {} response: {}", operation, e)))
}

#[async_trait]
impl SearchIndexClient for ElasticsearchIndexClient {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn list_concrete_indices(&self) -> Result<BTreeSet<String>, BackendError> {
        let pattern = if self.config.index_prefix.is_empty() {
            "*".to_string()
        } else {
            format!("{}_*", self.config.index_prefix)
        };

        let response = self
            .client
            .cat()
            .indices(CatIndicesParts::Index(&[&pattern]))
            .format("json")
            .h(&["index"])
            .send()
            .await
            .map_err(|e| internal_error(format!("Failed to list indices: {}", e)))?;

        let body = json_body(response, "cat indices").await?;
        let indices = body
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("index").and_then(Value::as_str))
                    .filter_map(|concrete| self.logical_name(concrete))
                    .collect()
            })
            .unwrap_or_default();
        Ok(indices)
    }

    async fn clear_query_cache(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .indices()
            .clear_cache(IndicesClearCacheParts::None)
            .query(true)
            .send()
            .await
            .map_err(|e| internal_error(format!("Failed to clear cache: {}", e)))?;
        json_body(response, "clear cache").await.map(|_| ())
    }

    async fn delete_by_query(&self, name: &str, query: &Value) -> Result<u64, BackendError> {
        let index = self.index_name(name);
        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[&index]))
            .body(json!({ "query": query }))
            .conflicts(Conflicts::Proceed)
            .ignore_unavailable(true)
            .refresh(true)
            .send()
            .await
            .map_err(|e| {
                internal_error(format!("Failed to delete documents of {}: {}", index, e))
            })?;

        let body = json_body(response, "delete by query").await?;
        Ok(body.get("deleted").and_then(Value::as_u64).unwrap_or(0))
    }

    async fn bulk_index(
        &self,
        name: &str,
        documents: Vec<IndexDocument>,
    ) -> Result<(), BackendError> {
        if documents.is_empty() {
            return Ok(());
        }
        let index = self.index_name(name);
        let count = documents.len();

        let operations: Vec<BulkOperation<Value>> = documents
            .into_iter()
            .map(|doc| BulkOperation::index(doc.source).id(doc.id).into())
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(&index))
            .body(operations)
            .send()
            .await
            .map_err(|e| internal_error(format!("Failed to send bulk request: {}", e)))?;

        let body = json_body(response, "bulk").await?;
        if body.get("errors").and_then(Value::as_bool).unwrap_or(false) {
            let first = body
                .get("items")
                .and_then(Value::as_array)
                .and_then(|items| {
                    items
                        .iter()
                        .find_map(|item| item.get("index").and_then(|op| op.get("error")))
                })
                .cloned()
                .unwrap_or(Value::Null);
            return Err(internal_error(format!(
                "Bulk request to {} rejected documents ({} sent), first error: {}",
                index, count, first
            )));
        }
        Ok(())
    }
}
