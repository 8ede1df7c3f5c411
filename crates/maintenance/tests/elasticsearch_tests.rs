//! Elasticsearch index client integration tests.
//!
//! Tests that require a running Elasticsearch instance use testcontainers
//! to spin up a real ES instance in Docker.
//!
//! Run with: `cargo test -p backend-maintenance --features elasticsearch -- elasticsearch`

#![cfg(feature = "elasticsearch")]

use backend_maintenance::index::SearchIndexClient;
use backend_maintenance::index::elasticsearch::{
    ElasticsearchAuth, ElasticsearchConfig, ElasticsearchIndexClient,
};

// ============================================================================
// Client Configuration Tests (no ES instance required)
// ============================================================================

#[test]
fn test_elasticsearch_config_defaults() {
    let config = ElasticsearchConfig::default();
    assert_eq!(config.nodes, vec!["http://localhost:9200".to_string()]);
    assert_eq!(config.index_prefix, "");
    assert_eq!(config.request_timeout_ms, 30000);
    assert!(config.auth.is_none());
    assert!(!config.disable_certificate_validation);
}

#[test]
fn test_elasticsearch_config_deserialization() {
    let config: ElasticsearchConfig = serde_json::from_str(
        r#"{
            "nodes": ["http://es1:9200"],
            "index_prefix": "sonar",
            "auth": { "Basic": { "username": "elastic", "password": "changeme" } }
        }"#,
    )
    .unwrap();

    assert_eq!(config.nodes, vec!["http://es1:9200".to_string()]);
    assert_eq!(config.index_prefix, "sonar");
    assert_eq!(config.request_timeout_ms, 30000);
    assert!(matches!(
        config.auth,
        Some(ElasticsearchAuth::Basic { ref username, .. }) if username == "elastic"
    ));
}

#[test]
fn test_client_creation() {
    // This just creates the client, it doesn't connect
    let client = ElasticsearchIndexClient::new(ElasticsearchConfig::default()).unwrap();
    assert_eq!(client.name(), "elasticsearch");
}

#[test]
fn test_client_rejects_invalid_url() {
    let config = ElasticsearchConfig {
        nodes: vec!["not a url".to_string()],
        ..Default::default()
    };
    assert!(ElasticsearchIndexClient::new(config).is_err());
}

#[test]
fn test_index_name() {
    let client = ElasticsearchIndexClient::new(ElasticsearchConfig {
        index_prefix: "sonar".to_string(),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(client.index_name("rules"), "sonar_rules");

    let unprefixed = ElasticsearchIndexClient::new(ElasticsearchConfig::default()).unwrap();
    assert_eq!(unprefixed.index_name("rules"), "rules");
}

// ============================================================================
// Integration Tests (require a Docker ES instance)
// ============================================================================

mod es_integration {
    use serde_json::json;

    use backend_maintenance::cleanup::IndexResetEngine;
    use backend_maintenance::index::elasticsearch::{ElasticsearchConfig, ElasticsearchIndexClient};
    use backend_maintenance::index::{IndexDocument, SearchIndexClient, match_all};

    use testcontainers::ImageExt;
    use testcontainers::runners::AsyncRunner;
    use testcontainers_modules::elastic_search::ElasticSearch;
    use tokio::sync::OnceCell;

    /// Shared Elasticsearch container reused across all tests in this module.
    struct SharedEs {
        host: String,
        port: u16,
        /// Kept alive for the duration of the test binary; dropped at process exit.
        _container: testcontainers::ContainerAsync<ElasticSearch>,
    }

    static SHARED_ES: OnceCell<SharedEs> = OnceCell::const_new();

    async fn shared_es() -> &'static SharedEs {
        SHARED_ES
            .get_or_init(|| async {
                let run_id = std::env::var("GITHUB_RUN_ID").unwrap_or_default();
                let container = ElasticSearch::default()
                    .with_env_var("ES_JAVA_OPTS", "-Xms256m -Xmx256m")
                    .with_label("github.run_id", &run_id)
                    .with_startup_timeout(std::time::Duration::from_secs(120))
                    .start()
                    .await
                    .expect("Failed to start Elasticsearch container");

                let port = container
                    .get_host_port_ipv4(9200)
                    .await
                    .expect("Failed to get host port");

                let host = container
                    .get_host()
                    .await
                    .expect("Failed to get host")
                    .to_string();

                SharedEs {
                    host,
                    port,
                    _container: container,
                }
            })
            .await
    }

    /// Creates a client whose indices are isolated from other tests by a unique prefix.
    async fn create_client() -> ElasticsearchIndexClient {
        let es = shared_es().await;
        let prefix = format!("t{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);
        let client = ElasticsearchIndexClient::new(ElasticsearchConfig {
            nodes: vec![format!("http://{}:{}", es.host, es.port)],
            index_prefix: prefix,
            ..Default::default()
        })
        .expect("Failed to create client");
        client.health_check().await.expect("Cluster is not healthy");
        client
    }

    fn documents(count: usize) -> Vec<IndexDocument> {
        (0..count)
            .map(|i| IndexDocument::new(format!("doc-{}", i), json!({ "n": i })))
            .collect()
    }

    #[tokio::test]
    async fn test_bulk_index_and_list() {
        let client = create_client().await;

        client.bulk_index("rules", documents(3)).await.unwrap();
        client.bulk_index("issues", documents(2)).await.unwrap();

        let indices = client.list_concrete_indices().await.unwrap();
        assert_eq!(
            indices.into_iter().collect::<Vec<_>>(),
            vec!["issues".to_string(), "rules".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_by_query_counts_documents() {
        let client = create_client().await;

        client.bulk_index("rules", documents(4)).await.unwrap();
        client.refresh_index("rules").await.unwrap();

        assert_eq!(client.delete_by_query("rules", &match_all()).await.unwrap(), 4);
        assert_eq!(client.delete_by_query("rules", &match_all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_query_on_missing_index() {
        let client = create_client().await;
        assert_eq!(
            client.delete_by_query("missing", &match_all()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_clear_query_cache() {
        let client = create_client().await;
        client.clear_query_cache().await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_all_indexes_keeps_index_definitions() {
        let client = create_client().await;
        client.bulk_index("rules", documents(3)).await.unwrap();
        client.bulk_index("issues", documents(2)).await.unwrap();
        client.refresh_index("rules").await.unwrap();
        client.refresh_index("issues").await.unwrap();

        let engine = IndexResetEngine::new(client);
        let deleted = engine.clear_all_indexes().await.unwrap();
        assert_eq!(deleted, 5);

        let indices = engine.client().list_concrete_indices().await.unwrap();
        assert_eq!(indices.len(), 2, "indices survive a reset");
    }
}
