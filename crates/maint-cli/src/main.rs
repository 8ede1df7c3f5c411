//! Backend maintenance command line.
//!
//! Resets the relational store and the search index, or reindexes rules.

mod config;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use backend_maintenance::TenantId;
use backend_maintenance::cleanup::BackendCleanup;
use backend_maintenance::index::elasticsearch::ElasticsearchIndexClient;
use backend_maintenance::rules::{RuleDocumentTransform, RuleIndexer, RuleMarkdown};
use backend_maintenance::store::sqlite::SqliteStore;

use crate::config::{Command, MaintenanceCli};

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "backend_maint={},backend_maintenance={}",
            level, level
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Opens the SQLite store, creating the schema if needed.
fn open_store(cli: &MaintenanceCli) -> anyhow::Result<SqliteStore> {
    info!(database = %cli.database, "Opening SQLite store");
    let store = SqliteStore::open(&cli.database)?;
    store.init_schema()?;
    Ok(store)
}

/// Connects to Elasticsearch and checks the cluster health.
async fn connect_index(cli: &MaintenanceCli) -> anyhow::Result<Arc<ElasticsearchIndexClient>> {
    let config = cli.elasticsearch_config();
    info!(
        nodes = ?config.nodes,
        index_prefix = %config.index_prefix,
        "Connecting to Elasticsearch"
    );
    let client = ElasticsearchIndexClient::new(config)?;
    client.health_check().await?;
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = MaintenanceCli::parse();
    init_logging(&cli.log_level);

    if let Err(errors) = cli.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        version = backend_maintenance::VERSION,
        command = ?cli.command,
        "Starting backend maintenance"
    );

    let store = open_store(&cli)?;
    let client = connect_index(&cli).await?;

    match &cli.command {
        Command::ClearAll => {
            let cleanup = BackendCleanup::new(store, client, cli.cleanup_config());
            let report = cleanup.clear_all().await?;
            info!(
                statements = report.store.statements,
                rows = report.store.rows_affected,
                documents = report.documents_deleted,
                "Backend cleared"
            );
        }
        Command::ResetData => {
            let cleanup = BackendCleanup::new(store, client, cli.cleanup_config());
            let report = cleanup.reset_data().await?;
            info!(
                statements = report.store.statements,
                rows = report.store.rows_affected,
                documents = report.documents_deleted,
                "Analysis data reset"
            );
        }
        Command::IndexRules { tenant, rule, .. } => {
            let renderer = RuleMarkdown::new()
                .map_err(|e| anyhow::anyhow!("Failed to build the markup renderer: {}", e))?;
            let transform = RuleDocumentTransform::new(Arc::new(renderer));
            let indexer = RuleIndexer::new(store, client, transform, cli.indexer_config());

            let tenant = TenantId::new(tenant.as_str());
            let report = match rule {
                Some(key) => indexer.index_rule(&tenant, key).await?,
                None => indexer.index_all(&tenant).await?,
            };
            info!(
                documents = report.documents_indexed,
                batches = report.batches,
                elapsed_ms = report.elapsed().num_milliseconds(),
                "Rules indexed"
            );
        }
    }

    Ok(())
}
