//! # backend-maintenance
//!
//! Administrative maintenance for a backend made of a relational store and a
//! search index derived from it.
//!
//! ## Overview
//!
//! - **Reset and cleanup** ([`cleanup`]): bring both stores back to the state of a
//!   fresh installation while keeping a few reserved rows (the default
//!   organization, the administrator account, the default-organization property).
//! - **Rule extraction** ([`rules`]): stream the rule table into denormalized
//!   search documents, resolving template references and merging tag lists,
//!   without buffering the table in memory.
//!
//! ## Backends
//!
//! | Concern | Abstraction | Implementations |
//! |---|---|---|
//! | Relational store | [`store::SessionProvider`] | [`store::sqlite::SqliteStore`] |
//! | Search index | [`index::SearchIndexClient`] | [`index::InMemoryIndexClient`], Elasticsearch (feature `elasticsearch`) |
//! | Description markup | [`rules::MarkupRenderer`] | [`rules::RuleMarkdown`] |
//!
//! ## Example
//!
//! ```no_run
//! use backend_maintenance::cleanup::BackendCleanup;
//! use backend_maintenance::config::CleanupConfig;
//! use backend_maintenance::index::InMemoryIndexClient;
//! use backend_maintenance::store::sqlite::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("platform.db")?;
//! store.init_schema()?;
//!
//! let cleanup = BackendCleanup::new(store, InMemoryIndexClient::new(), CleanupConfig::default());
//! let report = cleanup.reset_data().await?;
//! println!("{} rows removed", report.store.rows_affected);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cleanup;
pub mod config;
pub mod error;
pub mod index;
pub mod rules;
pub mod store;
pub mod tenant;

// Re-export commonly used types at crate root
pub use cleanup::{BackendCleanup, CleanupReport, IndexResetEngine, StoreResetEngine};
pub use config::{CleanupConfig, ReservedRows, ResetDataConfig};
pub use error::{MaintenanceError, MaintenanceResult};
pub use index::SearchIndexClient;
pub use rules::{RuleDocument, RuleIndexer, RuleKey, RuleScroll};
pub use store::{SessionProvider, StoreSession};
pub use tenant::TenantId;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
