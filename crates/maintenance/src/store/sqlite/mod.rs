//! SQLite relational store.
//!
//! Provides the [`SessionProvider`](crate::store::SessionProvider) used by the
//! reset engine and the pooled connections scrolled by the rule pipeline. Both
//! in-memory databases (for tests) and file databases are supported.
//!
//! # Example
//!
//! ```no_run
//! use backend_maintenance::store::{SessionProvider, SqlStatement, StoreSession};
//! use backend_maintenance::store::sqlite::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("platform.db")?;
//! store.init_schema()?;
//!
//! let mut session = store.open_session()?;
//! session.execute(&SqlStatement::new("DELETE FROM events"))?;
//! session.commit()?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod schema;
mod session;

pub use backend::{SqliteStore, SqliteStoreConfig};
pub use schema::{SCHEMA_VERSION, TABLES, initialize_schema};
pub use session::SqliteSession;
