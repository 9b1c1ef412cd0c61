#![deny(unused)]
//! Storage backends for Traffic Ops.
//!
//! Both backends implement [`Datastore`] and keep records as JSON documents,
//! leaving schema and typing to the API handlers.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use traffic_ops_core::{
    config::{DatabaseConfig, StoreBackend},
    traits::Datastore,
    Error, Result,
};

pub use memory::InMemoryDatastore;
pub use sqlite::SqliteDatastore;

/// Open the datastore selected by the configuration.
pub fn open_datastore(config: &DatabaseConfig) -> Result<Arc<dyn Datastore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Initializing In-Memory Datastore");
            Ok(Arc::new(InMemoryDatastore::new()))
        }
        StoreBackend::Sqlite => {
            let path = config.path.as_deref().ok_or_else(|| {
                Error::storage("database.path is required for the sqlite backend")
            })?;
            tracing::info!(path = %path, "Initializing SQLite Datastore");
            Ok(Arc::new(SqliteDatastore::new(path)?))
        }
    }
}
