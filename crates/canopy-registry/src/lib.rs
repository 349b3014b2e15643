#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod snapshot;
pub mod storage;

use std::sync::Arc;

use async_trait::async_trait;
use canopy_config::StorageConfig;
use canopy_core::{Client, MatrixKey, Server, ServerStatus};
use secrecy::ExposeSecret;

pub use error::StoreError;
pub use snapshot::RegistrySnapshot;
pub use storage::{memory::MemoryStore, redis::RedisStore};

/// Result of inserting a server record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A server with the same id already exists
    DuplicateId,
    /// A server with the same name already exists
    DuplicateName,
}

/// Durable record of servers, clients and the access matrix
///
/// Pure data access without enablement policy. Every method is atomic on
/// its own: [`RegistryStore::toggle_entry`] is a read-modify-write that
/// never loses a concurrent update, [`RegistryStore::insert_server`] writes
/// the record and its seeded matrix rows together, and
/// [`RegistryStore::snapshot`] reads all rows at one point in time.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Insert a server together with its seeded matrix rows
    async fn insert_server(&self, server: &Server, seeds: &[(MatrixKey, bool)]) -> Result<InsertOutcome, StoreError>;

    /// Remove a server and every matrix row referencing it
    async fn remove_server(&self, id: &str) -> Result<Option<Server>, StoreError>;

    async fn get_server(&self, id: &str) -> Result<Option<Server>, StoreError>;

    /// All servers in registration order
    async fn list_servers(&self) -> Result<Vec<Server>, StoreError>;

    /// Update the administrative status, returning the updated record
    async fn set_server_status(&self, id: &str, status: ServerStatus) -> Result<Option<Server>, StoreError>;

    /// Insert a client unless one with the same name exists
    ///
    /// Returns whether the client was created.
    async fn insert_client(&self, client: &Client) -> Result<bool, StoreError>;

    async fn get_client(&self, name: &str) -> Result<Option<Client>, StoreError>;

    /// All clients in insertion order
    async fn list_clients(&self) -> Result<Vec<Client>, StoreError>;

    /// Stored value of one matrix cell
    async fn get_entry(&self, key: &MatrixKey) -> Result<Option<bool>, StoreError>;

    /// Atomically flip one matrix cell
    ///
    /// A missing cell is treated as holding `default`. Returns the new
    /// value, or `None` when the cell's client or server no longer exists,
    /// in which case nothing is written.
    async fn toggle_entry(&self, key: &MatrixKey, default: bool) -> Result<Option<bool>, StoreError>;

    /// Consistent point-in-time copy of every record
    async fn snapshot(&self) -> Result<RegistrySnapshot, StoreError>;
}

/// Open the store selected by configuration
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn RegistryStore>, StoreError> {
    match config {
        StorageConfig::Memory => {
            tracing::info!("using in-memory registry store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageConfig::Redis(redis) => {
            let store = RedisStore::connect(redis.url.expose_secret(), &redis.key_prefix).await?;
            tracing::info!(key_prefix = %redis.key_prefix, "using redis registry store");
            Ok(Arc::new(store))
        }
    }
}
