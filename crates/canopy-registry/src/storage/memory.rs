use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use canopy_core::{Client, MatrixKey, Server, ServerStatus};
use indexmap::IndexMap;

use crate::{InsertOutcome, RegistrySnapshot, RegistryStore, StoreError};

#[derive(Default)]
struct Registry {
    servers: IndexMap<String, Server>,
    clients: IndexMap<String, Client>,
    entries: HashMap<MatrixKey, bool>,
}

/// In-process registry store
///
/// A single lock guards every record, so each operation observes and
/// leaves a consistent registry. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Registry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-applied write
    // behind, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn insert_server(&self, server: &Server, seeds: &[(MatrixKey, bool)]) -> Result<InsertOutcome, StoreError> {
        let mut registry = self.write();

        if registry.servers.contains_key(&server.id) {
            return Ok(InsertOutcome::DuplicateId);
        }
        if registry.servers.values().any(|s| s.name == server.name) {
            return Ok(InsertOutcome::DuplicateName);
        }

        registry.servers.insert(server.id.clone(), server.clone());
        registry.entries.extend(seeds.iter().cloned());

        Ok(InsertOutcome::Inserted)
    }

    async fn remove_server(&self, id: &str) -> Result<Option<Server>, StoreError> {
        let mut registry = self.write();

        let Some(server) = registry.servers.shift_remove(id) else {
            return Ok(None);
        };
        registry.entries.retain(|key, _| key.server_id() != id);

        Ok(Some(server))
    }

    async fn get_server(&self, id: &str) -> Result<Option<Server>, StoreError> {
        Ok(self.read().servers.get(id).cloned())
    }

    async fn list_servers(&self) -> Result<Vec<Server>, StoreError> {
        Ok(self.read().servers.values().cloned().collect())
    }

    async fn set_server_status(&self, id: &str, status: ServerStatus) -> Result<Option<Server>, StoreError> {
        let mut registry = self.write();

        Ok(registry.servers.get_mut(id).map(|server| {
            server.status = status;
            server.clone()
        }))
    }

    async fn insert_client(&self, client: &Client) -> Result<bool, StoreError> {
        let mut registry = self.write();

        if registry.clients.contains_key(&client.name) {
            return Ok(false);
        }
        registry.clients.insert(client.name.clone(), client.clone());

        Ok(true)
    }

    async fn get_client(&self, name: &str) -> Result<Option<Client>, StoreError> {
        Ok(self.read().clients.get(name).cloned())
    }

    async fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        Ok(self.read().clients.values().cloned().collect())
    }

    async fn get_entry(&self, key: &MatrixKey) -> Result<Option<bool>, StoreError> {
        Ok(self.read().entries.get(key).copied())
    }

    async fn toggle_entry(&self, key: &MatrixKey, default: bool) -> Result<Option<bool>, StoreError> {
        let mut registry = self.write();

        if !registry.clients.contains_key(key.client()) || !registry.servers.contains_key(key.server_id()) {
            return Ok(None);
        }

        let value = registry.entries.entry(key.clone()).or_insert(default);
        *value = !*value;

        Ok(Some(*value))
    }

    async fn snapshot(&self) -> Result<RegistrySnapshot, StoreError> {
        let registry = self.read();

        Ok(RegistrySnapshot {
            servers: registry.servers.values().cloned().collect(),
            clients: registry.clients.values().cloned().collect(),
            entries: registry.entries.clone(),
        })
    }
}
