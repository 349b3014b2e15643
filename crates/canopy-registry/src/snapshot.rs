use std::collections::HashMap;

use canopy_core::{Client, MatrixKey, Server};

/// Point-in-time copy of the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Servers in registration order
    pub servers: Vec<Server>,
    /// Clients in insertion order
    pub clients: Vec<Client>,
    /// Stored matrix cells
    pub entries: HashMap<MatrixKey, bool>,
}

impl RegistrySnapshot {
    pub fn server(&self, id: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }

    pub fn client(&self, name: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.name == name)
    }

    /// Stored value of a cell, if any
    pub fn entry(&self, key: &MatrixKey) -> Option<bool> {
        self.entries.get(key).copied()
    }
}
