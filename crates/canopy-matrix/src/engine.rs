use std::sync::Arc;

use canopy_core::{Client, MatrixKey, Server, ServerStatus, validate_identifier};
use canopy_registry::{InsertOutcome, RegistrySnapshot, RegistryStore};
use canopy_telemetry::{Counter, KeyValue, metrics};

use crate::error::MatrixError;
use crate::snapshot::MatrixSnapshot;
use crate::view;

/// Owner of enablement semantics over the registry store
///
/// Holds no state of its own: every query reads the store and every
/// mutation is a single atomic store operation, so a failed write leaves
/// nothing behind.
#[derive(Clone)]
pub struct AccessMatrix {
    store: Arc<dyn RegistryStore>,
    toggles: Counter<u64>,
}

impl AccessMatrix {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        let toggles = metrics::meter()
            .u64_counter(metrics::MATRIX_TOGGLE_COUNT)
            .with_description("Access matrix toggles")
            .build();

        Self { store, toggles }
    }

    /// Underlying registry store
    pub const fn store(&self) -> &Arc<dyn RegistryStore> {
        &self.store
    }

    /// Flip the server-level flag for `client`
    ///
    /// Returns the new value.
    pub async fn toggle_server(&self, client: &str, server_id: &str) -> Result<bool, MatrixError> {
        self.require_client(client).await?;
        self.require_server(server_id).await?;

        let key = MatrixKey::server(client, server_id);
        let enabled = self.flip(&key, false).await?;

        self.toggles.add(1, &[KeyValue::new("level", "server")]);
        tracing::debug!(client, server_id, enabled, "toggled server");

        Ok(enabled)
    }

    /// Flip one tool flag for `client`
    ///
    /// The server-level flag is left alone. A tool with no stored row
    /// counts as enabled, so its first toggle stores `false`.
    pub async fn toggle_tool(&self, client: &str, server_id: &str, tool: &str) -> Result<bool, MatrixError> {
        self.require_client(client).await?;
        let server = self.require_server(server_id).await?;

        if !server.has_tool(tool) {
            return Err(MatrixError::ToolNotFound {
                server: server_id.to_string(),
                tool: tool.to_string(),
            });
        }

        let key = MatrixKey::tool(client, server_id, tool);
        let enabled = self.flip(&key, true).await?;

        self.toggles.add(1, &[KeyValue::new("level", "tool")]);
        tracing::debug!(client, server_id, tool, enabled, "toggled tool");

        Ok(enabled)
    }

    async fn flip(&self, key: &MatrixKey, default: bool) -> Result<bool, MatrixError> {
        // Deregistered between the lookup and the write
        self.store
            .toggle_entry(key, default)
            .await?
            .ok_or_else(|| MatrixError::ServerNotFound {
                server: key.server_id().to_string(),
            })
    }

    /// Stored server-level flag, `false` when absent
    pub async fn is_server_enabled(&self, client: &str, server_id: &str) -> Result<bool, MatrixError> {
        if self.store.get_server(server_id).await?.is_none() {
            return Ok(false);
        }

        let key = MatrixKey::server(client, server_id);
        Ok(self.store.get_entry(&key).await?.unwrap_or(false))
    }

    /// Effective tool flag, always `false` under a disabled server
    pub async fn is_tool_enabled(&self, client: &str, server_id: &str, tool: &str) -> Result<bool, MatrixError> {
        let snapshot = self.store.snapshot().await?;

        Ok(snapshot
            .server(server_id)
            .is_some_and(|server| view::tool_enabled(&snapshot, client, server, tool)))
    }

    /// Register a server and seed its matrix rows for every known client
    ///
    /// Each client gets a server-level row following its default policy.
    /// No tool rows are written.
    pub async fn register_server(&self, server: Server) -> Result<Server, MatrixError> {
        server.validate()?;

        let seeds: Vec<_> = self
            .store
            .list_clients()
            .await?
            .into_iter()
            .map(|client| {
                let state = client.default_policy.initial_state();
                (MatrixKey::server(client.name, &server.id), state)
            })
            .collect();

        match self.store.insert_server(&server, &seeds).await? {
            InsertOutcome::Inserted => {
                tracing::info!(server_id = %server.id, name = %server.name, tools = server.tools.len(), "registered server");
                Ok(server)
            }
            InsertOutcome::DuplicateId => Err(MatrixError::Conflict(format!(
                "server with id '{}' already exists",
                server.id
            ))),
            InsertOutcome::DuplicateName => Err(MatrixError::Conflict(format!(
                "server with name '{}' already exists",
                server.name
            ))),
        }
    }

    /// Remove a server and every matrix row referencing it
    pub async fn deregister_server(&self, server_id: &str) -> Result<Server, MatrixError> {
        let server = self
            .store
            .remove_server(server_id)
            .await?
            .ok_or_else(|| MatrixError::ServerNotFound {
                server: server_id.to_string(),
            })?;

        tracing::info!(server_id, name = %server.name, "deregistered server");

        Ok(server)
    }

    /// Persist a server's administrative status
    pub async fn set_server_status(&self, server_id: &str, status: ServerStatus) -> Result<Server, MatrixError> {
        let server = self
            .store
            .set_server_status(server_id, status)
            .await?
            .ok_or_else(|| MatrixError::ServerNotFound {
                server: server_id.to_string(),
            })?;

        tracing::info!(server_id, ?status, "updated server status");

        Ok(server)
    }

    pub async fn get_server(&self, server_id: &str) -> Result<Server, MatrixError> {
        self.require_server(server_id).await
    }

    pub async fn list_servers(&self) -> Result<Vec<Server>, MatrixError> {
        Ok(self.store.list_servers().await?)
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, MatrixError> {
        Ok(self.store.list_clients().await?)
    }

    /// Insert clients that are not yet known, keeping existing ones
    ///
    /// Returns how many were created.
    pub async fn seed_clients(&self, clients: &[Client]) -> Result<usize, MatrixError> {
        let mut created = 0;

        for client in clients {
            validate_identifier("client", &client.name)?;

            if self.store.insert_client(client).await? {
                tracing::debug!(client = %client.name, "seeded client");
                created += 1;
            }
        }

        Ok(created)
    }

    /// Servers enabled for `client` in registration order
    pub async fn list_enabled_servers(&self, client: &str) -> Result<Vec<Server>, MatrixError> {
        let snapshot = self.store.snapshot().await?;
        require_in(&snapshot, client)?;

        Ok(view::enabled_servers(&snapshot, client).cloned().collect())
    }

    /// Effective tools of one server for `client` in declaration order
    pub async fn list_enabled_tools(&self, client: &str, server_id: &str) -> Result<Vec<String>, MatrixError> {
        let snapshot = self.store.snapshot().await?;
        require_in(&snapshot, client)?;

        let server = snapshot.server(server_id).ok_or_else(|| MatrixError::ServerNotFound {
            server: server_id.to_string(),
        })?;

        Ok(view::enabled_tools(&snapshot, client, server))
    }

    /// Every client × server flag and every effective tool flag
    pub async fn snapshot(&self) -> Result<MatrixSnapshot, MatrixError> {
        let snapshot = self.store.snapshot().await?;
        Ok(MatrixSnapshot::from_registry(&snapshot))
    }

    /// Consistent copy of the underlying registry
    pub async fn registry_snapshot(&self) -> Result<RegistrySnapshot, MatrixError> {
        Ok(self.store.snapshot().await?)
    }

    async fn require_client(&self, client: &str) -> Result<Client, MatrixError> {
        self.store
            .get_client(client)
            .await?
            .ok_or_else(|| MatrixError::ClientNotFound {
                client: client.to_string(),
            })
    }

    async fn require_server(&self, server_id: &str) -> Result<Server, MatrixError> {
        self.store
            .get_server(server_id)
            .await?
            .ok_or_else(|| MatrixError::ServerNotFound {
                server: server_id.to_string(),
            })
    }
}

/// Fail with `ClientNotFound` unless `client` is in `snapshot`
pub(crate) fn require_in(snapshot: &RegistrySnapshot, client: &str) -> Result<(), MatrixError> {
    if snapshot.client(client).is_none() {
        return Err(MatrixError::ClientNotFound {
            client: client.to_string(),
        });
    }
    Ok(())
}
