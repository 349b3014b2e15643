use std::sync::Arc;

use canopy_core::{Client, Server, ServerStatus};
use dashmap::DashMap;
use canopy_health::{HealthCheckResult, HealthMonitor};
use canopy_matrix::{AccessMatrix, MatrixError};

/// Entry point combining the access matrix with health monitoring
///
/// Keeps monitoring in step with the registry: active servers are
/// monitored, inactive or removed ones are not. Lifecycle operations on
/// the same server id are serialized so the store write and the matching
/// monitor change land together.
#[derive(Clone)]
pub struct Gateway {
    matrix: AccessMatrix,
    monitor: HealthMonitor,
    monitoring: bool,
    lifecycle: Arc<DashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Gateway {
    /// With `monitoring` off, servers are never monitored automatically
    pub fn new(matrix: AccessMatrix, monitor: HealthMonitor, monitoring: bool) -> Self {
        Self {
            matrix,
            monitor,
            monitoring,
            lifecycle: Arc::new(DashMap::new()),
        }
    }

    pub const fn matrix(&self) -> &AccessMatrix {
        &self.matrix
    }

    pub const fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    /// Seed clients and servers, then start monitoring the registry
    ///
    /// Seed servers already registered under the same id are left alone.
    pub async fn bootstrap(&self, clients: &[Client], servers: &[Server]) -> Result<(), MatrixError> {
        let created = self.matrix.seed_clients(clients).await?;
        tracing::info!(created, total = clients.len(), "seeded clients");

        for server in servers {
            match self.matrix.get_server(&server.id).await {
                Ok(_) => tracing::debug!(server_id = %server.id, "seed server already registered"),
                Err(MatrixError::ServerNotFound { .. }) => {
                    self.matrix.register_server(server.clone()).await?;
                }
                Err(e) => return Err(e),
            }
        }

        if self.monitoring {
            let started = self.monitor.monitor_registered(self.matrix.store().as_ref()).await?;
            tracing::info!(servers = started, "health monitoring started");
        }

        Ok(())
    }

    pub async fn list_servers(&self) -> Result<Vec<Server>, MatrixError> {
        self.matrix.list_servers().await
    }

    /// Register a server and monitor it when active
    pub async fn register_server(&self, server: Server) -> Result<Server, MatrixError> {
        let lock = self.lifecycle_lock(&server.id);
        let _guard = lock.lock().await;

        let server = self.matrix.register_server(server).await?;
        self.sync_monitoring(&server);
        Ok(server)
    }

    /// Deregister a server and stop monitoring it
    pub async fn deregister_server(&self, server_id: &str) -> Result<Server, MatrixError> {
        let lock = self.lifecycle_lock(server_id);
        let _guard = lock.lock().await;

        let server = self.matrix.deregister_server(server_id).await?;
        self.monitor.stop_monitoring(server_id);
        Ok(server)
    }

    /// Change administrative status, starting or stopping monitoring
    pub async fn set_server_status(&self, server_id: &str, status: ServerStatus) -> Result<Server, MatrixError> {
        let lock = self.lifecycle_lock(server_id);
        let _guard = lock.lock().await;

        let server = self.matrix.set_server_status(server_id, status).await?;
        self.sync_monitoring(&server);
        Ok(server)
    }

    /// Probe a registered server once
    pub async fn check_health(&self, server_id: &str, record: bool) -> Result<HealthCheckResult, MatrixError> {
        let server = self.matrix.get_server(server_id).await?;
        Ok(self.monitor.check_health(&server.id, &server.url, record).await)
    }

    /// Lock shared by every lifecycle operation on `server_id`
    ///
    /// Entries are never removed: dropping one while a waiter holds a clone
    /// would let the next caller lock a different mutex for the same id.
    fn lifecycle_lock(&self, server_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.lifecycle.entry(server_id.to_string()).or_default().clone()
    }

    fn sync_monitoring(&self, server: &Server) {
        if self.monitoring && server.status.is_active() {
            self.monitor.start_monitoring(&server.id, &server.url);
        } else {
            self.monitor.stop_monitoring(&server.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use canopy_config::MonitorConfig;
    use canopy_core::{MatrixKey, builtin_clients};
    use canopy_health::HttpProber;
    use canopy_registry::{InsertOutcome, MemoryStore, RegistrySnapshot, RegistryStore, StoreError};

    use super::*;

    fn server(id: &str, name: &str) -> Server {
        Server {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            url: "http://127.0.0.1:1/mcp".to_string(),
            status: ServerStatus::Active,
            tools: vec!["add".to_string()],
        }
    }

    /// Memory store that stalls after each server insert
    struct SlowInsertStore {
        inner: MemoryStore,
        delay: Duration,
    }

    #[async_trait]
    impl RegistryStore for SlowInsertStore {
        async fn insert_server(&self, server: &Server, seeds: &[(MatrixKey, bool)]) -> Result<InsertOutcome, StoreError> {
            let outcome = self.inner.insert_server(server, seeds).await?;
            tokio::time::sleep(self.delay).await;
            Ok(outcome)
        }

        async fn remove_server(&self, id: &str) -> Result<Option<Server>, StoreError> {
            self.inner.remove_server(id).await
        }

        async fn get_server(&self, id: &str) -> Result<Option<Server>, StoreError> {
            self.inner.get_server(id).await
        }

        async fn list_servers(&self) -> Result<Vec<Server>, StoreError> {
            self.inner.list_servers().await
        }

        async fn set_server_status(&self, id: &str, status: ServerStatus) -> Result<Option<Server>, StoreError> {
            self.inner.set_server_status(id, status).await
        }

        async fn insert_client(&self, client: &Client) -> Result<bool, StoreError> {
            self.inner.insert_client(client).await
        }

        async fn get_client(&self, name: &str) -> Result<Option<Client>, StoreError> {
            self.inner.get_client(name).await
        }

        async fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
            self.inner.list_clients().await
        }

        async fn get_entry(&self, key: &MatrixKey) -> Result<Option<bool>, StoreError> {
            self.inner.get_entry(key).await
        }

        async fn toggle_entry(&self, key: &MatrixKey, default: bool) -> Result<Option<bool>, StoreError> {
            self.inner.toggle_entry(key, default).await
        }

        async fn snapshot(&self) -> Result<RegistrySnapshot, StoreError> {
            self.inner.snapshot().await
        }
    }

    fn gateway(monitoring: bool) -> Gateway {
        gateway_with_store(Arc::new(MemoryStore::new()), monitoring)
    }

    fn gateway_with_store(store: Arc<dyn RegistryStore>, monitoring: bool) -> Gateway {
        let matrix = AccessMatrix::new(store);
        let config = MonitorConfig::default();
        let prober = HttpProber::new(config.probe, Duration::from_millis(200)).unwrap();
        let monitor = HealthMonitor::new(config, Arc::new(prober));

        Gateway::new(matrix, monitor, monitoring)
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let gateway = gateway(true);
        let seeds = [server("1", "calculator"), server("2", "weather")];

        gateway.bootstrap(&builtin_clients(), &seeds).await.unwrap();
        gateway.matrix().toggle_server("claude", "1").await.unwrap();
        gateway.bootstrap(&builtin_clients(), &seeds).await.unwrap();

        assert_eq!(gateway.list_servers().await.unwrap().len(), 2);
        assert!(gateway.matrix().is_server_enabled("claude", "1").await.unwrap());
        assert!(gateway.monitor().is_monitoring("1"));
        assert!(gateway.monitor().is_monitoring("2"));

        gateway.monitor().shutdown();
    }

    #[tokio::test]
    async fn monitoring_follows_registration_and_status() {
        let gateway = gateway(true);
        gateway.bootstrap(&builtin_clients(), &[]).await.unwrap();

        gateway.register_server(server("1", "calculator")).await.unwrap();
        assert!(gateway.monitor().is_monitoring("1"));

        gateway.set_server_status("1", ServerStatus::Inactive).await.unwrap();
        assert!(!gateway.monitor().is_monitoring("1"));

        gateway.set_server_status("1", ServerStatus::Active).await.unwrap();
        assert!(gateway.monitor().is_monitoring("1"));

        gateway.deregister_server("1").await.unwrap();
        assert!(!gateway.monitor().is_monitoring("1"));
        assert!(gateway.monitor().get_health("1").is_none());
    }

    #[tokio::test]
    async fn disabled_monitoring_never_starts_tasks() {
        let gateway = gateway(false);
        gateway.bootstrap(&builtin_clients(), &[server("1", "calculator")]).await.unwrap();

        gateway.register_server(server("2", "weather")).await.unwrap();

        assert!(gateway.monitor().list_all_health().is_empty());
    }

    #[tokio::test]
    async fn on_demand_check_requires_registered_server() {
        let gateway = gateway(false);
        gateway.bootstrap(&builtin_clients(), &[server("1", "calculator")]).await.unwrap();

        let result = gateway.check_health("1", false).await.unwrap();
        assert!(!result.is_healthy);
        assert!(result.error.is_some());

        let err = gateway.check_health("42", false).await.unwrap_err();
        assert!(matches!(err, MatrixError::ServerNotFound { .. }));
    }

    #[tokio::test]
    async fn deregister_during_registration_leaves_no_monitor() {
        let store = SlowInsertStore {
            inner: MemoryStore::new(),
            delay: Duration::from_millis(200),
        };
        let gateway = gateway_with_store(Arc::new(store), true);
        gateway.bootstrap(&builtin_clients(), &[]).await.unwrap();

        let registering = tokio::spawn({
            let gateway = gateway.clone();
            async move { gateway.register_server(server("1", "calculator")).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        gateway.deregister_server("1").await.unwrap();
        registering.await.unwrap().unwrap();

        assert!(gateway.list_servers().await.unwrap().is_empty());
        assert!(!gateway.monitor().is_monitoring("1"));
        assert!(gateway.monitor().list_all_health().is_empty());

        gateway.monitor().shutdown();
    }

    #[tokio::test]
    async fn status_change_racing_deregister_leaves_no_monitor() {
        let gateway = gateway(true);
        gateway.bootstrap(&builtin_clients(), &[]).await.unwrap();
        gateway.register_server(server("1", "calculator")).await.unwrap();
        gateway.set_server_status("1", ServerStatus::Inactive).await.unwrap();

        let activating = tokio::spawn({
            let gateway = gateway.clone();
            async move { gateway.set_server_status("1", ServerStatus::Active).await }
        });
        let removed = gateway.deregister_server("1").await;
        let activated = activating.await.unwrap();

        // Activation either ran first or found the server gone
        assert!(removed.is_ok());
        assert!(matches!(activated, Ok(_) | Err(MatrixError::ServerNotFound { .. })));
        assert!(!gateway.monitor().is_monitoring("1"));
        assert!(gateway.monitor().list_all_health().is_empty());

        gateway.monitor().shutdown();
    }
}
