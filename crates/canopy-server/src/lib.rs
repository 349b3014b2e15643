#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod cors;
mod gateway;
mod health;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use canopy_config::Config;
use canopy_health::{HealthMonitor, HttpProber};
use canopy_matrix::{AccessMatrix, ConfigGenerator, MatrixState};
use tower_http::trace::TraceLayer;

pub use gateway::Gateway;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    gateway: Arc<Gateway>,
}

impl Server {
    /// Build the server from configuration
    ///
    /// Connects the registry store, seeds clients and servers, and starts
    /// health monitoring for active servers.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable, the probe client
    /// cannot be built, or seeding fails
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let store = canopy_registry::connect(&config.storage).await?;
        let matrix = AccessMatrix::new(store);
        let generator = ConfigGenerator::new(matrix.clone(), config.server.public_url.clone());

        let prober = HttpProber::new(config.monitor.probe, config.monitor.timeout)?;
        let monitor = HealthMonitor::new(config.monitor.clone(), Arc::new(prober));

        let gateway = Arc::new(Gateway::new(matrix.clone(), monitor.clone(), config.monitor.enabled));
        gateway
            .bootstrap(&config.resolved_clients(), &config.servers)
            .await?;

        let mut app = Router::new();

        // Liveness of canopy itself
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        app = app.merge(routes::registry_router(gateway.clone()));
        app = app.merge(canopy_matrix::matrix_router(Arc::new(MatrixState::new(matrix, generator))));
        app = app.merge(canopy_health::health_router(monitor));

        app = app.layer(TraceLayer::new_for_http());

        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Ok(Self {
            router: app,
            listen_address,
            gateway,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    #[must_use]
    pub fn gateway(&self) -> Arc<Gateway> {
        self.gateway.clone()
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered, then stops all
    /// health probes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await;

        self.gateway.monitor().shutdown();
        result?;

        Ok(())
    }
}
