//! Test server wrapper that starts canopy on a random port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use canopy_config::Config;
use canopy_server::{Gateway, Server};
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
    gateway: Arc<Gateway>,
}

impl TestServer {
    /// Start a test server with the given configuration
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let server = Server::new(config).await?;
        let gateway = server.gateway();
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::new();

        Ok(Self {
            addr,
            shutdown,
            client,
            gateway,
        })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn get_json(&self, path: &str) -> serde_json::Value {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        assert!(resp.status().is_success(), "GET {path} returned {}", resp.status());
        resp.json().await.unwrap()
    }

    pub async fn post(&self, path: &str) -> reqwest::Response {
        self.client.post(self.url(path)).send().await.unwrap()
    }

    /// Poll a server's health record until its status matches
    pub async fn wait_for_status(&self, server_id: &str, status: &str) -> serde_json::Value {
        let path = format!("/api/v0/health/{server_id}");

        for _ in 0..100 {
            let resp = self.client.get(self.url(&path)).send().await.unwrap();
            if resp.status().is_success() {
                let record: serde_json::Value = resp.json().await.unwrap();
                if record["status"] == status {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        panic!("server {server_id} never reached status {status}");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.gateway.monitor().shutdown();
        self.shutdown.cancel();
    }
}
