//! Mock MCP server for integration tests
//!
//! Answers probes at `/mcp` with 200 or 503 depending on a switch.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing};
use tokio_util::sync::CancellationToken;

/// Mock MCP server with switchable health
pub struct MockMcp {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockMcpState>,
}

struct MockMcpState {
    healthy: AtomicBool,
    probe_count: AtomicU32,
}

impl MockMcp {
    /// Start a healthy mock server
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockMcpState {
            healthy: AtomicBool::new(true),
            probe_count: AtomicU32::new(0),
        });

        let app = Router::new()
            .route("/mcp", routing::get(handle_probe).post(handle_probe))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Endpoint to register with canopy
    pub fn url(&self) -> String {
        format!("http://{}/mcp", self.addr)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn probe_count(&self) -> u32 {
        self.state.probe_count.load(Ordering::SeqCst)
    }
}

impl Drop for MockMcp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_probe(State(state): State<Arc<MockMcpState>>) -> (StatusCode, Json<serde_json::Value>) {
    state.probe_count.fetch_add(1, Ordering::SeqCst);

    if state.healthy.load(Ordering::SeqCst) {
        (StatusCode::OK, Json(serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": {}})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "down"})),
        )
    }
}
