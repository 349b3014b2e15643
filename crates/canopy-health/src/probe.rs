use std::time::Duration;

use async_trait::async_trait;
use canopy_config::ProbeKind;
use jiff::Timestamp;
use serde::Serialize;
use thiserror::Error;

use crate::error::HealthError;

/// Why a probe failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    /// Server answered with a non-success status
    #[error("unexpected status {0}")]
    Status(u16),
}

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub server_id: String,
    pub is_healthy: bool,
    pub response_time_ms: u64,
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One liveness check against a server endpoint
///
/// Implementations need not enforce a deadline; the monitor bounds every
/// call with its configured timeout.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> Result<(), ProbeError>;
}

/// Prober speaking plain HTTP to the server URL
pub struct HttpProber {
    client: reqwest::Client,
    kind: ProbeKind,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(kind: ProbeKind, timeout: Duration) -> Result<Self, HealthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("canopy-health/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HealthError::Client(e.to_string()))?;

        Ok(Self { client, kind, timeout })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        let request = match self.kind {
            ProbeKind::Get => self.client.get(url),
            ProbeKind::Initialize => self
                .client
                .post(url)
                .header(http::header::ACCEPT, "application/json, text/event-stream")
                .json(&initialize_request()),
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.timeout)
            } else {
                ProbeError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        Ok(())
    }
}

/// MCP `initialize` request announcing canopy as the client
fn initialize_request() -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {
                "name": "canopy-health",
                "version": env!("CARGO_PKG_VERSION"),
            },
        },
    })
}
