use std::net::SocketAddr;

use serde::Deserialize;
use url::Url;

use crate::cors::CorsConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Defaults to `0.0.0.0:8080`
    pub listen_address: Option<SocketAddr>,
    /// Externally reachable gateway URL; generated client configs point
    /// at `{public_url}/mcp/{server}` when set
    #[serde(default)]
    pub public_url: Option<Url>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
}

/// `GET /health` answering `ok` while the process is up
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    #[serde(default = "default_health_path")]
    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            path: default_health_path(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_health_enabled() -> bool {
    true
}

fn default_health_path() -> String {
    "/health".to_owned()
}
