#![allow(clippy::must_use_candidate)]

pub mod cors;
mod duration;
mod env;
mod loader;
pub mod monitor;
pub mod server;
pub mod storage;
pub mod telemetry;

use canopy_core::{Client, Server};
use serde::Deserialize;

pub use cors::*;
pub use monitor::*;
pub use server::*;
pub use storage::*;
pub use telemetry::{ExportProtocol, ExporterConfig, TelemetryConfig};

/// Top-level canopy configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Registry store backend
    #[serde(default)]
    pub storage: StorageConfig,
    /// Health monitor configuration
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Client catalogue (built-in catalogue when empty)
    #[serde(default)]
    pub clients: Vec<Client>,
    /// Servers registered at startup when absent from the store
    #[serde(default)]
    pub servers: Vec<Server>,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

impl Config {
    /// Clients to seed into the registry
    pub fn resolved_clients(&self) -> Vec<Client> {
        if self.clients.is_empty() {
            canopy_core::builtin_clients()
        } else {
            self.clients.clone()
        }
    }
}
