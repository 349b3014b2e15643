//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::time::Duration;

use canopy_config::{Config, CorsConfig, MonitorConfig, ServerConfig};
use canopy_core::{Client, DefaultPolicy, Server, ServerStatus};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Built-in clients, in-memory storage, monitoring off
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    ..ServerConfig::default()
                },
                monitor: MonitorConfig {
                    enabled: false,
                    ..MonitorConfig::default()
                },
                ..Config::default()
            },
        }
    }

    /// Monitor with a single-failure threshold and a long interval
    ///
    /// Only the immediate first probe runs on schedule, so tests drive
    /// further probes through the check endpoint.
    pub fn with_monitoring(mut self) -> Self {
        self.config.monitor = MonitorConfig {
            enabled: true,
            interval: Duration::from_secs(3600),
            timeout: Duration::from_secs(2),
            failure_threshold: 1,
            ..MonitorConfig::default()
        };
        self
    }

    /// Add a client with the given default policy
    pub fn with_client(mut self, name: &str, default_policy: DefaultPolicy) -> Self {
        self.config.clients.push(Client {
            name: name.to_owned(),
            display_name: name.to_owned(),
            icon: String::new(),
            config_path: format!("~/.{name}/mcp.json"),
            enabled: true,
            default_policy,
        });
        self
    }

    /// Register a seed server at startup
    pub fn with_server(mut self, id: &str, name: &str, url: &str, tools: &[&str]) -> Self {
        self.config.servers.push(Server {
            id: id.to_owned(),
            name: name.to_owned(),
            description: String::new(),
            url: url.to_owned(),
            status: ServerStatus::Active,
            tools: tools.iter().map(|t| (*t).to_owned()).collect(),
        });
        self
    }

    /// Point generated configs at a public gateway url
    pub fn with_public_url(mut self, url: &str) -> Self {
        self.config.server.public_url = Some(url.parse().expect("valid URL"));
        self
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Disable the liveness endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
