use std::collections::HashSet;
use std::path::Path;

use canopy_core::validate_identifier;

use crate::{Config, StorageConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded = crate::env::expand_env(&raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if identifiers are malformed or duplicated, a seed
    /// server URL is unusable, or monitor settings contradict each other
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_clients()?;
        self.validate_servers()?;
        self.validate_monitor()?;
        self.validate_storage()?;
        Ok(())
    }

    fn validate_clients(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();

        for client in &self.clients {
            validate_identifier("client", &client.name)?;

            if !seen.insert(client.name.as_str()) {
                anyhow::bail!("client '{}' is defined more than once", client.name);
            }
        }

        Ok(())
    }

    fn validate_servers(&self) -> anyhow::Result<()> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();

        for server in &self.servers {
            server.validate()?;

            if !ids.insert(server.id.as_str()) {
                anyhow::bail!("server id '{}' is defined more than once", server.id);
            }
            if !names.insert(server.name.as_str()) {
                anyhow::bail!("server name '{}' is defined more than once", server.name);
            }
        }

        Ok(())
    }

    fn validate_monitor(&self) -> anyhow::Result<()> {
        let monitor = &self.monitor;

        if monitor.interval.is_zero() {
            anyhow::bail!("monitor.interval must be greater than 0");
        }
        if monitor.timeout.is_zero() || monitor.timeout >= monitor.interval {
            anyhow::bail!("monitor.timeout must be greater than 0 and shorter than monitor.interval");
        }
        if monitor.failure_threshold == 0 {
            anyhow::bail!("monitor.failure_threshold must be at least 1");
        }
        if monitor.window_size == 0 {
            anyhow::bail!("monitor.window_size must be at least 1");
        }
        if let Some(max_backoff) = monitor.max_backoff
            && max_backoff < monitor.interval
        {
            anyhow::bail!("monitor.max_backoff must not be shorter than monitor.interval");
        }

        Ok(())
    }

    fn validate_storage(&self) -> anyhow::Result<()> {
        if let StorageConfig::Redis(ref redis) = self.storage
            && redis.key_prefix.is_empty()
        {
            anyhow::bail!("storage.key_prefix must not be empty");
        }

        Ok(())
    }
}
