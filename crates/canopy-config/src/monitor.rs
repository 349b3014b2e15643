use std::time::Duration;

use serde::Deserialize;

/// How a health probe talks to a server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Plain `GET` against the server URL
    #[default]
    Get,
    /// MCP JSON-RPC `initialize` request posted to the server URL
    Initialize,
}

/// Health monitor configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Start monitoring registered servers automatically
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Delay between scheduled probes
    #[serde(default = "default_interval", deserialize_with = "crate::duration::deserialize")]
    pub interval: Duration,
    /// Upper bound on a single probe
    #[serde(default = "default_timeout", deserialize_with = "crate::duration::deserialize")]
    pub timeout: Duration,
    /// Consecutive failures before a server is marked unhealthy
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Number of trailing probe outcomes used for uptime
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub probe: ProbeKind,
    /// Exponential backoff ceiling while a server keeps failing
    ///
    /// Unset keeps the interval fixed.
    #[serde(default, deserialize_with = "crate::duration::deserialize_option")]
    pub max_backoff: Option<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_interval(),
            timeout: default_timeout(),
            failure_threshold: default_failure_threshold(),
            window_size: default_window_size(),
            probe: ProbeKind::default(),
            max_backoff: None,
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

const fn default_interval() -> Duration {
    Duration::from_secs(30)
}

const fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

const fn default_failure_threshold() -> u32 {
    3
}

const fn default_window_size() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        let config: MonitorConfig = toml::from_str("").unwrap();

        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.window_size, 100);
        assert_eq!(config.probe, ProbeKind::Get);
        assert_eq!(config.max_backoff, None);
    }

    #[test]
    fn parses_human_durations() {
        let config: MonitorConfig = toml::from_str(
            r#"
            interval = "10s"
            timeout = "500ms"
            probe = "initialize"
            max_backoff = "2m"
        "#,
        )
        .unwrap();

        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.probe, ProbeKind::Initialize);
        assert_eq!(config.max_backoff, Some(Duration::from_secs(120)));
    }

    #[test]
    fn rejects_garbage_duration() {
        let err = toml::from_str::<MonitorConfig>("interval = \"soon\"").unwrap_err();
        assert!(err.to_string().contains("invalid duration"));
    }
}
