use secrecy::SecretString;
use serde::Deserialize;

/// Registry store backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// In-process store (single instance, lost on restart)
    #[default]
    Memory,
    /// Redis-backed store (durable, shareable between instances)
    Redis(RedisStorageConfig),
}

/// Redis connection settings for the registry store
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisStorageConfig {
    /// Connection URL, may embed credentials
    pub url: SecretString,
    /// Prefix for every key the store writes
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "canopy".to_owned()
}
