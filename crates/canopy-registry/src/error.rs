use thiserror::Error;

/// Registry store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or a command failed
    #[error("registry backend error: {0}")]
    Backend(String),

    /// A stored record could not be encoded or decoded
    #[error("registry serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
