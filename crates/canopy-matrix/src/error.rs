use canopy_core::{HttpError, InvalidIdentifier, InvalidServer};
use canopy_registry::StoreError;
use http::StatusCode;
use thiserror::Error;

/// Access matrix errors
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("client not found: {client}")]
    ClientNotFound { client: String },

    #[error("server not found: {server}")]
    ServerNotFound { server: String },

    /// Tool is not declared on the server
    #[error("tool not found: {tool} on server {server}")]
    ToolNotFound { server: String, tool: String },

    /// Malformed identifier or server record
    #[error("validation failed: {0}")]
    Validation(String),

    /// Server id or name already registered
    #[error("conflict: {0}")]
    Conflict(String),

    /// Registry store unavailable; nothing was changed
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Generated config could not be rendered
    #[error("render error: {0}")]
    Render(#[from] serde_json::Error),
}

impl From<InvalidIdentifier> for MatrixError {
    fn from(e: InvalidIdentifier) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<InvalidServer> for MatrixError {
    fn from(e: InvalidServer) -> Self {
        Self::Validation(e.to_string())
    }
}

impl HttpError for MatrixError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ClientNotFound { .. } | Self::ServerNotFound { .. } | Self::ToolNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::ClientNotFound { .. } | Self::ServerNotFound { .. } | Self::ToolNotFound { .. } => "not_found",
            Self::Validation(_) => "validation_error",
            Self::Conflict(_) => "conflict",
            Self::Persistence(_) => "persistence_error",
            Self::Render(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::ClientNotFound { client } => format!("client not found: {client}"),
            Self::ServerNotFound { server } => format!("server not found: {server}"),
            Self::ToolNotFound { server, tool } => format!("tool '{tool}' is not declared on server {server}"),
            Self::Validation(msg) | Self::Conflict(msg) => msg.clone(),
            Self::Persistence(_) => "registry store unavailable".to_string(),
            Self::Render(_) => "internal server error".to_string(),
        }
    }
}
