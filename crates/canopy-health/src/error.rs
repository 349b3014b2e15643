use canopy_core::HttpError;
use http::StatusCode;
use thiserror::Error;

/// Health subsystem errors
///
/// Probe failures never show up here; they are recorded into health state.
#[derive(Debug, Error)]
pub enum HealthError {
    /// Server has no health record
    #[error("server not monitored: {server}")]
    NotMonitored { server: String },

    /// HTTP client for probing could not be built
    #[error("failed to build probe client: {0}")]
    Client(String),
}

impl HttpError for HealthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotMonitored { .. } => StatusCode::NOT_FOUND,
            Self::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::NotMonitored { .. } => "not_found",
            Self::Client(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::NotMonitored { server } => format!("no health record for server: {server}"),
            Self::Client(_) => "internal server error".to_string(),
        }
    }
}
