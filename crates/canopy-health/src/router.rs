use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use canopy_core::HttpError;
use serde::Serialize;

use crate::error::HealthError;
use crate::monitor::HealthMonitor;
use crate::record::HealthRecord;

/// Build the health router
pub fn health_router(monitor: HealthMonitor) -> Router {
    Router::new()
        .route("/api/v0/health", get(list_health))
        .route("/api/v0/health/{id}", get(get_health))
        .with_state(monitor)
}

#[derive(Debug, Serialize)]
struct HealthListResponse {
    servers: Vec<HealthRecord>,
}

async fn list_health(State(monitor): State<HealthMonitor>) -> Json<HealthListResponse> {
    Json(HealthListResponse {
        servers: monitor.list_all_health(),
    })
}

async fn get_health(
    State(monitor): State<HealthMonitor>,
    Path(id): Path<String>,
) -> Result<Json<HealthRecord>, HealthErrorResponse> {
    let record = monitor
        .get_health(&id)
        .ok_or(HealthError::NotMonitored { server: id })?;

    Ok(Json(record))
}

/// Error response wrapper that implements `IntoResponse`
pub struct HealthErrorResponse(HealthError);

impl From<HealthError> for HealthErrorResponse {
    fn from(e: HealthError) -> Self {
        Self(e)
    }
}

impl IntoResponse for HealthErrorResponse {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "type": self.0.error_type(),
                "message": self.0.client_message(),
            }
        });

        (self.0.status_code(), Json(body)).into_response()
    }
}
