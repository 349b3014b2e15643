use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use canopy_core::{Client, HttpError, Server};
use serde::{Deserialize, Serialize};

use crate::MatrixState;
use crate::error::MatrixError;
use crate::snapshot::MatrixSnapshot;

/// Build the access matrix router
pub fn matrix_router(state: Arc<MatrixState>) -> Router {
    Router::new()
        .route("/api/v0/clients", get(list_clients))
        .route("/api/v0/clients/{client}/servers", get(list_enabled_servers))
        .route("/api/v0/clients/{client}/servers/{id}/tools", get(list_enabled_tools))
        .route("/api/v0/clients/{client}/servers/{id}/toggle", post(toggle_server))
        .route(
            "/api/v0/clients/{client}/servers/{id}/tools/{tool}/toggle",
            post(toggle_tool),
        )
        .route("/api/v0/clients/{client}/config", get(client_config))
        .route("/api/v0/client-server-matrix", get(matrix_snapshot))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ClientsResponse {
    clients: Vec<Client>,
}

async fn list_clients(State(state): State<Arc<MatrixState>>) -> Result<Json<ClientsResponse>, MatrixErrorResponse> {
    let clients = state.matrix.list_clients().await?;
    Ok(Json(ClientsResponse { clients }))
}

#[derive(Debug, Serialize)]
struct ServersResponse {
    servers: Vec<Server>,
}

async fn list_enabled_servers(
    State(state): State<Arc<MatrixState>>,
    Path(client): Path<String>,
) -> Result<Json<ServersResponse>, MatrixErrorResponse> {
    let servers = state.matrix.list_enabled_servers(&client).await?;
    Ok(Json(ServersResponse { servers }))
}

#[derive(Debug, Serialize)]
struct ToolsResponse {
    tools: Vec<String>,
}

async fn list_enabled_tools(
    State(state): State<Arc<MatrixState>>,
    Path((client, id)): Path<(String, String)>,
) -> Result<Json<ToolsResponse>, MatrixErrorResponse> {
    let tools = state.matrix.list_enabled_tools(&client, &id).await?;
    Ok(Json(ToolsResponse { tools }))
}

/// New value of a toggled cell
#[derive(Debug, Serialize)]
struct ToggleResponse {
    client: String,
    server_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool: Option<String>,
    enabled: bool,
}

async fn toggle_server(
    State(state): State<Arc<MatrixState>>,
    Path((client, id)): Path<(String, String)>,
) -> Result<Json<ToggleResponse>, MatrixErrorResponse> {
    let enabled = state.matrix.toggle_server(&client, &id).await?;

    Ok(Json(ToggleResponse {
        client,
        server_id: id,
        tool: None,
        enabled,
    }))
}

async fn toggle_tool(
    State(state): State<Arc<MatrixState>>,
    Path((client, id, tool)): Path<(String, String, String)>,
) -> Result<Json<ToggleResponse>, MatrixErrorResponse> {
    let enabled = state.matrix.toggle_tool(&client, &id, &tool).await?;

    Ok(Json(ToggleResponse {
        client,
        server_id: id,
        tool: Some(tool),
        enabled,
    }))
}

#[derive(Debug, Deserialize)]
struct ConfigQuery {
    /// Serve as a file attachment
    #[serde(default)]
    download: bool,
}

async fn client_config(
    State(state): State<Arc<MatrixState>>,
    Path(client): Path<String>,
    Query(query): Query<ConfigQuery>,
) -> Result<Response, MatrixErrorResponse> {
    let body = state.generator.generate(&client).await?.render()?;

    let mut response = (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], body).into_response();

    if query.download {
        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{client}-mcp.json\""))
            .map_err(|e| MatrixError::Validation(format!("client name unusable as file name: {e}")))?;
        response.headers_mut().insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(response)
}

async fn matrix_snapshot(State(state): State<Arc<MatrixState>>) -> Result<Json<MatrixSnapshot>, MatrixErrorResponse> {
    Ok(Json(state.matrix.snapshot().await?))
}

/// Error response wrapper that implements `IntoResponse`
pub struct MatrixErrorResponse(MatrixError);

impl From<MatrixError> for MatrixErrorResponse {
    fn from(e: MatrixError) -> Self {
        Self(e)
    }
}

impl IntoResponse for MatrixErrorResponse {
    fn into_response(self) -> Response {
        if let MatrixError::Persistence(ref e) = self.0 {
            tracing::error!(error = %e, "registry store failure");
        }

        let body = serde_json::json!({
            "error": {
                "type": self.0.error_type(),
                "message": self.0.client_message(),
            }
        });

        (self.0.status_code(), Json(body)).into_response()
    }
}
