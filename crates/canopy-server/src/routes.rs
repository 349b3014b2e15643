use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use canopy_core::{Server, ServerStatus};
use canopy_health::HealthCheckResult;
use canopy_matrix::MatrixErrorResponse;
use serde::{Deserialize, Serialize};

use crate::gateway::Gateway;

/// Build the server administration router
pub fn registry_router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/api/v0/servers", get(list_servers).post(register_server))
        .route("/api/v0/servers/{id}", delete(deregister_server))
        .route("/api/v0/servers/{id}/status", put(set_status))
        .route("/api/v0/tools", get(list_tools))
        .route("/api/v0/health/{id}/check", post(check_health))
        .with_state(gateway)
}

#[derive(Debug, Serialize)]
struct ServersResponse {
    servers: Vec<Server>,
}

async fn list_servers(State(gateway): State<Arc<Gateway>>) -> Result<Json<ServersResponse>, MatrixErrorResponse> {
    let servers = gateway.list_servers().await?;
    Ok(Json(ServersResponse { servers }))
}

/// A declared tool with the server that declares it
#[derive(Debug, Serialize)]
struct ToolEntry {
    server_id: String,
    server_name: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct ToolsResponse {
    tools: Vec<ToolEntry>,
}

/// Every declared tool, servers in registration order and tools in
/// declaration order
async fn list_tools(State(gateway): State<Arc<Gateway>>) -> Result<Json<ToolsResponse>, MatrixErrorResponse> {
    let tools = gateway
        .list_servers()
        .await?
        .into_iter()
        .flat_map(|server| {
            let Server { id, name, tools, .. } = server;
            tools.into_iter().map(move |tool| ToolEntry {
                server_id: id.clone(),
                server_name: name.clone(),
                name: tool,
            })
        })
        .collect();

    Ok(Json(ToolsResponse { tools }))
}

async fn register_server(
    State(gateway): State<Arc<Gateway>>,
    Json(server): Json<Server>,
) -> Result<(StatusCode, Json<Server>), MatrixErrorResponse> {
    let server = gateway.register_server(server).await?;
    Ok((StatusCode::CREATED, Json(server)))
}

async fn deregister_server(
    State(gateway): State<Arc<Gateway>>,
    Path(id): Path<String>,
) -> Result<StatusCode, MatrixErrorResponse> {
    gateway.deregister_server(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: ServerStatus,
}

async fn set_status(
    State(gateway): State<Arc<Gateway>>,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Server>, MatrixErrorResponse> {
    let server = gateway.set_server_status(&id, request.status).await?;
    Ok(Json(server))
}

#[derive(Debug, Deserialize)]
struct CheckQuery {
    /// Feed the outcome into the server's health record
    #[serde(default)]
    record: bool,
}

async fn check_health(
    State(gateway): State<Arc<Gateway>>,
    Path(id): Path<String>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<HealthCheckResult>, MatrixErrorResponse> {
    let result = gateway.check_health(&id, query.record).await?;
    Ok(Json(result))
}
