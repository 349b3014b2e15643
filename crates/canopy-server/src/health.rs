/// Liveness of the canopy process itself, independent of any MCP server
pub async fn health_handler() -> &'static str {
    "ok"
}
