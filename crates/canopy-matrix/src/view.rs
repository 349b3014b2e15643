//! Effective enablement computed from one registry snapshot

use canopy_core::{MatrixKey, Server};
use canopy_registry::RegistrySnapshot;

/// Stored server flag, `false` when absent or when the server is gone
pub fn server_enabled(snapshot: &RegistrySnapshot, client: &str, server_id: &str) -> bool {
    snapshot.server(server_id).is_some() && snapshot.entry(&MatrixKey::server(client, server_id)).unwrap_or(false)
}

/// Effective tool flag under soft-disable
///
/// A disabled server hides every tool. Under an enabled server a tool
/// with no stored row reads as enabled.
pub fn tool_enabled(snapshot: &RegistrySnapshot, client: &str, server: &Server, tool: &str) -> bool {
    server.has_tool(tool)
        && server_enabled(snapshot, client, &server.id)
        && snapshot.entry(&MatrixKey::tool(client, &server.id, tool)).unwrap_or(true)
}

/// Effective tools of `server` for `client` in declaration order
pub fn enabled_tools(snapshot: &RegistrySnapshot, client: &str, server: &Server) -> Vec<String> {
    server
        .tools
        .iter()
        .filter(|tool| tool_enabled(snapshot, client, server, tool))
        .cloned()
        .collect()
}

/// Servers enabled for `client` in registration order
pub fn enabled_servers<'a>(snapshot: &'a RegistrySnapshot, client: &'a str) -> impl Iterator<Item = &'a Server> {
    snapshot
        .servers
        .iter()
        .filter(move |server| server_enabled(snapshot, client, &server.id))
}
