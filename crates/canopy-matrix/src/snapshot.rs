use canopy_registry::RegistrySnapshot;
use indexmap::IndexMap;
use serde::Serialize;

use crate::view;

/// Effective enablement of every client against every server
///
/// Clients appear in catalogue order and servers in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixSnapshot {
    /// client -> server id -> server enabled
    pub servers: IndexMap<String, IndexMap<String, bool>>,
    /// client -> server id -> tool -> tool enabled
    pub tools: IndexMap<String, IndexMap<String, IndexMap<String, bool>>>,
}

impl MatrixSnapshot {
    pub fn from_registry(snapshot: &RegistrySnapshot) -> Self {
        let mut servers = IndexMap::with_capacity(snapshot.clients.len());
        let mut tools = IndexMap::with_capacity(snapshot.clients.len());

        for client in &snapshot.clients {
            let name = client.name.as_str();

            let server_row = snapshot
                .servers
                .iter()
                .map(|server| (server.id.clone(), view::server_enabled(snapshot, name, &server.id)))
                .collect();

            let tool_row = snapshot
                .servers
                .iter()
                .map(|server| {
                    let flags = server
                        .tools
                        .iter()
                        .map(|tool| (tool.clone(), view::tool_enabled(snapshot, name, server, tool)))
                        .collect();
                    (server.id.clone(), flags)
                })
                .collect();

            servers.insert(client.name.clone(), server_row);
            tools.insert(client.name.clone(), tool_row);
        }

        Self { servers, tools }
    }

    /// Effective server flag, `false` for unknown pairs
    pub fn server_enabled(&self, client: &str, server_id: &str) -> bool {
        self.servers
            .get(client)
            .and_then(|row| row.get(server_id))
            .copied()
            .unwrap_or(false)
    }
}
