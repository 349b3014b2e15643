use canopy_core::Server;
use indexmap::IndexMap;
use serde::Serialize;
use url::Url;

use crate::engine::{AccessMatrix, require_in};
use crate::error::MatrixError;
use crate::view;

/// Connection configuration handed to one client
///
/// Serializes as `{"mcpServers": {...}}` with servers keyed by name in
/// registration order, so equal matrix state renders to equal bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: IndexMap<String, ServerDescriptor>,
}

impl ConnectionConfig {
    /// Pretty-printed JSON, ready to be written to the client's config path
    pub fn render(&self) -> Result<String, MatrixError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// How a client reaches one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDescriptor {
    pub url: String,
    /// Enabled tools; absent when every declared tool is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
}

/// Builds connection configs from the current matrix state
#[derive(Clone)]
pub struct ConfigGenerator {
    matrix: AccessMatrix,
    public_url: Option<Url>,
}

impl ConfigGenerator {
    /// Descriptors point at each server's own url, or at
    /// `{public_url}/mcp/{name}` when a public gateway url is set
    pub const fn new(matrix: AccessMatrix, public_url: Option<Url>) -> Self {
        Self { matrix, public_url }
    }

    /// Config for `client` from one consistent snapshot
    ///
    /// Includes every active server enabled for the client. Zero enabled
    /// servers yields an empty mapping.
    pub async fn generate(&self, client: &str) -> Result<ConnectionConfig, MatrixError> {
        let snapshot = self.matrix.registry_snapshot().await?;
        require_in(&snapshot, client)?;

        let mcp_servers = view::enabled_servers(&snapshot, client)
            .filter(|server| server.status.is_active())
            .map(|server| {
                let tools = view::enabled_tools(&snapshot, client, server);
                let allowed_tools = (tools.len() < server.tools.len()).then_some(tools);

                let descriptor = ServerDescriptor {
                    url: self.endpoint(server),
                    allowed_tools,
                };

                (server.name.clone(), descriptor)
            })
            .collect();

        Ok(ConnectionConfig { mcp_servers })
    }

    fn endpoint(&self, server: &Server) -> String {
        match self.public_url {
            Some(ref base) => format!("{}/mcp/{}", base.as_str().trim_end_matches('/'), server.name),
            None => server.url.clone(),
        }
    }
}
