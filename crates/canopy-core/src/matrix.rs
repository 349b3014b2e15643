use std::fmt;

/// Key of one access matrix cell
///
/// A server-level key holds the "server enabled for client" flag; a
/// tool-level key holds the per-tool flag underneath it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatrixKey {
    /// `(client, server)`
    Server { client: String, server: String },
    /// `(client, server, tool)`
    Tool {
        client: String,
        server: String,
        tool: String,
    },
}

impl MatrixKey {
    /// Server-level key
    pub fn server(client: impl Into<String>, server: impl Into<String>) -> Self {
        Self::Server {
            client: client.into(),
            server: server.into(),
        }
    }

    /// Tool-level key
    pub fn tool(client: impl Into<String>, server: impl Into<String>, tool: impl Into<String>) -> Self {
        Self::Tool {
            client: client.into(),
            server: server.into(),
            tool: tool.into(),
        }
    }

    /// Client this cell belongs to
    pub fn client(&self) -> &str {
        match self {
            Self::Server { client, .. } | Self::Tool { client, .. } => client,
        }
    }

    /// Server this cell belongs to
    pub fn server_id(&self) -> &str {
        match self {
            Self::Server { server, .. } | Self::Tool { server, .. } => server,
        }
    }

    /// Parse the `/`-separated field form produced by [`fmt::Display`]
    pub fn parse(field: &str) -> Option<Self> {
        let mut parts = field.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(client), Some(server), None, None) => Some(Self::server(client, server)),
            (Some(client), Some(server), Some(tool), None) => Some(Self::tool(client, server, tool)),
            _ => None,
        }
    }
}

impl fmt::Display for MatrixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server { client, server } => write!(f, "{client}/{server}"),
            Self::Tool { client, server, tool } => write!(f, "{client}/{server}/{tool}"),
        }
    }
}
