use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{InvalidIdentifier, validate_identifier};

/// Administrative status of a registered server
///
/// Independent of live health: an operator may deactivate a server that
/// is perfectly reachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    #[default]
    Active,
    Inactive,
}

impl ServerStatus {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A registered MCP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Unique identity
    pub id: String,
    /// Unique display name, also the key in generated client configs
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Connection endpoint, also the target of health probes
    pub url: String,
    #[serde(default)]
    pub status: ServerStatus,
    /// Declared tool names in declaration order
    #[serde(default)]
    pub tools: Vec<String>,
}

/// A server record that cannot be registered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidServer {
    #[error(transparent)]
    Identifier(#[from] InvalidIdentifier),
    #[error("invalid url for server '{id}': {reason}")]
    Url { id: String, reason: String },
    #[error("server '{id}' url must use http or https")]
    Scheme { id: String },
    #[error("tool '{tool}' is declared more than once on server '{id}'")]
    DuplicateTool { id: String, tool: String },
}

impl Server {
    /// Whether `tool` is declared on this server
    pub fn has_tool(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }

    /// Check the record on its own: identifiers, an http(s) url and unique
    /// tool names
    ///
    /// Uniqueness of id and name across servers is the registry's concern.
    pub fn validate(&self) -> Result<(), InvalidServer> {
        validate_identifier("server", &self.id)?;
        validate_identifier("server", &self.name)?;

        let url = url::Url::parse(&self.url).map_err(|e| InvalidServer::Url {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(InvalidServer::Scheme { id: self.id.clone() });
        }

        let mut seen = HashSet::new();
        for tool in &self.tools {
            validate_identifier("tool", tool)?;
            if !seen.insert(tool.as_str()) {
                return Err(InvalidServer::DuplicateTool {
                    id: self.id.clone(),
                    tool: tool.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let server: Server = serde_json::from_str(r#"{"id":"1","name":"calc","url":"http://localhost:8000/mcp"}"#).unwrap();

        assert_eq!(server.status, ServerStatus::Active);
        assert!(server.tools.is_empty());
        assert!(server.description.is_empty());
    }

    fn calculator() -> Server {
        Server {
            id: "1".to_string(),
            name: "calculator".to_string(),
            description: String::new(),
            url: "http://localhost:8000/mcp".to_string(),
            status: ServerStatus::Active,
            tools: vec!["add".to_string(), "subtract".to_string()],
        }
    }

    #[test]
    fn well_formed_server_validates() {
        assert_eq!(calculator().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_each_malformed_field() {
        let mut server = calculator();
        server.name = "my server".to_string();
        assert!(matches!(server.validate(), Err(InvalidServer::Identifier(e)) if e.value == "my server"));

        let mut server = calculator();
        server.url = "not a url".to_string();
        assert!(matches!(server.validate(), Err(InvalidServer::Url { .. })));

        let mut server = calculator();
        server.url = "ftp://localhost/mcp".to_string();
        assert_eq!(server.validate(), Err(InvalidServer::Scheme { id: "1".to_string() }));

        let mut server = calculator();
        server.tools.push("add".to_string());
        assert_eq!(
            server.validate().unwrap_err().to_string(),
            "tool 'add' is declared more than once on server '1'"
        );
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&ServerStatus::Inactive).unwrap(), "\"inactive\"");
    }
}
