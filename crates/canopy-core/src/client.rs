use serde::{Deserialize, Serialize};

/// What a client gets when a new server is registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// New servers start disabled for this client
    #[default]
    Disabled,
    /// New servers start enabled, with all their tools
    Enabled,
}

impl DefaultPolicy {
    /// Initial server-level flag for a freshly registered server
    pub const fn initial_state(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// An AI application that consumes generated connection configs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Unique identity, e.g. `claude`
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub icon: String,
    /// Where the external consumer should write the generated config
    pub config_path: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub default_policy: DefaultPolicy,
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

/// Client catalogue used when configuration does not list any
pub fn builtin_clients() -> Vec<Client> {
    [
        ("claude", "Claude Desktop", "🧠", "~/Library/Application Support/Claude/claude_desktop_config.json"),
        ("cursor", "Cursor", "↗️", "~/.cursor/mcp_config.json"),
        ("windsurf", "Windsurf", "🏄", "~/.windsurf/mcp_config.json"),
        ("cline", "Cline", "📋", "~/.cline/mcp_config.json"),
        ("claude-code", "Claude Code CLI", "💻", "~/.config/claude-code/mcp_config.json"),
        ("roo-code", "Roo.Code", "🦘", "~/.roocode/mcp_config.json"),
        ("kilo-code", "Kilo.Code", "⚡", "~/.kilocode/mcp_config.json"),
    ]
    .into_iter()
    .map(|(name, display_name, icon, config_path)| Client {
        name: name.to_owned(),
        display_name: display_name.to_owned(),
        icon: icon.to_owned(),
        config_path: config_path.to_owned(),
        enabled: true,
        default_policy: DefaultPolicy::Disabled,
    })
    .collect()
}
