use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Canopy MCP control plane
#[derive(Debug, Parser)]
#[command(name = "canopy", about = "Access matrix, config generation and health monitoring for MCP servers")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "canopy.toml", env = "CANOPY_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "CANOPY_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter directive, e.g. `info` or `canopy_health=debug`
    #[arg(long, default_value = "info", env = "CANOPY_LOG")]
    pub log_filter: String,
}
