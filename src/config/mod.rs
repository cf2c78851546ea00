//! Configuration management for the Figma Context MCP server.

use clap::Parser;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default Figma REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.figma.com/v1";

/// Command-line arguments for the server.
#[derive(Parser, Debug, Clone)]
#[command(name = "figma-context-mcp")]
#[command(author = "Figma Context MCP Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing Figma documents as normalized Model Context")]
pub struct Args {
    /// Figma personal access token
    #[arg(long, env = "FIGMA_ACCESS_TOKEN", hide_env_values = true)]
    pub figma_token: Option<String>,

    /// Already-exchanged OAuth access token (takes precedence over the personal token)
    #[arg(long, env = "FIGMA_OAUTH_TOKEN", hide_env_values = true)]
    pub oauth_token: Option<String>,

    /// Figma REST API base URL
    #[arg(long, default_value = DEFAULT_API_URL, env = "FIGMA_API_URL")]
    pub api_url: String,

    /// Transport mode: stdio or sse
    #[arg(short, long, default_value = "stdio", env = "FIGMA_MCP_TRANSPORT")]
    pub transport: Transport,

    /// Listen port (only for sse transport)
    #[arg(short, long, default_value = "3333", env = "FIGMA_MCP_PORT")]
    pub port: u16,

    /// Listen address (only for sse transport)
    #[arg(long, default_value = "127.0.0.1", env = "FIGMA_MCP_HOST")]
    pub host: String,

    /// Enable debug logging
    #[arg(short, long, env = "FIGMA_MCP_DEBUG")]
    pub debug: bool,

    /// Team whose published components are attached to converted files
    #[arg(long, env = "FIGMA_TEAM_ID")]
    pub team_id: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, default_value = "30", env = "FIGMA_TIMEOUT_SECS")]
    pub timeout_secs: u64,
}

/// Transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Sse,
}

/// Credential handed to the REST client. The server never validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "token", rename_all = "lowercase")]
pub enum Credential {
    /// Sent as `X-Figma-Token`.
    Personal(String),
    /// Sent as `Authorization: Bearer`.
    OAuth(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upstream credential
    pub credential: Option<Credential>,
    /// REST base URL
    pub api_url: String,
    /// Transport mode
    pub transport: Transport,
    /// SSE port
    pub port: u16,
    /// SSE host
    pub host: String,
    /// Debug mode
    pub debug: bool,
    /// Default team for component libraries
    pub team_id: Option<String>,
    /// Request timeout
    pub timeout_secs: u64,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let credential = match (args.oauth_token, args.figma_token) {
            (Some(token), _) => Some(Credential::OAuth(token)),
            (None, Some(token)) => Some(Credential::Personal(token)),
            (None, None) => None,
        };

        Self {
            credential,
            api_url: args.api_url,
            transport: args.transport,
            port: args.port,
            host: args.host,
            debug: args.debug,
            team_id: args.team_id,
            timeout_secs: args.timeout_secs,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credential: None,
            api_url: DEFAULT_API_URL.to_string(),
            transport: Transport::Stdio,
            port: 3333,
            host: "127.0.0.1".to_string(),
            debug: false,
            team_id: None,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Socket address for the SSE listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        let api_url = Url::parse(&self.api_url)
            .map_err(|e| Error::Config(format!("Invalid API URL {}: {}", self.api_url, e)))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API URL must be http or https: {}",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("Timeout must be at least 1 second".to_string()));
        }
        if self.transport == Transport::Sse && self.host.trim().is_empty() {
            return Err(Error::Config("SSE host must not be empty".to_string()));
        }
        Ok(())
    }
}
