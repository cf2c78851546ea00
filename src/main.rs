//! Figma Context MCP Server
//!
//! Serves Figma documents as normalized Model Context over stdio or SSE.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use figma_context_mcp::config::{Args, Config, Transport};
use figma_context_mcp::error::Result;
use figma_context_mcp::http::SseTransport;
use figma_context_mcp::mcp::{McpServer, PromptRegistry, Registry, ServerInfo, StdioTransport};
use figma_context_mcp::metrics::Metrics;
use figma_context_mcp::service::DesignService;
use figma_context_mcp::tools;
use figma_context_mcp::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    // Initialize logging; stdout carries stdio frames
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config: Config = args.into();
    config.validate()?;

    info!("Figma Context MCP Server v{}", VERSION);
    info!("API: {}", config.api_url);
    info!("Transport: {:?}", config.transport);
    if config.credential.is_none() {
        warn!("No Figma credential configured; upstream calls will fail");
    }

    let metrics = Metrics::new();
    let service = Arc::new(DesignService::new(&config, Arc::clone(&metrics))?);

    let mut registry = Registry::new();
    tools::register_all(&mut registry, service)?;
    info!(
        "Registered {} tools and {} resource templates",
        registry.tool_count(),
        registry.resource_count()
    );

    let server = McpServer::with_shared(
        Arc::new(registry),
        Arc::new(PromptRegistry::new()),
        ServerInfo {
            name: "figma-context-mcp".to_string(),
            version: VERSION.to_string(),
        },
        Arc::clone(&metrics),
    );

    match config.transport {
        Transport::Stdio => {
            let transport = Arc::new(StdioTransport::new());
            server.connect(transport.clone()).await?;
            tokio::select! {
                _ = transport.wait_closed() => {
                    info!("stdin closed");
                    // Answer everything already read before stdout goes away
                    server.drain().await;
                }
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        }
        Transport::Sse => {
            let transport = Arc::new(SseTransport::new(config.listen_addr(), metrics));
            server.connect(transport).await?;
            tokio::signal::ctrl_c().await?;
            info!("Interrupted");
        }
    }

    server.disconnect().await
}
