//! Figma Context MCP Server
//!
//! An MCP server that turns Figma documents into normalized Model Context
//! documents: a flat element list, an explicit parent/child hierarchy, named
//! styles and optional variables, semantics, interactions and assets.
//!
//! # Architecture
//!
//! 1. **Upstream** (`figma`) - Document shape and REST client
//! 2. **Conversion** (`convert`, `model`) - Document Converter, Model Context and its validator
//! 3. **Service** (`service`) - Fetch-then-convert operations shared by tools and resources
//! 4. **Protocol** (`mcp`) - URI templates, registry, JSON-RPC dispatcher, stdio and memory transports
//! 5. **Surface** (`tools`, `http`) - Concrete tools and resources, SSE transport
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use figma_context_mcp::config::Config;
//! use figma_context_mcp::mcp::{McpServer, PromptRegistry, Registry, StdioTransport};
//! use figma_context_mcp::metrics::Metrics;
//! use figma_context_mcp::service::DesignService;
//!
//! # async fn run() -> figma_context_mcp::Result<()> {
//! let config = Config::default();
//! let service = Arc::new(DesignService::new(&config, Metrics::new())?);
//! let mut registry = Registry::new();
//! figma_context_mcp::tools::register_all(&mut registry, service)?;
//!
//! let server = McpServer::new(registry, PromptRegistry::new(), "figma-context-mcp");
//! server.connect(Arc::new(StdioTransport::new())).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod figma;
pub mod http;
pub mod mcp;
pub mod metrics;
pub mod model;
pub mod service;
pub mod tools;

pub use error::{Error, Result};

/// Server version, announced in `server.info` and stamped into generated contexts.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
