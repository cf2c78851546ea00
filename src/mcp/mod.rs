//! Model Context Protocol (MCP) implementation.
//!
//! # Architecture
//!
//! - `protocol` - JSON-RPC frames and protocol payloads
//! - `template` - URI templates used to address resources
//! - `registry` - Resource and tool lookup table
//! - `prompts` - Built-in prompt templates
//! - `server` - Per-connection dispatcher
//! - `transport` - Stdio and in-memory transports

pub mod handler;
pub mod prompts;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod template;
pub mod transport;

pub use handler::{ResourceHandler, ToolHandler};
pub use prompts::PromptRegistry;
pub use protocol::*;
pub use registry::{Registry, ResourceTemplate};
pub use server::{ConnectionState, McpServer};
pub use template::UriTemplate;
pub use transport::{MemoryTransport, StdioTransport, Transport};
