//! MCP tools and resources.
//!
//! - `context` - Convert files and nodes, validate contexts (3 tools)
//! - `library` - Team components and rendered images (2 tools)
//! - `resources` - `figma://` resources (3 templates)

pub mod context;
pub mod library;
pub mod resources;

use std::sync::Arc;

use crate::error::Result;
use crate::mcp::registry::{Registry, ResourceTemplate};
use crate::service::DesignService;

const JSON: &str = "application/json";

/// Register every resource and tool, in listing order.
pub fn register_all(registry: &mut Registry, service: Arc<DesignService>) -> Result<()> {
    // Resources (3)
    registry.register_resource(
        "file",
        ResourceTemplate::new(resources::FILE_TEMPLATE)?
            .with_description("A Figma file converted to a Model Context")
            .with_mime_type(JSON),
        Arc::new(resources::FileResource::new(service.clone())),
    );
    registry.register_resource(
        "node",
        ResourceTemplate::new(resources::NODE_TEMPLATE)?
            .with_description("One node of a Figma file, with its subtree, as a Model Context")
            .with_mime_type(JSON)
            .with_list(false),
        Arc::new(resources::NodeResource::new(service.clone())),
    );
    registry.register_resource(
        "components",
        ResourceTemplate::new(resources::COMPONENTS_TEMPLATE)?
            .with_description("Components a team has published to its library")
            .with_mime_type(JSON),
        Arc::new(resources::ComponentsResource::new(service.clone())),
    );

    // Context tools (3)
    registry.register_tool(context::GetFileContextTool::new(service.clone()));
    registry.register_tool(context::GetNodeContextTool::new(service.clone()));
    registry.register_tool(context::ValidateContextTool);

    // Library tools (2)
    registry.register_tool(library::GetTeamComponentsTool::new(service.clone()));
    registry.register_tool(library::GetImageUrlsTool::new(service));

    Ok(())
}
