//! Library and asset tools.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::mcp::handler::{
    error_result, get_optional_f64_arg, get_optional_string_arg, get_string_arg,
    get_string_array_arg, success_result, ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::service::design::IMAGE_FORMATS;
use crate::service::DesignService;
use crate::tool_schema;

/// List a team's published components.
pub struct GetTeamComponentsTool {
    service: Arc<DesignService>,
}

impl GetTeamComponentsTool {
    pub fn new(service: Arc<DesignService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for GetTeamComponentsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_team_components".to_string(),
            description: "List the components a team has published to its library. Uses the configured default team when teamId is omitted.".to_string(),
            input_schema: tool_schema! {
                "teamId": {
                    "type": "string",
                    "description": "Team id (optional when a default team is configured)"
                }
            },
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let team_id = self
            .service
            .resolve_team(get_optional_string_arg(&args, "teamId").as_deref())?;
        let library = self.service.team_components(&team_id).await?;
        Ok(success_result(serde_json::to_string_pretty(&library)?))
    }
}

/// Render nodes to images and return their URLs.
pub struct GetImageUrlsTool {
    service: Arc<DesignService>,
}

impl GetImageUrlsTool {
    pub fn new(service: Arc<DesignService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for GetImageUrlsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_image_urls".to_string(),
            description: "Render nodes of a Figma file to images and return a download URL per node id. URLs expire after a while upstream.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "fileKey": {
                        "type": "string",
                        "description": "Key of the Figma file"
                    },
                    "nodeIds": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Ids of the nodes to render"
                    },
                    "format": {
                        "type": "string",
                        "enum": IMAGE_FORMATS,
                        "description": "Image format (default: png)"
                    },
                    "scale": {
                        "type": "number",
                        "description": "Scale factor between 0.01 and 4 (default: 1)"
                    }
                },
                "required": ["fileKey", "nodeIds"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let file_key = get_string_arg(&args, "fileKey")?;
        let node_ids = get_string_array_arg(&args, "nodeIds");
        let format = get_optional_string_arg(&args, "format").unwrap_or_else(|| "png".to_string());
        let scale = get_optional_f64_arg(&args, "scale");

        let images = self
            .service
            .image_urls(&file_key, &node_ids, &format, scale)
            .await?;

        if images.values().all(Option::is_none) {
            return Ok(error_result(format!(
                "No images could be rendered for nodes: {}",
                node_ids.join(", ")
            )));
        }
        Ok(success_result(serde_json::to_string_pretty(&images)?))
    }
}
