//! Model Context tools: convert files and nodes, validate contexts.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::convert::ConvertOptions;
use crate::error::{Error, Result};
use crate::mcp::handler::{
    get_bool_arg, get_optional_string_arg, get_string_arg, success_result, text_content,
    ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::model::{validate, validate_value, ModelContext};
use crate::service::DesignService;
use crate::tool_schema;

/// Conversion options from tool arguments, falling back to the service defaults.
fn options_from_args(service: &DesignService, args: &HashMap<String, Value>) -> ConvertOptions {
    let defaults = service.default_options();
    ConvertOptions {
        include_styles: get_bool_arg(args, "includeStyles", defaults.include_styles),
        include_variables: get_bool_arg(args, "includeVariables", defaults.include_variables),
        include_images: get_bool_arg(args, "includeImages", defaults.include_images),
        team_id: get_optional_string_arg(args, "teamId").or(defaults.team_id),
    }
}

/// Serialize a context, with its validation report appended on request.
fn context_result(context: &ModelContext, with_report: bool) -> Result<ToolResult> {
    let mut result = success_result(serde_json::to_string_pretty(context)?);
    if with_report {
        let report = validate(context);
        if !report.valid {
            warn!(
                "Converted context for {} failed validation: {:?}",
                context.metadata.source.file_key, report.errors
            );
        }
        result
            .content
            .push(text_content(serde_json::to_string_pretty(&report)?));
    }
    Ok(result)
}

fn conversion_properties() -> Value {
    tool_schema! {
        "fileKey": {
            "type": "string",
            "description": "Key of the Figma file (the part after /file/ in its URL)"
        },
        "includeStyles": {
            "type": "boolean",
            "description": "Copy named color, text and effect styles (default: true)"
        },
        "includeVariables": {
            "type": "boolean",
            "description": "Fetch local variables and collections (default: false)"
        },
        "includeImages": {
            "type": "boolean",
            "description": "Resolve image fills to download URLs (default: false)"
        },
        "teamId": {
            "type": "string",
            "description": "Attach this team's published components"
        },
        "validate": {
            "type": "boolean",
            "description": "Append a validation report (default: false)"
        }
    }
}

/// Convert a whole file.
pub struct GetFileContextTool {
    service: Arc<DesignService>,
}

impl GetFileContextTool {
    pub fn new(service: Arc<DesignService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for GetFileContextTool {
    fn definition(&self) -> Tool {
        let mut input_schema = conversion_properties();
        input_schema["required"] = serde_json::json!(["fileKey"]);
        Tool {
            name: "get_file_context".to_string(),
            description: "Fetch a Figma file and convert it to a Model Context: a flat element list, an explicit parent/child hierarchy, named styles and optional variables, assets and component library.".to_string(),
            input_schema,
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let file_key = get_string_arg(&args, "fileKey")?;
        let options = options_from_args(&self.service, &args);
        let context = self.service.file_context(&file_key, &options).await?;
        context_result(&context, get_bool_arg(&args, "validate", false))
    }
}

/// Convert one node and its subtree.
pub struct GetNodeContextTool {
    service: Arc<DesignService>,
}

impl GetNodeContextTool {
    pub fn new(service: Arc<DesignService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for GetNodeContextTool {
    fn definition(&self) -> Tool {
        let mut input_schema = conversion_properties();
        input_schema["properties"]["nodeId"] = serde_json::json!({
            "type": "string",
            "description": "Id of the node to convert, e.g. 1:23"
        });
        input_schema["required"] = serde_json::json!(["fileKey", "nodeId"]);
        Tool {
            name: "get_node_context".to_string(),
            description: "Convert a single node of a Figma file, with everything beneath it, to a Model Context rooted at that node.".to_string(),
            input_schema,
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let file_key = get_string_arg(&args, "fileKey")?;
        let node_id = get_string_arg(&args, "nodeId")?;
        let options = options_from_args(&self.service, &args);
        let context = self
            .service
            .node_context(&file_key, &node_id, &options)
            .await?;
        context_result(&context, get_bool_arg(&args, "validate", false))
    }
}

/// Check a Model Context for structural problems.
pub struct ValidateContextTool;

#[async_trait]
impl ToolHandler for ValidateContextTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "validate_context".to_string(),
            description: "Check a Model Context for structural problems: missing sections, dangling parent or child references, elements without hierarchy entries and the reverse. Reports every violation found.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "context": {
                        "description": "The Model Context, as an object or a JSON string"
                    }
                },
                "required": ["context"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let context = match args.get("context") {
            Some(Value::String(text)) => serde_json::from_str(text)?,
            Some(value) => value.clone(),
            None => {
                return Err(Error::InvalidParams(
                    "Missing required argument: context".to_string(),
                ))
            }
        };

        let report = validate_value(&context);
        Ok(success_result(serde_json::to_string_pretty(&report)?))
    }
}
