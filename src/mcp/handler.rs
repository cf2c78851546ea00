//! Tool and resource handler traits, plus argument helpers.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mcp::protocol::{ContentBlock, ReadResourceResult, Tool, ToolResult};

/// Handler for `tool.call`.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Tool name, description and parameter shape.
    fn definition(&self) -> Tool;

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: HashMap<String, Value>) -> Result<ToolResult>;
}

/// Handler for `resource.get`.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Read the resource addressed by `uri`, with the parameters its template
    /// captured.
    async fn read(&self, uri: &Url, params: &HashMap<String, String>)
        -> Result<ReadResourceResult>;
}

/// Helper macro for creating tool input schemas.
#[macro_export]
macro_rules! tool_schema {
    ($($json:tt)+) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $($json)+
            }
        })
    };
}

/// Helper to create a text content block.
pub fn text_content(text: impl Into<String>) -> ContentBlock {
    ContentBlock::Text { text: text.into() }
}

/// Helper to create a successful tool result.
pub fn success_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        is_error: false,
    }
}

/// Helper to create an error tool result.
pub fn error_result(text: impl Into<String>) -> ToolResult {
    ToolResult {
        content: vec![text_content(text)],
        is_error: true,
    }
}

/// Helper to extract a required string argument.
pub fn get_string_arg(args: &HashMap<String, Value>, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| Error::InvalidParams(format!("Missing required argument: {}", name)))
}

/// Helper to extract an optional string argument.
pub fn get_optional_string_arg(args: &HashMap<String, Value>, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(String::from)
}

/// Helper to extract a boolean argument with a default.
pub fn get_bool_arg(args: &HashMap<String, Value>, name: &str, default: bool) -> bool {
    args.get(name).and_then(|v| v.as_bool()).unwrap_or(default)
}

/// Helper to extract an optional float argument.
pub fn get_optional_f64_arg(args: &HashMap<String, Value>, name: &str) -> Option<f64> {
    args.get(name).and_then(|v| v.as_f64())
}

/// Helper to extract a string array argument.
pub fn get_string_array_arg(args: &HashMap<String, Value>, name: &str) -> Vec<String> {
    args.get(name)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Helper to extract a required captured URI parameter, percent-decoded.
pub fn get_uri_param(params: &HashMap<String, String>, name: &str) -> Result<String> {
    let raw = params
        .get(name)
        .ok_or_else(|| Error::InvalidParams(format!("Missing URI parameter: {}", name)))?;
    Ok(percent_encoding::percent_decode_str(raw)
        .decode_utf8_lossy()
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "echo".to_string(),
                description: "Echo input".to_string(),
                input_schema: tool_schema! {
                    "input": { "type": "string" }
                },
            }
        }

        async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
            let input = get_optional_string_arg(&args, "input").unwrap_or_default();
            Ok(success_result(format!("Echo: {}", input)))
        }
    }

    #[tokio::test]
    async fn test_tool_execution() {
        let mut args = HashMap::new();
        args.insert("input".to_string(), json!("hello"));

        let result = EchoTool.execute(args).await.unwrap();
        assert!(!result.is_error);
        match &result.content[0] {
            ContentBlock::Text { text } => assert_eq!(text, "Echo: hello"),
            _ => panic!("Expected text content"),
        }
        assert_eq!(EchoTool.definition().input_schema["type"], "object");
    }

    #[test]
    fn test_get_string_arg() {
        let mut args = HashMap::new();
        args.insert("name".to_string(), json!("value"));

        assert_eq!(get_string_arg(&args, "name").unwrap(), "value");
        assert!(get_string_arg(&args, "missing").is_err());
    }

    #[test]
    fn test_get_bool_arg() {
        let mut args = HashMap::new();
        args.insert("flag".to_string(), json!(true));

        assert!(get_bool_arg(&args, "flag", false));
        assert!(!get_bool_arg(&args, "missing", false));
        assert!(get_bool_arg(&args, "missing", true));
    }

    #[test]
    fn test_get_optional_f64_arg() {
        let mut args = HashMap::new();
        args.insert("scale".to_string(), json!(2));
        assert_eq!(get_optional_f64_arg(&args, "scale"), Some(2.0));
        assert_eq!(get_optional_f64_arg(&args, "missing"), None);
    }

    #[test]
    fn test_get_string_array_arg() {
        let mut args = HashMap::new();
        args.insert("items".to_string(), json!(["a", "b", 3]));

        assert_eq!(get_string_array_arg(&args, "items"), vec!["a", "b"]);
        assert!(get_string_array_arg(&args, "missing").is_empty());
    }

    #[test]
    fn test_get_uri_param_decodes() {
        let mut params = HashMap::new();
        params.insert("nodeId".to_string(), "1%3A2".to_string());
        assert_eq!(get_uri_param(&params, "nodeId").unwrap(), "1:2");
        assert!(get_uri_param(&params, "fileKey").is_err());
    }

    #[test]
    fn test_result_helpers() {
        assert!(!success_result("ok").is_error);
        assert!(error_result("bad").is_error);
    }
}
