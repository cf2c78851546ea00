//! URI-addressed resources backed by the design service.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::mcp::handler::{get_uri_param, ResourceHandler};
use crate::mcp::protocol::{ReadResourceResult, ResourceContents};
use crate::service::DesignService;

pub const FILE_TEMPLATE: &str = "figma://file/{fileKey}";
pub const NODE_TEMPLATE: &str = "figma://file/{fileKey}/node/{nodeId}";
pub const COMPONENTS_TEMPLATE: &str = "figma://team/{teamId}/components";

fn json_contents<T: serde::Serialize>(uri: &Url, value: &T) -> Result<ReadResourceResult> {
    Ok(ReadResourceResult {
        contents: vec![ResourceContents::json(
            uri.as_str(),
            serde_json::to_string_pretty(value)?,
        )],
    })
}

/// `figma://file/{fileKey}`: the converted file.
pub struct FileResource {
    service: Arc<DesignService>,
}

impl FileResource {
    pub fn new(service: Arc<DesignService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ResourceHandler for FileResource {
    async fn read(&self, uri: &Url, params: &HashMap<String, String>) -> Result<ReadResourceResult> {
        let file_key = get_uri_param(params, "fileKey")?;
        let context = self
            .service
            .file_context(&file_key, &self.service.default_options())
            .await?;
        json_contents(uri, &context)
    }
}

/// `figma://file/{fileKey}/node/{nodeId}`: one converted subtree.
pub struct NodeResource {
    service: Arc<DesignService>,
}

impl NodeResource {
    pub fn new(service: Arc<DesignService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ResourceHandler for NodeResource {
    async fn read(&self, uri: &Url, params: &HashMap<String, String>) -> Result<ReadResourceResult> {
        let file_key = get_uri_param(params, "fileKey")?;
        let node_id = get_uri_param(params, "nodeId")?;
        let context = self
            .service
            .node_context(&file_key, &node_id, &self.service.default_options())
            .await?;
        json_contents(uri, &context)
    }
}

/// `figma://team/{teamId}/components`: a team's published components.
pub struct ComponentsResource {
    service: Arc<DesignService>,
}

impl ComponentsResource {
    pub fn new(service: Arc<DesignService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ResourceHandler for ComponentsResource {
    async fn read(&self, uri: &Url, params: &HashMap<String, String>) -> Result<ReadResourceResult> {
        let team_id = get_uri_param(params, "teamId")?;
        let library = self.service.team_components(&team_id).await?;
        json_contents(uri, &library)
    }
}
