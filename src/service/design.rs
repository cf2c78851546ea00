//! Design service - fetch, convert and describe Figma documents.

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::convert::{component_library, ConvertOptions, Converter, SourceDocument};
use crate::error::{Error, Result};
use crate::figma::{DesignSource, FigmaClient};
use crate::metrics::Metrics;
use crate::model::{ComponentLibrary, ModelContext};

/// Image formats the render endpoint accepts.
pub const IMAGE_FORMATS: &[&str] = &["png", "jpg", "svg", "pdf"];

/// Design service shared by tools and resources.
pub struct DesignService {
    client: Arc<FigmaClient>,
    converter: Converter,
    default_team: Option<String>,
}

impl DesignService {
    /// Create a new design service.
    pub fn new(config: &Config, metrics: Arc<Metrics>) -> Result<Self> {
        let client = Arc::new(FigmaClient::new(config)?);
        Ok(Self::with_client(client, config.team_id.clone(), metrics))
    }

    pub fn with_client(
        client: Arc<FigmaClient>,
        default_team: Option<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let source: Arc<dyn DesignSource> = client.clone();
        Self {
            client,
            converter: Converter::with_source(source).with_metrics(metrics),
            default_team,
        }
    }

    /// Options used when a caller does not override anything.
    pub fn default_options(&self) -> ConvertOptions {
        ConvertOptions {
            team_id: self.default_team.clone(),
            ..ConvertOptions::default()
        }
    }

    /// Fetch and convert a whole file.
    pub async fn file_context(
        &self,
        file_key: &str,
        options: &ConvertOptions,
    ) -> Result<ModelContext> {
        info!("Converting file {}", file_key);
        let file = self.client.get_file(file_key).await?;
        let document = SourceDocument::from_file(file_key, file);
        self.converter.convert(&document, options).await
    }

    /// Fetch and convert one node and its subtree.
    pub async fn node_context(
        &self,
        file_key: &str,
        node_id: &str,
        options: &ConvertOptions,
    ) -> Result<ModelContext> {
        info!("Converting node {} of file {}", node_id, file_key);
        let mut response = self
            .client
            .get_file_nodes(file_key, &[node_id.to_string()])
            .await?;

        let entry = response
            .nodes
            .swap_remove(node_id)
            .flatten()
            .ok_or_else(|| Error::NodeNotFound(format!("{} in file {}", node_id, file_key)))?;

        let document = SourceDocument::from_node_entry(
            file_key,
            node_id,
            response.name,
            response.last_modified,
            entry,
        );
        self.converter.convert(&document, options).await
    }

    /// Resolve the team to use: the explicit one, else the configured default.
    pub fn resolve_team(&self, team_id: Option<&str>) -> Result<String> {
        team_id
            .map(String::from)
            .or_else(|| self.default_team.clone())
            .ok_or_else(|| {
                Error::InvalidParams("No teamId given and no default team configured".to_string())
            })
    }

    /// Published components of a team.
    pub async fn team_components(&self, team_id: &str) -> Result<ComponentLibrary> {
        let components = self.client.team_components(team_id).await?;
        debug!("Team {} has {} published components", team_id, components.len());
        Ok(component_library(team_id, components))
    }

    /// Render nodes and return node id to URL.
    pub async fn image_urls(
        &self,
        file_key: &str,
        node_ids: &[String],
        format: &str,
        scale: Option<f64>,
    ) -> Result<IndexMap<String, Option<String>>> {
        if node_ids.is_empty() {
            return Err(Error::InvalidParams("nodeIds must not be empty".to_string()));
        }
        if !IMAGE_FORMATS.contains(&format) {
            return Err(Error::InvalidParams(format!(
                "Unsupported image format '{}'; expected one of {}",
                format,
                IMAGE_FORMATS.join(", ")
            )));
        }
        if let Some(scale) = scale {
            if !(0.01..=4.0).contains(&scale) {
                return Err(Error::InvalidParams(format!(
                    "scale must be between 0.01 and 4, got {}",
                    scale
                )));
            }
        }

        let rendered = self
            .client
            .render_images(file_key, node_ids, format, scale)
            .await?;
        Ok(rendered.images)
    }
}
