//! Resource and tool registry.
//!
//! A pure lookup table populated at startup. Entries are kept in registration
//! order; registering an existing name replaces the entry in place.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::mcp::handler::{ResourceHandler, ToolHandler};
use crate::mcp::protocol::{ResourceDescriptor, ResourceTemplateEntry, Tool};
use crate::mcp::template::UriTemplate;

/// A resource's URI template and listing metadata.
#[derive(Debug, Clone)]
pub struct ResourceTemplate {
    pub uri_template: UriTemplate,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    /// `Some(false)` hides the template from `resource.list`.
    pub list: Option<bool>,
}

impl ResourceTemplate {
    /// Compile a template from its pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            uri_template: UriTemplate::parse(pattern)?,
            description: None,
            mime_type: None,
            list: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_list(mut self, list: bool) -> Self {
        self.list = Some(list);
        self
    }

    /// Whether the template shows up in `resource.list`.
    pub fn is_listed(&self) -> bool {
        self.list != Some(false)
    }
}

/// A registered resource.
pub struct ResourceEntry {
    pub name: String,
    pub template: ResourceTemplate,
    pub handler: Arc<dyn ResourceHandler>,
}

/// A registered tool.
pub struct ToolEntry {
    pub definition: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

/// The outcome of resolving a URI against the registered templates.
pub struct ResolvedResource<'a> {
    pub entry: &'a ResourceEntry,
    pub params: HashMap<String, String>,
}

/// Registry of resources and tools.
#[derive(Default)]
pub struct Registry {
    resources: IndexMap<String, ResourceEntry>,
    tools: IndexMap<String, ToolEntry>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource under `name`.
    pub fn register_resource(
        &mut self,
        name: impl Into<String>,
        template: ResourceTemplate,
        handler: Arc<dyn ResourceHandler>,
    ) {
        let name = name.into();
        self.resources.insert(
            name.clone(),
            ResourceEntry {
                name,
                template,
                handler,
            },
        );
    }

    /// Register a tool handler under the name from its definition.
    pub fn register_tool<T: ToolHandler + 'static>(&mut self, handler: T) {
        self.register_tool_arc(Arc::new(handler));
    }

    /// Register a tool handler (Arc version).
    pub fn register_tool_arc(&mut self, handler: Arc<dyn ToolHandler>) {
        let definition = handler.definition();
        self.tools.insert(
            definition.name.clone(),
            ToolEntry {
                definition,
                handler,
            },
        );
    }

    /// Every registered template, in registration order.
    pub fn list_resource_templates(&self) -> Vec<ResourceTemplateEntry> {
        self.resources
            .values()
            .map(|entry| ResourceTemplateEntry {
                name: entry.name.clone(),
                uri_template: entry.template.uri_template.pattern().to_string(),
            })
            .collect()
    }

    /// Templates whose list flag is not explicitly false.
    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        self.resources
            .values()
            .filter(|entry| entry.template.is_listed())
            .map(|entry| ResourceDescriptor {
                name: entry.name.clone(),
                uri_template: entry.template.uri_template.pattern().to_string(),
                description: entry.template.description.clone(),
                mime_type: entry.template.mime_type.clone(),
            })
            .collect()
    }

    /// First registered resource whose template matches `uri`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::collections::HashMap;
    /// # use std::sync::Arc;
    /// # use figma_context_mcp::mcp::{ReadResourceResult, Registry, ResourceContents, ResourceHandler, ResourceTemplate};
    /// # use reqwest::Url;
    /// struct Echo;
    ///
    /// #[async_trait::async_trait]
    /// impl ResourceHandler for Echo {
    ///     async fn read(
    ///         &self,
    ///         uri: &Url,
    ///         params: &HashMap<String, String>,
    ///     ) -> figma_context_mcp::Result<ReadResourceResult> {
    ///         Ok(ReadResourceResult {
    ///             contents: vec![ResourceContents::json(uri.as_str(), params["fileKey"].clone())],
    ///         })
    ///     }
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let mut registry = Registry::new();
    /// registry.register_resource(
    ///     "file",
    ///     ResourceTemplate::new("figma://file/{fileKey}").unwrap(),
    ///     Arc::new(Echo),
    /// );
    ///
    /// let resolved = registry.resolve_resource("figma://file/abc").unwrap();
    /// let uri = Url::parse("figma://file/abc").unwrap();
    /// let result = resolved.entry.handler.read(&uri, &resolved.params).await.unwrap();
    /// assert_eq!(result.contents[0].text.as_deref(), Some("abc"));
    /// assert!(registry.resolve_resource("figma://team/1").is_none());
    /// # });
    /// ```
    pub fn resolve_resource(&self, uri: &str) -> Option<ResolvedResource<'_>> {
        self.resources.values().find_map(|entry| {
            entry
                .template
                .uri_template
                .match_uri(uri)
                .map(|params| ResolvedResource { entry, params })
        })
    }

    /// Exact-name tool lookup.
    pub fn find_tool(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.get(name)
    }

    /// Tool definitions, in registration order.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools
            .values()
            .map(|entry| entry.definition.clone())
            .collect()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}
