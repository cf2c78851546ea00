//! Document → Model Context conversion.
//!
//! The tree walk is synchronous and pure. Styles come from the document
//! itself; variables, image URLs and the team component library are fetched
//! through a [`DesignSource`] and each degrades to "absent" on failure.

pub mod paint;

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::figma::types::{
    ComponentMeta, FigmaFile, LocalVariablesMeta, Node, NodeEntry, NodeType, PublishedComponent,
    StyleMeta,
};
use crate::figma::DesignSource;
use crate::metrics::{Metrics, Timer};
use crate::model::*;

/// Conversion switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Copy the document's named styles.
    pub include_styles: bool,
    /// Fetch and attach local variables.
    pub include_variables: bool,
    /// Resolve image fills to download URLs.
    pub include_images: bool,
    /// Attach this team's published components as an extension.
    pub team_id: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            include_styles: true,
            include_variables: false,
            include_images: false,
            team_id: None,
        }
    }
}

/// Identity of the document being converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMetadata {
    pub file_key: String,
    pub file_name: String,
    pub last_modified: String,
    pub url: Option<String>,
}

impl SourceMetadata {
    fn into_source_info(self) -> SourceInfo {
        SourceInfo {
            source_type: "figma".to_string(),
            file_key: self.file_key,
            file_name: self.file_name,
            last_modified: self.last_modified,
            url: self.url,
        }
    }
}

/// A document tree plus the side tables the converter reads.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub metadata: SourceMetadata,
    pub root: Option<Node>,
    pub styles: IndexMap<String, StyleMeta>,
    pub components: IndexMap<String, ComponentMeta>,
}

impl SourceDocument {
    /// A bare tree with no side tables.
    pub fn new(metadata: SourceMetadata, root: Node) -> Self {
        Self {
            metadata,
            root: Some(root),
            styles: IndexMap::new(),
            components: IndexMap::new(),
        }
    }

    /// Whole file as returned by `GET /files/{key}`.
    pub fn from_file(file_key: &str, file: FigmaFile) -> Self {
        Self {
            metadata: SourceMetadata {
                file_key: file_key.to_string(),
                url: Some(file_url(file_key, None)),
                file_name: file.name,
                last_modified: file.last_modified,
            },
            root: file.document,
            styles: file.styles,
            components: file.components,
        }
    }

    /// One subtree as returned by `GET /files/{key}/nodes`.
    pub fn from_node_entry(
        file_key: &str,
        node_id: &str,
        file_name: String,
        last_modified: String,
        entry: NodeEntry,
    ) -> Self {
        Self {
            metadata: SourceMetadata {
                file_key: file_key.to_string(),
                file_name,
                last_modified,
                url: Some(file_url(file_key, Some(node_id))),
            },
            root: entry.document,
            styles: entry.styles,
            components: entry.components,
        }
    }
}

/// Browser URL of a file, optionally focused on a node.
pub fn file_url(file_key: &str, node_id: Option<&str>) -> String {
    match node_id {
        Some(node_id) => format!(
            "https://www.figma.com/file/{}?node-id={}",
            file_key,
            node_id.replace(':', "-")
        ),
        None => format!("https://www.figma.com/file/{}", file_key),
    }
}

/// Map an upstream node type. Unknown types become containers.
pub fn element_type(node_type: NodeType) -> ElementType {
    match node_type {
        NodeType::Document => ElementType::Document,
        NodeType::Canvas => ElementType::Canvas,
        NodeType::Frame => ElementType::Frame,
        NodeType::Group => ElementType::Group,
        NodeType::Section => ElementType::Section,
        NodeType::Component => ElementType::Component,
        NodeType::ComponentSet => ElementType::ComponentSet,
        NodeType::Instance => ElementType::Instance,
        NodeType::Rectangle => ElementType::Rectangle,
        NodeType::Ellipse => ElementType::Ellipse,
        NodeType::Line => ElementType::Line,
        NodeType::Star => ElementType::Star,
        NodeType::RegularPolygon => ElementType::RegularPolygon,
        NodeType::Vector => ElementType::Vector,
        NodeType::BooleanOperation => ElementType::BooleanOperation,
        NodeType::Text => ElementType::Text,
        NodeType::Slice => ElementType::Slice,
        NodeType::Unknown => ElementType::Container,
    }
}

/// Output of the tree walk.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkResult {
    pub structure: Structure,
    pub elements: Vec<DesignElement>,
    pub semantics: Vec<ComponentSemantics>,
    pub interactions: Vec<Interaction>,
}

/// Pre-order walk emitting one hierarchy node and one element per source node.
pub fn walk(root: &Node, components: &IndexMap<String, ComponentMeta>) -> WalkResult {
    let mut hierarchy = Vec::new();
    let mut elements = Vec::new();
    let mut semantics = Vec::new();
    let mut interactions = Vec::new();

    // Explicit stack: source trees can be deeper than the thread stack allows.
    let mut stack: Vec<(&Node, Option<&str>)> = vec![(root, None)];
    while let Some((node, parent)) = stack.pop() {
        let mapped = element_type(node.node_type);
        if node.node_type == NodeType::Unknown {
            debug!("Node {} has an unrecognized type; mapping to container", node.id);
        }

        hierarchy.push(HierarchyNode {
            id: node.id.clone(),
            name: node.name.clone(),
            element_type: mapped,
            parent: parent.map(String::from),
            children: (!node.children.is_empty())
                .then(|| node.children.iter().map(|c| c.id.clone()).collect()),
        });
        elements.push(convert_element(node, mapped));

        if let Some(role) = component_role(node.node_type) {
            semantics.push(ComponentSemantics {
                element_id: node.id.clone(),
                role,
                component_id: node.component_id.clone(),
                description: components
                    .get(&node.id)
                    .map(|meta| meta.description.clone())
                    .filter(|d| !d.is_empty()),
            });
        }
        interactions.extend(convert_reactions(node));

        for child in node.children.iter().rev() {
            stack.push((child, Some(node.id.as_str())));
        }
    }

    WalkResult {
        structure: Structure {
            root: root.id.clone(),
            hierarchy,
        },
        elements,
        semantics,
        interactions,
    }
}

fn component_role(node_type: NodeType) -> Option<ComponentRole> {
    match node_type {
        NodeType::Component => Some(ComponentRole::Component),
        NodeType::ComponentSet => Some(ComponentRole::ComponentSet),
        NodeType::Instance => Some(ComponentRole::Instance),
        _ => None,
    }
}

fn convert_element(node: &Node, element_type: ElementType) -> DesignElement {
    DesignElement {
        id: node.id.clone(),
        name: node.name.clone(),
        element_type,
        visible: node.visible.unwrap_or(true),
        locked: node.locked.unwrap_or(false),
        position: node.absolute_bounding_box.map(|bbox| Position {
            x: bbox.x,
            y: bbox.y,
            width: bbox.width,
            height: bbox.height,
            rotation: node.rotation,
        }),
        style: convert_style(node),
        text: element_type.is_text().then(|| convert_text(node)),
        component_properties: convert_component_properties(node),
        constraints: node.constraints.as_ref().map(|c| Constraints {
            horizontal: c.horizontal.clone(),
            vertical: c.vertical.clone(),
        }),
        layout_properties: convert_layout(node),
    }
}

fn convert_style(node: &Node) -> Option<ElementStyle> {
    let present = node.fills.is_some()
        || node.strokes.is_some()
        || node.effects.is_some()
        || node.opacity.is_some()
        || node.blend_mode.is_some();
    if !present {
        return None;
    }

    Some(ElementStyle {
        fills: node.fills.as_deref().map(paint::convert_paints),
        strokes: node.strokes.as_deref().map(paint::convert_paints),
        stroke_weight: node.stroke_weight,
        effects: node.effects.as_deref().map(paint::convert_effects),
        opacity: node.opacity,
        blend_mode: node.blend_mode.clone(),
        corner_radius: node.corner_radius,
        style_ids: node.styles.clone(),
    })
}

fn convert_text(node: &Node) -> TextContent {
    let style = node.style.as_ref();
    TextContent {
        characters: node.characters.clone().unwrap_or_default(),
        font_family: style.and_then(|s| s.font_family.clone()),
        font_weight: style.and_then(|s| s.font_weight),
        font_size: style.and_then(|s| s.font_size),
        line_height: style.and_then(|s| s.line_height_px),
        letter_spacing: style.and_then(|s| s.letter_spacing),
        text_align_horizontal: style.and_then(|s| s.text_align_horizontal.clone()),
        text_align_vertical: style.and_then(|s| s.text_align_vertical.clone()),
    }
}

fn convert_component_properties(node: &Node) -> Option<IndexMap<String, ComponentProperty>> {
    if let Some(properties) = &node.component_properties {
        return Some(
            properties
                .iter()
                .map(|(name, p)| {
                    (
                        name.clone(),
                        ComponentProperty {
                            property_type: p.property_type.clone(),
                            value: p.value.clone(),
                        },
                    )
                })
                .collect(),
        );
    }

    // Main components only carry definitions; their defaults are the values.
    node.component_property_definitions.as_ref().map(|definitions| {
        definitions
            .iter()
            .map(|(name, d)| {
                (
                    name.clone(),
                    ComponentProperty {
                        property_type: d.property_type.clone(),
                        value: d.default_value.clone(),
                    },
                )
            })
            .collect()
    })
}

fn convert_layout(node: &Node) -> Option<LayoutProperties> {
    let mode = node.layout_mode.clone()?;
    let has_padding = node.padding_top.is_some()
        || node.padding_right.is_some()
        || node.padding_bottom.is_some()
        || node.padding_left.is_some();

    Some(LayoutProperties {
        mode,
        padding: has_padding.then(|| Padding {
            top: node.padding_top.unwrap_or(0.0),
            right: node.padding_right.unwrap_or(0.0),
            bottom: node.padding_bottom.unwrap_or(0.0),
            left: node.padding_left.unwrap_or(0.0),
        }),
        item_spacing: node.item_spacing,
        primary_axis_align: node.primary_axis_align_items.clone(),
        counter_axis_align: node.counter_axis_align_items.clone(),
        primary_axis_sizing: node.primary_axis_sizing_mode.clone(),
        counter_axis_sizing: node.counter_axis_sizing_mode.clone(),
    })
}

fn convert_reactions(node: &Node) -> Vec<Interaction> {
    let mut interactions = Vec::new();
    for reaction in &node.reactions {
        let Some(trigger) = &reaction.trigger else {
            continue;
        };
        for action in reaction.action.iter().chain(reaction.actions.iter()) {
            interactions.push(Interaction {
                element_id: node.id.clone(),
                trigger: trigger.trigger_type.clone(),
                action: InteractionAction {
                    action_type: action.action_type.clone(),
                    destination_id: action.destination_id.clone(),
                    navigation: action.navigation.clone(),
                    url: action.url.clone(),
                },
            });
        }
    }
    interactions
}

/// Bucket the style table by kind. Grid styles are never populated.
pub fn bucket_styles(styles: &IndexMap<String, StyleMeta>) -> Styles {
    let mut buckets = Styles::default();
    for (id, meta) in styles {
        let definition = StyleDefinition {
            id: id.clone(),
            key: meta.key.clone(),
            name: meta.name.clone(),
            description: meta.description.clone(),
        };
        match meta.style_type.as_str() {
            "FILL" => buckets.color.push(definition),
            "TEXT" => buckets.text.push(definition),
            "EFFECT" => buckets.effect.push(definition),
            other => debug!("Skipping style {} of type {}", id, other),
        }
    }
    buckets
}

fn convert_variables(meta: LocalVariablesMeta) -> Variables {
    Variables {
        collections: meta
            .variable_collections
            .into_values()
            .map(|c| VariableCollection {
                id: c.id,
                name: c.name,
                modes: c
                    .modes
                    .into_iter()
                    .map(|m| VariableMode {
                        mode_id: m.mode_id,
                        name: m.name,
                    })
                    .collect(),
                default_mode_id: c.default_mode_id,
            })
            .collect(),
        variables: meta
            .variables
            .into_values()
            .map(|v| Variable {
                id: v.id,
                name: v.name,
                collection_id: v.variable_collection_id,
                resolved_type: v.resolved_type,
                values_by_mode: v.values_by_mode,
            })
            .collect(),
    }
}

/// Map a team's published components.
pub fn component_library(team_id: &str, components: Vec<PublishedComponent>) -> ComponentLibrary {
    ComponentLibrary {
        team_id: team_id.to_string(),
        components: components
            .into_iter()
            .map(|c| {
                let page_name = c.containing_frame.and_then(|f| f.page_name);
                LibraryComponent {
                    key: c.key,
                    name: c.name,
                    description: c.description,
                    file_key: c.file_key,
                    node_id: c.node_id,
                    page_name,
                    thumbnail_url: c.thumbnail_url,
                }
            })
            .collect(),
    }
}

/// Whether any element paints a fill or stroke with an image.
fn uses_images(elements: &[DesignElement]) -> bool {
    elements
        .iter()
        .filter_map(|element| element.style.as_ref())
        .flat_map(|style| style.fills.iter().chain(style.strokes.iter()))
        .any(|paints| paint::image_refs(paints).next().is_some())
}

/// Fill in image URLs on every image paint and collect the distinct images.
///
/// Returns one asset per image reference, in first-use order.
pub fn resolve_images(
    elements: &mut [DesignElement],
    urls: &std::collections::HashMap<String, String>,
) -> Vec<ImageAsset> {
    let mut assets: IndexMap<String, ImageAsset> = IndexMap::new();

    for element in elements.iter_mut() {
        let Some(style) = element.style.as_mut() else {
            continue;
        };
        let paints = style
            .fills
            .iter_mut()
            .chain(style.strokes.iter_mut())
            .flat_map(|paints| paints.iter_mut());

        for paint in paints {
            if let Paint::Image {
                image_ref,
                image_url,
                ..
            } = paint
            {
                *image_url = urls.get(image_ref.as_str()).cloned();
                let asset = assets
                    .entry(image_ref.clone())
                    .or_insert_with(|| ImageAsset {
                        image_ref: image_ref.clone(),
                        url: image_url.clone(),
                        element_ids: Vec::new(),
                    });
                if !asset.element_ids.contains(&element.id) {
                    asset.element_ids.push(element.id.clone());
                }
            }
        }
    }

    assets.into_values().collect()
}

/// Document converter.
#[derive(Clone, Default)]
pub struct Converter {
    source: Option<Arc<dyn DesignSource>>,
    metrics: Option<Arc<Metrics>>,
}

impl Converter {
    /// A converter with no upstream; the fetch-backed options are skipped.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(source: Arc<dyn DesignSource>) -> Self {
        Self {
            source: Some(source),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Convert a document.
    ///
    /// Fails only when the document has no root node.
    pub async fn convert(
        &self,
        document: &SourceDocument,
        options: &ConvertOptions,
    ) -> Result<ModelContext> {
        let timer = Timer::start();
        let file_key = document.metadata.file_key.as_str();
        let root = document
            .root
            .as_ref()
            .ok_or_else(|| Error::MissingDocumentRoot(file_key.to_string()))?;

        let WalkResult {
            structure,
            mut elements,
            semantics,
            interactions,
        } = walk(root, &document.components);

        let styles = if options.include_styles {
            bucket_styles(&document.styles)
        } else {
            Styles::default()
        };

        let variables = if options.include_variables {
            self.fetch_variables(file_key).await
        } else {
            None
        };

        let assets = if !options.include_images {
            None
        } else if !uses_images(&elements) {
            debug!("{} has no image paints; skipping image fill lookup", file_key);
            None
        } else {
            self.fetch_image_urls(file_key)
                .await
                .map(|urls| resolve_images(&mut elements, &urls))
                .filter(|images| !images.is_empty())
                .map(|images| Assets { images })
        };

        let component_library = match options.team_id.as_deref() {
            Some(team_id) => self.fetch_library(team_id).await,
            None => None,
        };
        let extensions = component_library.map(|library| Extensions {
            component_library: Some(library),
            other: IndexMap::new(),
        });

        let context = ModelContext {
            metadata: Metadata {
                version: MODEL_CONTEXT_VERSION.to_string(),
                source: document.metadata.clone().into_source_info(),
                timestamp: chrono::Utc::now(),
                generator: generator(),
            },
            design: Design {
                structure,
                elements,
                styles,
                variables,
            },
            semantics: (!semantics.is_empty()).then_some(Semantics {
                components: semantics,
            }),
            interactions: (!interactions.is_empty()).then_some(interactions),
            assets,
            extensions,
        };

        if let Some(metrics) = &self.metrics {
            metrics.inc_conversions();
        }
        info!(
            "Converted {} ({} elements) in {}ms",
            file_key,
            context.design.elements.len(),
            timer.elapsed_ms()
        );
        Ok(context)
    }

    fn source(&self, feature: &str) -> Option<&Arc<dyn DesignSource>> {
        if self.source.is_none() {
            warn!("No design source configured; skipping {}", feature);
        }
        self.source.as_ref()
    }

    async fn fetch_variables(&self, file_key: &str) -> Option<Variables> {
        let source = self.source("variables")?;
        match source.local_variables(file_key).await {
            Ok(meta) => Some(convert_variables(meta)),
            Err(e) => {
                warn!("Failed to fetch variables for {}: {}", file_key, e);
                None
            }
        }
    }

    async fn fetch_image_urls(
        &self,
        file_key: &str,
    ) -> Option<std::collections::HashMap<String, String>> {
        let source = self.source("image fills")?;
        match source.image_fills(file_key).await {
            Ok(urls) => Some(urls),
            Err(e) => {
                warn!("Failed to resolve image fills for {}: {}", file_key, e);
                None
            }
        }
    }

    async fn fetch_library(&self, team_id: &str) -> Option<ComponentLibrary> {
        let source = self.source("component library")?;
        match source.team_components(team_id).await {
            Ok(components) => Some(component_library(team_id, components)),
            Err(e) => {
                warn!("Failed to fetch components for team {}: {}", team_id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figma::types::{
        LocalVariablesMeta, Paint as UpstreamPaint, Rect, Rgba, UpstreamVariable,
        UpstreamVariableCollection,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn metadata() -> SourceMetadata {
        SourceMetadata {
            file_key: "file-1".to_string(),
            file_name: "Design".to_string(),
            last_modified: "2024-05-01T10:00:00Z".to_string(),
            url: None,
        }
    }

    fn sample_tree() -> Node {
        serde_json::from_value(json!({
            "id": "0:1",
            "type": "DOCUMENT",
            "children": [{
                "id": "0:2",
                "type": "CANVAS",
                "name": "Page 1",
                "children": [{"id": "0:3", "type": "RECTANGLE", "name": "Box", "visible": true}]
            }]
        }))
        .unwrap()
    }

    /// Upstream stand-in; `None` fields fail their fetch.
    #[derive(Default)]
    struct FakeSource {
        variables: Option<LocalVariablesMeta>,
        components: Option<Vec<PublishedComponent>>,
        images: Option<HashMap<String, String>>,
        image_fetches: AtomicUsize,
    }

    #[async_trait]
    impl DesignSource for FakeSource {
        async fn local_variables(&self, _file_key: &str) -> Result<LocalVariablesMeta> {
            self.variables
                .clone()
                .ok_or_else(|| Error::api(403, "Forbidden", "variables"))
        }

        async fn team_components(&self, _team_id: &str) -> Result<Vec<PublishedComponent>> {
            self.components
                .clone()
                .ok_or_else(|| Error::api(404, "Not Found", "team"))
        }

        async fn image_fills(&self, _file_key: &str) -> Result<HashMap<String, String>> {
            self.image_fetches.fetch_add(1, Ordering::SeqCst);
            self.images
                .clone()
                .ok_or_else(|| Error::api(500, "Internal Server Error", "images"))
        }
    }

    #[tokio::test]
    async fn test_example_document() {
        let document = SourceDocument::new(metadata(), sample_tree());
        let context = Converter::new()
            .convert(&document, &ConvertOptions::default())
            .await
            .unwrap();

        assert_eq!(context.design.structure.root, "0:1");
        assert_eq!(context.design.structure.hierarchy.len(), 3);
        assert_eq!(context.design.elements.len(), 3);
        assert!(validate(&context).valid);

        let ids: Vec<_> = context.design.elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["0:1", "0:2", "0:3"]);

        let page = &context.design.structure.hierarchy[1];
        assert_eq!(page.parent.as_deref(), Some("0:1"));
        assert_eq!(page.children.as_deref(), Some(&["0:3".to_string()][..]));
        assert!(context.design.structure.hierarchy[2].children.is_none());

        let root = &context.design.elements[0];
        assert!(root.visible);
        assert!(!root.locked);
        assert!(root.style.is_none());
        assert!(root.position.is_none());
    }

    #[tokio::test]
    async fn test_missing_root_is_the_only_failure() {
        let document = SourceDocument {
            metadata: metadata(),
            root: None,
            styles: IndexMap::new(),
            components: IndexMap::new(),
        };
        let err = Converter::new()
            .convert(&document, &ConvertOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingDocumentRoot(key) if key == "file-1"));
    }

    #[tokio::test]
    async fn test_structure_is_stable_across_runs() {
        let document = SourceDocument::new(metadata(), sample_tree());
        let converter = Converter::new();
        let first = converter
            .convert(&document, &ConvertOptions::default())
            .await
            .unwrap();
        let second = converter
            .convert(&document, &ConvertOptions::default())
            .await
            .unwrap();
        assert_eq!(first.design.structure, second.design.structure);
        assert_eq!(first.design.elements, second.design.elements);
    }

    #[test]
    fn test_unknown_type_becomes_container() {
        let root: Node = serde_json::from_value(json!({
            "id": "1", "type": "FRAME",
            "children": [{"id": "2", "type": "SOMETHING_NEW", "name": "future"}]
        }))
        .unwrap();
        let result = walk(&root, &IndexMap::new());
        assert_eq!(result.elements[1].element_type, ElementType::Container);
        assert_eq!(
            result.structure.hierarchy[1].element_type,
            ElementType::Container
        );
    }

    #[test]
    fn test_hidden_fill_dropped() {
        let mut node = Node::new("1", "Box", NodeType::Rectangle);
        let mut hidden = UpstreamPaint::solid(Rgba {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        });
        hidden.visible = Some(false);
        let mut shown = UpstreamPaint::solid(Rgba {
            r: 1.0,
            g: 1.0,
            b: 1.0,
            a: 1.0,
        });
        shown.visible = Some(true);
        node.fills = Some(vec![hidden, shown]);

        let result = walk(&node, &IndexMap::new());
        let fills = result.elements[0]
            .style
            .as_ref()
            .and_then(|s| s.fills.as_ref())
            .unwrap();
        assert_eq!(fills.len(), 1);
    }

    #[test]
    fn test_element_blocks() {
        let root: Node = serde_json::from_value(json!({
            "id": "1", "type": "FRAME", "name": "Card", "locked": true,
            "absoluteBoundingBox": {"x": 10, "y": 20, "width": 300, "height": 200},
            "layoutMode": "VERTICAL", "itemSpacing": 8, "paddingTop": 16,
            "constraints": {"horizontal": "LEFT", "vertical": "TOP"},
            "opacity": 0.9,
            "children": [{
                "id": "2", "type": "TEXT", "name": "Title", "characters": "Hello",
                "style": {"fontFamily": "Inter", "fontSize": 24, "fontWeight": 700}
            }, {
                "id": "3", "type": "INSTANCE", "name": "Button", "componentId": "9:9",
                "componentProperties": {"Label": {"type": "TEXT", "value": "Go"}}
            }]
        }))
        .unwrap();
        let result = walk(&root, &IndexMap::new());

        let card = &result.elements[0];
        assert!(card.locked);
        assert_eq!(card.position.unwrap().width, 300.0);
        let layout = card.layout_properties.as_ref().unwrap();
        assert_eq!(layout.mode, "VERTICAL");
        assert_eq!(layout.padding.unwrap().top, 16.0);
        assert_eq!(card.constraints.as_ref().unwrap().horizontal, "LEFT");
        assert_eq!(card.style.as_ref().unwrap().opacity, Some(0.9));
        assert!(card.text.is_none());

        let title = &result.elements[1];
        let text = title.text.as_ref().unwrap();
        assert_eq!(text.characters, "Hello");
        assert_eq!(text.font_family.as_deref(), Some("Inter"));
        assert!(title.style.is_none());

        let button = &result.elements[2];
        assert_eq!(
            button.component_properties.as_ref().unwrap()["Label"].value,
            json!("Go")
        );
        assert_eq!(result.semantics.len(), 1);
        assert_eq!(result.semantics[0].role, ComponentRole::Instance);
        assert_eq!(result.semantics[0].component_id.as_deref(), Some("9:9"));
    }

    #[test]
    fn test_interactions_from_reactions() {
        let root: Node = serde_json::from_value(json!({
            "id": "1", "type": "FRAME",
            "reactions": [
                {"trigger": {"type": "ON_CLICK"},
                 "actions": [{"type": "NODE", "destinationId": "5:5", "navigation": "NAVIGATE"}]},
                {"trigger": null, "actions": [{"type": "BACK"}]}
            ]
        }))
        .unwrap();
        let result = walk(&root, &IndexMap::new());
        assert_eq!(result.interactions.len(), 1);
        assert_eq!(result.interactions[0].trigger, "ON_CLICK");
        assert_eq!(
            result.interactions[0].action.destination_id.as_deref(),
            Some("5:5")
        );
    }

    #[test]
    fn test_style_buckets_skip_grid() {
        let styles: IndexMap<String, StyleMeta> = serde_json::from_value(json!({
            "S:1": {"key": "a", "name": "Primary", "styleType": "FILL"},
            "S:2": {"key": "b", "name": "Heading", "styleType": "TEXT"},
            "S:3": {"key": "c", "name": "Shadow", "styleType": "EFFECT"},
            "S:4": {"key": "d", "name": "Columns", "styleType": "GRID"}
        }))
        .unwrap();
        let buckets = bucket_styles(&styles);
        assert_eq!(buckets.color[0].name, "Primary");
        assert_eq!(buckets.text[0].id, "S:2");
        assert_eq!(buckets.effect.len(), 1);
        assert!(buckets.grid.is_empty());
    }

    #[tokio::test]
    async fn test_include_styles_off() {
        let mut document = SourceDocument::new(metadata(), sample_tree());
        document.styles.insert(
            "S:1".to_string(),
            StyleMeta {
                key: "a".to_string(),
                name: "Primary".to_string(),
                description: String::new(),
                style_type: "FILL".to_string(),
            },
        );
        let options = ConvertOptions {
            include_styles: false,
            ..ConvertOptions::default()
        };
        let context = Converter::new().convert(&document, &options).await.unwrap();
        assert!(context.design.styles.is_empty());
    }

    #[tokio::test]
    async fn test_best_effort_fetches_degrade() {
        let options = ConvertOptions {
            include_styles: true,
            include_variables: true,
            include_images: true,
            team_id: Some("team-1".to_string()),
        };
        let mut tree = sample_tree();
        tree.children[0].children[0].fills = Some(vec![UpstreamPaint::image("img-1")]);
        let document = SourceDocument::new(metadata(), tree);

        let failing = Converter::with_source(Arc::new(FakeSource::default()));
        let context = failing.convert(&document, &options).await.unwrap();
        assert!(context.design.variables.is_none());
        assert!(context.assets.is_none());
        assert!(context.extensions.is_none());
        assert!(validate(&context).valid);

        let offline = Converter::new().convert(&document, &options).await.unwrap();
        assert!(offline.design.variables.is_none());
    }

    #[tokio::test]
    async fn test_image_lookup_skipped_without_image_paints() {
        let source = Arc::new(FakeSource {
            images: Some(HashMap::new()),
            ..FakeSource::default()
        });
        let options = ConvertOptions {
            include_images: true,
            ..ConvertOptions::default()
        };
        let document = SourceDocument::new(metadata(), sample_tree());
        let context = Converter::with_source(source.clone())
            .convert(&document, &options)
            .await
            .unwrap();
        assert!(context.assets.is_none());
        assert_eq!(source.image_fetches.load(Ordering::SeqCst), 0);

        let mut tree = sample_tree();
        tree.children[0].children[0].strokes = Some(vec![UpstreamPaint::image("img-2")]);
        let document = SourceDocument::new(metadata(), tree);
        Converter::with_source(source.clone())
            .convert(&document, &options)
            .await
            .unwrap();
        assert_eq!(source.image_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetches_attach_sections() {
        let mut variables = LocalVariablesMeta::default();
        variables.variable_collections.insert(
            "VC:1".to_string(),
            UpstreamVariableCollection {
                id: "VC:1".to_string(),
                name: "Colors".to_string(),
                modes: vec![],
                default_mode_id: Some("M:1".to_string()),
            },
        );
        variables.variables.insert(
            "V:1".to_string(),
            UpstreamVariable {
                id: "V:1".to_string(),
                name: "brand".to_string(),
                variable_collection_id: "VC:1".to_string(),
                resolved_type: "COLOR".to_string(),
                values_by_mode: IndexMap::from([("M:1".to_string(), json!({"r": 1}))]),
            },
        );
        let source = FakeSource {
            variables: Some(variables),
            components: Some(vec![PublishedComponent {
                key: "k1".to_string(),
                name: "Button".to_string(),
                description: String::new(),
                file_key: Some("lib".to_string()),
                node_id: Some("1:1".to_string()),
                thumbnail_url: None,
                containing_frame: None,
            }]),
            images: Some(HashMap::from([(
                "img-1".to_string(),
                "https://cdn.test/img-1.png".to_string(),
            )])),
            ..FakeSource::default()
        };

        let mut tree = sample_tree();
        let rect = &mut tree.children[0].children[0];
        rect.absolute_bounding_box = Some(Rect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        });
        rect.fills = Some(vec![UpstreamPaint::image("img-1")]);
        rect.strokes = Some(vec![UpstreamPaint::image("img-1")]);
        let document = SourceDocument::new(metadata(), tree);

        let options = ConvertOptions {
            include_styles: true,
            include_variables: true,
            include_images: true,
            team_id: Some("team-1".to_string()),
        };
        let context = Converter::with_source(Arc::new(source))
            .convert(&document, &options)
            .await
            .unwrap();

        let variables = context.design.variables.as_ref().unwrap();
        assert_eq!(variables.collections[0].name, "Colors");
        assert_eq!(variables.variables[0].collection_id, "VC:1");

        let assets = context.assets.as_ref().unwrap();
        assert_eq!(assets.images.len(), 1);
        assert_eq!(assets.images[0].element_ids, vec!["0:3"]);
        assert_eq!(
            assets.images[0].url.as_deref(),
            Some("https://cdn.test/img-1.png")
        );
        let fills = context.design.elements[2]
            .style
            .as_ref()
            .unwrap()
            .fills
            .as_ref()
            .unwrap();
        assert!(matches!(
            &fills[0],
            Paint::Image { image_url: Some(url), .. } if url.ends_with("img-1.png")
        ));

        let library = context
            .extensions
            .as_ref()
            .and_then(|e| e.component_library.as_ref())
            .unwrap();
        assert_eq!(library.team_id, "team-1");
        assert_eq!(library.components[0].name, "Button");

        assert!(validate(&context).valid);
    }

    #[tokio::test]
    async fn test_conversion_counted() {
        let metrics = Metrics::new();
        let converter = Converter::new().with_metrics(metrics.clone());
        let document = SourceDocument::new(metadata(), sample_tree());
        converter
            .convert(&document, &ConvertOptions::default())
            .await
            .unwrap();
        assert_eq!(metrics.snapshot().conversions, 1);
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let mut node = Node::new("leaf", "leaf", NodeType::Rectangle);
        for depth in 0..1_000 {
            node = Node::new(format!("n{}", depth), "frame", NodeType::Frame).with_children(vec![node]);
        }
        let result = walk(&node, &IndexMap::new());
        assert_eq!(result.elements.len(), 1_001);
        assert_eq!(result.elements.last().unwrap().id, "leaf");
    }

    #[test]
    fn test_file_url() {
        assert_eq!(file_url("abc", None), "https://www.figma.com/file/abc");
        assert_eq!(
            file_url("abc", Some("1:2")),
            "https://www.figma.com/file/abc?node-id=1-2"
        );
    }
}
