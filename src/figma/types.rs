//! Upstream document shapes as returned by the Figma REST API.
//!
//! Only the fields the converter reads are modeled; everything else in the
//! payload is ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Upstream node type. Anything not listed lands in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Document,
    Canvas,
    Frame,
    Group,
    Section,
    Component,
    ComponentSet,
    Instance,
    Rectangle,
    Ellipse,
    Line,
    Star,
    RegularPolygon,
    Vector,
    BooleanOperation,
    Text,
    Slice,
    #[serde(other)]
    Unknown,
}

/// A node of the document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    #[serde(default)]
    pub children: Vec<Node>,
    pub absolute_bounding_box: Option<Rect>,
    pub rotation: Option<f64>,
    pub fills: Option<Vec<Paint>>,
    pub strokes: Option<Vec<Paint>>,
    pub stroke_weight: Option<f64>,
    pub effects: Option<Vec<Effect>>,
    pub opacity: Option<f64>,
    pub blend_mode: Option<String>,
    pub corner_radius: Option<f64>,
    /// Style slot to style id, e.g. `{"fill": "1:23"}`.
    pub styles: Option<IndexMap<String, String>>,
    pub characters: Option<String>,
    pub style: Option<TypeStyle>,
    pub component_properties: Option<IndexMap<String, ComponentPropertyValue>>,
    pub component_property_definitions: Option<IndexMap<String, ComponentPropertyDefinition>>,
    pub component_id: Option<String>,
    pub constraints: Option<LayoutConstraint>,
    pub layout_mode: Option<String>,
    pub padding_left: Option<f64>,
    pub padding_right: Option<f64>,
    pub padding_top: Option<f64>,
    pub padding_bottom: Option<f64>,
    pub item_spacing: Option<f64>,
    pub primary_axis_align_items: Option<String>,
    pub counter_axis_align_items: Option<String>,
    pub primary_axis_sizing_mode: Option<String>,
    pub counter_axis_sizing_mode: Option<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Node {
    /// Minimal node with the given identity; every optional field unset.
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            visible: None,
            locked: None,
            children: Vec::new(),
            absolute_bounding_box: None,
            rotation: None,
            fills: None,
            strokes: None,
            stroke_weight: None,
            effects: None,
            opacity: None,
            blend_mode: None,
            corner_radius: None,
            styles: None,
            characters: None,
            style: None,
            component_properties: None,
            component_property_definitions: None,
            component_id: None,
            constraints: None,
            layout_mode: None,
            padding_left: None,
            padding_right: None,
            padding_top: None,
            padding_bottom: None,
            item_spacing: None,
            primary_axis_align_items: None,
            counter_axis_align_items: None,
            primary_axis_sizing_mode: None,
            counter_axis_sizing_mode: None,
            reactions: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

fn opaque() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub position: f64,
    pub color: Rgba,
}

/// Upstream fill or stroke. `paint_type` is e.g. `SOLID`, `GRADIENT_LINEAR`
/// or `IMAGE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paint {
    #[serde(rename = "type")]
    pub paint_type: String,
    pub visible: Option<bool>,
    pub opacity: Option<f64>,
    pub color: Option<Rgba>,
    #[serde(default)]
    pub gradient_stops: Vec<ColorStop>,
    #[serde(default)]
    pub gradient_handle_positions: Vec<Vector>,
    pub scale_mode: Option<String>,
    pub image_ref: Option<String>,
}

impl Paint {
    pub fn solid(color: Rgba) -> Self {
        Self {
            paint_type: "SOLID".to_string(),
            visible: None,
            opacity: None,
            color: Some(color),
            gradient_stops: Vec::new(),
            gradient_handle_positions: Vec::new(),
            scale_mode: None,
            image_ref: None,
        }
    }

    pub fn image(image_ref: impl Into<String>) -> Self {
        Self {
            paint_type: "IMAGE".to_string(),
            visible: None,
            opacity: None,
            color: None,
            gradient_stops: Vec::new(),
            gradient_handle_positions: Vec::new(),
            scale_mode: Some("FILL".to_string()),
            image_ref: Some(image_ref.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    #[serde(rename = "type")]
    pub effect_type: String,
    pub visible: Option<bool>,
    #[serde(default)]
    pub radius: f64,
    pub color: Option<Rgba>,
    pub offset: Option<Vector>,
    pub spread: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeStyle {
    pub font_family: Option<String>,
    pub font_weight: Option<f64>,
    pub font_size: Option<f64>,
    pub line_height_px: Option<f64>,
    pub letter_spacing: Option<f64>,
    pub text_align_horizontal: Option<String>,
    pub text_align_vertical: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPropertyValue {
    #[serde(rename = "type")]
    pub property_type: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPropertyDefinition {
    #[serde(rename = "type")]
    pub property_type: String,
    pub default_value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConstraint {
    pub horizontal: String,
    pub vertical: String,
}

/// Prototype reaction. Newer files carry `actions`, older ones a single
/// `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub trigger: Option<Trigger>,
    pub action: Option<Action>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "type")]
    pub trigger_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    pub destination_id: Option<String>,
    pub navigation: Option<String>,
    pub url: Option<String>,
}

/// Style table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleMeta {
    #[serde(default)]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `FILL`, `TEXT`, `EFFECT` or `GRID`.
    pub style_type: String,
}

/// Component table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentMeta {
    #[serde(default)]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// `GET /files/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigmaFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_modified: String,
    pub version: Option<String>,
    pub thumbnail_url: Option<String>,
    pub document: Option<Node>,
    #[serde(default)]
    pub components: IndexMap<String, ComponentMeta>,
    #[serde(default)]
    pub styles: IndexMap<String, StyleMeta>,
}

/// `GET /files/{key}/nodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNodes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_modified: String,
    /// Requested id to its subtree; `None` for ids that do not exist.
    #[serde(default)]
    pub nodes: IndexMap<String, Option<NodeEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    pub document: Option<Node>,
    #[serde(default)]
    pub components: IndexMap<String, ComponentMeta>,
    #[serde(default)]
    pub styles: IndexMap<String, StyleMeta>,
}

/// `GET /files/{key}/images`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFills {
    #[serde(default)]
    pub error: bool,
    pub meta: ImageFillsMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageFillsMeta {
    /// Image reference to download URL.
    #[serde(default)]
    pub images: HashMap<String, String>,
}

/// `GET /images/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedImages {
    pub err: Option<String>,
    /// Node id to render URL; `None` when rendering failed for that node.
    #[serde(default)]
    pub images: IndexMap<String, Option<String>>,
}

/// `GET /files/{key}/variables/local`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVariables {
    #[serde(default)]
    pub error: bool,
    pub meta: LocalVariablesMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalVariablesMeta {
    #[serde(default)]
    pub variables: IndexMap<String, UpstreamVariable>,
    #[serde(default)]
    pub variable_collections: IndexMap<String, UpstreamVariableCollection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamVariable {
    pub id: String,
    pub name: String,
    pub variable_collection_id: String,
    pub resolved_type: String,
    #[serde(default)]
    pub values_by_mode: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamVariableCollection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub modes: Vec<UpstreamMode>,
    pub default_mode_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamMode {
    pub mode_id: String,
    pub name: String,
}

/// `GET /teams/{id}/components`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamComponents {
    #[serde(default)]
    pub error: bool,
    pub meta: TeamComponentsMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamComponentsMeta {
    #[serde(default)]
    pub components: Vec<PublishedComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedComponent {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub file_key: Option<String>,
    pub node_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub containing_frame: Option<ContainingFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainingFrame {
    pub name: Option<String>,
    pub node_id: Option<String>,
    pub page_name: Option<String>,
}
