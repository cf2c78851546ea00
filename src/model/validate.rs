//! Structural checks over a Model Context.
//!
//! Validation never fails: every violation found is returned in the report,
//! so a single call surfaces all of them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::context::ModelContext;

/// Outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// The fields of a hierarchy entry the checks look at.
struct NodeRef<'a> {
    id: &'a str,
    parent: Option<&'a str>,
    children: Vec<&'a str>,
}

struct ImageRef<'a> {
    image_ref: &'a str,
    element_ids: Vec<&'a str>,
}

/// Borrowed view shared by typed and raw validation.
struct View<'a> {
    root: Option<&'a str>,
    hierarchy: Vec<NodeRef<'a>>,
    element_ids: Vec<&'a str>,
    interactions: Vec<&'a str>,
    images: Vec<ImageRef<'a>>,
}

/// Validate a typed context.
pub fn validate(context: &ModelContext) -> ValidationReport {
    let structure = &context.design.structure;
    let view = View {
        root: Some(structure.root.as_str()),
        hierarchy: structure
            .hierarchy
            .iter()
            .map(|node| NodeRef {
                id: &node.id,
                parent: node.parent.as_deref(),
                children: node
                    .children
                    .iter()
                    .flatten()
                    .map(String::as_str)
                    .collect(),
            })
            .collect(),
        element_ids: context
            .design
            .elements
            .iter()
            .map(|e| e.id.as_str())
            .collect(),
        interactions: context
            .interactions
            .iter()
            .flatten()
            .map(|i| i.element_id.as_str())
            .collect(),
        images: context
            .assets
            .iter()
            .flat_map(|a| &a.images)
            .map(|image| ImageRef {
                image_ref: &image.image_ref,
                element_ids: image.element_ids.iter().map(String::as_str).collect(),
            })
            .collect(),
    };

    let mut errors = Vec::new();
    check_structure(&view, &mut errors);
    ValidationReport::from_errors(errors)
}

/// A member that is present and not `null`.
fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|value| !value.is_null())
}

fn as_object<'a>(
    value: &'a Value,
    path: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    let object = value.as_object();
    if object.is_none() {
        errors.push(format!("Malformed context: {} is not an object", path));
    }
    object
}

fn as_array<'a>(value: &'a Value, path: &str, errors: &mut Vec<String>) -> &'a [Value] {
    match value.as_array() {
        Some(items) => items,
        None => {
            errors.push(format!("Malformed context: {} is not an array", path));
            &[]
        }
    }
}

/// String entries of an optional id list; anything else is reported.
fn id_list<'a>(
    value: Option<&'a Value>,
    owner: &str,
    field: &str,
    errors: &mut Vec<String>,
) -> Vec<&'a str> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        errors.push(format!("{} has malformed {}", owner, field));
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let id = item.as_str();
            if id.is_none() {
                errors.push(format!(
                    "{} has a malformed {} entry at index {}",
                    owner, field, index
                ));
            }
            id
        })
        .collect()
}

/// Validate a context that has not been deserialized yet.
///
/// Walks the raw JSON so a badly shaped entry is reported on its own and the
/// remaining checks still run.
pub fn validate_value(value: &Value) -> ValidationReport {
    let Some(context) = value.as_object() else {
        return ValidationReport::from_errors(vec![
            "Malformed context: expected a JSON object".to_string(),
        ]);
    };

    let mut errors = Vec::new();
    if present(context, "metadata").is_none() {
        errors.push("Missing required field: metadata".to_string());
    }

    let design = match present(context, "design") {
        Some(design) => as_object(design, "design", &mut errors),
        None => {
            errors.push("Missing required field: design".to_string());
            None
        }
    };
    let mut structure = None;
    let mut elements = None;
    if let Some(design) = design {
        match present(design, "structure") {
            Some(value) => structure = as_object(value, "design.structure", &mut errors),
            None => errors.push("Missing required field: design.structure".to_string()),
        }
        match present(design, "elements") {
            Some(value) => elements = Some(as_array(value, "design.elements", &mut errors)),
            None => errors.push("Missing required field: design.elements".to_string()),
        }
        if present(design, "styles").is_none() {
            errors.push("Missing required field: design.styles".to_string());
        }
    }

    let mut root = None;
    let mut hierarchy = Vec::new();
    if let Some(structure) = structure {
        match present(structure, "root") {
            Some(Value::String(id)) => root = Some(id.as_str()),
            Some(_) => errors
                .push("Malformed context: design.structure.root is not a string".to_string()),
            None => errors.push("Missing required field: design.structure.root".to_string()),
        }

        let nodes = present(structure, "hierarchy")
            .map(|value| as_array(value, "design.structure.hierarchy", &mut errors))
            .unwrap_or_default();
        for (index, node) in nodes.iter().enumerate() {
            let Some(id) = node.get("id").and_then(Value::as_str) else {
                errors.push(format!("Hierarchy node at index {} has no id", index));
                continue;
            };
            let owner = format!("Hierarchy node {}", id);
            let parent = match node.get("parent") {
                None | Some(Value::Null) => None,
                Some(Value::String(parent)) => Some(parent.as_str()),
                Some(_) => {
                    errors.push(format!("{} has a malformed parent", owner));
                    None
                }
            };
            let children = id_list(node.get("children"), &owner, "children", &mut errors);
            hierarchy.push(NodeRef {
                id,
                parent,
                children,
            });
        }
    }

    let mut element_ids = Vec::new();
    for (index, element) in elements.unwrap_or_default().iter().enumerate() {
        match element.get("id").and_then(Value::as_str) {
            Some(id) => element_ids.push(id),
            None => errors.push(format!("Element at index {} has no id", index)),
        }
    }

    let mut interactions = Vec::new();
    if let Some(value) = present(context, "interactions") {
        let entries = as_array(value, "interactions", &mut errors);
        for (index, interaction) in entries.iter().enumerate() {
            match interaction.get("elementId").and_then(Value::as_str) {
                Some(id) => interactions.push(id),
                None => errors.push(format!("Interaction at index {} has no elementId", index)),
            }
        }
    }

    let mut images = Vec::new();
    let assets =
        present(context, "assets").and_then(|value| as_object(value, "assets", &mut errors));
    if let Some(value) = assets.and_then(|assets| present(assets, "images")) {
        for (index, image) in as_array(value, "assets.images", &mut errors).iter().enumerate() {
            let Some(image_ref) = image.get("imageRef").and_then(Value::as_str) else {
                errors.push(format!("Image asset at index {} has no imageRef", index));
                continue;
            };
            let owner = format!("Image asset {}", image_ref);
            let element_ids = id_list(image.get("elementIds"), &owner, "elementIds", &mut errors);
            images.push(ImageRef {
                image_ref,
                element_ids,
            });
        }
    }

    // Cross-reference checks only make sense once both sides exist.
    if structure.is_some() && elements.is_some() {
        let view = View {
            root,
            hierarchy,
            element_ids,
            interactions,
            images,
        };
        check_structure(&view, &mut errors);
    }
    ValidationReport::from_errors(errors)
}

fn check_structure(view: &View<'_>, errors: &mut Vec<String>) {
    let mut hierarchy_ids = HashSet::new();
    for node in &view.hierarchy {
        if !hierarchy_ids.insert(node.id) {
            errors.push(format!("Duplicate hierarchy id: {}", node.id));
        }
    }

    let mut element_ids = HashSet::new();
    for id in &view.element_ids {
        if !element_ids.insert(*id) {
            errors.push(format!("Duplicate element id: {}", id));
        }
    }

    if let Some(root) = view.root {
        if !hierarchy_ids.contains(root) {
            errors.push(format!("Root element {} not found in hierarchy", root));
        }
    }

    for node in &view.hierarchy {
        if let Some(parent) = node.parent {
            if !hierarchy_ids.contains(parent) {
                errors.push(format!(
                    "Hierarchy node {} references missing parent {}",
                    node.id, parent
                ));
            }
        }
        for child in &node.children {
            if !hierarchy_ids.contains(child) {
                errors.push(format!(
                    "Hierarchy node {} references missing child {}",
                    node.id, child
                ));
            }
        }
    }

    for id in &view.element_ids {
        if !hierarchy_ids.contains(id) {
            errors.push(format!("Element {} has no hierarchy entry", id));
        }
    }
    for node in &view.hierarchy {
        if !element_ids.contains(node.id) {
            errors.push(format!("Hierarchy node {} has no matching element", node.id));
        }
    }

    for id in &view.interactions {
        if !element_ids.contains(id) {
            errors.push(format!("Interaction references missing element {}", id));
        }
    }
    for image in &view.images {
        for id in &image.element_ids {
            if !element_ids.contains(id) {
                errors.push(format!(
                    "Image asset {} references missing element {}",
                    image.image_ref, id
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::context::*;
    use crate::model::element::*;
    use serde_json::json;

    fn node(id: &str, parent: Option<&str>, children: &[&str]) -> HierarchyNode {
        HierarchyNode {
            id: id.to_string(),
            name: id.to_string(),
            element_type: ElementType::Frame,
            parent: parent.map(String::from),
            children: if children.is_empty() {
                None
            } else {
                Some(children.iter().map(|c| c.to_string()).collect())
            },
        }
    }

    fn element(id: &str) -> DesignElement {
        DesignElement {
            id: id.to_string(),
            name: id.to_string(),
            element_type: ElementType::Frame,
            visible: true,
            locked: false,
            position: None,
            style: None,
            text: None,
            component_properties: None,
            constraints: None,
            layout_properties: None,
        }
    }

    fn context(hierarchy: Vec<HierarchyNode>, elements: Vec<DesignElement>) -> ModelContext {
        ModelContext {
            metadata: Metadata {
                version: "1.0.0".to_string(),
                source: SourceInfo {
                    source_type: "figma".to_string(),
                    file_key: "k".to_string(),
                    file_name: "f".to_string(),
                    last_modified: "2024-01-01T00:00:00Z".to_string(),
                    url: None,
                },
                timestamp: chrono::Utc::now(),
                generator: "test".to_string(),
            },
            design: Design {
                structure: Structure {
                    root: "1".to_string(),
                    hierarchy,
                },
                elements,
                styles: Styles::default(),
                variables: None,
            },
            semantics: None,
            interactions: None,
            assets: None,
            extensions: None,
        }
    }

    #[test]
    fn test_valid_context() {
        let ctx = context(
            vec![node("1", None, &["2"]), node("2", Some("1"), &[])],
            vec![element("1"), element("2")],
        );
        let report = validate(&ctx);
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_reports_every_violation() {
        let ctx = context(
            vec![node("1", None, &["2"]), node("2", Some("ghost"), &[])],
            vec![element("1"), element("2"), element("orphan")],
        );
        let report = validate(&ctx);
        assert!(!report.valid);
        assert!(report.errors.len() >= 2);
        assert!(report.errors.iter().any(|e| e.contains("missing parent ghost")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("orphan has no hierarchy entry")));
    }

    #[test]
    fn test_bijection_checked_both_ways() {
        let ctx = context(
            vec![node("1", None, &["2", "3"]), node("2", Some("1"), &[])],
            vec![element("1"), element("3")],
        );
        let report = validate(&ctx);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("missing child 3")));
        assert!(report
            .errors
            .iter()
            .any(|e| e == "Hierarchy node 2 has no matching element"));
        assert!(report
            .errors
            .iter()
            .any(|e| e == "Element 3 has no hierarchy entry"));
    }

    #[test]
    fn test_missing_root() {
        let mut ctx = context(vec![node("1", None, &[])], vec![element("1")]);
        ctx.design.structure.root = "0".to_string();
        let report = validate(&ctx);
        assert_eq!(report.errors, vec!["Root element 0 not found in hierarchy"]);
    }

    #[test]
    fn test_join_keys_in_interactions_and_assets() {
        let mut ctx = context(vec![node("1", None, &[])], vec![element("1")]);
        ctx.interactions = Some(vec![Interaction {
            element_id: "9".to_string(),
            trigger: "ON_CLICK".to_string(),
            action: InteractionAction {
                action_type: "NODE".to_string(),
                destination_id: Some("1".to_string()),
                navigation: None,
                url: None,
            },
        }]);
        ctx.assets = Some(Assets {
            images: vec![ImageAsset {
                image_ref: "img".to_string(),
                url: None,
                element_ids: vec!["1".to_string(), "8".to_string()],
            }],
        });
        let report = validate(&ctx);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_raw_missing_sections() {
        let report = validate_value(&json!({"design": {"elements": []}}));
        assert!(!report.valid);
        assert!(report
            .errors
            .contains(&"Missing required field: metadata".to_string()));
        assert!(report
            .errors
            .contains(&"Missing required field: design.structure".to_string()));
        assert!(report
            .errors
            .contains(&"Missing required field: design.styles".to_string()));
    }

    #[test]
    fn test_raw_matches_typed() {
        let ctx = context(
            vec![node("1", None, &["2"]), node("2", Some("1"), &[])],
            vec![element("1"), element("2")],
        );
        let value = serde_json::to_value(&ctx).unwrap();
        assert!(validate_value(&value).valid);

        let broken = context(vec![node("1", Some("x"), &[])], vec![element("1")]);
        let value = serde_json::to_value(&broken).unwrap();
        assert_eq!(validate_value(&value), validate(&broken));
    }

    #[test]
    fn test_raw_malformed_entries_do_not_hide_others() {
        let report = validate_value(&json!({
            "metadata": {},
            "design": {
                "structure": {
                    "root": "1",
                    "hierarchy": [
                        {"id": "1", "children": ["2"]},
                        {"id": "2", "parent": "ghost"},
                        {"name": "no id"}
                    ]
                },
                "elements": [{"id": "1"}, {"id": "2"}, {"id": "orphan"}],
                "styles": {}
            }
        }));
        assert!(!report.valid);
        for expected in [
            "Hierarchy node at index 2 has no id",
            "Hierarchy node 2 references missing parent ghost",
            "Element orphan has no hierarchy entry",
        ] {
            assert!(
                report.errors.iter().any(|e| e == expected),
                "missing {:?} in {:?}",
                expected,
                report.errors
            );
        }
    }

    #[test]
    fn test_raw_wrong_shapes_reported_individually() {
        let report = validate_value(&json!({
            "metadata": {},
            "design": {
                "structure": {"root": 1, "hierarchy": [{"id": "1", "children": ["1", 7]}]},
                "elements": [{"id": "1"}, {"name": "anonymous"}],
                "styles": {}
            },
            "interactions": [{"trigger": "ON_CLICK"}, {"elementId": "9"}],
            "assets": {"images": [{"imageRef": "img", "elementIds": "1"}]}
        }));
        let errors = &report.errors;
        for expected in [
            "Malformed context: design.structure.root is not a string",
            "Hierarchy node 1 has a malformed children entry at index 1",
        ] {
            assert!(errors.iter().any(|e| e == expected), "{:?}", errors);
        }
        assert!(errors.contains(&"Element at index 1 has no id".to_string()));
        assert!(errors.contains(&"Interaction at index 0 has no elementId".to_string()));
        assert!(errors.contains(&"Interaction references missing element 9".to_string()));
        assert!(errors.contains(&"Image asset img has malformed elementIds".to_string()));
    }

    #[test]
    fn test_raw_non_object() {
        let report = validate_value(&json!("nope"));
        assert!(!report.valid);
        assert!(report.errors[0].starts_with("Malformed context"));
    }
}
