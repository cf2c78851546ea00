//! Paint and effect mapping.

use crate::figma::types as upstream;
use crate::model::{Color, ColorStop, Effect, Paint, Vector2};

fn is_hidden(visible: Option<bool>) -> bool {
    visible == Some(false)
}

fn color(rgba: &upstream::Rgba, opacity: f64) -> Color {
    Color {
        r: rgba.r,
        g: rgba.g,
        b: rgba.b,
        a: rgba.a * opacity,
    }
}

fn vector(v: &upstream::Vector) -> Vector2 {
    Vector2 { x: v.x, y: v.y }
}

/// Map one upstream paint. Hidden paints and unsupported kinds (emoji,
/// video) map to `None`.
pub fn convert_paint(paint: &upstream::Paint) -> Option<Paint> {
    if is_hidden(paint.visible) {
        return None;
    }
    let opacity = paint.opacity.unwrap_or(1.0);

    match paint.paint_type.as_str() {
        "SOLID" => paint.color.as_ref().map(|c| Paint::Solid {
            color: color(c, opacity),
        }),
        kind if kind.starts_with("GRADIENT_") => Some(Paint::Gradient {
            gradient_type: kind.to_string(),
            stops: paint
                .gradient_stops
                .iter()
                .map(|stop| ColorStop {
                    position: stop.position,
                    color: color(&stop.color, opacity),
                })
                .collect(),
            handle_positions: paint.gradient_handle_positions.iter().map(vector).collect(),
        }),
        "IMAGE" => paint.image_ref.as_ref().map(|image_ref| Paint::Image {
            scale_mode: paint
                .scale_mode
                .clone()
                .unwrap_or_else(|| "FILL".to_string()),
            image_ref: image_ref.clone(),
            image_url: None,
        }),
        _ => None,
    }
}

/// Map a paint list, dropping hidden and unsupported entries.
pub fn convert_paints(paints: &[upstream::Paint]) -> Vec<Paint> {
    paints.iter().filter_map(convert_paint).collect()
}

/// Map a shadow or blur. Hidden effects map to `None`.
pub fn convert_effect(effect: &upstream::Effect) -> Option<Effect> {
    if is_hidden(effect.visible) {
        return None;
    }
    Some(Effect {
        effect_type: effect.effect_type.clone(),
        radius: effect.radius,
        color: effect.color.as_ref().map(|c| color(c, 1.0)),
        offset: effect.offset.as_ref().map(vector),
        spread: effect.spread,
    })
}

pub fn convert_effects(effects: &[upstream::Effect]) -> Vec<Effect> {
    effects.iter().filter_map(convert_effect).collect()
}

/// Image references used by a paint list.
pub fn image_refs(paints: &[Paint]) -> impl Iterator<Item = &str> {
    paints.iter().filter_map(|paint| match paint {
        Paint::Image { image_ref, .. } => Some(image_ref.as_str()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paint(value: serde_json::Value) -> upstream::Paint {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_solid_opacity_defaults_to_one() {
        let converted = convert_paint(&paint(json!({
            "type": "SOLID",
            "color": {"r": 1, "g": 0, "b": 0, "a": 1}
        })))
        .unwrap();
        let Paint::Solid { color } = converted else {
            panic!("Expected solid paint");
        };
        assert_eq!((color.r, color.g, color.b, color.a), (1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_solid_opacity_scales_alpha() {
        let converted = convert_paint(&paint(json!({
            "type": "SOLID",
            "opacity": 0.5,
            "color": {"r": 0, "g": 0, "b": 0, "a": 1}
        })))
        .unwrap();
        assert!(matches!(converted, Paint::Solid { color } if color.a == 0.5));
    }

    #[test]
    fn test_hidden_paints_are_dropped() {
        let paints = vec![
            paint(json!({"type": "SOLID", "visible": false, "color": {"r": 0, "g": 0, "b": 0}})),
            paint(json!({"type": "SOLID", "visible": true, "color": {"r": 1, "g": 1, "b": 1}})),
        ];
        assert_eq!(convert_paints(&paints).len(), 1);
    }

    #[test]
    fn test_gradient_keeps_stop_order() {
        let converted = convert_paint(&paint(json!({
            "type": "GRADIENT_LINEAR",
            "gradientStops": [
                {"position": 0, "color": {"r": 0, "g": 0, "b": 0, "a": 1}},
                {"position": 1, "color": {"r": 1, "g": 1, "b": 1, "a": 1}}
            ],
            "gradientHandlePositions": [{"x": 0, "y": 0.5}, {"x": 1, "y": 0.5}, {"x": 0, "y": 1}]
        })))
        .unwrap();
        let Paint::Gradient {
            gradient_type,
            stops,
            handle_positions,
        } = converted
        else {
            panic!("Expected gradient paint");
        };
        assert_eq!(gradient_type, "GRADIENT_LINEAR");
        assert_eq!(stops[0].position, 0.0);
        assert_eq!(stops[1].position, 1.0);
        assert_eq!(handle_positions.len(), 3);
    }

    #[test]
    fn test_image_and_unsupported_paints() {
        let image = convert_paint(&upstream::Paint::image("ref-1")).unwrap();
        assert_eq!(image_refs(std::slice::from_ref(&image)).collect::<Vec<_>>(), vec!["ref-1"]);

        assert!(convert_paint(&paint(json!({"type": "EMOJI"}))).is_none());
        assert!(convert_paint(&paint(json!({"type": "IMAGE"}))).is_none());
    }

    #[test]
    fn test_hidden_effects_are_dropped() {
        let effects: Vec<upstream::Effect> = serde_json::from_value(json!([
            {"type": "DROP_SHADOW", "radius": 4, "offset": {"x": 0, "y": 2},
             "color": {"r": 0, "g": 0, "b": 0, "a": 0.25}},
            {"type": "LAYER_BLUR", "radius": 8, "visible": false}
        ]))
        .unwrap();
        let converted = convert_effects(&effects);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].effect_type, "DROP_SHADOW");
        assert_eq!(converted[0].offset, Some(Vector2 { x: 0.0, y: 2.0 }));
    }
}
