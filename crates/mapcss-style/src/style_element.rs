//! Style output descriptors
//!
//! The renderer-facing result of a style computation: a flat, ordered list
//! of draw instructions with fully coerced values. The renderer performs no
//! cascade logic of its own.

use mapcss_osm::OsmType;

use crate::cascade::Cascade;
use crate::color::Color;
use crate::environment::Environment;
use crate::value::Keyword;

/// An icon placed at a node or an area's center.
#[derive(Debug, Clone, PartialEq)]
pub struct IconStyle {
    pub image: String,
    /// Rotation in radians, clockwise from north.
    pub rotation: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub opacity: f64,
    pub z_index: f64,
}

/// A stroked line along a way.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: Color,
    pub width: f64,
    pub dashes: Option<Vec<f32>>,
    pub linecap: Keyword,
    pub linejoin: Keyword,
    pub opacity: f64,
    pub z_index: f64,
}

/// A filled area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaStyle {
    pub color: Color,
    pub opacity: f64,
    pub z_index: f64,
}

/// A text label.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub text: String,
    pub color: Color,
    pub font_size: f64,
    pub halo_color: Option<Color>,
    pub halo_radius: f64,
    pub z_index: f64,
}

/// One draw instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleElement {
    Icon(IconStyle),
    Line(LineStyle),
    Area(AreaStyle),
    Text(TextStyle),
}

impl StyleElement {
    /// Coarse draw-order class; areas go below lines, icons and text on
    /// top.
    pub fn major_z(&self) -> f64 {
        match self {
            StyleElement::Area(_) => 1.0,
            StyleElement::Line(_) => 3.0,
            StyleElement::Icon(_) => 4.0,
            StyleElement::Text(_) => 5.0,
        }
    }

    /// Fine draw order within a class, from the `z-index` property.
    pub fn z_index(&self) -> f64 {
        match self {
            StyleElement::Icon(s) => s.z_index,
            StyleElement::Line(s) => s.z_index,
            StyleElement::Area(s) => s.z_index,
            StyleElement::Text(s) => s.z_index,
        }
    }
}

/// Derives the draw instructions one layer's cascade asks for.
///
/// Each element kind is gated on its defining property: `icon-image` for
/// icons, a positive `width` for lines, `fill-color` for areas and a
/// non-empty `text` for labels.
pub fn elements_for_layer(env: &Environment, cascade: &Cascade) -> Vec<StyleElement> {
    let z_index = cascade.get_number("z-index", 0.0);
    let opacity = cascade.get_number("opacity", 1.0);
    let mut out = Vec::new();

    let kind = env.osm_type();
    if kind != Some(OsmType::Node) {
        if let Some(color) = cascade.get("fill-color").and_then(|v| v.as_color()) {
            out.push(StyleElement::Area(AreaStyle {
                color,
                opacity: cascade.get_number("fill-opacity", opacity),
                z_index,
            }));
        }
        let width = cascade.get_number("width", 0.0);
        if width > 0.0 {
            out.push(StyleElement::Line(LineStyle {
                color: cascade.get_color("color", Color::rgb(0.0, 0.0, 0.0)),
                width,
                dashes: cascade.get_float_array("dashes"),
                linecap: cascade.get_keyword("linecap", Keyword::Round),
                linejoin: cascade.get_keyword("linejoin", Keyword::Round),
                opacity,
                z_index,
            }));
        }
    }

    if let Some(image) = cascade.get_string("icon-image") {
        out.push(StyleElement::Icon(IconStyle {
            image,
            rotation: cascade.get_number("icon-rotation", 0.0),
            width: cascade.get("icon-width").and_then(|v| v.as_number()),
            height: cascade.get("icon-height").and_then(|v| v.as_number()),
            opacity: cascade.get_number("icon-opacity", opacity),
            z_index,
        }));
    }

    if let Some(text) = resolve_text(env, cascade) {
        out.push(StyleElement::Text(TextStyle {
            text,
            color: cascade.get_color("text-color", Color::rgb(1.0, 1.0, 1.0)),
            font_size: cascade.get_number("font-size", 10.0),
            halo_color: cascade.get("text-halo-color").and_then(|v| v.as_color()),
            halo_radius: cascade.get_number("text-halo-radius", 0.0),
            z_index,
        }));
    }

    out
}

/// The `text` property either names a tag to label with (`text: auto`
/// reads `name`) or evaluated to the label itself.
fn resolve_text(env: &Environment, cascade: &Cascade) -> Option<String> {
    let value = cascade.get("text")?;
    let text = match value {
        crate::value::Value::Keyword(Keyword::Auto) => env.tag("name")?.to_string(),
        other => other.as_display_string(),
    };
    if text.is_empty() {
        return None;
    }
    Some(text)
}

/// Sorts draw instructions into painter's order.
pub fn sort_elements(elements: &mut [StyleElement]) {
    elements.sort_by(|a, b| {
        (a.major_z(), a.z_index())
            .partial_cmp(&(b.major_z(), b.z_index()))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use mapcss_osm::{DataSet, EastNorth, Node, PrimitiveId, Way};

    fn node_env(data: &DataSet) -> Environment<'_> {
        Environment::new(data, PrimitiveId::node(1))
    }

    fn simple_data() -> DataSet {
        let mut data = DataSet::new();
        data.add_node(Node { id: 1, position: EastNorth::new(0.0, 0.0), tags: Default::default() });
        data.add_way(Way { id: 10, nodes: vec![1, 2], tags: Default::default() });
        data
    }

    #[test]
    fn test_icon_element_from_cascade() {
        let data = simple_data();
        let env = node_env(&data);
        let mut cascade = Cascade::new();
        cascade.put("icon-image", Value::String("a.svg".into()));
        cascade.put("icon-rotation", Value::Number(1.5));
        let elements = elements_for_layer(&env, &cascade);
        assert_eq!(elements.len(), 1);
        let StyleElement::Icon(icon) = &elements[0] else {
            panic!("expected an icon");
        };
        assert_eq!(icon.image, "a.svg");
        assert_eq!(icon.rotation, 1.5);
    }

    #[test]
    fn test_line_requires_positive_width_and_a_way() {
        let data = simple_data();
        let mut cascade = Cascade::new();
        cascade.put("width", Value::Number(2.0));
        cascade.put("color", Value::String("red".into()));

        let env = Environment::new(&data, PrimitiveId::way(10));
        let elements = elements_for_layer(&env, &cascade);
        assert_eq!(elements.len(), 1);
        let StyleElement::Line(line) = &elements[0] else {
            panic!("expected a line");
        };
        assert_eq!(line.color, Color::rgb(1.0, 0.0, 0.0));

        // nodes never get line elements
        assert!(elements_for_layer(&node_env(&data), &cascade).is_empty());
    }

    #[test]
    fn test_text_auto_reads_name_tag() {
        let mut data = simple_data();
        data.set_tag(PrimitiveId::node(1), "name", "Plaza");
        let env = node_env(&data);
        let mut cascade = Cascade::new();
        cascade.put("text", Value::Keyword(Keyword::Auto));
        let elements = elements_for_layer(&env, &cascade);
        let StyleElement::Text(text) = &elements[0] else {
            panic!("expected text");
        };
        assert_eq!(text.text, "Plaza");
    }

    #[test]
    fn test_sort_is_painter_order() {
        let mut elements = vec![
            StyleElement::Text(TextStyle {
                text: "t".into(),
                color: Color::rgb(1.0, 1.0, 1.0),
                font_size: 10.0,
                halo_color: None,
                halo_radius: 0.0,
                z_index: 0.0,
            }),
            StyleElement::Line(LineStyle {
                color: Color::rgb(0.0, 0.0, 0.0),
                width: 1.0,
                dashes: None,
                linecap: Keyword::Round,
                linejoin: Keyword::Round,
                opacity: 1.0,
                z_index: 5.0,
            }),
            StyleElement::Line(LineStyle {
                color: Color::rgb(0.0, 0.0, 0.0),
                width: 3.0,
                dashes: None,
                linecap: Keyword::Round,
                linejoin: Keyword::Round,
                opacity: 1.0,
                z_index: -5.0,
            }),
            StyleElement::Area(AreaStyle {
                color: Color::rgb(0.0, 1.0, 0.0),
                opacity: 1.0,
                z_index: 0.0,
            }),
        ];
        sort_elements(&mut elements);
        assert!(matches!(elements[0], StyleElement::Area(_)));
        assert!(matches!(elements[1], StyleElement::Line(ref l) if l.z_index == -5.0));
        assert!(matches!(elements[2], StyleElement::Line(ref l) if l.z_index == 5.0));
        assert!(matches!(elements[3], StyleElement::Text(_)));
    }
}
