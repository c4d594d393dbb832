//! Comprehensive tests for mapcss-style
//!
//! End-to-end coverage of parsing, matching, the cascade and the scale
//! cache through the public API.

use std::sync::Arc;

use mapcss_osm::{DataSet, EastNorth, Member, Node, PrimitiveId, Relation, Way};
use mapcss_style::{
    CombinatorPolicies, ComputedStyle, NeighborPolicy, ParseError, Range, StyleElement,
    StyleSource, Styler,
};

fn node(id: u64, east: f64, north: f64, tags: &[(&str, &str)]) -> Node {
    Node {
        id,
        position: EastNorth::new(east, north),
        tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    }
}

fn way(id: u64, nodes: Vec<u64>, tags: &[(&str, &str)]) -> Way {
    Way {
        id,
        nodes,
        tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn styler(source: &str) -> Styler {
    init_tracing();
    Styler::new(StyleSource::compile(source).unwrap())
}

fn icon_image(style: &ComputedStyle) -> Option<&str> {
    style.elements.iter().find_map(|e| match e {
        StyleElement::Icon(icon) => Some(icon.image.as_str()),
        _ => None,
    })
}

fn icon_rotation(style: &ComputedStyle) -> Option<f64> {
    style.elements.iter().find_map(|e| match e {
        StyleElement::Icon(icon) => Some(icon.rotation),
        _ => None,
    })
}

#[test]
fn test_empty_stylesheet() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[]));
    let s = styler("");
    let style = s.style(&data, PrimitiveId::node(1), 10.0);
    assert!(style.elements.is_empty());
}

#[test]
fn test_more_specific_rule_in_source_order_wins() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[("highway", "traffic_signals"), ("direction", "forward")]));
    let s = styler(
        r#"
        node[highway=traffic_signals] { icon-image: "a.svg"; }
        node[highway=traffic_signals][direction=forward] { icon-image: "b.svg"; }
        "#,
    );
    let style = s.style(&data, PrimitiveId::node(1), 10.0);
    assert_eq!(icon_image(&style), Some("b.svg"));
}

#[test]
fn test_cascade_override_across_sources() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[("amenity", "cafe")]));
    let mut s = styler(r#"node[amenity=cafe] { icon-image: "base.svg"; }"#);
    s.add_source(StyleSource::compile(r#"node[amenity=cafe] { icon-image: "user.svg"; }"#).unwrap());
    let style = s.style(&data, PrimitiveId::node(1), 10.0);
    assert_eq!(icon_image(&style), Some("user.svg"));
}

#[test]
fn test_unknown_function_rejects_the_whole_source() {
    let err = StyleSource::compile(
        r#"
        node { width: 1; }
        node { width: frobnicate(1); }
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::UnknownFunction { ref name, .. } if name == "frobnicate"));
}

#[test]
fn test_parse_failure_is_isolated_per_source() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[("highway", "stop")]));
    let good = StyleSource::compile(r#"node[highway=stop] { icon-image: "ok.svg"; }"#).unwrap();
    let bad = StyleSource::compile("node { width }");
    assert!(bad.is_err());
    // the failed source simply never joins the styler
    let s = Styler::new(good);
    let style = s.style(&data, PrimitiveId::node(1), 10.0);
    assert_eq!(icon_image(&style), Some("ok.svg"));
}

#[test]
fn test_runtime_type_mismatch_degrades_without_aborting() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[("name", "Plaza")]));
    let s = styler(
        r#"
        node { icon-image: "a.svg"; icon-opacity: sqrt(tag("name")); }
        node { text: tag("name"); }
        "#,
    );
    let style = s.style(&data, PrimitiveId::node(1), 10.0);
    // the failing declaration falls back to the default opacity
    let icon = style
        .elements
        .iter()
        .find_map(|e| match e {
            StyleElement::Icon(icon) => Some(icon),
            _ => None,
        })
        .unwrap();
    assert_eq!(icon.opacity, 1.0);
    // the sibling rule still applied
    assert!(style
        .elements
        .iter()
        .any(|e| matches!(e, StyleElement::Text(t) if t.text == "Plaza")));
}

#[test]
fn test_zoom_restricted_rules_partition_styles() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[("place", "city")]));
    let s = styler(
        r#"
        node[place=city] { icon-image: "dot.svg"; }
        node[place=city]|z10- { icon-image: "detailed.svg"; }
        "#,
    );
    let z10up = Range::zoom(Some(10), None);
    let zoomed_in = s.style(&data, PrimitiveId::node(1), z10up.upper / 2.0);
    let zoomed_out = s.style(&data, PrimitiveId::node(1), z10up.upper * 2.0);
    assert_eq!(icon_image(&zoomed_in), Some("detailed.svg"));
    assert_eq!(icon_image(&zoomed_out), Some("dot.svg"));
}

#[test]
fn test_idempotence_with_and_without_cache() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[("highway", "stop")]));
    let s = styler(
        r#"
        node[highway=stop] { icon-image: "a.svg"; width: 2 + 1; set .sign; }
        node.sign { text: "stop"; }
        "#,
    );
    let id = PrimitiveId::node(1);
    let warm1 = s.style(&data, id, 10.0);
    let warm2 = s.style(&data, id, 10.0);
    assert!(Arc::ptr_eq(&warm1, &warm2));
    s.invalidate();
    let cold = s.style(&data, id, 10.0);
    assert_eq!(*warm1, *cold);
}

#[test]
fn test_set_class_crosses_sources_in_pass_order() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[("highway", "stop")]));
    let mut s = styler("node[highway=stop] { set .sign; }");
    s.add_source(StyleSource::compile(r#"node.sign { icon-image: "sign.svg"; }"#).unwrap());
    let style = s.style(&data, PrimitiveId::node(1), 10.0);
    assert_eq!(icon_image(&style), Some("sign.svg"));
}

#[test]
fn test_layers_produce_independent_elements() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[]));
    data.add_node(node(2, 1.0, 0.0, &[]));
    data.add_way(way(10, vec![1, 2], &[("highway", "primary")]));
    let s = styler(
        r#"
        way[highway=primary]::casing { width: 6; color: #000000; z-index: -1; }
        way[highway=primary] { width: 4; color: #ffcc00; }
        "#,
    );
    let style = s.style(&data, PrimitiveId::way(10), 10.0);
    let widths: Vec<f64> = style
        .elements
        .iter()
        .filter_map(|e| match e {
            StyleElement::Line(line) => Some(line.width),
            _ => None,
        })
        .collect();
    // casing below the fill line
    assert_eq!(widths, vec![6.0, 4.0]);
}

#[test]
fn test_icon_rotation_from_way_heading() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[]));
    data.add_node(node(2, 0.0, 1.0, &[("highway", "crossing")]));
    data.add_node(node(3, 0.0, 2.0, &[]));
    data.add_way(way(10, vec![1, 2, 3], &[("highway", "residential")]));
    let s = styler(r#"node[highway=crossing] { icon-image: "x.svg"; icon-rotation: way; }"#);
    let style = s.style(&data, PrimitiveId::node(2), 10.0);
    // the way runs due north through the node
    assert_eq!(icon_rotation(&style), Some(0.0));
}

#[test]
fn test_icon_rotation_degree_sign_suffix() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[("highway", "stop")]));
    let s = styler(r#"node[highway=stop] { icon-image: "x.svg"; icon-rotation: 22.5°; }"#);
    let style = s.style(&data, PrimitiveId::node(1), 10.0);
    let rotation = icon_rotation(&style).unwrap();
    assert!((rotation - 22.5_f64.to_radians()).abs() < 1e-9);
}

#[test]
fn test_ambiguous_heading_falls_back_to_no_rotation() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[]));
    data.add_node(node(2, 1.0, 0.0, &[("highway", "crossing")]));
    data.add_node(node(3, 2.0, 0.0, &[]));
    data.add_node(node(4, 1.0, 1.0, &[]));
    data.add_way(way(10, vec![1, 2, 3], &[("highway", "residential")]));
    data.add_way(way(11, vec![2, 4], &[("highway", "residential")]));
    let s = styler(r#"node[highway=crossing] { icon-image: "x.svg"; icon-rotation: way; }"#);
    let style = s.style(&data, PrimitiveId::node(2), 10.0);
    // two outgoing segments: heading is null, rotation stays at the default
    assert_eq!(icon_rotation(&style), Some(0.0));
}

#[test]
fn test_heading_filters_parents_through_the_matched_selector() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[]));
    data.add_node(node(2, 1.0, 0.0, &[("railway", "level_crossing")]));
    data.add_node(node(3, 2.0, 0.0, &[]));
    data.add_node(node(4, 1.0, 1.0, &[]));
    // an east-west road and a south-north railway cross at node 2
    data.add_way(way(10, vec![1, 2, 3], &[("highway", "residential")]));
    data.add_way(way(11, vec![2, 4], &[("railway", "rail")]));
    let s = styler(
        r#"
        way[railway] > node[railway=level_crossing] {
            icon-image: "crossing.svg";
            icon-rotation: way;
        }
        "#,
    );
    let style = s.style(&data, PrimitiveId::node(2), 10.0);
    // only the railway counts, so the heading is unambiguous: due north
    assert_eq!(icon_rotation(&style), Some(0.0));
}

#[test]
fn test_neighbor_policy_is_explicit_per_combinator() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[]));
    data.add_way(way(10, vec![1, 2], &[("name", "First")]));
    data.add_way(way(11, vec![3, 1], &[("name", "Second")]));
    let source = r#"way[name] > node { text: index(); icon-image: "dot.svg"; }"#;
    let text = |style: &ComputedStyle| {
        style.elements.iter().find_map(|e| match e {
            StyleElement::Text(t) => Some(t.text.clone()),
            _ => None,
        })
    };

    // default policy: the first satisfying parent in dataset order is bound
    let first = Styler::new(StyleSource::compile(source).unwrap());
    let style = first.style(&data, PrimitiveId::node(1), 10.0);
    assert_eq!(text(&style), Some("1".into()));

    // unanimity required: two satisfying parents leave no binding, so
    // index() is null and the label is dropped, while the rule still fires
    let policies = CombinatorPolicies {
        child: NeighborPolicy::RequireUnanimous,
        ..CombinatorPolicies::default()
    };
    let unanimous = Styler::new(StyleSource::compile_with_policies(source, policies).unwrap());
    let style = unanimous.style(&data, PrimitiveId::node(1), 10.0);
    assert_eq!(text(&style), None);
    assert_eq!(icon_image(&style), Some("dot.svg"));
}

#[test]
fn test_relation_member_context() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[]));
    data.add_node(node(2, 1.0, 0.0, &[]));
    data.add_way(way(10, vec![1, 2], &[]));
    data.add_relation(Relation {
        id: 20,
        members: vec![Member { role: "route".to_string(), member: PrimitiveId::way(10) }],
        tags: [("type".to_string(), "route".to_string())].into_iter().collect(),
    });
    let s = styler(
        r#"
        relation[type=route] > way { text: concat(role(), "/", index()); width: 1; }
        "#,
    );
    let style = s.style(&data, PrimitiveId::way(10), 10.0);
    let text = style
        .elements
        .iter()
        .find_map(|e| match e {
            StyleElement::Text(t) => Some(t.text.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(text, "route/1");
}

#[test]
fn test_globals_feed_rule_expressions() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[]));
    data.add_node(node(2, 1.0, 0.0, &[]));
    data.add_way(way(10, vec![1, 2], &[("highway", "primary")]));
    let s = styler(
        r#"
        globals { major-width: 4; }
        way[highway=primary] { width: prop("major-width", "globals"); }
        "#,
    );
    let style = s.style(&data, PrimitiveId::way(10), 10.0);
    assert!(style
        .elements
        .iter()
        .any(|e| matches!(e, StyleElement::Line(l) if l.width == 4.0)));
}

#[test]
fn test_dataset_generation_invalidates_stable_styles() {
    let mut data = DataSet::new();
    data.add_node(node(1, 0.0, 0.0, &[("highway", "stop")]));
    let s = styler(r#"node[highway=stop] { text: tag("highway"); icon-image: "a.svg"; }"#);
    let id = PrimitiveId::node(1);
    let before = s.style(&data, id, 10.0);
    assert!(before
        .elements
        .iter()
        .any(|e| matches!(e, StyleElement::Text(t) if t.text == "stop")));

    data.set_tag(id, "highway", "give_way");
    let after = s.style(&data, id, 10.0);
    assert!(after.elements.is_empty());
}

#[test]
fn test_comments_and_units_parse() {
    let source = r#"
        /* casing first */
        way|z12- {
            width: 50%; // of something
            icon-rotation: 90deg;
        }
    "#;
    assert!(StyleSource::compile(source).is_ok());
}
