//! Compiled style source
//!
//! One stylesheet after compilation: rules in source order plus the
//! `globals` block evaluated down to a cascade. A style source is immutable
//! and can be shared freely across evaluator threads.
//!
//! `apply` is the heart of the cascade: rules run in source order against a
//! growing [`MultiCascade`], so `set .class` side effects are visible to
//! later rules in the same pass, and the last matching declaration for a
//! key wins.

use mapcss_osm::{DataSet, PrimitiveId};

use crate::cascade::{Cascade, MultiCascade, DEFAULT_LAYER, WILDCARD_LAYER};
use crate::environment::Environment;
use crate::error::ParseError;
use crate::expr::Cacheability;
use crate::parser::{self, CombinatorPolicies, Instruction, Rule};
use crate::selector::{Base, Selector};
use crate::value::Value;

#[derive(Debug)]
pub struct StyleSource {
    rules: Vec<Rule>,
    globals: Cascade,
}

/// Match context carried from selector matching into declaration
/// evaluation.
#[derive(Default)]
struct MatchContext {
    parent: Option<PrimitiveId>,
    parent_selector: Option<Selector>,
    index: Option<usize>,
    count: Option<usize>,
    role: Option<String>,
}

impl StyleSource {
    /// Compiles a stylesheet. The `globals` block is evaluated once, here.
    pub fn compile(source: &str) -> Result<StyleSource, ParseError> {
        StyleSource::compile_with_policies(source, CombinatorPolicies::default())
    }

    pub fn compile_with_policies(
        source: &str,
        policies: CombinatorPolicies,
    ) -> Result<StyleSource, ParseError> {
        let sheet = parser::parse_with_policies(source, policies)?;
        let mut globals = Cascade::new();
        for (name, expr) in &sheet.globals {
            let env = Environment::global().with_globals(&globals);
            let value = expr.eval(&env);
            globals.put_or_clear(name, value);
        }
        Ok(StyleSource { rules: sheet.rules, globals })
    }

    pub fn globals(&self) -> &Cascade {
        &self.globals
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    /// Runs every rule against the primitive, merging matched declarations
    /// into `mc`. Returns the least cacheable class among the expressions
    /// evaluated.
    ///
    /// `mc.range` narrows as a side effect: a rule that matched shrinks it
    /// to the rule's zoom range, and a rule that failed *only* on zoom
    /// shrinks it away from that rule's range, so the caller knows the
    /// scale interval over which this exact result holds.
    pub fn apply(
        &self,
        data: &DataSet,
        id: PrimitiveId,
        scale: f64,
        mc: &mut MultiCascade,
    ) -> Cacheability {
        let mut cacheability = Cacheability::Immutable;
        for rule in &self.rules {
            if rule.selector.base == Base::Canvas {
                continue;
            }
            let ctx = {
                let mut env = Environment::new(data, id)
                    .with_globals(&self.globals)
                    .with_cascades(mc);
                if rule.selector.matches(&mut env) {
                    Some(MatchContext {
                        parent: env.parent,
                        parent_selector: env.parent_selector.cloned(),
                        index: env.index,
                        count: env.count,
                        role: env.role.map(str::to_string),
                    })
                } else {
                    None
                }
            };
            let Some(ctx) = ctx else {
                continue;
            };
            let rule_range = rule.selector.range();
            if !rule_range.contains(scale) {
                // matched except for zoom: the result is only valid up to
                // where this rule starts applying
                mc.range = mc.range.reduce_around(scale, rule_range);
                continue;
            }
            mc.range = mc.range.intersect(rule_range);
            cacheability =
                cacheability.combine(self.run_rule(data, id, rule, &ctx, mc));
        }
        cacheability
    }

    fn run_rule(
        &self,
        data: &DataSet,
        id: PrimitiveId,
        rule: &Rule,
        ctx: &MatchContext,
        mc: &mut MultiCascade,
    ) -> Cacheability {
        let mut cacheability = Cacheability::Immutable;
        for instruction in &rule.instructions {
            match instruction {
                Instruction::SetClass(name) => {
                    mc.get_or_create(DEFAULT_LAYER).put(name.clone(), Value::Bool(true));
                }
                Instruction::Assign { property, expr } => {
                    cacheability = cacheability.combine(expr.cacheability());
                    let targets: Vec<String> = if rule.selector.subpart == WILDCARD_LAYER {
                        let mut names = mc.layer_names();
                        names.push(WILDCARD_LAYER.to_string());
                        names
                    } else {
                        vec![rule.selector.subpart.clone()]
                    };
                    for layer in targets {
                        let value = {
                            let mut env = Environment::new(data, id)
                                .with_globals(&self.globals)
                                .with_cascades(mc)
                                .with_layer(&layer);
                            env.parent = ctx.parent;
                            env.parent_selector = ctx.parent_selector.as_ref();
                            env.index = ctx.index;
                            env.count = ctx.count;
                            env.role = ctx.role.as_deref();
                            expr.eval(&env)
                        };
                        mc.get_or_create(&layer).put_or_clear(property, value);
                    }
                }
            }
        }
        cacheability
    }

    /// Evaluates the `canvas` rules into a single cascade, without a
    /// primitive. The map background is styled from this.
    pub fn apply_canvas(&self, canvas: &mut Cascade) {
        for rule in &self.rules {
            if rule.selector.base != Base::Canvas {
                continue;
            }
            for instruction in &rule.instructions {
                if let Instruction::Assign { property, expr } = instruction {
                    let env = Environment::global().with_globals(&self.globals);
                    let value = expr.eval(&env);
                    canvas.put_or_clear(property, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::range::Range;
    use mapcss_osm::{EastNorth, Node};

    fn data_with_node(tags: &[(&str, &str)]) -> DataSet {
        let mut data = DataSet::new();
        data.add_node(Node {
            id: 1,
            position: EastNorth::new(0.0, 0.0),
            tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        });
        data
    }

    fn apply(source: &str, data: &DataSet, scale: f64) -> MultiCascade {
        let compiled = StyleSource::compile(source).unwrap();
        let mut mc = MultiCascade::new();
        compiled.apply(data, PrimitiveId::node(1), scale, &mut mc);
        mc
    }

    #[test]
    fn test_later_rule_wins() {
        let data = data_with_node(&[("highway", "traffic_signals"), ("direction", "forward")]);
        let mc = apply(
            "node[highway=traffic_signals] { icon-image: \"a.svg\"; } \
             node[highway=traffic_signals][direction=forward] { icon-image: \"b.svg\"; }",
            &data,
            10.0,
        );
        assert_eq!(mc.get("default").unwrap().get_string("icon-image"), Some("b.svg".into()));
    }

    #[test]
    fn test_set_class_is_visible_to_later_rules() {
        let data = data_with_node(&[("highway", "stop")]);
        let mc = apply(
            "node[highway=stop] { set .sign; } node.sign { icon-image: \"sign.svg\"; }",
            &data,
            10.0,
        );
        assert_eq!(
            mc.get("default").unwrap().get_string("icon-image"),
            Some("sign.svg".into())
        );
    }

    #[test]
    fn test_class_is_not_retroactive() {
        let data = data_with_node(&[("highway", "stop")]);
        let mc = apply(
            "node.sign { icon-image: \"early.svg\"; } node[highway=stop] { set .sign; }",
            &data,
            10.0,
        );
        assert_eq!(mc.get("default").unwrap().get_string("icon-image"), None);
    }

    #[test]
    fn test_zoom_miss_narrows_range() {
        let data = data_with_node(&[("highway", "stop")]);
        // zoomed far out: scale large, above the rule's upper bound
        let zoomed_out_scale = Range::zoom(Some(14), None).upper * 2.0;
        let mc = apply(
            "node[highway=stop]|z14- { icon-image: \"a.svg\"; }",
            &data,
            zoomed_out_scale,
        );
        assert_eq!(mc.get("default"), None);
        // the empty result is only valid while the rule stays inactive
        assert_eq!(mc.range.lower, Range::zoom(Some(14), None).upper);
    }

    #[test]
    fn test_zoom_match_narrows_to_rule_range() {
        let data = data_with_node(&[("highway", "stop")]);
        let rule_range = Range::zoom(Some(10), Some(14));
        let inside = (rule_range.lower + rule_range.upper) / 2.0;
        let mc = apply("node[highway=stop]|z10-14 { icon-image: \"a.svg\"; }", &data, inside);
        assert!(mc.get("default").is_some());
        assert_eq!(mc.range, rule_range);
    }

    #[test]
    fn test_globals_are_visible_via_prop() {
        let data = data_with_node(&[]);
        let mc = apply(
            "globals { casing: 4; } node { width: prop(\"casing\", \"globals\") + 1; }",
            &data,
            10.0,
        );
        assert_eq!(mc.get("default").unwrap().get_number("width", 0.0), 5.0);
    }

    #[test]
    fn test_wildcard_subpart_applies_to_existing_layers() {
        let data = data_with_node(&[]);
        let mc = apply(
            "node::casing { width: 4; } node::* { opacity: 0.5; }",
            &data,
            10.0,
        );
        assert_eq!(mc.get("casing").unwrap().get_number("opacity", 1.0), 0.5);
    }

    #[test]
    fn test_none_assignment_clears_property() {
        let data = data_with_node(&[("highway", "stop")]);
        let mc = apply(
            "node { icon-image: \"a.svg\"; } node[highway=stop] { icon-image: none; }",
            &data,
            10.0,
        );
        assert_eq!(mc.get("default").unwrap().get_string("icon-image"), None);
    }

    #[test]
    fn test_canvas_rules() {
        let compiled =
            StyleSource::compile("canvas { fill-color: #112233; } node { width: 1; }").unwrap();
        let mut canvas = Cascade::new();
        compiled.apply_canvas(&mut canvas);
        assert_eq!(
            canvas.get_color("fill-color", Color::rgb(0.0, 0.0, 0.0)),
            Color::from_hex("#112233").unwrap()
        );
    }

    #[test]
    fn test_volatile_expression_reported() {
        let data = data_with_node(&[]);
        let compiled = StyleSource::compile("node { width: random(); }").unwrap();
        let mut mc = MultiCascade::new();
        let c = compiled.apply(&data, PrimitiveId::node(1), 10.0, &mut mc);
        assert_eq!(c, Cacheability::Volatile);
    }

    #[test]
    fn test_broken_expression_does_not_abort_other_rules() {
        let data = data_with_node(&[("name", "x")]);
        // sqrt of a non-numeric string fails at evaluation and degrades to null
        let mc = apply(
            "node { width: sqrt(tag(\"name\")); } node { icon-image: \"ok.svg\"; }",
            &data,
            10.0,
        );
        let cascade = mc.get("default").unwrap();
        assert!(!cascade.contains_key("width"));
        assert_eq!(cascade.get_string("icon-image"), Some("ok.svg".into()));
    }
}
