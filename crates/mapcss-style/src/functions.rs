//! Builtin function registry
//!
//! Every function callable from a stylesheet expression lives in a static
//! registry; the parser resolves names at compile time, so an unknown
//! function is a parse error, not a runtime one. Arithmetic and comparison
//! operators desugar to registry entries too.
//!
//! Each builtin declares its cacheability: pure functions of their
//! arguments are immutable, anything reading the dataset or the match
//! context is stable, and `random()` is volatile.

use std::collections::HashMap;
use std::sync::LazyLock;

use mapcss_osm::{OsmType, PrimitiveId};
use rand::random;

use crate::color::Color;
use crate::environment::Environment;
use crate::error::EvalError;
use crate::expr::Cacheability;
use crate::value::Value;

type Args<'v> = &'v [Option<Value>];
type EvalFn = fn(&Environment, Args) -> Result<Option<Value>, EvalError>;

/// One registered builtin.
pub struct Builtin {
    pub name: &'static str,
    pub cacheability: Cacheability,
    pub min_args: usize,
    /// `None` means variadic.
    pub max_args: Option<usize>,
    pub eval: EvalFn,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

impl Builtin {
    /// Human-readable arity for error messages.
    pub fn arity(&self) -> String {
        match (self.min_args, self.max_args) {
            (min, Some(max)) if min == max => format!("{min}"),
            (min, Some(max)) => format!("{min} to {max}"),
            (min, None) => format!("at least {min}"),
        }
    }

    pub fn accepts(&self, argc: usize) -> bool {
        argc >= self.min_args && self.max_args.map(|m| argc <= m).unwrap_or(true)
    }
}

/// Looks up a builtin by name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    REGISTRY.get(name)
}

fn arg<'v>(function: &'static str, args: Args<'v>, i: usize) -> Result<&'v Value, EvalError> {
    match args.get(i) {
        Some(Some(v)) => Ok(v),
        _ => Err(EvalError::MissingArgument { function, index: i }),
    }
}

fn number(function: &'static str, args: Args, i: usize) -> Result<f64, EvalError> {
    arg(function, args, i)?
        .as_number()
        .ok_or(EvalError::TypeMismatch { function, expected: "a number" })
}

fn text(function: &'static str, args: Args, i: usize) -> Result<String, EvalError> {
    Ok(arg(function, args, i)?.as_display_string())
}

fn color(function: &'static str, args: Args, i: usize) -> Result<Color, EvalError> {
    arg(function, args, i)?
        .as_color()
        .ok_or(EvalError::TypeMismatch { function, expected: "a color" })
}

fn compile_regex(pattern: &str) -> Result<regex::Regex, EvalError> {
    regex::Regex::new(pattern).map_err(|e| EvalError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn num(v: f64) -> Result<Option<Value>, EvalError> {
    Ok(Some(Value::Number(v)))
}

fn fold_numbers(
    function: &'static str,
    args: Args,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Option<Value>, EvalError> {
    let mut acc = number(function, args, 0)?;
    for i in 1..args.len() {
        acc = f(acc, number(function, args, i)?);
    }
    num(acc)
}

/// n-ary min/max also accept a single list argument.
fn spread_numbers(function: &'static str, args: Args) -> Result<Vec<f64>, EvalError> {
    let values: Vec<Value> = if args.len() == 1 {
        arg(function, args, 0)?.as_list()
    } else {
        (0..args.len())
            .map(|i| arg(function, args, i).map(Value::clone))
            .collect::<Result<_, _>>()?
    };
    values
        .iter()
        .map(|v| v.as_number().ok_or(EvalError::TypeMismatch { function, expected: "a number" }))
        .collect()
}

fn math1(function: &'static str, args: Args, f: fn(f64) -> f64) -> Result<Option<Value>, EvalError> {
    num(f(number(function, args, 0)?))
}

/// Compares two values: numerically if both coerce to numbers, otherwise
/// by display string.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_display_string() == b.as_display_string(),
    }
}

/// Selector-filtered parent ways of the current node. When the match bound
/// a parent selector, only ways satisfying it count.
fn styled_parent_ways<'a>(env: &Environment<'a>) -> Vec<&'a mapcss_osm::Way> {
    let (Some(data), Some(id)) = (env.data, env.primitive) else {
        return Vec::new();
    };
    if id.kind != OsmType::Node {
        return Vec::new();
    }
    data.parent_ways(id.id)
        .into_iter()
        .filter(|way| match env.parent_selector {
            None => true,
            Some(selector) => {
                let mut way_env = env.clone();
                way_env.primitive = Some(PrimitiveId::way(way.id));
                way_env.parent = None;
                way_env.parent_selector = None;
                selector.matches(&mut way_env)
            }
        })
        .collect()
}

/// Heading of the way passing through the current node, in radians.
///
/// Requires unanimity: at most one incoming and one outgoing segment across
/// all candidate parent ways, otherwise the rotation is ambiguous and the
/// result is null.
fn eval_heading(env: &Environment, args: Args) -> Result<Option<Value>, EvalError> {
    let offset = if args.is_empty() { 0.0 } else { number("heading", args, 0)? };
    let (Some(data), Some(node)) = (env.data, env.node()) else {
        return Ok(None);
    };
    let mut incoming: Vec<u64> = Vec::new();
    let mut outgoing: Vec<u64> = Vec::new();
    for way in styled_parent_ways(env) {
        for (a, b) in data.node_pairs(way.id) {
            if b == node.id {
                incoming.push(a);
            }
            if a == node.id {
                outgoing.push(b);
            }
        }
    }
    if incoming.len() > 1 || outgoing.len() > 1 {
        return Ok(None);
    }
    let position = |id: u64| data.node(id).map(|n| n.position);
    let heading = match (incoming.first(), outgoing.first()) {
        (Some(&p), Some(&n)) => match (position(p), position(n)) {
            (Some(from), Some(to)) => from.heading(to, offset),
            _ => return Ok(None),
        },
        (Some(&p), None) => match position(p) {
            Some(from) => from.heading(node.position, offset),
            None => return Ok(None),
        },
        (None, Some(&n)) => match position(n) {
            Some(to) => node.position.heading(to, offset),
            None => return Ok(None),
        },
        (None, None) => return Ok(None),
    };
    num(heading)
}

/// Area of a closed way by the shoelace formula, in squared map units.
fn eval_areasize(env: &Environment, _args: Args) -> Result<Option<Value>, EvalError> {
    let (Some(data), Some(way)) = (env.data, env.way()) else {
        return Ok(None);
    };
    if !way.is_closed() {
        return Ok(None);
    }
    let nodes = data.child_nodes(way.id);
    let mut twice_area = 0.0;
    for pair in nodes.windows(2) {
        let (a, b) = (pair[0].position, pair[1].position);
        twice_area += a.east * b.north - b.east * a.north;
    }
    num(twice_area.abs() / 2.0)
}

/// Cascade the `prop` family reads from: the current layer by default, a
/// named layer on request, or the compiled `globals` block under the name
/// `globals`.
fn prop_cascade<'a>(env: &'a Environment, args: Args) -> Option<&'a crate::cascade::Cascade> {
    let layer = match args.get(1) {
        Some(Some(v)) => v.as_display_string(),
        _ => env.layer.to_string(),
    };
    if layer == "globals" {
        return env.globals;
    }
    env.cascades?.get(&layer)
}

static REGISTRY: LazyLock<HashMap<&'static str, Builtin>> =
    LazyLock::new(|| builtins().into_iter().map(|b| (b.name, b)).collect());

fn builtins() -> Vec<Builtin> {
    use Cacheability::{Immutable, Stable, Volatile};
    let b = |name, cacheability, min_args, max_args, eval| Builtin {
        name,
        cacheability,
        min_args,
        max_args,
        eval,
    };
    vec![
        b("eval", Immutable, 1, Some(1), |_, args| Ok(args[0].clone())),
        // arithmetic
        b("plus", Immutable, 1, None, |_, args| fold_numbers("plus", args, |a, c| a + c)),
        b("minus", Immutable, 1, None, |_, args| {
            if args.len() == 1 {
                num(-number("minus", args, 0)?)
            } else {
                fold_numbers("minus", args, |a, c| a - c)
            }
        }),
        b("times", Immutable, 1, None, |_, args| fold_numbers("times", args, |a, c| a * c)),
        b("divided_by", Immutable, 2, None, |_, args| {
            fold_numbers("divided_by", args, |a, c| a / c)
        }),
        b("mod", Immutable, 2, Some(2), |_, args| {
            num(number("mod", args, 0)? % number("mod", args, 1)?)
        }),
        b("min", Immutable, 1, None, |_, args| {
            num(spread_numbers("min", args)?.into_iter().fold(f64::INFINITY, f64::min))
        }),
        b("max", Immutable, 1, None, |_, args| {
            num(spread_numbers("max", args)?.into_iter().fold(f64::NEG_INFINITY, f64::max))
        }),
        b("abs", Immutable, 1, Some(1), |_, args| math1("abs", args, f64::abs)),
        b("floor", Immutable, 1, Some(1), |_, args| math1("floor", args, f64::floor)),
        b("ceil", Immutable, 1, Some(1), |_, args| math1("ceil", args, f64::ceil)),
        b("round", Immutable, 1, Some(1), |_, args| math1("round", args, f64::round)),
        b("signum", Immutable, 1, Some(1), |_, args| math1("signum", args, f64::signum)),
        b("sqrt", Immutable, 1, Some(1), |_, args| math1("sqrt", args, f64::sqrt)),
        b("exp", Immutable, 1, Some(1), |_, args| math1("exp", args, f64::exp)),
        b("log", Immutable, 1, Some(1), |_, args| math1("log", args, f64::ln)),
        b("sin", Immutable, 1, Some(1), |_, args| math1("sin", args, f64::sin)),
        b("cos", Immutable, 1, Some(1), |_, args| math1("cos", args, f64::cos)),
        b("tan", Immutable, 1, Some(1), |_, args| math1("tan", args, f64::tan)),
        b("asin", Immutable, 1, Some(1), |_, args| math1("asin", args, f64::asin)),
        b("acos", Immutable, 1, Some(1), |_, args| math1("acos", args, f64::acos)),
        b("atan", Immutable, 1, Some(1), |_, args| math1("atan", args, f64::atan)),
        b("atan2", Immutable, 2, Some(2), |_, args| {
            num(number("atan2", args, 0)?.atan2(number("atan2", args, 1)?))
        }),
        b("degree_to_radians", Immutable, 1, Some(1), |_, args| {
            num(number("degree_to_radians", args, 0)?.to_radians())
        }),
        b("cardinal_to_radians", Immutable, 1, Some(1), |_, args| {
            Ok(cardinal_to_radians(&text("cardinal_to_radians", args, 0)?).map(Value::Number))
        }),
        b("random", Volatile, 0, Some(0), |_, _| num(random::<f64>())),
        // comparison
        b("less", Immutable, 2, Some(2), |_, args| {
            Ok(Some(Value::Bool(number("less", args, 0)? < number("less", args, 1)?)))
        }),
        b("less_equal", Immutable, 2, Some(2), |_, args| {
            Ok(Some(Value::Bool(number("less_equal", args, 0)? <= number("less_equal", args, 1)?)))
        }),
        b("greater", Immutable, 2, Some(2), |_, args| {
            Ok(Some(Value::Bool(number("greater", args, 0)? > number("greater", args, 1)?)))
        }),
        b("greater_equal", Immutable, 2, Some(2), |_, args| {
            Ok(Some(Value::Bool(
                number("greater_equal", args, 0)? >= number("greater_equal", args, 1)?,
            )))
        }),
        b("equal", Immutable, 2, Some(2), |_, args| {
            Ok(Some(Value::Bool(values_equal(arg("equal", args, 0)?, arg("equal", args, 1)?))))
        }),
        b("not_equal", Immutable, 2, Some(2), |_, args| {
            Ok(Some(Value::Bool(!values_equal(
                arg("not_equal", args, 0)?,
                arg("not_equal", args, 1)?,
            ))))
        }),
        // conversion
        b("int", Immutable, 1, Some(1), |_, args| num(number("int", args, 0)?.trunc())),
        b("num", Immutable, 1, Some(1), |_, args| {
            Ok(arg("num", args, 0)?.as_number().map(Value::Number))
        }),
        b("str", Immutable, 1, Some(1), |_, args| {
            Ok(Some(Value::String(text("str", args, 0)?)))
        }),
        b("any", Immutable, 1, None, |_, args| {
            Ok(args.iter().find_map(|a| a.clone()))
        }),
        b("to_boolean", Immutable, 1, Some(1), |_, args| {
            Ok(arg("to_boolean", args, 0)?.as_bool().map(Value::Bool))
        }),
        b("to_float", Immutable, 1, Some(1), |_, args| {
            Ok(arg("to_float", args, 0)?.as_number().map(Value::Number))
        }),
        b("to_int", Immutable, 1, Some(1), |_, args| {
            num(number("to_int", args, 0)?.trunc())
        }),
        b("is_null", Immutable, 1, Some(1), |_, args| {
            Ok(Some(Value::Bool(args.first().map_or(true, Option::is_none))))
        }),
        // strings
        b("concat", Immutable, 1, None, |_, args| {
            let s: String =
                args.iter().flatten().map(Value::as_display_string).collect();
            Ok(Some(Value::String(s)))
        }),
        b("join", Immutable, 2, None, |_, args| {
            let sep = text("join", args, 0)?;
            let parts: Vec<String> = if args.len() == 2 {
                arg("join", args, 1)?.as_list().iter().map(Value::as_display_string).collect()
            } else {
                args[1..].iter().flatten().map(Value::as_display_string).collect()
            };
            Ok(Some(Value::String(parts.join(&sep))))
        }),
        b("split", Immutable, 2, Some(2), |_, args| {
            let sep = text("split", args, 0)?;
            let s = text("split", args, 1)?;
            Ok(Some(Value::List(
                s.split(&sep).map(|p| Value::String(p.to_string())).collect(),
            )))
        }),
        b("upper", Immutable, 1, Some(1), |_, args| {
            Ok(Some(Value::String(text("upper", args, 0)?.to_uppercase())))
        }),
        b("lower", Immutable, 1, Some(1), |_, args| {
            Ok(Some(Value::String(text("lower", args, 0)?.to_lowercase())))
        }),
        b("trim", Immutable, 1, Some(1), |_, args| {
            Ok(Some(Value::String(text("trim", args, 0)?.trim().to_string())))
        }),
        b("title", Immutable, 1, Some(1), |_, args| {
            let s = text("title", args, 0)?;
            let mut out = String::with_capacity(s.len());
            let mut at_word_start = true;
            for c in s.chars() {
                if at_word_start {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                at_word_start = c.is_whitespace();
            }
            Ok(Some(Value::String(out)))
        }),
        b("length", Immutable, 1, Some(1), |_, args| match arg("length", args, 0)? {
            Value::List(l) => num(l.len() as f64),
            other => num(other.as_display_string().chars().count() as f64),
        }),
        b("replace", Immutable, 3, Some(3), |_, args| {
            let s = text("replace", args, 0)?;
            let from = text("replace", args, 1)?;
            let to = text("replace", args, 2)?;
            Ok(Some(Value::String(s.replace(&from, &to))))
        }),
        b("substring", Immutable, 2, Some(3), |_, args| {
            let s = text("substring", args, 0)?;
            let chars: Vec<char> = s.chars().collect();
            let begin = (number("substring", args, 1)?.trunc().max(0.0) as usize).min(chars.len());
            let end = if args.len() > 2 {
                (number("substring", args, 2)?.trunc().max(0.0) as usize)
                    .clamp(begin, chars.len())
            } else {
                chars.len()
            };
            Ok(Some(Value::String(chars[begin..end].iter().collect())))
        }),
        b("regexp_test", Immutable, 2, Some(2), |_, args| {
            let re = compile_regex(&text("regexp_test", args, 0)?)?;
            Ok(Some(Value::Bool(re.is_match(&text("regexp_test", args, 1)?))))
        }),
        b("regexp_match", Immutable, 2, Some(2), |_, args| {
            let re = compile_regex(&text("regexp_match", args, 0)?)?;
            let s = text("regexp_match", args, 1)?;
            Ok(re.captures(&s).map(|caps| {
                Value::List(
                    caps.iter()
                        .map(|g| {
                            Value::String(g.map(|m| m.as_str().to_string()).unwrap_or_default())
                        })
                        .collect(),
                )
            }))
        }),
        // lists
        b("list", Immutable, 0, None, |_, args| {
            Ok(Some(Value::List(args.iter().flatten().cloned().collect())))
        }),
        b("count", Immutable, 1, Some(1), |_, args| {
            num(arg("count", args, 0)?.as_list().len() as f64)
        }),
        b("get", Immutable, 2, Some(2), |_, args| {
            let list = arg("get", args, 0)?.as_list();
            let index = number("get", args, 1)?;
            if index < 0.0 {
                return Ok(None);
            }
            Ok(list.get(index as usize).cloned())
        }),
        b("sort_list", Immutable, 1, Some(1), |_, args| {
            let mut list = arg("sort_list", args, 0)?.as_list();
            if list.iter().all(|v| v.as_number().is_some()) {
                list.sort_by(|a, b| {
                    a.as_number()
                        .partial_cmp(&b.as_number())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            } else {
                list.sort_by_key(Value::as_display_string);
            }
            Ok(Some(Value::List(list)))
        }),
        b("uniq_list", Immutable, 1, Some(1), |_, args| {
            let mut out: Vec<Value> = Vec::new();
            for v in arg("uniq_list", args, 0)?.as_list() {
                if !out.iter().any(|u| values_equal(u, &v)) {
                    out.push(v);
                }
            }
            Ok(Some(Value::List(out)))
        }),
        b("join_list", Immutable, 2, Some(2), |_, args| {
            let sep = text("join_list", args, 0)?;
            let parts: Vec<String> =
                arg("join_list", args, 1)?.as_list().iter().map(Value::as_display_string).collect();
            Ok(Some(Value::String(parts.join(&sep))))
        }),
        // colors
        b("rgb", Immutable, 3, Some(3), |_, args| {
            Ok(Some(Value::Color(Color::rgb(
                number("rgb", args, 0)? as f32,
                number("rgb", args, 1)? as f32,
                number("rgb", args, 2)? as f32,
            ))))
        }),
        b("rgba", Immutable, 4, Some(4), |_, args| {
            Ok(Some(Value::Color(Color::rgba(
                number("rgba", args, 0)? as f32,
                number("rgba", args, 1)? as f32,
                number("rgba", args, 2)? as f32,
                number("rgba", args, 3)? as f32,
            ))))
        }),
        b("hsb_color", Immutable, 3, Some(3), |_, args| {
            Ok(Some(Value::Color(Color::from_hsb(
                number("hsb_color", args, 0)? as f32,
                number("hsb_color", args, 1)? as f32,
                number("hsb_color", args, 2)? as f32,
            ))))
        }),
        b("html2color", Immutable, 1, Some(1), |_, args| {
            Ok(Color::parse(&text("html2color", args, 0)?).map(Value::Color))
        }),
        b("color2html", Immutable, 1, Some(1), |_, args| {
            Ok(Some(Value::String(color("color2html", args, 0)?.to_html())))
        }),
        b("red", Immutable, 1, Some(1), |_, args| num(color("red", args, 0)?.r as f64)),
        b("green", Immutable, 1, Some(1), |_, args| num(color("green", args, 0)?.g as f64)),
        b("blue", Immutable, 1, Some(1), |_, args| num(color("blue", args, 0)?.b as f64)),
        b("alpha", Immutable, 1, Some(1), |_, args| num(color("alpha", args, 0)?.a as f64)),
        // dataset and match context
        b("tag", Stable, 1, Some(1), |env, args| {
            Ok(env.tag(&text("tag", args, 0)?).map(|v| Value::String(v.to_string())))
        }),
        b("has_tag_key", Stable, 1, Some(1), |env, args| {
            Ok(Some(Value::Bool(env.tag(&text("has_tag_key", args, 0)?).is_some())))
        }),
        b("parent_tag", Stable, 1, Some(1), |env, args| {
            let key = text("parent_tag", args, 0)?;
            if let (Some(data), Some(parent)) = (env.data, env.parent) {
                return Ok(data.tag(parent, &key).map(|v| Value::String(v.to_string())));
            }
            // no parent bound: first referrer carrying the tag wins
            Ok(referrer_tag_values(env, &key).into_iter().next().map(Value::String))
        }),
        b("parent_tags", Stable, 1, Some(1), |env, args| {
            let key = text("parent_tags", args, 0)?;
            Ok(Some(Value::List(
                referrer_tag_values(env, &key).into_iter().map(Value::String).collect(),
            )))
        }),
        b("number_of_tags", Stable, 0, Some(0), |env, _| match (env.data, env.primitive) {
            (Some(data), Some(id)) => num(data.num_tags(id) as f64),
            _ => Ok(None),
        }),
        b("osm_id", Stable, 0, Some(0), |env, _| {
            Ok(env.primitive.map(|id| Value::Number(id.id as f64)))
        }),
        b("is_closed", Stable, 0, Some(0), |env, _| {
            Ok(env.way().map(|w| Value::Bool(w.is_closed())))
        }),
        b("waylength", Stable, 0, Some(0), |env, _| match (env.data, env.way()) {
            (Some(data), Some(way)) => num(data.way_length(way.id)),
            _ => Ok(None),
        }),
        b("areasize", Stable, 0, Some(0), eval_areasize),
        b("heading", Stable, 0, Some(1), eval_heading),
        b("index", Stable, 0, Some(0), |env, _| {
            Ok(env.index.map(|i| Value::Number((i + 1) as f64)))
        }),
        b("role", Stable, 0, Some(0), |env, _| {
            Ok(env.role.map(|r| Value::String(r.to_string())))
        }),
        b("global", Stable, 1, Some(1), |env, args| {
            let key = text("global", args, 0)?;
            Ok(env.globals.and_then(|g| g.get(&key)).cloned())
        }),
        b("prop", Stable, 1, Some(2), |env, args| {
            let key = text("prop", args, 0)?;
            Ok(prop_cascade(env, args).and_then(|c| c.get(&key)).cloned())
        }),
        b("is_prop_set", Stable, 1, Some(2), |env, args| {
            let key = text("is_prop_set", args, 0)?;
            Ok(Some(Value::Bool(
                prop_cascade(env, args).is_some_and(|c| c.contains_key(&key)),
            )))
        }),
    ]
}

/// Radians for a compass direction (16-point, long names for the four
/// cardinals), measured clockwise from north.
fn cardinal_to_radians(direction: &str) -> Option<f64> {
    const POINTS: [&str; 16] = [
        "n", "nne", "ne", "ene", "e", "ese", "se", "sse", "s", "ssw", "sw", "wsw", "w", "wnw",
        "nw", "nnw",
    ];
    let lowered = direction.to_lowercase();
    let short = match lowered.as_str() {
        "north" => "n",
        "east" => "e",
        "south" => "s",
        "west" => "w",
        other => other,
    };
    let i = POINTS.iter().position(|p| *p == short)?;
    Some(i as f64 * std::f64::consts::TAU / 16.0)
}

/// Tag values of the given key across all referrers, in referrer order,
/// deduplicated.
fn referrer_tag_values(env: &Environment, key: &str) -> Vec<String> {
    let (Some(data), Some(id)) = (env.data, env.primitive) else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    let mut push = |v: Option<&str>| {
        if let Some(v) = v {
            if !out.iter().any(|x| x == v) {
                out.push(v.to_string());
            }
        }
    };
    if id.kind == OsmType::Node {
        for way in data.parent_ways(id.id) {
            push(way.tags.get(key).map(String::as_str));
        }
    }
    for relation in data.parent_relations(id) {
        push(relation.tags.get(key).map(String::as_str));
    }
    out
}
