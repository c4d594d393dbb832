//! Compiled selectors
//!
//! A selector is the left-hand side of a rule: a base type test, tag and
//! class conditions, an optional zoom restriction and an optional
//! combinator link to a parent or sibling selector. Matching is existential
//! over neighbors: the first satisfying neighbor makes the link succeed.
//!
//! Zoom restrictions are deliberately not checked here. The evaluation
//! driver checks them separately so that it can narrow the cached validity
//! range when a rule fails only on zoom.

use mapcss_osm::{OsmType, PrimitiveId};
use regex::Regex;
use smallvec::SmallVec;

use crate::cascade::DEFAULT_LAYER;
use crate::environment::Environment;
use crate::range::Range;

/// The base type test at the start of a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    /// `*`, any primitive.
    Any,
    Node,
    Way,
    Relation,
    /// Closed ways, ways tagged `area=yes` and multipolygon relations.
    Area,
    /// The map background; matched once per style source, without a
    /// primitive.
    Canvas,
}

impl Base {
    pub fn from_str(s: &str) -> Option<Base> {
        Some(match s {
            "*" => Base::Any,
            "node" => Base::Node,
            "way" => Base::Way,
            "relation" => Base::Relation,
            "area" => Base::Area,
            "canvas" => Base::Canvas,
            _ => return None,
        })
    }

    fn matches(self, env: &Environment) -> bool {
        let Some(kind) = env.osm_type() else {
            return self == Base::Canvas;
        };
        match self {
            Base::Any => true,
            Base::Node => kind == OsmType::Node,
            Base::Way => kind == OsmType::Way,
            Base::Relation => kind == OsmType::Relation,
            Base::Canvas => false,
            Base::Area => match kind {
                OsmType::Way => {
                    env.way().is_some_and(|w| w.is_closed())
                        || env.tag("area").is_some_and(|v| v == "yes")
                }
                OsmType::Relation => env.tag("type").is_some_and(|v| v == "multipolygon"),
                OsmType::Node => false,
            },
        }
    }
}

/// Comparison operator in a tag condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

/// One bracketed or class condition.
#[derive(Debug, Clone)]
pub enum Condition {
    /// `[key=value]` and the comparison forms. Ordering operators compare
    /// numerically and fail on non-numeric tag values.
    TagValue { key: String, op: CompareOp, value: String },
    /// `[key=~/re/]`, `[key!~/re/]`.
    TagRegex { key: String, pattern: Regex, negated: bool },
    /// `[key]`, `[!key]`.
    TagPresent { key: String, negated: bool },
    /// `[key?]`, `[!key?]`: tag present and truthy.
    TagTruthy { key: String, negated: bool },
    /// `.name`, `!.name`: class set by an earlier rule in this pass.
    Class { name: String, negated: bool },
}

impl Condition {
    pub fn matches(&self, env: &Environment) -> bool {
        match self {
            Condition::TagValue { key, op, value } => {
                let Some(tag) = env.tag(key) else {
                    return *op == CompareOp::NotEq;
                };
                match op {
                    CompareOp::Eq => tag == value,
                    CompareOp::NotEq => tag != value,
                    _ => {
                        let (Ok(a), Ok(b)) = (tag.trim().parse::<f64>(), value.parse::<f64>())
                        else {
                            return false;
                        };
                        match op {
                            CompareOp::Less => a < b,
                            CompareOp::LessEq => a <= b,
                            CompareOp::Greater => a > b,
                            CompareOp::GreaterEq => a >= b,
                            CompareOp::Eq | CompareOp::NotEq => unreachable!(),
                        }
                    }
                }
            }
            Condition::TagRegex { key, pattern, negated } => {
                let found = env.tag(key).is_some_and(|v| pattern.is_match(v));
                found != *negated
            }
            Condition::TagPresent { key, negated } => env.tag(key).is_some() != *negated,
            Condition::TagTruthy { key, negated } => {
                let truthy = env
                    .tag(key)
                    .is_some_and(|v| !matches!(v, "" | "false" | "no" | "0" | "0.0"));
                truthy != *negated
            }
            Condition::Class { name, negated } => {
                let set = env
                    .cascades
                    .and_then(|mc| mc.get(DEFAULT_LAYER))
                    .map(|c| c.get_bool(name, false))
                    .unwrap_or(false);
                set != *negated
            }
        }
    }
}

/// How the selector connects to its parent selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `A > B`: B is a direct member of A.
    Child,
    /// `A B`: B is a member of A at any depth.
    Descendant,
    /// `A + B`: B directly follows a sibling matching A within a common
    /// parent way.
    Sibling,
}

/// Which neighbor gets bound as the match's parent context when several
/// neighbors satisfy the parent selector.
///
/// `FirstMatch` binds the first satisfying neighbor in dataset order.
/// `RequireUnanimous` binds only when exactly one neighbor satisfies;
/// otherwise the link still matches but no parent context is bound, so
/// context-dependent functions fall back to their neutral default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeighborPolicy {
    #[default]
    FirstMatch,
    RequireUnanimous,
}

/// The combinator part of a selector.
#[derive(Debug, Clone)]
pub struct LinkSelector {
    pub combinator: Combinator,
    pub parent: Box<Selector>,
    pub policy: NeighborPolicy,
}

/// A compiled selector.
#[derive(Debug, Clone)]
pub struct Selector {
    pub base: Base,
    /// Zoom restriction, as written `|z12-14`. Checked by the driver, not
    /// by `matches`.
    pub zoom: Option<Range>,
    pub conds: SmallVec<[Condition; 4]>,
    /// Layer the rule writes to, from the `::layer` suffix.
    pub subpart: String,
    pub link: Option<LinkSelector>,
}

/// A neighbor candidate produced by the graph query for a combinator.
struct Neighbor<'a> {
    id: PrimitiveId,
    index: usize,
    count: usize,
    role: Option<&'a str>,
}

impl Selector {
    pub fn new(base: Base) -> Selector {
        Selector {
            base,
            zoom: None,
            conds: SmallVec::new(),
            subpart: DEFAULT_LAYER.to_string(),
            link: None,
        }
    }

    /// Scale range this selector is restricted to, including restrictions
    /// on linked parent selectors.
    pub fn range(&self) -> Range {
        let mut range = self.zoom.unwrap_or(Range::ZERO_TO_INFINITY);
        if let Some(link) = &self.link {
            range = range.intersect(link.parent.range());
        }
        range
    }

    /// Whether this selector matches the environment's primitive, ignoring
    /// zoom. On a combinator match the environment receives the bound
    /// parent context (subject to the link's [`NeighborPolicy`]).
    pub fn matches<'a>(&'a self, env: &mut Environment<'a>) -> bool {
        if !self.base.matches(env) {
            return false;
        }
        if !self.conds.iter().all(|c| c.matches(env)) {
            return false;
        }
        match &self.link {
            None => true,
            Some(link) => self.match_link(link, env),
        }
    }

    fn match_link<'a>(&'a self, link: &'a LinkSelector, env: &mut Environment<'a>) -> bool {
        let candidates = match link.combinator {
            Combinator::Child => self.direct_referrers(env),
            Combinator::Descendant => self.transitive_referrers(env),
            Combinator::Sibling => self.preceding_siblings(env),
        };
        let mut bound: Option<Neighbor> = None;
        let mut matched = 0usize;
        for candidate in candidates {
            let mut parent_env = env.clone();
            parent_env.primitive = Some(candidate.id);
            parent_env.parent = None;
            parent_env.parent_selector = None;
            parent_env.index = None;
            parent_env.count = None;
            parent_env.role = None;
            if link.parent.matches(&mut parent_env) {
                matched += 1;
                if bound.is_none() {
                    bound = Some(candidate);
                }
                if link.policy == NeighborPolicy::FirstMatch {
                    break;
                }
            }
        }
        let Some(neighbor) = bound else {
            return false;
        };
        let unanimous = link.policy == NeighborPolicy::FirstMatch || matched == 1;
        if unanimous {
            env.parent = Some(neighbor.id);
            env.parent_selector = Some(&link.parent);
            env.index = Some(neighbor.index);
            env.count = Some(neighbor.count);
            env.role = neighbor.role;
        }
        true
    }

    /// Parent ways and parent relations of the current primitive.
    fn direct_referrers<'a>(&self, env: &Environment<'a>) -> Vec<Neighbor<'a>> {
        let (Some(data), Some(id)) = (env.data, env.primitive) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if id.kind == OsmType::Node {
            for way in data.parent_ways(id.id) {
                let count = way.nodes.len();
                if let Some(index) = way.nodes.iter().position(|&n| n == id.id) {
                    out.push(Neighbor {
                        id: PrimitiveId::way(way.id),
                        index,
                        count,
                        role: None,
                    });
                }
            }
        }
        for relation in data.parent_relations(id) {
            let count = relation.members.len();
            for (index, member) in relation.members.iter().enumerate() {
                if member.member == id {
                    out.push(Neighbor {
                        id: PrimitiveId::relation(relation.id),
                        index,
                        count,
                        role: Some(member.role.as_str()),
                    });
                }
            }
        }
        out
    }

    /// Referrers at any depth, for the descendant combinator. Walks the
    /// parent graph breadth-first, guarding against relation cycles.
    fn transitive_referrers<'a>(&self, env: &Environment<'a>) -> Vec<Neighbor<'a>> {
        let mut out = self.direct_referrers(env);
        let Some(data) = env.data else {
            return out;
        };
        let mut seen: Vec<PrimitiveId> = out.iter().map(|n| n.id).collect();
        let mut frontier = 0;
        while frontier < out.len() {
            let id = out[frontier].id;
            frontier += 1;
            for relation in data.parent_relations(id) {
                let rid = PrimitiveId::relation(relation.id);
                if seen.contains(&rid) {
                    continue;
                }
                seen.push(rid);
                let count = relation.members.len();
                for (index, member) in relation.members.iter().enumerate() {
                    if member.member == id {
                        out.push(Neighbor { id: rid, index, count, role: Some(member.role.as_str()) });
                        break;
                    }
                }
            }
        }
        out
    }

    /// Nodes immediately preceding the current node in each parent way.
    fn preceding_siblings<'a>(&self, env: &Environment<'a>) -> Vec<Neighbor<'a>> {
        let (Some(data), Some(id)) = (env.data, env.primitive) else {
            return Vec::new();
        };
        if id.kind != OsmType::Node {
            return Vec::new();
        }
        let mut out = Vec::new();
        for way in data.parent_ways(id.id) {
            let count = way.nodes.len();
            for (i, &n) in way.nodes.iter().enumerate() {
                if n == id.id && i > 0 {
                    out.push(Neighbor {
                        id: PrimitiveId::node(way.nodes[i - 1]),
                        index: i - 1,
                        count,
                        role: None,
                    });
                }
            }
        }
        out
    }
}
