//! OSM primitives
//!
//! Nodes, ways and relations carry an id, tags and (for ways and relations)
//! references to their members. Geometry lives on nodes only.

use std::collections::BTreeMap;

use crate::geometry::EastNorth;

/// The three kinds of OSM primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl OsmType {
    /// Lowercase name as used in MapCSS selectors.
    pub fn name(self) -> &'static str {
        match self {
            OsmType::Node => "node",
            OsmType::Way => "way",
            OsmType::Relation => "relation",
        }
    }
}

/// Identifier of a primitive, unique per kind within a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveId {
    pub kind: OsmType,
    pub id: u64,
}

impl PrimitiveId {
    pub const fn node(id: u64) -> Self {
        PrimitiveId { kind: OsmType::Node, id }
    }

    pub const fn way(id: u64) -> Self {
        PrimitiveId { kind: OsmType::Way, id }
    }

    pub const fn relation(id: u64) -> Self {
        PrimitiveId { kind: OsmType::Relation, id }
    }
}

/// Tag map of a primitive. Ordered so iteration is deterministic.
pub type Tags = BTreeMap<String, String>;

/// A tagged point.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub id: u64,
    pub position: EastNorth,
    pub tags: Tags,
}

/// An ordered sequence of nodes.
#[derive(Debug, Clone, Default)]
pub struct Way {
    pub id: u64,
    pub nodes: Vec<u64>,
    pub tags: Tags,
}

impl Way {
    /// Whether first and last node coincide.
    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 2 && self.nodes.first() == self.nodes.last()
    }
}

/// One member of a relation, with its role.
#[derive(Debug, Clone)]
pub struct Member {
    pub role: String,
    pub member: PrimitiveId,
}

/// An ordered list of members with roles.
#[derive(Debug, Clone, Default)]
pub struct Relation {
    pub id: u64,
    pub members: Vec<Member>,
    pub tags: Tags,
}
