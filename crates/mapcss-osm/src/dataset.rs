//! In-memory dataset
//!
//! Stores primitives, maintains the reverse indexes the selector matcher
//! needs (node -> parent ways, primitive -> parent relations) and bumps the
//! generation counter on every mutation.

use std::collections::HashMap;

use tracing::debug;

use crate::generation::{AtomicGeneration, Generation};
use crate::primitive::{Member, Node, OsmType, PrimitiveId, Relation, Way};

/// A set of OSM primitives with reverse indexes and a generation counter.
#[derive(Debug, Default)]
pub struct DataSet {
    nodes: HashMap<u64, Node>,
    ways: HashMap<u64, Way>,
    relations: HashMap<u64, Relation>,
    /// node id -> ids of ways containing it, in insertion order.
    node_parents: HashMap<u64, Vec<u64>>,
    /// member -> ids of relations referencing it, in insertion order.
    relation_parents: HashMap<PrimitiveId, Vec<u64>>,
    generation: AtomicGeneration,
}

impl DataSet {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        DataSet::default()
    }

    /// Current dataset generation. Bumped on every mutation.
    pub fn generation(&self) -> Generation {
        self.generation.get()
    }

    /// Inserts a node, replacing any node with the same id.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
        self.generation.bump();
    }

    /// Inserts a way and indexes its nodes.
    pub fn add_way(&mut self, way: Way) {
        for &n in &way.nodes {
            let parents = self.node_parents.entry(n).or_default();
            if !parents.contains(&way.id) {
                parents.push(way.id);
            }
        }
        self.ways.insert(way.id, way);
        self.generation.bump();
    }

    /// Inserts a relation and indexes its members.
    pub fn add_relation(&mut self, relation: Relation) {
        for m in &relation.members {
            let parents = self.relation_parents.entry(m.member).or_default();
            if !parents.contains(&relation.id) {
                parents.push(relation.id);
            }
        }
        self.relations.insert(relation.id, relation);
        self.generation.bump();
    }

    /// Sets or replaces a tag on an existing primitive.
    pub fn set_tag(&mut self, id: PrimitiveId, key: &str, value: &str) {
        let tags = match id.kind {
            OsmType::Node => self.nodes.get_mut(&id.id).map(|n| &mut n.tags),
            OsmType::Way => self.ways.get_mut(&id.id).map(|w| &mut w.tags),
            OsmType::Relation => self.relations.get_mut(&id.id).map(|r| &mut r.tags),
        };
        match tags {
            Some(tags) => {
                tags.insert(key.to_string(), value.to_string());
                self.generation.bump();
            }
            None => debug!(?id, key, "set_tag on unknown primitive"),
        }
    }

    /// Whether the primitive exists.
    pub fn contains(&self, id: PrimitiveId) -> bool {
        match id.kind {
            OsmType::Node => self.nodes.contains_key(&id.id),
            OsmType::Way => self.ways.contains_key(&id.id),
            OsmType::Relation => self.relations.contains_key(&id.id),
        }
    }

    /// Looks up a node.
    pub fn node(&self, id: u64) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Looks up a way.
    pub fn way(&self, id: u64) -> Option<&Way> {
        self.ways.get(&id)
    }

    /// Looks up a relation.
    pub fn relation(&self, id: u64) -> Option<&Relation> {
        self.relations.get(&id)
    }

    /// Tag value of a primitive.
    pub fn tag(&self, id: PrimitiveId, key: &str) -> Option<&str> {
        self.tags(id).and_then(|t| t.get(key)).map(String::as_str)
    }

    /// All tags of a primitive.
    pub fn tags(&self, id: PrimitiveId) -> Option<&crate::primitive::Tags> {
        match id.kind {
            OsmType::Node => self.nodes.get(&id.id).map(|n| &n.tags),
            OsmType::Way => self.ways.get(&id.id).map(|w| &w.tags),
            OsmType::Relation => self.relations.get(&id.id).map(|r| &r.tags),
        }
    }

    /// Number of tags on a primitive.
    pub fn num_tags(&self, id: PrimitiveId) -> usize {
        self.tags(id).map(|t| t.len()).unwrap_or(0)
    }

    /// Ways containing the given node, in insertion order.
    pub fn parent_ways(&self, node_id: u64) -> Vec<&Way> {
        self.node_parents
            .get(&node_id)
            .map(|ids| ids.iter().filter_map(|id| self.ways.get(id)).collect())
            .unwrap_or_default()
    }

    /// Relations referencing the given primitive, in insertion order.
    pub fn parent_relations(&self, id: PrimitiveId) -> Vec<&Relation> {
        self.relation_parents
            .get(&id)
            .map(|ids| ids.iter().filter_map(|id| self.relations.get(id)).collect())
            .unwrap_or_default()
    }

    /// Members of a relation, in member order.
    pub fn members(&self, relation_id: u64) -> &[Member] {
        self.relations
            .get(&relation_id)
            .map(|r| r.members.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes of a way, in way order. Missing nodes are skipped.
    pub fn child_nodes(&self, way_id: u64) -> Vec<&Node> {
        self.ways
            .get(&way_id)
            .map(|w| w.nodes.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Consecutive node id pairs of a way, for heading computation.
    pub fn node_pairs(&self, way_id: u64) -> Vec<(u64, u64)> {
        self.ways
            .get(&way_id)
            .map(|w| w.nodes.windows(2).map(|p| (p[0], p[1])).collect())
            .unwrap_or_default()
    }

    /// Total length of a way in map units.
    pub fn way_length(&self, way_id: u64) -> f64 {
        let nodes = self.child_nodes(way_id);
        nodes
            .windows(2)
            .map(|p| p[0].position.distance(p[1].position))
            .sum()
    }
}
