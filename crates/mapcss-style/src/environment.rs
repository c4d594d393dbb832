//! Evaluation environment
//!
//! Everything a selector match or an expression evaluation may look at:
//! the dataset, the primitive under consideration, the layer being written,
//! the cascades built so far, and the context a combinator match bound
//! (the matched neighbor, member index and role).
//!
//! A fresh environment is cheap to build per rule; combinator matching
//! clones it to bind the parent context without disturbing the caller's.

use mapcss_osm::{DataSet, Node, OsmType, PrimitiveId, Relation, Tags, Way};

use crate::cascade::{Cascade, MultiCascade, DEFAULT_LAYER};
use crate::selector::Selector;

#[derive(Clone)]
pub struct Environment<'a> {
    /// Dataset the primitive lives in; absent for `globals`/`canvas`
    /// evaluation.
    pub data: Option<&'a DataSet>,
    /// Primitive being styled; absent for `globals`/`canvas` evaluation.
    pub primitive: Option<PrimitiveId>,
    /// Layer the current declaration writes to.
    pub layer: &'a str,
    /// Cascades built so far for this primitive in this pass. Class
    /// conditions and `prop()` read from here.
    pub cascades: Option<&'a MultiCascade>,
    /// The compiled `globals` block of the style source.
    pub globals: Option<&'a Cascade>,
    /// Neighbor bound by a combinator match.
    pub parent: Option<PrimitiveId>,
    /// The selector that neighbor satisfied; `heading()` filters parent
    /// ways through it.
    pub parent_selector: Option<&'a Selector>,
    /// Index of the primitive within the matched parent (member or node
    /// position), zero-based.
    pub index: Option<usize>,
    /// Sibling count within the matched parent.
    pub count: Option<usize>,
    /// Relation member role, when the combinator matched via a relation.
    pub role: Option<&'a str>,
}

impl<'a> Environment<'a> {
    pub fn new(data: &'a DataSet, primitive: PrimitiveId) -> Self {
        Environment {
            data: Some(data),
            primitive: Some(primitive),
            layer: DEFAULT_LAYER,
            cascades: None,
            globals: None,
            parent: None,
            parent_selector: None,
            index: None,
            count: None,
            role: None,
        }
    }

    /// Environment with no primitive, for `globals` and `canvas` blocks.
    pub fn global() -> Self {
        Environment {
            data: None,
            primitive: None,
            layer: DEFAULT_LAYER,
            cascades: None,
            globals: None,
            parent: None,
            parent_selector: None,
            index: None,
            count: None,
            role: None,
        }
    }

    pub fn with_cascades(mut self, cascades: &'a MultiCascade) -> Self {
        self.cascades = Some(cascades);
        self
    }

    pub fn with_globals(mut self, globals: &'a Cascade) -> Self {
        self.globals = Some(globals);
        self
    }

    pub fn with_layer(mut self, layer: &'a str) -> Self {
        self.layer = layer;
        self
    }

    /// Cascade of the layer currently being written, if it exists yet.
    pub fn cascade(&self) -> Option<&Cascade> {
        self.cascades?.get(self.layer)
    }

    pub fn osm_type(&self) -> Option<OsmType> {
        Some(self.primitive?.kind)
    }

    pub fn tags(&self) -> Option<&'a Tags> {
        self.data?.tags(self.primitive?)
    }

    pub fn tag(&self, key: &str) -> Option<&'a str> {
        self.data?.tag(self.primitive?, key)
    }

    pub fn node(&self) -> Option<&'a Node> {
        let id = self.primitive?;
        if id.kind != OsmType::Node {
            return None;
        }
        self.data?.node(id.id)
    }

    pub fn way(&self) -> Option<&'a Way> {
        let id = self.primitive?;
        if id.kind != OsmType::Way {
            return None;
        }
        self.data?.way(id.id)
    }

    pub fn relation(&self) -> Option<&'a Relation> {
        let id = self.primitive?;
        if id.kind != OsmType::Relation {
            return None;
        }
        self.data?.relation(id.id)
    }
}
