//! OSM data model for the MapCSS engine
//!
//! Nodes, ways and relations with their tags and graph relationships,
//! plus the dataset generation counter used for style cache invalidation.

mod dataset;
mod generation;
mod geometry;
mod primitive;

pub use dataset::DataSet;
pub use generation::{AtomicGeneration, Generation};
pub use geometry::EastNorth;
pub use primitive::{Member, Node, OsmType, PrimitiveId, Relation, Tags, Way};
