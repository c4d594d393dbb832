//! Evaluation driver
//!
//! Answers "what does this primitive look like at this scale". Worker
//! threads style different primitives concurrently: compiled sources are
//! immutable, and the per-primitive cache stores persistent
//! [`DividedScale`] partitions behind an `Arc`, so readers clone a pointer
//! and never block on a writer publishing an updated partition.
//!
//! Cache entries are keyed by the dataset generation and dropped lazily:
//! a stale generation is simply a miss on next access.

use std::collections::HashMap;
use std::sync::Arc;

use mapcss_osm::{DataSet, Generation, PrimitiveId};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::cascade::{Cascade, MultiCascade};
use crate::divided_scale::DividedScale;
use crate::environment::Environment;
use crate::expr::Cacheability;
use crate::style_element::{self, StyleElement};
use crate::style_source::StyleSource;

/// The fully computed style of one primitive over one scale sub-range.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    /// Draw instructions in painter's order.
    pub elements: Vec<StyleElement>,
}

struct CacheEntry {
    generation: Generation,
    scales: Arc<DividedScale<Arc<ComputedStyle>>>,
}

/// Styles primitives against an ordered list of compiled sources.
pub struct Styler {
    sources: Vec<Arc<StyleSource>>,
    cache: RwLock<HashMap<PrimitiveId, CacheEntry>>,
}

impl Styler {
    pub fn new(source: StyleSource) -> Styler {
        Styler { sources: vec![Arc::new(source)], cache: RwLock::new(HashMap::new()) }
    }

    pub fn with_sources(sources: Vec<Arc<StyleSource>>) -> Styler {
        Styler { sources, cache: RwLock::new(HashMap::new()) }
    }

    /// Appends a source; it cascades after the existing ones.
    pub fn add_source(&mut self, source: StyleSource) {
        self.sources.push(Arc::new(source));
        self.invalidate();
    }

    /// Drops all cached styles.
    pub fn invalidate(&self) {
        self.cache.write().clear();
    }

    /// Style of the map background, merged across sources.
    pub fn canvas(&self) -> Cascade {
        let mut canvas = Cascade::new();
        for source in &self.sources {
            source.apply_canvas(&mut canvas);
        }
        canvas
    }

    /// Computed style for a primitive at a scale, consulting and populating
    /// the cache.
    pub fn style(&self, data: &DataSet, id: PrimitiveId, scale: f64) -> Arc<ComputedStyle> {
        let generation = data.generation();
        if let Some(hit) = self.cache_lookup(id, scale, generation) {
            trace!(?id, scale, "style cache hit");
            return hit;
        }

        let (style, cacheability, mc) = self.compute(data, id, scale);
        match cacheability {
            Cacheability::Volatile => {
                trace!(?id, scale, "volatile style, not cached");
            }
            _ => self.cache_store(id, generation, style.clone(), &mc),
        }
        style
    }

    fn cache_lookup(
        &self,
        id: PrimitiveId,
        scale: f64,
        generation: Generation,
    ) -> Option<Arc<ComputedStyle>> {
        let cache = self.cache.read();
        let entry = cache.get(&id)?;
        if entry.generation != generation {
            return None;
        }
        entry.scales.get(scale).cloned()
    }

    fn compute(
        &self,
        data: &DataSet,
        id: PrimitiveId,
        scale: f64,
    ) -> (Arc<ComputedStyle>, Cacheability, MultiCascade) {
        let mut mc = MultiCascade::new();
        let mut cacheability = Cacheability::Immutable;
        for source in &self.sources {
            cacheability = cacheability.combine(source.apply(data, id, scale, &mut mc));
        }
        let mut elements = Vec::new();
        for (layer, cascade) in mc.layers() {
            let env = Environment::new(data, id).with_layer(layer);
            elements.extend(style_element::elements_for_layer(&env, cascade));
        }
        style_element::sort_elements(&mut elements);
        (Arc::new(ComputedStyle { elements }), cacheability, mc)
    }

    fn cache_store(
        &self,
        id: PrimitiveId,
        generation: Generation,
        style: Arc<ComputedStyle>,
        mc: &MultiCascade,
    ) {
        let mut cache = self.cache.write();
        let entry = cache.entry(id).or_insert_with(|| CacheEntry {
            generation,
            scales: Arc::new(DividedScale::new()),
        });
        if entry.generation != generation {
            entry.generation = generation;
            entry.scales = Arc::new(DividedScale::new());
        }
        match entry.scales.put(style, mc.range) {
            Ok(updated) => entry.scales = Arc::new(updated),
            // benign when two threads computed the same sub-range; anything
            // else is an upstream range bug worth surfacing in the log
            Err(violation) => debug!(?id, %violation, "discarding cache insert"),
        }
    }
}
