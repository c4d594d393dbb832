//! Property cascade
//!
//! A cascade is the override map a primitive's matching declarations merge
//! into: each `put` overwrites any prior value for that key, so the last
//! writer in source order wins. Typed getters coerce best-effort and fall
//! back to the caller's default with a logged warning instead of failing.

use std::collections::HashMap;

use tracing::warn;

use crate::color::Color;
use crate::range::Range;
use crate::value::{Keyword, Value};

/// The implicit layer a selector without a `::layer` subpart writes to.
pub const DEFAULT_LAYER: &str = "default";

/// The wildcard layer; its properties seed every other layer.
pub const WILDCARD_LAYER: &str = "*";

/// A last-write-wins property map for one layer of one primitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cascade {
    properties: HashMap<String, Value>,
}

impl Cascade {
    pub fn new() -> Self {
        Cascade::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    /// Stores the value, or removes the key when the value is absent or the
    /// keyword `none`. Assigning `none` is how stylesheets cancel an
    /// earlier rule's property.
    pub fn put_or_clear(&mut self, key: &str, value: Option<Value>) {
        match value {
            Some(Value::Keyword(Keyword::None)) | None => {
                self.properties.remove(key);
            }
            Some(value) => {
                self.properties.insert(key.to_string(), value);
            }
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.properties.remove(key);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn get_number(&self, key: &str, default: f64) -> f64 {
        match self.properties.get(key) {
            None => default,
            Some(value) => value.as_number().unwrap_or_else(|| {
                warn!(key, ?value, "cannot convert property to a number, using default");
                default
            }),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.properties.get(key) {
            None => default,
            Some(value) => value.as_bool().unwrap_or_else(|| {
                warn!(key, ?value, "cannot convert property to a boolean, using default");
                default
            }),
        }
    }

    pub fn get_color(&self, key: &str, default: Color) -> Color {
        match self.properties.get(key) {
            None => default,
            Some(value) => value.as_color().unwrap_or_else(|| {
                warn!(key, ?value, "cannot convert property to a color, using default");
                default
            }),
        }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.properties.get(key).map(Value::as_display_string)
    }

    pub fn get_float_array(&self, key: &str) -> Option<Vec<f32>> {
        let value = self.properties.get(key)?;
        match value.as_float_array() {
            Some(a) => Some(a),
            None => {
                warn!(key, ?value, "cannot convert property to a float array, ignoring");
                None
            }
        }
    }

    pub fn get_keyword(&self, key: &str, default: Keyword) -> Keyword {
        match self.properties.get(key) {
            None => default,
            Some(Value::Keyword(k)) => *k,
            Some(Value::String(s)) => Keyword::from_str(s).unwrap_or_else(|| {
                warn!(key, value = %s, "unknown keyword, using default");
                default
            }),
            Some(value) => {
                warn!(key, ?value, "cannot convert property to a keyword, using default");
                default
            }
        }
    }
}

/// All layers of one primitive's computed style, plus the scale range the
/// result is valid for.
///
/// Layers keep insertion order so that style elements come out in a
/// deterministic order. The wildcard layer `*` acts as a template: its
/// properties are copied into each layer created after them.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiCascade {
    layers: Vec<(String, Cascade)>,
    /// Scale range over which this result is known to hold.
    pub range: Range,
}

impl Default for MultiCascade {
    fn default() -> Self {
        MultiCascade { layers: Vec::new(), range: Range::ZERO_TO_INFINITY }
    }
}

impl MultiCascade {
    pub fn new() -> Self {
        MultiCascade::default()
    }

    pub fn get(&self, layer: &str) -> Option<&Cascade> {
        self.layers.iter().find(|(name, _)| name == layer).map(|(_, c)| c)
    }

    /// Cascade for a layer, creating it if absent. A new layer other than
    /// the wildcard starts as a copy of the wildcard template.
    pub fn get_or_create(&mut self, layer: &str) -> &mut Cascade {
        if let Some(i) = self.layers.iter().position(|(name, _)| name == layer) {
            return &mut self.layers[i].1;
        }
        let template = if layer != WILDCARD_LAYER {
            self.get(WILDCARD_LAYER).cloned().unwrap_or_default()
        } else {
            Cascade::new()
        };
        self.layers.push((layer.to_string(), template));
        &mut self.layers.last_mut().expect("just pushed").1
    }

    /// Concrete layers in creation order, wildcard excluded.
    pub fn layers(&self) -> impl Iterator<Item = (&str, &Cascade)> {
        self.layers
            .iter()
            .filter(|(name, _)| name != WILDCARD_LAYER)
            .map(|(name, c)| (name.as_str(), c))
    }

    /// Names of all concrete layers, for wildcard-subpart application.
    pub fn layer_names(&self) -> Vec<String> {
        self.layers
            .iter()
            .filter(|(name, _)| name != WILDCARD_LAYER)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut c = Cascade::new();
        c.put("width", Value::Number(1.0));
        c.put("width", Value::Number(3.0));
        assert_eq!(c.get_number("width", 0.0), 3.0);
    }

    #[test]
    fn test_coercion_failure_falls_back_to_default() {
        let mut c = Cascade::new();
        c.put("width", Value::Keyword(Keyword::Round));
        assert_eq!(c.get_number("width", 7.0), 7.0);
        c.put("color", Value::Number(3.0));
        assert_eq!(c.get_color("color", Color::rgb(0.0, 0.0, 0.0)), Color::rgb(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_put_or_clear_none_removes() {
        let mut c = Cascade::new();
        c.put("icon-image", Value::String("a.svg".into()));
        c.put_or_clear("icon-image", Some(Value::Keyword(Keyword::None)));
        assert!(!c.contains_key("icon-image"));
        c.put_or_clear("icon-image", None);
        assert!(!c.contains_key("icon-image"));
    }

    #[test]
    fn test_wildcard_layer_seeds_new_layers() {
        let mut mc = MultiCascade::new();
        mc.get_or_create(WILDCARD_LAYER).put("opacity", Value::Number(0.5));
        mc.get_or_create("casing").put("width", Value::Number(4.0));
        let casing = mc.get("casing").unwrap();
        assert_eq!(casing.get_number("opacity", 1.0), 0.5);
        assert_eq!(casing.get_number("width", 0.0), 4.0);
        // wildcard itself not listed as a concrete layer
        assert_eq!(mc.layers().count(), 1);
    }

    #[test]
    fn test_layers_keep_creation_order() {
        let mut mc = MultiCascade::new();
        mc.get_or_create("default");
        mc.get_or_create("casing");
        let names: Vec<&str> = mc.layers().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["default", "casing"]);
    }
}
