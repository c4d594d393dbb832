//! MapCSS styling engine
//!
//! Compiles MapCSS stylesheets and evaluates them against OSM primitives:
//! parser and expression compiler, selector matching with combinators over
//! the primitive graph, last-write-wins cascade, and a persistent
//! scale-partition cache keyed by the dataset generation.
//!
//! Typical use: compile sources into a [`Styler`], then ask it for the
//! [`ComputedStyle`] of a primitive at a scale.

pub mod cascade;
pub mod color;
pub mod divided_scale;
pub mod environment;
pub mod error;
pub mod expr;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod range;
pub mod selector;
pub mod style_element;
pub mod style_source;
pub mod styler;
pub mod value;

pub use cascade::{Cascade, MultiCascade, DEFAULT_LAYER, WILDCARD_LAYER};
pub use color::Color;
pub use divided_scale::DividedScale;
pub use environment::Environment;
pub use error::{EvalError, ParseError, RangeViolation};
pub use expr::{Cacheability, Expr};
pub use parser::{parse, parse_with_policies, CombinatorPolicies, Instruction, Rule, StyleSheet};
pub use range::Range;
pub use selector::{
    Base, Combinator, CompareOp, Condition, LinkSelector, NeighborPolicy, Selector,
};
pub use style_element::{AreaStyle, IconStyle, LineStyle, StyleElement, TextStyle};
pub use style_source::StyleSource;
pub use styler::{ComputedStyle, Styler};
pub use value::{Keyword, Value};
