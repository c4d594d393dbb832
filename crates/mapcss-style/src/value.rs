//! Property values with dynamic typing
//!
//! A cascade property holds one of a small set of types. Conversion between
//! them is best-effort and never fails hard: an impossible conversion yields
//! `None`, the caller logs and falls back to a default.

use crate::color::Color;

/// A MapCSS keyword, e.g. `round` in `linecap: round;`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Above,
    Auto,
    Below,
    Bevel,
    Bold,
    Bottom,
    Center,
    Circle,
    Default,
    Inside,
    Italic,
    Left,
    Line,
    Miter,
    None,
    Normal,
    Octagon,
    Right,
    Round,
    Square,
    Thinnest,
    Top,
    Triangle,
    Way,
}

impl Keyword {
    /// Returns the keyword for a lowercase identifier, if it is one.
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "above" => Keyword::Above,
            "auto" => Keyword::Auto,
            "below" => Keyword::Below,
            "bevel" => Keyword::Bevel,
            "bold" => Keyword::Bold,
            "bottom" => Keyword::Bottom,
            "center" => Keyword::Center,
            "circle" => Keyword::Circle,
            "default" => Keyword::Default,
            "inside" => Keyword::Inside,
            "italic" => Keyword::Italic,
            "left" => Keyword::Left,
            "line" => Keyword::Line,
            "miter" => Keyword::Miter,
            "none" => Keyword::None,
            "normal" => Keyword::Normal,
            "octagon" => Keyword::Octagon,
            "right" => Keyword::Right,
            "round" => Keyword::Round,
            "square" => Keyword::Square,
            "thinnest" => Keyword::Thinnest,
            "top" => Keyword::Top,
            "triangle" => Keyword::Triangle,
            "way" => Keyword::Way,
            _ => return None,
        })
    }

    /// Lowercase spelling.
    pub fn name(self) -> &'static str {
        match self {
            Keyword::Above => "above",
            Keyword::Auto => "auto",
            Keyword::Below => "below",
            Keyword::Bevel => "bevel",
            Keyword::Bold => "bold",
            Keyword::Bottom => "bottom",
            Keyword::Center => "center",
            Keyword::Circle => "circle",
            Keyword::Default => "default",
            Keyword::Inside => "inside",
            Keyword::Italic => "italic",
            Keyword::Left => "left",
            Keyword::Line => "line",
            Keyword::Miter => "miter",
            Keyword::None => "none",
            Keyword::Normal => "normal",
            Keyword::Octagon => "octagon",
            Keyword::Right => "right",
            Keyword::Round => "round",
            Keyword::Square => "square",
            Keyword::Thinnest => "thinnest",
            Keyword::Top => "top",
            Keyword::Triangle => "triangle",
            Keyword::Way => "way",
        }
    }
}

/// A dynamically typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Color(Color),
    FloatArray(Vec<f32>),
    Keyword(Keyword),
    List(Vec<Value>),
}

impl Value {
    /// Numeric view. Strings parse if they look like numbers, booleans map
    /// to 0/1, everything else fails.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) if !s.is_empty() => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Boolean view. The strings `""`, `"false"`, `"no"`, `"0"` and `"0.0"`
    /// are false, any other string is true; numbers are true when nonzero;
    /// lists and arrays are true when non-empty.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::String(s) => Some(!matches!(s.as_str(), "" | "false" | "no" | "0" | "0.0")),
            Value::Keyword(k) => Some(!matches!(k.name(), "false" | "no" | "none")),
            Value::Number(n) => Some(*n != 0.0),
            Value::List(l) => Some(!l.is_empty()),
            Value::FloatArray(a) => Some(!a.is_empty()),
            _ => None,
        }
    }

    /// Color view. Strings and keywords go through the CSS name table and
    /// hex notation.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            Value::Keyword(k) => Color::from_name(k.name()),
            Value::String(s) => Color::parse(s),
            _ => None,
        }
    }

    /// Float-array view. Lists convert element-wise; a scalar becomes a
    /// one-element array.
    pub fn as_float_array(&self) -> Option<Vec<f32>> {
        match self {
            Value::FloatArray(a) => Some(a.clone()),
            Value::List(l) => l
                .iter()
                .map(|v| v.as_number().map(|n| n as f32))
                .collect::<Option<Vec<f32>>>(),
            _ => self.as_number().map(|n| vec![n as f32]),
        }
    }

    /// String view used by `concat` and friends. Always succeeds.
    pub fn as_display_string(&self) -> String {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Color(c) => c.to_html(),
            Value::Keyword(k) => k.name().to_string(),
            Value::FloatArray(a) => a
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(","),
            Value::List(l) => l
                .iter()
                .map(Value::as_display_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// List view. Non-lists become a one-element list.
    pub fn as_list(&self) -> Vec<Value> {
        match self {
            Value::List(l) => l.clone(),
            Value::FloatArray(a) => a.iter().map(|&f| Value::Number(f as f64)).collect(),
            other => vec![other.clone()],
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}
