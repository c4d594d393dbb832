//! RGBA colors
//!
//! MapCSS colors are parsed from `#rgb`, `#rrggbb`, `#rrggbbaa` notation or
//! from the CSS color name table, and handed to the renderer as four floats.

/// An RGBA color, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Opaque color from float components.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Color { r, g, b, a: 1.0 }
    }

    /// Color from float components including alpha.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    /// Opaque color from 8-bit components.
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Color::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    fn from_rgb24(rgb: u32) -> Self {
        Color::from_u8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` notation.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let v = u32::from_str_radix(hex, 16).ok()?;
                let (r, g, b) = ((v >> 8) & 0xf, (v >> 4) & 0xf, v & 0xf);
                Some(Color::from_u8((r * 17) as u8, (g * 17) as u8, (b * 17) as u8))
            }
            6 => {
                let v = u32::from_str_radix(hex, 16).ok()?;
                Some(Color::from_rgb24(v))
            }
            8 => {
                let v = u32::from_str_radix(hex, 16).ok()?;
                let mut c = Color::from_rgb24(v >> 8);
                c.a = (v & 0xff) as f32 / 255.0;
                Some(c)
            }
            _ => None,
        }
    }

    /// Looks up a CSS color name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        CSS_COLORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, rgb)| Color::from_rgb24(rgb))
    }

    /// Parses either notation.
    pub fn parse(s: &str) -> Option<Self> {
        if s.starts_with('#') {
            Color::from_hex(s)
        } else {
            Color::from_name(s)
        }
    }

    /// Formats as `#rrggbb` or `#rrggbbaa` when alpha is not 1.
    pub fn to_html(self) -> String {
        let to8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if (self.a - 1.0).abs() < f32::EPSILON {
            format!("#{:02x}{:02x}{:02x}", to8(self.r), to8(self.g), to8(self.b))
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", to8(self.r), to8(self.g), to8(self.b), to8(self.a))
        }
    }

    /// Color from hue/saturation/brightness, all in `[0, 1]`.
    pub fn from_hsb(h: f32, s: f32, b: f32) -> Self {
        let h = (h.rem_euclid(1.0)) * 6.0;
        let i = h.floor();
        let f = h - i;
        let p = b * (1.0 - s);
        let q = b * (1.0 - s * f);
        let t = b * (1.0 - s * (1.0 - f));
        let (r, g, bl) = match i as u32 % 6 {
            0 => (b, t, p),
            1 => (q, b, p),
            2 => (p, b, t),
            3 => (p, q, b),
            4 => (t, p, b),
            _ => (b, p, q),
        };
        Color::rgb(r, g, bl)
    }
}

/// CSS named colors, the subset MapCSS stylesheets commonly use.
static CSS_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xf0f8ff),
    ("aqua", 0x00ffff),
    ("beige", 0xf5f5dc),
    ("black", 0x000000),
    ("blue", 0x0000ff),
    ("brown", 0xa52a2a),
    ("coral", 0xff7f50),
    ("crimson", 0xdc143c),
    ("cyan", 0x00ffff),
    ("darkblue", 0x00008b),
    ("darkgray", 0xa9a9a9),
    ("darkgreen", 0x006400),
    ("darkorange", 0xff8c00),
    ("darkred", 0x8b0000),
    ("dimgray", 0x696969),
    ("fuchsia", 0xff00ff),
    ("gold", 0xffd700),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("grey", 0x808080),
    ("indigo", 0x4b0082),
    ("ivory", 0xfffff0),
    ("khaki", 0xf0e68c),
    ("lightblue", 0xadd8e6),
    ("lightgray", 0xd3d3d3),
    ("lightgreen", 0x90ee90),
    ("lightyellow", 0xffffe0),
    ("lime", 0x00ff00),
    ("magenta", 0xff00ff),
    ("maroon", 0x800000),
    ("navy", 0x000080),
    ("olive", 0x808000),
    ("orange", 0xffa500),
    ("orchid", 0xda70d6),
    ("pink", 0xffc0cb),
    ("purple", 0x800080),
    ("red", 0xff0000),
    ("salmon", 0xfa8072),
    ("silver", 0xc0c0c0),
    ("skyblue", 0x87ceeb),
    ("tan", 0xd2b48c),
    ("teal", 0x008080),
    ("tomato", 0xff6347),
    ("violet", 0xee82ee),
    ("white", 0xffffff),
    ("whitesmoke", 0xf5f5f5),
    ("yellow", 0xffff00),
    ("yellowgreen", 0x9acd32),
];
