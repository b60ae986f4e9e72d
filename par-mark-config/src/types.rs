//! Bookmark style types and color helpers.

use serde::{Deserialize, Serialize};

// ============================================================================
// Marker shapes
// ============================================================================

/// Gutter marker shape for a bookmark group.
///
/// `Unicode` draws an arbitrary glyph carried alongside the shape as
/// icon text; every other variant is a fixed built-in icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    #[default]
    Bookmark,
    Circle,
    Heart,
    Label,
    Star,
    Unicode,
}

impl Shape {
    /// Identifier used in config files and the bookmark storage artifact.
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Bookmark => "bookmark",
            Shape::Circle => "circle",
            Shape::Heart => "heart",
            Shape::Label => "label",
            Shape::Star => "star",
            Shape::Unicode => "unicode",
        }
    }

    /// Parse a shape identifier. Unknown identifiers yield `None`.
    pub fn parse(s: &str) -> Option<Shape> {
        match s.trim() {
            "bookmark" => Some(Shape::Bookmark),
            "circle" => Some(Shape::Circle),
            "heart" => Some(Shape::Heart),
            "label" => Some(Shape::Label),
            "star" => Some(Shape::Star),
            "unicode" => Some(Shape::Unicode),
            _ => None,
        }
    }

    /// All available shapes for UI iteration
    pub fn all() -> &'static [Shape] {
        &[
            Shape::Bookmark,
            Shape::Circle,
            Shape::Heart,
            Shape::Label,
            Shape::Star,
            Shape::Unicode,
        ]
    }
}

/// Lane of the overview ruler in which bookmark markers are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RulerLane {
    /// No overview ruler marker
    None,
    Left,
    #[default]
    Center,
    Right,
    Full,
}

/// How a bookmark label is shown at the end of its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineEndLabel {
    None,
    /// Label text inside a border drawn in the group color
    #[default]
    Bordered,
    /// Label text on a background filled with the group color
    Inverse,
}

// ============================================================================
// Palettes
// ============================================================================

/// A named palette color, stored as normalized `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedColor {
    pub name: String,
    pub color: String,
}

impl NamedColor {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

/// A named glyph usable with [`Shape::Unicode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedGlyph {
    pub name: String,
    pub glyph: String,
}

impl NamedGlyph {
    pub fn new(name: impl Into<String>, glyph: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            glyph: glyph.into(),
        }
    }
}

// ============================================================================
// Color Normalization
// ============================================================================

/// Normalize a hex color string to opaque lowercase `#rrggbb`.
///
/// Accepts `rgb`, `rgba`, `rrggbb` and `rrggbbaa`, with or without a leading
/// `#`. Alpha is discarded. Returns `None` for anything else.
pub fn normalize_color(input: &str) -> Option<String> {
    let hex = input.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let rgb: String = match hex.len() {
        3 | 4 => hex.chars().take(3).flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.chars().take(6).collect(),
        _ => return None,
    };

    Some(format!("#{}", rgb.to_ascii_lowercase()))
}

/// Parse a normalized `#rrggbb` color into RGB components.
pub fn color_to_rgb(color: &str) -> Option<[u8; 3]> {
    let normalized = normalize_color(color)?;
    let hex = &normalized[1..];
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_long_form() {
        assert_eq!(normalize_color("#AABBCC"), Some("#aabbcc".to_string()));
        assert_eq!(normalize_color("aabbcc"), Some("#aabbcc".to_string()));
    }

    #[test]
    fn test_normalize_short_form_and_alpha() {
        assert_eq!(normalize_color("#abc"), Some("#aabbcc".to_string()));
        assert_eq!(normalize_color("#abcd"), Some("#aabbcc".to_string()));
        assert_eq!(normalize_color("#11223344"), Some("#112233".to_string()));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert_eq!(normalize_color(""), None);
        assert_eq!(normalize_color("#12345"), None);
        assert_eq!(normalize_color("#gggggg"), None);
        assert_eq!(normalize_color("red"), None);
    }

    #[test]
    fn test_color_to_rgb() {
        assert_eq!(color_to_rgb("#ff8000"), Some([255, 128, 0]));
        assert_eq!(color_to_rgb("nope"), None);
    }

    #[test]
    fn test_shape_identifiers_roundtrip() {
        for shape in Shape::all() {
            assert_eq!(Shape::parse(shape.as_str()), Some(*shape));
        }
        assert_eq!(Shape::parse("triangle"), None);
    }
}
