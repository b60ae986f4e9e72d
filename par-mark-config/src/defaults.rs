//! Default value functions for configuration.
//!
//! Used as `#[serde(default = "crate::defaults::...")]` attributes on
//! `BookmarkConfig` fields.

use crate::types::{LineEndLabel, NamedColor, NamedGlyph, RulerLane, Shape};

/// Color used for new groups when the palette is empty.
pub const FALLBACK_COLOR: &str = "#888888";

// ── Palettes ───────────────────────────────────────────────────────────────

pub fn colors() -> Vec<NamedColor> {
    vec![
        NamedColor::new("teal", "#00b3a4"),
        NamedColor::new("blue", "#3f7fe6"),
        NamedColor::new("purple", "#9b59d0"),
        NamedColor::new("red", "#e05050"),
        NamedColor::new("orange", "#f09030"),
        NamedColor::new("yellow", "#e0c030"),
        NamedColor::new("green", "#40b050"),
    ]
}

pub fn unicode_markers() -> Vec<NamedGlyph> {
    vec![
        NamedGlyph::new("check", "✓"),
        NamedGlyph::new("cross", "✗"),
        NamedGlyph::new("flag", "⚑"),
        NamedGlyph::new("arrow", "➤"),
        NamedGlyph::new("warning", "⚠"),
    ]
}

// ── Style ──────────────────────────────────────────────────────────────────

pub fn default_shape() -> Shape {
    Shape::Bookmark
}

pub fn ruler_lane() -> RulerLane {
    RulerLane::Center
}

pub fn line_end_label() -> LineEndLabel {
    LineEndLabel::Bordered
}

// ── Limits & timing ────────────────────────────────────────────────────────

pub fn max_group_name_length() -> usize {
    40
}

pub fn reload_guard_ms() -> u64 {
    2000
}

pub fn save_debounce_ms() -> u64 {
    500
}

// ── Storage ────────────────────────────────────────────────────────────────

pub fn storage_file() -> String {
    ".par-mark/bookmarks.json".to_string()
}
