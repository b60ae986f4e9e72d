//! Configuration system for the par-mark bookmark engine.
//!
//! This crate provides configuration loading, saving, and default values
//! for line bookmarks. It includes:
//!
//! - Color and unicode-glyph palettes used for group styling
//! - Marker shapes, ruler lane and end-of-line label styles
//! - Group name limits and the save/reload timing windows
//! - Storage artifact location

pub mod config;
pub mod defaults;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use config::BookmarkConfig;
pub use defaults::FALLBACK_COLOR;
pub use error::ConfigError;
pub use types::{
    LineEndLabel, NamedColor, NamedGlyph, RulerLane, Shape, color_to_rgb, normalize_color,
};
