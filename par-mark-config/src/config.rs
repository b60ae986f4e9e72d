//! `BookmarkConfig`: style palette, limits and timing for the bookmark engine.
//!
//! Covers:
//! - the config struct and its `Default` impl
//! - `load_from` / `save_to` (YAML file I/O with atomic write)
//! - palette normalization and semantic validation
//! - detection of style-affecting changes between two configs

use crate::error::ConfigError;
use crate::types::{LineEndLabel, NamedColor, NamedGlyph, RulerLane, Shape, normalize_color};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings consumed by the bookmark core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkConfig {
    /// Ordered color palette used when allocating colors to new groups
    #[serde(default = "crate::defaults::colors")]
    pub colors: Vec<NamedColor>,

    /// Ordered glyph palette offered for the `unicode` shape
    #[serde(default = "crate::defaults::unicode_markers")]
    pub unicode_markers: Vec<NamedGlyph>,

    /// Shape assigned to newly created groups
    #[serde(default = "crate::defaults::default_shape")]
    pub default_shape: Shape,

    /// Overview ruler lane for bookmark markers
    #[serde(default = "crate::defaults::ruler_lane")]
    pub ruler_lane: RulerLane,

    /// End-of-line label rendering
    #[serde(default = "crate::defaults::line_end_label")]
    pub line_end_label: LineEndLabel,

    /// Maximum number of characters in a group name
    #[serde(default = "crate::defaults::max_group_name_length")]
    pub max_group_name_length: usize,

    /// Minimum time after a save before a storage change may trigger a reload
    #[serde(default = "crate::defaults::reload_guard_ms")]
    pub reload_guard_ms: u64,

    /// Quiet period after the last mutation before an automatic save
    #[serde(default = "crate::defaults::save_debounce_ms")]
    pub save_debounce_ms: u64,

    /// Storage artifact path, relative to the workspace root unless absolute
    #[serde(default = "crate::defaults::storage_file")]
    pub storage_file: String,
}

impl Default for BookmarkConfig {
    fn default() -> Self {
        Self {
            colors: crate::defaults::colors(),
            unicode_markers: crate::defaults::unicode_markers(),
            default_shape: crate::defaults::default_shape(),
            ruler_lane: crate::defaults::ruler_lane(),
            line_end_label: crate::defaults::line_end_label(),
            max_group_name_length: crate::defaults::max_group_name_length(),
            reload_guard_ms: crate::defaults::reload_guard_ms(),
            save_debounce_ms: crate::defaults::save_debounce_ms(),
            storage_file: crate::defaults::storage_file(),
        }
    }
}

impl BookmarkConfig {
    /// Default location of the user config file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("par-mark")
            .join("config.yaml")
    }

    /// Load the config from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load the config from a specific file.
    ///
    /// A missing or blank file yields the defaults. Palette entries with
    /// unparseable colors are dropped with a warning.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No bookmark config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            log::info!("Bookmark config {:?} is empty, using defaults", path);
            return Ok(Self::default());
        }

        let mut config: BookmarkConfig = serde_yaml_ng::from_str(&contents)?;
        config.normalize_palette();

        for problem in config.validate() {
            log::warn!("Bookmark config {:?}: {}", path, problem);
        }

        log::info!(
            "Loaded bookmark config from {:?} ({} colors, {} markers)",
            path,
            config.colors.len(),
            config.unicode_markers.len()
        );
        Ok(config)
    }

    /// Save the config to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)?;
        fs::rename(&temp_path, path)?;

        log::debug!("Saved bookmark config to {:?}", path);
        Ok(())
    }

    /// Normalize palette colors in place, dropping entries that do not parse.
    pub fn normalize_palette(&mut self) {
        self.colors.retain_mut(|entry| match normalize_color(&entry.color) {
            Some(color) => {
                entry.color = color;
                true
            }
            None => {
                log::warn!(
                    "Dropping palette color '{}': '{}' is not a hex color",
                    entry.name,
                    entry.color
                );
                false
            }
        });
    }

    /// Check the config for semantic problems.
    ///
    /// Returns a human-readable description of each problem; an empty list
    /// means the config is usable as-is.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.max_group_name_length == 0 {
            problems.push("max_group_name_length must be positive".to_string());
        }

        for (i, entry) in self.colors.iter().enumerate() {
            if normalize_color(&entry.color).is_none() {
                problems.push(format!(
                    "color '{}' has invalid value '{}'",
                    entry.name, entry.color
                ));
            }
            if self.colors[..i].iter().any(|c| c.name == entry.name) {
                problems.push(format!("duplicate color name '{}'", entry.name));
            }
        }

        for (i, marker) in self.unicode_markers.iter().enumerate() {
            if marker.glyph.trim().is_empty() {
                problems.push(format!("unicode marker '{}' has an empty glyph", marker.name));
            }
            if self.unicode_markers[..i]
                .iter()
                .any(|m| m.name == marker.name)
            {
                problems.push(format!("duplicate unicode marker name '{}'", marker.name));
            }
        }

        if self.default_shape == Shape::Unicode && self.unicode_markers.is_empty() {
            problems.push("default_shape is 'unicode' but no unicode markers are set".to_string());
        }

        if self.storage_file.trim().is_empty() {
            problems.push("storage_file must not be empty".to_string());
        }

        problems
    }

    /// Like [`validate`](Self::validate) but returns the first problem as an error.
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        match self.validate().into_iter().next() {
            Some(problem) => Err(ConfigError::Validation(problem)),
            None => Ok(()),
        }
    }

    /// Palette colors in configured order.
    pub fn palette(&self) -> impl Iterator<Item = &str> {
        self.colors.iter().map(|c| c.color.as_str())
    }

    /// Look up a palette color by name.
    pub fn color_named(&self, name: &str) -> Option<&str> {
        self.colors
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.color.as_str())
    }

    /// Look up a unicode marker glyph by name.
    pub fn glyph_named(&self, name: &str) -> Option<&str> {
        self.unicode_markers
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.glyph.as_str())
    }

    /// Color a brand new group receives when no other group exists.
    pub fn initial_color(&self) -> &str {
        self.palette()
            .next()
            .unwrap_or(crate::defaults::FALLBACK_COLOR)
    }

    /// True when any value that affects rendered decorations differs.
    pub fn style_differs(&self, other: &BookmarkConfig) -> bool {
        self.colors != other.colors
            || self.unicode_markers != other.unicode_markers
            || self.default_shape != other.default_shape
            || self.ruler_lane != other.ruler_lane
            || self.line_end_label != other.line_end_label
    }

    /// Resolve the storage artifact against a workspace root.
    pub fn storage_path(&self, workspace_root: &Path) -> PathBuf {
        let file = Path::new(&self.storage_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            workspace_root.join(file)
        }
    }
}
