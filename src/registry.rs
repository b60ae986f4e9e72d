//! Group registry: named groups, their styles, and active/visible state.
//!
//! Exactly one group is active at any time. Visibility is derived from the
//! global flags and recomputed whenever they or the active group change.

use crate::error::{BookmarkError, Result};
use crate::events::{DecorationEvent, EventSink};
use crate::group::{DEFAULT_GROUP_NAME, Group, GroupId, compute_visibility, is_reserved_name};
use crate::store::BookmarkStore;
use par_mark_config::{BookmarkConfig, FALLBACK_COLOR, Shape, normalize_color};
use std::collections::HashMap;

/// A group as described by persisted state, before it gets an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSeed {
    pub name: String,
    /// Already normalized; `None` allocates the least-used palette color.
    pub color: Option<String>,
    pub shape: Shape,
    pub icon_text: String,
}

/// Owns every [`Group`].
#[derive(Debug)]
pub struct GroupRegistry {
    groups: HashMap<GroupId, Group>,
    next_id: u64,
    active: GroupId,
    hide_all: bool,
    hide_inactive_groups: bool,

    /// Palette colors in configured order
    palette: Vec<String>,
    default_shape: Shape,
    default_icon_text: String,
    max_name_length: usize,

    events: EventSink,
}

impl GroupRegistry {
    /// Create a registry holding only the active default group.
    pub fn new(config: &BookmarkConfig, events: EventSink) -> Self {
        let mut registry = Self::bare(config, events);
        let id = registry.insert_group(DEFAULT_GROUP_NAME.to_string(), None, None, None);
        registry.active = id;
        registry.recompute_visibility();
        registry
    }

    /// Rebuild a registry from persisted groups.
    ///
    /// Seeds are inserted in name order; duplicate names are skipped. The
    /// named active group is created if it does not exist.
    pub fn restore(
        config: &BookmarkConfig,
        events: EventSink,
        mut seeds: Vec<GroupSeed>,
        active_name: &str,
        hide_inactive_groups: bool,
        hide_all: bool,
    ) -> Self {
        let mut registry = Self::bare(config, events);
        seeds.sort_by(|a, b| a.name.cmp(&b.name));

        for seed in seeds {
            if seed.name.trim().is_empty() {
                log::warn!("Skipping stored group with an empty name");
                continue;
            }
            if registry.by_name(&seed.name).is_some() {
                log::warn!("Skipping duplicate stored group '{}'", seed.name);
                continue;
            }
            registry.insert_group(seed.name, seed.color, Some(seed.shape), Some(seed.icon_text));
        }

        let active_name = if active_name.trim().is_empty() {
            DEFAULT_GROUP_NAME
        } else {
            active_name
        };
        registry.active = match registry.by_name(active_name) {
            Some(group) => group.id,
            None => registry.insert_group(active_name.to_string(), None, None, None),
        };
        registry.hide_inactive_groups = hide_inactive_groups;
        registry.hide_all = hide_all;
        registry.recompute_visibility();
        registry
    }

    fn bare(config: &BookmarkConfig, events: EventSink) -> Self {
        let mut registry = Self {
            groups: HashMap::new(),
            next_id: 1,
            active: GroupId(0),
            hide_all: false,
            hide_inactive_groups: false,
            palette: Vec::new(),
            default_shape: Shape::default(),
            default_icon_text: String::new(),
            max_name_length: 0,
            events,
        };
        registry.adopt_config(config);
        registry
    }

    /// Take over palette, default style and limits from a (new) config.
    ///
    /// Existing groups keep their colors and shapes.
    pub fn apply_config(&mut self, config: &BookmarkConfig) {
        self.adopt_config(config);
    }

    fn adopt_config(&mut self, config: &BookmarkConfig) {
        self.palette = config.palette().map(str::to_string).collect();
        self.default_shape = config.default_shape;
        self.default_icon_text = match config.default_shape {
            Shape::Unicode => config
                .unicode_markers
                .first()
                .map(|m| m.glyph.clone())
                .unwrap_or_default(),
            _ => String::new(),
        };
        self.max_name_length = config.max_group_name_length;
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Group> {
        self.groups.values().find(|g| g.name == name)
    }

    /// Resolve a group name to an id, or fail with `UnknownGroup`.
    pub fn require(&self, name: &str) -> Result<GroupId> {
        self.by_name(name)
            .map(|g| g.id)
            .ok_or_else(|| BookmarkError::UnknownGroup(name.to_string()))
    }

    pub fn active_id(&self) -> GroupId {
        self.active
    }

    pub fn active(&self) -> Option<&Group> {
        self.groups.get(&self.active)
    }

    /// Name of the active group.
    pub fn active_name(&self) -> &str {
        self.active().map_or(DEFAULT_GROUP_NAME, |g| g.name.as_str())
    }

    pub fn hide_all(&self) -> bool {
        self.hide_all
    }

    pub fn hide_inactive_groups(&self) -> bool {
        self.hide_inactive_groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All groups sorted by name.
    pub fn groups_by_name(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = self.groups.values().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        groups
    }

    /// Group ids sorted by group name.
    pub fn ids_by_name(&self) -> Vec<GroupId> {
        self.groups_by_name().into_iter().map(|g| g.id).collect()
    }

    /// True when the only group is the default one, styled exactly like a
    /// freshly created default group.
    pub fn is_pristine_default(&self) -> bool {
        let mut groups = self.groups.values();
        match (groups.next(), groups.next()) {
            (Some(group), None) => {
                group.is_default()
                    && group.color == self.color_for_first_group()
                    && group.shape == self.default_shape
                    && group.icon_text == self.default_icon_text
            }
            _ => false,
        }
    }

    /// Palette color with the fewest groups using it; ties go to the first
    /// in configured order.
    pub fn least_used_color(&self) -> String {
        let mut usage: Vec<usize> = vec![0; self.palette.len()];
        for group in self.groups.values() {
            if let Some(i) = self.palette.iter().position(|c| *c == group.color) {
                usage[i] += 1;
            }
        }

        usage
            .iter()
            .enumerate()
            .min_by_key(|(i, count)| (**count, *i))
            .map(|(i, _)| self.palette[i].clone())
            .unwrap_or_else(|| FALLBACK_COLOR.to_string())
    }

    fn color_for_first_group(&self) -> &str {
        self.palette.first().map_or(FALLBACK_COLOR, String::as_str)
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Get or create the group called `name`.
    ///
    /// Creating validates the name; looking up an existing group never fails.
    pub fn ensure_group(&mut self, name: &str) -> Result<GroupId> {
        if let Some(group) = self.by_name(name) {
            return Ok(group.id);
        }
        self.validate_new_name(name)?;
        let id = self.insert_group(name.to_string(), None, None, None);
        self.recompute_visibility();
        log::debug!("Created bookmark group '{}' ({})", name, id);
        Ok(id)
    }

    /// Rename a group in place; bookmarks keep referring to it by id.
    pub fn rename(&mut self, id: GroupId, new_name: &str) -> Result<()> {
        let current = self
            .groups
            .get(&id)
            .ok_or_else(|| BookmarkError::UnknownGroup(id.to_string()))?;

        if new_name == current.name {
            return Err(BookmarkError::Validation(format!(
                "group is already named '{}'",
                new_name
            )));
        }
        self.validate_new_name(new_name)?;

        let old = self
            .groups
            .get_mut(&id)
            .map(|g| std::mem::replace(&mut g.name, new_name.to_string()))
            .unwrap_or_default();
        log::info!("Renamed bookmark group '{}' to '{}'", old, new_name);
        Ok(())
    }

    /// Delete groups and every bookmark they own.
    ///
    /// Returns the number of bookmarks removed. When the active group goes
    /// away, the first remaining group by name becomes active, or a fresh
    /// default group when none remain.
    pub fn delete(&mut self, store: &mut BookmarkStore, ids: &[GroupId]) -> Result<usize> {
        if let Some(unknown) = ids.iter().find(|id| !self.groups.contains_key(id)) {
            return Err(BookmarkError::UnknownGroup(unknown.to_string()));
        }

        let mut removed = 0;
        for id in ids {
            removed += store.remove_where(|b| b.group == *id).len();
            if let Some(group) = self.groups.remove(id) {
                log::info!("Deleted bookmark group '{}'", group.name);
                self.events.emit(DecorationEvent::GroupRemoved(*id));
            }
        }

        if !self.groups.contains_key(&self.active) {
            self.active = match self.ids_by_name().first() {
                Some(id) => *id,
                None => self.insert_group(DEFAULT_GROUP_NAME.to_string(), None, None, None),
            };
            log::debug!("Active bookmark group fell back to '{}'", self.active_name());
        }
        self.recompute_visibility();
        Ok(removed)
    }

    /// Make `name` the active group, creating it when absent.
    pub fn set_active(&mut self, name: &str) -> Result<GroupId> {
        let id = self.ensure_group(name)?;
        if id != self.active {
            self.active = id;
            log::debug!("Active bookmark group is now '{}'", name);
        }
        self.recompute_visibility();
        Ok(id)
    }

    pub fn set_hide_all(&mut self, hide_all: bool) {
        self.hide_all = hide_all;
        self.recompute_visibility();
    }

    pub fn set_hide_inactive(&mut self, hide_inactive_groups: bool) {
        self.hide_inactive_groups = hide_inactive_groups;
        self.recompute_visibility();
    }

    /// Change a group's color. Accepts any form [`normalize_color`] does.
    pub fn set_color(&mut self, id: GroupId, color: &str) -> Result<()> {
        let normalized = normalize_color(color)
            .ok_or_else(|| BookmarkError::Validation(format!("'{}' is not a valid color", color)))?;
        let group = self
            .groups
            .get_mut(&id)
            .ok_or_else(|| BookmarkError::UnknownGroup(id.to_string()))?;
        if group.color != normalized {
            group.color = normalized;
            self.events.emit(DecorationEvent::GroupStyleChanged(id));
        }
        Ok(())
    }

    /// Change a group's shape. `Unicode` requires a non-empty glyph; other
    /// shapes clear the icon text.
    pub fn set_shape(&mut self, id: GroupId, shape: Shape, icon_text: Option<&str>) -> Result<()> {
        let icon_text = match shape {
            Shape::Unicode => match icon_text.map(str::trim).filter(|t| !t.is_empty()) {
                Some(text) => text.to_string(),
                None => {
                    return Err(BookmarkError::Validation(
                        "the unicode shape needs a glyph".to_string(),
                    ));
                }
            },
            _ => String::new(),
        };
        let group = self
            .groups
            .get_mut(&id)
            .ok_or_else(|| BookmarkError::UnknownGroup(id.to_string()))?;
        if group.shape != shape || group.icon_text != icon_text {
            group.shape = shape;
            group.icon_text = icon_text;
            self.events.emit(DecorationEvent::GroupStyleChanged(id));
        }
        Ok(())
    }

    fn validate_new_name(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(BookmarkError::Validation(
                "group name must not be empty".to_string(),
            ));
        }
        let length = name.chars().count();
        if length > self.max_name_length {
            return Err(BookmarkError::Validation(format!(
                "group name is {} characters long, the maximum is {}",
                length, self.max_name_length
            )));
        }
        if is_reserved_name(name) {
            return Err(BookmarkError::Validation(format!(
                "'{}' is a reserved group name",
                name
            )));
        }
        if self.by_name(name).is_some() {
            return Err(BookmarkError::Validation(format!(
                "a group named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    fn insert_group(
        &mut self,
        name: String,
        color: Option<String>,
        shape: Option<Shape>,
        icon_text: Option<String>,
    ) -> GroupId {
        let id = GroupId(self.next_id);
        self.next_id += 1;

        let color = color.unwrap_or_else(|| self.least_used_color());
        let shape = shape.unwrap_or(self.default_shape);
        let icon_text = icon_text.unwrap_or_else(|| match shape {
            Shape::Unicode => self.default_icon_text.clone(),
            _ => String::new(),
        });

        self.groups
            .insert(id, Group::new(id, name, color, shape, icon_text));
        id
    }

    fn recompute_visibility(&mut self) {
        let mut changed = false;
        for group in self.groups.values_mut() {
            let is_active = group.id == self.active;
            let is_visible = compute_visibility(is_active, self.hide_all, self.hide_inactive_groups);
            if group.is_active != is_active || group.is_visible != is_visible {
                group.is_active = is_active;
                group.is_visible = is_visible;
                changed = true;
            }
        }
        if changed {
            self.events.emit(DecorationEvent::VisibilityChanged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::Bookmark;
    use crate::events::decoration_channel;
    use par_mark_config::NamedColor;

    fn two_color_config() -> BookmarkConfig {
        BookmarkConfig {
            colors: vec![NamedColor::new("a", "#aa0000"), NamedColor::new("b", "#00bb00")],
            ..BookmarkConfig::default()
        }
    }

    fn registry(config: &BookmarkConfig) -> GroupRegistry {
        let (sink, _events) = decoration_channel();
        GroupRegistry::new(config, sink)
    }

    #[test]
    fn test_new_registry_has_active_default() {
        let registry = registry(&BookmarkConfig::default());
        let active = registry.active().unwrap();
        assert!(active.is_default());
        assert!(active.is_active);
        assert!(active.is_visible);
        assert!(registry.is_pristine_default());
    }

    #[test]
    fn test_least_used_color_tie_breaks_in_order() {
        let config = two_color_config();
        let (sink, _events) = decoration_channel();
        let mut registry = GroupRegistry::restore(&config, sink, Vec::new(), "x", false, false);
        // "x" took the first color
        assert_eq!(registry.by_name("x").unwrap().color, "#aa0000");

        let y = registry.ensure_group("y").unwrap();
        assert_eq!(registry.get(y).unwrap().color, "#00bb00");
        let z = registry.ensure_group("z").unwrap();
        assert_eq!(registry.get(z).unwrap().color, "#aa0000");
    }

    #[test]
    fn test_empty_palette_uses_fallback() {
        let config = BookmarkConfig {
            colors: Vec::new(),
            ..BookmarkConfig::default()
        };
        let mut registry = registry(&config);
        let id = registry.ensure_group("work").unwrap();
        assert_eq!(registry.get(id).unwrap().color, FALLBACK_COLOR);
    }

    #[test]
    fn test_ensure_group_is_idempotent() {
        let mut registry = registry(&BookmarkConfig::default());
        let first = registry.ensure_group("work").unwrap();
        let second = registry.ensure_group("work").unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_rename_validation() {
        let config = BookmarkConfig {
            max_group_name_length: 5,
            ..BookmarkConfig::default()
        };
        let mut registry = registry(&config);
        let work = registry.ensure_group("work").unwrap();

        for bad in ["", "work", "default", "toolong", "(outside workspace)"] {
            assert!(
                matches!(registry.rename(work, bad), Err(BookmarkError::Validation(_))),
                "rename to {:?} should fail",
                bad
            );
        }
        assert_eq!(registry.get(work).unwrap().name, "work");

        registry.rename(work, "home").unwrap();
        assert_eq!(registry.get(work).unwrap().name, "home");
        assert!(registry.by_name("work").is_none());
    }

    #[test]
    fn test_delete_cascades_and_falls_back() {
        let config = BookmarkConfig::default();
        let (sink, _events) = decoration_channel();
        let mut registry = GroupRegistry::new(&config, sink.clone());
        let mut store = BookmarkStore::new(sink);

        let work = registry.set_active("work").unwrap();
        let default = registry.require("default").unwrap();
        store.add(Bookmark::new("a.rs", 1, 0, work));
        store.add(Bookmark::new("a.rs", 2, 0, work));
        store.add(Bookmark::new("a.rs", 3, 0, default));

        assert_eq!(registry.delete(&mut store, &[work]).unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(registry.active_name(), "default");

        registry.delete(&mut store, &[default]).unwrap();
        assert!(store.is_empty());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.active_name(), "default");
        assert!(registry.is_pristine_default());
    }

    #[test]
    fn test_delete_unknown_group_changes_nothing() {
        let config = BookmarkConfig::default();
        let (sink, _events) = decoration_channel();
        let mut registry = GroupRegistry::new(&config, sink.clone());
        let mut store = BookmarkStore::new(sink);
        let result = registry.delete(&mut store, &[GroupId(42)]);
        assert!(matches!(result, Err(BookmarkError::UnknownGroup(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_visibility_follows_flags() {
        let mut registry = registry(&BookmarkConfig::default());
        let work = registry.ensure_group("work").unwrap();
        let default = registry.active_id();

        registry.set_hide_inactive(true);
        assert!(registry.get(default).unwrap().is_visible);
        assert!(!registry.get(work).unwrap().is_visible);

        registry.set_active("work").unwrap();
        assert!(!registry.get(default).unwrap().is_visible);
        assert!(registry.get(work).unwrap().is_visible);
        assert!(!registry.get(default).unwrap().is_active);

        registry.set_hide_all(true);
        assert!(!registry.get(work).unwrap().is_visible);
    }

    #[test]
    fn test_customized_default_is_not_pristine() {
        let mut registry = registry(&BookmarkConfig::default());
        let default = registry.active_id();
        registry.set_color(default, "#123").unwrap();
        assert_eq!(registry.get(default).unwrap().color, "#112233");
        assert!(!registry.is_pristine_default());
    }

    #[test]
    fn test_set_shape_rules() {
        let mut registry = registry(&BookmarkConfig::default());
        let id = registry.active_id();
        assert!(registry.set_shape(id, Shape::Unicode, Some("  ")).is_err());
        registry.set_shape(id, Shape::Unicode, Some("⚑")).unwrap();
        assert_eq!(registry.get(id).unwrap().icon_text, "⚑");
        registry.set_shape(id, Shape::Star, Some("ignored")).unwrap();
        assert_eq!(registry.get(id).unwrap().icon_text, "");
        assert!(registry.set_color(id, "nope").is_err());
    }

    #[test]
    fn test_restore_sorts_and_dedups() {
        let (sink, _events) = decoration_channel();
        let seeds = vec![
            GroupSeed {
                name: "zeta".to_string(),
                color: Some("#010101".to_string()),
                shape: Shape::Heart,
                icon_text: String::new(),
            },
            GroupSeed {
                name: "alpha".to_string(),
                color: None,
                shape: Shape::Star,
                icon_text: String::new(),
            },
            GroupSeed {
                name: "zeta".to_string(),
                color: Some("#020202".to_string()),
                shape: Shape::Circle,
                icon_text: String::new(),
            },
        ];
        let registry = GroupRegistry::restore(&BookmarkConfig::default(), sink, seeds, "zeta", true, false);

        let names: Vec<&str> = registry.groups_by_name().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(registry.by_name("zeta").unwrap().color, "#010101");
        assert_eq!(registry.active_name(), "zeta");
        assert!(!registry.by_name("alpha").unwrap().is_visible);
        assert!(registry.hide_inactive_groups());
    }
}
