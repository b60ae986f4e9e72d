//! Decoration binding: turning bookmark state into gutter decorations.
//!
//! Rendering is external. A [`DecorationBinder`] creates opaque handles for a
//! (shape, color, icon, label) combination and an [`EditorHost`] applies a
//! per-file map of handle → lines. [`DecorationRefresher`] sits between the
//! two: it drains the core's [`DecorationEvent`] channel, keeps handles per
//! group, and rebuilds only the files that became dirty.

use crate::cache::KeyedCache;
use crate::events::{DecorationEvent, DecorationEvents};
use crate::group::{Group, GroupId};
use crate::registry::GroupRegistry;
use crate::store::BookmarkStore;
use par_mark_config::{BookmarkConfig, LineEndLabel, RulerLane, Shape};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Opaque handle issued by a [`DecorationBinder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecorationHandle(pub u64);

/// Which rendering of a group a decoration is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DecorationRole {
    /// Bookmarks of the active group
    Own,
    /// Bookmarks of a visible but inactive group
    GroupFallback,
}

/// Everything a binder needs to build one decoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationRequest {
    pub shape: Shape,
    /// `#rrggbb`
    pub color: String,
    pub icon_text: String,
    pub label: Option<String>,
    pub role: DecorationRole,
    pub ruler_lane: RulerLane,
    pub line_end_label: LineEndLabel,
}

/// Creates decorations in the host editor.
pub trait DecorationBinder {
    /// Build a decoration. Failures leave the previous decorations in place.
    fn create(&mut self, request: &DecorationRequest) -> anyhow::Result<DecorationHandle>;

    /// Dispose of a handle that is no longer used.
    fn release(&mut self, _handle: DecorationHandle) {}
}

/// Lines (zero-based) carrying each decoration in one file.
pub type DecorationMap = BTreeMap<DecorationHandle, Vec<u32>>;

/// The editor side of decoration rendering.
pub trait EditorHost {
    /// Paths of files currently shown in an editor.
    fn visible_files(&self) -> Vec<String>;

    /// Replace all bookmark decorations of `path`.
    fn apply_decorations(&mut self, path: &str, decorations: &DecorationMap);
}

/// Handle cache key: one decoration per group, role and label.
type HandleKey = (GroupId, DecorationRole, Option<String>);

/// Consumes decoration events and pushes rebuilt maps to the host.
#[derive(Debug)]
pub struct DecorationRefresher {
    events: DecorationEvents,
    handles: HashMap<HandleKey, DecorationHandle>,
    file_maps: KeyedCache<String, DecorationMap>,
    /// Files whose map must be rebuilt and re-applied
    dirty_files: BTreeSet<String>,
    /// Every visible file must be re-applied
    all_dirty: bool,
    /// Files visible at the last refresh
    shown: BTreeSet<String>,
}

impl DecorationRefresher {
    pub fn new(events: DecorationEvents) -> Self {
        Self {
            events,
            handles: HashMap::new(),
            file_maps: KeyedCache::new(),
            dirty_files: BTreeSet::new(),
            // Nothing has been applied yet.
            all_dirty: true,
            shown: BTreeSet::new(),
        }
    }

    /// Cached map for `path` from the last refresh, if any.
    pub fn decorations_for(&self, path: &str) -> Option<&DecorationMap> {
        self.file_maps.get(path)
    }

    /// Force `path` to be rebuilt on the next refresh.
    pub fn invalidate_file(&mut self, path: &str) {
        self.file_maps.invalidate(path);
        self.dirty_files.insert(path.to_string());
    }

    /// Number of live handles.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Drain pending events and re-apply decorations of dirty visible files.
    ///
    /// Files that became visible since the last call are re-applied too, from
    /// the cached map when nothing changed, since a newly opened editor starts
    /// without decorations. Returns the number of files updated. Files whose
    /// decorations could not be built stay dirty and are retried on the next
    /// call.
    pub fn refresh(
        &mut self,
        store: &BookmarkStore,
        registry: &GroupRegistry,
        config: &BookmarkConfig,
        binder: &mut dyn DecorationBinder,
        host: &mut dyn EditorHost,
    ) -> usize {
        for event in self.events.drain() {
            self.handle_event(event, binder);
        }

        let visible = host.visible_files();
        let targets: Vec<String> = if self.all_dirty {
            visible.clone()
        } else {
            visible
                .iter()
                .filter(|p| self.dirty_files.contains(*p) || !self.shown.contains(*p))
                .cloned()
                .collect()
        };
        self.shown = visible.into_iter().collect();

        let mut updated = 0;
        let mut failed = false;
        for path in targets {
            if !self.all_dirty
                && !self.dirty_files.contains(&path)
                && let Some(map) = self.file_maps.get(path.as_str())
            {
                host.apply_decorations(&path, map);
                updated += 1;
                continue;
            }
            match self.build_map(&path, store, registry, config, binder) {
                Some(map) => {
                    host.apply_decorations(&path, &map);
                    self.dirty_files.remove(&path);
                    self.file_maps.insert(path, map);
                    updated += 1;
                }
                None => {
                    self.dirty_files.insert(path);
                    failed = true;
                }
            }
        }
        if !failed {
            self.all_dirty = false;
        }

        if updated > 0 {
            log::trace!("Refreshed bookmark decorations of {} file(s)", updated);
        }
        updated
    }

    fn handle_event(&mut self, event: DecorationEvent, binder: &mut dyn DecorationBinder) {
        match event {
            DecorationEvent::FileChanged(path) => self.invalidate_file(&path),
            DecorationEvent::GroupStyleChanged(group) | DecorationEvent::GroupRemoved(group) => {
                self.release_group(group, binder);
                self.mark_all_dirty();
            }
            DecorationEvent::VisibilityChanged => self.mark_all_dirty(),
            DecorationEvent::StyleReset => {
                for (_, handle) in self.handles.drain() {
                    binder.release(handle);
                }
                self.mark_all_dirty();
            }
        }
    }

    fn mark_all_dirty(&mut self) {
        self.file_maps.clear();
        self.all_dirty = true;
    }

    fn release_group(&mut self, group: GroupId, binder: &mut dyn DecorationBinder) {
        let stale: Vec<HandleKey> = self
            .handles
            .keys()
            .filter(|(g, _, _)| *g == group)
            .cloned()
            .collect();
        for key in stale {
            if let Some(handle) = self.handles.remove(&key) {
                binder.release(handle);
            }
        }
    }

    /// Build the map for one file, or `None` if the binder failed.
    fn build_map(
        &mut self,
        path: &str,
        store: &BookmarkStore,
        registry: &GroupRegistry,
        config: &BookmarkConfig,
        binder: &mut dyn DecorationBinder,
    ) -> Option<DecorationMap> {
        let mut map = DecorationMap::new();
        for bookmark in store.in_file(path) {
            let Some(group) = registry.get(bookmark.group) else {
                continue;
            };
            if !group.is_visible {
                continue;
            }
            let role = if group.is_active {
                DecorationRole::Own
            } else {
                DecorationRole::GroupFallback
            };
            let label = match config.line_end_label {
                LineEndLabel::None => None,
                _ => bookmark.label.clone(),
            };
            let handle = self.handle_for(group, role, label, config, binder)?;
            map.entry(handle).or_default().push(bookmark.line);
        }
        Some(map)
    }

    fn handle_for(
        &mut self,
        group: &Group,
        role: DecorationRole,
        label: Option<String>,
        config: &BookmarkConfig,
        binder: &mut dyn DecorationBinder,
    ) -> Option<DecorationHandle> {
        let key = (group.id, role, label);
        if let Some(handle) = self.handles.get(&key) {
            return Some(*handle);
        }

        let request = DecorationRequest {
            shape: group.shape,
            color: group.color.clone(),
            icon_text: group.icon_text.clone(),
            label: key.2.clone(),
            role,
            ruler_lane: config.ruler_lane,
            line_end_label: config.line_end_label,
        };
        match binder.create(&request) {
            Ok(handle) => {
                self.handles.insert(key, handle);
                Some(handle)
            }
            Err(e) => {
                log::warn!("Failed to create decoration for group '{}': {:#}", group.name, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::Bookmark;
    use crate::events::decoration_channel;

    #[derive(Default)]
    struct FakeBinder {
        next: u64,
        created: Vec<DecorationRequest>,
        released: Vec<DecorationHandle>,
        fail: bool,
    }

    impl DecorationBinder for FakeBinder {
        fn create(&mut self, request: &DecorationRequest) -> anyhow::Result<DecorationHandle> {
            if self.fail {
                anyhow::bail!("binder unavailable");
            }
            self.next += 1;
            self.created.push(request.clone());
            Ok(DecorationHandle(self.next))
        }

        fn release(&mut self, handle: DecorationHandle) {
            self.released.push(handle);
        }
    }

    #[derive(Default)]
    struct FakeHost {
        files: Vec<String>,
        applied: Vec<(String, DecorationMap)>,
    }

    impl EditorHost for FakeHost {
        fn visible_files(&self) -> Vec<String> {
            self.files.clone()
        }

        fn apply_decorations(&mut self, path: &str, decorations: &DecorationMap) {
            self.applied.push((path.to_string(), decorations.clone()));
        }
    }

    struct Fixture {
        config: BookmarkConfig,
        registry: GroupRegistry,
        store: BookmarkStore,
        refresher: DecorationRefresher,
        binder: FakeBinder,
        host: FakeHost,
    }

    impl Fixture {
        fn new() -> Self {
            let (sink, events) = decoration_channel();
            let config = BookmarkConfig::default();
            Self {
                registry: GroupRegistry::new(&config, sink.clone()),
                store: BookmarkStore::new(sink),
                refresher: DecorationRefresher::new(events),
                binder: FakeBinder::default(),
                host: FakeHost {
                    files: vec!["a.rs".to_string()],
                    applied: Vec::new(),
                },
                config,
            }
        }

        fn refresh(&mut self) -> usize {
            self.refresher.refresh(
                &self.store,
                &self.registry,
                &self.config,
                &mut self.binder,
                &mut self.host,
            )
        }
    }

    #[test]
    fn test_refresh_applies_and_reuses_handles() {
        let mut fx = Fixture::new();
        let group = fx.registry.active_id();
        fx.store.add(Bookmark::new("a.rs", 1, 0, group));
        fx.store.add(Bookmark::new("a.rs", 4, 0, group));
        fx.store.add(Bookmark::new("hidden.rs", 2, 0, group));

        assert_eq!(fx.refresh(), 1);
        let (path, map) = fx.host.applied.last().unwrap();
        assert_eq!(path, "a.rs");
        assert_eq!(map.values().next().unwrap(), &vec![1, 4]);
        assert_eq!(fx.binder.created.len(), 1);
        assert_eq!(fx.binder.created[0].role, DecorationRole::Own);

        // Nothing dirty: nothing re-applied.
        assert_eq!(fx.refresh(), 0);

        fx.store.add(Bookmark::new("a.rs", 9, 0, group));
        assert_eq!(fx.refresh(), 1);
        assert_eq!(fx.binder.created.len(), 1);
        assert_eq!(
            fx.refresher.decorations_for("a.rs").unwrap().values().next().unwrap(),
            &vec![1, 4, 9]
        );
    }

    #[test]
    fn test_inactive_groups_use_fallback_and_hidden_groups_vanish() {
        let mut fx = Fixture::new();
        let default = fx.registry.active_id();
        let work = fx.registry.ensure_group("work").unwrap();
        fx.store.add(Bookmark::new("a.rs", 1, 0, default));
        fx.store.add(Bookmark::new("a.rs", 2, 0, work));

        fx.refresh();
        let roles: Vec<DecorationRole> = fx.binder.created.iter().map(|r| r.role).collect();
        assert!(roles.contains(&DecorationRole::Own));
        assert!(roles.contains(&DecorationRole::GroupFallback));

        fx.registry.set_hide_inactive(true);
        fx.refresh();
        let (_, map) = fx.host.applied.last().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.values().next().unwrap(), &vec![1]);
    }

    #[test]
    fn test_style_change_releases_group_handles() {
        let mut fx = Fixture::new();
        let group = fx.registry.active_id();
        fx.store.add(Bookmark::new("a.rs", 1, 0, group));
        fx.refresh();

        fx.registry.set_color(group, "#010203").unwrap();
        fx.refresh();
        assert_eq!(fx.binder.released, vec![DecorationHandle(1)]);
        assert_eq!(fx.binder.created.last().unwrap().color, "#010203");
        assert_eq!(fx.refresher.handle_count(), 1);
    }

    #[test]
    fn test_binder_failure_keeps_file_dirty() {
        let mut fx = Fixture::new();
        let group = fx.registry.active_id();
        fx.store.add(Bookmark::new("a.rs", 1, 0, group));

        fx.binder.fail = true;
        assert_eq!(fx.refresh(), 0);
        assert!(fx.host.applied.is_empty());

        fx.binder.fail = false;
        assert_eq!(fx.refresh(), 1);
    }

    #[test]
    fn test_reopened_file_is_reapplied_from_cache() {
        let mut fx = Fixture::new();
        let group = fx.registry.active_id();
        fx.store.add(Bookmark::new("a.rs", 1, 0, group));
        fx.store.add(Bookmark::new("b.rs", 3, 0, group));
        assert_eq!(fx.refresh(), 1);

        // b.rs opens without any bookmark change.
        fx.host.files.push("b.rs".to_string());
        assert_eq!(fx.refresh(), 1);
        let (path, map) = fx.host.applied.last().unwrap();
        assert_eq!(path, "b.rs");
        assert_eq!(map.values().next().unwrap(), &vec![3]);

        // a.rs closes and opens again: re-applied from the cached map.
        fx.host.files.retain(|p| p != "a.rs");
        assert_eq!(fx.refresh(), 0);
        fx.host.files.push("a.rs".to_string());
        assert_eq!(fx.refresh(), 1);
        let (path, map) = fx.host.applied.last().unwrap();
        assert_eq!(path, "a.rs");
        assert_eq!(map.values().next().unwrap(), &vec![1]);
        assert_eq!(fx.binder.created.len(), 1);
    }

    #[test]
    fn test_labels_get_their_own_decoration() {
        let mut fx = Fixture::new();
        let group = fx.registry.active_id();
        fx.store.add(Bookmark::new("a.rs", 1, 0, group).with_label(Some("a")));
        fx.store.add(Bookmark::new("a.rs", 2, 0, group));
        fx.refresh();

        assert_eq!(fx.binder.created.len(), 2);
        assert!(fx.binder.created.iter().any(|r| r.label.as_deref() == Some("a")));
    }
}
