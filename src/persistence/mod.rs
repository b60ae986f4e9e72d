//! Bookmark state persistence.
//!
//! State lives in one JSON artifact under the workspace (by default
//! `<workspace>/.par-mark/bookmarks.json`). Saving an empty state removes the
//! artifact instead of writing it. Every save records a timestamp so that the
//! storage watcher does not reload what was just written.
//!
//! Sub-modules:
//! - [`format`]: serde shapes of the artifact
//! - [`scheduler`]: debounced save scheduling
//! - [`watcher`]: `notify`-based watcher for external changes

pub mod format;
pub mod scheduler;
pub mod watcher;

use crate::bookmark::Bookmark;
use crate::error::{BookmarkError, Result};
use crate::events::EventSink;
use crate::group::DEFAULT_GROUP_NAME;
use crate::registry::{GroupRegistry, GroupSeed};
use crate::store::BookmarkStore;
use format::{FILE_VERSION, RawState, StoredBookmark, StoredGroup, StoredState};
use par_mark_config::{BookmarkConfig, normalize_color};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub use scheduler::SaveScheduler;
pub use watcher::{StorageChangeEvent, StorageChangeKind, StorageWatcher};

/// Result of a [`PersistenceManager::save`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The artifact was written.
    Written { bookmarks: usize, groups: usize },
    /// The state was empty and the artifact was deleted.
    Removed,
    /// The state was empty and there was no artifact to delete.
    Skipped,
}

/// State rebuilt from the artifact.
#[derive(Debug)]
pub struct LoadedState {
    pub registry: GroupRegistry,
    pub store: BookmarkStore,
    /// Collections that failed to parse and were discarded.
    pub errors: Vec<BookmarkError>,
}

/// Reads and writes the storage artifact for one workspace.
#[derive(Debug)]
pub struct PersistenceManager {
    workspace_root: PathBuf,
    storage_path: PathBuf,
    reload_guard: Duration,
    last_save: Option<Instant>,
}

impl PersistenceManager {
    pub fn new(workspace_root: &Path, config: &BookmarkConfig) -> Self {
        Self {
            workspace_root: workspace_root.to_path_buf(),
            storage_path: config.storage_path(workspace_root),
            reload_guard: Duration::from_millis(config.reload_guard_ms),
            last_save: None,
        }
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Pick up a changed storage location or guard window.
    pub fn apply_config(&mut self, config: &BookmarkConfig) {
        self.storage_path = config.storage_path(&self.workspace_root);
        self.reload_guard = Duration::from_millis(config.reload_guard_ms);
    }

    /// When the artifact was last written or removed by this manager.
    pub fn last_save(&self) -> Option<Instant> {
        self.last_save
    }

    /// True when a storage change seen now should trigger a reload.
    pub fn should_reload(&self) -> bool {
        self.should_reload_at(Instant::now())
    }

    /// True when more than the guard window has passed since the last save.
    pub fn should_reload_at(&self, now: Instant) -> bool {
        self.last_save
            .is_none_or(|saved| now.saturating_duration_since(saved) > self.reload_guard)
    }

    // ------------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------------

    /// Write the current state, or delete the artifact if the state is empty.
    pub fn save(&mut self, store: &BookmarkStore, registry: &GroupRegistry) -> Result<SaveOutcome> {
        if store.is_empty_state(registry) {
            return self.remove_artifact();
        }

        let state = self.snapshot(store, registry);
        let json = serde_json::to_string_pretty(&state)?;

        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Atomic save: write to temp file then rename
        let temp_path = self.storage_path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.storage_path)?;
        self.last_save = Some(Instant::now());

        log::info!(
            "Saved {} bookmarks in {} groups to {:?}",
            state.bookmarks.len(),
            state.groups.len(),
            self.storage_path
        );
        Ok(SaveOutcome::Written {
            bookmarks: state.bookmarks.len(),
            groups: state.groups.len(),
        })
    }

    fn remove_artifact(&mut self) -> Result<SaveOutcome> {
        if !self.storage_path.exists() {
            return Ok(SaveOutcome::Skipped);
        }

        fs::remove_file(&self.storage_path)?;
        self.last_save = Some(Instant::now());

        if let Some(parent) = self.storage_path.parent()
            && parent != self.workspace_root.as_path()
            && fs::read_dir(parent).is_ok_and(|mut entries| entries.next().is_none())
        {
            if let Err(e) = fs::remove_dir(parent) {
                log::debug!("Could not remove empty storage directory {:?}: {}", parent, e);
            }
        }

        log::info!("No bookmarks left, removed {:?}", self.storage_path);
        Ok(SaveOutcome::Removed)
    }

    fn snapshot(&self, store: &BookmarkStore, registry: &GroupRegistry) -> StoredState {
        let bookmarks = store
            .iter_ordered()
            .map(|b| StoredBookmark {
                file_path: self.relativize(&b.file_path),
                line: b.line,
                column: b.column,
                label: b.label.clone(),
                line_text: b.line_text.clone(),
                group_name: registry
                    .get(b.group)
                    .map_or_else(|| DEFAULT_GROUP_NAME.to_string(), |g| g.name.clone()),
            })
            .collect();

        let groups = registry
            .groups_by_name()
            .into_iter()
            .map(|g| StoredGroup {
                name: g.name.clone(),
                color: g.color.clone(),
                shape: g.shape,
                icon_text: g.icon_text.clone(),
            })
            .collect();

        StoredState {
            file_version: FILE_VERSION.to_string(),
            bookmarks,
            groups,
            active_group: registry.active_name().to_string(),
            hide_inactive_groups: registry.hide_inactive_groups(),
            hide_all: registry.hide_all(),
        }
    }

    // ------------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------------

    /// Read the artifact and rebuild registry and store from it.
    ///
    /// Returns `Ok(None)` when there is no artifact (or it is blank). A
    /// version mismatch or an unreadable envelope is an error and nothing is
    /// rebuilt; a malformed `groups` or `bookmarks` collection is discarded
    /// and reported in [`LoadedState::errors`].
    pub fn load(&self, config: &BookmarkConfig, events: EventSink) -> Result<Option<LoadedState>> {
        if !self.storage_path.exists() {
            log::debug!("No bookmark storage at {:?}", self.storage_path);
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.storage_path)?;
        if contents.trim().is_empty() {
            log::debug!("Bookmark storage {:?} is empty", self.storage_path);
            return Ok(None);
        }

        let raw: RawState = serde_json::from_str(&contents)?;
        let found = raw.file_version.clone().unwrap_or_default();
        if found != FILE_VERSION {
            log::warn!(
                "Ignoring bookmark storage {:?}: version '{}' (expected '{}')",
                self.storage_path,
                found,
                FILE_VERSION
            );
            return Err(BookmarkError::LoadVersionMismatch {
                expected: FILE_VERSION.to_string(),
                found,
            });
        }

        let mut errors = Vec::new();

        let stored_groups: Vec<StoredGroup> = parse_collection(raw.groups, "groups", &mut errors);
        let seeds = stored_groups.into_iter().map(seed_from_stored).collect();

        let active_group = raw
            .active_group
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_GROUP_NAME);
        let hide_inactive = flag(raw.hide_inactive_groups.as_ref());
        let hide_all = flag(raw.hide_all.as_ref());

        let mut registry = GroupRegistry::restore(
            config,
            events.clone(),
            seeds,
            active_group,
            hide_inactive,
            hide_all,
        );

        let stored_bookmarks: Vec<StoredBookmark> =
            parse_collection(raw.bookmarks, "bookmarks", &mut errors);
        let mut store = BookmarkStore::new(events);
        for stored in stored_bookmarks {
            self.restore_bookmark(&mut store, &mut registry, stored);
        }

        log::info!(
            "Loaded {} bookmarks in {} groups from {:?}",
            store.len(),
            registry.len(),
            self.storage_path
        );
        Ok(Some(LoadedState {
            registry,
            store,
            errors,
        }))
    }

    fn restore_bookmark(
        &self,
        store: &mut BookmarkStore,
        registry: &mut GroupRegistry,
        stored: StoredBookmark,
    ) {
        let group_name = if stored.group_name.trim().is_empty() {
            DEFAULT_GROUP_NAME
        } else {
            stored.group_name.as_str()
        };
        let group = match registry.ensure_group(group_name) {
            Ok(group) => group,
            Err(e) => {
                log::warn!("Skipping stored bookmark at {}:{}: {}", stored.file_path, stored.line, e);
                return;
            }
        };

        let path = self.resolve(&stored.file_path);
        if store.at(&path, stored.line, group).is_some() {
            log::warn!("Skipping duplicate stored bookmark at {}:{}", path, stored.line);
            return;
        }

        let mut bookmark = Bookmark::new(path, stored.line, stored.column, group)
            .with_label(stored.label.as_deref())
            .with_line_text(&stored.line_text);
        if let Some(slot) = bookmark.slot()
            && store.with_slot_label(&bookmark.file_path, group, slot).is_some()
        {
            log::warn!(
                "Stored label '{}' is already used in {}, dropping it",
                slot,
                bookmark.file_path
            );
            bookmark.label = None;
        }
        store.add(bookmark);
    }

    // ------------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------------

    /// Path as stored: relative when under the workspace root.
    pub fn relativize(&self, path: &str) -> String {
        match Path::new(path).strip_prefix(&self.workspace_root) {
            Ok(relative) if !relative.as_os_str().is_empty() => {
                relative.to_string_lossy().replace('\\', "/")
            }
            _ => path.to_string(),
        }
    }

    /// Stored path back to a buffer path: relative entries are joined to the root.
    pub fn resolve(&self, stored: &str) -> String {
        let path = Path::new(stored);
        if path.is_absolute() {
            stored.to_string()
        } else {
            self.workspace_root.join(path).to_string_lossy().into_owned()
        }
    }

    /// True when `path` lies under the workspace root.
    pub fn is_in_workspace(&self, path: &str) -> bool {
        Path::new(path).starts_with(&self.workspace_root)
    }
}

/// Decode one collection, recording a [`BookmarkError::LoadParse`] on failure.
fn parse_collection<T: serde::de::DeserializeOwned>(
    value: Option<Value>,
    collection: &'static str,
    errors: &mut Vec<BookmarkError>,
) -> Vec<T> {
    let Some(value) = value else {
        return Vec::new();
    };
    match serde_json::from_value::<Vec<T>>(value) {
        Ok(items) => items,
        Err(source) => {
            let error = BookmarkError::LoadParse { collection, source };
            log::warn!("{}", error);
            errors.push(error);
            Vec::new()
        }
    }
}

fn seed_from_stored(group: StoredGroup) -> GroupSeed {
    let color = normalize_color(&group.color);
    if color.is_none() {
        log::warn!(
            "Stored group '{}' has invalid color '{}', assigning a palette color",
            group.name,
            group.color
        );
    }
    GroupSeed {
        name: group.name,
        color,
        shape: group.shape,
        icon_text: group.icon_text,
    }
}

fn flag(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::decoration_channel;
    use tempfile::tempdir;

    fn manager(root: &Path) -> PersistenceManager {
        PersistenceManager::new(root, &BookmarkConfig::default())
    }

    #[test]
    fn test_relativize_and_resolve() {
        let manager = manager(Path::new("/work/project"));
        assert_eq!(manager.relativize("/work/project/src/lib.rs"), "src/lib.rs");
        assert_eq!(manager.relativize("/elsewhere/x.rs"), "/elsewhere/x.rs");
        assert_eq!(manager.resolve("src/lib.rs"), "/work/project/src/lib.rs");
        assert_eq!(manager.resolve("/elsewhere/x.rs"), "/elsewhere/x.rs");
        assert!(manager.is_in_workspace("/work/project/a.rs"));
        assert!(!manager.is_in_workspace("/work/projectx/a.rs"));
    }

    #[test]
    fn test_guard_window() {
        let temp = tempdir().unwrap();
        let mut manager = manager(temp.path());
        assert!(manager.should_reload());

        let (sink, _events) = decoration_channel();
        let config = BookmarkConfig::default();
        let mut registry = GroupRegistry::new(&config, sink.clone());
        registry.ensure_group("work").unwrap();
        let store = BookmarkStore::new(sink);
        manager.save(&store, &registry).unwrap();

        let saved = manager.last_save().unwrap();
        assert!(!manager.should_reload_at(saved + Duration::from_millis(1999)));
        assert!(manager.should_reload_at(saved + Duration::from_millis(2001)));
    }

    #[test]
    fn test_load_missing_or_blank() {
        let temp = tempdir().unwrap();
        let manager = manager(temp.path());
        let (sink, _events) = decoration_channel();
        assert!(manager.load(&BookmarkConfig::default(), sink.clone()).unwrap().is_none());

        fs::create_dir_all(manager.storage_path().parent().unwrap()).unwrap();
        fs::write(manager.storage_path(), "  \n").unwrap();
        assert!(manager.load(&BookmarkConfig::default(), sink).unwrap().is_none());
    }

    #[test]
    fn test_seed_with_invalid_color_gets_none() {
        let seed = seed_from_stored(StoredGroup {
            name: "g".to_string(),
            color: "bogus".to_string(),
            shape: Default::default(),
            icon_text: String::new(),
        });
        assert_eq!(seed.color, None);

        let seed = seed_from_stored(StoredGroup {
            name: "g".to_string(),
            color: "#ABCDEF".to_string(),
            shape: Default::default(),
            icon_text: String::new(),
        });
        assert_eq!(seed.color.as_deref(), Some("#abcdef"));
    }
}
