//! Bookmark context: the command surface over one workspace.
//!
//! `BookmarkContext` owns the group registry, the bookmark store and the
//! persistence machinery. Every command runs to completion, marks the state
//! dirty for the debounced save and leaves decoration events on the channel
//! returned by [`BookmarkContext::new`].

use crate::bookmark::{Bookmark, BookmarkId, normalize_label, slot_char};
use crate::decoration::{DecorationBinder, DecorationRefresher, EditorHost};
use crate::error::{BookmarkError, Result};
use crate::events::{DecorationEvent, DecorationEvents, EventSink, decoration_channel};
use crate::group::GroupId;
use crate::navigator::Navigator;
use crate::persistence::{
    PersistenceManager, SaveOutcome, SaveScheduler, StorageChangeEvent, StorageWatcher,
};
use crate::reconcile::{EditReconciler, LineSource, ReconcileOutcome, TextChange};
use crate::registry::GroupRegistry;
use crate::store::{BookmarkStore, path_is_within};
use anyhow::Context as _;
use par_mark_config::{BookmarkConfig, Shape};
use std::path::Path;
use std::time::Instant;

/// Storage watcher debounce; bursts from one atomic write collapse into one event.
const STORAGE_EVENT_DEBOUNCE_MS: u64 = 100;

/// What a toggle command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleResult {
    Added(BookmarkId),
    Removed(BookmarkId),
    /// The bookmark on the line got a different label (and a new id).
    Relabeled { old: BookmarkId, new: BookmarkId },
}

/// Owns all bookmark state of one workspace.
#[derive(Debug)]
pub struct BookmarkContext {
    config: BookmarkConfig,
    registry: GroupRegistry,
    store: BookmarkStore,
    persistence: PersistenceManager,
    scheduler: SaveScheduler,
    events: EventSink,
    watcher: Option<StorageWatcher>,
}

impl BookmarkContext {
    /// Create an empty context. Call [`reload`](Self::reload) to read stored state.
    pub fn new(config: BookmarkConfig, workspace_root: &Path) -> (Self, DecorationEvents) {
        let (events, receiver) = decoration_channel();
        let context = Self {
            registry: GroupRegistry::new(&config, events.clone()),
            store: BookmarkStore::new(events.clone()),
            persistence: PersistenceManager::new(workspace_root, &config),
            scheduler: SaveScheduler::new(config.save_debounce_ms),
            events,
            watcher: None,
            config,
        };
        (context, receiver)
    }

    /// Create a context and load stored state. Load failures are logged and
    /// leave the context empty.
    pub fn open(config: BookmarkConfig, workspace_root: &Path) -> (Self, DecorationEvents) {
        let (mut context, receiver) = Self::new(config, workspace_root);
        match context.reload() {
            Ok(errors) => {
                for error in errors {
                    log::warn!("Partial bookmark load: {}", error);
                }
            }
            Err(e) => log::error!("Failed to load bookmarks: {}", e),
        }
        (context, receiver)
    }

    pub fn config(&self) -> &BookmarkConfig {
        &self.config
    }

    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    pub fn store(&self) -> &BookmarkStore {
        &self.store
    }

    pub fn persistence(&self) -> &PersistenceManager {
        &self.persistence
    }

    /// True when a debounced save is pending.
    pub fn has_unsaved_changes(&self) -> bool {
        self.scheduler.is_dirty()
    }

    fn touch(&mut self) {
        self.scheduler.mark_dirty(Instant::now());
    }

    /// Group named `name`, or the active group. Named groups are created on demand.
    fn target_group(&mut self, name: Option<&str>) -> Result<GroupId> {
        match name {
            Some(name) => self.registry.ensure_group(name),
            None => Ok(self.registry.active_id()),
        }
    }

    fn require_bookmark(&self, id: BookmarkId) -> Result<&Bookmark> {
        self.store.get(id).ok_or(BookmarkError::UnknownBookmark(id))
    }

    // ------------------------------------------------------------------------
    // Bookmark commands
    // ------------------------------------------------------------------------

    /// Add an unlabeled bookmark at `(file, line)` or remove the one there.
    pub fn toggle_bookmark(
        &mut self,
        file: &str,
        line: u32,
        column: u32,
        line_text: &str,
        group: Option<&str>,
    ) -> Result<ToggleResult> {
        let group = self.target_group(group)?;

        let result = match self.store.at(file, line, group).map(|b| b.id) {
            Some(id) => {
                self.store.remove(id);
                ToggleResult::Removed(id)
            }
            None => {
                let bookmark = Bookmark::new(file, line, column, group).with_line_text(line_text);
                ToggleResult::Added(self.store.add(bookmark))
            }
        };
        self.touch();
        Ok(result)
    }

    /// Toggle a labeled bookmark.
    ///
    /// A blank label behaves like [`toggle_bookmark`](Self::toggle_bookmark).
    /// The same label on the same line removes the bookmark; a different
    /// label relabels it. A single-character label is taken away from any
    /// other bookmark holding it in the same file and group.
    pub fn toggle_labeled_bookmark(
        &mut self,
        file: &str,
        line: u32,
        column: u32,
        line_text: &str,
        label: &str,
        group: Option<&str>,
    ) -> Result<ToggleResult> {
        let Some(label) = normalize_label(Some(label)) else {
            return self.toggle_bookmark(file, line, column, line_text, group);
        };
        let group = self.target_group(group)?;
        let existing = self
            .store
            .at(file, line, group)
            .map(|b| (b.id, b.label.clone()));

        if let Some((id, current)) = &existing
            && current.as_deref() == Some(label.as_str())
        {
            self.store.remove(*id);
            self.touch();
            return Ok(ToggleResult::Removed(*id));
        }

        let keep = existing.as_ref().map(|(id, _)| *id);
        self.release_slot(file, group, &label, keep);

        let bookmark = Bookmark::new(file, line, column, group)
            .with_label(Some(&label))
            .with_line_text(line_text);
        let result = match keep {
            Some(old) => match self.store.replace(old, bookmark) {
                Some(new) => ToggleResult::Relabeled { old, new },
                None => return Err(BookmarkError::UnknownBookmark(old)),
            },
            None => ToggleResult::Added(self.store.add(bookmark)),
        };
        self.touch();
        Ok(result)
    }

    /// Remove whichever bookmark other than `keep` holds the single-character
    /// `label` in `(file, group)`.
    fn release_slot(&mut self, file: &str, group: GroupId, label: &str, keep: Option<BookmarkId>) {
        let Some(slot) = slot_char(label) else {
            return;
        };
        let holder = self
            .store
            .with_slot_label(file, group, slot)
            .map(|b| b.id)
            .filter(|id| Some(*id) != keep);
        if let Some(holder) = holder {
            log::debug!("Label '{}' moves to a new line in {}", slot, file);
            self.store.remove(holder);
        }
    }

    pub fn delete_bookmark(&mut self, id: BookmarkId) -> Result<Bookmark> {
        let bookmark = self
            .store
            .remove(id)
            .ok_or(BookmarkError::UnknownBookmark(id))?;
        self.touch();
        Ok(bookmark)
    }

    /// Delete the bookmarks of `path`, in every group or just the named one.
    pub fn delete_bookmarks_of_file(&mut self, path: &str, group: Option<&str>) -> Result<usize> {
        let group = match group {
            Some(name) => Some(self.registry.require(name)?),
            None => None,
        };
        let removed = self
            .store
            .remove_where(|b| b.file_path == path && group.is_none_or(|g| g == b.group))
            .len();
        if removed > 0 {
            self.touch();
        }
        Ok(removed)
    }

    /// Change a bookmark's label. Returns the (new) id of the bookmark.
    pub fn relabel(&mut self, id: BookmarkId, label: Option<&str>) -> Result<BookmarkId> {
        let current = self.require_bookmark(id)?;
        let label = normalize_label(label);
        if current.label == label {
            return Ok(id);
        }

        let mut bookmark = current.clone();
        bookmark.label = label;
        if let Some(label) = &bookmark.label {
            self.release_slot(&bookmark.file_path, bookmark.group, label, Some(id));
        }

        let new = self
            .store
            .replace(id, bookmark)
            .ok_or(BookmarkError::UnknownBookmark(id))?;
        self.touch();
        Ok(new)
    }

    /// Move bookmarks into the group named `target` (created if needed).
    ///
    /// A bookmark whose line is already taken in the target group stays
    /// where it is. A single-character label already used in the target
    /// group for that file is dropped. Returns the ids of the moved bookmarks;
    /// when none can move, nothing changes (the target is not created) and
    /// `NoDestinationAvailable` is returned.
    pub fn move_bookmarks(&mut self, ids: &[BookmarkId], target: &str) -> Result<Vec<BookmarkId>> {
        if let Some(unknown) = ids.iter().find(|id| self.store.get(**id).is_none()) {
            return Err(BookmarkError::UnknownBookmark(*unknown));
        }

        let existing = self.registry.by_name(target).map(|g| g.id);
        let eligible: Vec<BookmarkId> = ids
            .iter()
            .copied()
            .filter(|&id| match (self.store.get(id), existing) {
                (Some(source), Some(dst)) => {
                    if source.group == dst {
                        return false;
                    }
                    let blocked = self.store.at(&source.file_path, source.line, dst).is_some();
                    if blocked {
                        log::info!(
                            "Not moving bookmark {}:{}: line already marked in '{}'",
                            source.file_path,
                            source.line,
                            target
                        );
                    }
                    !blocked
                }
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect();
        if eligible.is_empty() {
            return Err(BookmarkError::NoDestinationAvailable(format!(
                "no selected bookmark can move to '{}'",
                target
            )));
        }

        let dst = self.registry.ensure_group(target)?;
        let mut moved = Vec::new();
        for id in eligible {
            let Some(source) = self.store.get(id) else {
                continue;
            };
            // Two selected bookmarks on the same line: only the first moves.
            if self.store.at(&source.file_path, source.line, dst).is_some() {
                continue;
            }

            let mut bookmark = source.clone();
            bookmark.group = dst;
            if let Some(slot) = bookmark.slot()
                && self.store.with_slot_label(&bookmark.file_path, dst, slot).is_some()
            {
                log::info!("Label '{}' already used in '{}', dropping it", slot, target);
                bookmark.label = None;
            }
            if let Some(new) = self.store.replace(id, bookmark) {
                moved.push(new);
            }
        }

        self.touch();
        Ok(moved)
    }

    // ------------------------------------------------------------------------
    // Group commands
    // ------------------------------------------------------------------------

    pub fn rename_group(&mut self, name: &str, new_name: &str) -> Result<()> {
        let id = self.registry.require(name)?;
        self.registry.rename(id, new_name)?;
        self.touch();
        Ok(())
    }

    /// Delete groups with all their bookmarks. Returns the bookmarks removed.
    pub fn delete_groups(&mut self, names: &[&str]) -> Result<usize> {
        let ids = names
            .iter()
            .map(|name| self.registry.require(name))
            .collect::<Result<Vec<GroupId>>>()?;
        let removed = self.registry.delete(&mut self.store, &ids)?;
        self.touch();
        Ok(removed)
    }

    /// Activate the named group, creating it if it does not exist.
    pub fn set_active_group(&mut self, name: &str) -> Result<GroupId> {
        let id = self.registry.set_active(name)?;
        self.touch();
        Ok(id)
    }

    pub fn set_hide_all(&mut self, hide_all: bool) {
        self.registry.set_hide_all(hide_all);
        self.touch();
    }

    pub fn set_hide_inactive(&mut self, hide_inactive_groups: bool) {
        self.registry.set_hide_inactive(hide_inactive_groups);
        self.touch();
    }

    /// Recolor a group. `color` is a palette color name or a `#rrggbb` value.
    pub fn set_group_color(&mut self, name: &str, color: &str) -> Result<()> {
        let id = self.registry.require(name)?;
        let color = self.config.color_named(color).unwrap_or(color);
        self.registry.set_color(id, color)?;
        self.touch();
        Ok(())
    }

    /// Change a group's marker. For `Shape::Unicode`, `icon_text` may name a
    /// configured marker instead of giving the glyph itself.
    pub fn set_group_shape(&mut self, name: &str, shape: Shape, icon_text: Option<&str>) -> Result<()> {
        let id = self.registry.require(name)?;
        let icon_text = icon_text.map(|text| self.config.glyph_named(text).unwrap_or(text));
        self.registry.set_shape(id, shape, icon_text)?;
        self.touch();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    fn navigator(&self) -> Navigator<'_> {
        Navigator::new(&self.store, &self.registry)
    }

    pub fn next_bookmark(&self, path: &str, line: u32) -> Result<&Bookmark> {
        self.navigator().next(path, line)
    }

    pub fn previous_bookmark(&self, path: &str, line: u32) -> Result<&Bookmark> {
        self.navigator().previous(path, line)
    }

    pub fn next_bookmark_in_file(&self, path: &str, line: u32) -> Result<&Bookmark> {
        self.navigator().next_in_file(path, line)
    }

    pub fn previous_bookmark_in_file(&self, path: &str, line: u32) -> Result<&Bookmark> {
        self.navigator().previous_in_file(path, line)
    }

    /// Closest bookmark to `line` in `path`, optionally within one group.
    pub fn nearest_bookmark(&self, path: &str, line: u32, group: Option<&str>) -> Result<Option<&Bookmark>> {
        let group = match group {
            Some(name) => Some(self.registry.require(name)?),
            None => None,
        };
        Ok(self.navigator().nearest_in_file(path, line, group))
    }

    /// Flag a bookmark whose target could not be opened.
    pub fn mark_failed_jump(&mut self, id: BookmarkId) -> Result<()> {
        if !self.store.set_failed_jump(id, true) {
            return Err(BookmarkError::UnknownBookmark(id));
        }
        let bookmark = self.require_bookmark(id)?;
        log::info!(
            "Jump to {}:{} failed, skipping it until flags are cleared",
            bookmark.file_path,
            bookmark.line
        );
        Ok(())
    }

    /// Verify that a bookmark's file still exists before jumping to it.
    ///
    /// A missing file flags the bookmark and yields `NavigationFailure`.
    pub fn check_jump(&mut self, id: BookmarkId) -> Result<&Bookmark> {
        let (reachable, path, line) = {
            let bookmark = self.require_bookmark(id)?;
            (
                Path::new(&bookmark.file_path).is_file(),
                bookmark.file_path.clone(),
                bookmark.line,
            )
        };
        if reachable {
            return self.require_bookmark(id);
        }
        self.mark_failed_jump(id)?;
        Err(BookmarkError::NavigationFailure { path, line })
    }

    pub fn clear_failed_jump_flags(&mut self) -> usize {
        let cleared = self.store.clear_failed_jumps();
        if cleared > 0 {
            log::debug!("Cleared {} failed jump flags", cleared);
        }
        cleared
    }

    pub fn search(&self, query: &str) -> Vec<&Bookmark> {
        self.store.search(query)
    }

    /// Bookmarks whose file is outside the workspace root.
    pub fn outside_workspace(&self) -> Vec<&Bookmark> {
        self.store
            .iter_ordered()
            .filter(|b| !self.persistence.is_in_workspace(&b.file_path))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------------

    /// Reconcile bookmarks of `path` with one buffer-edit event.
    pub fn apply_edit<D: LineSource + ?Sized>(
        &mut self,
        path: &str,
        changes: &[TextChange],
        document: &D,
    ) -> ReconcileOutcome {
        let outcome = EditReconciler::new(&mut self.store, path, document).apply(changes);
        if outcome.is_changed() {
            self.touch();
        }
        outcome
    }

    /// A file or directory was renamed.
    pub fn on_file_renamed(&mut self, old: &str, new: &str) -> usize {
        let updated = self.store.rename_file(old, new);
        if updated > 0 {
            self.touch();
        }
        updated
    }

    /// A file or directory was deleted.
    pub fn on_file_deleted(&mut self, path: &str) -> usize {
        let removed = self
            .store
            .remove_where(|b| path_is_within(&b.file_path, path))
            .len();
        if removed > 0 {
            log::info!("Removed {} bookmarks of deleted {}", removed, path);
            self.touch();
        }
        removed
    }

    /// Adopt a new configuration. Style changes re-derive every decoration.
    pub fn apply_config(&mut self, config: BookmarkConfig) {
        let restyle = self.config.style_differs(&config);
        self.registry.apply_config(&config);
        self.persistence.apply_config(&config);
        self.scheduler.set_debounce_ms(config.save_debounce_ms);
        self.config = config;
        if restyle {
            log::debug!("Bookmark style settings changed");
            self.events.emit(DecorationEvent::StyleReset);
        }
    }

    /// Push decorations of dirty visible files to the host.
    pub fn refresh_decorations(
        &self,
        refresher: &mut DecorationRefresher,
        binder: &mut dyn DecorationBinder,
        host: &mut dyn EditorHost,
    ) -> usize {
        refresher.refresh(&self.store, &self.registry, &self.config, binder, host)
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Save immediately, dropping any pending debounced save.
    pub fn save_now(&mut self) -> Result<SaveOutcome> {
        let outcome = self.persistence.save(&self.store, &self.registry)?;
        self.scheduler.clear();
        Ok(outcome)
    }

    /// Save if the debounce window since the last mutation has passed.
    pub fn poll_autosave(&mut self, now: Instant) -> Result<Option<SaveOutcome>> {
        if !self.scheduler.take_due(now) {
            return Ok(None);
        }
        self.save_now().map(Some)
    }

    /// Run a pending debounced save right away (e.g. on shutdown).
    pub fn flush(&mut self) -> Result<Option<SaveOutcome>> {
        if !self.scheduler.is_dirty() {
            return Ok(None);
        }
        self.save_now().map(Some)
    }

    /// Replace in-memory state with the stored one.
    ///
    /// A missing artifact resets to a fresh default state. On a version
    /// mismatch or unreadable file the current state is kept and the error
    /// returned. Collections that had to be discarded are returned.
    pub fn reload(&mut self) -> Result<Vec<BookmarkError>> {
        let errors = match self.persistence.load(&self.config, self.events.clone())? {
            Some(loaded) => {
                self.registry = loaded.registry;
                self.store = loaded.store;
                loaded.errors
            }
            None => {
                self.registry = GroupRegistry::new(&self.config, self.events.clone());
                self.store = BookmarkStore::new(self.events.clone());
                Vec::new()
            }
        };
        self.scheduler.clear();
        self.events.emit(DecorationEvent::StyleReset);
        Ok(errors)
    }

    /// Start watching the storage artifact for external changes.
    pub fn watch_storage(&mut self) -> anyhow::Result<()> {
        let watcher = StorageWatcher::new(self.persistence.storage_path(), STORAGE_EVENT_DEBOUNCE_MS)
            .context("Failed to watch bookmark storage")?;
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Drain storage change events and reload when one is not self-triggered.
    ///
    /// Returns true when a reload happened.
    pub fn poll_storage_changes(&mut self) -> Result<bool> {
        let Some(watcher) = &self.watcher else {
            return Ok(false);
        };
        let changes: Vec<StorageChangeEvent> = std::iter::from_fn(|| watcher.try_recv()).collect();
        self.apply_storage_changes(&changes)
    }

    /// Reload for observed storage changes unless all of them fall inside
    /// the guard window after our own last save.
    ///
    /// With unsaved local changes the in-memory state is kept; the pending
    /// save then overwrites the file. Returns true when a reload happened.
    pub fn apply_storage_changes(&mut self, changes: &[StorageChangeEvent]) -> Result<bool> {
        if changes.is_empty() {
            return Ok(false);
        }
        if !changes
            .iter()
            .any(|change| self.persistence.should_reload_at(change.at))
        {
            log::debug!("Ignoring bookmark storage change inside the reload guard window");
            return Ok(false);
        }
        if self.scheduler.is_dirty() {
            log::warn!(
                "Bookmark storage {} changed on disk while local changes are unsaved; keeping local state",
                self.persistence.storage_path().display()
            );
            return Ok(false);
        }

        log::info!("Bookmark storage changed on disk, reloading");
        for error in self.reload()? {
            log::warn!("Partial bookmark reload: {}", error);
        }
        Ok(true)
    }
}
