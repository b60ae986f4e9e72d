//! Bookmark collection with canonical ordering and per-file / per-group views.
//!
//! The store exclusively owns every [`Bookmark`]. The canonical order
//! (file path, line, column) is maintained on every insert and position
//! change; lookups never reorder. Per-file and per-group id lists are cached
//! and invalidated at each mutation site.

use crate::bookmark::{Bookmark, BookmarkId};
use crate::cache::KeyedCache;
use crate::events::EventSink;
use crate::group::GroupId;
use crate::registry::GroupRegistry;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// Owns all bookmarks of a workspace.
#[derive(Debug)]
pub struct BookmarkStore {
    bookmarks: HashMap<BookmarkId, Bookmark>,
    /// Ids in canonical order
    order: Vec<BookmarkId>,
    next_id: u64,
    by_file: RefCell<KeyedCache<String, Rc<[BookmarkId]>>>,
    by_group: RefCell<KeyedCache<GroupId, Rc<[BookmarkId]>>>,
    events: EventSink,
}

impl BookmarkStore {
    pub fn new(events: EventSink) -> Self {
        Self {
            bookmarks: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
            by_file: RefCell::new(KeyedCache::new()),
            by_group: RefCell::new(KeyedCache::new()),
            events,
        }
    }

    /// Number of bookmarks
    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    /// True when the store holds no bookmarks at all.
    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    /// True when there is nothing worth persisting: no bookmarks and only
    /// the uncustomized default group.
    pub fn is_empty_state(&self, registry: &GroupRegistry) -> bool {
        self.is_empty() && registry.is_pristine_default()
    }

    pub fn get(&self, id: BookmarkId) -> Option<&Bookmark> {
        self.bookmarks.get(&id)
    }

    /// Mutable access for position/text updates.
    ///
    /// Callers must follow up with [`positions_changed`](Self::positions_changed)
    /// or [`text_changed`](Self::text_changed) for the bookmark's file.
    pub(crate) fn get_mut(&mut self, id: BookmarkId) -> Option<&mut Bookmark> {
        self.bookmarks.get_mut(&id)
    }

    /// All bookmarks in canonical order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &Bookmark> {
        self.order.iter().filter_map(|id| self.bookmarks.get(id))
    }

    /// Insert a bookmark and return its newly assigned id.
    pub fn add(&mut self, mut bookmark: Bookmark) -> BookmarkId {
        let id = BookmarkId(self.next_id);
        self.next_id += 1;
        bookmark.id = id;

        let pos = self.insertion_point(&bookmark);
        self.order.insert(pos, id);
        self.invalidate(&bookmark.file_path, bookmark.group);
        self.events.file_changed(&bookmark.file_path);

        log::trace!(
            "Added bookmark {} at {}:{} in {}",
            id,
            bookmark.file_path,
            bookmark.line,
            bookmark.group
        );
        self.bookmarks.insert(id, bookmark);
        id
    }

    /// Delete a bookmark.
    pub fn remove(&mut self, id: BookmarkId) -> Option<Bookmark> {
        let bookmark = self.bookmarks.remove(&id)?;
        self.order.retain(|other| *other != id);
        self.invalidate(&bookmark.file_path, bookmark.group);
        self.events.file_changed(&bookmark.file_path);
        log::trace!("Removed bookmark {} from {}", id, bookmark.file_path);
        Some(bookmark)
    }

    /// Delete every bookmark matching `predicate`, returning them in canonical order.
    pub fn remove_where(&mut self, predicate: impl Fn(&Bookmark) -> bool) -> Vec<Bookmark> {
        let doomed: Vec<BookmarkId> = self
            .iter_ordered()
            .filter(|b| predicate(b))
            .map(|b| b.id)
            .collect();
        doomed.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Swap a bookmark for a new one as a single transaction.
    ///
    /// The old entry is removed and the replacement inserted with a fresh id;
    /// caches of both the old and new file/group are invalidated once.
    pub(crate) fn replace(&mut self, id: BookmarkId, mut replacement: Bookmark) -> Option<BookmarkId> {
        let old = self.bookmarks.remove(&id)?;
        self.order.retain(|other| *other != id);

        let new_id = BookmarkId(self.next_id);
        self.next_id += 1;
        replacement.id = new_id;

        let pos = self.insertion_point(&replacement);
        self.order.insert(pos, new_id);

        self.invalidate(&old.file_path, old.group);
        self.invalidate(&replacement.file_path, replacement.group);
        self.events.file_changed(&old.file_path);
        if replacement.file_path != old.file_path {
            self.events.file_changed(&replacement.file_path);
        }

        self.bookmarks.insert(new_id, replacement);
        Some(new_id)
    }

    /// Re-sort after line/column changes in `path` and invalidate its views.
    pub(crate) fn positions_changed(&mut self, path: &str) {
        self.sort();
        self.by_file.get_mut().invalidate(path);
        // A file's bookmarks can span every group; their relative order changed.
        self.by_group.get_mut().clear();
        self.events.file_changed(path);
    }

    /// Signal that cached line text changed without moving anything.
    pub(crate) fn text_changed(&mut self, path: &str) {
        self.events.file_changed(path);
    }

    /// Bookmarks of one file in canonical order.
    pub fn in_file(&self, path: &str) -> Vec<&Bookmark> {
        self.resolve(&self.file_ids(path))
    }

    /// Bookmarks of one group in canonical order.
    pub fn in_group(&self, group: GroupId) -> Vec<&Bookmark> {
        self.resolve(&self.group_ids(group))
    }

    /// First bookmark of `path` (canonical order) satisfying `predicate`.
    pub fn find_in_file(&self, path: &str, predicate: impl Fn(&Bookmark) -> bool) -> Option<&Bookmark> {
        self.file_ids(path)
            .iter()
            .filter_map(|id| self.bookmarks.get(id))
            .find(|b| predicate(b))
    }

    /// First bookmark of `group` (canonical order) satisfying `predicate`.
    pub fn find_in_group(&self, group: GroupId, predicate: impl Fn(&Bookmark) -> bool) -> Option<&Bookmark> {
        self.group_ids(group)
            .iter()
            .filter_map(|id| self.bookmarks.get(id))
            .find(|b| predicate(b))
    }

    /// The bookmark occupying `(path, line, group)`, if any.
    pub fn at(&self, path: &str, line: u32, group: GroupId) -> Option<&Bookmark> {
        self.find_in_file(path, |b| b.line == line && b.group == group)
    }

    /// The bookmark holding single-character label `slot` in `(path, group)`.
    pub fn with_slot_label(&self, path: &str, group: GroupId, slot: char) -> Option<&Bookmark> {
        self.find_in_file(path, |b| b.group == group && b.slot() == Some(slot))
    }

    /// Distinct file paths in canonical order.
    pub fn files(&self) -> Vec<&str> {
        let files: BTreeSet<&str> = self.bookmarks.values().map(|b| b.file_path.as_str()).collect();
        files.into_iter().collect()
    }

    /// Case-insensitive search over labels and line text, in canonical order.
    pub fn search(&self, query: &str) -> Vec<&Bookmark> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.iter_ordered().collect();
        }
        self.iter_ordered()
            .filter(|b| {
                b.line_text.to_lowercase().contains(&needle)
                    || b.label
                        .as_deref()
                        .is_some_and(|l| l.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Rewrite paths of bookmarks in `old` (a file, or a directory prefix) to `new`.
    ///
    /// Returns the number of bookmarks updated.
    pub fn rename_file(&mut self, old: &str, new: &str) -> usize {
        let mut touched: Vec<(String, GroupId)> = Vec::new();
        for bookmark in self.bookmarks.values_mut() {
            if let Some(renamed) = rebase_path(&bookmark.file_path, old, new) {
                touched.push((std::mem::replace(&mut bookmark.file_path, renamed), bookmark.group));
            }
        }
        if touched.is_empty() {
            return 0;
        }

        self.sort();
        self.by_file.get_mut().clear();
        self.by_group.get_mut().clear();
        let mut notified: BTreeSet<String> = BTreeSet::new();
        for (old_path, _) in &touched {
            if notified.insert(old_path.clone()) {
                self.events.file_changed(old_path);
            }
            if let Some(renamed) = rebase_path(old_path, old, new)
                && notified.insert(renamed.clone())
            {
                self.events.file_changed(&renamed);
            }
        }

        log::info!("Moved {} bookmarks from {} to {}", touched.len(), old, new);
        touched.len()
    }

    /// Set or clear the failed-jump flag. Returns false for unknown ids.
    pub fn set_failed_jump(&mut self, id: BookmarkId, failed: bool) -> bool {
        let Some(bookmark) = self.bookmarks.get_mut(&id) else {
            return false;
        };
        if bookmark.failed_jump != failed {
            bookmark.failed_jump = failed;
            let path = bookmark.file_path.clone();
            self.events.file_changed(&path);
        }
        true
    }

    /// Clear every failed-jump flag, returning how many were set.
    pub fn clear_failed_jumps(&mut self) -> usize {
        let mut files: BTreeSet<String> = BTreeSet::new();
        let mut cleared = 0;
        for bookmark in self.bookmarks.values_mut() {
            if bookmark.failed_jump {
                bookmark.failed_jump = false;
                files.insert(bookmark.file_path.clone());
                cleared += 1;
            }
        }
        for path in &files {
            self.events.file_changed(path);
        }
        cleared
    }

    fn resolve(&self, ids: &[BookmarkId]) -> Vec<&Bookmark> {
        ids.iter().filter_map(|id| self.bookmarks.get(id)).collect()
    }

    fn file_ids(&self, path: &str) -> Rc<[BookmarkId]> {
        let mut cache = self.by_file.borrow_mut();
        Rc::clone(cache.get_or_build(path, || {
            self.order
                .iter()
                .copied()
                .filter(|id| self.bookmarks.get(id).is_some_and(|b| b.file_path == path))
                .collect()
        }))
    }

    fn group_ids(&self, group: GroupId) -> Rc<[BookmarkId]> {
        let mut cache = self.by_group.borrow_mut();
        Rc::clone(cache.get_or_build(&group, || {
            self.order
                .iter()
                .copied()
                .filter(|id| self.bookmarks.get(id).is_some_and(|b| b.group == group))
                .collect()
        }))
    }

    fn invalidate(&mut self, path: &str, group: GroupId) {
        self.by_file.get_mut().invalidate(path);
        self.by_group.get_mut().invalidate(&group);
    }

    /// Index after every entry that sorts at or before `bookmark`, keeping
    /// the order stable for equal keys.
    fn insertion_point(&self, bookmark: &Bookmark) -> usize {
        self.order.partition_point(|id| {
            self.bookmarks
                .get(id)
                .is_some_and(|other| other.canonical_cmp(bookmark) != Ordering::Greater)
        })
    }

    fn sort(&mut self) {
        let bookmarks = &self.bookmarks;
        self.order.sort_by(|a, b| match (bookmarks.get(a), bookmarks.get(b)) {
            (Some(a), Some(b)) => a.canonical_cmp(b),
            _ => Ordering::Equal,
        });
    }
}

/// True when `path` is `dir` itself or lies beneath it.
pub(crate) fn path_is_within(path: &str, dir: &str) -> bool {
    match path.strip_prefix(dir) {
        Some("") => true,
        Some(rest) => rest.starts_with('/') || rest.starts_with('\\'),
        None => false,
    }
}

/// Map `path` from under `old` to under `new`, if it is affected.
fn rebase_path(path: &str, old: &str, new: &str) -> Option<String> {
    if !path_is_within(path, old) {
        return None;
    }
    Some(format!("{}{}", new, &path[old.len()..]))
}
