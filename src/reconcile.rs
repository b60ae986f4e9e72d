//! Keeps bookmark anchors attached to their lines while a buffer is edited.
//!
//! Each [`TextChange`] is classified by comparing the number of lines it
//! removes with the number it inserts:
//!
//! - equal counts: bookmarks inside the range stay put and get their text
//!   refreshed;
//! - net insertion: bookmarks below the edit shift down;
//! - net deletion: bookmarks on removed lines are deleted, the ones below
//!   shift up.
//!
//! Whether the first touched line itself moves or is deleted depends on the
//! post-edit text before the edit start: an all-whitespace prefix means the
//! edit replaced the whole line.

use crate::bookmark::BookmarkId;
use crate::store::BookmarkStore;
use std::collections::BTreeSet;

/// Zero-based line/character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// One replaced range of a buffer edit, in pre-edit coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub start: Position,
    pub end: Position,
    /// Replacement text; may span several lines.
    pub text: String,
}

impl TextChange {
    /// Replace `start..end` with `text`. Reversed ranges are normalized.
    pub fn new(start: Position, end: Position, text: impl Into<String>) -> Self {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Pure insertion at `at`.
    pub fn insert(at: Position, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }

    /// Pure deletion of `start..end`.
    pub fn delete(start: Position, end: Position) -> Self {
        Self::new(start, end, "")
    }

    /// Line breaks removed by this change.
    pub fn old_line_count(&self) -> u32 {
        self.end.line - self.start.line
    }

    /// Line breaks inserted by this change.
    pub fn new_line_count(&self) -> u32 {
        u32::try_from(self.text.matches('\n').count()).unwrap_or(u32::MAX)
    }
}

/// Read access to the post-edit document.
pub trait LineSource {
    /// Text of `line` without its line terminator, or `None` past the end.
    fn line(&self, line: u32) -> Option<&str>;
}

/// [`LineSource`] over an in-memory document.
#[derive(Debug, Clone)]
pub struct TextLines<'a> {
    lines: Vec<&'a str>,
}

impl<'a> TextLines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text
                .split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl LineSource for TextLines<'_> {
    fn line(&self, line: u32) -> Option<&str> {
        self.lines.get(line as usize).copied()
    }
}

impl LineSource for [String] {
    fn line(&self, line: u32) -> Option<&str> {
        self.get(line as usize).map(String::as_str)
    }
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Bookmarks whose line changed
    pub moved: Vec<BookmarkId>,
    /// Bookmarks whose cached text or column changed
    pub refreshed: Vec<BookmarkId>,
    /// Bookmarks removed because their line was deleted
    pub deleted: Vec<BookmarkId>,
}

impl ReconcileOutcome {
    pub fn is_changed(&self) -> bool {
        !(self.moved.is_empty() && self.refreshed.is_empty() && self.deleted.is_empty())
    }
}

/// Applies one buffer-edit event to the bookmarks of a single file.
pub struct EditReconciler<'a, D: LineSource + ?Sized> {
    store: &'a mut BookmarkStore,
    path: &'a str,
    document: &'a D,
    moved: BTreeSet<BookmarkId>,
    refreshed: BTreeSet<BookmarkId>,
    deleted: BTreeSet<BookmarkId>,
}

impl<'a, D: LineSource + ?Sized> EditReconciler<'a, D> {
    pub fn new(store: &'a mut BookmarkStore, path: &'a str, document: &'a D) -> Self {
        Self {
            store,
            path,
            document,
            moved: BTreeSet::new(),
            refreshed: BTreeSet::new(),
            deleted: BTreeSet::new(),
        }
    }

    /// Reconcile every change in event order, each against the positions
    /// left by the previous one.
    pub fn apply(mut self, changes: &[TextChange]) -> ReconcileOutcome {
        for change in changes {
            self.apply_change(change);
        }

        if !self.moved.is_empty() {
            self.store.positions_changed(self.path);
        } else if !self.refreshed.is_empty() {
            self.store.text_changed(self.path);
        }

        let outcome = ReconcileOutcome {
            moved: self.moved.difference(&self.deleted).copied().collect(),
            refreshed: self.refreshed.difference(&self.deleted).copied().collect(),
            deleted: self.deleted.into_iter().collect(),
        };
        if outcome.is_changed() {
            log::debug!(
                "Reconciled {} edit(s) in {}: {} moved, {} refreshed, {} deleted",
                changes.len(),
                self.path,
                outcome.moved.len(),
                outcome.refreshed.len(),
                outcome.deleted.len()
            );
        }
        outcome
    }

    fn apply_change(&mut self, change: &TextChange) {
        let first_line = change.start.line;
        let old_lines = change.old_line_count();
        let new_lines = change.new_line_count();
        let ids = self.file_ids();

        if new_lines == old_lines {
            for id in ids {
                if self.line_of(id).is_some_and(|l| (first_line..=change.end.line).contains(&l)) {
                    self.refresh(id);
                }
            }
            return;
        }

        let whitespace_prefix = self.prefix_is_whitespace(change.start);

        if new_lines > old_lines {
            let shift_down_by = new_lines - old_lines;
            let shift_down_from = if whitespace_prefix {
                first_line
            } else {
                first_line + 1
            };

            for &id in &ids {
                if let Some(bookmark) = self.store.get_mut(id)
                    && bookmark.line >= shift_down_from
                {
                    bookmark.line += shift_down_by;
                    self.moved.insert(id);
                }
            }
            self.refresh_range(&ids, first_line, first_line + new_lines);
        } else {
            let shift_up_by = old_lines - new_lines;
            let first_line_deletable = whitespace_prefix
                || !ids.iter().any(|&id| self.line_of(id) == Some(first_line));
            let delete_from = if first_line_deletable {
                first_line
            } else {
                first_line + 1
            };
            let shift_from = delete_from + shift_up_by;

            let mut survivors = Vec::with_capacity(ids.len());
            for id in ids {
                let Some(line) = self.line_of(id) else {
                    continue;
                };
                if line < first_line {
                    survivors.push(id);
                } else if (delete_from..shift_from).contains(&line) {
                    if self.store.remove(id).is_some() {
                        self.deleted.insert(id);
                    }
                } else {
                    if line >= shift_from
                        && let Some(bookmark) = self.store.get_mut(id)
                    {
                        bookmark.line -= shift_up_by;
                        self.moved.insert(id);
                    }
                    survivors.push(id);
                }
            }
            self.refresh_range(&survivors, first_line, first_line + new_lines);
        }
    }

    fn file_ids(&self) -> Vec<BookmarkId> {
        self.store.in_file(self.path).iter().map(|b| b.id).collect()
    }

    fn line_of(&self, id: BookmarkId) -> Option<u32> {
        self.store.get(id).map(|b| b.line)
    }

    fn refresh_range(&mut self, ids: &[BookmarkId], from: u32, to: u32) {
        for &id in ids {
            if self.line_of(id).is_some_and(|l| (from..=to).contains(&l)) {
                self.refresh(id);
            }
        }
    }

    /// Re-read the bookmark's line: trimmed text, column clamped to the line length.
    fn refresh(&mut self, id: BookmarkId) {
        let document = self.document;
        let Some(bookmark) = self.store.get_mut(id) else {
            return;
        };
        let Some(text) = document.line(bookmark.line) else {
            return;
        };

        let trimmed = text.trim();
        let max_column = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        let column = bookmark.column.min(max_column);

        if bookmark.line_text != trimmed || bookmark.column != column {
            bookmark.line_text = trimmed.to_string();
            bookmark.column = column;
            self.refreshed.insert(id);
        }
    }

    /// True when the post-edit text before `start` on its line is blank.
    fn prefix_is_whitespace(&self, start: Position) -> bool {
        self.document.line(start.line).is_none_or(|text| {
            text.chars()
                .take(start.character as usize)
                .all(char::is_whitespace)
        })
    }
}
