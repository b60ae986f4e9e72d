//! Ordered next/previous/nearest queries over bookmarks.
//!
//! Read-only: the navigator never mutates the store. Bookmarks flagged with a
//! failed jump are skipped by next/previous until the flags are cleared.

use crate::bookmark::Bookmark;
use crate::error::{BookmarkError, Result};
use crate::group::GroupId;
use crate::registry::GroupRegistry;
use crate::store::BookmarkStore;
use std::cmp::Ordering;

/// Direction of a step through an ordered bookmark list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Navigation queries bound to a store and registry snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    store: &'a BookmarkStore,
    registry: &'a GroupRegistry,
}

impl<'a> Navigator<'a> {
    pub fn new(store: &'a BookmarkStore, registry: &'a GroupRegistry) -> Self {
        Self { store, registry }
    }

    /// The active group's next bookmark after `(path, line)`, wrapping around.
    pub fn next(&self, path: &str, line: u32) -> Result<&'a Bookmark> {
        self.step_group(path, line, Direction::Forward)
    }

    /// The active group's previous bookmark before `(path, line)`, wrapping around.
    pub fn previous(&self, path: &str, line: u32) -> Result<&'a Bookmark> {
        self.step_group(path, line, Direction::Backward)
    }

    /// Like [`next`](Self::next) but restricted to the active group's
    /// bookmarks in `path`.
    pub fn next_in_file(&self, path: &str, line: u32) -> Result<&'a Bookmark> {
        self.step_file(path, line, Direction::Forward)
    }

    /// Like [`previous`](Self::previous) but restricted to `path`.
    pub fn previous_in_file(&self, path: &str, line: u32) -> Result<&'a Bookmark> {
        self.step_file(path, line, Direction::Backward)
    }

    /// The bookmark in `path` closest to `line`, optionally limited to one
    /// group. On equal distance the one above wins.
    pub fn nearest_in_file(&self, path: &str, line: u32, group: Option<GroupId>) -> Option<&'a Bookmark> {
        let mut before: Option<&'a Bookmark> = None;
        let mut after: Option<&'a Bookmark> = None;

        for bookmark in self.store.in_file(path) {
            if group.is_some_and(|g| g != bookmark.group) {
                continue;
            }
            if bookmark.line <= line {
                before = Some(bookmark);
            }
            if bookmark.line >= line && after.is_none() {
                after = Some(bookmark);
            }
        }

        match (before, after) {
            (Some(b), Some(a)) => {
                if line - b.line <= a.line - line {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        }
    }

    fn step_group(&self, path: &str, line: u32, direction: Direction) -> Result<&'a Bookmark> {
        let group = self.registry.active_id();
        step(&self.store.in_group(group), path, line, direction, self.registry.active_name())
    }

    fn step_file(&self, path: &str, line: u32, direction: Direction) -> Result<&'a Bookmark> {
        let group = self.registry.active_id();
        let candidates: Vec<&'a Bookmark> = self
            .store
            .in_file(path)
            .into_iter()
            .filter(|b| b.group == group)
            .collect();
        step(&candidates, path, line, direction, self.registry.active_name())
    }
}

/// Pick the neighbor of `(path, line)` in an ordered candidate list.
///
/// The first candidate strictly past the position in `direction` wins;
/// without one the walk wraps to the far end. Failed jumps never qualify.
fn step<'a>(
    candidates: &[&'a Bookmark],
    path: &str,
    line: u32,
    direction: Direction,
    group_name: &str,
) -> Result<&'a Bookmark> {
    if candidates.is_empty() {
        return Err(BookmarkError::NoDestinationAvailable(format!(
            "group '{}' has no bookmarks",
            group_name
        )));
    }

    let usable = |b: &&&'a Bookmark| !b.failed_jump;
    let found = match direction {
        Direction::Forward => candidates
            .iter()
            .filter(usable)
            .find(|b| b.cmp_position(path, line) == Ordering::Greater)
            .or_else(|| candidates.iter().find(usable)),
        Direction::Backward => candidates
            .iter()
            .rev()
            .filter(usable)
            .find(|b| b.cmp_position(path, line) == Ordering::Less)
            .or_else(|| candidates.iter().rev().find(usable)),
    };

    found
        .copied()
        .ok_or_else(|| BookmarkError::NoUsableBookmarks(group_name.to_string()))
}
