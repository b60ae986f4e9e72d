//! Bookmark model and canonical ordering.

use crate::group::GroupId;
use std::cmp::Ordering;
use std::fmt;

/// Store-assigned handle of a bookmark, stable until the bookmark is deleted.
///
/// Relabel and move commands recreate the bookmark and therefore hand out a
/// new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookmarkId(pub u64);

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A line annotation anchored to a position in a text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    /// Assigned by the store on insertion.
    pub id: BookmarkId,
    /// String identity of the owning buffer
    pub file_path: String,
    /// Zero-based line
    pub line: u32,
    /// Zero-based character offset within the line
    pub column: u32,
    /// Optional label; a single character acts as a per-file, per-group slot
    pub label: Option<String>,
    /// Trimmed text of the line when last observed
    pub line_text: String,
    /// Sticky flag set when navigating to this bookmark failed
    pub failed_jump: bool,
    pub group: GroupId,
}

impl Bookmark {
    /// Create an unlabeled bookmark. The id is assigned when it is added to a store.
    pub fn new(file_path: impl Into<String>, line: u32, column: u32, group: GroupId) -> Self {
        Self {
            id: BookmarkId(0),
            file_path: file_path.into(),
            line,
            column,
            label: None,
            line_text: String::new(),
            failed_jump: false,
            group,
        }
    }

    /// Set the label; empty or whitespace-only labels mean "no label".
    pub fn with_label(mut self, label: Option<&str>) -> Self {
        self.label = normalize_label(label);
        self
    }

    /// Set the cached line text (stored trimmed).
    pub fn with_line_text(mut self, text: &str) -> Self {
        self.line_text = text.trim().to_string();
        self
    }

    /// The single-character label slot held by this bookmark, if any.
    pub fn slot(&self) -> Option<char> {
        self.label.as_deref().and_then(slot_char)
    }

    /// Compare by canonical order: file path, then line, then column.
    pub fn canonical_cmp(&self, other: &Bookmark) -> Ordering {
        self.file_path
            .cmp(&other.file_path)
            .then(self.line.cmp(&other.line))
            .then(self.column.cmp(&other.column))
    }

    /// Compare this bookmark's `(file_path, line)` against a query position.
    pub fn cmp_position(&self, path: &str, line: u32) -> Ordering {
        (self.file_path.as_str(), self.line).cmp(&(path, line))
    }

    /// Text shown in pick lists: the label when present, else the line text.
    pub fn description(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.line_text)
    }
}

/// Trim a label and map empty input to `None`.
pub fn normalize_label(label: Option<&str>) -> Option<String> {
    label
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

/// The slot character of a label that is exactly one character long.
pub fn slot_char(label: &str) -> Option<char> {
    let mut chars = label.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(path: &str, line: u32, column: u32) -> Bookmark {
        Bookmark::new(path, line, column, GroupId(1))
    }

    #[test]
    fn test_canonical_order_keys() {
        assert_eq!(mark("a.rs", 9, 0).canonical_cmp(&mark("b.rs", 1, 0)), Ordering::Less);
        assert_eq!(mark("a.rs", 2, 5).canonical_cmp(&mark("a.rs", 3, 0)), Ordering::Less);
        assert_eq!(mark("a.rs", 3, 5).canonical_cmp(&mark("a.rs", 3, 1)), Ordering::Greater);
        assert_eq!(mark("a.rs", 3, 1).canonical_cmp(&mark("a.rs", 3, 1)), Ordering::Equal);
    }

    #[test]
    fn test_cmp_position_ignores_column() {
        let b = mark("src/lib.rs", 10, 30);
        assert_eq!(b.cmp_position("src/lib.rs", 10), Ordering::Equal);
        assert_eq!(b.cmp_position("src/lib.rs", 11), Ordering::Less);
        assert_eq!(b.cmp_position("src/a.rs", 99), Ordering::Greater);
    }

    #[test]
    fn test_slot_labels() {
        let b = mark("a.rs", 0, 0).with_label(Some("x"));
        assert_eq!(b.slot(), Some('x'));

        let b = mark("a.rs", 0, 0).with_label(Some("todo"));
        assert_eq!(b.slot(), None);

        let b = mark("a.rs", 0, 0).with_label(Some("é"));
        assert_eq!(b.slot(), Some('é'));
    }

    #[test]
    fn test_blank_label_is_none() {
        let b = mark("a.rs", 0, 0).with_label(Some("   "));
        assert_eq!(b.label, None);
        assert_eq!(normalize_label(Some("  fix me ")), Some("fix me".to_string()));
    }

    #[test]
    fn test_description_prefers_label() {
        let b = mark("a.rs", 0, 0).with_line_text("  let x = 1;  ");
        assert_eq!(b.description(), "let x = 1;");
        let b = b.with_label(Some("init"));
        assert_eq!(b.description(), "init");
    }
}
