//! Typed error types for par-mark.
//!
//! Every failure in the bookmark core degrades to one of these variants plus a
//! local rollback; none of them is fatal to the host process.

use crate::bookmark::BookmarkId;
use thiserror::Error;

/// Top-level error type for bookmark operations.
#[derive(Debug, Error)]
pub enum BookmarkError {
    // -----------------------------------------------------------------------
    // Command validation
    // -----------------------------------------------------------------------
    /// A group name or style value was rejected. No state was changed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced bookmark does not exist (it may have been deleted by an edit).
    #[error("Unknown bookmark {0}")]
    UnknownBookmark(BookmarkId),

    /// The referenced group does not exist.
    #[error("Unknown group '{0}'")]
    UnknownGroup(String),

    // -----------------------------------------------------------------------
    // Storage
    // -----------------------------------------------------------------------
    /// The storage artifact carries an unrecognized version tag.
    #[error("Bookmark storage version mismatch: expected '{expected}', found '{found}'")]
    LoadVersionMismatch {
        /// Version this build reads and writes.
        expected: String,
        /// Version found in the artifact (empty when absent).
        found: String,
    },

    /// One collection of the storage artifact could not be parsed.
    #[error("Failed to load {collection} from bookmark storage: {source}")]
    LoadParse {
        /// Which collection failed (`groups` or `bookmarks`).
        collection: &'static str,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------
    /// The bookmark's file or position could not be reached.
    #[error("Cannot open bookmark target {path}:{line}")]
    NavigationFailure {
        /// File the bookmark points into.
        path: String,
        /// Zero-based line of the bookmark.
        line: u32,
    },

    /// No other group or bookmark is eligible for the request.
    #[error("No destination available: {0}")]
    NoDestinationAvailable(String),

    /// Every bookmark in the group is flagged as a failed jump.
    #[error("No usable bookmarks in group '{0}'")]
    NoUsableBookmarks(String),

    // -----------------------------------------------------------------------
    // Upstream
    // -----------------------------------------------------------------------
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results with BookmarkError
pub type Result<T> = std::result::Result<T, BookmarkError>;
