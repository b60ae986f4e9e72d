//! Shared integration test helpers for par-mark.
//!
//! Include with `mod common;` at the top of a test file. The
//! `#[allow(dead_code)]` attribute suppresses warnings when a file only uses
//! some of the helpers.

#![allow(dead_code)]

use par_mark::{BookmarkConfig, BookmarkContext, DecorationEvents};
use std::path::Path;
use tempfile::TempDir;

/// A temporary workspace root with a fresh context bound to it.
///
/// Keep the struct alive for the whole test; dropping it removes the directory.
pub struct TestWorkspace {
    pub dir: TempDir,
    pub ctx: BookmarkContext,
    pub events: DecorationEvents,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self::with_config(BookmarkConfig::default())
    }

    pub fn with_config(config: BookmarkConfig) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (ctx, events) = BookmarkContext::new(config, dir.path());
        Self { dir, ctx, events }
    }

    /// Absolute path string of `relative` inside the workspace.
    pub fn path(&self, relative: &str) -> String {
        self.dir.path().join(relative).to_string_lossy().into_owned()
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// A second context over the same workspace, loading what was saved.
    pub fn reopen(&self) -> BookmarkContext {
        BookmarkContext::open(self.ctx.config().clone(), self.dir.path()).0
    }
}

/// `count` lines reading `line 0`, `line 1`, ...
pub fn numbered_document(count: usize) -> String {
    (0..count)
        .map(|i| format!("line {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lines of every bookmark in `path`, in canonical order.
pub fn lines_in(ctx: &BookmarkContext, path: &str) -> Vec<u32> {
    ctx.store().in_file(path).iter().map(|b| b.line).collect()
}
