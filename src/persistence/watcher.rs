//! Storage artifact watcher.
//!
//! Watches the bookmark storage file so that changes made by another process
//! (or a checkout) can be reloaded. Self-triggered writes are filtered later
//! by the reload guard, not here.

use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::{Duration, Instant};

/// What happened to the storage artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageChangeKind {
    /// Created or modified
    Written,
    Removed,
}

/// Event indicating the storage artifact changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChangeEvent {
    /// Path of the storage artifact.
    pub path: PathBuf,
    pub kind: StorageChangeKind,
    /// When the change was observed; the reload guard is checked against this.
    pub at: Instant,
}

/// Watches the storage artifact and queues change events.
pub struct StorageWatcher {
    /// Kept alive to maintain watching.
    _watcher: Box<dyn Watcher + Send>,
    event_receiver: Receiver<StorageChangeEvent>,
}

impl std::fmt::Debug for StorageWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageWatcher").finish_non_exhaustive()
    }
}

/// Identifies the artifact in event paths by its file name and the name of
/// its parent directory, which survives symlinked temp roots.
#[derive(Debug, Clone)]
struct Target {
    path: PathBuf,
    filename: OsString,
    parent_name: Option<OsString>,
}

impl Target {
    fn matches(&self, candidate: &Path) -> bool {
        if candidate.file_name() != Some(self.filename.as_os_str()) {
            return false;
        }
        match &self.parent_name {
            Some(parent) => candidate
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|p| p == parent.as_os_str()),
            None => true,
        }
    }
}

fn make_event_handler(
    target: Target,
    debounce_delay: Duration,
    tx: Sender<StorageChangeEvent>,
    last_event_time: Arc<Mutex<Option<Instant>>>,
) -> impl Fn(std::result::Result<Event, notify::Error>) + Send + 'static {
    move |result: std::result::Result<Event, notify::Error>| {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Bookmark storage watch error: {}", e);
                return;
            }
        };

        let kind = match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => StorageChangeKind::Written,
            EventKind::Remove(_) => StorageChangeKind::Removed,
            _ => return,
        };

        if !event.paths.iter().any(|p| target.matches(p)) {
            return;
        }

        // Editors and atomic renames produce bursts; forward one per window.
        let now = Instant::now();
        let should_send = {
            let mut last = last_event_time.lock();
            match *last {
                Some(last_time) if now.duration_since(last_time) < debounce_delay => {
                    log::trace!("Debouncing bookmark storage event");
                    false
                }
                _ => {
                    *last = Some(now);
                    true
                }
            }
        };

        if should_send {
            log::debug!(
                "Bookmark storage changed ({:?}): {}",
                kind,
                target.path.display()
            );
            let change = StorageChangeEvent {
                path: target.path.clone(),
                kind,
                at: now,
            };
            if let Err(e) = tx.send(change) {
                log::error!("Failed to send bookmark storage event: {}", e);
            }
        }
    }
}

impl StorageWatcher {
    /// Start watching `storage_path`.
    ///
    /// The artifact and its directory need not exist yet: the nearest
    /// existing ancestor is watched, recursively when it is not the direct
    /// parent. Uses the native backend when available, otherwise a
    /// `PollWatcher` checking every 500 ms.
    pub fn new(storage_path: &Path, debounce_delay_ms: u64) -> Result<Self> {
        let filename = storage_path
            .file_name()
            .context("Storage path has no filename")?
            .to_os_string();
        let parent = storage_path
            .parent()
            .context("Storage path has no parent directory")?;

        let (watch_dir, mode) = if parent.is_dir() {
            (parent.to_path_buf(), RecursiveMode::NonRecursive)
        } else {
            let ancestor = parent
                .ancestors()
                .find(|p| p.is_dir())
                .with_context(|| {
                    format!("No existing ancestor of {}", storage_path.display())
                })?;
            (ancestor.to_path_buf(), RecursiveMode::Recursive)
        };

        let target = Target {
            path: storage_path.to_path_buf(),
            filename,
            parent_name: parent.file_name().map(|n| n.to_os_string()),
        };

        let (tx, rx) = channel::<StorageChangeEvent>();
        let debounce_delay = Duration::from_millis(debounce_delay_ms);
        let last_event_time: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));

        let mut watcher = Self::create_watcher(target, debounce_delay, tx, last_event_time)?;
        watcher
            .watch(&watch_dir, mode)
            .with_context(|| format!("Failed to watch {}", watch_dir.display()))?;

        log::info!(
            "Bookmark storage watch: {} (via {})",
            storage_path.display(),
            watch_dir.display()
        );

        Ok(Self {
            _watcher: watcher,
            event_receiver: rx,
        })
    }

    fn create_watcher(
        target: Target,
        debounce_delay: Duration,
        tx: Sender<StorageChangeEvent>,
        last_event_time: Arc<Mutex<Option<Instant>>>,
    ) -> Result<Box<dyn Watcher + Send>> {
        let handler = make_event_handler(
            target.clone(),
            debounce_delay,
            tx.clone(),
            Arc::clone(&last_event_time),
        );

        match notify::recommended_watcher(handler) {
            Ok(w) => {
                log::debug!("Bookmark storage watcher: using native backend");
                Ok(Box::new(w))
            }
            Err(e) => {
                log::warn!(
                    "Bookmark storage watcher: native backend unavailable ({}); falling back to PollWatcher",
                    e
                );
                let fallback = make_event_handler(target, debounce_delay, tx, last_event_time);
                let poll_watcher = PollWatcher::new(
                    fallback,
                    NotifyConfig::default().with_poll_interval(Duration::from_millis(500)),
                )
                .context("Failed to create fallback PollWatcher")?;
                Ok(Box::new(poll_watcher))
            }
        }
    }

    /// Check for a pending storage change (non-blocking).
    pub fn try_recv(&self) -> Option<StorageChangeEvent> {
        self.event_receiver.try_recv().ok()
    }
}
