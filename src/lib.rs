// Library exports for hosts and tests
//
// # Threading
//
// The bookmark core is single-threaded: every command and every edit event
// runs to completion on the host's event loop. The only cross-thread piece is
// the storage watcher, whose `notify` callback just sends on an mpsc channel
// and keeps its debounce timestamp behind a `parking_lot::Mutex`.

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod bookmark;
pub mod cache;
pub mod context;
pub mod decoration;
pub mod error;
pub mod events;
pub mod group;
pub mod navigator;
pub mod persistence;
pub mod reconcile;
pub mod registry;
pub mod store;

pub use bookmark::{Bookmark, BookmarkId};
pub use context::{BookmarkContext, ToggleResult};
pub use decoration::{
    DecorationBinder, DecorationHandle, DecorationMap, DecorationRefresher, DecorationRequest,
    DecorationRole, EditorHost,
};
pub use error::{BookmarkError, Result};
pub use events::{DecorationEvent, DecorationEvents, EventSink};
pub use group::{DEFAULT_GROUP_NAME, Group, GroupId, OUTSIDE_WORKSPACE_GROUP_NAME};
pub use navigator::Navigator;
pub use persistence::{
    LoadedState, PersistenceManager, SaveOutcome, StorageChangeEvent, StorageChangeKind,
};
pub use reconcile::{EditReconciler, LineSource, Position, ReconcileOutcome, TextChange, TextLines};
pub use registry::GroupRegistry;
pub use store::BookmarkStore;

// Configuration crate re-exports
pub use par_mark_config::{BookmarkConfig, LineEndLabel, RulerLane, Shape};
