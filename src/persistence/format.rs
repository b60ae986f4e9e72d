//! On-disk shape of the bookmark storage artifact (camelCase JSON).

use par_mark_config::Shape;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version tag written to and required from the artifact.
pub const FILE_VERSION: &str = "1.0";

/// A persisted bookmark. Groups are referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBookmark {
    /// Relative to the workspace root when under it, absolute otherwise
    pub file_path: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub line_text: String,
    #[serde(default)]
    pub group_name: String,
}

/// A persisted group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredGroup {
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub shape: Shape,
    #[serde(default)]
    pub icon_text: String,
}

/// The whole artifact as written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    pub file_version: String,
    pub bookmarks: Vec<StoredBookmark>,
    pub groups: Vec<StoredGroup>,
    pub active_group: String,
    pub hide_inactive_groups: bool,
    pub hide_all: bool,
}

/// The artifact as read: each collection stays raw so that one malformed
/// collection can be discarded without losing the others.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawState {
    #[serde(default)]
    pub file_version: Option<String>,
    #[serde(default)]
    pub bookmarks: Option<Value>,
    #[serde(default)]
    pub groups: Option<Value>,
    #[serde(default)]
    pub active_group: Option<Value>,
    #[serde(default)]
    pub hide_inactive_groups: Option<Value>,
    #[serde(default)]
    pub hide_all: Option<Value>,
}
