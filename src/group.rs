//! Bookmark group model.

use par_mark_config::Shape;
use std::fmt;

/// Name of the group that exists when nothing else does.
pub const DEFAULT_GROUP_NAME: &str = "default";

/// Display name for bookmarks whose file lies outside the workspace root.
/// Reserved: no user group may take it.
pub const OUTSIDE_WORKSPACE_GROUP_NAME: &str = "(outside workspace)";

/// Registry-assigned group identity. Survives renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// A named, styled partition of bookmarks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Normalized `#rrggbb`
    pub color: String,
    pub shape: Shape,
    /// Glyph drawn for [`Shape::Unicode`]; empty for built-in shapes
    pub icon_text: String,
    pub is_active: bool,
    pub is_visible: bool,
}

impl Group {
    pub(crate) fn new(id: GroupId, name: String, color: String, shape: Shape, icon_text: String) -> Self {
        Self {
            id,
            name,
            color,
            shape,
            icon_text,
            is_active: false,
            is_visible: true,
        }
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_GROUP_NAME
    }
}

/// True for names no user-created group may use.
pub fn is_reserved_name(name: &str) -> bool {
    name == OUTSIDE_WORKSPACE_GROUP_NAME
}

/// Visibility rule shared by every group.
pub fn compute_visibility(is_active: bool, hide_all: bool, hide_inactive_groups: bool) -> bool {
    !hide_all && (!hide_inactive_groups || is_active)
}
