//! Source tree adapter.
//!
//! A [`TreeView`](crate::TreeView) mirrors an external hierarchical data
//! structure through the [`SourceTree`] trait. Nodes are addressed by stable
//! [`SourceId`] handles; the view never holds references into the source.
//!
//! Sources announce changes through [`SourceSignals::changed`], tagging each
//! change as [`ChangeKind::Structural`] (children added, removed, renamed or
//! moved) or [`ChangeKind::Value`] (payload only). The view performs a full
//! resync only for structural changes.
//!
//! [`NodeTree`] is a thread-safe in-memory implementation.

mod data;
mod node_tree;

pub use data::{JsonCodec, NodeCodec, NodeData};
pub use node_tree::NodeTree;

use std::fmt;

use arbor_core::Signal;
use serde_json::Value;

use crate::error::Result;

/// Property that forces a node to start closed in the view.
pub const PROP_VIEW_CLOSED: &str = "view-closed";

/// Property on the source root that makes the whole view read-only.
pub const PROP_READ_ONLY: &str = "read-only";

/// Separator between names in a node path.
pub const PATH_SEPARATOR: &str = "/";

/// Escape character for separators inside a path segment.
const PATH_ESCAPE: char = '\\';

/// Join node names into a path. Separators and escapes inside a name are
/// escaped so that [`split_path`] recovers the original names.
pub fn join_path<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut path = String::new();
    for (i, name) in names.into_iter().enumerate() {
        if i > 0 {
            path.push_str(PATH_SEPARATOR);
        }
        for c in name.as_ref().chars() {
            if c == PATH_ESCAPE || PATH_SEPARATOR.starts_with(c) {
                path.push(PATH_ESCAPE);
            }
            path.push(c);
        }
    }
    path
}

/// Split a path built by [`join_path`] back into names. Empty segments are
/// skipped.
pub fn split_path(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut segment = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        if c == PATH_ESCAPE {
            if let Some(escaped) = chars.next() {
                segment.push(escaped);
            }
        } else if PATH_SEPARATOR.starts_with(c) {
            if !segment.is_empty() {
                names.push(std::mem::take(&mut segment));
            }
        } else {
            segment.push(c);
        }
    }
    if !segment.is_empty() {
        names.push(segment);
    }
    names
}

/// A stable handle to a node in a source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of change a source reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Children were added, removed, renamed or reordered.
    Structural,
    /// Only a node's payload changed.
    Value,
}

/// A change notification from a source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceChange {
    /// The node whose subtree changed.
    pub node: SourceId,
    /// The kind of change.
    pub kind: ChangeKind,
}

impl SourceChange {
    /// A structural change at `node`.
    pub fn structural(node: SourceId) -> Self {
        Self {
            node,
            kind: ChangeKind::Structural,
        }
    }

    /// A value change at `node`.
    pub fn value(node: SourceId) -> Self {
        Self {
            node,
            kind: ChangeKind::Value,
        }
    }

    /// Whether this change requires a structural resync.
    pub fn is_structural(&self) -> bool {
        self.kind == ChangeKind::Structural
    }
}

/// Signals emitted by a source tree.
#[derive(Default)]
pub struct SourceSignals {
    /// Emitted after every mutation.
    pub changed: Signal<SourceChange>,
}

impl SourceSignals {
    /// Create a new set of source signals.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A hierarchical data structure that a tree view can mirror and edit.
///
/// Child names must be unique within a parent: the view uses them as
/// reconciliation keys. Mutating methods take `&self` because sources are
/// shared between the view and the application, typically behind an `Arc`.
pub trait SourceTree: Send + Sync {
    /// The root node.
    fn root(&self) -> SourceId;

    /// Whether `id` refers to a live node.
    fn contains(&self, id: SourceId) -> bool;

    /// The node name.
    fn name(&self, id: SourceId) -> Option<String>;

    /// The display label. Defaults to the name.
    fn label(&self, id: SourceId) -> Option<String> {
        self.name(id)
    }

    /// The ordered children of a node.
    fn children(&self, id: SourceId) -> Vec<SourceId>;

    /// The field pseudo-children of a node, listed before real children.
    fn fields(&self, _id: SourceId) -> Vec<SourceId> {
        Vec::new()
    }

    /// Whether `id` is a field pseudo-node.
    fn is_field(&self, _id: SourceId) -> bool {
        false
    }

    /// The parent of a node (`None` for the root or unknown nodes).
    fn parent(&self, id: SourceId) -> Option<SourceId>;

    /// Look up a per-node property.
    fn property(&self, id: SourceId, key: &str) -> Option<Value>;

    /// Clone a node and its subtree.
    fn snapshot(&self, id: SourceId) -> Option<NodeData>;

    /// Insert `data` as a child of `parent` at `index` (clamped).
    fn insert_child(&self, parent: SourceId, index: usize, data: NodeData) -> Result<SourceId>;

    /// Delete a node and its subtree.
    fn delete(&self, id: SourceId) -> Result<()>;

    /// Overwrite a node's data and subtree with `data`, keeping its name.
    fn assign(&self, id: SourceId, data: NodeData) -> Result<()>;

    /// Rename a node.
    fn rename(&self, id: SourceId, name: &str) -> Result<()>;

    /// Move a node under `new_parent` so that it lands before the child
    /// currently at `index` (clamped).
    fn move_node(&self, id: SourceId, new_parent: SourceId, index: usize) -> Result<()>;

    /// The change signals of this source.
    fn signals(&self) -> &SourceSignals;

    /// Whether a boolean property is set to `true`.
    fn flag(&self, id: SourceId, key: &str) -> bool {
        matches!(self.property(id, key), Some(Value::Bool(true)))
    }

    /// The escaped, `/`-separated path of names from `ancestor` (exclusive)
    /// to `id`.
    ///
    /// Returns an empty string when `id == ancestor`, and `None` when
    /// `ancestor` is not an ancestor of `id`.
    fn path_from(&self, ancestor: SourceId, id: SourceId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = id;
        while current != ancestor {
            names.push(self.name(current)?);
            current = self.parent(current)?;
        }
        names.reverse();
        Some(join_path(names))
    }

    /// Resolve a path produced by [`path_from`](Self::path_from).
    fn find_path(&self, from: SourceId, path: &str) -> Option<SourceId> {
        let mut current = from;
        for segment in split_path(path) {
            current = self
                .children(current)
                .into_iter()
                .chain(self.fields(current))
                .find(|&c| self.name(c).as_deref() == Some(segment.as_str()))?;
        }
        Some(current)
    }
}
