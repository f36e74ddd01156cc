//! View nodes and tree-structure queries.

use std::collections::BTreeMap;

use serde_json::Value;
use slotmap::new_key_type;

use super::TreeView;
use crate::error::{Result, TreeError};
use crate::geometry::{Rect, Size};
use crate::source::{NodeData, SourceId, join_path};

new_key_type! {
    /// A stable key for a node in a [`TreeView`] arena.
    ///
    /// Keys stay valid across resyncs for as long as the node survives,
    /// and are never reused for another node.
    pub struct ViewId;
}

/// Identity prefix of a view node mirroring a source child.
pub const CHILD_PREFIX: &str = "tv_";

/// Identity prefix of a view node mirroring a source field.
pub const FIELD_PREFIX: &str = "tvf_";

/// The reconciliation key for a node named `name`.
pub(crate) fn identity(name: &str, field: bool) -> String {
    if field {
        format!("{FIELD_PREFIX}{name}")
    } else {
        format!("{CHILD_PREFIX}{name}")
    }
}

/// Data held directly by a view that does not mirror a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeValue {
    /// The node name.
    pub name: String,
    /// The node payload.
    pub value: Value,
    /// Per-node properties.
    pub properties: BTreeMap<String, Value>,
}

/// What a view node displays.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The node mirrors a source node.
    Mirrored(SourceId),
    /// The node owns its data.
    Standalone(NodeValue),
}

/// One row of a tree view.
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub(crate) name: String,
    pub(crate) label: String,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<ViewId>,
    pub(crate) children: Vec<ViewId>,
    pub(crate) closed: bool,
    pub(crate) selected: bool,
    pub(crate) visible: bool,
    pub(crate) field: bool,
    pub(crate) view_index: Option<usize>,
    pub(crate) own_size: Size,
    pub(crate) subtree_size: Size,
    pub(crate) own_box: Rect,
    pub(crate) subtree_box: Rect,
}

impl ViewNode {
    pub(crate) fn new(name: String, label: String, kind: NodeKind, parent: Option<ViewId>, field: bool) -> Self {
        Self {
            name,
            label,
            kind,
            parent,
            children: Vec::new(),
            closed: false,
            selected: false,
            visible: true,
            field,
            view_index: None,
            own_size: Size::ZERO,
            subtree_size: Size::ZERO,
            own_box: Rect::ZERO,
            subtree_box: Rect::ZERO,
        }
    }

    /// The reconciliation identity (prefixed name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// What this node displays.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The mirrored source node, if any.
    pub fn source_id(&self) -> Option<SourceId> {
        match self.kind {
            NodeKind::Mirrored(id) => Some(id),
            NodeKind::Standalone(_) => None,
        }
    }

    /// Ordered children.
    pub fn children(&self) -> &[ViewId] {
        &self.children
    }

    /// Whether this node has children.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// The parent node (`None` for the root).
    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    /// Whether the subtree is hidden.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the node is selected.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Whether every ancestor is open.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether this is a field pseudo-node.
    pub fn is_field(&self) -> bool {
        self.field
    }

    /// Position in the open-aware depth-first order (`None` when hidden).
    pub fn view_index(&self) -> Option<usize> {
        self.view_index
    }

    /// Bounds of this node's own row.
    pub fn own_box(&self) -> Rect {
        self.own_box
    }

    /// Bounds of this row plus all visible descendants.
    pub fn subtree_box(&self) -> Rect {
        self.subtree_box
    }
}

impl TreeView {
    /// The root node.
    pub fn root(&self) -> ViewId {
        self.root
    }

    /// Whether `id` is the root.
    pub fn is_root(&self, id: ViewId) -> bool {
        id == self.root
    }

    /// Look up a node.
    pub fn node(&self, id: ViewId) -> Option<&ViewNode> {
        self.nodes.get(id)
    }

    pub(crate) fn node_or_stale(&self, id: ViewId) -> Result<&ViewNode> {
        self.nodes.get(id).ok_or(TreeError::StaleNode)
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: ViewId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes in the view, hidden ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a view has at least a root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of a node (empty for unknown nodes).
    pub fn children(&self, id: ViewId) -> &[ViewId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Parent of a node.
    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Depth below the root (root is 0).
    pub fn depth(&self, id: ViewId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Position among all siblings, fields included.
    pub fn index_in_parent(&self, id: ViewId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Find a direct child by identity.
    pub fn child_by_name(&self, parent: ViewId, name: &str) -> Option<ViewId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.nodes.get(c).is_some_and(|n| n.name == name))
    }

    /// Find the view node mirroring a source node.
    pub fn find_source(&self, source: SourceId) -> Option<ViewId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.source_id() == Some(source))
            .map(|(id, _)| id)
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: ViewId, id: ViewId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// The escaped, `/`-separated label path from the root (exclusive) to `id`.
    pub fn path_of(&self, id: ViewId) -> String {
        let mut labels = Vec::new();
        let mut current = id;
        while let Some(node) = self.nodes.get(current) {
            let Some(parent) = node.parent else {
                break;
            };
            labels.push(node.label.as_str());
            current = parent;
        }
        labels.reverse();
        join_path(labels)
    }

    /// `id` and all of its descendants, depth first.
    pub fn descendants(&self, id: ViewId) -> Vec<ViewId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(n) = self.nodes.get(node) {
                out.push(node);
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    /// Visible nodes in view order.
    pub fn visible_nodes(&self) -> Vec<ViewId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push(id);
            if !node.closed {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Add a node to the arena and link it under `parent` at `index`.
    pub(crate) fn attach(&mut self, node: ViewNode, index: usize) -> ViewId {
        let parent = node.parent;
        let id = self.nodes.insert(node);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            let index = index.min(parent.children.len());
            parent.children.insert(index, id);
        }
        self.indices_dirty = true;
        id
    }

    /// Remove a node and its subtree from the arena.
    ///
    /// Removed nodes leave the selection and lose focus.
    pub(crate) fn remove_subtree(&mut self, id: ViewId) -> usize {
        if id == self.root {
            return 0;
        }
        if let Some(parent) = self.parent(id).and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|&c| c != id);
        }
        let doomed = self.descendants(id);
        self.selection.selected.retain(|s| !doomed.contains(s));
        if self.focus.is_some_and(|f| doomed.contains(&f)) {
            self.focus = None;
        }
        if self.scroll_request.is_some_and(|s| doomed.contains(&s)) {
            self.scroll_request = None;
        }
        for node in &doomed {
            self.nodes.remove(*node);
        }
        self.indices_dirty = true;
        doomed.len()
    }

    /// Build standalone view nodes for `data` under `parent`.
    pub(crate) fn build_standalone(
        &mut self,
        parent: Option<ViewId>,
        index: usize,
        data: NodeData,
        field: bool,
    ) -> ViewId {
        let NodeData {
            name,
            value,
            properties,
            fields,
            children,
        } = data;
        let node = ViewNode::new(
            identity(&name, field),
            name.clone(),
            NodeKind::Standalone(NodeValue {
                name,
                value,
                properties,
            }),
            parent,
            field,
        );
        let id = self.attach(node, index);
        for f in fields {
            self.build_standalone(Some(id), usize::MAX, f, true);
        }
        for c in children {
            self.build_standalone(Some(id), usize::MAX, c, false);
        }
        if let Some(node) = self.nodes.get_mut(id)
            && node.children.is_empty()
        {
            node.closed = true;
        }
        id
    }

    /// Clone a standalone subtree out of the arena.
    pub(crate) fn standalone_snapshot(&self, id: ViewId) -> Option<NodeData> {
        let node = self.nodes.get(id)?;
        let NodeKind::Standalone(value) = &node.kind else {
            return None;
        };
        let mut data = NodeData {
            name: value.name.clone(),
            value: value.value.clone(),
            properties: value.properties.clone(),
            ..NodeData::default()
        };
        for &child in &node.children {
            let Some(child_data) = self.standalone_snapshot(child) else {
                continue;
            };
            if self.nodes.get(child).is_some_and(|c| c.field) {
                data.fields.push(child_data);
            } else {
                data.children.push(child_data);
            }
        }
        Some(data)
    }
}
