//! Opening and closing subtrees, and the customization hooks.

use arbor_core::targets;

use super::TreeView;
use super::node::{ViewId, ViewNode};
use crate::config::RowMetrics;
use crate::geometry::Size;

/// Customization points for a tree view.
///
/// Every method has a default, so implementors override only what they need.
///
/// # Example
///
/// ```
/// use arbor::{NodeData, TreeView, TreeViewHooks, ViewNode};
///
/// struct LazyHooks;
///
/// impl TreeViewHooks for LazyHooks {
///     fn can_open(&self, node: &ViewNode) -> bool {
///         node.has_children() && node.label() != "locked"
///     }
/// }
///
/// let view = TreeView::standalone(NodeData::new("root")).with_hooks(LazyHooks);
/// ```
pub trait TreeViewHooks {
    /// Called after a node opens.
    fn on_open(&mut self, _node: &ViewNode) {}

    /// Called after a node closes.
    fn on_close(&mut self, _node: &ViewNode) {}

    /// Whether a closed node may open. Defaults to having children.
    fn can_open(&self, node: &ViewNode) -> bool {
        node.has_children()
    }

    /// Called when a node's open state changes, before `on_open`/`on_close`.
    fn update_branch_icons(&mut self, _node: &ViewNode) {}

    /// Measure a node's own row.
    fn measure_row(&self, node: &ViewNode, _depth: usize, metrics: &RowMetrics) -> Size {
        let chars = node.label().chars().count() as f32;
        Size::new(
            metrics.branch_width + metrics.icon_width + chars * metrics.char_width,
            metrics.row_height,
        )
    }
}

/// Hooks that keep every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl TreeViewHooks for DefaultHooks {}

impl TreeView {
    /// Whether a node may be opened.
    pub fn can_open(&self, id: ViewId) -> bool {
        self.nodes.get(id).is_some_and(|n| self.hooks.can_open(n))
    }

    fn open_node(&mut self, id: ViewId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if !node.closed || !self.hooks.can_open(node) {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.closed = false;
        }
        let node = &self.nodes[id];
        self.hooks.update_branch_icons(node);
        self.hooks.on_open(node);
        self.opened.emit(id);
        true
    }

    fn close_node(&mut self, id: ViewId) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.closed {
            return false;
        }
        node.closed = true;
        let node = &self.nodes[id];
        self.hooks.update_branch_icons(node);
        self.hooks.on_close(node);
        self.closed.emit(id);
        true
    }

    fn open_state_changed(&mut self) {
        self.reindex();
        self.render.needs_layout = true;
    }

    /// Open a node. Returns whether it changed state.
    pub fn open(&mut self, id: ViewId) -> bool {
        let changed = self.open_node(id);
        if changed {
            tracing::trace!(target: targets::LAYOUT, ?id, "opened");
            self.open_state_changed();
        }
        changed
    }

    /// Close a node. Returns whether it changed state.
    pub fn close(&mut self, id: ViewId) -> bool {
        let changed = self.close_node(id);
        if changed {
            tracing::trace!(target: targets::LAYOUT, ?id, "closed");
            self.open_state_changed();
        }
        changed
    }

    /// Open a closed node, close an open one.
    pub fn toggle_close(&mut self, id: ViewId) -> bool {
        if self.nodes.get(id).is_some_and(|n| n.closed) {
            self.open(id)
        } else {
            self.close(id)
        }
    }

    /// Open a node and every node below it.
    pub fn open_all(&mut self, id: ViewId) {
        let mut any = false;
        for node in self.descendants(id) {
            any |= self.open_node(node);
        }
        if any {
            self.open_state_changed();
        }
    }

    /// Close a node and every node below it.
    pub fn close_all(&mut self, id: ViewId) {
        let mut any = false;
        for node in self.descendants(id) {
            any |= self.close_node(node);
        }
        if any {
            self.open_state_changed();
        }
    }

    /// Open every ancestor of a node so that it becomes visible.
    pub fn open_parents(&mut self, id: ViewId) {
        let mut any = false;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            any |= self.open_node(parent);
            current = self.parent(parent);
        }
        if any {
            self.open_state_changed();
        }
    }
}
