//! Source-to-view reconciliation.
//!
//! Children are matched by identity (the source name with a `tv_` or `tvf_`
//! prefix). Surviving nodes keep their open and selection state; vanished
//! nodes are dropped with their subtrees; new nodes are created in source
//! order with fields listed first.

use std::collections::{HashMap, VecDeque};

use arbor_core::{PerfSpan, span_names, targets};
use serde_json::Value;

use super::node::{self, NodeKind, ViewId, ViewNode};
use super::TreeView;
use crate::error::{Result, TreeError};
use crate::source::{PROP_READ_ONLY, PROP_VIEW_CLOSED, SourceId};

/// Counts of nodes created and removed by a sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// View nodes created.
    pub created: usize,
    /// View nodes removed, descendants included.
    pub removed: usize,
    /// Nodes whose surviving children changed order.
    pub reordered: usize,
}

impl SyncStats {
    /// Whether the pass left the structure untouched.
    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.removed == 0 && self.reordered == 0
    }

    fn merge(&mut self, other: SyncStats) {
        self.created += other.created;
        self.removed += other.removed;
        self.reordered += other.reordered;
    }
}

struct Target {
    identity: String,
    source: SourceId,
    field: bool,
}

impl TreeView {
    /// Rebuild the whole view from the source root.
    ///
    /// Every existing node below the root is discarded along with the
    /// selection and focus. Does nothing for standalone views.
    pub fn sync_tree(&mut self) -> Result<SyncStats> {
        let Some(source) = self.source.clone() else {
            return Ok(SyncStats::default());
        };
        let _span = PerfSpan::new(span_names::SYNC);

        let root_src = source.root();
        let name = source.name(root_src).ok_or(TreeError::MissingSource { node: root_src })?;
        let label = source.label(root_src).unwrap_or_else(|| name.clone());

        let mut removed = 0;
        for child in self.children(self.root).to_vec() {
            removed += self.remove_subtree(child);
        }
        self.selection.selected.clear();
        self.nodes[self.root].selected = false;
        self.focus = None;
        self.scroll_request = None;

        if let Some(root) = self.nodes.get_mut(self.root) {
            root.name = node::identity(&name, false);
            root.label = label;
            root.kind = NodeKind::Mirrored(root_src);
            root.closed = false;
        }
        self.source_read_only = source.flag(root_src, PROP_READ_ONLY);

        let mut stats = self.sync(self.root, root_src, true, 0)?;
        stats.removed += removed;
        self.reindex();
        self.render.needs_layout = true;
        self.render.needs_full_render = true;

        tracing::debug!(
            target: targets::SYNC,
            nodes = self.nodes.len(),
            read_only = self.source_read_only,
            "built view from source"
        );
        Ok(stats)
    }

    /// Reconcile the whole view with the source, keeping surviving state.
    pub fn resync(&mut self) -> Result<SyncStats> {
        let Some(source) = self.source.clone() else {
            return Ok(SyncStats::default());
        };
        let _span = PerfSpan::new(span_names::SYNC);
        let root_src = source.root();
        self.source_read_only = source.flag(root_src, PROP_READ_ONLY);
        let stats = self.sync(self.root, root_src, false, 0)?;
        self.reindex();
        if !stats.is_empty() {
            self.render.needs_layout = true;
        }
        tracing::trace!(
            target: targets::SYNC,
            created = stats.created,
            removed = stats.removed,
            reordered = stats.reordered,
            "resynced"
        );
        Ok(stats)
    }

    /// Reconcile `node` and its subtree with the source node `source_id`.
    ///
    /// `depth` is the depth of `node`; `initial` selects the first-build
    /// open rules and suppresses `inserted` notifications.
    pub fn sync(&mut self, node: ViewId, source_id: SourceId, initial: bool, depth: usize) -> Result<SyncStats> {
        let Some(source) = self.source.clone() else {
            return Ok(SyncStats::default());
        };
        if !source.contains(source_id) {
            return Err(TreeError::MissingSource { node: source_id });
        }
        if !self.nodes.contains_key(node) {
            return Err(TreeError::StaleNode);
        }

        let targets: Vec<Target> = source
            .fields(source_id)
            .into_iter()
            .map(|id| (id, true))
            .chain(source.children(source_id).into_iter().map(|id| (id, false)))
            .filter_map(|(id, field)| {
                let name = source.name(id)?;
                Some(Target {
                    identity: node::identity(&name, field),
                    source: id,
                    field,
                })
            })
            .collect();

        // Siblings may share a name, so each identity maps to a queue of
        // view nodes consumed in order.
        let mut existing: HashMap<String, VecDeque<ViewId>> = HashMap::new();
        for &c in &self.nodes[node].children {
            if let Some(n) = self.nodes.get(c) {
                existing.entry(n.name.clone()).or_default().push_back(c);
            }
        }
        let reused: Vec<Option<ViewId>> = targets
            .iter()
            .map(|t| existing.get_mut(&t.identity).and_then(VecDeque::pop_front))
            .collect();
        let mut vanished: Vec<ViewId> = existing.into_values().flatten().collect();
        vanished.sort_by_key(|&v| self.index_in_parent(v));

        let mut stats = SyncStats::default();
        for id in vanished {
            self.deleted.emit(id);
            stats.removed += self.remove_subtree(id);
        }
        let previous = self.nodes[node].children.clone();

        let child_depth = depth + 1;
        let mut order = Vec::with_capacity(targets.len());
        let mut created = Vec::new();
        for (target, reused) in targets.iter().zip(reused) {
            let label = source.label(target.source).unwrap_or_default();
            match reused {
                Some(id) => {
                    if let Some(n) = self.nodes.get_mut(id) {
                        n.kind = NodeKind::Mirrored(target.source);
                        n.label = label;
                        n.field = target.field;
                    }
                    order.push(id);
                }
                None => {
                    let mut fresh = ViewNode::new(
                        target.identity.clone(),
                        label,
                        NodeKind::Mirrored(target.source),
                        Some(node),
                        target.field,
                    );
                    fresh.closed = (initial && child_depth > self.config.open_depth)
                        || matches!(source.property(target.source, PROP_VIEW_CLOSED), Some(Value::Bool(true)));
                    let id = self.nodes.insert(fresh);
                    order.push(id);
                    created.push(id);
                }
            }
        }
        stats.created += created.len();
        if created.is_empty() && previous != order {
            stats.reordered += 1;
        }
        self.nodes[node].children = order.clone();
        if !stats.is_empty() {
            self.indices_dirty = true;
            self.render.needs_full_render = true;
        }
        if !initial {
            for &id in &created {
                self.inserted.emit(id);
            }
        }

        for (id, target) in order.into_iter().zip(&targets) {
            stats.merge(self.sync(id, target.source, initial, child_depth)?);
        }

        if self.nodes[node].children.is_empty() {
            self.nodes[node].closed = true;
        }
        Ok(stats)
    }

    /// Apply queued source notifications.
    ///
    /// Any structural change triggers a full [`resync`](Self::resync) and,
    /// when nodes were added, removed or reordered, one `changed`
    /// notification. Value changes only request a render.
    pub fn process_source_changes(&mut self) -> Result<SyncStats> {
        let changes: Vec<_> = std::mem::take(&mut *self.pending.lock());
        if changes.is_empty() {
            return Ok(SyncStats::default());
        }
        if changes.iter().any(|c| c.is_structural()) {
            let stats = self.resync()?;
            if !stats.is_empty() {
                self.render.needs_render = true;
                self.changed.emit(self.root);
            }
            Ok(stats)
        } else {
            tracing::trace!(target: targets::SYNC, count = changes.len(), "value changes");
            self.render.needs_render = true;
            Ok(SyncStats::default())
        }
    }

    /// Whether source notifications are waiting to be applied.
    pub fn has_pending_changes(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Apply the first-build open rules to a standalone view.
    pub(crate) fn reset_open_state(&mut self) {
        let open_depth = self.config.open_depth;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(n) = self.nodes.get_mut(id) else {
                continue;
            };
            let forced = match &n.kind {
                NodeKind::Standalone(value) => {
                    matches!(value.properties.get(PROP_VIEW_CLOSED), Some(Value::Bool(true)))
                }
                NodeKind::Mirrored(_) => false,
            };
            n.closed = n.children.is_empty() || depth > open_depth || forced;
            stack.extend(n.children.iter().map(|&c| (c, depth + 1)));
        }
        self.reindex();
        self.render.needs_layout = true;
        self.render.needs_full_render = true;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::source::{NodeData, NodeTree, SourceTree};

    fn source() -> Arc<NodeTree> {
        Arc::new(NodeTree::from_data(
            NodeData::new("R")
                .with_field(NodeData::new("meta"))
                .with_child(NodeData::new("A"))
                .with_child(NodeData::new("B").with_child(NodeData::new("B1"))),
        ))
    }

    fn names(view: &TreeView, parent: ViewId) -> Vec<String> {
        view.children(parent)
            .iter()
            .map(|&c| view.node(c).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_initial_build_orders_fields_first() {
        let view = TreeView::mirrored(source());
        assert_eq!(names(&view, view.root()), ["tvf_meta", "tv_A", "tv_B"]);
        assert_eq!(view.node(view.root()).unwrap().name(), "tv_R");
        assert_eq!(view.len(), 5);
    }

    #[test]
    fn test_resync_is_idempotent() {
        let mut view = TreeView::mirrored(source());
        view.take_full_render();
        let stats = view.resync().unwrap();
        assert!(stats.is_empty());
        assert!(!view.take_full_render());
    }

    #[test]
    fn test_resync_keeps_survivor_state() {
        let src = source();
        let mut view = TreeView::mirrored(src.clone());
        let b = view.child_by_name(view.root(), "tv_B").unwrap();
        view.select(b);
        view.close(b);

        src.add_child(src.root(), "C").unwrap();
        let stats = view.process_source_changes().unwrap();

        assert_eq!(stats.created, 1);
        assert_eq!(view.child_by_name(view.root(), "tv_B"), Some(b));
        assert!(view.node(b).unwrap().is_closed());
        assert!(view.is_selected(b));
        assert_eq!(names(&view, view.root()), ["tvf_meta", "tv_A", "tv_B", "tv_C"]);
    }

    #[test]
    fn test_vanished_nodes_leave_selection() {
        let src = source();
        let mut view = TreeView::mirrored(src.clone());
        let deleted = Arc::new(AtomicUsize::new(0));
        let d = deleted.clone();
        view.deleted.connect(move |_| {
            d.fetch_add(1, Ordering::SeqCst);
        });
        let b = view.child_by_name(view.root(), "tv_B").unwrap();
        let b1 = view.child_by_name(b, "tv_B1").unwrap();
        view.select(b1);

        let b_src = src.child_by_name(src.root(), "B").unwrap();
        src.delete(b_src).unwrap();
        let stats = view.process_source_changes().unwrap();

        assert_eq!(stats.removed, 2);
        assert_eq!(deleted.load(Ordering::SeqCst), 1);
        assert!(!view.contains(b1));
        assert!(view.selected_nodes().is_empty());
    }

    #[test]
    fn test_inserted_not_emitted_on_initial_build() {
        let src = source();
        let mut view = TreeView::mirrored(src.clone());
        let inserted = Arc::new(AtomicUsize::new(0));
        let i = inserted.clone();
        view.inserted.connect(move |_| {
            i.fetch_add(1, Ordering::SeqCst);
        });

        view.sync_tree().unwrap();
        assert_eq!(inserted.load(Ordering::SeqCst), 0);

        src.add_child(src.root(), "C").unwrap();
        view.process_source_changes().unwrap();
        assert_eq!(inserted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_open_depth_and_view_closed() {
        let src = Arc::new(NodeTree::from_data(
            NodeData::new("R")
                .with_child(NodeData::new("A").with_child(NodeData::new("A1").with_child(NodeData::new("A2"))))
                .with_child(
                    NodeData::new("B")
                        .with_property(PROP_VIEW_CLOSED, true)
                        .with_child(NodeData::new("B1")),
                ),
        ));
        let view = TreeView::mirrored(src).with_open_depth(1);
        let a = view.child_by_name(view.root(), "tv_A").unwrap();
        let a1 = view.child_by_name(a, "tv_A1").unwrap();
        let b = view.child_by_name(view.root(), "tv_B").unwrap();
        let b1 = view.child_by_name(b, "tv_B1").unwrap();

        assert!(!view.node(a).unwrap().is_closed());
        assert!(view.node(a1).unwrap().is_closed());
        assert!(view.node(b).unwrap().is_closed());
        assert!(view.node(b1).unwrap().is_closed());
    }

    #[test]
    fn test_read_only_from_source_root() {
        let src = Arc::new(NodeTree::from_data(NodeData::new("R").with_property(PROP_READ_ONLY, true)));
        let view = TreeView::mirrored(src);
        assert!(view.is_read_only());
        assert!(view.node(view.root()).unwrap().is_closed());
    }

    #[test]
    fn test_value_changes_only_request_render() {
        let src = source();
        let mut view = TreeView::mirrored(src.clone());
        view.take_render();
        view.take_full_render();
        let a = src.child_by_name(src.root(), "A").unwrap();
        src.set_value(a, 5).unwrap();

        assert!(view.has_pending_changes());
        let stats = view.process_source_changes().unwrap();
        assert!(stats.is_empty());
        assert!(view.take_render());
        assert!(!view.take_full_render());
    }

    #[test]
    fn test_duplicate_sibling_names_get_distinct_nodes() {
        let src = Arc::new(NodeTree::from_data(NodeData::new("R").with_child(NodeData::new("A"))));
        let mut view = TreeView::mirrored(src.clone());
        let first = view.child_by_name(view.root(), "tv_A").unwrap();

        src.add_child(src.root(), "A").unwrap();
        let stats = view.process_source_changes().unwrap();

        assert_eq!(stats.created, 1);
        let children = view.children(view.root()).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], first);
        assert_ne!(children[0], children[1]);

        let mut walked = 0;
        let mut current = view.root();
        while let Some(next) = view.move_down(current, crate::view::SelectMode::NoSelect) {
            walked += 1;
            assert!(walked <= view.len());
            current = next;
        }
        assert_eq!(walked, 2);
        assert!(view.resync().unwrap().is_empty());
    }

    #[test]
    fn test_source_reorder_requests_layout() {
        use crate::geometry::Point;

        let src = Arc::new(NodeTree::from_data(
            NodeData::new("R").with_child(NodeData::new("A")).with_child(NodeData::new("B")),
        ));
        let mut view = TreeView::mirrored(src.clone());
        let changed = Arc::new(AtomicUsize::new(0));
        let c = changed.clone();
        view.changed.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        view.layout(Point::ZERO, 200.0);
        view.take_render();
        let b = view.child_by_name(view.root(), "tv_B").unwrap();

        let a_src = src.child_by_name(src.root(), "A").unwrap();
        src.move_node(a_src, src.root(), usize::MAX).unwrap();
        let stats = view.process_source_changes().unwrap();

        assert_eq!(stats.reordered, 1);
        assert_eq!(names(&view, view.root()), ["tv_B", "tv_A"]);
        assert!(view.needs_layout());
        assert!(view.take_render());
        assert_eq!(changed.load(Ordering::SeqCst), 1);

        view.layout(Point::ZERO, 200.0);
        let row = view.node(view.root()).unwrap().own_box().height();
        assert_eq!(view.node_at(Point::new(5.0, row + 5.0)), Some(b));
    }
}
