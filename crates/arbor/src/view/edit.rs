//! Structural editing.
//!
//! The data-level primitives here work in both modes. In a mirrored view
//! they edit the source and read positions back from it, so several edits
//! can be chained before the view resyncs; [`TreeView::commit_edit`] then
//! reconciles once. In a standalone view they edit the arena directly.

use arbor_core::targets;

use super::TreeView;
use super::node::{self, NodeKind, ViewId};
use super::selection::SelectMode;
use crate::error::{Result, TreeError};
use crate::source::{NodeData, SourceId};

/// Append `suffix` to `name` until it no longer collides with `existing`.
pub(crate) fn unique_name(existing: &[String], name: &str, suffix: &str) -> String {
    let mut candidate = name.to_string();
    while existing.iter().any(|e| *e == candidate) {
        candidate.push_str(suffix);
    }
    candidate
}

/// A `new-<index>` name that does not collide with `existing`.
fn fresh_name(existing: &[String], index: usize) -> String {
    let mut k = index;
    loop {
        let candidate = format!("new-{k}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        k += 1;
    }
}

impl TreeView {
    pub(crate) fn source_of(&self, id: ViewId) -> Result<SourceId> {
        let node = self.node_or_stale(id)?;
        let source_id = node.source_id().ok_or(TreeError::StaleNode)?;
        match &self.source {
            Some(source) if source.contains(source_id) => Ok(source_id),
            _ => {
                tracing::warn!(target: targets::SYNC, %source_id, "view node points at a missing source node");
                Err(TreeError::MissingSource { node: source_id })
            }
        }
    }

    /// The raw (unprefixed) name of the data behind a node.
    pub fn data_name(&self, id: ViewId) -> Option<String> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Mirrored(src) => self.source.as_ref()?.name(*src),
            NodeKind::Standalone(value) => Some(value.name.clone()),
        }
    }

    /// Clone the data behind a node and its subtree.
    pub fn snapshot(&self, id: ViewId) -> Option<NodeData> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Mirrored(src) => self.source.as_ref()?.snapshot(*src),
            NodeKind::Standalone(_) => self.standalone_snapshot(id),
        }
    }

    /// Names of the non-field children of `parent`.
    pub(crate) fn child_names(&self, parent: ViewId) -> Vec<String> {
        if let Some(source) = &self.source {
            return self
                .source_of(parent)
                .map(|src| source.children(src).into_iter().filter_map(|c| source.name(c)).collect())
                .unwrap_or_default();
        }
        self.children(parent)
            .iter()
            .filter_map(|&c| {
                let node = self.nodes.get(c)?;
                match &node.kind {
                    NodeKind::Standalone(value) if !node.field => Some(value.name.clone()),
                    _ => None,
                }
            })
            .collect()
    }

    /// Position of `id` among its parent's non-field children.
    pub(crate) fn position_in_parent(&self, id: ViewId) -> Option<usize> {
        if let Some(source) = &self.source {
            let src = self.source_of(id).ok()?;
            let parent = source.parent(src)?;
            return source.children(parent).iter().position(|&c| c == src);
        }
        let parent = self.parent(id)?;
        self.children(parent)
            .iter()
            .filter(|&&c| self.nodes.get(c).is_some_and(|n| !n.field))
            .position(|&c| c == id)
    }

    fn field_count(&self, parent: ViewId) -> usize {
        self.children(parent)
            .iter()
            .filter(|&&c| self.nodes.get(c).is_some_and(|n| n.field))
            .count()
    }

    /// Insert `data` as a non-field child of `parent` at `index` (clamped).
    pub(crate) fn insert_data_at(&mut self, parent: ViewId, index: usize, data: NodeData) -> Result<()> {
        if let Some(source) = self.source.clone() {
            let parent_src = self.source_of(parent)?;
            source.insert_child(parent_src, index, data)?;
            return Ok(());
        }
        self.node_or_stale(parent)?;
        let offset = self.field_count(parent).saturating_add(index);
        self.build_standalone(Some(parent), offset, data, false);
        Ok(())
    }

    /// Delete the data behind a node.
    pub(crate) fn remove_node_data(&mut self, id: ViewId) -> Result<()> {
        self.guard_structural(id, "delete")?;
        if let Some(source) = self.source.clone() {
            let src = self.source_of(id)?;
            return source.delete(src);
        }
        self.remove_subtree(id);
        Ok(())
    }

    /// Overwrite the data behind a node with `data`, keeping its name.
    pub(crate) fn assign_data(&mut self, id: ViewId, data: NodeData) -> Result<()> {
        if let Some(source) = self.source.clone() {
            let src = self.source_of(id)?;
            return source.assign(src, data);
        }
        self.node_or_stale(id)?;
        for child in self.children(id).to_vec() {
            self.remove_subtree(child);
        }
        let NodeData {
            value,
            properties,
            fields,
            children,
            ..
        } = data;
        if let Some(node) = self.nodes.get_mut(id)
            && let NodeKind::Standalone(current) = &mut node.kind
        {
            current.value = value;
            current.properties = properties;
        }
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
        Ok(())
    }

    /// Rename the data behind a node.
    pub(crate) fn rename_data(&mut self, id: ViewId, name: &str) -> Result<()> {
        if let Some(source) = self.source.clone() {
            let src = self.source_of(id)?;
            return source.rename(src, name);
        }
        let node = self.nodes.get_mut(id).ok_or(TreeError::StaleNode)?;
        node.name = node::identity(name, node.field);
        node.label = name.to_string();
        if let NodeKind::Standalone(value) = &mut node.kind {
            value.name = name.to_string();
        }
        Ok(())
    }

    /// Move the data behind `id` under `new_parent`, before the non-field
    /// child currently at `index`.
    pub(crate) fn move_data(&mut self, id: ViewId, new_parent: ViewId, index: usize) -> Result<()> {
        self.guard_structural(id, "move")?;
        if let Some(source) = self.source.clone() {
            let src = self.source_of(id)?;
            let parent_src = self.source_of(new_parent)?;
            return source.move_node(src, parent_src, index);
        }
        self.node_or_stale(new_parent)?;
        if self.is_ancestor_or_self(id, new_parent) {
            return Err(TreeError::InvalidMove {
                name: self.data_name(id).unwrap_or_default(),
            });
        }
        let old_parent = self.parent(id).ok_or(TreeError::root("move"))?;
        let old_pos = self.position_in_parent(id).unwrap_or(0);
        let index = if old_parent == new_parent && old_pos < index {
            index - 1
        } else {
            index
        };
        if let Some(parent) = self.nodes.get_mut(old_parent) {
            parent.children.retain(|&c| c != id);
        }
        let offset = self.field_count(new_parent).saturating_add(index);
        if let Some(parent) = self.nodes.get_mut(new_parent) {
            let offset = offset.min(parent.children.len());
            parent.children.insert(offset, id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(new_parent);
        }
        self.indices_dirty = true;
        Ok(())
    }

    /// Reject edits on read-only views, the root and field nodes.
    pub(crate) fn guard_structural(&self, id: ViewId, op: &'static str) -> Result<()> {
        if self.is_read_only() {
            return Err(TreeError::ReadOnly { op });
        }
        let node = self.node_or_stale(id)?;
        if node.parent.is_none() {
            return Err(TreeError::root(op));
        }
        if node.field {
            return Err(TreeError::field(op));
        }
        Ok(())
    }

    pub(crate) fn guard_writable(&self, op: &'static str) -> Result<()> {
        if self.is_read_only() {
            return Err(TreeError::ReadOnly { op });
        }
        Ok(())
    }

    /// Report an edit error: rejections go to the `rejected` signal.
    pub(crate) fn reject<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            tracing::warn!(target: targets::TRANSFER, error = %err, "edit rejected");
            if err.is_user_rejection() {
                self.rejected.emit(err.to_string());
            }
        }
        result
    }

    /// Bring the view in line with its data after one or more edits.
    pub fn commit_edit(&mut self) -> Result<()> {
        if self.source.is_some() {
            self.pending.lock().clear();
            self.resync()?;
        }
        self.tree_changed();
        Ok(())
    }

    /// Locate a child of `parent` by raw name after a commit.
    pub(crate) fn child_by_data_name(&self, parent: ViewId, name: &str) -> Option<ViewId> {
        self.child_by_name(parent, &node::identity(name, false))
    }

    /// Delete a node, moving the selection to its successor (or predecessor).
    pub fn delete_node(&mut self, id: ViewId) -> Result<()> {
        let checked = self.guard_structural(id, "delete");
        self.reject(checked)?;
        self.close(id);
        if self.move_down(id, SelectMode::SelectOne).is_none() {
            self.move_up(id, SelectMode::SelectOne);
        }
        self.remove_node_data(id)?;
        tracing::debug!(target: targets::TRANSFER, ?id, "deleted node");
        self.commit_edit()
    }

    /// Insert a copy of a node right after it, named with the copy suffix.
    pub fn duplicate(&mut self, id: ViewId) -> Result<Option<ViewId>> {
        let checked = self.guard_structural(id, "duplicate");
        self.reject(checked)?;
        let parent = self.parent(id).ok_or(TreeError::root("duplicate"))?;
        let mut data = self.snapshot(id).ok_or(TreeError::StaleNode)?;
        let position = self.position_in_parent(id).ok_or(TreeError::StaleNode)?;
        let existing = self.child_names(parent);
        data.name = unique_name(&existing, &format!("{}{}", data.name, self.config.copy_suffix), &self.config.copy_suffix);
        let name = data.name.clone();

        self.unselect(id);
        self.insert_data_at(parent, position + 1, data)?;
        self.commit_edit()?;

        let copy = self.child_by_data_name(parent, &name);
        if let Some(copy) = copy {
            self.select_action(copy, SelectMode::SelectOne);
        }
        Ok(copy)
    }

    /// Insert `count` new siblings before a node.
    pub fn insert_before(&mut self, id: ViewId, count: usize) -> Result<Option<ViewId>> {
        self.insert_siblings(id, 0, count, "insert before")
    }

    /// Insert `count` new siblings after a node.
    pub fn insert_after(&mut self, id: ViewId, count: usize) -> Result<Option<ViewId>> {
        self.insert_siblings(id, 1, count, "insert after")
    }

    fn insert_siblings(&mut self, id: ViewId, rel: usize, count: usize, op: &'static str) -> Result<Option<ViewId>> {
        let checked = self.guard_structural(id, op);
        self.reject(checked)?;
        let parent = self.parent(id).ok_or(TreeError::root(op))?;
        let position = self.position_in_parent(id).ok_or(TreeError::StaleNode)? + rel;
        self.add_new_nodes(parent, position, count)
    }

    /// Append `count` new children to a node and open it.
    pub fn add_child(&mut self, id: ViewId, count: usize) -> Result<Option<ViewId>> {
        let checked = self.guard_writable("add child").and_then(|()| self.node_or_stale(id).map(|_| ()));
        self.reject(checked)?;
        let position = self.child_names(id).len();
        let last = self.add_new_nodes(id, position, count)?;
        self.open(id);
        Ok(last)
    }

    fn add_new_nodes(&mut self, parent: ViewId, position: usize, count: usize) -> Result<Option<ViewId>> {
        if count == 0 {
            return Ok(None);
        }
        let mut last = None;
        for i in 0..count {
            let existing = self.child_names(parent);
            let name = fresh_name(&existing, position + i);
            self.insert_data_at(parent, position + i, NodeData::new(name.clone()))?;
            last = Some(name);
        }
        self.commit_edit()?;
        let selected = last.and_then(|name| self.child_by_data_name(parent, &name));
        if let Some(node) = selected {
            self.select_action(node, SelectMode::SelectOne);
        }
        Ok(selected)
    }

    /// Move a node under `new_parent`, before the non-field child currently
    /// at `index`.
    pub fn move_node(&mut self, id: ViewId, new_parent: ViewId, index: usize) -> Result<()> {
        let moved = self.move_data(id, new_parent, index);
        self.reject(moved)?;
        self.commit_edit()
    }

    /// Rename the data behind a node.
    ///
    /// A name already taken by a sibling gets the copy suffix appended
    /// until it is unique.
    pub fn rename(&mut self, id: ViewId, name: &str) -> Result<()> {
        let checked = self.guard_structural(id, "rename");
        self.reject(checked)?;
        let parent = self.parent(id).ok_or(TreeError::root("rename"))?;
        let mut siblings = self.child_names(parent);
        if let Some(current) = self.data_name(id)
            && let Some(pos) = siblings.iter().position(|n| *n == current)
        {
            siblings.remove(pos);
        }
        let name = unique_name(&siblings, name, &self.config.copy_suffix);
        self.rename_data(id, &name)?;
        self.commit_edit()?;
        if let Some(renamed) = self.child_by_data_name(parent, &name) {
            self.select_action(renamed, SelectMode::SelectOne);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::source::{NodeTree, SourceTree};

    fn data() -> NodeData {
        NodeData::new("R")
            .with_field(NodeData::new("meta"))
            .with_child(NodeData::new("A"))
            .with_child(NodeData::new("B").with_child(NodeData::new("B1")))
            .with_child(NodeData::new("C"))
    }

    fn labels(view: &TreeView, parent: ViewId) -> Vec<String> {
        view.children(parent)
            .iter()
            .map(|&c| view.node(c).unwrap().label().to_string())
            .collect()
    }

    fn both() -> Vec<TreeView> {
        vec![
            TreeView::standalone(data()),
            TreeView::mirrored(Arc::new(NodeTree::from_data(data()))),
        ]
    }

    #[test]
    fn test_unique_name() {
        let existing = vec!["X".to_string(), "X_Copy".to_string()];
        assert_eq!(unique_name(&existing, "X", "_Copy"), "X_Copy_Copy");
        assert_eq!(unique_name(&existing, "Y", "_Copy"), "Y");
        assert_eq!(fresh_name(&["new-1".to_string()], 1), "new-2");
    }

    #[test]
    fn test_delete_moves_selection_down() {
        for mut view in both() {
            let root = view.root();
            let a = view.child_by_name(root, "tv_A").unwrap();
            let b = view.child_by_name(root, "tv_B").unwrap();
            view.delete_node(a).unwrap();

            assert_eq!(labels(&view, root), ["meta", "B", "C"]);
            assert_eq!(view.selected_nodes(), &[b]);
        }
    }

    #[test]
    fn test_delete_last_moves_selection_up() {
        for mut view in both() {
            let root = view.root();
            let b = view.child_by_name(root, "tv_B").unwrap();
            let c = view.child_by_name(root, "tv_C").unwrap();
            let b1 = view.child_by_name(b, "tv_B1").unwrap();
            view.delete_node(c).unwrap();
            assert_eq!(view.selected_nodes(), &[b1]);
        }
    }

    #[test]
    fn test_delete_rejections() {
        for mut view in both() {
            let rejected = Arc::new(Mutex::new(Vec::new()));
            let r = rejected.clone();
            view.rejected.connect(move |msg| r.lock().push(msg.clone()));
            let root = view.root();
            let meta = view.child_by_name(root, "tvf_meta").unwrap();

            assert!(matches!(view.delete_node(root), Err(TreeError::RootOperation { .. })));
            assert!(matches!(view.delete_node(meta), Err(TreeError::FieldOperation { .. })));
            assert_eq!(rejected.lock().len(), 2);
            assert_eq!(view.len(), 6);
        }
    }

    #[test]
    fn test_duplicate_inserts_copy_after() {
        for mut view in both() {
            let root = view.root();
            let b = view.child_by_name(root, "tv_B").unwrap();
            let copy = view.duplicate(b).unwrap().unwrap();

            assert_eq!(labels(&view, root), ["meta", "A", "B", "B_Copy", "C"]);
            assert_eq!(labels(&view, copy), ["B1"]);
            assert_eq!(view.selected_nodes(), &[copy]);
        }
    }

    #[test]
    fn test_insert_and_add_child() {
        for mut view in both() {
            let root = view.root();
            let a = view.child_by_name(root, "tv_A").unwrap();
            let last = view.insert_after(a, 2).unwrap().unwrap();
            assert_eq!(labels(&view, root), ["meta", "A", "new-1", "new-2", "B", "C"]);
            assert_eq!(view.selected_nodes(), &[last]);

            let first = view.insert_before(a, 1).unwrap().unwrap();
            assert_eq!(view.node(first).unwrap().label(), "new-0");

            let added = view.add_child(a, 1).unwrap().unwrap();
            assert_eq!(view.parent(added), Some(a));
            assert!(!view.node(a).unwrap().is_closed());
        }
    }

    #[test]
    fn test_move_node_between_parents() {
        for mut view in both() {
            let root = view.root();
            let a = view.child_by_name(root, "tv_A").unwrap();
            let b = view.child_by_name(root, "tv_B").unwrap();

            view.move_node(a, b, 0).unwrap();
            assert_eq!(labels(&view, root), ["meta", "B", "C"]);
            assert_eq!(labels(&view, b), ["A", "B1"]);

            let moved = view.child_by_name(b, "tv_A").unwrap();
            assert!(matches!(view.move_node(b, moved, 0), Err(TreeError::InvalidMove { .. })));
        }
    }

    #[test]
    fn test_move_within_parent() {
        for mut view in both() {
            let root = view.root();
            let a = view.child_by_name(root, "tv_A").unwrap();
            view.move_node(a, root, 3).unwrap();
            assert_eq!(labels(&view, root), ["meta", "B", "C", "A"]);
        }
    }

    #[test]
    fn test_edits_emit_one_change() {
        for mut view in both() {
            let count = Arc::new(AtomicUsize::new(0));
            let c = count.clone();
            view.changed.connect(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
            let a = view.child_by_name(view.root(), "tv_A").unwrap();
            view.delete_node(a).unwrap();
            assert_eq!(count.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_read_only_blocks_edits() {
        let mut view = TreeView::standalone(data()).with_read_only(true);
        let a = view.child_by_name(view.root(), "tv_A").unwrap();
        assert!(matches!(view.delete_node(a), Err(TreeError::ReadOnly { .. })));
        assert!(matches!(view.add_child(a, 1), Err(TreeError::ReadOnly { .. })));
    }

    #[test]
    fn test_mirrored_edits_reach_source() {
        let source = Arc::new(NodeTree::from_data(data()));
        let mut view = TreeView::mirrored(source.clone());
        let a = view.child_by_name(view.root(), "tv_A").unwrap();
        view.rename(a, "Alpha").unwrap();
        assert!(source.child_by_name(source.root(), "Alpha").is_some());
        assert!(view.child_by_name(view.root(), "tv_Alpha").is_some());
        assert!(!view.has_pending_changes());
    }

    #[test]
    fn test_rename_onto_sibling_name_stays_unique() {
        for mut view in both() {
            let root = view.root();
            let a = view.child_by_name(root, "tv_A").unwrap();
            view.rename(a, "B").unwrap();

            assert_eq!(labels(&view, root), ["meta", "B_Copy", "B", "C"]);
            let children = view.children(root).to_vec();
            assert_eq!(children.len(), 4);
            assert!(children.iter().enumerate().all(|(i, c)| !children[i + 1..].contains(c)));
            let renamed = view.child_by_name(root, "tv_B_Copy").unwrap();
            assert_eq!(view.selected_nodes(), &[renamed]);

            let b = view.child_by_name(root, "tv_B").unwrap();
            view.rename(b, "B").unwrap();
            assert_eq!(view.data_name(b).as_deref(), Some("B"));
        }
    }
}
