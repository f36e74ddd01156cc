//! In-memory source tree.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;

use super::{NodeData, SourceChange, SourceId, SourceSignals, SourceTree};
use crate::error::{Result, TreeError};
use arbor_core::logging::targets;

/// Counter for generating unique node IDs.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_node_id() -> SourceId {
    SourceId(NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// A node in the tree structure.
struct SourceNode {
    name: String,
    value: Value,
    properties: BTreeMap<String, Value>,
    fields: Vec<SourceId>,
    children: Vec<SourceId>,
    parent: Option<SourceId>,
    is_field: bool,
}

/// Internal storage for tree nodes.
struct NodeStorage {
    nodes: HashMap<SourceId, SourceNode>,
}

impl NodeStorage {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    fn get(&self, id: SourceId) -> Option<&SourceNode> {
        self.nodes.get(&id)
    }

    fn get_mut(&mut self, id: SourceId) -> Option<&mut SourceNode> {
        self.nodes.get_mut(&id)
    }

    fn insert_data(&mut self, data: NodeData, parent: Option<SourceId>, is_field: bool) -> SourceId {
        let id = next_node_id();
        let NodeData {
            name,
            value,
            properties,
            fields,
            children,
        } = data;
        let fields = fields
            .into_iter()
            .map(|f| self.insert_data(f, Some(id), true))
            .collect();
        let children = children
            .into_iter()
            .map(|c| self.insert_data(c, Some(id), false))
            .collect();
        self.nodes.insert(
            id,
            SourceNode {
                name,
                value,
                properties,
                fields,
                children,
                parent,
                is_field,
            },
        );
        id
    }

    fn snapshot(&self, id: SourceId) -> Option<NodeData> {
        let node = self.get(id)?;
        Some(NodeData {
            name: node.name.clone(),
            value: node.value.clone(),
            properties: node.properties.clone(),
            fields: node.fields.iter().filter_map(|&f| self.snapshot(f)).collect(),
            children: node
                .children
                .iter()
                .filter_map(|&c| self.snapshot(c))
                .collect(),
        })
    }

    fn remove_subtree(&mut self, id: SourceId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        for kid in node.fields.into_iter().chain(node.children) {
            self.remove_subtree(kid);
        }
    }

    /// Remove `id` from its parent's child list, returning the old position.
    fn detach(&mut self, id: SourceId) -> Option<(SourceId, usize)> {
        let parent_id = self.get(id)?.parent?;
        let parent = self.get_mut(parent_id)?;
        let pos = parent.children.iter().position(|&c| c == id)?;
        parent.children.remove(pos);
        Some((parent_id, pos))
    }

    fn is_ancestor_or_self(&self, ancestor: SourceId, id: SourceId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.get(node).and_then(|n| n.parent);
        }
        false
    }

    fn count(&self) -> usize {
        self.nodes.len()
    }
}

/// A thread-safe in-memory source tree.
///
/// Every node has a name, a JSON payload, a property map and ordered lists of
/// fields and children. All mutations emit a [`SourceChange`] on
/// [`SourceTree::signals`] after the internal lock has been released, so
/// slots may read the tree.
///
/// # Example
///
/// ```
/// use arbor::source::{NodeData, NodeTree, SourceTree};
///
/// let tree = NodeTree::new("root");
/// let docs = tree.add_child(tree.root(), "docs").unwrap();
/// tree.add_child(docs, "readme").unwrap();
///
/// assert_eq!(tree.children(tree.root()), vec![docs]);
/// assert_eq!(tree.snapshot(docs).unwrap().children[0], NodeData::new("readme"));
/// ```
pub struct NodeTree {
    storage: RwLock<NodeStorage>,
    root: SourceId,
    signals: SourceSignals,
}

impl NodeTree {
    /// Create a tree containing only a root node.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self::from_data(NodeData::new(root_name))
    }

    /// Create a tree from detached data.
    pub fn from_data(data: NodeData) -> Self {
        let mut storage = NodeStorage::new();
        let root = storage.insert_data(data, None, false);
        Self {
            storage: RwLock::new(storage),
            root,
            signals: SourceSignals::new(),
        }
    }

    /// Append a new empty child named `name` to `parent`.
    pub fn add_child(&self, parent: SourceId, name: impl Into<String>) -> Result<SourceId> {
        self.insert_child(parent, usize::MAX, NodeData::new(name))
    }

    /// Find a direct child by name.
    pub fn child_by_name(&self, parent: SourceId, name: &str) -> Option<SourceId> {
        let storage = self.storage.read();
        storage
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|&c| storage.get(c).is_some_and(|n| n.name == name))
    }

    /// Find a field by name.
    pub fn field_by_name(&self, parent: SourceId, name: &str) -> Option<SourceId> {
        let storage = self.storage.read();
        storage
            .get(parent)?
            .fields
            .iter()
            .copied()
            .find(|&c| storage.get(c).is_some_and(|n| n.name == name))
    }

    /// The payload of a node.
    pub fn value(&self, id: SourceId) -> Option<Value> {
        self.storage.read().get(id).map(|n| n.value.clone())
    }

    /// Replace the payload of a node.
    ///
    /// Emits a value change.
    pub fn set_value(&self, id: SourceId, value: impl Into<Value>) -> Result<()> {
        {
            let mut storage = self.storage.write();
            let node = storage
                .get_mut(id)
                .ok_or(TreeError::MissingSource { node: id })?;
            node.value = value.into();
        }
        self.signals.changed.emit(SourceChange::value(id));
        Ok(())
    }

    /// Set a per-node property.
    ///
    /// Emits a value change.
    pub fn set_property(
        &self,
        id: SourceId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        {
            let mut storage = self.storage.write();
            let node = storage
                .get_mut(id)
                .ok_or(TreeError::MissingSource { node: id })?;
            node.properties.insert(key.into(), value.into());
        }
        self.signals.changed.emit(SourceChange::value(id));
        Ok(())
    }

    /// Total number of live nodes, fields included.
    pub fn node_count(&self) -> usize {
        self.storage.read().count()
    }

    fn structural(&self, node: SourceId) {
        tracing::trace!(target: targets::SOURCE, %node, "structural change");
        self.signals.changed.emit(SourceChange::structural(node));
    }
}

impl SourceTree for NodeTree {
    fn root(&self) -> SourceId {
        self.root
    }

    fn contains(&self, id: SourceId) -> bool {
        self.storage.read().get(id).is_some()
    }

    fn name(&self, id: SourceId) -> Option<String> {
        self.storage.read().get(id).map(|n| n.name.clone())
    }

    fn children(&self, id: SourceId) -> Vec<SourceId> {
        self.storage
            .read()
            .get(id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn fields(&self, id: SourceId) -> Vec<SourceId> {
        self.storage
            .read()
            .get(id)
            .map(|n| n.fields.clone())
            .unwrap_or_default()
    }

    fn is_field(&self, id: SourceId) -> bool {
        self.storage.read().get(id).is_some_and(|n| n.is_field)
    }

    fn parent(&self, id: SourceId) -> Option<SourceId> {
        self.storage.read().get(id).and_then(|n| n.parent)
    }

    fn property(&self, id: SourceId, key: &str) -> Option<Value> {
        self.storage
            .read()
            .get(id)
            .and_then(|n| n.properties.get(key).cloned())
    }

    fn snapshot(&self, id: SourceId) -> Option<NodeData> {
        self.storage.read().snapshot(id)
    }

    fn insert_child(&self, parent: SourceId, index: usize, data: NodeData) -> Result<SourceId> {
        let id = {
            let mut storage = self.storage.write();
            if storage.get(parent).is_none() {
                return Err(TreeError::MissingSource { node: parent });
            }
            let id = storage.insert_data(data, Some(parent), false);
            let parent_node = storage
                .get_mut(parent)
                .ok_or(TreeError::MissingSource { node: parent })?;
            let index = index.min(parent_node.children.len());
            parent_node.children.insert(index, id);
            id
        };
        self.structural(parent);
        Ok(id)
    }

    fn delete(&self, id: SourceId) -> Result<()> {
        let parent = {
            let mut storage = self.storage.write();
            let node = storage.get(id).ok_or(TreeError::MissingSource { node: id })?;
            if node.is_field {
                return Err(TreeError::field("delete"));
            }
            if id == self.root {
                return Err(TreeError::root("delete"));
            }
            let (parent, _) = storage
                .detach(id)
                .ok_or(TreeError::MissingSource { node: id })?;
            storage.remove_subtree(id);
            parent
        };
        self.structural(parent);
        Ok(())
    }

    fn assign(&self, id: SourceId, data: NodeData) -> Result<()> {
        {
            let mut storage = self.storage.write();
            let node = storage.get_mut(id).ok_or(TreeError::MissingSource { node: id })?;
            let old_kids: Vec<SourceId> = node.fields.drain(..).chain(node.children.drain(..)).collect();
            node.value = data.value;
            node.properties = data.properties;
            for kid in old_kids {
                storage.remove_subtree(kid);
            }
            let fields: Vec<SourceId> = data
                .fields
                .into_iter()
                .map(|f| storage.insert_data(f, Some(id), true))
                .collect();
            let children: Vec<SourceId> = data
                .children
                .into_iter()
                .map(|c| storage.insert_data(c, Some(id), false))
                .collect();
            let node = storage.get_mut(id).ok_or(TreeError::MissingSource { node: id })?;
            node.fields = fields;
            node.children = children;
        }
        self.structural(id);
        Ok(())
    }

    fn rename(&self, id: SourceId, name: &str) -> Result<()> {
        let parent = {
            let mut storage = self.storage.write();
            let node = storage.get_mut(id).ok_or(TreeError::MissingSource { node: id })?;
            node.name = name.to_string();
            node.parent.unwrap_or(id)
        };
        self.structural(parent);
        Ok(())
    }

    fn move_node(&self, id: SourceId, new_parent: SourceId, index: usize) -> Result<()> {
        let old_parent = {
            let mut storage = self.storage.write();
            let node = storage.get(id).ok_or(TreeError::MissingSource { node: id })?;
            if node.is_field {
                return Err(TreeError::field("move"));
            }
            if id == self.root {
                return Err(TreeError::root("move"));
            }
            if storage.get(new_parent).is_none() {
                return Err(TreeError::MissingSource { node: new_parent });
            }
            if storage.is_ancestor_or_self(id, new_parent) {
                return Err(TreeError::InvalidMove {
                    name: node.name.clone(),
                });
            }
            let (old_parent, old_pos) = storage
                .detach(id)
                .ok_or(TreeError::MissingSource { node: id })?;
            let mut index = index;
            if old_parent == new_parent && old_pos < index {
                index -= 1;
            }
            let parent_node = storage
                .get_mut(new_parent)
                .ok_or(TreeError::MissingSource { node: new_parent })?;
            let index = index.min(parent_node.children.len());
            parent_node.children.insert(index, id);
            if let Some(node) = storage.get_mut(id) {
                node.parent = Some(new_parent);
            }
            old_parent
        };
        self.structural(old_parent);
        if old_parent != new_parent {
            self.structural(new_parent);
        }
        Ok(())
    }

    fn signals(&self) -> &SourceSignals {
        &self.signals
    }
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTree")
            .field("root", &self.root)
            .field("nodes", &self.node_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    use crate::source::ChangeKind;

    fn names(tree: &NodeTree, parent: SourceId) -> Vec<String> {
        tree.children(parent)
            .into_iter()
            .filter_map(|c| tree.name(c))
            .collect()
    }

    #[test]
    fn test_build_and_snapshot() {
        let data = NodeData::new("root")
            .with_field(NodeData::new("kind").with_value("folder"))
            .with_child(NodeData::new("a").with_value(1))
            .with_child(NodeData::new("b").with_child(NodeData::new("b1")));
        let tree = NodeTree::from_data(data.clone());

        assert_eq!(tree.node_count(), 5);
        assert_eq!(names(&tree, tree.root()), vec!["a", "b"]);
        assert_eq!(tree.fields(tree.root()).len(), 1);
        assert!(tree.is_field(tree.fields(tree.root())[0]));
        assert_eq!(tree.snapshot(tree.root()), Some(data));
    }

    #[test]
    fn test_insert_and_delete() {
        let tree = NodeTree::new("root");
        let a = tree.add_child(tree.root(), "a").unwrap();
        tree.add_child(a, "a1").unwrap();
        tree.insert_child(tree.root(), 0, NodeData::new("first")).unwrap();
        assert_eq!(names(&tree, tree.root()), vec!["first", "a"]);

        tree.delete(a).unwrap();
        assert_eq!(names(&tree, tree.root()), vec!["first"]);
        assert_eq!(tree.node_count(), 2);
        assert!(!tree.contains(a));
    }

    #[test]
    fn test_delete_rejections() {
        let tree = NodeTree::from_data(NodeData::new("root").with_field(NodeData::new("f")));
        let field = tree.fields(tree.root())[0];
        assert!(matches!(tree.delete(tree.root()), Err(TreeError::RootOperation { .. })));
        assert!(matches!(tree.delete(field), Err(TreeError::FieldOperation { .. })));
        assert!(matches!(
            tree.delete(SourceId(u64::MAX)),
            Err(TreeError::MissingSource { .. })
        ));
    }

    #[test]
    fn test_move_within_parent() {
        let tree = NodeTree::new("root");
        let a = tree.add_child(tree.root(), "a").unwrap();
        tree.add_child(tree.root(), "b").unwrap();
        tree.add_child(tree.root(), "c").unwrap();

        // Lands before the child currently at index 3 (the end).
        tree.move_node(a, tree.root(), 3).unwrap();
        assert_eq!(names(&tree, tree.root()), vec!["b", "c", "a"]);

        tree.move_node(a, tree.root(), 0).unwrap();
        assert_eq!(names(&tree, tree.root()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_move_across_parents() {
        let tree = NodeTree::new("root");
        let a = tree.add_child(tree.root(), "a").unwrap();
        let b = tree.add_child(tree.root(), "b").unwrap();
        let a1 = tree.add_child(a, "a1").unwrap();

        tree.move_node(a1, b, 0).unwrap();
        assert_eq!(tree.parent(a1), Some(b));
        assert!(tree.children(a).is_empty());
        assert_eq!(tree.path_from(tree.root(), a1).as_deref(), Some("b/a1"));

        assert!(matches!(tree.move_node(b, a1, 0), Err(TreeError::InvalidMove { .. })));
        assert!(matches!(tree.move_node(b, b, 0), Err(TreeError::InvalidMove { .. })));
    }

    #[test]
    fn test_assign_keeps_name() {
        let tree = NodeTree::new("root");
        let a = tree.add_child(tree.root(), "a").unwrap();
        tree.add_child(a, "old").unwrap();

        let data = NodeData::new("other")
            .with_value(json!(5))
            .with_child(NodeData::new("new"));
        tree.assign(a, data).unwrap();

        assert_eq!(tree.name(a).as_deref(), Some("a"));
        assert_eq!(tree.value(a), Some(json!(5)));
        assert_eq!(names(&tree, a), vec!["new"]);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_change_notifications() {
        let tree = NodeTree::new("root");
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        tree.signals().changed.connect(move |c| sink.lock().push(*c));

        let a = tree.add_child(tree.root(), "a").unwrap();
        tree.set_value(a, 3).unwrap();
        tree.set_property(a, "view-closed", true).unwrap();
        tree.rename(a, "z").unwrap();

        let kinds: Vec<ChangeKind> = changes.lock().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Structural,
                ChangeKind::Value,
                ChangeKind::Value,
                ChangeKind::Structural
            ]
        );
        assert!(tree.flag(a, "view-closed"));
    }

    #[test]
    fn test_slot_can_read_tree_during_emit() {
        let tree = Arc::new(NodeTree::new("root"));
        let seen = Arc::new(Mutex::new(0usize));
        let reader = Arc::downgrade(&tree);
        let sink = seen.clone();
        tree.signals().changed.connect(move |c| {
            if let Some(tree) = reader.upgrade() {
                *sink.lock() = tree.children(c.node).len();
            }
        });
        tree.add_child(tree.root(), "a").unwrap();
        assert_eq!(*seen.lock(), 1);
    }
}
