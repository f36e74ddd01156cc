//! Detached node data and the codec used for transfer payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TreeError};
use crate::transfer::mime;

/// A detached, owned copy of a node and its subtree.
///
/// This is what is cloned out of a source tree, carried through the
/// clipboard and drag-and-drop, and inserted back into a tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// The node name. Unique among its siblings once inserted.
    pub name: String,
    /// The node payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
    /// Per-node properties such as `view-closed`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    /// Structurally significant properties exposed as pseudo-children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<NodeData>,
    /// Ordered children.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeData>,
}

impl NodeData {
    /// Create a node with the given name and no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the payload.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Set a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Append a field pseudo-child.
    pub fn with_field(mut self, field: NodeData) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a child.
    pub fn with_child(mut self, child: NodeData) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children.
    pub fn with_children(mut self, children: impl IntoIterator<Item = NodeData>) -> Self {
        self.children.extend(children);
        self
    }

    /// Look up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&NodeData> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Total number of nodes in this subtree, fields included.
    pub fn node_count(&self) -> usize {
        1 + self
            .fields
            .iter()
            .chain(self.children.iter())
            .map(NodeData::node_count)
            .sum::<usize>()
    }
}

/// Encodes and decodes node subtrees for transfer.
pub trait NodeCodec: Send + Sync {
    /// The mime type of encoded payloads.
    fn mime_type(&self) -> &'static str;

    /// Encode a subtree.
    fn encode(&self, node: &NodeData) -> Result<Vec<u8>>;

    /// Decode a subtree.
    fn decode(&self, bytes: &[u8]) -> Result<NodeData>;
}

/// The default codec, storing subtrees as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl NodeCodec for JsonCodec {
    fn mime_type(&self) -> &'static str {
        mime::APPLICATION_JSON
    }

    fn encode(&self, node: &NodeData) -> Result<Vec<u8>> {
        serde_json::to_vec(node).map_err(|source| TreeError::Encode {
            name: node.name.clone(),
            source,
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<NodeData> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> NodeData {
        NodeData::new("root")
            .with_field(NodeData::new("style").with_value(json!({"color": "red"})))
            .with_child(NodeData::new("a").with_value(1))
            .with_child(
                NodeData::new("b")
                    .with_property("view-closed", true)
                    .with_child(NodeData::new("b1").with_value("leaf")),
            )
    }

    #[test]
    fn test_json_round_trip() {
        let codec = JsonCodec;
        let tree = sample();
        let bytes = codec.encode(&tree).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), tree);
    }

    #[test]
    fn test_decode_failure() {
        let err = JsonCodec.decode(b"{not json").unwrap_err();
        assert!(matches!(err, TreeError::Decode { .. }));
    }

    #[test]
    fn test_sparse_json_is_accepted() {
        let node = JsonCodec.decode(br#"{"name":"x"}"#).unwrap();
        assert_eq!(node, NodeData::new("x"));
    }

    #[test]
    fn test_node_count_and_lookup() {
        let tree = sample();
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.child("b").map(|b| b.children.len()), Some(1));
        assert!(tree.child("zzz").is_none());
    }
}
