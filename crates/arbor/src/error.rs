//! Error types for the tree view.

use crate::source::SourceId;

/// Result type alias for tree view operations.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors that can occur while operating on a tree view.
///
/// None of these are fatal to the view: a failed operation leaves the view
/// in the state it was in before the call.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The operation cannot be applied to the root node.
    #[error("Cannot {op} the root node")]
    RootOperation { op: &'static str },

    /// The operation cannot be applied to a field pseudo-node.
    #[error("Cannot {op} a field node")]
    FieldOperation { op: &'static str },

    /// A view node refers to a source node that no longer exists.
    #[error("Source node {node:?} is missing")]
    MissingSource { node: SourceId },

    /// A node cannot be moved into its own subtree.
    #[error("Cannot move '{name}' into its own subtree")]
    InvalidMove { name: String },

    /// A view node key does not refer to a live node.
    #[error("View node no longer exists")]
    StaleNode,

    /// A transfer payload item could not be decoded.
    #[error("Failed to decode node payload: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },

    /// A node could not be encoded for transfer.
    #[error("Failed to encode node '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The clipboard backend failed.
    #[error("Clipboard error: {message}")]
    Clipboard { message: String },

    /// The tree is read-only.
    #[error("Cannot {op}: the tree is read-only")]
    ReadOnly { op: &'static str },

    /// The configuration could not be parsed.
    #[error("Invalid tree view configuration: {source}")]
    Config {
        #[from]
        source: toml::de::Error,
    },
}

impl TreeError {
    /// Create a root-operation rejection.
    pub fn root(op: &'static str) -> Self {
        Self::RootOperation { op }
    }

    /// Create a field-operation rejection.
    pub fn field(op: &'static str) -> Self {
        Self::FieldOperation { op }
    }

    /// Create a clipboard error.
    pub fn clipboard(message: impl Into<String>) -> Self {
        Self::Clipboard {
            message: message.into(),
        }
    }

    /// Whether this error is a rejected user request rather than a failure.
    ///
    /// Rejections are reported to the user as a dismissible prompt.
    pub fn is_user_rejection(&self) -> bool {
        matches!(
            self,
            Self::RootOperation { .. }
                | Self::FieldOperation { .. }
                | Self::ReadOnly { .. }
                | Self::InvalidMove { .. }
        )
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(source: serde_json::Error) -> Self {
        Self::Decode { source }
    }
}
