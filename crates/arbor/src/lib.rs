//! Arbor - a headless tree view that mirrors a hierarchical data source.
//!
//! A [`TreeView`] shows an ordered, collapsible hierarchy with multi-node
//! selection, keyboard-style navigation, open/close state, row layout, and
//! clipboard and drag-and-drop editing. It either mirrors a [`SourceTree`]
//! (resyncing by name when the source reports a change) or owns its data.
//!
//! Rendering, fonts and platform event dispatch belong to the host: the view
//! produces row rectangles and dirty markers, and consumes resolved
//! [`KeyCommand`]s and [`PointerEvent`]s.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use arbor::{KeyCommand, Modifiers, NodeData, NodeTree, PasteMode, TreeView};
//!
//! let source = Arc::new(NodeTree::from_data(
//!     NodeData::new("project")
//!         .with_child(NodeData::new("src").with_child(NodeData::new("main.rs")))
//!         .with_child(NodeData::new("README.md")),
//! ));
//! let mut view = TreeView::mirrored(source);
//!
//! // Move down to "src" and copy it next to itself.
//! view.handle_key(KeyCommand::MoveDown, Modifiers::NONE).unwrap();
//! view.handle_key(KeyCommand::Copy, Modifiers::NONE).unwrap();
//! let src = view.child_by_name(view.root(), "tv_src").unwrap();
//! view.paste(src, PasteMode::After).unwrap();
//!
//! assert!(view.child_by_name(view.root(), "tv_src_Copy").is_some());
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod source;
pub mod transfer;
pub mod view;

pub use config::{RowMetrics, TreeViewConfig};
pub use error::{Result, TreeError};
pub use geometry::{Point, Rect, Size};
pub use source::{
    ChangeKind, JsonCodec, NodeCodec, NodeData, NodeTree, SourceChange, SourceId, SourceSignals, SourceTree,
};
pub use transfer::{ClipboardBackend, DragSession, DropAction, DropOutcome, LocalClipboard, MimeData, MimeEntry};
#[cfg(feature = "system-clipboard")]
pub use transfer::SystemClipboard;
pub use view::{
    ContextAction, ContextMenuEntry, DefaultHooks, KeyCommand, Modifiers, NodeKind, NodeValue, PasteMode,
    PointerEvent, PointerResponse, SelectMode, SyncStats, TreeDebug, TreeFormatOptions, TreeId, TreeStyle,
    TreeView, TreeViewHooks, ViewId, ViewNode,
};

pub use arbor_core::{ConnectionId, Signal};
