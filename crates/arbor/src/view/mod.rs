//! The tree view.
//!
//! A [`TreeView`] is a headless, ordered, collapsible hierarchy of
//! [`ViewNode`]s kept in a `slotmap` arena. It either mirrors a
//! [`SourceTree`] (see [`TreeView::mirrored`]) or owns its data outright
//! (see [`TreeView::standalone`]).
//!
//! The view is single-threaded: every mutation goes through `&mut self`.
//! Source change notifications may arrive from any thread; they are queued
//! and applied by [`TreeView::process_source_changes`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use arbor::{NodeData, NodeTree, SelectMode, SourceTree, TreeView};
//!
//! let source = Arc::new(NodeTree::from_data(
//!     NodeData::new("root")
//!         .with_child(NodeData::new("a"))
//!         .with_child(NodeData::new("b")),
//! ));
//! let mut view = TreeView::mirrored(source.clone());
//!
//! let a = view.child_by_name(view.root(), "tv_a").unwrap();
//! view.select_action(a, SelectMode::SelectOne);
//! assert_eq!(view.selected_nodes(), &[a]);
//!
//! source.add_child(source.root(), "c").unwrap();
//! view.process_source_changes();
//! assert_eq!(view.children(view.root()).len(), 3);
//! ```

mod debug;
mod edit;
mod input;
mod layout;
mod navigation;
mod node;
mod open;
mod selection;
mod sync;
mod transfer;

pub use debug::{TreeDebug, TreeFormatOptions, TreeStyle};
pub use input::{ContextAction, ContextMenuEntry, KeyCommand, Modifiers, PointerEvent, PointerResponse};
pub use node::{CHILD_PREFIX, FIELD_PREFIX, NodeKind, NodeValue, ViewId, ViewNode};
pub use open::{DefaultHooks, TreeViewHooks};
pub use selection::SelectMode;
pub use sync::SyncStats;
pub use transfer::PasteMode;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arbor_core::{ConnectionId, PerfSpan, Signal, SignalEmitter, span_names, targets};
use parking_lot::Mutex;
use slotmap::SlotMap;

use crate::config::TreeViewConfig;
use crate::geometry::Point;
use crate::source::{JsonCodec, NodeCodec, NodeData, SourceChange, SourceTree};
use crate::transfer::{ClipboardBackend, LocalClipboard};
use selection::SelectionState;

static TREE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A process-unique identifier for a tree view.
///
/// Drag sessions carry the id of the view they started in so that a drop
/// can tell same-tree moves from cross-tree transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(u64);

impl TreeId {
    fn next() -> Self {
        Self(TREE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Dirty markers consumed by the host renderer.
#[derive(Debug, Clone, Copy, Default)]
struct RenderState {
    needs_layout: bool,
    needs_render: bool,
    needs_full_render: bool,
}

/// A headless tree view.
pub struct TreeView {
    nodes: SlotMap<ViewId, ViewNode>,
    root: ViewId,
    source: Option<Arc<dyn SourceTree>>,
    source_connection: Option<ConnectionId>,
    pending: Arc<Mutex<Vec<SourceChange>>>,
    selection: SelectionState,
    focus: Option<ViewId>,
    scroll_request: Option<ViewId>,
    config: TreeViewConfig,
    source_read_only: bool,
    render: RenderState,
    hooks: Box<dyn TreeViewHooks>,
    clipboard: Arc<dyn ClipboardBackend>,
    codec: Arc<dyn NodeCodec>,
    id: TreeId,
    indices_dirty: bool,

    /// Emitted when a node becomes selected by a user action.
    pub selected: Signal<ViewId>,
    /// Emitted when a node is unselected by a user action.
    pub unselected: Signal<ViewId>,
    /// Emitted once after select-all, with the root.
    pub all_selected: Signal<ViewId>,
    /// Emitted once after unselect-all, with the root.
    pub all_unselected: Signal<ViewId>,
    /// Emitted when a node is opened.
    pub opened: Signal<ViewId>,
    /// Emitted when a node is closed.
    pub closed: Signal<ViewId>,
    /// Emitted once after each structural change, with the root.
    pub changed: Signal<ViewId>,
    /// Emitted when a resync creates a node.
    pub inserted: Signal<ViewId>,
    /// Emitted when a resync is about to drop a node.
    pub deleted: Signal<ViewId>,
    /// Emitted when the host should show a context menu for a node.
    pub context_menu_requested: Signal<(ViewId, Point)>,
    /// Emitted with a user-facing message when an edit is rejected.
    pub rejected: Signal<String>,
}

impl TreeView {
    fn empty(root: ViewNode) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(root);
        Self {
            nodes,
            root,
            source: None,
            source_connection: None,
            pending: Arc::new(Mutex::new(Vec::new())),
            selection: SelectionState::default(),
            focus: None,
            scroll_request: None,
            config: TreeViewConfig::default(),
            source_read_only: false,
            render: RenderState::default(),
            hooks: Box::new(DefaultHooks),
            clipboard: Arc::new(LocalClipboard::new()),
            codec: Arc::new(JsonCodec),
            id: TreeId::next(),
            indices_dirty: true,
            selected: Signal::new(),
            unselected: Signal::new(),
            all_selected: Signal::new(),
            all_unselected: Signal::new(),
            opened: Signal::new(),
            closed: Signal::new(),
            changed: Signal::new(),
            inserted: Signal::new(),
            deleted: Signal::new(),
            context_menu_requested: Signal::new(),
            rejected: Signal::new(),
        }
    }

    /// Create a view that mirrors `source`.
    ///
    /// The view subscribes to the source's change signal and builds its
    /// initial node tree immediately.
    pub fn mirrored(source: Arc<dyn SourceTree>) -> Self {
        let root_id = source.root();
        let name = source.name(root_id).unwrap_or_default();
        let label = source.label(root_id).unwrap_or_else(|| name.clone());
        let root = ViewNode::new(node::identity(&name, false), label, NodeKind::Mirrored(root_id), None, false);

        let mut view = Self::empty(root);
        let queue = Arc::clone(&view.pending);
        view.source_connection = Some(source.signals().changed.connect(move |change| {
            queue.lock().push(*change);
        }));
        view.source = Some(source);
        view.rebuild();
        arbor_core::arbor_debug!(id = ?view.id, nodes = view.len(), "mirrored view created");
        view
    }

    /// Create a view that owns `data` and has no source.
    pub fn standalone(data: NodeData) -> Self {
        let placeholder = ViewNode::new(String::new(), String::new(), NodeKind::Standalone(NodeValue::default()), None, false);
        let mut view = Self::empty(placeholder);
        let placeholder = view.root;
        view.root = view.build_standalone(None, 0, data, false);
        view.nodes.remove(placeholder);
        view.rebuild();
        arbor_core::arbor_debug!(id = ?view.id, nodes = view.len(), "standalone view created");
        view
    }

    /// Replace the configuration and rebuild the open state.
    pub fn with_config(mut self, config: TreeViewConfig) -> Self {
        self.config = config;
        self.rebuild();
        self
    }

    /// Set the depth below which nodes start open.
    pub fn with_open_depth(mut self, depth: usize) -> Self {
        self.config.open_depth = depth;
        self.rebuild();
        self
    }

    /// Set the per-level indentation.
    pub fn with_indent(mut self, indent: f32) -> Self {
        self.config.indent = indent;
        self.render.needs_layout = true;
        self
    }

    /// Set the number of rows moved by page up / page down.
    pub fn with_page_steps(mut self, steps: usize) -> Self {
        self.config.page_steps = steps.max(1);
        self
    }

    /// Make the view read-only.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.config.read_only = read_only;
        self
    }

    /// Use a different clipboard backend.
    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardBackend>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Install customization hooks.
    pub fn with_hooks(mut self, hooks: impl TreeViewHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self.render.needs_layout = true;
        self
    }

    /// Use a different node codec for transfer payloads.
    pub fn with_codec(mut self, codec: Arc<dyn NodeCodec>) -> Self {
        self.codec = codec;
        self
    }

    fn rebuild(&mut self) {
        if self.source.is_some() {
            if let Err(err) = self.sync_tree() {
                tracing::warn!(target: targets::SYNC, error = %err, "initial sync failed");
            }
        } else {
            self.reset_open_state();
        }
    }

    /// This view's process-unique id.
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// The active configuration.
    pub fn config(&self) -> &TreeViewConfig {
        &self.config
    }

    /// The mirrored source, if any.
    pub fn source(&self) -> Option<&Arc<dyn SourceTree>> {
        self.source.as_ref()
    }

    /// Whether this view mirrors a source.
    pub fn is_mirrored(&self) -> bool {
        self.source.is_some()
    }

    /// Whether edits are disabled, by configuration or by the source root.
    pub fn is_read_only(&self) -> bool {
        self.config.read_only || self.source_read_only
    }

    fn signal_emitters(&self) -> [&dyn SignalEmitter; 11] {
        [
            &self.selected,
            &self.unselected,
            &self.all_selected,
            &self.all_unselected,
            &self.opened,
            &self.closed,
            &self.changed,
            &self.inserted,
            &self.deleted,
            &self.context_menu_requested,
            &self.rejected,
        ]
    }

    /// Block or unblock every notification signal of this view.
    pub fn set_signals_blocked(&self, blocked: bool) {
        for signal in self.signal_emitters() {
            signal.set_blocked(blocked);
        }
    }

    /// Total number of slots connected to this view's signals.
    pub fn connection_count(&self) -> usize {
        self.signal_emitters().iter().map(|s| s.connection_count()).sum()
    }

    /// Recompute `view_index` and visibility for every node.
    ///
    /// Visible nodes are numbered in depth-first order, skipping the
    /// subtrees of closed nodes. Hidden nodes get no index.
    pub fn reindex(&mut self) {
        let _span = PerfSpan::new(span_names::REINDEX);
        let mut index = 0;
        let mut stack = vec![(self.root, true)];
        while let Some((id, visible)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            node.visible = visible;
            node.view_index = if visible {
                index += 1;
                Some(index - 1)
            } else {
                None
            };
            let child_visible = visible && !node.closed;
            stack.extend(node.children.iter().rev().map(|&c| (c, child_visible)));
        }
        self.indices_dirty = false;
        tracing::trace!(target: targets::LAYOUT, visible = index, "reindexed");
    }

    pub(crate) fn ensure_indices(&mut self) {
        if self.indices_dirty {
            self.reindex();
        }
    }

    /// Apply the bookkeeping that follows every structural change: index
    /// recompute, a layout request and exactly one `changed` notification.
    pub fn tree_changed(&mut self) {
        self.reindex();
        self.render.needs_layout = true;
        self.render.needs_full_render = true;
        self.changed.emit(self.root);
    }
}

impl Drop for TreeView {
    fn drop(&mut self) {
        if let (Some(source), Some(id)) = (&self.source, self.source_connection.take()) {
            source.signals().changed.disconnect(id);
            arbor_core::arbor_trace!(id = ?self.id, "disconnected from source");
        }
    }
}

impl fmt::Debug for TreeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeView")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .field("mirrored", &self.is_mirrored())
            .field("selected", &self.selection.selected.len())
            .field("focus", &self.focus)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::NodeTree;
    use std::sync::atomic::AtomicUsize;

    fn sample() -> NodeData {
        NodeData::new("R")
            .with_child(NodeData::new("A"))
            .with_child(NodeData::new("B").with_child(NodeData::new("B1")))
    }

    fn index_of(view: &TreeView, id: ViewId) -> Option<usize> {
        view.node(id).and_then(|n| n.view_index())
    }

    #[test]
    fn test_reindex_skips_closed_subtrees() {
        let mut view = TreeView::standalone(sample());
        let root = view.root();
        let a = view.child_by_name(root, "tv_A").unwrap();
        let b = view.child_by_name(root, "tv_B").unwrap();
        let b1 = view.child_by_name(b, "tv_B1").unwrap();

        view.reindex();
        assert_eq!(index_of(&view, root), Some(0));
        assert_eq!(index_of(&view, a), Some(1));
        assert_eq!(index_of(&view, b), Some(2));
        assert_eq!(index_of(&view, b1), Some(3));

        view.nodes[b].closed = true;
        view.reindex();
        assert_eq!(index_of(&view, b), Some(2));
        assert_eq!(index_of(&view, b1), None);
        assert!(!view.node(b1).unwrap().is_visible());
    }

    #[test]
    fn test_tree_changed_emits_once() {
        let mut view = TreeView::standalone(sample());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        view.changed.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        view.tree_changed();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blocked_signals_stay_quiet() {
        let mut view = TreeView::standalone(sample());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        view.changed.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(view.connection_count(), 1);

        view.set_signals_blocked(true);
        view.tree_changed();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        view.set_signals_blocked(false);
        view.tree_changed();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tree_ids_are_unique() {
        let a = TreeView::standalone(sample());
        let b = TreeView::standalone(sample());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_drop_disconnects_source() {
        let source = Arc::new(NodeTree::from_data(sample()));
        let view = TreeView::mirrored(source.clone());
        assert_eq!(source.signals().changed.connection_count(), 1);
        drop(view);
        assert_eq!(source.signals().changed.connection_count(), 0);
    }

    #[test]
    fn test_read_only_from_config() {
        let view = TreeView::standalone(sample()).with_read_only(true);
        assert!(view.is_read_only());
        assert!(!view.is_mirrored());
    }
}
