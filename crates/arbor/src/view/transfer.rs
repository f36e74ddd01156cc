//! Clipboard and drag-and-drop editing.
//!
//! Every transferred node travels as two entries: a `text/plain` path from
//! the tree root, followed by the node's encoded subtree. Payloads carrying
//! several nodes repeat the pair.

use std::fmt;

use arbor_core::targets;

use super::TreeView;
use super::edit::unique_name;
use super::node::ViewId;
use super::selection::SelectMode;
use crate::error::{Result, TreeError};
use crate::source::{NodeData, split_path};
use crate::transfer::mime::TEXT_PLAIN;
use crate::transfer::{DragSession, DraggedNode, DropAction, DropOutcome, MimeData};

/// Where pasted nodes go relative to the target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasteMode {
    /// Overwrite the target with the first pasted node.
    Assign,
    /// Append the pasted nodes to the target's children.
    Children,
    /// Insert the pasted nodes before the target.
    Before,
    /// Insert the pasted nodes after the target.
    After,
}

impl PasteMode {
    /// Menu label for this mode.
    pub fn label(self) -> &'static str {
        match self {
            Self::Assign => "Assign To",
            Self::Children => "Add to Children",
            Self::Before => "Insert Before",
            Self::After => "Insert After",
        }
    }

    fn op(self) -> &'static str {
        match self {
            Self::Assign => "paste onto",
            Self::Children => "paste into",
            Self::Before => "paste before",
            Self::After => "paste after",
        }
    }
}

impl fmt::Display for PasteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A decoded transfer item.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PastedNode {
    pub(crate) path: Option<String>,
    pub(crate) data: NodeData,
}

impl TreeView {
    /// Encode a node for transfer: its path followed by its subtree.
    pub fn mime_data(&self, id: ViewId) -> Result<MimeData> {
        let data = self.snapshot(id).ok_or(TreeError::StaleNode)?;
        let path = match &self.source {
            Some(source) => {
                let src = self.source_of(id)?;
                source.path_from(source.root(), src).unwrap_or_default()
            }
            None => self.path_of(id),
        };
        let mut md = MimeData::new();
        md.push_text(path);
        md.push(self.codec.mime_type(), self.codec.encode(&data)?);
        Ok(md)
    }

    /// Decode `(path, node)` pairs. Undecodable items are logged and skipped.
    pub(crate) fn decode_payload(&self, md: &MimeData) -> Vec<PastedNode> {
        let node_type = self.codec.mime_type();
        let mut items = Vec::new();
        let mut path = None;
        for entry in md {
            if entry.mime_type == TEXT_PLAIN {
                path = entry.text().map(str::to_string);
            } else if entry.mime_type == node_type {
                match self.codec.decode(&entry.data) {
                    Ok(data) => items.push(PastedNode { path: path.take(), data }),
                    Err(err) => {
                        tracing::warn!(target: targets::TRANSFER, error = %err, "skipping undecodable node");
                        path = None;
                    }
                }
            }
        }
        items
    }

    /// Resolve a path produced by [`mime_data`](Self::mime_data).
    pub fn find_by_path(&self, path: &str) -> Option<ViewId> {
        if let Some(source) = &self.source {
            let found = source.find_path(source.root(), path)?;
            return self.find_source(found);
        }
        let mut current = self.root;
        for segment in split_path(path) {
            current = self
                .children(current)
                .iter()
                .copied()
                .find(|&c| self.nodes.get(c).is_some_and(|n| n.label == segment))?;
        }
        Some(current)
    }

    /// The focused node first, then the rest of the selection.
    fn transfer_set(&self) -> Vec<ViewId> {
        let current = self.current();
        if !self.has_selection() {
            return vec![current];
        }
        let mut nodes = Vec::with_capacity(self.selection.selected.len());
        if self.is_selected(current) {
            nodes.push(current);
        }
        nodes.extend(self.selection.selected.iter().copied().filter(|&s| s != current));
        nodes
    }

    /// Drop nodes whose ancestor is also in the set.
    fn outermost(&self, nodes: &[ViewId]) -> Vec<ViewId> {
        nodes
            .iter()
            .copied()
            .filter(|&n| {
                !nodes
                    .iter()
                    .any(|&other| other != n && self.is_ancestor_or_self(other, n))
            })
            .collect()
    }

    fn payload_for(&self, nodes: &[ViewId]) -> Result<MimeData> {
        let mut md = MimeData::new();
        for &node in nodes {
            md.extend(self.mime_data(node)?);
        }
        Ok(md)
    }

    /// Copy the selection (or the focused node) to the clipboard.
    ///
    /// With `reset`, the selection is cleared afterwards.
    pub fn copy(&mut self, reset: bool) -> Result<()> {
        let nodes = self.transfer_set();
        let md = self.payload_for(&nodes)?;
        self.clipboard.write(md)?;
        tracing::debug!(target: targets::TRANSFER, count = nodes.len(), "copied nodes");
        if reset {
            self.unselect_all();
        }
        Ok(())
    }

    /// Copy the selection to the clipboard and delete it.
    pub fn cut(&mut self) -> Result<()> {
        let nodes = self.transfer_set();
        let checked = nodes
            .iter()
            .try_for_each(|&n| self.guard_structural(n, "cut"));
        self.reject(checked)?;

        self.copy(false)?;
        let doomed = self.outermost(&nodes);
        self.unselect_all();
        for node in doomed {
            self.remove_node_data(node)?;
        }
        self.commit_edit()
    }

    /// Paste the clipboard at `node`.
    ///
    /// Returns the last node created (or `node` itself for
    /// [`PasteMode::Assign`]). An empty or foreign clipboard is a no-op.
    pub fn paste(&mut self, node: ViewId, mode: PasteMode) -> Result<Option<ViewId>> {
        let checked = self.guard_paste(node, mode);
        self.reject(checked)?;
        let Some(md) = self.clipboard.read(&[self.codec.mime_type()])? else {
            return Ok(None);
        };
        let items = self.decode_payload(&md);
        self.apply_paste(node, mode, items, DropAction::COPY)
    }

    fn guard_paste(&self, node: ViewId, mode: PasteMode) -> Result<()> {
        self.guard_writable(mode.op())?;
        let target = self.node_or_stale(node)?;
        if matches!(mode, PasteMode::Before | PasteMode::After) {
            if target.parent.is_none() {
                return Err(TreeError::root(mode.op()));
            }
            if target.field {
                return Err(TreeError::field(mode.op()));
            }
        }
        Ok(())
    }

    fn apply_paste(
        &mut self,
        node: ViewId,
        mode: PasteMode,
        items: Vec<PastedNode>,
        action: DropAction,
    ) -> Result<Option<ViewId>> {
        if items.is_empty() {
            return Ok(None);
        }
        self.unselect_all();
        tracing::trace!(
            target: targets::TRANSFER,
            paths = ?items.iter().filter_map(|i| i.path.as_deref()).collect::<Vec<_>>(),
            %mode,
            "applying paste"
        );
        let data: Vec<NodeData> = items.into_iter().map(|i| i.data).collect();
        match mode {
            PasteMode::Assign => self.paste_assign(node, data).map(Some),
            PasteMode::Children => self.paste_children(node, data),
            PasteMode::Before => self.paste_at(node, data, action, 0),
            PasteMode::After => self.paste_at(node, data, action, 1),
        }
    }

    /// The paste choices for a node. Root and field nodes only accept
    /// assignment and new children.
    pub fn paste_options(&self, node: ViewId) -> Vec<PasteMode> {
        let mut options = vec![PasteMode::Assign, PasteMode::Children];
        if self.nodes.get(node).is_some_and(|n| n.parent.is_some() && !n.field) {
            options.push(PasteMode::Before);
            options.push(PasteMode::After);
        }
        options
    }

    /// The mode a plain paste command uses for a node.
    pub fn default_paste_mode(&self, node: ViewId) -> PasteMode {
        if self.paste_options(node).contains(&PasteMode::After) {
            PasteMode::After
        } else {
            PasteMode::Children
        }
    }

    /// Insert `data` as siblings of `node`, `rel` positions after it (0 for
    /// before, 1 for after). Colliding names get the copy suffix.
    pub fn paste_at(
        &mut self,
        node: ViewId,
        data: Vec<NodeData>,
        action: DropAction,
        rel: usize,
    ) -> Result<Option<ViewId>> {
        let parent = self.parent(node).ok_or(TreeError::root("paste beside"))?;
        let position = self.position_in_parent(node).ok_or(TreeError::StaleNode)? + rel;
        let count = data.len();
        let last = self.insert_unique(parent, position, data)?;
        self.commit_edit()?;
        tracing::debug!(target: targets::TRANSFER, count, ?action, "pasted siblings");

        let selected = last.and_then(|name| self.child_by_data_name(parent, &name));
        if let Some(selected) = selected {
            self.select_action(selected, SelectMode::SelectOne);
        }
        Ok(selected)
    }

    /// Overwrite `node` with the first item of `data` and open it.
    pub fn paste_assign(&mut self, node: ViewId, data: Vec<NodeData>) -> Result<ViewId> {
        let Some(first) = data.into_iter().next() else {
            return Ok(node);
        };
        self.assign_data(node, first)?;
        self.commit_edit()?;
        self.open(node);
        Ok(node)
    }

    /// Append `data` to the children of `node` and open it.
    pub fn paste_children(&mut self, node: ViewId, data: Vec<NodeData>) -> Result<Option<ViewId>> {
        let position = self.child_names(node).len();
        let last = self.insert_unique(node, position, data)?;
        self.commit_edit()?;
        self.open(node);
        Ok(last.and_then(|name| self.child_by_data_name(node, &name)))
    }

    fn insert_unique(&mut self, parent: ViewId, position: usize, data: Vec<NodeData>) -> Result<Option<String>> {
        let suffix = self.config.copy_suffix.clone();
        let mut last = None;
        for (i, mut item) in data.into_iter().enumerate() {
            let existing = self.child_names(parent);
            item.name = unique_name(&existing, &item.name, &suffix);
            last = Some(item.name.clone());
            self.insert_data_at(parent, position + i, item)?;
        }
        Ok(last)
    }

    /// Start dragging `node` together with the rest of the selection.
    pub fn drag_start(&mut self, node: ViewId) -> Result<DragSession> {
        self.node_or_stale(node)?;
        if !self.is_selected(node) {
            self.select_action(node, SelectMode::SelectOne);
        }
        self.focus = Some(node);
        let nodes = self.transfer_set();
        let payload = self.payload_for(&nodes)?;
        let movable = !self.is_read_only()
            && nodes
                .iter()
                .all(|&n| self.nodes.get(n).is_some_and(|v| v.parent.is_some() && !v.field));
        let allowed = if movable {
            DropAction::COPY | DropAction::MOVE
        } else {
            DropAction::COPY
        };
        let dragged = nodes
            .iter()
            .map(|&view| DraggedNode {
                view,
                source: self.nodes.get(view).and_then(|n| n.source_id()),
            })
            .collect();
        tracing::debug!(target: targets::TRANSFER, count = nodes.len(), ?allowed, "drag started");
        Ok(DragSession::new(payload, self.id, allowed, dragged))
    }

    /// Apply a drop of `session` at `target`.
    ///
    /// Moves within the same view relocate the dragged nodes in place;
    /// everything else pastes a copy, leaving deletion of moved originals to
    /// [`drop_finalize`](Self::drop_finalize) on the source view.
    pub fn drop(
        &mut self,
        target: ViewId,
        session: &DragSession,
        action: DropAction,
        mode: PasteMode,
    ) -> Result<DropOutcome> {
        let checked = self.guard_paste(target, mode);
        self.reject(checked)?;
        let action = (action & session.allowed()).effective();
        if action == DropAction::NONE {
            return Ok(DropOutcome::Cancelled);
        }
        self.unselect_all();

        if action == DropAction::MOVE && session.origin() == self.id && mode != PasteMode::Assign {
            let moved = self.resolve_dragged(session);
            if !moved.is_empty() {
                self.relocate(target, &moved, mode)?;
                return Ok(DropOutcome::Accepted {
                    action,
                    moved_in_place: true,
                });
            }
        }

        let items = self.decode_payload(session.payload());
        match self.apply_paste(target, mode, items, action)? {
            Some(_) => Ok(DropOutcome::Accepted {
                action,
                moved_in_place: false,
            }),
            None => Ok(DropOutcome::Cancelled),
        }
    }

    /// The dragged nodes that still exist here, outermost only.
    fn resolve_dragged(&self, session: &DragSession) -> Vec<ViewId> {
        let nodes: Vec<ViewId> = session
            .nodes()
            .iter()
            .filter_map(|dragged| match dragged.source {
                Some(source) if self.is_mirrored() => self.find_source(source),
                _ => self.contains(dragged.view).then_some(dragged.view),
            })
            .collect();
        self.outermost(&nodes)
    }

    fn relocate(&mut self, target: ViewId, moved: &[ViewId], mode: PasteMode) -> Result<()> {
        if let Some(&inside) = moved.iter().find(|&&m| self.is_ancestor_or_self(m, target)) {
            if inside == target && mode != PasteMode::Children {
                return Ok(());
            }
            let err = TreeError::InvalidMove {
                name: self.data_name(inside).unwrap_or_default(),
            };
            return self.reject(Err(err));
        }
        let parent = match mode {
            PasteMode::Children => target,
            _ => self.parent(target).ok_or(TreeError::root(mode.op()))?,
        };

        let mut anchor = target;
        let mut last = None;
        for &node in moved {
            let name = self.data_name(node).unwrap_or_default();
            if self.parent(node) != Some(parent) {
                let unique = unique_name(&self.child_names(parent), &name, &self.config.copy_suffix);
                if unique != name {
                    self.rename_data(node, &unique)?;
                }
            }
            let index = match mode {
                PasteMode::Children => usize::MAX,
                PasteMode::Before => self.position_in_parent(target).ok_or(TreeError::StaleNode)?,
                _ => self.position_in_parent(anchor).ok_or(TreeError::StaleNode)? + 1,
            };
            self.move_data(node, parent, index)?;
            anchor = node;
            last = self.data_name(node);
        }
        self.commit_edit()?;
        tracing::debug!(target: targets::TRANSFER, count = moved.len(), "moved nodes in place");

        if let Some(node) = last.and_then(|name| self.child_by_data_name(parent, &name)) {
            self.select_action(node, SelectMode::SelectOne);
        }
        Ok(())
    }

    /// Finish a drag that started in this view.
    ///
    /// Consumes the session. Originals are deleted only for accepted moves
    /// the target did not already perform in place.
    pub fn drop_finalize(&mut self, session: DragSession, outcome: DropOutcome) -> Result<()> {
        if session.origin() != self.id {
            tracing::warn!(target: targets::TRANSFER, "ignoring drag session from another view");
            return Ok(());
        }
        if !outcome.deletes_source() {
            tracing::trace!(target: targets::TRANSFER, ?outcome, "drag finished without deletion");
            return Ok(());
        }
        let doomed = self.resolve_dragged(&session);
        self.unselect_all();
        for node in doomed {
            self.remove_node_data(node)?;
        }
        self.commit_edit()
    }

    /// Whether the clipboard holds something to paste.
    pub fn can_paste(&self) -> bool {
        !self.clipboard.is_empty()
    }
}
