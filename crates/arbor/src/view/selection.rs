//! Selection management.
//!
//! The selection is an ordered list of view nodes owned by the view. A node's
//! `is_selected` flag is set exactly when the node appears in that list.

use arbor_core::targets;

use super::input::Modifiers;
use super::node::ViewId;
use super::TreeView;
use crate::source::SourceId;

/// How a selection request combines with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectMode {
    /// Replace the selection with the node.
    #[default]
    SelectOne,
    /// Toggle the node in the selection.
    ExtendOne,
    /// Extend the selection to cover the contiguous visible range.
    ExtendContinuous,
    /// Add the node without notifying.
    SelectQuiet,
    /// Remove the node without notifying.
    UnselectQuiet,
    /// Leave the selection alone.
    NoSelect,
}

impl SelectMode {
    /// Map pointer or key modifiers to a selection mode.
    ///
    /// Shift extends continuously, control (or meta) toggles one node.
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        if modifiers.shift {
            Self::ExtendContinuous
        } else if modifiers.control || modifiers.meta {
            Self::ExtendOne
        } else {
            Self::SelectOne
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct SelectionState {
    pub(crate) selected: Vec<ViewId>,
    pub(crate) select_mode: bool,
}

impl TreeView {
    /// Add a node to the selection. Returns false if it was already selected.
    pub fn select(&mut self, id: ViewId) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if node.selected {
            return false;
        }
        node.selected = true;
        self.selection.selected.push(id);
        self.render.needs_render = true;
        true
    }

    /// Remove a node from the selection. Returns false if it was not selected.
    pub fn unselect(&mut self, id: ViewId) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        if !node.selected {
            return false;
        }
        node.selected = false;
        self.selection.selected.retain(|&s| s != id);
        self.render.needs_render = true;
        true
    }

    /// Clear the selection. Returns true if anything was selected.
    pub fn unselect_all(&mut self) -> bool {
        let any = !self.selection.selected.is_empty();
        for id in self.descendants(self.root) {
            if let Some(node) = self.nodes.get_mut(id) {
                node.selected = false;
            }
        }
        self.selection.selected.clear();
        if any {
            self.render.needs_render = true;
        }
        any
    }

    /// Select every visible node, in view order, without per-node notifications.
    pub fn select_all(&mut self) {
        self.unselect_all();
        let mut current = Some(self.root);
        while let Some(id) = current {
            self.select(id);
            current = self.move_down(id, SelectMode::SelectQuiet);
        }
        tracing::debug!(target: targets::SELECTION, count = self.selection.selected.len(), "selected all");
    }

    /// Select all and emit one `all_selected` notification.
    pub fn select_all_action(&mut self) {
        self.select_all();
        self.all_selected.emit(self.root);
    }

    /// Unselect all and emit one `all_unselected` notification.
    pub fn unselect_all_action(&mut self) {
        self.unselect_all();
        self.all_unselected.emit(self.root);
    }

    /// Update the selection for `id` under `mode`.
    ///
    /// Returns whether the caller should emit a `selected` notification.
    pub fn select_update(&mut self, id: ViewId, mode: SelectMode) -> bool {
        if !self.nodes.contains_key(id) {
            return false;
        }
        match mode {
            SelectMode::SelectOne => {
                if self.is_selected(id) && self.selection.selected.len() == 1 {
                    return false;
                }
                self.unselect_all();
                self.select(id);
                true
            }
            SelectMode::ExtendContinuous => {
                self.extend_continuous(id);
                true
            }
            SelectMode::ExtendOne => {
                if self.is_selected(id) {
                    self.unselect(id);
                    self.unselected.emit(id);
                    false
                } else {
                    self.select(id);
                    true
                }
            }
            SelectMode::SelectQuiet => {
                self.select(id);
                false
            }
            SelectMode::UnselectQuiet => {
                self.unselect(id);
                false
            }
            SelectMode::NoSelect => false,
        }
    }

    fn extend_continuous(&mut self, id: ViewId) {
        if self.selection.selected.is_empty() {
            self.select(id);
            return;
        }
        self.ensure_indices();
        let Some(target) = self.nodes.get(id).and_then(|n| n.view_index) else {
            self.select(id);
            return;
        };
        let indexed: Vec<usize> = self
            .selection
            .selected
            .iter()
            .filter_map(|&s| self.nodes.get(s).and_then(|n| n.view_index))
            .collect();
        let (Some(&min), Some(&max)) = (indexed.iter().min(), indexed.iter().max()) else {
            self.select(id);
            return;
        };

        self.select(id);
        if target > max {
            let mut current = Some(id);
            while let Some(node) = current {
                if self.nodes.get(node).and_then(|n| n.view_index).is_none_or(|i| i <= max) {
                    break;
                }
                current = self.move_up(node, SelectMode::SelectQuiet);
            }
        } else if target < min {
            let mut current = Some(id);
            while let Some(node) = current {
                if self.nodes.get(node).and_then(|n| n.view_index).is_none_or(|i| i >= min) {
                    break;
                }
                current = self.move_down(node, SelectMode::SelectQuiet);
            }
        }
        tracing::trace!(target: targets::SELECTION, min, max, target, "extended selection");
    }

    /// Apply `mode` to `id` and notify listeners when appropriate.
    pub fn select_action(&mut self, id: ViewId, mode: SelectMode) {
        if self.select_update(id, mode) {
            self.selected.emit(id);
        }
    }

    /// Unselect a node and notify listeners if it was selected.
    pub fn unselect_action(&mut self, id: ViewId) {
        if self.unselect(id) {
            self.unselected.emit(id);
        }
    }

    /// Selected nodes, in selection order.
    pub fn selected_nodes(&self) -> &[ViewId] {
        &self.selection.selected
    }

    /// Source nodes behind the selected view nodes.
    pub fn selected_sources(&self) -> Vec<SourceId> {
        self.selection
            .selected
            .iter()
            .filter_map(|&id| self.nodes.get(id).and_then(|n| n.source_id()))
            .collect()
    }

    /// Whether anything is selected.
    pub fn has_selection(&self) -> bool {
        !self.selection.selected.is_empty()
    }

    /// Whether a node is selected.
    pub fn is_selected(&self, id: ViewId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.selected)
    }

    /// Whether select mode (sticky range extension) is on.
    pub fn select_mode(&self) -> bool {
        self.selection.select_mode
    }

    /// Turn select mode on or off.
    pub fn set_select_mode(&mut self, on: bool) {
        self.selection.select_mode = on;
    }

    /// Flip select mode. Turning it on clears the selection down to the
    /// focused node.
    pub fn select_mode_toggle(&mut self) {
        if self.selection.select_mode {
            self.selection.select_mode = false;
            return;
        }
        self.selection.select_mode = true;
        let anchor = self.current();
        self.unselect_all();
        self.select(anchor);
    }
}
