//! Keyboard-style navigation over the visible tree.
//!
//! The plain `move_*` methods walk one step from a given node and apply a
//! [`SelectMode`] to the destination. The `*_action` variants start from the
//! current node, move focus, request scroll-into-view and emit one selection
//! notification.

use arbor_core::targets;

use super::TreeView;
use super::node::ViewId;
use super::selection::SelectMode;

impl TreeView {
    /// Move to the next visible node.
    pub fn move_down(&mut self, id: ViewId, mode: SelectMode) -> Option<ViewId> {
        let node = self.nodes.get(id)?;
        if node.closed || node.children.is_empty() {
            return self.move_down_sibling(id, mode);
        }
        let next = node.children[0];
        self.select_update(next, mode);
        Some(next)
    }

    /// Move to the next sibling, climbing to ancestors when `id` is the
    /// last child. Never descends into children.
    pub fn move_down_sibling(&mut self, id: ViewId, mode: SelectMode) -> Option<ViewId> {
        if id == self.root {
            return None;
        }
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&c| c == id)?;
        match siblings.get(index + 1).copied() {
            Some(next) => {
                self.select_update(next, mode);
                Some(next)
            }
            None => self.move_down_sibling(parent, mode),
        }
    }

    /// Move to the previous visible node.
    pub fn move_up(&mut self, id: ViewId, mode: SelectMode) -> Option<ViewId> {
        if id == self.root {
            return None;
        }
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        if index > 0 {
            let previous = self.children(parent)[index - 1];
            self.move_to_last_child(previous, mode)
        } else {
            self.select_update(parent, mode);
            Some(parent)
        }
    }

    /// Move to the last visible descendant of `id` (or `id` itself when it
    /// is closed or a leaf).
    pub fn move_to_last_child(&mut self, id: ViewId, mode: SelectMode) -> Option<ViewId> {
        if id == self.root {
            return None;
        }
        let mut current = id;
        loop {
            let node = self.nodes.get(current)?;
            match node.children.last() {
                Some(&last) if !node.closed => current = last,
                _ => break,
            }
        }
        self.select_update(current, mode);
        Some(current)
    }

    /// The node navigation starts from: focus, else the first selected
    /// node, else the root.
    pub fn current(&self) -> ViewId {
        self.focus
            .filter(|&f| self.nodes.contains_key(f))
            .or_else(|| self.selection.selected.first().copied())
            .unwrap_or(self.root)
    }

    /// The focused node.
    pub fn focus(&self) -> Option<ViewId> {
        self.focus
    }

    /// Move keyboard focus to a node.
    pub fn set_focus(&mut self, id: ViewId) {
        if self.nodes.contains_key(id) {
            self.focus = Some(id);
            self.render.needs_render = true;
        }
    }

    /// Take the pending scroll-into-view request.
    pub fn take_scroll_request(&mut self) -> Option<ViewId> {
        self.scroll_request.take()
    }

    /// Finish an action at `dest`. An `ExtendOne` step that toggled the
    /// destination off has already emitted `unselected`, so `selected` is
    /// skipped.
    fn land(&mut self, from: ViewId, dest: Option<ViewId>, mode: SelectMode) -> Option<ViewId> {
        let dest = dest?;
        self.focus = Some(dest);
        self.scroll_request = Some(dest);
        self.render.needs_render = true;
        if dest == from {
            return Some(dest);
        }
        let toggled_off = mode == SelectMode::ExtendOne && !self.is_selected(dest);
        if !toggled_off {
            self.selected.emit(dest);
        }
        tracing::trace!(target: targets::NAVIGATION, ?dest, "moved");
        Some(dest)
    }

    /// Move down from the current node.
    pub fn move_down_action(&mut self, mode: SelectMode) -> Option<ViewId> {
        let from = self.current();
        let dest = self.move_down(from, mode);
        self.land(from, dest, mode)
    }

    /// Move up from the current node.
    pub fn move_up_action(&mut self, mode: SelectMode) -> Option<ViewId> {
        let from = self.current();
        let dest = self.move_up(from, mode);
        self.land(from, dest, mode)
    }

    /// Move up to `page_steps` rows from `id`.
    pub fn move_page_up(&mut self, id: ViewId, mode: SelectMode) -> Option<ViewId> {
        let steps = self.config.page_steps;
        self.repeat_move(id, mode, Some(steps), Self::move_up)
    }

    /// Move down up to `page_steps` rows from `id`.
    pub fn move_page_down(&mut self, id: ViewId, mode: SelectMode) -> Option<ViewId> {
        let steps = self.config.page_steps;
        self.repeat_move(id, mode, Some(steps), Self::move_down)
    }

    /// Move from `id` to the last visible node.
    pub fn move_end(&mut self, id: ViewId, mode: SelectMode) -> Option<ViewId> {
        self.repeat_move(id, mode, None, Self::move_down)
    }

    /// Jump to the root.
    pub fn move_home(&mut self, mode: SelectMode) -> ViewId {
        let root = self.root;
        self.select_update(root, mode);
        root
    }

    /// Move up by one page of rows from the current node.
    pub fn move_page_up_action(&mut self, mode: SelectMode) -> Option<ViewId> {
        let from = self.current();
        let dest = self.move_page_up(from, mode);
        self.land(from, dest, mode)
    }

    /// Move down by one page of rows from the current node.
    pub fn move_page_down_action(&mut self, mode: SelectMode) -> Option<ViewId> {
        let from = self.current();
        let dest = self.move_page_down(from, mode);
        self.land(from, dest, mode)
    }

    /// Move to the last visible node.
    pub fn move_end_action(&mut self, mode: SelectMode) -> Option<ViewId> {
        let from = self.current();
        let dest = self.move_end(from, mode);
        self.land(from, dest, mode)
    }

    /// Move to the root.
    pub fn move_home_action(&mut self, mode: SelectMode) -> ViewId {
        let from = self.current();
        let root = self.move_home(mode);
        self.land(from, Some(root), mode);
        root
    }

    /// Step repeatedly, selecting quietly (or not at all) on the way and
    /// applying `mode` at the landing node.
    fn repeat_move(
        &mut self,
        from: ViewId,
        mode: SelectMode,
        steps: Option<usize>,
        step: fn(&mut Self, ViewId, SelectMode) -> Option<ViewId>,
    ) -> Option<ViewId> {
        let travel = match mode {
            SelectMode::SelectOne => SelectMode::NoSelect,
            SelectMode::ExtendContinuous | SelectMode::ExtendOne => SelectMode::SelectQuiet,
            other => other,
        };
        let mut dest = step(self, from, travel)?;
        if dest == from {
            return Some(dest);
        }
        let mut taken = 1;
        while steps.is_none_or(|limit| taken < limit) {
            match step(self, dest, travel) {
                Some(next) if next != dest => dest = next,
                _ => break,
            }
            taken += 1;
        }
        if mode == SelectMode::SelectOne {
            self.select_update(dest, mode);
        }
        Some(dest)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::source::NodeData;

    fn view() -> TreeView {
        TreeView::standalone(
            NodeData::new("R")
                .with_child(NodeData::new("A"))
                .with_child(NodeData::new("B").with_child(NodeData::new("B1")).with_child(NodeData::new("B2")))
                .with_child(NodeData::new("C")),
        )
    }

    fn child(view: &TreeView, parent: ViewId, name: &str) -> ViewId {
        view.child_by_name(parent, &format!("tv_{name}")).unwrap()
    }

    #[test]
    fn test_move_down_walks_visible_order() {
        let mut view = view();
        let root = view.root();
        let mut order = vec![root];
        let mut current = root;
        while let Some(next) = view.move_down(current, SelectMode::NoSelect) {
            order.push(next);
            current = next;
        }
        let names: Vec<_> = order.iter().map(|&id| view.node(id).unwrap().label().to_string()).collect();
        assert_eq!(names, ["R", "A", "B", "B1", "B2", "C"]);
    }

    #[test]
    fn test_move_up_into_last_descendant() {
        let mut view = view();
        let root = view.root();
        let b = child(&view, root, "B");
        let b2 = child(&view, b, "B2");
        let c = child(&view, root, "C");
        let a = child(&view, root, "A");

        assert_eq!(view.move_up(c, SelectMode::NoSelect), Some(b2));
        assert_eq!(view.move_up(a, SelectMode::NoSelect), Some(root));
        view.close(b);
        assert_eq!(view.move_up(c, SelectMode::NoSelect), Some(b));
    }

    #[test]
    fn test_root_guards() {
        let mut view = view();
        let root = view.root();
        assert_eq!(view.move_up(root, SelectMode::NoSelect), None);
        assert_eq!(view.move_down_sibling(root, SelectMode::NoSelect), None);
        assert_eq!(view.move_to_last_child(root, SelectMode::NoSelect), None);
        assert!(view.move_down(root, SelectMode::NoSelect).is_some());

        let c = child(&view, root, "C");
        assert_eq!(view.move_down(c, SelectMode::NoSelect), None);
    }

    #[test]
    fn test_action_sets_focus_and_notifies() {
        let mut view = view();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        view.selected.connect(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let a = child(&view, view.root(), "A");

        assert_eq!(view.move_down_action(SelectMode::SelectOne), Some(a));
        assert_eq!(view.focus(), Some(a));
        assert_eq!(view.take_scroll_request(), Some(a));
        assert_eq!(view.selected_nodes(), &[a]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_end_and_home() {
        let mut view = view();
        let root = view.root();
        let c = child(&view, root, "C");

        assert_eq!(view.move_end_action(SelectMode::SelectOne), Some(c));
        assert_eq!(view.selected_nodes(), &[c]);
        assert_eq!(view.move_home_action(SelectMode::SelectOne), root);
        assert_eq!(view.selected_nodes(), &[root]);
        assert_eq!(view.focus(), Some(root));
    }

    #[test]
    fn test_page_down_respects_steps() {
        let mut view = view().with_page_steps(2);
        let b = child(&view, view.root(), "B");
        assert_eq!(view.move_page_down_action(SelectMode::SelectOne), Some(b));
        assert_eq!(view.selected_nodes(), &[b]);
    }

    #[test]
    fn test_page_extend_selects_path() {
        let mut view = view().with_page_steps(3);
        let root = view.root();
        view.select_action(root, SelectMode::SelectOne);
        view.set_focus(root);
        view.move_page_down_action(SelectMode::ExtendContinuous);
        assert_eq!(view.selected_nodes().len(), 4);
    }

    #[test]
    fn test_page_from_node_leaves_focus_alone() {
        let mut view = view().with_page_steps(2);
        let a = child(&view, view.root(), "A");
        let b = child(&view, view.root(), "B");
        let b2 = child(&view, b, "B2");

        assert_eq!(view.move_page_down(a, SelectMode::NoSelect), Some(child(&view, b, "B1")));
        assert_eq!(view.move_end(a, SelectMode::SelectOne), Some(child(&view, view.root(), "C")));
        assert_eq!(view.move_page_up(b2, SelectMode::NoSelect), Some(b));
        assert_eq!(view.focus(), None);
    }

    #[test]
    fn test_extend_one_toggle_off_notifies_once() {
        let mut view = view();
        let root = view.root();
        let a = child(&view, root, "A");
        let selected = Arc::new(AtomicUsize::new(0));
        let unselected = Arc::new(AtomicUsize::new(0));
        let s = selected.clone();
        view.selected.connect(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let u = unselected.clone();
        view.unselected.connect(move |_| {
            u.fetch_add(1, Ordering::SeqCst);
        });
        view.select(a);
        view.set_focus(root);

        assert_eq!(view.move_down_action(SelectMode::ExtendOne), Some(a));
        assert!(!view.is_selected(a));
        assert_eq!(selected.load(Ordering::SeqCst), 0);
        assert_eq!(unselected.load(Ordering::SeqCst), 1);

        view.set_focus(root);
        view.move_down_action(SelectMode::ExtendOne);
        assert!(view.is_selected(a));
        assert_eq!(selected.load(Ordering::SeqCst), 1);
        assert_eq!(unselected.load(Ordering::SeqCst), 1);
    }
}
