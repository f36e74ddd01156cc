//! Row layout and render markers.
//!
//! Layout runs in two passes. The size pass works bottom-up: each node
//! measures its own row and, when open, stacks its children's subtree heights
//! below it and widens to fit them at one indent level deeper. The position
//! pass then works top-down, placing each child just below its parent's row
//! (or below the previous sibling's subtree) and stretching every row to the
//! available width.

use arbor_core::{PerfSpan, span_names, targets};

use super::TreeView;
use super::node::ViewId;
use crate::geometry::{Point, Rect, Size};

impl TreeView {
    /// Lay out every visible row starting at `origin` within `width`.
    pub fn layout(&mut self, origin: Point, width: f32) {
        let _span = PerfSpan::new(span_names::LAYOUT);
        self.ensure_indices();
        self.measure(self.root, 0);
        self.place(self.root, origin.x, origin.y, width);
        self.render.needs_layout = false;
        self.render.needs_render = true;
        tracing::trace!(
            target: targets::LAYOUT,
            height = self.nodes[self.root].subtree_size.height,
            "layout complete"
        );
    }

    fn measure(&mut self, id: ViewId, depth: usize) -> Size {
        let Some(node) = self.nodes.get(id) else {
            return Size::ZERO;
        };
        let own = self.hooks.measure_row(node, depth, &self.config.row);
        let mut total = own;
        if !node.closed {
            let indent = self.config.indent;
            for child in node.children.clone() {
                let sub = self.measure(child, depth + 1);
                total.height += sub.height;
                total.width = total.width.max(indent + sub.width);
            }
        } else {
            for child in node.children.clone() {
                self.clear_boxes(child);
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.own_size = own;
            node.subtree_size = total;
        }
        total
    }

    fn clear_boxes(&mut self, id: ViewId) {
        for node in self.descendants(id) {
            if let Some(n) = self.nodes.get_mut(node) {
                n.own_size = Size::ZERO;
                n.subtree_size = Size::ZERO;
                n.own_box = Rect::ZERO;
                n.subtree_box = Rect::ZERO;
            }
        }
    }

    fn place(&mut self, id: ViewId, x: f32, y: f32, width: f32) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let own = node.own_size;
        let total = node.subtree_size;
        node.own_box = Rect::new(x, y, own.width.max(width), own.height);
        node.subtree_box = Rect::new(x, y, total.width.max(width), total.height);
        if node.closed {
            return;
        }
        let indent = self.config.indent;
        let mut child_y = y + own.height;
        for child in node.children.clone() {
            self.place(child, x + indent, child_y, (width - indent).max(0.0));
            child_y += self.nodes.get(child).map_or(0.0, |c| c.subtree_size.height);
        }
    }

    /// The visible node whose row contains `point`.
    pub fn node_at(&self, point: Point) -> Option<ViewId> {
        self.visible_nodes()
            .into_iter()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.own_box.contains(point)))
    }

    /// Total size of the laid-out tree.
    pub fn content_size(&self) -> Size {
        self.nodes.get(self.root).map_or(Size::ZERO, |n| n.subtree_size)
    }

    /// Whether open state or structure changed since the last layout.
    pub fn needs_layout(&self) -> bool {
        self.render.needs_layout
    }

    /// Take the full-render marker, set when nodes were added or removed.
    pub fn take_full_render(&mut self) -> bool {
        std::mem::take(&mut self.render.needs_full_render)
    }

    /// Take the cheap render marker, set by selection, focus and value changes.
    pub fn take_render(&mut self) -> bool {
        std::mem::take(&mut self.render.needs_render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::NodeData;

    fn view() -> TreeView {
        TreeView::standalone(
            NodeData::new("R")
                .with_child(NodeData::new("A"))
                .with_child(NodeData::new("B").with_child(NodeData::new("B1")))
                .with_child(NodeData::new("C")),
        )
        .with_indent(10.0)
    }

    fn child(view: &TreeView, parent: ViewId, name: &str) -> ViewId {
        view.child_by_name(parent, &format!("tv_{name}")).unwrap()
    }

    #[test]
    fn test_rows_stack_with_indent() {
        let mut view = view();
        view.layout(Point::ZERO, 200.0);
        let root = view.root();
        let b = child(&view, root, "B");
        let b1 = child(&view, b, "B1");
        let c = child(&view, root, "C");

        assert_eq!(view.content_size().height, 100.0);
        assert_eq!(view.node(root).unwrap().own_box(), Rect::new(0.0, 0.0, 200.0, 20.0));
        assert_eq!(view.node(b).unwrap().own_box(), Rect::new(10.0, 40.0, 190.0, 20.0));
        assert_eq!(view.node(b1).unwrap().own_box(), Rect::new(20.0, 60.0, 180.0, 20.0));
        assert_eq!(view.node(c).unwrap().own_box().top(), 80.0);
        assert_eq!(view.node(b).unwrap().subtree_box().height(), 40.0);
        assert!(!view.needs_layout());
    }

    #[test]
    fn test_close_restores_exact_height() {
        let mut view = view();
        let b = child(&view, view.root(), "B");
        view.layout(Point::ZERO, 200.0);
        let before = view.content_size();

        view.close(b);
        assert!(view.needs_layout());
        view.layout(Point::ZERO, 200.0);
        assert_eq!(view.content_size().height, before.height - 20.0);

        view.open(b);
        view.layout(Point::ZERO, 200.0);
        assert_eq!(view.content_size(), before);
    }

    #[test]
    fn test_node_at_hits_own_rows() {
        let mut view = view();
        view.layout(Point::new(0.0, 100.0), 200.0);
        let b = child(&view, view.root(), "B");
        let b1 = child(&view, b, "B1");

        assert_eq!(view.node_at(Point::new(50.0, 145.0)), Some(b));
        assert_eq!(view.node_at(Point::new(50.0, 165.0)), Some(b1));
        assert_eq!(view.node_at(Point::new(50.0, 50.0)), None);

        view.close(b);
        view.layout(Point::new(0.0, 100.0), 200.0);
        assert_ne!(view.node_at(Point::new(50.0, 165.0)), Some(b1));
    }

    #[test]
    fn test_render_markers_are_taken() {
        let mut view = view();
        assert!(view.take_full_render());
        assert!(!view.take_full_render());
        let a = child(&view, view.root(), "A");
        view.select(a);
        assert!(view.take_render());
        assert!(!view.take_render());
    }
}
