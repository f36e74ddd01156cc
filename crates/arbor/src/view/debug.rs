//! Text rendering of a view tree for debugging and logging.
//!
//! ```
//! use arbor::{NodeData, TreeDebug, TreeFormatOptions, TreeStyle, TreeView};
//!
//! let view = TreeView::standalone(
//!     NodeData::new("root").with_child(NodeData::new("a")).with_child(NodeData::new("b")),
//! );
//! let text = TreeDebug::with_options(&view, TreeFormatOptions::minimal().with_style(TreeStyle::Ascii))
//!     .format();
//! assert_eq!(text, "root\n+-- a\n    b\n");
//! ```

use std::fmt;

use super::TreeView;
use super::node::ViewId;

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show view indices.
    pub show_indices: bool,
    /// Whether to mark closed and selected nodes.
    pub show_state: bool,
    /// Whether to descend into closed nodes.
    pub show_hidden: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_indices: true,
            show_state: true,
            show_hidden: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Options that show every node, hidden ones included.
    pub fn detailed() -> Self {
        Self {
            show_hidden: true,
            ..Default::default()
        }
    }

    /// Options for labels only.
    pub fn minimal() -> Self {
        Self {
            show_indices: false,
            show_state: false,
            ..Default::default()
        }
    }

    /// Set the branch style.
    pub fn with_style(mut self, style: TreeStyle) -> Self {
        self.style = style;
        self
    }
}

/// Debug formatter for a [`TreeView`].
#[derive(Debug, Clone)]
pub struct TreeDebug<'a> {
    view: &'a TreeView,
    options: TreeFormatOptions,
}

impl<'a> TreeDebug<'a> {
    /// Create a formatter with default options.
    pub fn new(view: &'a TreeView) -> Self {
        Self::with_options(view, TreeFormatOptions::default())
    }

    /// Create a formatter with custom options.
    pub fn with_options(view: &'a TreeView, options: TreeFormatOptions) -> Self {
        Self { view, options }
    }

    /// Format the whole tree.
    pub fn format(&self) -> String {
        self.format_subtree(self.view.root())
    }

    /// Format the subtree under `root`.
    pub fn format_subtree(&self, root: ViewId) -> String {
        let mut output = String::new();
        self.format_into(root, 0, true, &mut output);
        output
    }

    fn format_into(&self, id: ViewId, depth: usize, is_last: bool, output: &mut String) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(node) = self.view.node(id) else {
            return;
        };

        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(if node.label().is_empty() { "(unnamed)" } else { node.label() });
        if node.is_field() {
            output.push_str(" (field)");
        }
        if self.options.show_indices {
            match node.view_index() {
                Some(index) => output.push_str(&format!(" [{index}]")),
                None => output.push_str(" [-]"),
            }
        }
        if self.options.show_state {
            if node.has_children() && node.is_closed() {
                output.push_str(" +");
            }
            if node.is_selected() {
                output.push_str(" *");
            }
        }
        output.push('\n');

        if node.is_closed() && !self.options.show_hidden {
            return;
        }
        let children = node.children();
        let count = children.len();
        for (i, &child) in children.iter().enumerate() {
            self.format_into(child, depth + 1, i == count - 1, output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "   "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }
}

impl fmt::Display for TreeDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::NodeData;

    fn view() -> TreeView {
        TreeView::standalone(
            NodeData::new("R")
                .with_field(NodeData::new("meta"))
                .with_child(NodeData::new("A"))
                .with_child(NodeData::new("B").with_child(NodeData::new("B1"))),
        )
    }

    #[test]
    fn test_unicode_with_state() {
        let mut view = view();
        let b = view.child_by_name(view.root(), "tv_B").unwrap();
        view.select(b);
        let text = TreeDebug::new(&view).format();
        assert_eq!(
            text,
            "R [0]\n\u{251c}\u{2500}\u{2500} meta (field) [1]\n\u{251c}\u{2500}\u{2500} A [2]\n\u{2514}\u{2500}\u{2500} B [3] *\n\u{2502}  \u{2514}\u{2500}\u{2500} B1 [4]\n"
        );
    }

    #[test]
    fn test_closed_subtree_hidden_unless_detailed() {
        let mut view = view();
        let b = view.child_by_name(view.root(), "tv_B").unwrap();
        view.close(b);

        let options = TreeFormatOptions::default().with_style(TreeStyle::Compact);
        let text = TreeDebug::with_options(&view, options).format();
        assert!(text.contains("- B [3] +"));
        assert!(!text.contains("B1"));

        let detailed = TreeDebug::with_options(&view, TreeFormatOptions::detailed()).to_string();
        assert!(detailed.contains("B1 [-]"));
    }

    #[test]
    fn test_max_depth() {
        let view = view();
        let options = TreeFormatOptions {
            max_depth: Some(0),
            ..TreeFormatOptions::minimal()
        };
        assert_eq!(TreeDebug::with_options(&view, options).format(), "R\n");
    }
}
