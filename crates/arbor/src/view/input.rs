//! Key, pointer and context-menu routing.
//!
//! The host translates platform events into [`KeyCommand`]s and
//! [`PointerEvent`]s; the view maps them onto its operations.

use arbor_core::targets;

use super::TreeView;
use super::node::ViewId;
use super::selection::SelectMode;
use super::transfer::PasteMode;
use crate::error::Result;
use crate::geometry::Point;
use crate::transfer::{DragSession, DropAction, DropOutcome};

/// Keyboard modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    /// Shift is held.
    pub shift: bool,
    /// Control is held.
    pub control: bool,
    /// Alt (option) is held.
    pub alt: bool,
    /// Meta (command, super) is held.
    pub meta: bool,
}

impl Modifiers {
    /// No modifiers.
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };
    /// Shift only.
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };
    /// Control only.
    pub const CTRL: Self = Self {
        control: true,
        ..Self::NONE
    };
    /// Alt only.
    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };
    /// Meta only.
    pub const META: Self = Self {
        meta: true,
        ..Self::NONE
    };
}

/// A key binding resolved by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCommand {
    MoveUp,
    MoveDown,
    /// Close the current node.
    MoveLeft,
    /// Open the current node.
    MoveRight,
    PageUp,
    PageDown,
    Home,
    End,
    SelectAll,
    /// Clear the selection and leave select mode.
    CancelSelect,
    SelectModeToggle,
    Copy,
    Cut,
    Paste,
    Delete,
    Duplicate,
    InsertBefore,
    InsertAfter,
    /// Toggle the current node open or closed.
    Enter,
}

impl KeyCommand {
    /// Whether the command edits the tree. Editing commands are ignored on
    /// read-only views.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::Cut | Self::Paste | Self::Delete | Self::Duplicate | Self::InsertBefore | Self::InsertAfter
        )
    }
}

/// A pointer gesture at a position in view coordinates.
#[derive(Debug)]
pub enum PointerEvent<'a> {
    Click {
        position: Point,
        modifiers: Modifiers,
    },
    DoubleClick {
        position: Point,
    },
    ContextMenu {
        position: Point,
    },
    DragStart {
        position: Point,
    },
    Drop {
        position: Point,
        modifiers: Modifiers,
        session: &'a DragSession,
        mode: PasteMode,
    },
}

/// What a pointer gesture did.
#[derive(Debug)]
pub enum PointerResponse {
    /// No node under the pointer, or nothing to do.
    Ignored,
    /// The view handled the gesture.
    Handled,
    /// A drag started; hand the session to the drop target.
    Dragging(DragSession),
    /// A drop finished; hand the outcome back to the drag source.
    Dropped(DropOutcome),
}

/// An entry of the node context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextAction {
    AddChild,
    InsertBefore,
    InsertAfter,
    Duplicate,
    Delete,
    Copy,
    Cut,
    Paste,
    OpenAll,
    CloseAll,
}

impl ContextAction {
    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            Self::AddChild => "Add child",
            Self::InsertBefore => "Insert before",
            Self::InsertAfter => "Insert after",
            Self::Duplicate => "Duplicate",
            Self::Delete => "Delete",
            Self::Copy => "Copy",
            Self::Cut => "Cut",
            Self::Paste => "Paste",
            Self::OpenAll => "Open all",
            Self::CloseAll => "Close all",
        }
    }
}

/// A context menu entry and whether it can be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextMenuEntry {
    pub action: ContextAction,
    pub enabled: bool,
}

/// Swallow rejected user requests; they were already reported.
fn handled(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_user_rejection() => Ok(true),
        Err(err) => Err(err),
    }
}

impl TreeView {
    /// Apply a key command to the current node.
    ///
    /// Returns whether the command was handled. Editing commands on a
    /// read-only view are not handled.
    pub fn handle_key(&mut self, command: KeyCommand, modifiers: Modifiers) -> Result<bool> {
        let mut mode = SelectMode::from_modifiers(modifiers);
        if mode == SelectMode::SelectOne && self.select_mode() {
            mode = SelectMode::ExtendContinuous;
        }
        if command.is_mutating() && self.is_read_only() {
            tracing::trace!(target: targets::INPUT, ?command, "ignoring edit on read-only view");
            return Ok(false);
        }
        let current = self.current();
        tracing::trace!(target: targets::INPUT, ?command, ?mode, "key command");

        match command {
            KeyCommand::CancelSelect => {
                self.unselect_all();
                self.set_select_mode(false);
            }
            KeyCommand::MoveRight => {
                self.open(current);
            }
            KeyCommand::MoveLeft => {
                self.close(current);
            }
            KeyCommand::MoveDown => {
                self.move_down_action(mode);
            }
            KeyCommand::MoveUp => {
                self.move_up_action(mode);
            }
            KeyCommand::PageUp => {
                self.move_page_up_action(mode);
            }
            KeyCommand::PageDown => {
                self.move_page_down_action(mode);
            }
            KeyCommand::Home => {
                self.move_home_action(mode);
            }
            KeyCommand::End => {
                self.move_end_action(mode);
            }
            KeyCommand::SelectModeToggle => self.select_mode_toggle(),
            KeyCommand::SelectAll => self.select_all_action(),
            KeyCommand::Enter => {
                self.toggle_close(current);
            }
            KeyCommand::Copy => self.copy(true)?,
            KeyCommand::Delete => return handled(self.delete_node(current)),
            KeyCommand::Duplicate => return handled(self.duplicate(current).map(|_| ())),
            KeyCommand::InsertBefore => return handled(self.insert_before(current, 1).map(|_| ())),
            KeyCommand::InsertAfter => return handled(self.insert_after(current, 1).map(|_| ())),
            KeyCommand::Cut => return handled(self.cut()),
            KeyCommand::Paste => {
                let mode = self.default_paste_mode(current);
                return handled(self.paste(current, mode).map(|_| ()));
            }
        }
        Ok(true)
    }

    /// Route a pointer gesture to the node under it.
    pub fn handle_pointer(&mut self, event: PointerEvent<'_>) -> Result<PointerResponse> {
        match event {
            PointerEvent::Click { position, modifiers } => {
                let Some(node) = self.node_at(position) else {
                    return Ok(PointerResponse::Ignored);
                };
                let mut mode = SelectMode::from_modifiers(modifiers);
                if mode == SelectMode::SelectOne && self.select_mode() {
                    mode = SelectMode::ExtendContinuous;
                }
                self.select_action(node, mode);
                self.set_focus(node);
                Ok(PointerResponse::Handled)
            }
            PointerEvent::DoubleClick { position } => {
                let Some(node) = self.node_at(position) else {
                    return Ok(PointerResponse::Ignored);
                };
                if self.node(node).is_some_and(|n| n.has_children()) {
                    self.toggle_close(node);
                }
                Ok(PointerResponse::Handled)
            }
            PointerEvent::ContextMenu { position } => {
                let Some(node) = self.node_at(position) else {
                    return Ok(PointerResponse::Ignored);
                };
                if !self.has_selection() {
                    self.select_action(node, SelectMode::SelectOne);
                }
                self.context_menu_requested.emit((node, position));
                Ok(PointerResponse::Handled)
            }
            PointerEvent::DragStart { position } => {
                let Some(node) = self.node_at(position) else {
                    return Ok(PointerResponse::Ignored);
                };
                Ok(PointerResponse::Dragging(self.drag_start(node)?))
            }
            PointerEvent::Drop {
                position,
                modifiers,
                session,
                mode,
            } => {
                let Some(target) = self.node_at(position) else {
                    return Ok(PointerResponse::Dropped(DropOutcome::Cancelled));
                };
                let action = DropAction::from_modifiers(modifiers);
                match self.drop(target, session, action, mode) {
                    Ok(outcome) => Ok(PointerResponse::Dropped(outcome)),
                    Err(err) if err.is_user_rejection() => Ok(PointerResponse::Dropped(DropOutcome::Cancelled)),
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// The context menu for a node.
    pub fn context_actions(&self, node: ViewId) -> Vec<ContextMenuEntry> {
        let enabled = self.has_selection() && self.contains(node);
        let entry = |action| ContextMenuEntry { action, enabled };
        if self.is_read_only() {
            return vec![
                entry(ContextAction::Copy),
                entry(ContextAction::OpenAll),
                entry(ContextAction::CloseAll),
            ];
        }
        vec![
            entry(ContextAction::AddChild),
            entry(ContextAction::InsertBefore),
            entry(ContextAction::InsertAfter),
            entry(ContextAction::Duplicate),
            entry(ContextAction::Delete),
            entry(ContextAction::Copy),
            entry(ContextAction::Cut),
            ContextMenuEntry {
                action: ContextAction::Paste,
                enabled: self.can_paste(),
            },
            entry(ContextAction::OpenAll),
            entry(ContextAction::CloseAll),
        ]
    }

    /// Run a context menu action on a node.
    pub fn run_context_action(&mut self, node: ViewId, action: ContextAction) -> Result<()> {
        tracing::debug!(target: targets::INPUT, ?action, "context action");
        match action {
            ContextAction::AddChild => self.add_child(node, 1).map(|_| ()),
            ContextAction::InsertBefore => self.insert_before(node, 1).map(|_| ()),
            ContextAction::InsertAfter => self.insert_after(node, 1).map(|_| ()),
            ContextAction::Duplicate => self.duplicate(node).map(|_| ()),
            ContextAction::Delete => self.delete_node(node),
            ContextAction::Copy => self.copy(true),
            ContextAction::Cut => self.cut(),
            ContextAction::Paste => {
                let mode = self.default_paste_mode(node);
                self.paste(node, mode).map(|_| ())
            }
            ContextAction::OpenAll => {
                self.open_all(node);
                Ok(())
            }
            ContextAction::CloseAll => {
                self.close_all(node);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::source::NodeData;

    fn view() -> TreeView {
        TreeView::standalone(
            NodeData::new("R")
                .with_child(NodeData::new("A"))
                .with_child(NodeData::new("B").with_child(NodeData::new("B1")))
                .with_child(NodeData::new("C")),
        )
    }

    fn child(view: &TreeView, parent: ViewId, name: &str) -> ViewId {
        view.child_by_name(parent, &format!("tv_{name}")).unwrap()
    }

    fn row(index: f32) -> Point {
        Point::new(100.0, index * 20.0 + 10.0)
    }

    #[test]
    fn test_arrow_keys_navigate() {
        let mut view = view();
        let a = child(&view, view.root(), "A");
        let b = child(&view, view.root(), "B");

        assert!(view.handle_key(KeyCommand::MoveDown, Modifiers::NONE).unwrap());
        assert_eq!(view.selected_nodes(), &[a]);
        view.handle_key(KeyCommand::MoveDown, Modifiers::SHIFT).unwrap();
        assert_eq!(view.selected_nodes(), &[a, b]);

        view.handle_key(KeyCommand::MoveLeft, Modifiers::NONE).unwrap();
        assert!(view.node(b).unwrap().is_closed());
        view.handle_key(KeyCommand::Enter, Modifiers::NONE).unwrap();
        assert!(!view.node(b).unwrap().is_closed());
    }

    #[test]
    fn test_select_mode_upgrades_plain_moves() {
        let mut view = view();
        view.handle_key(KeyCommand::SelectModeToggle, Modifiers::NONE).unwrap();
        view.handle_key(KeyCommand::MoveDown, Modifiers::NONE).unwrap();
        view.handle_key(KeyCommand::MoveDown, Modifiers::NONE).unwrap();
        assert_eq!(view.selected_nodes().len(), 3);

        view.handle_key(KeyCommand::CancelSelect, Modifiers::NONE).unwrap();
        assert!(!view.has_selection());
        assert!(!view.select_mode());
    }

    #[test]
    fn test_read_only_ignores_edits() {
        let mut view = view().with_read_only(true);
        let a = child(&view, view.root(), "A");
        view.set_focus(a);
        assert!(!view.handle_key(KeyCommand::Delete, Modifiers::NONE).unwrap());
        assert!(view.handle_key(KeyCommand::Copy, Modifiers::NONE).unwrap());
        assert_eq!(view.len(), 5);
    }

    #[test]
    fn test_delete_key_on_root_is_rejected_quietly() {
        let mut view = view();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let m = messages.clone();
        view.rejected.connect(move |msg| m.lock().push(msg.clone()));

        assert!(view.handle_key(KeyCommand::Delete, Modifiers::NONE).unwrap());
        assert_eq!(*messages.lock(), ["Cannot delete the root node".to_string()]);
        assert_eq!(view.len(), 5);
    }

    #[test]
    fn test_click_and_double_click() {
        let mut view = view();
        view.layout(Point::ZERO, 200.0);
        let a = child(&view, view.root(), "A");
        let b = child(&view, view.root(), "B");

        let response = view
            .handle_pointer(PointerEvent::Click {
                position: row(1.0),
                modifiers: Modifiers::NONE,
            })
            .unwrap();
        assert!(matches!(response, PointerResponse::Handled));
        assert_eq!(view.selected_nodes(), &[a]);
        assert_eq!(view.focus(), Some(a));

        view.handle_pointer(PointerEvent::Click {
            position: row(2.0),
            modifiers: Modifiers::CTRL,
        })
        .unwrap();
        assert_eq!(view.selected_nodes(), &[a, b]);

        view.handle_pointer(PointerEvent::DoubleClick { position: row(2.0) }).unwrap();
        assert!(view.node(b).unwrap().is_closed());

        let missed = view
            .handle_pointer(PointerEvent::Click {
                position: Point::new(100.0, 500.0),
                modifiers: Modifiers::NONE,
            })
            .unwrap();
        assert!(matches!(missed, PointerResponse::Ignored));
    }

    #[test]
    fn test_context_menu_selects_and_notifies() {
        let mut view = view();
        view.layout(Point::ZERO, 200.0);
        let c = child(&view, view.root(), "C");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let r = requests.clone();
        view.context_menu_requested.connect(move |req| r.lock().push(*req));

        view.handle_pointer(PointerEvent::ContextMenu { position: row(4.0) }).unwrap();
        assert_eq!(view.selected_nodes(), &[c]);
        assert_eq!(*requests.lock(), [(c, row(4.0))]);

        let entries = view.context_actions(c);
        assert_eq!(entries.len(), 10);
        let paste = entries.iter().find(|e| e.action == ContextAction::Paste).unwrap();
        assert!(!paste.enabled);
        assert!(entries.iter().filter(|e| e.action != ContextAction::Paste).all(|e| e.enabled));

        view.run_context_action(c, ContextAction::Duplicate).unwrap();
        assert!(view.child_by_name(view.root(), "tv_C_Copy").is_some());
    }

    #[test]
    fn test_read_only_context_menu() {
        let view = view().with_read_only(true);
        let actions: Vec<_> = view.context_actions(view.root()).iter().map(|e| e.action).collect();
        assert_eq!(actions, [ContextAction::Copy, ContextAction::OpenAll, ContextAction::CloseAll]);
    }

    #[test]
    fn test_pointer_drag_and_drop() {
        let mut view = view();
        view.layout(Point::ZERO, 200.0);
        let b = child(&view, view.root(), "B");

        let PointerResponse::Dragging(session) =
            view.handle_pointer(PointerEvent::DragStart { position: row(1.0) }).unwrap()
        else {
            panic!("expected a drag session");
        };
        let PointerResponse::Dropped(outcome) = view
            .handle_pointer(PointerEvent::Drop {
                position: row(2.0),
                modifiers: Modifiers::NONE,
                session: &session,
                mode: PasteMode::Children,
            })
            .unwrap()
        else {
            panic!("expected a drop outcome");
        };
        view.drop_finalize(session, outcome).unwrap();

        let labels: Vec<_> = view
            .children(b)
            .iter()
            .map(|&c| view.node(c).unwrap().label().to_string())
            .collect();
        assert_eq!(labels, ["B1", "A"]);
        assert!(view.child_by_name(view.root(), "tv_A").is_none());
    }
}
