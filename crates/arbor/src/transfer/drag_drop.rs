//! Drag and drop types.
//!
//! A drag starts on the source view with
//! [`TreeView::drag_start`](crate::TreeView::drag_start), which captures the
//! selected nodes into a [`DragSession`]. The target view applies the payload
//! with [`TreeView::drop`](crate::TreeView::drop) and reports a
//! [`DropOutcome`]. The session and outcome then go back to the source view's
//! [`TreeView::drop_finalize`](crate::TreeView::drop_finalize), which consumes
//! the session, so source-side cleanup runs exactly once per gesture whether
//! the drop was accepted or cancelled.

use super::mime::MimeData;
use crate::source::SourceId;
use crate::view::{TreeId, ViewId};

/// Actions that can be performed during a drop operation.
///
/// These flags indicate what actions are supported by the drag source
/// and what action was performed by the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DropAction(u8);

impl DropAction {
    /// No action (drop not allowed).
    pub const NONE: Self = Self(0);
    /// Copy the nodes.
    pub const COPY: Self = Self(1 << 0);
    /// Move the nodes (source deletes the originals).
    pub const MOVE: Self = Self(1 << 1);
    /// Link to the nodes. Trees have no links, so this behaves as a copy.
    pub const LINK: Self = Self(1 << 2);
    /// All standard actions (copy, move, and link).
    pub const ALL: Self = Self(Self::COPY.0 | Self::MOVE.0 | Self::LINK.0);

    /// Returns true if this action set contains the Copy action.
    pub fn can_copy(self) -> bool {
        self.contains(Self::COPY)
    }

    /// Returns true if this action set contains the Move action.
    pub fn can_move(self) -> bool {
        self.contains(Self::MOVE)
    }

    /// Returns true if this action set contains another action.
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// The single action a drop actually performs.
    ///
    /// Move wins when present; link falls back to copy.
    pub fn effective(self) -> Self {
        if self.can_move() {
            Self::MOVE
        } else if self == Self::NONE {
            Self::NONE
        } else {
            Self::COPY
        }
    }

    /// Derive the drop action from the modifiers held at drop time.
    ///
    /// Control (or meta) copies, alt links, anything else moves.
    pub fn from_modifiers(modifiers: crate::view::Modifiers) -> Self {
        if modifiers.control || modifiers.meta {
            Self::COPY
        } else if modifiers.alt {
            Self::LINK
        } else {
            Self::MOVE
        }
    }
}

impl std::ops::BitOr for DropAction {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for DropAction {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

/// A dragged node as seen by the view the drag started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DraggedNode {
    pub(crate) view: ViewId,
    pub(crate) source: Option<SourceId>,
}

/// An in-flight drag gesture.
///
/// Not `Clone`: the session is consumed by
/// [`TreeView::drop_finalize`](crate::TreeView::drop_finalize).
///
/// Besides the payload, the session remembers which nodes were dragged so
/// the origin view can find them again by id rather than by path.
#[derive(Debug)]
pub struct DragSession {
    payload: MimeData,
    origin: TreeId,
    allowed: DropAction,
    nodes: Vec<DraggedNode>,
}

impl DragSession {
    pub(crate) fn new(payload: MimeData, origin: TreeId, allowed: DropAction, nodes: Vec<DraggedNode>) -> Self {
        Self {
            payload,
            origin,
            allowed,
            nodes,
        }
    }

    pub(crate) fn nodes(&self) -> &[DraggedNode] {
        &self.nodes
    }

    /// The encoded dragged nodes.
    pub fn payload(&self) -> &MimeData {
        &self.payload
    }

    /// The view the drag started in.
    pub fn origin(&self) -> TreeId {
        self.origin
    }

    /// The actions the source allows.
    pub fn allowed(&self) -> DropAction {
        self.allowed
    }
}

/// How a drop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// The target accepted the drop.
    Accepted {
        /// The action performed, after [`DropAction::effective`].
        action: DropAction,
        /// The originals were relocated by the drop itself, so the source
        /// must not delete them.
        moved_in_place: bool,
    },
    /// The drop was rejected or the gesture was abandoned.
    Cancelled,
}

impl DropOutcome {
    /// Whether the source should delete the dragged originals.
    pub fn deletes_source(&self) -> bool {
        matches!(
            self,
            Self::Accepted {
                action,
                moved_in_place: false,
            } if *action == DropAction::MOVE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Modifiers;

    #[test]
    fn test_effective_action() {
        assert_eq!(DropAction::LINK.effective(), DropAction::COPY);
        assert_eq!(DropAction::COPY.effective(), DropAction::COPY);
        assert_eq!((DropAction::COPY | DropAction::MOVE).effective(), DropAction::MOVE);
        assert_eq!(DropAction::NONE.effective(), DropAction::NONE);
        assert!(DropAction::ALL.can_copy() && DropAction::ALL.can_move());
    }

    #[test]
    fn test_action_from_modifiers() {
        assert_eq!(DropAction::from_modifiers(Modifiers::NONE), DropAction::MOVE);
        assert_eq!(DropAction::from_modifiers(Modifiers::CTRL), DropAction::COPY);
        assert_eq!(DropAction::from_modifiers(Modifiers::ALT), DropAction::LINK);
    }

    #[test]
    fn test_outcome_deletes_source() {
        let moved = DropOutcome::Accepted {
            action: DropAction::MOVE,
            moved_in_place: false,
        };
        let in_place = DropOutcome::Accepted {
            action: DropAction::MOVE,
            moved_in_place: true,
        };
        let copied = DropOutcome::Accepted {
            action: DropAction::COPY,
            moved_in_place: false,
        };
        assert!(moved.deletes_source());
        assert!(!in_place.deletes_source());
        assert!(!copied.deletes_source());
        assert!(!DropOutcome::Cancelled.deletes_source());
    }
}
