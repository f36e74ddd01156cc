//! Transfer payloads, clipboard backends and drag-and-drop types.

mod clipboard;
mod drag_drop;
pub mod mime;

#[cfg(feature = "system-clipboard")]
pub use clipboard::SystemClipboard;
pub use clipboard::{ClipboardBackend, LocalClipboard};
pub(crate) use drag_drop::DraggedNode;
pub use drag_drop::{DragSession, DropAction, DropOutcome};
pub use mime::{MimeData, MimeEntry};
