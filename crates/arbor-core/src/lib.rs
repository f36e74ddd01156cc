//! Core systems for Arbor.
//!
//! This crate provides the foundational pieces shared by the Arbor tree view:
//!
//! - **Signal/Slot System**: Type-safe change notification between the source
//!   tree, the view, and the host UI layer
//! - **Logging**: `tracing` targets, span names and timing guards
//!
//! # Signal/Slot Example
//!
//! ```
//! use arbor_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```

pub mod logging;
pub mod signal;

pub use logging::{PerfSpan, span_names, targets};
pub use signal::{ConnectionGuard, ConnectionId, Signal, SignalEmitter};
