//! Logging facilities for Arbor.
//!
//! Arbor uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("arbor=debug")
//!         .init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! All events are emitted with one of the [`targets`] below so they can be
//! filtered per subsystem.

/// Span names used throughout Arbor for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// Source-to-view synchronization pass.
    pub const SYNC: &str = "arbor::sync";
    /// Layout pass.
    pub const LAYOUT: &str = "arbor::layout";
    /// View index recompute.
    pub const REINDEX: &str = "arbor::reindex";
    /// Signal emission span.
    pub const SIGNAL: &str = "arbor::signal";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "arbor_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "arbor_core::signal";
    /// Source tree adapter target.
    pub const SOURCE: &str = "arbor::source";
    /// Tree synchronizer target.
    pub const SYNC: &str = "arbor::view::sync";
    /// Selection manager target.
    pub const SELECTION: &str = "arbor::view::selection";
    /// Navigation target.
    pub const NAVIGATION: &str = "arbor::view::navigation";
    /// Clipboard, drag-and-drop and structural editing target.
    pub const TRANSFER: &str = "arbor::view::transfer";
    /// Layout target.
    pub const LAYOUT: &str = "arbor::view::layout";
    /// Input command routing target.
    pub const INPUT: &str = "arbor::view::input";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of sync and layout passes.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "arbor::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns.
///
/// These are thin wrappers around the `tracing` macros with consistent target
/// naming.
#[macro_export]
macro_rules! arbor_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "arbor", $($arg)*)
    };
}

#[macro_export]
macro_rules! arbor_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "arbor", $($arg)*)
    };
}

#[macro_export]
macro_rules! arbor_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "arbor", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new(span_names::SYNC);
    }

    #[test]
    fn test_logging_macros_with_subscriber() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("arbor=trace")
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            arbor_trace!("trace message");
            arbor_debug!(count = 3, "debug message");
            arbor_warn!("warn message");
        });
    }
}
