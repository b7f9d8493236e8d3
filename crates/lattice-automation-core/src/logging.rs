//! Logging facilities for Lattice Automation.
//!
//! Lattice Automation uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in the host application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_automation::rebuild=debug")
//!     .init();
//! ```
//!
//! Every event the engine emits carries one of the [`targets`], so a single
//! subsystem (rebuilds, realization, the proxy registry, ...) can be switched on
//! without the rest.

/// Span names used throughout Lattice Automation for tracing.
pub mod span_names {
    /// Child list rebuild of a collection peer.
    pub const REBUILD: &str = "lattice_automation::rebuild";
    /// Realize request on an item peer.
    pub const REALIZE: &str = "lattice_automation::realize";
    /// Subtree update pass.
    pub const UPDATE_SUBTREE: &str = "lattice_automation::update_subtree";
    /// Dispatcher turn.
    pub const DISPATCH: &str = "lattice_automation::dispatch";
}

/// Target names for log filtering.
pub mod targets {
    /// Engine-wide target.
    pub const ENGINE: &str = "lattice_automation";
    /// Child list rebuilds and identity reuse.
    pub const REBUILD: &str = "lattice_automation::rebuild";
    /// Realize requests and deferred bring-into-view.
    pub const REALIZE: &str = "lattice_automation::realize";
    /// Client proxy registry.
    pub const REGISTRY: &str = "lattice_automation::registry";
    /// Invalidation flags.
    pub const INVALIDATION: &str = "lattice_automation::invalidation";
    /// Dispatcher queue.
    pub const DISPATCH: &str = "lattice_automation::dispatch";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Used to measure the duration of rebuilds and subtree updates.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "lattice_automation::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns with the engine-wide target.
#[macro_export]
macro_rules! automation_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "lattice_automation", $($arg)*)
    };
}

#[macro_export]
macro_rules! automation_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "lattice_automation", $($arg)*)
    };
}

#[macro_export]
macro_rules! automation_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "lattice_automation", $($arg)*)
    };
}
