//! Core systems for Lattice Automation.
//!
//! This crate provides the foundational pieces the automation engine runs on:
//!
//! - **Dispatcher**: a cooperative, priority-tiered queue of deferred operations
//!   drained one turn at a time by the owner thread
//! - **Logging**: tracing targets, span names and helper macros
//!
//! # Dispatcher Example
//!
//! ```
//! use lattice_automation_core::{Dispatcher, DispatchPriority};
//!
//! let mut dispatcher: Dispatcher<Vec<u32>> = Dispatcher::new();
//! dispatcher.post(DispatchPriority::Background, |log: &mut Vec<u32>| log.push(1));
//! dispatcher.post(DispatchPriority::Input, |log: &mut Vec<u32>| log.push(2));
//!
//! let mut log = Vec::new();
//! for op in dispatcher.take_turn() {
//!     op.run(&mut log);
//! }
//! assert_eq!(log, vec![2, 1]);
//! ```

pub mod dispatcher;
pub mod logging;

pub use dispatcher::{DispatchPriority, DispatchedOperation, Dispatcher, OperationId, run_turn};
pub use logging::PerfSpan;
