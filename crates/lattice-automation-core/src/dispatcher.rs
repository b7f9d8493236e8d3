//! Cooperative, priority-tiered operation queue for the owner thread.
//!
//! Operations are closures posted with a [`DispatchPriority`] and executed later
//! by whoever owns the dispatcher, one *turn* at a time. Higher tiers run first;
//! operations within a tier run in posting order.
//!
//! There is no preemption and no locking: the dispatcher and the context its
//! operations receive live on a single thread.
//!
//! # Example
//!
//! ```
//! use lattice_automation_core::{Dispatcher, DispatchPriority, run_turn};
//!
//! struct Host {
//!     log: Vec<&'static str>,
//!     dispatcher: Dispatcher<Host>,
//! }
//!
//! let mut host = Host { log: Vec::new(), dispatcher: Dispatcher::new() };
//! host.dispatcher.post(DispatchPriority::Loaded, |h: &mut Host| h.log.push("loaded"));
//! host.dispatcher.post(DispatchPriority::Input, |h: &mut Host| h.log.push("input"));
//!
//! let ran = run_turn(&mut host, |h| &mut h.dispatcher);
//! assert_eq!(ran, 2);
//! assert_eq!(host.log, ["input", "loaded"]);
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use slotmap::{SlotMap, new_key_type};

use crate::logging::{PerfSpan, span_names, targets};

new_key_type! {
    /// A unique identifier for a posted operation.
    pub struct OperationId;
}

/// Priority tiers for posted operations.
///
/// Higher tiers are drained first within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum DispatchPriority {
    /// Lowest priority - idle and background work.
    Background = 0,
    /// Work that should follow layout, such as bring-into-view retries.
    #[default]
    Loaded = 1,
    /// Layout and arrangement passes.
    Layout = 2,
    /// User input.
    Input = 3,
}

impl DispatchPriority {
    /// All tiers, lowest first.
    pub const ALL: [DispatchPriority; 4] = [
        DispatchPriority::Background,
        DispatchPriority::Loaded,
        DispatchPriority::Layout,
        DispatchPriority::Input,
    ];
}

/// A boxed operation closure.
type BoxedOperation<C> = Box<dyn FnOnce(&mut C) + 'static>;

struct OperationData<C> {
    priority: DispatchPriority,
    operation: BoxedOperation<C>,
}

/// Heap entry ordering operations by tier, then by posting order.
#[derive(Debug, Clone, Copy)]
struct QueuedOperation {
    id: OperationId,
    priority: DispatchPriority,
    sequence: u64,
}

impl PartialEq for QueuedOperation {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedOperation {}

impl PartialOrd for QueuedOperation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedOperation {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: higher tier is "greater", older sequence is "greater".
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}

/// An operation removed from the queue, ready to run against its context.
pub struct DispatchedOperation<C> {
    id: OperationId,
    priority: DispatchPriority,
    operation: BoxedOperation<C>,
}

impl<C> DispatchedOperation<C> {
    /// The id the operation was posted under.
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// The tier the operation was posted at.
    pub fn priority(&self) -> DispatchPriority {
        self.priority
    }

    /// Execute the operation.
    pub fn run(self, context: &mut C) {
        (self.operation)(context);
    }
}

impl<C> fmt::Debug for DispatchedOperation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchedOperation")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Priority queue of deferred operations over a context `C`.
pub struct Dispatcher<C> {
    operations: SlotMap<OperationId, OperationData<C>>,
    queue: BinaryHeap<QueuedOperation>,
    next_sequence: u64,
}

impl<C> Dispatcher<C> {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            operations: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    /// Post an operation to run on a later turn.
    ///
    /// Posted operations cannot be withdrawn; an operation that is no longer
    /// relevant when it runs is expected to notice and do nothing.
    pub fn post<F>(&mut self, priority: DispatchPriority, operation: F) -> OperationId
    where
        F: FnOnce(&mut C) + 'static,
    {
        let id = self.operations.insert(OperationData {
            priority,
            operation: Box::new(operation),
        });
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(QueuedOperation {
            id,
            priority,
            sequence,
        });
        tracing::trace!(target: targets::DISPATCH, ?id, ?priority, "operation posted");
        id
    }

    /// Check if there are any pending operations.
    pub fn has_pending(&self) -> bool {
        !self.operations.is_empty()
    }

    /// Get the number of pending operations.
    pub fn pending_count(&self) -> usize {
        self.operations.len()
    }

    /// Check whether an operation is still waiting to run.
    pub fn is_pending(&self, id: OperationId) -> bool {
        self.operations.contains_key(id)
    }

    /// Remove the highest-priority pending operation.
    pub fn pop_next(&mut self) -> Option<DispatchedOperation<C>> {
        while let Some(entry) = self.queue.pop() {
            if let Some(data) = self.operations.remove(entry.id) {
                return Some(DispatchedOperation {
                    id: entry.id,
                    priority: data.priority,
                    operation: data.operation,
                });
            }
        }
        None
    }

    /// Remove every operation pending right now, in execution order.
    ///
    /// Operations posted while the returned batch runs belong to the next turn.
    pub fn take_turn(&mut self) -> Vec<DispatchedOperation<C>> {
        let count = self.operations.len();
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            match self.pop_next() {
                Some(op) => batch.push(op),
                None => break,
            }
        }
        batch
    }
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.operations.len())
            .finish()
    }
}

/// Run one turn of `context`'s dispatcher.
///
/// `access` projects the dispatcher out of the context, which lets operations
/// receive `&mut C` while the batch itself is no longer borrowed from it.
/// Returns the number of operations executed.
pub fn run_turn<C, F>(context: &mut C, access: F) -> usize
where
    F: Fn(&mut C) -> &mut Dispatcher<C>,
{
    let batch = access(context).take_turn();
    let count = batch.len();
    if count > 0 {
        let _perf = PerfSpan::new(span_names::DISPATCH);
        tracing::trace!(target: targets::DISPATCH, count, "dispatch turn");
        for op in batch {
            op.run(context);
        }
    }
    count
}
