//! A concurrent priority queue built on a sorted, singly linked list with one lock per node.
//!
//! Blocking operations walk the list hand over hand. Submitted (`*_async`) operations run the
//! same algorithms on a [`Dispatch`] pool, and the queue keeps track of submitted insertions so
//! that consumers can tell an empty queue from one that is about to receive entries.

mod dispatch;
mod mode;
mod outcome;
mod queue;
pub mod test;

// region:    --- Exports
pub use dispatch::{Dispatch, Job, SpawnPerJob};
pub use mode::PriorityMode;
pub use outcome::{Entry, OperationResult};
pub use queue::{Entries, Iter, PriorityLinkedQueue};
// endregion: --- Exports
