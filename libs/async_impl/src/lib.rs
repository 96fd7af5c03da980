//! Runs a [`linked_pq::PriorityLinkedQueue`] on a tokio runtime and exposes its operations as
//! futures.

mod dispatch;
mod facade;

// region:    --- Exports
pub use dispatch::TokioDispatch;
pub use facade::AsyncPriorityQueue;
// endregion: --- Exports
