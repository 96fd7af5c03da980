//! A fixed-size pool of worker threads that runs the submitted operations of a
//! [`linked_pq::PriorityLinkedQueue`].

mod thread_pool;

// region: --- Exports

pub use thread_pool::{Cfg, ThreadPool};

// endregion: --- Exports
