use anyhow::Context;

/// A unit of work handed to a [`Dispatch`] implementation.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The work pool that runs the submitted operations of a [`crate::PriorityLinkedQueue`].
///
/// An implementation must run every accepted job exactly once, on any thread, at any later
/// time. There is no result channel and no cancellation: results travel back through the
/// callbacks the queue invokes inside the job.
pub trait Dispatch: Send + Sync + 'static {
    /// Hands `job` over to the pool.
    /// # Error
    /// Returns an error if the pool can no longer accept work. The job is dropped unrun.
    fn dispatch(&self, job: Job) -> anyhow::Result<()>;
}

/// Runs every job on a freshly spawned OS thread.
///
/// Never refuses work and never runs out of workers, which makes it a convenient default for
/// tests and small programs. Long-lived programs should prefer a bounded pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnPerJob;

impl Dispatch for SpawnPerJob {
    fn dispatch(&self, job: Job) -> anyhow::Result<()> {
        std::thread::Builder::new()
            .name("linked-pq-job".into())
            .spawn(job)
            .map(drop)
            .context("could not spawn job thread")
    }
}
