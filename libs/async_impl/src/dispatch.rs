use anyhow::Context;
use linked_pq::{Dispatch, Job};
use tokio::runtime::Handle;

/// Runs queue jobs on the blocking thread pool of a tokio runtime.
///
/// Jobs spin on node locks and may wait for pending insertions, so they never run on the
/// runtime's async workers.
#[derive(Debug, Clone)]
pub struct TokioDispatch {
    handle: Handle,
}

impl TokioDispatch {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Binds to the runtime the caller is running on.
    /// # Error
    /// Returns an error when called outside of a tokio runtime.
    pub fn current() -> anyhow::Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .context("no tokio runtime to dispatch queue jobs to")
    }
}

impl Dispatch for TokioDispatch {
    fn dispatch(&self, job: Job) -> anyhow::Result<()> {
        // Detached; results travel through the job's callbacks.
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}
