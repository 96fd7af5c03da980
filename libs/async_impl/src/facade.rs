use std::time::Duration;

use anyhow::Context;
use linked_pq::{Entry, OperationResult, PriorityLinkedQueue};
use tokio::sync::oneshot;

/// Awaitable counterparts of the blocking queue operations.
#[async_trait::async_trait]
pub trait AsyncPriorityQueue<P, V>: Send + Sync + 'static {
    /// Submits an insertion and resolves once it concluded.
    async fn insert(
        &self,
        priority: P,
        value: V,
        allow_duplicates: bool,
    ) -> anyhow::Result<OperationResult<P, V>>;

    /// Submits a removal and resolves with what it removed.
    async fn remove(&self) -> anyhow::Result<OperationResult<P, V>>;

    async fn peek(&self) -> anyhow::Result<Option<Entry<P, V>>>;

    async fn wait_for_quiescence(
        &self,
        grace_period: Duration,
        timeout: Option<Duration>,
    ) -> anyhow::Result<bool>;
}

#[async_trait::async_trait]
impl<P, V> AsyncPriorityQueue<P, V> for PriorityLinkedQueue<P, V>
where
    P: Ord + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    async fn insert(
        &self,
        priority: P,
        value: V,
        allow_duplicates: bool,
    ) -> anyhow::Result<OperationResult<P, V>> {
        let (send_back, outcome) = oneshot::channel();
        self.insert_async_with(priority, value, allow_duplicates, move |result| {
            if send_back.send(result).is_err() {
                log::debug!("insertion concluded after its caller hung up");
            }
        })?;
        outcome
            .await
            .context("insertion was dropped before it concluded")
    }

    async fn remove(&self) -> anyhow::Result<OperationResult<P, V>> {
        let (send_back, outcome) = oneshot::channel();
        self.remove_async_with(move |result| {
            if let Err(OperationResult::Success(_)) = send_back.send(result) {
                log::warn!(
                    "removal concluded after its caller hung up, the removed entry is thrown away"
                );
            }
        })?;
        outcome
            .await
            .context("removal was dropped before it concluded")
    }

    async fn peek(&self) -> anyhow::Result<Option<Entry<P, V>>> {
        let queue = self.clone();
        tokio::task::spawn_blocking(move || queue.peek())
            .await
            .context("peek did not conclude")
    }

    async fn wait_for_quiescence(
        &self,
        grace_period: Duration,
        timeout: Option<Duration>,
    ) -> anyhow::Result<bool> {
        let queue = self.clone();
        tokio::task::spawn_blocking(move || queue.wait_for_quiescence(grace_period, timeout))
            .await
            .context("quiescence wait did not conclude")
    }
}
