use std::{
    cmp::Ordering,
    fmt::Debug,
    sync::{
        Arc,
        atomic::{self, AtomicUsize},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam::utils::Backoff;
use lock_api::ArcMutexGuard;

use crate::{Dispatch, Entry, OperationResult, PriorityMode, dispatch::Job};

/// Per-node spin lock. Its guards own an `Arc` to the node, so a hand-over-hand walk can
/// replace the guard of the predecessor with the guard of the successor.
type NodeLock<P, V> = spin::lock_api::Mutex<Node<P, V>>;
type NodeGuard<P, V> = ArcMutexGuard<spin::Mutex<()>, Node<P, V>>;
type NodeRef<P, V> = Arc<NodeLock<P, V>>;
type Link<P, V> = Option<NodeRef<P, V>>;

struct Node<P, V> {
    /// `None` for the sentinel and for a node whose entry was handed out by a removal.
    entry: Option<Entry<P, V>>,
    next: Link<P, V>,
}

impl<P, V> Node<P, V> {
    fn sentinel() -> NodeRef<P, V> {
        Arc::new(NodeLock::new(Self {
            entry: None,
            next: None,
        }))
    }

    fn linked(entry: Entry<P, V>, next: Link<P, V>) -> NodeRef<P, V> {
        Arc::new(NodeLock::new(Self {
            entry: Some(entry),
            next,
        }))
    }

    fn priority(&self) -> Option<&P> {
        self.entry.as_ref().map(|entry| &entry.priority)
    }
}

/// State shared between all handles of a queue and the jobs they submit.
struct Shared<P, V> {
    mode: PriorityMode,
    head: NodeRef<P, V>,
    count: AtomicUsize,
    pending_inserts: AtomicUsize,
}

impl<P, V> Shared<P, V> {
    /// Locks the sentinel and reports whether the chain is empty while no insertion is
    /// pending. Returns the guard otherwise, so the caller can continue from the sentinel.
    ///
    /// Pending insertions link their node before they are no longer counted as pending, so
    /// reading the counter under the sentinel lock cannot miss an insertion that already
    /// concluded.
    fn lock_non_empty_head(&self) -> Option<NodeGuard<P, V>> {
        let backoff = Backoff::new();
        loop {
            let head = self.head.lock_arc();
            if head.next.is_some() {
                return Some(head);
            }
            let pending = self.pending_inserts.load(atomic::Ordering::SeqCst);
            drop(head);
            if pending == 0 {
                return None;
            }
            backoff.snooze();
        }
    }

    /// Discards a detached chain front to back, holding one node lock at a time.
    ///
    /// Threads still walking the detached chain are always ahead of us, so every node they
    /// link into it is visited and uncounted here as well.
    fn discard_chain(&self, mut link: Link<P, V>) {
        while let Some(node) = link {
            let mut guard = node.lock_arc();
            if guard.entry.take().is_some() {
                self.count.fetch_sub(1, atomic::Ordering::AcqRel);
            }
            link = guard.next.take();
        }
    }

    fn clear(&self) {
        let detached = self.head.lock_arc().next.take();
        self.discard_chain(detached);
    }
}

impl<P: Ord, V> Shared<P, V> {
    /// Hand-over-hand walk from the sentinel to the insertion point.
    /// # Error
    /// Hands `entry` back if its priority is already queued and `allow_duplicates` is false.
    fn insert(&self, entry: Entry<P, V>, allow_duplicates: bool) -> Result<(), Entry<P, V>> {
        let mut current = self.head.lock_arc();

        while let Some(next) = current.next.clone() {
            let successor = next.lock_arc();
            if let Some(resident) = successor.priority() {
                let ordering = resident.cmp(&entry.priority);
                if self.mode.yields_to_candidate(ordering) {
                    break;
                }
                if ordering == Ordering::Equal && !allow_duplicates {
                    log::trace!("insert rejected: priority is already queued");
                    return Err(entry);
                }
            }
            // Assigning drops the predecessor's guard only after the successor is locked.
            current = successor;
        }

        let next = current.next.take();
        current.next = Some(Node::linked(entry, next));
        self.count.fetch_add(1, atomic::Ordering::AcqRel);
        Ok(())
    }

    fn remove(&self) -> Option<Entry<P, V>> {
        let mut head = self.lock_non_empty_head()?;
        let first = head.next.clone()?;
        let mut first = first.lock_arc();
        head.next = first.next.take();
        self.count.fetch_sub(1, atomic::Ordering::AcqRel);
        first.entry.take()
    }
}

impl<P: Clone, V: Clone> Shared<P, V> {
    fn peek(&self) -> Option<Entry<P, V>> {
        let head = self.lock_non_empty_head()?;
        let first = head.next.clone()?;
        let first = first.lock_arc();
        first.entry.clone()
    }
}

impl<P, V> Drop for Shared<P, V> {
    fn drop(&mut self) {
        // Unlinking node by node keeps long chains from dropping recursively.
        self.clear();
    }
}

/// Keeps an insertion counted as pending until it is dropped, whether the insertion
/// concluded, its job was refused by the pool, or the job was dropped unrun.
struct PendingInsert<P, V>(Arc<Shared<P, V>>);

impl<P, V> PendingInsert<P, V> {
    fn register(shared: &Arc<Shared<P, V>>) -> Self {
        shared
            .pending_inserts
            .fetch_add(1, atomic::Ordering::SeqCst);
        Self(Arc::clone(shared))
    }
}

impl<P, V> Drop for PendingInsert<P, V> {
    fn drop(&mut self) {
        self.0.pending_inserts.fetch_sub(1, atomic::Ordering::SeqCst);
    }
}

/// A sorted, singly linked priority queue with one spin lock per node.
///
/// Every operation walks the chain hand over hand: the lock of a successor is taken before the
/// lock of its predecessor is released, and locks are only ever taken from the sentinel
/// towards the tail. No thread holds more than two locks at once, which rules out deadlocks
/// between concurrent operations.
///
/// Entries are ordered by [`PriorityMode`]. Entries of equal priority keep their arrival order.
///
/// The `*_async` operations run on the [`Dispatch`] pool the queue was created with.
/// Submitted insertions are tracked as pending until they conclude, and [`Self::remove`]
/// and [`Self::peek`] keep waiting instead of reporting an empty queue while any are pending.
///
/// Cloning the queue is cheap; clones operate on the same entries.
pub struct PriorityLinkedQueue<P, V> {
    shared: Arc<Shared<P, V>>,
    dispatcher: Arc<dyn Dispatch>,
}

impl<P, V> Clone for PriorityLinkedQueue<P, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<P, V> Debug for PriorityLinkedQueue<P, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityLinkedQueue")
            .field("mode", &self.mode())
            .field("len", &self.len())
            .field("pending_inserts", &self.pending_inserts())
            .finish()
    }
}

impl<P, V> PriorityLinkedQueue<P, V> {
    pub fn new(mode: PriorityMode, dispatcher: Arc<dyn Dispatch>) -> Self {
        Self {
            shared: Arc::new(Shared {
                mode,
                head: Node::sentinel(),
                count: AtomicUsize::new(0),
                pending_inserts: AtomicUsize::new(0),
            }),
            dispatcher,
        }
    }

    pub fn mode(&self) -> PriorityMode {
        self.shared.mode
    }

    /// Number of entries currently linked into the queue.
    pub fn len(&self) -> usize {
        self.shared.count.load(atomic::Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of submitted insertions that have not concluded yet.
    pub fn pending_inserts(&self) -> usize {
        self.shared.pending_inserts.load(atomic::Ordering::SeqCst)
    }

    /// Drops every queued entry.
    ///
    /// Insertions that are still pending are not cancelled and land afterwards.
    pub fn clear(&self) {
        self.shared.clear();
    }

    /// Waits until no submitted insertion has been pending for `grace_period`.
    ///
    /// Returns `false` if `timeout` elapses first. `None` waits without limit, and a zero
    /// `grace_period` returns on the first observation of no pending insertion.
    ///
    /// # Note
    /// This does not keep new submissions out. An insertion submitted right after this returns
    /// is pending again.
    pub fn wait_for_quiescence(&self, grace_period: Duration, timeout: Option<Duration>) -> bool {
        let start = Instant::now();
        let mut quiet_since: Option<Instant> = None;

        loop {
            let now = Instant::now();
            if self.pending_inserts() == 0 {
                let since = *quiet_since.get_or_insert(now);
                if now.duration_since(since) >= grace_period {
                    return true;
                }
            } else {
                quiet_since = None;
            }

            if timeout.is_some_and(|timeout| now.duration_since(start) >= timeout) {
                log::debug!(
                    "quiescence not reached within {timeout:?}, {} insertions pending",
                    self.pending_inserts()
                );
                return false;
            }
            thread::yield_now();
        }
    }
}

impl<P: Ord, V> PriorityLinkedQueue<P, V> {
    /// Inserts `value` behind every queued entry of higher or equal priority.
    ///
    /// Returns `false` without changing the queue if `priority` is already queued and
    /// `allow_duplicates` is false.
    pub fn insert(&self, priority: P, value: V, allow_duplicates: bool) -> bool {
        self.shared
            .insert(Entry::new(priority, value), allow_duplicates)
            .is_ok()
    }

    /// Inserts with duplicate priorities allowed.
    pub fn push(&self, priority: P, value: V) {
        let inserted = self.shared.insert(Entry::new(priority, value), true);
        debug_assert!(inserted.is_ok(), "duplicates are allowed");
    }

    /// Removes the entry at the front of the queue.
    ///
    /// Returns `None` only when the queue is empty and no submitted insertion is pending;
    /// while insertions are pending this spins until one of them lands.
    pub fn remove(&self) -> Option<Entry<P, V>> {
        self.shared.remove()
    }
}

impl<P: Clone, V: Clone> PriorityLinkedQueue<P, V> {
    /// Returns a copy of the front entry without removing it. Waits on pending insertions like
    /// [`Self::remove`].
    pub fn peek(&self) -> Option<Entry<P, V>> {
        self.shared.peek()
    }

    /// Iterates over the queued values in priority order.
    ///
    /// The iterator walks the chain hand over hand and keeps the lock of the entry it yielded
    /// last until the next step. Entries linked ahead of it while it is alive are observed.
    ///
    /// # Deadlock
    /// Operating on the same queue from the iterating thread while the iterator is alive can
    /// spin forever on the lock the iterator holds.
    pub fn iter(&self) -> Iter<'_, P, V> {
        Iter {
            entries: self.entries(),
        }
    }

    /// Like [`Self::iter`], yielding priorities together with the values.
    pub fn entries(&self) -> Entries<'_, P, V> {
        Entries {
            head: &self.shared.head,
            cursor: Cursor::Fresh,
        }
    }
}

impl<P, V> PriorityLinkedQueue<P, V>
where
    P: Ord + Send + 'static,
    V: Send + 'static,
{
    /// Submits [`Self::insert`] to the pool.
    /// # Error
    /// Returns an error if the pool refused the job. The insertion is then not pending.
    pub fn insert_async(
        &self,
        priority: P,
        value: V,
        allow_duplicates: bool,
    ) -> anyhow::Result<()> {
        self.submit_insert(Entry::new(priority, value), allow_duplicates, |_| {})
    }

    /// Submits [`Self::insert`] to the pool and calls `on_complete` on the pool thread once the
    /// insertion concluded. The insertion is no longer pending when `on_complete` runs.
    /// # Error
    /// Returns an error if the pool refused the job. `on_complete` is never called then.
    pub fn insert_async_with<F>(
        &self,
        priority: P,
        value: V,
        allow_duplicates: bool,
        on_complete: F,
    ) -> anyhow::Result<()>
    where
        P: Clone,
        V: Clone,
        F: FnOnce(OperationResult<P, V>) + Send + 'static,
    {
        let inserted = Entry::new(priority.clone(), value.clone());
        self.submit_insert(
            Entry::new(priority, value),
            allow_duplicates,
            move |outcome| {
                on_complete(match outcome {
                    Ok(()) => OperationResult::Success(inserted),
                    Err(rejected) => OperationResult::Rejected(rejected),
                })
            },
        )
    }

    /// Submits [`Self::remove`] to the pool and drops whatever it removes.
    pub fn remove_async(&self) -> anyhow::Result<()> {
        self.remove_async_with(|_| {})
    }

    /// Submits [`Self::remove`] to the pool and hands the outcome to `on_complete`.
    ///
    /// # Note
    /// The removal occupies a pool thread while it waits for pending insertions. A pool with
    /// a single worker never gets to run those insertions if the removal was scheduled first.
    pub fn remove_async_with<F>(&self, on_complete: F) -> anyhow::Result<()>
    where
        F: FnOnce(OperationResult<P, V>) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.dispatch(Box::new(move || {
            on_complete(OperationResult::removed(shared.remove()));
        }))
    }

    fn submit_insert<F>(
        &self,
        entry: Entry<P, V>,
        allow_duplicates: bool,
        on_complete: F,
    ) -> anyhow::Result<()>
    where
        F: FnOnce(Result<(), Entry<P, V>>) + Send + 'static,
    {
        // Counted before the pool sees the job; dropping the guard concludes the insertion.
        let pending = PendingInsert::register(&self.shared);
        self.dispatch(Box::new(move || {
            let outcome = pending.0.insert(entry, allow_duplicates);
            drop(pending);
            on_complete(outcome);
        }))
    }

    fn dispatch(&self, job: Job) -> anyhow::Result<()> {
        self.dispatcher
            .dispatch(job)
            .inspect_err(|e| log::warn!("queue operation was not submitted: {e:#}"))
    }
}

enum Cursor<P, V> {
    Fresh,
    At(NodeGuard<P, V>),
    Done,
}

/// Iterator over the entries of a [`PriorityLinkedQueue`], see [`PriorityLinkedQueue::iter`].
pub struct Entries<'a, P, V> {
    head: &'a NodeRef<P, V>,
    cursor: Cursor<P, V>,
}

impl<P: Clone, V: Clone> Iterator for Entries<'_, P, V> {
    type Item = Entry<P, V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let current = match std::mem::replace(&mut self.cursor, Cursor::Done) {
                Cursor::Fresh => self.head.lock_arc(),
                Cursor::At(guard) => guard,
                Cursor::Done => return None,
            };
            let next = current.next.clone()?;
            let successor = next.lock_arc();
            drop(current);

            let entry = successor.entry.clone();
            self.cursor = Cursor::At(successor);
            if entry.is_some() {
                return entry;
            }
        }
    }
}

/// Iterator over the values of a [`PriorityLinkedQueue`], see [`PriorityLinkedQueue::iter`].
pub struct Iter<'a, P, V> {
    entries: Entries<'a, P, V>,
}

impl<P: Clone, V: Clone> Iterator for Iter<'_, P, V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.entries.next().map(|entry| entry.value)
    }
}

impl<'a, P: Clone, V: Clone> IntoIterator for &'a PriorityLinkedQueue<P, V> {
    type Item = V;
    type IntoIter = Iter<'a, P, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, mpsc},
        thread,
        time::Duration,
    };

    use super::PriorityLinkedQueue;
    use crate::{Dispatch, Entry, OperationResult, PriorityMode, SpawnPerJob, dispatch::Job};

    fn queue<V>(mode: PriorityMode) -> PriorityLinkedQueue<i32, V> {
        PriorityLinkedQueue::new(mode, Arc::new(SpawnPerJob))
    }

    /// Holds submitted jobs until the test releases them.
    #[derive(Default)]
    struct HeldJobs(std::sync::Mutex<Vec<Job>>);

    impl HeldJobs {
        fn release_all(&self) {
            let jobs = std::mem::take(&mut *self.0.lock().unwrap());
            for job in jobs {
                thread::spawn(job);
            }
        }
    }

    impl Dispatch for HeldJobs {
        fn dispatch(&self, job: Job) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(job);
            Ok(())
        }
    }

    struct Refusing;

    impl Dispatch for Refusing {
        fn dispatch(&self, _job: Job) -> anyhow::Result<()> {
            anyhow::bail!("pool is shut down")
        }
    }

    #[test]
    fn min_mode_with_duplicate_gating() {
        let q = queue(PriorityMode::Min);

        assert!(q.insert(1, "World", false));
        assert!(!q.insert(1, "World", false));
        assert!(q.insert(0, "Hello", false));
        assert_eq!(q.len(), 2);

        assert_eq!(q.remove(), Some(Entry::new(0, "Hello")));
        assert_eq!(q.remove(), Some(Entry::new(1, "World")));
        assert_eq!(q.remove(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn max_mode_orders_descending() {
        let q = queue(PriorityMode::Max);
        for p in [3, 9, 1, 7, 5] {
            q.push(p, p * 10);
        }

        let drained: Vec<_> = std::iter::from_fn(|| q.remove()).map(|e| e.priority).collect();
        assert_eq!(drained, vec![9, 7, 5, 3, 1]);
    }

    #[test]
    fn equal_priorities_keep_arrival_order() {
        let q = queue(PriorityMode::Max);
        q.push(5, "first");
        q.push(9, "top");
        q.push(5, "second");
        q.push(1, "bottom");
        q.push(5, "third");

        let values: Vec<_> = q.iter().collect();
        assert_eq!(values, vec!["top", "first", "second", "third", "bottom"]);
    }

    #[test]
    fn duplicate_rejection_does_not_mutate() {
        let q = queue(PriorityMode::Min);
        q.push(2, 'b');
        q.push(4, 'd');

        assert!(!q.insert(4, 'x', false));
        assert!(!q.insert(2, 'y', false));
        assert!(q.insert(3, 'c', false));

        let entries: Vec<_> = q.entries().map(Entry::into_parts).collect();
        assert_eq!(entries, vec![(2, 'b'), (3, 'c'), (4, 'd')]);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn peek_does_not_change_count() {
        let q = queue(PriorityMode::Max);
        assert_eq!(q.peek(), None);
        q.push(1, "low");
        q.push(2, "high");

        for _ in 0..3 {
            assert_eq!(q.peek(), Some(Entry::new(2, "high")));
        }
        assert_eq!(q.len(), 2);
        assert_eq!(q.remove().map(|e| e.value), Some("high"));
    }

    #[test]
    fn clear_resets_and_is_idempotent() {
        let q = queue(PriorityMode::Max);
        q.clear();
        assert!(q.is_empty());

        for p in 0..100 {
            q.push(p, ());
        }
        q.clear();
        assert_eq!(q.len(), 0);
        assert_eq!(q.remove(), None);
        assert_eq!(q.iter().count(), 0);

        q.clear();
        q.push(1, ());
        assert_eq!(q.len(), 1);
    }

    /// Dropping a long chain must not recurse once per node.
    #[test]
    fn dropping_long_queue_does_not_overflow() {
        let q = queue(PriorityMode::Min);
        for p in (0..200_000).rev() {
            q.push(p, ());
        }
        assert_eq!(q.len(), 200_000);
        drop(q);
    }

    #[test]
    fn iteration_is_restartable_and_not_destructive() {
        let q = queue(PriorityMode::Min);
        for p in [4, 2, 8, 6] {
            q.push(p, p.to_string());
        }

        let first: Vec<_> = (&q).into_iter().collect();
        let second: Vec<_> = q.iter().collect();
        assert_eq!(first, vec!["2", "4", "6", "8"]);
        assert_eq!(first, second);
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn dropped_iterator_releases_its_lock() {
        let q = queue(PriorityMode::Min);
        q.push(1, ());
        q.push(2, ());

        let mut iter = q.iter();
        assert_eq!(iter.next(), Some(()));
        drop(iter);

        assert!(q.insert(3, (), false));
        assert_eq!(q.len(), 3);
    }

    /// A removal of the node the iterator stands on waits for the iterator to move on.
    #[test]
    fn removal_waits_for_iterator_lock() {
        let q = queue(PriorityMode::Min);
        q.push(1, "first");
        q.push(2, "second");

        let (tx, rx) = mpsc::channel();
        let remover = q.clone();
        let mut iter = q.iter();
        assert_eq!(iter.next(), Some("first"));

        thread::spawn(move || tx.send(remover.remove()).unwrap());
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        drop(iter);
        let removed = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(removed, Some(Entry::new(1, "first")));
        assert_eq!(q.iter().collect::<Vec<_>>(), vec!["second"]);
    }

    #[test]
    fn clones_share_entries() {
        let q = queue(PriorityMode::Max);
        let other = q.clone();
        q.push(1, "one");
        assert_eq!(other.remove().map(|e| e.value), Some("one"));
        assert!(q.is_empty());
        assert_eq!(
            format!("{q:?}"),
            "PriorityLinkedQueue { mode: Max, len: 0, pending_inserts: 0 }"
        );
    }

    #[test]
    fn remove_waits_for_pending_insert() {
        let held = Arc::new(HeldJobs::default());
        let q: PriorityLinkedQueue<i32, &str> =
            PriorityLinkedQueue::new(PriorityMode::Max, held.clone());

        q.insert_async(7, "late", true).unwrap();
        assert_eq!(q.pending_inserts(), 1);
        assert!(q.is_empty());

        let (tx, rx) = mpsc::channel();
        let consumer = q.clone();
        thread::spawn(move || tx.send(consumer.remove()).unwrap());

        // The consumer must not report an empty queue while the insertion is held back.
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        held.release_all();
        let removed = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(removed, Some(Entry::new(7, "late")));
    }

    #[test]
    fn peek_waits_for_pending_insert() {
        let held = Arc::new(HeldJobs::default());
        let q: PriorityLinkedQueue<i32, &str> =
            PriorityLinkedQueue::new(PriorityMode::Max, held.clone());

        q.insert_async(7, "late", true).unwrap();

        let (tx, rx) = mpsc::channel();
        let observer = q.clone();
        thread::spawn(move || tx.send(observer.peek()).unwrap());

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        held.release_all();
        let peeked = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(peeked, Some(Entry::new(7, "late")));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn quiescence_times_out_while_held() {
        let held = Arc::new(HeldJobs::default());
        let q: PriorityLinkedQueue<i32, ()> =
            PriorityLinkedQueue::new(PriorityMode::Min, held.clone());

        q.insert_async(1, (), true).unwrap();
        assert!(!q.wait_for_quiescence(Duration::ZERO, Some(Duration::from_millis(20))));

        held.release_all();
        assert!(q.wait_for_quiescence(Duration::from_millis(5), Some(Duration::from_secs(5))));
        assert_eq!(q.pending_inserts(), 0);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn clear_does_not_cancel_pending_insert() {
        let held = Arc::new(HeldJobs::default());
        let q: PriorityLinkedQueue<i32, &str> =
            PriorityLinkedQueue::new(PriorityMode::Min, held.clone());

        q.push(1, "cleared");
        q.insert_async(2, "lands later", true).unwrap();
        q.clear();
        assert!(q.is_empty());

        held.release_all();
        assert!(q.wait_for_quiescence(Duration::ZERO, Some(Duration::from_secs(5))));
        assert_eq!(q.len(), 1);
        assert_eq!(q.remove(), Some(Entry::new(2, "lands later")));
    }

    #[test]
    fn quiescence_with_zero_grace_returns_immediately_when_idle() {
        let q: PriorityLinkedQueue<i32, ()> = queue(PriorityMode::Min);
        assert!(q.wait_for_quiescence(Duration::ZERO, None));
    }

    #[test]
    fn refused_dispatch_rolls_back_pending() {
        let q: PriorityLinkedQueue<i32, ()> =
            PriorityLinkedQueue::new(PriorityMode::Max, Arc::new(Refusing));

        assert!(q.insert_async(1, (), true).is_err());
        assert!(q.insert_async_with(2, (), true, |_| panic!("never called")).is_err());
        assert!(q.remove_async().is_err());
        assert_eq!(q.pending_inserts(), 0);
        assert_eq!(q.remove(), None);
    }

    #[test]
    fn rejected_async_insert_hands_back_entry() {
        let q = queue(PriorityMode::Min);
        q.push(5, String::from("resident"));

        let (tx, rx) = mpsc::channel();
        q.insert_async_with(5, String::from("newcomer"), false, move |result| {
            tx.send(result).unwrap();
        })
        .unwrap();

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            result,
            OperationResult::Rejected(Entry::new(5, String::from("newcomer")))
        );
        assert_eq!(q.len(), 1);
    }
}
