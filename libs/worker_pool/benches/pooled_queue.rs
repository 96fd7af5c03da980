use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use linked_pq::{PriorityLinkedQueue, PriorityMode};
use worker_pool::{Cfg, ThreadPool};

fn create_queue(workers: usize) -> PriorityLinkedQueue<u64, u64> {
    let pool = ThreadPool::start(Cfg {
        workers,
        backlog: None,
    })
    .unwrap();
    PriorityLinkedQueue::new(PriorityMode::Max, Arc::new(pool))
}

fn insert_async_then_remove(c: &mut Criterion) {
    let queue = create_queue(4);

    c.bench_function("worker_pool insert_async_then_remove", |b| {
        b.iter(|| {
            queue.insert_async(black_box(7), 1, true).unwrap();
            // Blocks until the submitted insertion has landed.
            let removed = queue.remove().map(|e| e.priority);
            assert_eq!(removed, Some(7));
        })
    });
}

fn burst_until_quiescent(c: &mut Criterion) {
    let queue = create_queue(4);

    c.bench_function("worker_pool burst_until_quiescent", |b| {
        b.iter(|| {
            for priority in 0..256 {
                queue
                    .insert_async(black_box(priority), priority, true)
                    .unwrap();
            }
            assert!(queue.wait_for_quiescence(Duration::ZERO, Some(Duration::from_secs(5))));
            queue.clear();
        })
    });
}

criterion_group!(benches, insert_async_then_remove, burst_until_quiescent);
criterion_main!(benches);
