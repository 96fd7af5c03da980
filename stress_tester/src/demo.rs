use std::{sync::Arc, thread, time::Duration};

use linked_pq::{Dispatch, OperationResult, PriorityLinkedQueue, PriorityMode};
use rand::Rng;

const PARALLEL_INSERTS: usize = 10_000;
const PARALLELISM: usize = 8;

/// Walks through the queue's operations and prints what each of them did.
pub fn run(dispatcher: Arc<dyn Dispatch>) -> anyhow::Result<()> {
    let queue = PriorityLinkedQueue::<u32, String>::new(PriorityMode::Min, dispatcher);

    // -- Blocking, duplicates refused
    for (priority, value) in [(1, "World"), (1, "World"), (0, "Hello")] {
        if queue.insert(priority, value.to_string(), false) {
            println!("Insert success");
        } else {
            println!("Duplicate entry");
        }
    }
    println!();

    for _ in 0..3 {
        match queue.remove() {
            Some(entry) => println!("{}", entry.value),
            None => println!("Queue is empty"),
        }
    }

    // -- Submitted
    for _ in 0..2 {
        queue.insert_async_with(0, "Hello World".to_string(), false, |result| match result {
            OperationResult::Success(entry) => println!("Inserted: {}", entry.value),
            _ => println!("Insert dup"),
        })?;
    }
    println!();

    for _ in 0..2 {
        queue.remove_async_with(|result| match result {
            OperationResult::Success(entry) => println!("Removed: {}", entry.value),
            _ => println!("Queue is empty"),
        })?;
    }

    // -- Parallel submissions
    thread::scope(|s| {
        let handles: Vec<_> = (0..PARALLELISM)
            .map(|_| {
                let queue = &queue;
                s.spawn(move || -> anyhow::Result<()> {
                    let mut rng = rand::rng();
                    for _ in 0..PARALLEL_INSERTS / PARALLELISM {
                        let n = rng.random_range(0..100_000);
                        queue.insert_async(n, n.to_string(), true)?;
                    }
                    Ok(())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("submitting thread panicked"))?
            })
            .collect::<anyhow::Result<()>>()
    })?;

    println!("Submitted inserts left: {}", queue.pending_inserts());
    if !queue.wait_for_quiescence(Duration::ZERO, Some(Duration::from_secs(2))) {
        log::warn!("submitted inserts did not settle in time");
    }
    println!("Submitted inserts left: {}", queue.pending_inserts());
    println!();

    for value in &queue {
        println!("{value}");
    }
    println!();

    println!("Entries: {}", queue.len());
    Ok(())
}
