use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, anyhow, bail};
use hdrhistogram::Histogram;
use linked_pq::{Dispatch, OperationResult, PriorityLinkedQueue};
use num_format::{Locale, ToFormattedString};
use rand::Rng;
use uuid::Uuid;

use crate::cfg::Cfg;

/// Upper bound of the latency histogram, in nanoseconds.
const MAX_TRACKED_LATENCY_NS: u64 = 60_000_000_000;
const PERCENTILES: [f64; 4] = [50.0, 90.0, 99.0, 99.9];
/// How long the queue has to stay free of submitted insertions before the leftovers are drained.
const SETTLE_GRACE: Duration = Duration::from_millis(5);
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);
/// How long completion callbacks may lag behind their insertions.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

type Queue = PriorityLinkedQueue<u64, String>;

#[derive(Default)]
struct Counters {
    submitted: AtomicUsize,
    rejected: AtomicUsize,
    submit_errors: AtomicUsize,
    removed: AtomicUsize,
    /// Insertions whose outcome has been recorded, including the callbacks of submitted ones.
    completed: AtomicUsize,
}

impl Counters {
    fn record_outcome(&self, accepted: bool) {
        if !accepted {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Release);
    }

    /// Waits until every submitted insertion has recorded its outcome.
    /// A submitted insertion stops being pending before its callback runs, so quiescence alone
    /// does not guarantee that `rejected` is final.
    fn wait_for_outcomes(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while self.completed.load(Ordering::Acquire) < self.submitted.load(Ordering::Acquire) {
            if start.elapsed() >= timeout {
                return false;
            }
            thread::yield_now();
        }
        true
    }
}

struct ConsumerReport {
    removed: usize,
    empty_polls: usize,
    latency_ns: Histogram<u64>,
}

/// Runs producers and consumers against one queue, then checks that no entry went missing.
pub fn run(cfg: &Cfg, dispatcher: Arc<dyn Dispatch>) -> anyhow::Result<()> {
    if cfg.priority_range == 0 {
        bail!("priority range must not be empty");
    }
    println!(
        "Starting stress test with {} producer and {} consumer threads",
        cfg.producer_num, cfg.consumer_num
    );
    println!(
        "Each producer will {} {} entries",
        if cfg.submitted { "submit" } else { "insert" },
        cfg.insert_num
    );
    println!("\n{:-<75}\n", "");

    let queue = Queue::new(cfg.mode.into(), dispatcher);
    let counters = Arc::new(Counters::default());
    let producers_stopped = Arc::new(AtomicUsize::new(0));

    let start_time = Instant::now();
    let test_end_time = start_time + Duration::from_secs(cfg.run_duration_seconds);

    // region:    --- Producers
    let mut producer_handles = Vec::with_capacity(cfg.producer_num);
    for producer_id in 1..=cfg.producer_num {
        let queue = queue.clone();
        let counters = Arc::clone(&counters);
        let producers_stopped = Arc::clone(&producers_stopped);
        let cfg = cfg.clone();

        let handle = thread::Builder::new()
            .name(format!("producer-{producer_id}"))
            .spawn(move || {
                let local_submitted = produce(&cfg, &queue, &counters, test_end_time);
                producers_stopped.fetch_add(1, Ordering::Release);
                log::info!("producer {producer_id} completed, submitted {local_submitted} entries");
            })
            .context("could not spawn producer")?;
        producer_handles.push(handle);
    }
    // endregion: --- Producers

    // region:    --- Consumers
    let mut consumer_handles = Vec::with_capacity(cfg.consumer_num);
    for consumer_id in 1..=cfg.consumer_num {
        let queue = queue.clone();
        let counters = Arc::clone(&counters);
        let producers_stopped = Arc::clone(&producers_stopped);
        let producer_num = cfg.producer_num;

        let handle = thread::Builder::new()
            .name(format!("consumer-{consumer_id}"))
            .spawn(move || -> anyhow::Result<ConsumerReport> {
                let report = consume(&queue, &counters, test_end_time, || {
                    producers_stopped.load(Ordering::Acquire) == producer_num
                })?;
                log::info!(
                    "consumer {consumer_id:02} completed, removed {} entries in total",
                    report.removed
                );
                Ok(report)
            })
            .context("could not spawn consumer")?;
        consumer_handles.push(handle);
    }
    // endregion: --- Consumers

    for handle in producer_handles {
        handle
            .join()
            .map_err(|_| anyhow!("producer thread panicked"))?;
    }
    println!("Waiting for consumers!");
    let mut latency_ns = new_histogram()?;
    let mut empty_polls = 0;
    for handle in consumer_handles {
        let report = handle
            .join()
            .map_err(|_| anyhow!("consumer thread panicked"))??;
        latency_ns
            .add(&report.latency_ns)
            .context("could not merge latency histograms")?;
        empty_polls += report.empty_polls;
    }
    let test_duration = start_time.elapsed();

    // -- Settle and drain the rest
    if !queue.wait_for_quiescence(SETTLE_GRACE, Some(SETTLE_TIMEOUT)) {
        bail!(
            "{} submitted insertions did not conclude within {SETTLE_TIMEOUT:?}",
            queue.pending_inserts()
        );
    }
    if !counters.wait_for_outcomes(CALLBACK_TIMEOUT) {
        bail!(
            "{} insertion outcomes were not recorded within {CALLBACK_TIMEOUT:?}",
            counters.submitted.load(Ordering::Acquire) - counters.completed.load(Ordering::Acquire)
        );
    }
    let leftover = std::iter::from_fn(|| queue.remove()).count();

    let results = TestResults {
        test_duration,
        submitted: counters.submitted.load(Ordering::Relaxed),
        rejected: counters.rejected.load(Ordering::Relaxed),
        submit_errors: counters.submit_errors.load(Ordering::Relaxed),
        removed: counters.removed.load(Ordering::Relaxed),
        leftover,
        empty_polls,
        latency_ns,
    };
    results.print_summary();
    results.verify()
}

/// Inserts random entries until `cfg.insert_num` are submitted or the test time is up.
/// Returns the number of submitted entries.
fn produce(cfg: &Cfg, queue: &Queue, counters: &Arc<Counters>, test_end_time: Instant) -> usize {
    let mut rng = rand::rng();
    let mut local_submitted = 0;

    while Instant::now() < test_end_time && local_submitted < cfg.insert_num {
        let priority = rng.random_range(0..cfg.priority_range);
        let value = Uuid::new_v4().to_string();

        if cfg.submitted {
            // Counted up front so the outcome can never be recorded before its submission.
            counters.submitted.fetch_add(1, Ordering::Release);
            let on_complete = {
                let counters = Arc::clone(counters);
                move |result: OperationResult<u64, String>| {
                    counters.record_outcome(result.is_success())
                }
            };
            let submission =
                queue.insert_async_with(priority, value, cfg.allow_duplicates, on_complete);
            if let Err(e) = submission {
                log::error!("stopping producer: {e:#}");
                counters.submitted.fetch_sub(1, Ordering::Release);
                counters.submit_errors.fetch_add(1, Ordering::Relaxed);
                break;
            }
        } else {
            counters.submitted.fetch_add(1, Ordering::Release);
            let accepted = queue.insert(priority, value, cfg.allow_duplicates);
            counters.record_outcome(accepted);
        }
        local_submitted += 1;
    }

    local_submitted
}

fn consume(
    queue: &Queue,
    counters: &Counters,
    test_end_time: Instant,
    producers_done: impl Fn() -> bool,
) -> anyhow::Result<ConsumerReport> {
    let mut report = ConsumerReport {
        removed: 0,
        empty_polls: 0,
        latency_ns: new_histogram()?,
    };

    while Instant::now() < test_end_time && !producers_done() {
        let remove_start = Instant::now();
        let removed = queue.remove();
        let elapsed_ns = u64::try_from(remove_start.elapsed().as_nanos()).unwrap_or(u64::MAX);

        if removed.is_some() {
            report.removed += 1;
            counters.removed.fetch_add(1, Ordering::Relaxed);
            report
                .latency_ns
                .record(elapsed_ns.min(MAX_TRACKED_LATENCY_NS))
                .context("latency out of histogram range")?;
        } else {
            report.empty_polls += 1;
            thread::yield_now();
        }
    }

    Ok(report)
}

fn new_histogram() -> anyhow::Result<Histogram<u64>> {
    Histogram::new_with_max(MAX_TRACKED_LATENCY_NS, 3).context("could not create histogram")
}

struct TestResults {
    test_duration: Duration,
    submitted: usize,
    rejected: usize,
    submit_errors: usize,
    removed: usize,
    leftover: usize,
    empty_polls: usize,
    latency_ns: Histogram<u64>,
}

impl TestResults {
    fn print_summary(&self) {
        let locale = &Locale::en;
        let seconds = self.test_duration.as_secs_f64().max(f64::EPSILON);

        println!("\n{:=^75}", " Stress Test Results ");
        println!("Test duration: {:?}", self.test_duration);
        println!(
            "Entries submitted: {} ({:.2}/sec)",
            self.submitted.to_formatted_string(locale),
            self.submitted as f64 / seconds
        );
        println!(
            "Entries removed: {} ({:.2}/sec)",
            self.removed.to_formatted_string(locale),
            self.removed as f64 / seconds
        );
        println!(
            "Duplicates rejected: {}",
            self.rejected.to_formatted_string(locale)
        );
        println!(
            "Left after the run: {}",
            self.leftover.to_formatted_string(locale)
        );
        println!(
            "Removals that found the queue empty: {}",
            self.empty_polls.to_formatted_string(locale)
        );
        println!("Submission errors: {}", self.submit_errors);

        if !self.latency_ns.is_empty() {
            println!(
                "\nRemove latency: avg {} ns, max {} ns",
                (self.latency_ns.mean() as u64).to_formatted_string(locale),
                self.latency_ns.max().to_formatted_string(locale)
            );
            let percentiles: Vec<_> = PERCENTILES
                .iter()
                .map(|p| {
                    format!(
                        "P{p:.1}: {} ns",
                        self.latency_ns
                            .value_at_quantile(p / 100.0)
                            .to_formatted_string(locale)
                    )
                })
                .collect();
            println!("Percentiles: {}", percentiles.join(", "));
        }
    }

    /// Every accepted entry was either removed during the run or drained afterwards.
    fn verify(&self) -> anyhow::Result<()> {
        let accepted = self.submitted - self.rejected;
        let accounted = self.removed + self.leftover;
        if accepted != accounted {
            bail!("{accepted} entries were accepted but {accounted} came out of the queue");
        }
        println!("\nNo entry went missing.");
        Ok(())
    }
}
