use linked_pq::PriorityMode;

#[derive(Debug, Clone, clap::Parser)]
pub struct Cfg {
    /// The program to run against the queue.
    pub scenario: Scenario,
    /// The pool that runs submitted queue operations.
    #[arg(long, value_enum, default_value_t = PoolKind::Threads)]
    pub pool: PoolKind,
    /// Number of worker threads of the thread pool.
    #[arg(short, long, default_value_t = 4)]
    pub workers: usize,
    /// Which end of the priority order is removed first.
    #[arg(short, long, value_enum, default_value_t = Mode::Max)]
    pub mode: Mode,
    /// Number of Producers that will insert entries into the queue.
    #[arg(short, long, default_value_t = 4)]
    pub producer_num: usize,
    /// Number of entries each producer will insert during the test.
    #[arg(short, long, default_value_t = 10_000)]
    pub insert_num: usize,
    /// Number of Consumers that will remove entries from the queue.
    #[arg(short, long, default_value_t = 2)]
    pub consumer_num: usize,
    /// Producers submit their insertions to the pool instead of inserting in place.
    #[arg(short, long)]
    pub submitted: bool,
    /// Accept entries whose priority is already queued.
    #[arg(short, long)]
    pub allow_duplicates: bool,
    /// Priorities are drawn from `0..priority_range`.
    #[arg(long, default_value_t = 100_000)]
    pub priority_range: u64,
    // Hard cap on the test's execution time
    #[arg(long, default_value_t = 10)]
    pub run_duration_seconds: u64,
    /// Log filter, `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, strum::EnumString, clap::ValueEnum)]
pub enum Scenario {
    #[strum(ascii_case_insensitive)]
    Demo,
    #[strum(ascii_case_insensitive)]
    Stress,
}

#[derive(Debug, Clone, Copy, strum::EnumString, clap::ValueEnum)]
pub enum PoolKind {
    /// A fixed set of worker threads.
    #[strum(ascii_case_insensitive)]
    Threads,
    /// The blocking pool of a tokio runtime.
    #[strum(ascii_case_insensitive)]
    Tokio,
    /// One new thread per job.
    #[strum(ascii_case_insensitive)]
    Spawn,
}

#[derive(Debug, Clone, Copy, strum::EnumString, clap::ValueEnum)]
pub enum Mode {
    #[strum(ascii_case_insensitive)]
    Max,
    #[strum(ascii_case_insensitive)]
    Min,
}

impl From<Mode> for PriorityMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Max => PriorityMode::Max,
            Mode::Min => PriorityMode::Min,
        }
    }
}
