use std::{
    fmt::Debug,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Context, anyhow, bail};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use linked_pq::{Dispatch, Job};

#[derive(Debug, Clone)]
pub struct Cfg {
    /// Number of worker threads.
    pub workers: usize,
    /// Number of jobs to keep in the job channel's buffer before blocking submitters.
    /// `None` buffers without limit.
    pub backlog: Option<usize>,
}

impl Default for Cfg {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(4, |n| n.get()),
            backlog: None,
        }
    }
}

/// How long an idle worker waits for a job before it checks whether the pool was stopped.
const IDLE_POLL: Duration = Duration::from_millis(20);

/// A fixed set of worker threads fed through a crossbeam channel.
pub struct ThreadPool {
    job_source: Sender<Job>,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.workers.len())
            .field("queued_jobs", &self.job_source.len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl ThreadPool {
    /// Spawns the workers and blocks until every one of them is up.
    pub fn start(cfg: Cfg) -> anyhow::Result<Self> {
        if cfg.workers == 0 {
            bail!("a thread pool needs at least one worker");
        }

        let (job_source, job_sink) = match cfg.backlog {
            Some(backlog) => crossbeam::channel::bounded(backlog),
            None => crossbeam::channel::unbounded(),
        };
        let running = Arc::new(AtomicBool::new(true));
        let started = Arc::new((Mutex::new(0usize), Condvar::new()));

        let mut workers = Vec::with_capacity(cfg.workers);
        for id in 0..cfg.workers {
            let worker = Worker {
                id,
                job_sink: job_sink.clone(),
                running: Arc::clone(&running),
            };
            let started = Arc::clone(&started);
            let handle = thread::Builder::new()
                .name(format!("worker-pool-{id}"))
                .spawn(move || {
                    if let Err(e) = worker.run(started) {
                        log::error!("worker {id} has shut down: {e:#}");
                    }
                })
                .with_context(|| format!("could not spawn worker {id}"))?;
            workers.push(handle);
        }

        // Wait for the workers to start up.
        let (lock, cvar) = &*started;
        let mut count = lock
            .lock()
            .map_err(|_| anyhow!("a worker panicked during start-up"))?;
        while *count < cfg.workers {
            count = cvar
                .wait(count)
                .map_err(|_| anyhow!("a worker panicked during start-up"))?;
        }
        log::debug!("thread pool started with {} workers", cfg.workers);

        Ok(Self {
            job_source,
            running,
            workers,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stops accepting jobs. Workers finish the jobs already queued and then exit.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Stops the pool and waits for the workers to finish the queued jobs.
    pub fn join(mut self) {
        self.stop();
        self.join_workers();
    }

    fn join_workers(&mut self) {
        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            // The last handle to the pool may be released by one of its own jobs.
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::error!("a worker thread panicked outside of a job");
            }
        }
    }
}

impl Dispatch for ThreadPool {
    fn dispatch(&self, job: Job) -> anyhow::Result<()> {
        if !self.is_running() {
            bail!("thread pool is stopped");
        }
        self.job_source
            .send(job)
            .map_err(|_| anyhow!("job channel is disconnected"))
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
        self.join_workers();
    }
}

struct Worker {
    id: usize,
    job_sink: Receiver<Job>,
    running: Arc<AtomicBool>,
}

impl Worker {
    /// This function blocks the thread it is running on.
    /// It runs jobs until the pool is stopped and the job channel is empty, or until the
    /// channel is disconnected.
    fn run(self, started: Arc<(Mutex<usize>, Condvar)>) -> anyhow::Result<()> {
        Self::notify_about_start(started)?;
        log::debug!("worker {} started", self.id);

        loop {
            match self.job_sink.recv_timeout(IDLE_POLL) {
                Ok(job) => self.run_job(job),
                Err(RecvTimeoutError::Timeout) if self.running.load(Ordering::Relaxed) => (),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        log::debug!("worker {} stopped", self.id);
        Ok(())
    }

    /// Uses the conditional variable to notify the starting thread that one more worker is up.
    fn notify_about_start(started: Arc<(Mutex<usize>, Condvar)>) -> anyhow::Result<()> {
        let (lock, cvar) = &*started;
        let mut count = lock
            .lock()
            .map_err(|_| anyhow!("unexpected poisoned lock on start-up of worker pool"))?;
        *count += 1;
        cvar.notify_all();
        Ok(())
    }

    fn run_job(&self, job: Job) {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            log::error!("job panicked on worker {}", self.id);
        }
    }
}
