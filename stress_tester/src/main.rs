use std::sync::Arc;

use async_impl::TokioDispatch;
use clap::Parser;
use linked_pq::{Dispatch, SpawnPerJob};
use tokio::runtime::Runtime;
use worker_pool::ThreadPool;

use cfg::{Cfg, PoolKind, Scenario};

pub mod cfg;
mod demo;
mod logging;
mod stress;

fn main() {
    let cfg = Cfg::parse();
    let _logger = match logging::init(&cfg.log_level) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Warn! Running without logs: {e:?}");
            None
        }
    };
    println!("Running configuration:\n{cfg:#?}");

    let res = Pool::start(&cfg).and_then(|pool| match cfg.scenario {
        Scenario::Demo => demo::run(pool.dispatcher()),
        Scenario::Stress => stress::run(&cfg, pool.dispatcher()),
    });
    if let Err(e) = res {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

/// The pool selected on the command line, together with whatever has to outlive it.
struct Pool {
    dispatcher: Arc<dyn Dispatch>,
    // Dropped after every queue that dispatches onto it.
    _runtime: Option<Runtime>,
}

impl Pool {
    fn start(cfg: &Cfg) -> anyhow::Result<Self> {
        let pool = match cfg.pool {
            PoolKind::Threads => {
                let pool = ThreadPool::start(worker_pool::Cfg {
                    workers: cfg.workers,
                    backlog: None,
                })?;
                Self {
                    dispatcher: Arc::new(pool),
                    _runtime: None,
                }
            }
            PoolKind::Tokio => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()?;
                Self {
                    dispatcher: Arc::new(TokioDispatch::new(runtime.handle().clone())),
                    _runtime: Some(runtime),
                }
            }
            PoolKind::Spawn => Self {
                dispatcher: Arc::new(SpawnPerJob),
                _runtime: None,
            },
        };
        log::info!("dispatching queue jobs to the {:?} pool", cfg.pool);
        Ok(pool)
    }

    fn dispatcher(&self) -> Arc<dyn Dispatch> {
        Arc::clone(&self.dispatcher)
    }
}
