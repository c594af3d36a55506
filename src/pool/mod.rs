//! Parallel execution of trials with a shared run budget.
//!
//! # Architecture
//!
//! The pool consists of:
//! - A **manager** that owns each run's coordination state and its threads
//! - Multiple **workers** that run trials and send results, batching them
//!   adaptively when sending is costly compared to a trial
//! - A **dispatcher** thread that drains the result channel into the output
//! - **Shared state**: a run budget reserved one trial at a time, and the
//!   `running`/`dispatching` flags used for cooperative shutdown
//!
//! Shutdown is strictly ordered: clear `running`, join every worker, then
//! clear `dispatching` and join the dispatcher after it has drained the
//! channel. No result produced by a worker is lost.
//!
//! # Example
//!
//! ```ignore
//! use simrunner::output::MeanOutput;
//! use simrunner::pool::{ManagerConfig, SimulationManager};
//! use simrunner::simulation::from_fn;
//!
//! let output = Arc::new(Mutex::new(MeanOutput::new()));
//! let trial = from_fn(|start: &i32| Ok(random_walk(*start)));
//! let config = ManagerConfig::default().with_workers(4);
//!
//! let mut manager = SimulationManager::with_config(30, trial, Arc::clone(&output), config);
//! let summary = manager.run(1000)?;
//! println!("{}", summary);
//! ```

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod manager;
pub mod stats;
pub mod worker;

pub use channel::{RunBudget, RunFlags};
pub use config::ManagerConfig;
pub use dispatcher::ResultDispatcher;
pub use manager::SimulationManager;
pub use stats::{DispatchReport, RunSummary, WorkerReport};
pub use worker::{SimulationProcess, WorkerTiming, adaptive_batch_size};
