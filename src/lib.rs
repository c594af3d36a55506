//! Parallel Monte Carlo trial runner
//!
//! Runs many independent, identical stochastic trials across CPU cores and
//! streams their results to a single aggregator:
//! - [`simulation`]: the trial contract and factories that build trials
//! - [`pool`]: workers, the result dispatcher and the manager that runs them
//! - [`output`]: result envelopes and the aggregator contract

pub mod error;
pub mod output;
pub mod pool;
pub mod simulation;

pub use error::{PoolError, SimulationError};
pub use output::{Delivery, Output, ResultBatch};
pub use pool::{ManagerConfig, RunSummary, SimulationManager};
pub use simulation::{Simulation, SimulationFactory, from_fn};
