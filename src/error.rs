//! Error types for the simulation pool and for user trials

use std::io;
use thiserror::Error;

/// Errors surfaced by the manager and its worker threads.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("run count must be positive, got {0}")]
    InvalidRuns(u64),
    #[error("a run is already active on this manager")]
    AlreadyRunning,
    #[error("no run is active on this manager")]
    NotRunning,
    #[error("result channel closed while worker {worker_id} was sending")]
    ChannelClosed { worker_id: usize },
    #[error("worker {worker_id} panicked")]
    WorkerPanicked { worker_id: usize },
    #[error("result dispatcher panicked")]
    DispatcherPanicked,
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Error returned by a single trial.
///
/// A failed trial is skipped and counted by its worker; it never stops the pool.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("trial failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl SimulationError {
    pub fn failed(message: impl Into<String>) -> Self {
        SimulationError::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PoolError::InvalidRuns(0).to_string(),
            "run count must be positive, got 0"
        );
        assert_eq!(
            PoolError::WorkerPanicked { worker_id: 3 }.to_string(),
            "worker 3 panicked"
        );
        assert_eq!(
            SimulationError::failed("diverged").to_string(),
            "trial failed: diverged"
        );
    }

    #[test]
    fn test_boxed_error_is_transparent() {
        let inner: Box<dyn std::error::Error + Send + Sync> = "bad seed".into();
        let err = SimulationError::from(inner);
        assert_eq!(err.to_string(), "bad seed");
    }
}
