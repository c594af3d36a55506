//! Configuration for the simulation manager.

use std::time::Duration;

/// Configuration for a [`SimulationManager`](crate::pool::SimulationManager).
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Number of worker threads to spawn.
    pub num_workers: usize,
    /// Whether workers buffer results into adaptively sized batches.
    pub batching: bool,
    /// Result channel capacity (None means unbounded, no backpressure).
    pub channel_capacity: Option<usize>,
    /// Bounded wait used by the dispatcher and by bounded-run completion checks.
    pub poll_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            batching: true,
            channel_capacity: None,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl ManagerConfig {
    /// Set the number of workers (at least one).
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    /// Enable or disable result batching.
    pub fn with_batching(mut self, batching: bool) -> Self {
        self.batching = batching;
        self
    }

    /// Bound the result channel so a slow aggregator stalls the workers.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity.max(1));
        self
    }

    /// Set the channel capacity from an Option.
    pub fn with_channel_capacity_option(mut self, capacity: Option<usize>) -> Self {
        self.channel_capacity = capacity.map(|c| c.max(1));
        self
    }

    /// Set the polling interval (at least one millisecond).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }
}
