//! Per-worker, dispatcher and per-run statistics

use std::time::Duration;

/// What one worker did during a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Trials executed, failed ones included
    pub simulations: u64,
    /// Trials that produced a result
    pub results: u64,
    /// Trials that returned an error and were skipped
    pub failures: u64,
    /// Messages put on the result channel
    pub deliveries: u64,
    /// Deliveries that carried more than one result
    pub batches: u64,
    /// Largest number of results in a single delivery
    pub largest_delivery: usize,
    /// Adaptive batch size when the worker exited
    pub final_batch_size: usize,
    pub average_simulation_time: Duration,
    pub average_transmission_time: Duration,
}

impl WorkerReport {
    /// Fraction of executed trials that failed (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.simulations == 0 {
            0.0
        } else {
            self.failures as f64 / self.simulations as f64
        }
    }

    /// Mean number of results per delivery
    pub fn results_per_delivery(&self) -> f64 {
        if self.deliveries == 0 {
            0.0
        } else {
            self.results as f64 / self.deliveries as f64
        }
    }
}

/// What the dispatcher forwarded to the output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub deliveries: u64,
    pub results: u64,
}

/// Summary of a completed run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub elapsed_time: Duration,
    /// Reports from workers that exited cleanly
    pub workers: Vec<WorkerReport>,
    pub dispatch: DispatchReport,
}

impl RunSummary {
    pub fn total_simulations(&self) -> u64 {
        self.workers.iter().map(|w| w.simulations).sum()
    }

    pub fn total_results(&self) -> u64 {
        self.workers.iter().map(|w| w.results).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.workers.iter().map(|w| w.failures).sum()
    }

    pub fn total_deliveries(&self) -> u64 {
        self.workers.iter().map(|w| w.deliveries).sum()
    }

    /// Trials executed per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.total_simulations() as f64 / secs
        }
    }

    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Time: {:.2?}\n", self.elapsed_time));
        s.push_str(&format!("Workers: {}\n", self.workers.len()));
        s.push_str(&format!("Trials executed: {}\n", self.total_simulations()));
        s.push_str(&format!("Throughput: {:.0} trials/sec\n", self.throughput()));

        let failures = self.total_failures();
        if failures > 0 {
            s.push_str(&format!("Failed trials: {}\n", failures));
        }

        s.push_str(&format!(
            "Results dispatched: {} in {} deliveries\n",
            self.dispatch.results, self.dispatch.deliveries
        ));

        for w in &self.workers {
            s.push_str(&format!(
                "  worker {}: {} trials, {} deliveries, batch size {}, sim {:.2?}, send {:.2?}\n",
                w.worker_id,
                w.simulations,
                w.deliveries,
                w.final_batch_size,
                w.average_simulation_time,
                w.average_transmission_time
            ));
        }

        s
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_summary())
    }
}
