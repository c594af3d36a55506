//! Simulation worker: reserves budget, runs trials, batches and sends results.

use crate::error::PoolError;
use crate::output::{Delivery, ResultBatch};
use crate::pool::channel::{ResultSender, RunBudget};
use crate::pool::stats::WorkerReport;
use crate::simulation::{Simulation, SimulationFactory, ValueOf};
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Running sums of trial and send durations for one worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerTiming {
    simulation_total: Duration,
    simulation_count: u64,
    transmission_total: Duration,
    transmission_count: u64,
}

/// `total / count` in nanoseconds, zero when nothing was recorded.
fn mean(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

impl WorkerTiming {
    pub fn record_simulation(&mut self, elapsed: Duration) {
        self.simulation_total = self.simulation_total.saturating_add(elapsed);
        self.simulation_count += 1;
    }

    pub fn record_transmission(&mut self, elapsed: Duration) {
        self.transmission_total = self.transmission_total.saturating_add(elapsed);
        self.transmission_count += 1;
    }

    /// Mean trial duration (zero before the first trial).
    pub fn average_simulation_time(&self) -> Duration {
        mean(self.simulation_total, self.simulation_count)
    }

    /// Mean send duration (zero before the first send).
    pub fn average_transmission_time(&self) -> Duration {
        mean(self.transmission_total, self.transmission_count)
    }
}

/// Batch size for the next flush.
///
/// `(avg_send / avg_simulation) * sqrt(produced)`, clamped to `1..=produced`.
/// Expensive sends relative to trials give bigger batches; the square root
/// keeps early batches small while the ratio estimate is still noisy.
pub fn adaptive_batch_size(avg_send: Duration, avg_simulation: Duration, produced: u64) -> usize {
    if produced == 0 {
        return 1;
    }
    let upper = usize::try_from(produced).unwrap_or(usize::MAX);

    let sim = avg_simulation.as_secs_f64();
    let ratio = if sim > 0.0 {
        avg_send.as_secs_f64() / sim
    } else if avg_send.is_zero() {
        0.0
    } else {
        f64::INFINITY
    };

    // Float to int casts saturate, so an infinite ratio lands on the upper bound.
    let raw = ratio * (produced as f64).sqrt();
    (raw as usize).clamp(1, upper)
}

/// One worker of the pool.
///
/// Loops until the running flag clears or the budget is spent. Cancellation is
/// cooperative: the current trial and the current send always complete.
pub struct SimulationProcess<I, F: SimulationFactory<I>> {
    worker_id: usize,
    input: I,
    sender: ResultSender<I, ValueOf<I, F>>,
    factory: Arc<F>,
    running: Arc<AtomicBool>,
    budget: Option<Arc<RunBudget>>,
    batching: bool,
    buffer: Vec<ValueOf<I, F>>,
    batch_size: usize,
    timing: WorkerTiming,
    report: WorkerReport,
}

impl<I, F> SimulationProcess<I, F>
where
    I: Clone,
    F: SimulationFactory<I>,
{
    pub fn new(
        worker_id: usize,
        input: I,
        sender: ResultSender<I, ValueOf<I, F>>,
        factory: Arc<F>,
        running: Arc<AtomicBool>,
        budget: Option<Arc<RunBudget>>,
        batching: bool,
    ) -> Self {
        Self {
            worker_id,
            input,
            sender,
            factory,
            running,
            budget,
            batching,
            buffer: Vec::new(),
            batch_size: 1,
            timing: WorkerTiming::default(),
            report: WorkerReport {
                worker_id,
                final_batch_size: 1,
                ..Default::default()
            },
        }
    }

    pub fn average_simulation_time(&self) -> Duration {
        self.timing.average_simulation_time()
    }

    pub fn average_transmission_time(&self) -> Duration {
        self.timing.average_transmission_time()
    }

    /// Current adaptive batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Results produced so far.
    pub fn produced(&self) -> u64 {
        self.report.results
    }

    /// Run the worker loop to completion.
    pub fn run(mut self) -> Result<WorkerReport, PoolError> {
        log::debug!("worker {} started", self.worker_id);

        while self.running.load(Ordering::SeqCst) {
            if let Some(budget) = &self.budget {
                if !budget.try_reserve() {
                    break;
                }
            }
            self.step()?;
        }

        // Leftover buffered results still belong to this run
        self.flush()?;

        let report = self.report();
        log::debug!(
            "worker {} finished: {} trials, {} failures, {} deliveries",
            report.worker_id,
            report.simulations,
            report.failures,
            report.deliveries
        );
        Ok(report)
    }

    /// Snapshot of this worker's statistics.
    pub fn report(&self) -> WorkerReport {
        WorkerReport {
            final_batch_size: self.batch_size,
            average_simulation_time: self.average_simulation_time(),
            average_transmission_time: self.average_transmission_time(),
            ..self.report.clone()
        }
    }

    /// Execute one trial and hand its result to the batching policy.
    fn step(&mut self) -> Result<(), PoolError> {
        let mut simulation = self.factory.create(&self.input);

        let started = Instant::now();
        let outcome = simulation.start();
        self.timing.record_simulation(started.elapsed());
        self.report.simulations += 1;

        match outcome {
            Ok(value) => {
                self.report.results += 1;
                if self.batching {
                    self.buffer.push(value);
                    if self.buffer.len() >= self.batch_size {
                        self.flush()?;
                        self.batch_size = adaptive_batch_size(
                            self.average_transmission_time(),
                            self.average_simulation_time(),
                            self.report.results,
                        );
                    }
                    Ok(())
                } else {
                    self.send(Delivery::Single {
                        input: self.input.clone(),
                        value,
                    })
                }
            }
            Err(err) => {
                self.report.failures += 1;
                log::warn!("worker {}: skipping failed trial: {}", self.worker_id, err);
                Ok(())
            }
        }
    }

    /// Send whatever is buffered. A lone result goes out raw, never as a batch of one.
    fn flush(&mut self) -> Result<(), PoolError> {
        let mut results = mem::take(&mut self.buffer);
        if results.is_empty() {
            return Ok(());
        }
        let delivery = if results.len() == 1 {
            Delivery::Single {
                input: self.input.clone(),
                value: results.remove(0),
            }
        } else {
            Delivery::Batch(ResultBatch::new(self.input.clone(), results))
        };
        self.send(delivery)
    }

    fn send(&mut self, delivery: Delivery<I, ValueOf<I, F>>) -> Result<(), PoolError> {
        let count = delivery.result_count();

        let started = Instant::now();
        self.sender
            .send(delivery)
            .map_err(|_| PoolError::ChannelClosed {
                worker_id: self.worker_id,
            })?;
        self.timing.record_transmission(started.elapsed());

        self.report.deliveries += 1;
        if count > 1 {
            self.report.batches += 1;
        }
        self.report.largest_delivery = self.report.largest_delivery.max(count);
        Ok(())
    }
}
