//! Simulation manager: owns one run's coordination state and its threads.

use crate::error::PoolError;
use crate::output::Output;
use crate::pool::channel::{RunBudget, RunFlags, create_channel};
use crate::pool::config::ManagerConfig;
use crate::pool::dispatcher::ResultDispatcher;
use crate::pool::stats::{DispatchReport, RunSummary, WorkerReport};
use crate::pool::worker::SimulationProcess;
use crate::simulation::{SimulationFactory, ValueOf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Threads and flags of the run in progress
struct ActiveRun {
    flags: RunFlags,
    budget: Option<Arc<RunBudget>>,
    workers: Vec<JoinHandle<Result<WorkerReport, PoolError>>>,
    dispatcher: JoinHandle<DispatchReport>,
    started: Instant,
}

impl ActiveRun {
    /// Stop workers, then the dispatcher, collecting what each reported.
    ///
    /// Always runs to completion. The first failure seen is returned next to
    /// the summary of everything that did finish.
    fn shutdown(self) -> (RunSummary, Option<PoolError>) {
        let mut failure = None;

        self.flags.stop_running();

        let mut workers = Vec::with_capacity(self.workers.len());
        for (worker_id, handle) in self.workers.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(report)) => workers.push(report),
                Ok(Err(err)) => {
                    log::error!("worker {} failed: {}", worker_id, err);
                    failure.get_or_insert(err);
                }
                Err(_) => {
                    log::error!("worker {} panicked", worker_id);
                    failure.get_or_insert(PoolError::WorkerPanicked { worker_id });
                }
            }
        }

        // Only now can no more results arrive; the dispatcher drains the rest
        self.flags.stop_dispatching();
        let dispatch = match self.dispatcher.join() {
            Ok(report) => report,
            Err(_) => {
                log::error!("result dispatcher panicked");
                // Workers only saw the receiver vanish; the crash is the cause
                if matches!(failure, None | Some(PoolError::ChannelClosed { .. })) {
                    failure = Some(PoolError::DispatcherPanicked);
                }
                DispatchReport::default()
            }
        };
        // Senders died with the workers and the receiver with the dispatcher,
        // so the channel is closed at this point.

        let summary = RunSummary {
            elapsed_time: self.started.elapsed(),
            workers,
            dispatch,
        };
        (summary, failure)
    }

    fn all_workers_finished(&self) -> bool {
        self.workers.iter().all(JoinHandle::is_finished)
    }
}

/// Stop and join workers that were already spawned when a launch failed.
fn abort_workers(flags: &RunFlags, workers: Vec<JoinHandle<Result<WorkerReport, PoolError>>>) {
    flags.stop_running();
    for (worker_id, handle) in workers.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => log::error!("worker {} failed during aborted launch: {}", worker_id, err),
            Err(_) => log::error!("worker {} panicked during aborted launch", worker_id),
        }
    }
}

/// Runs trials for one input across a pool of worker threads.
///
/// Each [`start`](SimulationManager::start) builds fresh coordination state
/// (channel, flags, budget), so a manager can be started again after it was
/// stopped.
pub struct SimulationManager<I, F, O> {
    input: I,
    factory: Arc<F>,
    output: Arc<Mutex<O>>,
    config: ManagerConfig,
    active: Option<ActiveRun>,
    last_summary: Option<RunSummary>,
}

impl<I, F, O> SimulationManager<I, F, O> {
    pub fn new(input: I, factory: F, output: Arc<Mutex<O>>) -> Self {
        Self::with_config(input, factory, output, ManagerConfig::default())
    }

    pub fn with_config(input: I, factory: F, output: Arc<Mutex<O>>, config: ManagerConfig) -> Self {
        Self {
            input,
            factory: Arc::new(factory),
            output,
            config,
            active: None,
            last_summary: None,
        }
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn output(&self) -> &Arc<Mutex<O>> {
        &self.output
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Trials left in the active bounded run
    pub fn remaining_runs(&self) -> Option<u64> {
        self.active
            .as_ref()
            .and_then(|run| run.budget.as_ref())
            .map(|budget| budget.remaining())
    }

    /// Summary of the most recently stopped run
    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }

    /// Stop the active run.
    ///
    /// Clears the running flag, joins every worker, then clears the
    /// dispatching flag and joins the dispatcher once it has drained the
    /// channel. A crashed worker is reported as [`PoolError::WorkerPanicked`]
    /// after the teardown completes.
    pub fn stop(&mut self) -> Result<RunSummary, PoolError> {
        let active = self.active.take().ok_or(PoolError::NotRunning)?;
        let (summary, failure) = active.shutdown();

        log::info!(
            "run stopped after {:.2?}: {} trials, {} results dispatched",
            summary.elapsed_time,
            summary.total_simulations(),
            summary.dispatch.results
        );

        self.last_summary = Some(summary.clone());
        match failure {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }
}

impl<I, F, O> SimulationManager<I, F, O>
where
    I: Clone + Send + 'static,
    F: SimulationFactory<I> + 'static,
    ValueOf<I, F>: Send + 'static,
    O: Output<I, ValueOf<I, F>> + Send + 'static,
{
    /// Start a run.
    ///
    /// With `runs` set, exactly that many trials are executed across all
    /// workers; the call blocks until they are done and tears the run down
    /// itself. Without it the pool runs until [`stop`](SimulationManager::stop).
    pub fn start(&mut self, runs: Option<u64>) -> Result<(), PoolError> {
        if self.active.is_some() {
            return Err(PoolError::AlreadyRunning);
        }
        if runs == Some(0) {
            return Err(PoolError::InvalidRuns(0));
        }

        let budget = runs.map(|runs| Arc::new(RunBudget::new(runs)));
        match runs {
            Some(runs) => log::info!(
                "starting {} workers for {} trials",
                self.config.num_workers,
                runs
            ),
            None => log::info!(
                "starting {} workers until stopped",
                self.config.num_workers
            ),
        }

        let active = self.launch(budget.clone())?;
        self.active = Some(active);

        if let Some(budget) = budget {
            self.wait_for_budget(&budget);
            self.stop()?;
        }
        Ok(())
    }

    /// Run exactly `runs` trials and return the summary.
    pub fn run(&mut self, runs: u64) -> Result<RunSummary, PoolError> {
        self.start(Some(runs))?;
        Ok(self.last_summary.clone().unwrap_or_default())
    }

    fn launch(&self, budget: Option<Arc<RunBudget>>) -> Result<ActiveRun, PoolError> {
        let flags = RunFlags::default();
        let (sender, receiver) = create_channel(self.config.channel_capacity);

        let mut workers = Vec::with_capacity(self.config.num_workers);
        for worker_id in 0..self.config.num_workers {
            let worker = SimulationProcess::new(
                worker_id,
                self.input.clone(),
                sender.clone(),
                Arc::clone(&self.factory),
                Arc::clone(&flags.running),
                budget.clone(),
                self.config.batching,
            );
            let spawned = thread::Builder::new()
                .name(format!("sim-worker-{}", worker_id))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    // Unblock workers stuck on a full channel before joining them
                    drop(receiver);
                    abort_workers(&flags, workers);
                    return Err(err.into());
                }
            }
        }
        // Workers hold the only senders, so the channel disconnects once they exit
        drop(sender);

        let dispatcher = ResultDispatcher::new(
            receiver,
            Arc::clone(&self.output),
            Arc::clone(&flags.dispatching),
            self.config.poll_interval,
        );
        let dispatcher = match thread::Builder::new()
            .name("sim-dispatcher".to_string())
            .spawn(move || dispatcher.run())
        {
            Ok(handle) => handle,
            Err(err) => {
                abort_workers(&flags, workers);
                return Err(err.into());
            }
        };

        Ok(ActiveRun {
            flags,
            budget,
            workers,
            dispatcher,
            started: Instant::now(),
        })
    }

    /// Block until every trial is reserved, or until no worker is left to reserve them.
    fn wait_for_budget(&self, budget: &RunBudget) {
        let Some(active) = &self.active else {
            return;
        };
        while !budget.wait_exhausted(self.config.poll_interval) {
            if active.all_workers_finished() {
                log::warn!(
                    "all workers exited with {} trials left",
                    budget.remaining()
                );
                return;
            }
        }
    }
}

impl<I, F, O> Drop for SimulationManager<I, F, O> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            let (_, failure) = active.shutdown();
            if let Some(err) = failure {
                log::error!("run dropped while active: {}", err);
            }
        }
    }
}
