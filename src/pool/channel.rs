//! Coordination state shared between the manager, its workers and the dispatcher.

use crate::output::Delivery;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Sending half of the result channel, one clone per worker.
pub type ResultSender<I, V> = Sender<Delivery<I, V>>;
/// Receiving half of the result channel, owned by the dispatcher.
pub type ResultReceiver<I, V> = Receiver<Delivery<I, V>>;

/// Create the result channel (unbounded when `capacity` is None).
pub fn create_channel<I, V>(capacity: Option<usize>) -> (ResultSender<I, V>, ResultReceiver<I, V>) {
    match capacity {
        Some(cap) => bounded(cap),
        None => unbounded(),
    }
}

/// Countdown of trials left in a bounded run.
///
/// The counter only ever moves through [`try_reserve`](RunBudget::try_reserve),
/// which checks and decrements under one lock, so concurrent workers can never
/// reserve more units than the budget was created with.
#[derive(Debug)]
pub struct RunBudget {
    remaining: Mutex<u64>,
    exhausted: Condvar,
}

impl RunBudget {
    pub fn new(runs: u64) -> Self {
        Self {
            remaining: Mutex::new(runs),
            exhausted: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve one trial. Returns false once the budget is spent.
    pub fn try_reserve(&self) -> bool {
        let mut remaining = self.lock();
        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.exhausted.notify_all();
        }
        true
    }

    /// Trials not yet reserved.
    pub fn remaining(&self) -> u64 {
        *self.lock()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Block until the budget is spent or `timeout` elapses.
    ///
    /// Returns true if the budget is exhausted.
    pub fn wait_exhausted(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .exhausted
            .wait_timeout_while(guard, timeout, |remaining| *remaining > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == 0
    }
}

/// Cooperative cancellation flags for one run.
#[derive(Debug, Clone)]
pub struct RunFlags {
    /// Workers keep looping while set.
    pub running: Arc<AtomicBool>,
    /// The dispatcher keeps waiting for results while set.
    pub dispatching: Arc<AtomicBool>,
}

impl Default for RunFlags {
    fn default() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            dispatching: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl RunFlags {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching.load(Ordering::SeqCst)
    }

    /// Tell workers to exit after their current trial.
    pub fn stop_running(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Tell the dispatcher to drain and exit.
    pub fn stop_dispatching(&self) {
        self.dispatching.store(false, Ordering::SeqCst);
    }
}
