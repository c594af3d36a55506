//! Result dispatcher: drains the result channel into the output.

use crate::output::{Delivery, Output};
use crate::pool::channel::ResultReceiver;
use crate::pool::stats::DispatchReport;
use crossbeam_channel::RecvTimeoutError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Single consumer of the result channel.
///
/// Forwards every [`Delivery`] unchanged to [`Output::update`]; unwrapping
/// batches is the output's job.
pub struct ResultDispatcher<I, V, O> {
    receiver: ResultReceiver<I, V>,
    output: Arc<Mutex<O>>,
    dispatching: Arc<AtomicBool>,
    poll_interval: Duration,
    report: DispatchReport,
}

impl<I, V, O> ResultDispatcher<I, V, O>
where
    O: Output<I, V>,
{
    pub fn new(
        receiver: ResultReceiver<I, V>,
        output: Arc<Mutex<O>>,
        dispatching: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            receiver,
            output,
            dispatching,
            poll_interval,
            report: DispatchReport::default(),
        }
    }

    /// Forward results until the dispatching flag clears, then drain and exit.
    ///
    /// Waits with a blocking receive bounded by the poll interval, so an idle
    /// channel costs no CPU and a cleared flag is noticed within one interval.
    /// Consumes the dispatcher, closing the receiving end of the channel.
    pub fn run(mut self) -> DispatchReport {
        log::debug!("result dispatcher started");

        while self.dispatching.load(Ordering::SeqCst) {
            match self.receiver.recv_timeout(self.poll_interval) {
                Ok(delivery) => self.forward(delivery),
                Err(RecvTimeoutError::Timeout) => continue,
                // Every worker is gone and the queue is empty
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        while let Ok(delivery) = self.receiver.try_recv() {
            self.forward(delivery);
        }

        log::debug!(
            "result dispatcher finished: {} results in {} deliveries",
            self.report.results,
            self.report.deliveries
        );
        self.report
    }

    fn forward(&mut self, delivery: Delivery<I, V>) {
        self.report.deliveries += 1;
        self.report.results += delivery.result_count() as u64;

        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        output.update(delivery);
    }
}
