use crate::init_logging;
use crossbeam_channel::{Sender, bounded};
use simrunner::output::{CollectOutput, MeanOutput};
use simrunner::{
    Delivery, ManagerConfig, Output, PoolError, ResultBatch, SimulationError, SimulationManager,
    from_fn,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Counts results and signals once a threshold is crossed
struct CountingOutput {
    count: usize,
    threshold: usize,
    signal: Option<Sender<()>>,
}

impl Output<u32, u32> for CountingOutput {
    type Aggregate = usize;

    fn update(&mut self, delivery: Delivery<u32, u32>) {
        self.count += delivery.result_count();
        if self.count >= self.threshold {
            if let Some(signal) = self.signal.take() {
                let _ = signal.send(());
            }
        }
    }

    fn aggregate(&self) -> Option<usize> {
        Some(self.count)
    }
}

fn constant(value: u32) -> impl Fn(&u32) -> Result<u32, SimulationError> + Send + Sync {
    move |_| Ok(value)
}

#[test]
fn test_unbounded_run_stops_on_external_condition() {
    init_logging();
    let (tx, rx) = bounded(1);
    let output = Arc::new(Mutex::new(CountingOutput {
        count: 0,
        threshold: 10_000,
        signal: Some(tx),
    }));
    let mut manager = SimulationManager::new(1u32, from_fn(constant(7)), Arc::clone(&output));

    manager.start(None).unwrap();
    rx.recv_timeout(Duration::from_secs(30))
        .expect("threshold never reached");

    let stopping = Instant::now();
    let summary = manager.stop().unwrap();
    assert!(stopping.elapsed() < Duration::from_secs(5));

    assert!(!manager.is_running());
    // The dispatcher thread released its handle on the output when it exited
    assert_eq!(Arc::strong_count(&output), 2);
    let count = output.lock().unwrap().count;
    assert!(count >= 10_000);
    assert_eq!(count as u64, summary.dispatch.results);
    assert_eq!(count as u64, summary.total_results());
}

#[test]
fn test_batch_sizes_stay_within_produced_results() {
    init_logging();
    let output = Arc::new(Mutex::new(CollectOutput::<u32, u32>::new()));
    let config = ManagerConfig::default().with_workers(4);
    let mut manager =
        SimulationManager::with_config(2u32, from_fn(constant(1)), Arc::clone(&output), config);

    let summary = manager.run(20_000).unwrap();

    assert_eq!(summary.workers.len(), 4);
    for worker in &summary.workers {
        assert!(worker.final_batch_size >= 1);
        if worker.results > 0 {
            assert!(worker.final_batch_size as u64 <= worker.results);
            assert!(worker.largest_delivery as u64 <= worker.results);
        }
    }
    assert_eq!(output.lock().unwrap().results.total(), 20_000);
}

/// Drains slowly and keeps each delivery's values
struct SlowOutput {
    delay: Duration,
    deliveries: Vec<Vec<u64>>,
}

impl Output<u32, u64> for SlowOutput {
    type Aggregate = usize;

    fn update(&mut self, delivery: Delivery<u32, u64>) {
        thread::sleep(self.delay);
        let (_, values) = delivery.into_parts();
        self.deliveries.push(values);
    }

    fn aggregate(&self) -> Option<usize> {
        Some(self.deliveries.iter().map(Vec::len).sum())
    }
}

#[test]
fn test_every_flush_bounded_by_results_produced_so_far() {
    init_logging();
    let output = Arc::new(Mutex::new(SlowOutput {
        delay: Duration::from_micros(200),
        deliveries: Vec::new(),
    }));
    // Trial k returns k, so a delivery ending in k was flushed after k + 1 results
    let counter = Arc::new(AtomicU64::new(0));
    let factory = from_fn(move |_: &u32| -> Result<u64, SimulationError> {
        Ok(counter.fetch_add(1, Ordering::SeqCst))
    });
    let config = ManagerConfig::default()
        .with_workers(1)
        .with_channel_capacity(1);
    let mut manager = SimulationManager::with_config(5u32, factory, Arc::clone(&output), config);

    manager.run(3_000).unwrap();

    let output = output.lock().unwrap();
    let mut expected = 0u64;
    for values in &output.deliveries {
        let last = *values.last().unwrap();
        assert!(values.len() as u64 <= last + 1);
        assert_eq!(values, &(expected..=last).collect::<Vec<_>>());
        expected = last + 1;
    }
    assert_eq!(expected, 3_000);
    // A slow consumer makes sends dominate, so batching must have kicked in
    assert!(output.deliveries.iter().any(|values| values.len() > 1));
}

#[test]
fn test_bounded_channel_delivers_everything() {
    init_logging();
    let output = Arc::new(Mutex::new(CollectOutput::<u32, u32>::new()));
    let config = ManagerConfig::default()
        .with_workers(4)
        .with_channel_capacity(2);
    let mut manager =
        SimulationManager::with_config(3u32, from_fn(constant(3)), Arc::clone(&output), config);

    manager.run(5_000).unwrap();

    assert_eq!(output.lock().unwrap().results.len_for(&3), 5_000);
}

#[test]
fn test_batching_is_not_observable() {
    let values = [4.0, 8.0, 15.0, 16.0, 23.0, 42.0];

    let mut batched = MeanOutput::<u32, f64>::new();
    batched.update(ResultBatch::new(1u32, values.to_vec()).into());

    let mut single = MeanOutput::<u32, f64>::new();
    for value in values {
        single.update(Delivery::Single { input: 1u32, value });
    }

    assert_eq!(batched.aggregate(), single.aggregate());
    assert_eq!(batched.results.results_for(&1), single.results.results_for(&1));
}

#[test]
fn test_input_keyed_aggregation() {
    let mut output = MeanOutput::<u32, f64>::new();
    output.update(ResultBatch::new(10u32, vec![1.0, 3.0]).into());
    output.update(ResultBatch::new(12u32, vec![7.0]).into());
    assert_eq!(output.aggregate(), Some(7.0));

    output.set_input(10);
    assert_eq!(output.aggregate(), Some(2.0));
}

#[test]
fn test_start_after_stop_uses_fresh_state() {
    init_logging();
    let output = Arc::new(Mutex::new(CollectOutput::<u32, u32>::new()));
    let config = ManagerConfig::default().with_workers(2);
    let mut manager =
        SimulationManager::with_config(5u32, from_fn(constant(5)), Arc::clone(&output), config);

    manager.start(None).unwrap();
    assert!(matches!(manager.start(Some(3)), Err(PoolError::AlreadyRunning)));
    manager.stop().unwrap();
    let after_unbounded = output.lock().unwrap().results.total();

    let summary = manager.run(3).unwrap();
    assert_eq!(summary.total_simulations(), 3);
    assert_eq!(output.lock().unwrap().results.total(), after_unbounded + 3);
}
