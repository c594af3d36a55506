//! Result envelopes and the aggregator contract
//!
//! Workers send [`Delivery`] values over the result channel. The dispatcher
//! forwards them untouched to an [`Output`], which owns the unwrapping of
//! batches. Batching is a transport optimization only: a batch of `k` results
//! must fold into the same state as `k` single deliveries.

pub mod keyed;

pub use keyed::{CollectOutput, KeyedResults, MeanOutput};

/// Ordered results produced by one worker in one buffering window
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBatch<I, V> {
    /// Input that produced every result in the batch
    pub input: I,
    /// Results in production order
    pub results: Vec<V>,
}

impl<I, V> ResultBatch<I, V> {
    pub fn new(input: I, results: Vec<V>) -> Self {
        Self { input, results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// One message on the result channel
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<I, V> {
    /// A single raw result
    Single { input: I, value: V },
    /// Several results from the same worker and input
    Batch(ResultBatch<I, V>),
}

impl<I, V> Delivery<I, V> {
    /// Input tag shared by every result in this delivery
    pub fn input(&self) -> &I {
        match self {
            Delivery::Single { input, .. } => input,
            Delivery::Batch(batch) => &batch.input,
        }
    }

    /// Number of results carried
    pub fn result_count(&self) -> usize {
        match self {
            Delivery::Single { .. } => 1,
            Delivery::Batch(batch) => batch.len(),
        }
    }

    /// Split into the input tag and its results, in production order
    pub fn into_parts(self) -> (I, Vec<V>) {
        match self {
            Delivery::Single { input, value } => (input, vec![value]),
            Delivery::Batch(batch) => (batch.input, batch.results),
        }
    }
}

impl<I, V> From<ResultBatch<I, V>> for Delivery<I, V> {
    fn from(batch: ResultBatch<I, V>) -> Self {
        Delivery::Batch(batch)
    }
}

/// Aggregator fed by the result dispatcher
///
/// Implementations are supplied by the caller and outlive the manager.
pub trait Output<I, V> {
    /// Summary returned by [`aggregate`](Output::aggregate)
    type Aggregate;

    /// Fold a delivery into the accumulated state
    fn update(&mut self, delivery: Delivery<I, V>);

    /// Accumulated view for the currently selected input
    ///
    /// Returns `None` when nothing has been recorded for that input.
    fn aggregate(&self) -> Option<Self::Aggregate>;

    /// Pin the input that [`aggregate`](Output::aggregate) reads
    ///
    /// Without a pin the most recently updated input is selected. The default
    /// ignores the pin, which is fine for aggregators that are not keyed.
    fn set_input(&mut self, _input: I) {}
}
