//! Input-keyed accumulation and two reference aggregators

use crate::output::{Delivery, Output};
use std::collections::HashMap;
use std::hash::Hash;

/// Raw results grouped by the input that produced them
///
/// Tracks the most recently updated input and an optional pinned input. The
/// pin, while set, decides which key is "selected".
#[derive(Debug, Clone)]
pub struct KeyedResults<I, V> {
    results: HashMap<I, Vec<V>>,
    latest: Option<I>,
    pinned: Option<I>,
}

impl<I, V> Default for KeyedResults<I, V> {
    fn default() -> Self {
        Self {
            results: HashMap::new(),
            latest: None,
            pinned: None,
        }
    }
}

impl<I: Eq + Hash + Clone, V> KeyedResults<I, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a delivery in, one accumulation event per contained result
    pub fn record(&mut self, delivery: Delivery<I, V>) {
        let (input, values) = delivery.into_parts();
        self.results
            .entry(input.clone())
            .or_default()
            .extend(values);
        self.latest = Some(input);
    }

    pub fn pin(&mut self, input: I) {
        self.pinned = Some(input);
    }

    pub fn unpin(&mut self) {
        self.pinned = None;
    }

    /// Pinned input if any, else the most recently updated one
    pub fn selected_key(&self) -> Option<&I> {
        self.pinned.as_ref().or(self.latest.as_ref())
    }

    /// Results for the selected input
    pub fn selected(&self) -> Option<&[V]> {
        self.selected_key().and_then(|key| self.results_for(key))
    }

    pub fn results_for(&self, input: &I) -> Option<&[V]> {
        self.results.get(input).map(Vec::as_slice)
    }

    pub fn len_for(&self, input: &I) -> usize {
        self.results.get(input).map_or(0, Vec::len)
    }

    /// Results recorded across every input
    pub fn total(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &I> {
        self.results.keys()
    }
}

/// Keeps every raw result; aggregates to the selected input's results
#[derive(Debug, Clone)]
pub struct CollectOutput<I, V> {
    pub results: KeyedResults<I, V>,
}

impl<I, V> Default for CollectOutput<I, V> {
    fn default() -> Self {
        Self {
            results: KeyedResults::default(),
        }
    }
}

impl<I: Eq + Hash + Clone, V> CollectOutput<I, V> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I: Eq + Hash + Clone, V: Clone> Output<I, V> for CollectOutput<I, V> {
    type Aggregate = Vec<V>;

    fn update(&mut self, delivery: Delivery<I, V>) {
        self.results.record(delivery);
    }

    fn aggregate(&self) -> Option<Vec<V>> {
        self.results.selected().map(<[V]>::to_vec)
    }

    fn set_input(&mut self, input: I) {
        self.results.pin(input);
    }
}

/// Arithmetic mean of the selected input's results
#[derive(Debug, Clone)]
pub struct MeanOutput<I, V> {
    pub results: KeyedResults<I, V>,
}

impl<I, V> Default for MeanOutput<I, V> {
    fn default() -> Self {
        Self {
            results: KeyedResults::default(),
        }
    }
}

impl<I: Eq + Hash + Clone, V> MeanOutput<I, V> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I, V> Output<I, V> for MeanOutput<I, V>
where
    I: Eq + Hash + Clone,
    V: Copy + Into<f64>,
{
    type Aggregate = f64;

    fn update(&mut self, delivery: Delivery<I, V>) {
        self.results.record(delivery);
    }

    fn aggregate(&self) -> Option<f64> {
        let values = self.results.selected()?;
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().map(|&v| v.into()).sum();
        Some(sum / values.len() as f64)
    }

    fn set_input(&mut self, input: I) {
        self.results.pin(input);
    }
}
