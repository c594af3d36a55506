//! Trials and the factories that build them
//!
//! A trial is one execution of user-supplied stochastic logic over a fixed
//! input. Workers never see concrete trial types: they ask a
//! [`SimulationFactory`] for a fresh [`Simulation`] per trial and call
//! [`Simulation::start`] on it.

use crate::error::SimulationError;
use std::marker::PhantomData;
use std::sync::Arc;

/// A single trial over a fixed input
pub trait Simulation {
    /// Value produced by one trial
    type Value;

    /// Perform the trial
    ///
    /// This is the only method trial logic has to provide.
    fn run(&mut self) -> Result<Self::Value, SimulationError>;

    /// Invocation point used by workers
    ///
    /// Calls [`run`](Simulation::run). Wrappers (timing, tracing) can override
    /// this without touching the trial logic itself.
    fn start(&mut self) -> Result<Self::Value, SimulationError> {
        self.run()
    }
}

/// Builds one [`Simulation`] per trial from the shared input
pub trait SimulationFactory<I>: Send + Sync {
    type Sim: Simulation;

    /// Create a fresh trial for `input`
    fn create(&self, input: &I) -> Self::Sim;
}

impl<I, S, F> SimulationFactory<I> for F
where
    F: Fn(&I) -> S + Send + Sync,
    S: Simulation,
{
    type Sim = S;

    fn create(&self, input: &I) -> S {
        self(input)
    }
}

/// Value produced by trials built from factory `F` over input `I`
pub type ValueOf<I, F> = <<F as SimulationFactory<I>>::Sim as Simulation>::Value;

/// Trial backed by a plain function of the input
pub struct FnSimulation<I, F> {
    input: I,
    trial: Arc<F>,
}

impl<I, V, F> Simulation for FnSimulation<I, F>
where
    F: Fn(&I) -> Result<V, SimulationError>,
{
    type Value = V;

    fn run(&mut self) -> Result<V, SimulationError> {
        (self.trial)(&self.input)
    }
}

impl<I, F> FnSimulation<I, F> {
    pub fn input(&self) -> &I {
        &self.input
    }
}

/// Factory returned by [`from_fn`]
pub struct FnFactory<I, F> {
    trial: Arc<F>,
    _input: PhantomData<fn(&I)>,
}

impl<I, V, F> SimulationFactory<I> for FnFactory<I, F>
where
    I: Clone,
    F: Fn(&I) -> Result<V, SimulationError> + Send + Sync,
{
    type Sim = FnSimulation<I, F>;

    fn create(&self, input: &I) -> Self::Sim {
        FnSimulation {
            input: input.clone(),
            trial: Arc::clone(&self.trial),
        }
    }
}

/// Build a factory from trial logic written as a closure over the input
///
/// ```ignore
/// let factory = from_fn(|start: &i64| Ok::<_, SimulationError>(*start * 2));
/// ```
pub fn from_fn<I, V, F>(trial: F) -> FnFactory<I, F>
where
    F: Fn(&I) -> Result<V, SimulationError> + Send + Sync,
{
    FnFactory {
        trial: Arc::new(trial),
        _input: PhantomData,
    }
}
