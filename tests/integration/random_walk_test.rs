use crate::init_logging;
use rand::Rng;
use simrunner::output::MeanOutput;
use simrunner::{ManagerConfig, Output, Simulation, SimulationError, SimulationManager};
use std::sync::{Arc, Mutex};

/// Symmetric walk absorbed at 0 and 100; returns 1 when it reaches 100
struct RandomWalk {
    position: i32,
}

impl Simulation for RandomWalk {
    type Value = u8;

    fn run(&mut self) -> Result<u8, SimulationError> {
        let mut rng = rand::rng();
        loop {
            match self.position {
                p if p <= 0 => return Ok(0),
                p if p >= 100 => return Ok(1),
                _ => self.position += if rng.random_bool(0.5) { 1 } else { -1 },
            }
        }
    }
}

fn walk_from(start: &i32) -> RandomWalk {
    RandomWalk { position: *start }
}

#[test]
fn test_random_walk_mean_approaches_start_over_hundred() {
    init_logging();
    let output = Arc::new(Mutex::new(MeanOutput::<i32, u8>::new()));
    let mut manager = SimulationManager::new(30i32, walk_from, Arc::clone(&output));

    let summary = manager.run(1000).unwrap();

    let output = output.lock().unwrap();
    assert_eq!(output.results.len_for(&30), 1000);
    let mean = output.aggregate().unwrap();
    assert!((mean - 0.3).abs() < 0.05, "mean {} too far from 0.3", mean);
    assert_eq!(summary.total_simulations(), 1000);
}

#[test]
fn test_boundary_starts_are_deterministic() {
    init_logging();
    let output = Arc::new(Mutex::new(MeanOutput::<i32, u8>::new()));
    let config = ManagerConfig::default().with_workers(2);

    let mut manager = SimulationManager::with_config(0i32, walk_from, Arc::clone(&output), config.clone());
    manager.run(50).unwrap();
    assert_eq!(output.lock().unwrap().aggregate(), Some(0.0));

    let mut manager = SimulationManager::with_config(100i32, walk_from, Arc::clone(&output), config);
    manager.run(50).unwrap();

    let mut output = output.lock().unwrap();
    assert_eq!(output.aggregate(), Some(1.0));
    output.set_input(0);
    assert_eq!(output.aggregate(), Some(0.0));
}
