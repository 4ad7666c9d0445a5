//! # SAVANNA
//!
//! Discrete-time predator-prey simulator on a toroidal grid.
//!
//! ## Features
//!
//! - **Toroidal space**: multi-occupancy grid with Moore and von Neumann queries
//! - **Fair scheduling**: breed-ordered, shuffled activation, each agent at most once per tick
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: seeded random number generation, resumable checkpoints
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use savanna::{Breed, Config, World};
//!
//! // Create world with default config
//! let mut world = World::initialize(Config::default(), 42).unwrap();
//!
//! // Run simulation
//! world.run(200).unwrap();
//!
//! // Check results
//! println!("Prey: {}", world.breed_count(Breed::Prey));
//! println!("Predators: {}", world.breed_count(Breed::Predator));
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use savanna::Config;
//!
//! let mut config = Config::default();
//! config.world.width = 50;
//! config.predator.reproduction_probability = 0.1;
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Checkpoints
//!
//! ```rust,no_run
//! use savanna::{Config, World};
//! use savanna::checkpoint::Checkpoint;
//!
//! let mut world = World::initialize(Config::default(), 7).unwrap();
//! world.run(100).unwrap();
//!
//! // Save checkpoint
//! world.create_checkpoint().save("checkpoint.bin").unwrap();
//!
//! // Load checkpoint
//! let loaded = Checkpoint::load("checkpoint.bin").unwrap();
//! let restored = World::from_checkpoint(loaded).unwrap();
//! ```

pub mod agent;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod grid;
pub mod lifecycle;
pub mod metrics;
pub mod registry;
pub mod rng;
pub mod scheduler;
pub mod stats;
pub mod view;
pub mod world;

// Re-export main types
pub use agent::{AgentId, AgentSummary, Breed, Position};
pub use config::Config;
pub use error::{ConfigError, GridError, SimError, SimResult};
pub use grid::Neighborhood;
pub use metrics::MetricsSink;
pub use stats::TickRecord;
pub use world::World;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark on a square world of side `size`
pub fn benchmark(steps: u64, size: usize, seed: u64) -> SimResult<BenchmarkResult> {
    use std::time::Instant;

    let mut config = Config::default();
    config.world.width = size;
    config.world.height = size;
    // Keep the default density of the 20x20 world
    let scale = (size * size) as f64 / 400.0;
    config.prey.initial_count = ((config.prey.initial_count as f64) * scale).ceil() as usize;
    config.predator.initial_count = ((config.predator.initial_count as f64) * scale).ceil() as usize;

    let mut world = World::initialize(config, seed)?;
    let initial_population = world.population();

    let start = Instant::now();
    world.run(steps)?;
    let elapsed = start.elapsed();

    Ok(BenchmarkResult {
        steps,
        size,
        initial_population,
        final_population: world.population(),
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: steps as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub size: usize,
    pub initial_population: usize,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(f, "Grid: {0}x{0}", self.size)?;
        writeln!(f, "Animals: {} -> {}", self.initial_population, self.final_population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        Ok(())
    }
}
