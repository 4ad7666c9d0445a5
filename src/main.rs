//! SAVANNA - CLI Entry Point
//!
//! Predator-prey simulator on a toroidal grid.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use savanna::checkpoint::{Checkpoint, CheckpointManager};
use savanna::metrics::LogSink;
use savanna::rng::random_seed;
use savanna::{benchmark, Breed, Config, World};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Checkpoints kept on disk per run
const MAX_CHECKPOINTS: usize = 10;

#[derive(Parser)]
#[command(name = "savanna")]
#[command(version)]
#[command(about = "Predator-prey simulator on a toroidal grid")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "500")]
        steps: u64,

        /// Output directory for checkpoints and history
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (no periodic stats)
        #[arg(short, long)]
        quiet: bool,

        /// Print the final grid as text and save it as frame.json
        #[arg(long)]
        frame: bool,
    },

    /// Resume simulation from checkpoint
    Resume {
        /// Checkpoint file to resume from
        #[arg(short, long)]
        checkpoint: PathBuf,

        /// Number of additional ticks
        #[arg(short, long, default_value = "500")]
        steps: u64,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of ticks
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Side length of the square world
        #[arg(long, default_value = "100")]
        size: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Analyze a checkpoint file
    Analyze {
        /// Checkpoint file
        checkpoint: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            output,
            seed,
            quiet,
            frame,
        } => run_simulation(&config, steps, &output, seed, quiet, frame),

        Commands::Resume {
            checkpoint,
            steps,
            output,
        } => resume_simulation(&checkpoint, steps, &output),

        Commands::Benchmark { steps, size, seed } => run_benchmark(steps, size, seed),

        Commands::Init { output } => generate_config(&output),

        Commands::Analyze { checkpoint } => analyze_checkpoint(&checkpoint),
    }
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run_simulation(
    config_path: &Path,
    steps: u64,
    output: &Path,
    seed: Option<u64>,
    quiet: bool,
    frame: bool,
) -> Result<()> {
    // Load or create config
    let config = if config_path.exists() {
        Config::from_file(config_path).with_context(|| format!("loading {}", config_path.display()))?
    } else {
        Config::default()
    };
    init_logging(&config.logging.log_level);
    if config_path.exists() {
        log::info!("loaded config from {}", config_path.display());
    } else {
        log::info!("{} not found, using default configuration", config_path.display());
    }

    let seed = seed.unwrap_or_else(random_seed);
    let mut world = World::initialize(config, seed)?;

    println!("Starting simulation");
    println!("  Seed: {}", seed);
    println!("  Grid size: {}x{}", world.width(), world.height());
    println!("  Prey: {}", world.breed_count(Breed::Prey));
    println!("  Predators: {}", world.breed_count(Breed::Predator));
    println!("  Steps: {}", steps);
    println!();

    let start = Instant::now();
    let done = drive(&mut world, steps, output, quiet)?;
    let elapsed = start.elapsed();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Steps: {}", done);
    println!("Speed: {:.1} steps/s", done as f64 / elapsed.as_secs_f64().max(f64::EPSILON));
    print_population(&world);

    save_outputs(&world, output)?;

    if frame {
        let snapshot = world.frame();
        println!();
        println!("{}", snapshot.to_ascii());

        let frame_path = output.join("frame.json");
        std::fs::write(&frame_path, snapshot.to_json()?)
            .with_context(|| format!("writing {}", frame_path.display()))?;
        println!("Frame: {}", frame_path.display());
    }

    Ok(())
}

fn resume_simulation(checkpoint_path: &Path, steps: u64, output: &Path) -> Result<()> {
    let checkpoint =
        Checkpoint::load(checkpoint_path).with_context(|| format!("loading {}", checkpoint_path.display()))?;
    init_logging(&checkpoint.config.logging.log_level);

    let mut world = World::from_checkpoint(checkpoint)?;

    println!("Resumed at step {}", world.time);
    println!("Animals: {}", world.population());
    println!("Running {} additional steps", steps);
    println!();

    let start = Instant::now();
    let done = drive(&mut world, steps, output, false)?;
    let elapsed = start.elapsed();

    println!();
    println!("=== Resume Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Final step: {}", world.time);
    println!("Speed: {:.1} steps/s", done as f64 / elapsed.as_secs_f64().max(f64::EPSILON));
    print_population(&world);

    save_outputs(&world, output)
}

/// Tick until `steps` are done or both animal breeds are gone, saving
/// periodic checkpoints along the way.
fn drive(world: &mut World, steps: u64, output: &Path, quiet: bool) -> Result<u64> {
    let mut checkpoint_mgr =
        CheckpointManager::new(output, world.config.logging.checkpoint_interval, MAX_CHECKPOINTS)?;
    if !quiet {
        world.add_sink(Box::new(LogSink::new(world.config.logging.stats_interval)));
    }

    let mut save_error = None;
    let done = world.run_with_callback(steps, |w, record| {
        if checkpoint_mgr.should_save(record.tick_index) {
            match checkpoint_mgr.save(&w.create_checkpoint()) {
                Ok(path) => log::info!("checkpoint saved: {}", path.display()),
                Err(e) => {
                    save_error = Some(e);
                    return ControlFlow::Break(());
                }
            }
        }

        if w.is_extinct() {
            log::warn!("all animals extinct at step {}", w.time);
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    })?;

    if let Some(e) = save_error {
        return Err(e).context("saving checkpoint");
    }
    Ok(done)
}

fn print_population(world: &World) {
    println!("Prey: {}", world.breed_count(Breed::Prey));
    println!("Predators: {}", world.breed_count(Breed::Predator));
    println!("Grown grass: {}", world.stats.grass_grown);
}

fn save_outputs(world: &World, output: &Path) -> Result<()> {
    // Final checkpoint
    let final_path = output.join("checkpoint_final.bin");
    world.create_checkpoint().save(&final_path)?;
    println!("Final checkpoint: {}", final_path.display());

    // Population history
    let history_path = output.join("population_history.json");
    let history_str = history_path.to_string_lossy();
    world
        .history
        .save(&history_str)
        .with_context(|| format!("writing {}", history_path.display()))?;
    println!("Population history: {}", history_path.display());

    Ok(())
}

fn run_benchmark(steps: u64, size: usize, seed: u64) -> Result<()> {
    init_logging("warn");

    println!("=== SAVANNA Benchmark ===");
    println!("Steps: {}", steps);
    println!("Grid: {0}x{0}", size);
    println!();

    let result = benchmark(steps, size, seed)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: &Path) -> Result<()> {
    Config::default().save(output)?;
    println!("Configuration saved to: {}", output.display());
    Ok(())
}

fn analyze_checkpoint(checkpoint_path: &Path) -> Result<()> {
    println!("=== Checkpoint Analysis ===");
    println!("File: {}", checkpoint_path.display());
    println!();

    let checkpoint =
        Checkpoint::load(checkpoint_path).with_context(|| format!("loading {}", checkpoint_path.display()))?;
    let size = checkpoint.size_bytes();

    println!("Step: {}", checkpoint.tick);
    println!("Seed: {}", checkpoint.seed);
    println!("Grid: {}x{}", checkpoint.config.world.width, checkpoint.config.world.height);
    println!("Agents: {}", checkpoint.agents.len());
    println!();

    for breed in Breed::ALL {
        let members: Vec<_> = checkpoint.agents.iter().filter(|a| a.breed() == breed).collect();
        print!("{:>9}: {:>6}", breed.to_string(), members.len());

        let energies: Vec<i64> = members.iter().filter_map(|a| a.energy()).collect();
        if !energies.is_empty() {
            let mean = energies.iter().sum::<i64>() as f64 / energies.len() as f64;
            let max = energies.iter().copied().max().unwrap_or(0);
            print!("  mean energy {:.1}  max energy {}", mean, max);
        }
        println!();
    }

    let history = &checkpoint.history;
    if !history.is_empty() {
        println!();
        println!("History: {} samples", history.len());
        for breed in Breed::MOBILE {
            if let Some((tick, count)) = history.peak(breed) {
                println!("  peak {}: {} at step {}", breed, count, tick);
            }
        }
    }

    println!();
    println!("Checkpoint size: {:.2} KB", size as f64 / 1_000.0);

    Ok(())
}
