//! World simulation engine - the tick loop and its public queries.

use crate::agent::{Agent, AgentId, AgentSummary, Breed, GrassPatch, Position, Vitals};
use crate::checkpoint::Checkpoint;
use crate::config::Config;
use crate::error::{SimError, SimResult};
use crate::grid::{MultiGrid, Neighborhood};
use crate::lifecycle::{Habitat, TickEvents};
use crate::metrics::MetricsSink;
use crate::registry::Registry;
use crate::rng::{chance, create_rng, random_seed, SimRng};
use crate::scheduler::{BreedScheduler, StepReport};
use crate::stats::{PopulationHistory, Stats, TickRecord};
use crate::view::{CellView, Frame};
use rand::Rng;
use std::collections::HashSet;
use std::ops::ControlFlow;

/// The simulation world
pub struct World {
    // Configuration
    pub config: Config,

    // Space and population
    grid: MultiGrid,
    population: Registry,
    scheduler: BreedScheduler,

    // State
    pub time: u64,

    // Statistics
    pub stats: Stats,
    /// Tick records sampled every `logging.stats_interval` ticks
    pub history: PopulationHistory,
    events: TickEvents,
    last_step: StepReport,
    sinks: Vec<Box<dyn MetricsSink>>,

    // Random number generator (seeded for reproducibility)
    rng: SimRng,
    seed: u64,
}

impl World {
    /// Create a new world with a fresh random seed
    pub fn new(config: Config) -> SimResult<Self> {
        Self::initialize(config, random_seed())
    }

    /// Create a new world with a specific seed for reproducibility
    pub fn initialize(config: Config, seed: u64) -> SimResult<Self> {
        config.validate()?;

        let mut rng = create_rng(seed);
        let mut grid = MultiGrid::new(config.world.width, config.world.height);
        let mut population = Registry::new();

        // Mobile breeds at uniformly random cells
        for breed in Breed::MOBILE {
            let Some(params) = config.breed(breed) else { continue };
            for _ in 0..params.initial_count {
                let x = rng.gen_range(0..config.world.width);
                let y = rng.gen_range(0..config.world.height);
                let pos = Position::new(x, y);
                let id = population.allocate_id();
                let vitals = Vitals::newborn(params.initial_energy, params);
                if let Some(agent) = Agent::mobile(id, breed, pos, vitals) {
                    population.admit(agent)?;
                    grid.place(id, pos)?;
                }
            }
        }

        // One grass patch per cell
        if config.grass.enabled {
            for x in 0..config.world.width {
                for y in 0..config.world.height {
                    let pos = Position::new(x, y);
                    let grown = chance(&mut rng, config.grass.initial_grown_probability);
                    let id = population.allocate_id();
                    population.admit(Agent::grass(id, pos, GrassPatch::new(grown, config.grass.regrowth_time)))?;
                    grid.place(id, pos)?;
                }
            }
        }

        let mut world = Self {
            scheduler: BreedScheduler::from_config(&config.scheduler),
            config,
            grid,
            population,
            time: 0,
            stats: Stats::new(),
            history: PopulationHistory::new(),
            events: TickEvents::default(),
            last_step: StepReport::default(),
            sinks: Vec::new(),
            rng,
            seed,
        };
        world.stats.update(0, &world.population, &world.events);

        log::info!(
            "world initialized: {}x{} torus, prey={} predators={} grass={} seed={}",
            world.config.world.width,
            world.config.world.height,
            world.breed_count(Breed::Prey),
            world.breed_count(Breed::Predator),
            world.breed_count(Breed::Resource),
            seed
        );

        Ok(world)
    }

    /// Restore world from checkpoint
    pub fn from_checkpoint(checkpoint: Checkpoint) -> SimResult<Self> {
        checkpoint.config.validate()?;

        let grid = checkpoint.grid;
        if grid.width() != checkpoint.config.world.width || grid.height() != checkpoint.config.world.height {
            return Err(SimError::Consistency(format!(
                "checkpoint grid is {}x{} but config says {}x{}",
                grid.width(),
                grid.height(),
                checkpoint.config.world.width,
                checkpoint.config.world.height
            )));
        }
        let population = Registry::from_agents(checkpoint.agents, checkpoint.next_agent_id)?;

        let world = Self {
            scheduler: BreedScheduler::from_config(&checkpoint.config.scheduler),
            config: checkpoint.config,
            grid,
            population,
            time: checkpoint.tick,
            stats: checkpoint.stats,
            history: checkpoint.history,
            events: TickEvents::default(),
            last_step: StepReport::default(),
            sinks: Vec::new(),
            rng: checkpoint.rng,
            seed: checkpoint.seed,
        };
        world.check_consistency()?;

        log::info!("world restored at tick {} with {} agents", world.time, world.population.len());
        Ok(world)
    }

    /// Create checkpoint of current state
    pub fn create_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            version: Checkpoint::VERSION,
            tick: self.time,
            config: self.config.clone(),
            agents: self.population.iter().cloned().collect(),
            grid: self.grid.clone(),
            next_agent_id: self.population.next_id(),
            seed: self.seed,
            rng: self.rng.clone(),
            stats: self.stats.clone(),
            history: self.history.clone(),
        }
    }

    /// Register a sink notified after every tick
    pub fn add_sink(&mut self, sink: Box<dyn MetricsSink>) {
        self.sinks.push(sink);
    }

    /// Main simulation step: activate every agent once, then publish counts
    pub fn tick(&mut self) -> SimResult<TickRecord> {
        self.events.clear();

        // Phase 1: Breed-ordered activation
        let mut habitat = Habitat {
            grid: &mut self.grid,
            registry: &mut self.population,
            rng: &mut self.rng,
            events: &mut self.events,
            config: &self.config,
        };
        self.last_step = self.scheduler.step(&mut habitat)?;
        self.time += 1;

        // Phase 2: Statistics
        self.stats.update(self.time, &self.population, &self.events);
        let record = TickRecord {
            tick_index: self.time,
            counts_by_breed: self.population.counts(),
            births: self.events.births.clone(),
            deaths: self.events.deaths.clone(),
        };

        // Phase 3: Notify collaborators
        if self.time % self.config.logging.stats_interval == 0 {
            self.history.record(record.clone());
        }
        for sink in &mut self.sinks {
            sink.record(&record);
        }

        log::debug!("{}", self.stats.summary());
        Ok(record)
    }

    /// Run simulation for specified number of ticks
    pub fn run(&mut self, ticks: u64) -> SimResult<()> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    /// Run up to `ticks` ticks; the callback may stop the run between ticks.
    ///
    /// Returns the number of ticks executed.
    pub fn run_with_callback<F>(&mut self, ticks: u64, mut callback: F) -> SimResult<u64>
    where
        F: FnMut(&World, &TickRecord) -> ControlFlow<()>,
    {
        for done in 1..=ticks {
            let record = self.tick()?;
            if callback(self, &record).is_break() {
                return Ok(done);
            }
        }
        Ok(ticks)
    }

    /// Live agents of a breed
    pub fn breed_count(&self, breed: Breed) -> usize {
        self.population.count(breed)
    }

    /// Live prey and predators
    pub fn population(&self) -> usize {
        Breed::MOBILE.iter().map(|&b| self.breed_count(b)).sum()
    }

    /// Check if both mobile breeds are gone
    pub fn is_extinct(&self) -> bool {
        self.population() == 0
    }

    /// Copies of the agents in one cell, in occupancy order
    pub fn agents_in_cell(&self, pos: Position) -> Vec<AgentSummary> {
        self.summaries(self.grid.occupants(pos).iter().copied())
    }

    /// Copies of the agents around a cell
    pub fn agents_near(
        &self,
        pos: Position,
        shape: Neighborhood,
        radius: usize,
        include_center: bool,
    ) -> Vec<AgentSummary> {
        self.summaries(self.grid.neighbors(pos, shape, radius, include_center))
    }

    fn summaries(&self, ids: impl IntoIterator<Item = AgentId>) -> Vec<AgentSummary> {
        ids.into_iter()
            .filter_map(|id| self.population.get(id).map(Agent::summary))
            .collect()
    }

    /// Copy of one agent, if alive
    pub fn agent(&self, id: AgentId) -> Option<AgentSummary> {
        self.population.get(id).map(Agent::summary)
    }

    /// Copies of every live agent in id order
    pub fn agents(&self) -> Vec<AgentSummary> {
        self.population.iter().map(Agent::summary).collect()
    }

    /// Whole-grid render snapshot
    pub fn frame(&self) -> Frame {
        let cells = self
            .grid
            .iter_cells()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(pos, ids)| CellView {
                x: pos.x,
                y: pos.y,
                agents: self.summaries(ids.iter().copied()),
            })
            .collect();

        Frame {
            tick: self.time,
            width: self.grid.width(),
            height: self.grid.height(),
            cells,
        }
    }

    /// Births and deaths of the last tick
    pub fn last_events(&self) -> &TickEvents {
        &self.events
    }

    /// Activation counts of the last tick
    pub fn last_step(&self) -> StepReport {
        self.last_step
    }

    /// Verify that every live agent sits in exactly its own cell
    pub fn check_consistency(&self) -> SimResult<()> {
        self.population.verify().map_err(SimError::Consistency)?;

        let mut seen = HashSet::with_capacity(self.population.len());
        for (pos, ids) in self.grid.iter_cells() {
            for &id in ids {
                let agent = self.population.get(id).ok_or_else(|| {
                    SimError::Consistency(format!("grid cell ({}, {}) holds dead agent {}", pos.x, pos.y, id))
                })?;
                if agent.position != pos {
                    return Err(SimError::Consistency(format!(
                        "agent {} is at ({}, {}) but found in cell ({}, {})",
                        id, agent.position.x, agent.position.y, pos.x, pos.y
                    )));
                }
                if !seen.insert(id) {
                    return Err(SimError::Consistency(format!("agent {} is placed twice", id)));
                }
            }
        }

        if seen.len() != self.population.len() {
            return Err(SimError::Consistency(format!(
                "{} agents on the grid but {} registered",
                seen.len(),
                self.population.len()
            )));
        }
        Ok(())
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.world.width = 15;
        config.world.height = 12;
        config.prey.initial_count = 30;
        config.predator.initial_count = 8;
        config
    }

    #[test]
    fn test_world_creation() {
        let config = test_config();
        let world = World::initialize(config.clone(), 1).unwrap();

        assert_eq!(world.breed_count(Breed::Prey), 30);
        assert_eq!(world.breed_count(Breed::Predator), 8);
        assert_eq!(world.breed_count(Breed::Resource), 15 * 12);
        assert_eq!(world.time, 0);
        world.check_consistency().unwrap();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.world.width = 0;
        assert!(matches!(World::initialize(config, 1), Err(SimError::Config(_))));
    }

    #[test]
    fn test_world_tick() {
        let mut world = World::initialize(test_config(), 2).unwrap();
        let record = world.tick().unwrap();

        assert_eq!(world.time, 1);
        assert_eq!(record.tick_index, 1);
        assert_eq!(record.count(Breed::Prey), world.breed_count(Breed::Prey));
        assert!(world.history.is_empty());
    }

    #[test]
    fn test_world_run() {
        let mut world = World::initialize(test_config(), 3).unwrap();
        world.run(50).unwrap();

        assert_eq!(world.time, 50);
        assert_eq!(world.history.len(), 5);
        world.check_consistency().unwrap();
    }

    #[test]
    fn test_history_sampled_at_stats_interval() {
        let mut config = test_config();
        config.logging.stats_interval = 4;
        let mut world = World::initialize(config, 3).unwrap();
        world.run(18).unwrap();

        let ticks: Vec<u64> = world.history.records.iter().map(|r| r.tick_index).collect();
        assert_eq!(ticks, vec![4, 8, 12, 16]);
        assert_eq!(world.history.last().unwrap().count(Breed::Resource), 15 * 12);
    }

    #[test]
    fn test_run_with_callback_stops_early() {
        let mut world = World::initialize(test_config(), 4).unwrap();
        let done = world
            .run_with_callback(100, |w, _| {
                if w.time == 7 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();

        assert_eq!(done, 7);
        assert_eq!(world.time, 7);
    }

    #[test]
    fn test_checkpoint_roundtrip_continues_identically() {
        let mut world = World::initialize(test_config(), 12345).unwrap();
        world.run(20).unwrap();

        let mut restored = World::from_checkpoint(world.create_checkpoint()).unwrap();
        assert_eq!(restored.time, world.time);
        assert_eq!(restored.agents(), world.agents());
        assert_eq!(restored.seed(), world.seed());

        assert_eq!(restored.history.len(), 2);

        world.run(20).unwrap();
        restored.run(20).unwrap();
        assert_eq!(restored.agents(), world.agents());
        assert_eq!(restored.history.records, world.history.records);
    }

    #[test]
    fn test_sinks_are_notified() {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        let mut world = World::initialize(test_config(), 5).unwrap();
        world.add_sink(Box::new(move |r: &TickRecord| {
            tx.send(r.tick_index).ok();
        }));

        world.run(3).unwrap();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_agent_queries_return_copies() {
        let world = World::initialize(test_config(), 7).unwrap();
        let first = world.agents()[0];

        assert_eq!(world.agent(first.id), Some(first));
        assert_eq!(world.agent(u64::MAX), None);

        let here = world.agents_near(first.position, Neighborhood::Moore, 0, true);
        assert!(here.contains(&first));
        assert_eq!(here.len(), world.agents_in_cell(first.position).len());

        let mut everyone: Vec<AgentId> = world
            .agents_near(first.position, Neighborhood::VonNeumann, 1_000_000, true)
            .iter()
            .map(|a| a.id)
            .collect();
        everyone.sort_unstable();
        let all: Vec<AgentId> = world.agents().iter().map(|a| a.id).collect();
        assert_eq!(everyone, all);
    }

    #[test]
    fn test_frame_matches_cells() {
        let world = World::initialize(test_config(), 6).unwrap();
        let frame = world.frame();

        assert_eq!(frame.agent_count(), world.agents().len());
        for cell in &frame.cells {
            assert_eq!(cell.agents, world.agents_in_cell(Position::new(cell.x, cell.y)));
        }
    }
}
