//! Breed-ordered random activation.
//!
//! One tick walks the breeds in a fixed priority order. For each breed it
//! copies the ids that are live at that moment, shuffles the copy with the
//! simulation RNG and activates the ids one by one. Entries that died
//! earlier in the tick are skipped; agents born during the tick are never in
//! a snapshot and first act on the next tick.

use crate::agent::{AgentId, Breed};
use crate::config::SchedulerConfig;
use crate::error::SimResult;
use crate::rng::SimRng;
use rand::seq::SliceRandom;

/// What the scheduler needs from the population it drives
pub trait Population {
    /// Ids of a breed that are live right now
    fn live_ids(&self, breed: Breed) -> Vec<AgentId>;

    fn is_live(&self, id: AgentId) -> bool;

    /// Every agent created from now on gets an id at or above this value
    fn id_watermark(&self) -> AgentId;

    fn rng(&mut self) -> &mut SimRng;

    /// Run one agent's lifecycle pipeline
    fn activate(&mut self, id: AgentId) -> SimResult<()>;
}

/// Activation counts for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub activated: usize,
    /// Snapshot entries that died before their turn
    pub skipped: usize,
}

/// Random activation by breed
#[derive(Debug, Clone)]
pub struct BreedScheduler {
    order: Vec<Breed>,
}

impl BreedScheduler {
    pub fn new(order: Vec<Breed>) -> Self {
        Self { order }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.breed_order.clone())
    }

    /// Activate every agent live at tick start exactly once
    pub fn step<P: Population>(&self, population: &mut P) -> SimResult<StepReport> {
        let watermark = population.id_watermark();
        let mut report = StepReport::default();

        for &breed in &self.order {
            let mut snapshot: Vec<AgentId> = population
                .live_ids(breed)
                .into_iter()
                .filter(|&id| id < watermark)
                .collect();
            snapshot.shuffle(population.rng());

            for id in snapshot {
                if !population.is_live(id) {
                    report.skipped += 1;
                    continue;
                }
                population.activate(id)?;
                report.activated += 1;
            }
        }

        log::trace!(
            "scheduler step: {} activated, {} skipped",
            report.activated,
            report.skipped
        );
        Ok(report)
    }
}

impl Default for BreedScheduler {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}
