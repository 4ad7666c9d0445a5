//! Per-breed activation pipelines.
//!
//! Mobile breeds run `move -> feed -> reproduce -> age -> death check`.
//! The order matters: an agent that spends its last energy moving survives
//! if it eats in the same activation. Grass runs `count down -> grow`.
//!
//! Prey and predators share one pipeline; the breed tag selects the food
//! target and the parameters.

use crate::agent::{Agent, AgentId, Breed, Position, Vitals};
use crate::config::{Config, MobileBreedConfig};
use crate::error::{SimError, SimResult};
use crate::grid::{MultiGrid, Neighborhood};
use crate::registry::Registry;
use crate::rng::{chance, SimRng};
use crate::scheduler::Population;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why an agent was destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeathCause {
    /// Energy reached zero or below
    Starvation,
    /// Age reached life expectancy
    OldAge,
    /// Eaten by a predator
    Predation,
}

/// Births, deaths and meals observed during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    pub births: BTreeMap<Breed, usize>,
    pub deaths: BTreeMap<Breed, usize>,
    pub deaths_by_cause: BTreeMap<DeathCause, usize>,
    pub meals: BTreeMap<Breed, usize>,
}

impl TickEvents {
    pub fn record_birth(&mut self, breed: Breed) {
        *self.births.entry(breed).or_insert(0) += 1;
    }

    pub fn record_death(&mut self, breed: Breed, cause: DeathCause) {
        *self.deaths.entry(breed).or_insert(0) += 1;
        *self.deaths_by_cause.entry(cause).or_insert(0) += 1;
    }

    pub fn record_meal(&mut self, breed: Breed) {
        *self.meals.entry(breed).or_insert(0) += 1;
    }

    pub fn births_of(&self, breed: Breed) -> usize {
        self.births.get(&breed).copied().unwrap_or(0)
    }

    pub fn deaths_of(&self, breed: Breed) -> usize {
        self.deaths.get(&breed).copied().unwrap_or(0)
    }

    pub fn total_births(&self) -> usize {
        self.births.values().sum()
    }

    pub fn total_deaths(&self) -> usize {
        self.deaths.values().sum()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Mutable view of the world handed to one activation
pub struct Habitat<'a> {
    pub grid: &'a mut MultiGrid,
    pub registry: &'a mut Registry,
    pub rng: &'a mut SimRng,
    pub events: &'a mut TickEvents,
    pub config: &'a Config,
}

impl Population for Habitat<'_> {
    fn live_ids(&self, breed: Breed) -> Vec<AgentId> {
        self.registry.ids_of(breed)
    }

    fn is_live(&self, id: AgentId) -> bool {
        self.registry.contains(id)
    }

    fn id_watermark(&self) -> AgentId {
        self.registry.next_id()
    }

    fn rng(&mut self) -> &mut SimRng {
        &mut *self.rng
    }

    fn activate(&mut self, id: AgentId) -> SimResult<()> {
        activate(self, id)
    }
}

fn missing(id: AgentId) -> SimError {
    SimError::Consistency(format!("agent {id} was activated but has no live record"))
}

fn vitals_mut(registry: &mut Registry, id: AgentId) -> SimResult<&mut Vitals> {
    registry
        .get_mut(id)
        .and_then(Agent::vitals_mut)
        .ok_or_else(|| missing(id))
}

fn position_of(registry: &Registry, id: AgentId) -> SimResult<Position> {
    registry.get(id).map(|a| a.position).ok_or_else(|| missing(id))
}

/// Run the pipeline of the agent's breed once
pub fn activate(h: &mut Habitat<'_>, id: AgentId) -> SimResult<()> {
    let config: &Config = h.config;
    let breed = h.registry.get(id).map(Agent::breed).ok_or_else(|| missing(id))?;

    match config.breed(breed) {
        Some(params) => step_mobile(h, id, breed, params),
        None => grow(h, id),
    }
}

fn step_mobile(h: &mut Habitat<'_>, id: AgentId, breed: Breed, params: &MobileBreedConfig) -> SimResult<()> {
    random_move(h, id, params)?;
    feed(h, id, breed, params)?;
    reproduce(h, id, breed, params)?;
    vitals_mut(h.registry, id)?.age += 1;
    death_check(h, id, breed, params)
}

/// Step to a random Moore neighbor and pay the movement cost.
///
/// A 1x1 torus has no neighbor; the agent stays and still pays.
fn random_move(h: &mut Habitat<'_>, id: AgentId, params: &MobileBreedConfig) -> SimResult<()> {
    let from = position_of(h.registry, id)?;
    if let Some(to) = h.grid.random_step(from, Neighborhood::Moore, h.rng) {
        h.grid.move_agent(id, from, to)?;
        if let Some(agent) = h.registry.get_mut(id) {
            agent.position = to;
        }
    }
    let vitals = vitals_mut(h.registry, id)?;
    vitals.energy = vitals.energy.saturating_sub(params.move_energy_cost);
    Ok(())
}

/// First edible occupant of the cell, in occupancy order
fn find_food(grid: &MultiGrid, registry: &Registry, breed: Breed, pos: Position) -> Option<AgentId> {
    grid.neighbors(pos, Neighborhood::Moore, 0, true)
        .into_iter()
        .find(|&other| match (breed, registry.get(other)) {
            (Breed::Prey, Some(food)) => food.grass_patch().is_some_and(|g| g.is_grown),
            (Breed::Predator, Some(food)) => food.breed() == Breed::Prey,
            _ => false,
        })
}

fn feed(h: &mut Habitat<'_>, id: AgentId, breed: Breed, params: &MobileBreedConfig) -> SimResult<()> {
    let pos = position_of(h.registry, id)?;
    let ready = vitals_mut(h.registry, id)?.ticks_since_fed >= params.min_digestion_interval;
    let meal = if ready {
        find_food(h.grid, h.registry, breed, pos)
    } else {
        None
    };

    let Some(food) = meal else {
        let vitals = vitals_mut(h.registry, id)?;
        vitals.ticks_since_fed = vitals.ticks_since_fed.saturating_add(1);
        return Ok(());
    };

    match breed {
        Breed::Prey => {
            let regrowth_time = h.config.grass.regrowth_time;
            if let Some(patch) = h.registry.get_mut(food).and_then(Agent::grass_patch_mut) {
                patch.eaten(regrowth_time);
            }
        }
        Breed::Predator => destroy(h, food, DeathCause::Predation)?,
        Breed::Resource => return Ok(()),
    }

    let vitals = vitals_mut(h.registry, id)?;
    vitals.energy = vitals.energy.saturating_add(params.gain_from_food);
    vitals.ticks_since_fed = 0;
    h.events.record_meal(breed);
    log::trace!("{} {} ate {} at ({}, {})", breed, id, food, pos.x, pos.y);
    Ok(())
}

/// Asexual reproduction into the parent's cell.
///
/// The random draw only happens once the energy test has passed.
fn reproduce(h: &mut Habitat<'_>, id: AgentId, breed: Breed, params: &MobileBreedConfig) -> SimResult<()> {
    let energy = vitals_mut(h.registry, id)?.energy;
    if energy <= params.reproduction_energy_threshold || !chance(h.rng, params.reproduction_probability) {
        return Ok(());
    }

    let pos = position_of(h.registry, id)?;
    let child_id = h.registry.allocate_id();
    let vitals = Vitals::newborn(params.offspring_energy, params);
    let child = Agent::mobile(child_id, breed, pos, vitals)
        .ok_or_else(|| SimError::Consistency(format!("{breed} cannot reproduce")))?;

    h.registry.admit(child)?;
    h.grid.place(child_id, pos)?;
    let parent = vitals_mut(h.registry, id)?;
    parent.energy = parent.energy.saturating_sub(params.reproduction_energy_cost);
    h.events.record_birth(breed);
    Ok(())
}

/// `energy <= 0` always kills, including exactly zero
fn death_check(h: &mut Habitat<'_>, id: AgentId, breed: Breed, params: &MobileBreedConfig) -> SimResult<()> {
    let vitals = *vitals_mut(h.registry, id)?;
    let cause = if vitals.energy <= 0 {
        DeathCause::Starvation
    } else if vitals.age >= params.life_expectancy {
        DeathCause::OldAge
    } else {
        return Ok(());
    };
    log::trace!("{} {} died: {:?}", breed, id, cause);
    destroy(h, id, cause)
}

/// Remove an agent from the grid and the registry
pub fn destroy(h: &mut Habitat<'_>, id: AgentId, cause: DeathCause) -> SimResult<()> {
    let agent = h.registry.remove(id).ok_or_else(|| missing(id))?;
    h.grid.remove(id, agent.position)?;
    h.events.record_death(agent.breed(), cause);
    Ok(())
}

fn grow(h: &mut Habitat<'_>, id: AgentId) -> SimResult<()> {
    h.registry
        .get_mut(id)
        .and_then(Agent::grass_patch_mut)
        .ok_or_else(|| missing(id))?
        .step();
    Ok(())
}
