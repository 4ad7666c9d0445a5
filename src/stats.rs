//! Statistics tracking for the simulation.

use crate::agent::Breed;
use crate::lifecycle::{DeathCause, TickEvents};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the engine publishes after every tick
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRecord {
    /// 1 for the first tick
    pub tick_index: u64,
    pub counts_by_breed: BTreeMap<Breed, usize>,
    pub births: BTreeMap<Breed, usize>,
    pub deaths: BTreeMap<Breed, usize>,
}

impl TickRecord {
    pub fn count(&self, breed: Breed) -> usize {
        self.counts_by_breed.get(&breed).copied().unwrap_or(0)
    }
}

/// Statistics snapshot for a simulation tick
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Current simulation tick
    pub tick: u64,
    pub prey: usize,
    pub predators: usize,
    /// Grass patches, grown or not
    pub grass: usize,
    pub grass_grown: usize,
    /// Births this tick
    pub births: usize,
    /// Deaths this tick, all causes
    pub deaths: usize,
    /// Prey eaten this tick
    pub kills: usize,
    pub prey_energy_mean: f32,
    pub predator_energy_mean: f32,
    pub prey_age_mean: f32,
    pub predator_age_mean: f32,
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, n) = values.fold((0.0f32, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f32
    }
}

impl Stats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats from current simulation state
    pub fn update(&mut self, tick: u64, registry: &Registry, events: &TickEvents) {
        self.tick = tick;
        self.prey = registry.count(Breed::Prey);
        self.predators = registry.count(Breed::Predator);
        self.grass = registry.count(Breed::Resource);
        self.grass_grown = registry
            .iter_breed(Breed::Resource)
            .filter(|a| a.grass_patch().is_some_and(|g| g.is_grown))
            .count();

        self.births = events.total_births();
        self.deaths = events.total_deaths();
        self.kills = events
            .deaths_by_cause
            .get(&DeathCause::Predation)
            .copied()
            .unwrap_or(0);

        let energy = |breed| registry.iter_breed(breed).filter_map(|a| a.energy()).map(|e| e as f32);
        let age = |breed| {
            registry
                .iter_breed(breed)
                .filter_map(|a| a.vitals())
                .map(|v| v.age as f32)
        };
        self.prey_energy_mean = mean(energy(Breed::Prey));
        self.predator_energy_mean = mean(energy(Breed::Predator));
        self.prey_age_mean = mean(age(Breed::Prey));
        self.predator_age_mean = mean(age(Breed::Predator));
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "T:{:6} | Prey:{:5} | Pred:{:5} | Grass:{:5}/{:<5} | +{} -{} (eaten {}) | E prey:{:.1} pred:{:.1}",
            self.tick,
            self.prey,
            self.predators,
            self.grass_grown,
            self.grass,
            self.births,
            self.deaths,
            self.kills,
            self.prey_energy_mean,
            self.predator_energy_mean,
        )
    }
}

/// Every tick record of a run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PopulationHistory {
    pub records: Vec<TickRecord>,
}

impl PopulationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tick
    pub fn record(&mut self, record: TickRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&TickRecord> {
        self.records.last()
    }

    /// Population of one breed over time
    pub fn series(&self, breed: Breed) -> Vec<(u64, usize)> {
        self.records
            .iter()
            .map(|r| (r.tick_index, r.count(breed)))
            .collect()
    }

    /// Largest population a breed reached
    pub fn peak(&self, breed: Breed) -> Option<(u64, usize)> {
        self.series(breed).into_iter().max_by_key(|&(_, n)| n)
    }

    /// Save history to file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    /// Load history from file
    pub fn load(path: &str) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, GrassPatch, Position, Vitals};
    use crate::config::MobileBreedConfig;

    #[test]
    fn test_stats_update() {
        let params = MobileBreedConfig::default_prey();
        let mut registry = Registry::new();
        for energy in [4, 8] {
            let id = registry.allocate_id();
            let agent = Agent::mobile(id, Breed::Prey, Position::new(0, 0), Vitals::newborn(energy, &params));
            registry.insert(agent.unwrap());
        }
        let id = registry.allocate_id();
        registry.insert(Agent::grass(id, Position::new(1, 0), GrassPatch::new(true, 0)));

        let mut events = TickEvents::default();
        events.record_birth(Breed::Prey);
        events.record_death(Breed::Prey, DeathCause::Predation);

        let mut stats = Stats::new();
        stats.update(3, &registry, &events);

        assert_eq!(stats.tick, 3);
        assert_eq!(stats.prey, 2);
        assert_eq!(stats.predators, 0);
        assert_eq!(stats.grass_grown, 1);
        assert_eq!(stats.kills, 1);
        assert!((stats.prey_energy_mean - 6.0).abs() < 1e-6);
        assert_eq!(stats.predator_energy_mean, 0.0);
    }

    #[test]
    fn test_history_series() {
        let mut history = PopulationHistory::new();

        for i in 1..=5u64 {
            let mut record = TickRecord {
                tick_index: i,
                ..TickRecord::default()
            };
            record.counts_by_breed.insert(Breed::Prey, (i * 10) as usize);
            history.record(record);
        }

        let series = history.series(Breed::Prey);
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], (1, 10));
        assert_eq!(history.peak(Breed::Prey), Some((5, 50)));
        assert_eq!(history.series(Breed::Predator)[2], (3, 0));
    }

    #[test]
    fn test_history_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let path = path.to_str().unwrap();

        let mut history = PopulationHistory::new();
        let mut record = TickRecord {
            tick_index: 1,
            ..TickRecord::default()
        };
        record.counts_by_breed.insert(Breed::Predator, 4);
        history.record(record.clone());

        history.save(path).unwrap();
        let loaded = PopulationHistory::load(path).unwrap();
        assert_eq!(loaded.records, vec![record]);
    }
}
