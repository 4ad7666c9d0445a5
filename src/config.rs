//! Configuration system for the ecosystem simulation.
//!
//! Supports YAML configuration files with defaults taken from the classic
//! predator-prey parameters.

use crate::agent::Breed;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub world: WorldConfig,
    pub prey: MobileBreedConfig,
    pub predator: MobileBreedConfig,
    pub grass: GrassConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Torus dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub width: usize,
    pub height: usize,
}

/// Parameters of one mobile breed (prey or predator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileBreedConfig {
    /// Number of agents placed at setup
    pub initial_count: usize,
    /// Energy of agents placed at setup
    pub initial_energy: i64,
    /// Energy of an offspring at birth
    pub offspring_energy: i64,
    /// Energy lost per move
    pub move_energy_cost: i64,
    /// Reproduction requires strictly more energy than this
    pub reproduction_energy_threshold: i64,
    /// Energy the parent pays per offspring
    pub reproduction_energy_cost: i64,
    /// Per-activation reproduction chance (0.0 - 1.0)
    pub reproduction_probability: f64,
    /// Age at which the agent dies
    pub life_expectancy: u32,
    /// Ticks that must pass between two meals
    pub min_digestion_interval: u32,
    /// Energy gained per meal
    pub gain_from_food: i64,
}

/// Regrowing resource configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrassConfig {
    /// Whether every cell carries a grass patch
    pub enabled: bool,
    /// Ticks for an eaten patch to grow back
    pub regrowth_time: i64,
    /// Chance that a patch starts grown (0.0 - 1.0)
    pub initial_grown_probability: f64,
}

/// Activation order policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Breeds in activation priority order; each breed exactly once
    pub breed_order: Vec<Breed>,
}

/// Logging and checkpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Ticks between stats log lines
    pub stats_interval: u64,
    /// Ticks between checkpoints
    pub checkpoint_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            prey: MobileBreedConfig::default_prey(),
            predator: MobileBreedConfig::default_predator(),
            grass: GrassConfig::default(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
        }
    }
}

impl MobileBreedConfig {
    pub fn default_prey() -> Self {
        Self {
            initial_count: 10,
            initial_energy: 10,
            offspring_energy: 10,
            move_energy_cost: 1,
            reproduction_energy_threshold: 2,
            reproduction_energy_cost: 2,
            reproduction_probability: 0.2,
            life_expectancy: 20,
            min_digestion_interval: 0,
            gain_from_food: 4,
        }
    }

    pub fn default_predator() -> Self {
        Self {
            initial_count: 10,
            initial_energy: 10,
            offspring_energy: 10,
            move_energy_cost: 1,
            reproduction_energy_threshold: 3,
            reproduction_energy_cost: 3,
            reproduction_probability: 0.05,
            life_expectancy: 30,
            min_digestion_interval: 5,
            gain_from_food: 5,
        }
    }

    fn validate(&self, breed: &str) -> Result<(), ConfigError> {
        let field = |name: &str| format!("{breed}.{name}");

        for (name, value) in [
            ("initial_energy", self.initial_energy),
            ("offspring_energy", self.offspring_energy),
            ("move_energy_cost", self.move_energy_cost),
            ("reproduction_energy_threshold", self.reproduction_energy_threshold),
            ("reproduction_energy_cost", self.reproduction_energy_cost),
            ("gain_from_food", self.gain_from_food),
        ] {
            if value < 0 {
                return Err(ConfigError::invalid(field(name), format!("must be >= 0, got {value}")));
            }
        }
        check_probability(field("reproduction_probability"), self.reproduction_probability)?;
        if self.reproduction_energy_threshold < self.reproduction_energy_cost {
            return Err(ConfigError::invalid(
                field("reproduction_energy_threshold"),
                format!(
                    "must be >= reproduction_energy_cost ({}), got {}",
                    self.reproduction_energy_cost, self.reproduction_energy_threshold
                ),
            ));
        }
        if self.life_expectancy == 0 {
            return Err(ConfigError::invalid(field("life_expectancy"), "must be > 0"));
        }
        Ok(())
    }
}

impl Default for MobileBreedConfig {
    fn default() -> Self {
        Self::default_prey()
    }
}

impl Default for GrassConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            regrowth_time: 30,
            initial_grown_probability: 0.5,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            breed_order: vec![Breed::Predator, Breed::Prey, Breed::Resource],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 10,
            checkpoint_interval: 500,
            log_level: "info".to_string(),
        }
    }
}

fn check_probability(field: impl Into<String>, p: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ConfigError::invalid(field, format!("must be within [0, 1], got {p}")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parameters of a mobile breed; `None` for the resource
    pub fn breed(&self, breed: Breed) -> Option<&MobileBreedConfig> {
        match breed {
            Breed::Prey => Some(&self.prey),
            Breed::Predator => Some(&self.predator),
            Breed::Resource => None,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.width == 0 {
            return Err(ConfigError::invalid("world.width", "must be > 0"));
        }
        if self.world.height == 0 {
            return Err(ConfigError::invalid("world.height", "must be > 0"));
        }

        self.prey.validate("prey")?;
        self.predator.validate("predator")?;

        if self.grass.regrowth_time < 0 {
            return Err(ConfigError::invalid(
                "grass.regrowth_time",
                format!("must be >= 0, got {}", self.grass.regrowth_time),
            ));
        }
        check_probability("grass.initial_grown_probability", self.grass.initial_grown_probability)?;

        let order = &self.scheduler.breed_order;
        for breed in Breed::ALL {
            let n = order.iter().filter(|&&b| b == breed).count();
            if n != 1 {
                return Err(ConfigError::invalid(
                    "scheduler.breed_order",
                    format!("must list {breed} exactly once, found {n}"),
                ));
            }
        }

        if self.logging.stats_interval == 0 {
            return Err(ConfigError::invalid("logging.stats_interval", "must be > 0"));
        }
        if self.logging.checkpoint_interval == 0 {
            return Err(ConfigError::invalid("logging.checkpoint_interval", "must be > 0"));
        }
        Ok(())
    }
}
