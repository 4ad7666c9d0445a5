//! Agent records: breeds, positions and per-breed state.

use crate::config::MobileBreedConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique agent identifier, assigned monotonically and never reused
pub type AgentId = u64;

/// Integer cell coordinate on the torus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    #[inline]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Species of an agent, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Breed {
    Prey,
    Predator,
    Resource,
}

impl Breed {
    pub const ALL: [Breed; 3] = [Breed::Prey, Breed::Predator, Breed::Resource];

    /// Breeds that move, eat and reproduce
    pub const MOBILE: [Breed; 2] = [Breed::Prey, Breed::Predator];
}

impl fmt::Display for Breed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Breed::Prey => "prey",
            Breed::Predator => "predator",
            Breed::Resource => "resource",
        };
        f.write_str(name)
    }
}

/// State shared by every mobile breed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    /// May go non-positive between the move and the death check
    pub energy: i64,
    pub age: u32,
    /// Digestion cooldown counter
    pub ticks_since_fed: u32,
}

impl Vitals {
    /// Fresh vitals for a newly seeded or newborn agent.
    ///
    /// The digestion counter starts at the breed's cooldown so a newborn is
    /// able to eat on its first activation.
    pub fn newborn(energy: i64, params: &MobileBreedConfig) -> Self {
        Self {
            energy,
            age: 0,
            ticks_since_fed: params.min_digestion_interval,
        }
    }
}

/// Stationary regrowing resource state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrassPatch {
    pub is_grown: bool,
    pub regrowth_countdown: i64,
}

impl GrassPatch {
    pub fn new(is_grown: bool, regrowth_countdown: i64) -> Self {
        Self {
            is_grown,
            regrowth_countdown,
        }
    }

    /// One activation: count down, then latch to grown once the countdown runs out
    pub fn step(&mut self) {
        self.regrowth_countdown -= 1;
        if !self.is_grown && self.regrowth_countdown <= 0 {
            self.is_grown = true;
        }
    }

    /// Consumed by a grazer: back to ungrown with a full countdown
    pub fn eaten(&mut self, regrowth_time: i64) {
        self.is_grown = false;
        self.regrowth_countdown = regrowth_time;
    }
}

/// Breed-tagged agent state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Prey(Vitals),
    Predator(Vitals),
    Resource(GrassPatch),
}

/// An agent in the simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub position: Position,
    pub kind: AgentKind,
}

impl Agent {
    /// Create a mobile agent of the given breed.
    ///
    /// Returns `None` for `Breed::Resource`, which has no vitals.
    pub fn mobile(id: AgentId, breed: Breed, position: Position, vitals: Vitals) -> Option<Self> {
        let kind = match breed {
            Breed::Prey => AgentKind::Prey(vitals),
            Breed::Predator => AgentKind::Predator(vitals),
            Breed::Resource => return None,
        };
        Some(Self { id, position, kind })
    }

    pub fn grass(id: AgentId, position: Position, patch: GrassPatch) -> Self {
        Self {
            id,
            position,
            kind: AgentKind::Resource(patch),
        }
    }

    #[inline]
    pub fn breed(&self) -> Breed {
        match self.kind {
            AgentKind::Prey(_) => Breed::Prey,
            AgentKind::Predator(_) => Breed::Predator,
            AgentKind::Resource(_) => Breed::Resource,
        }
    }

    pub fn vitals(&self) -> Option<&Vitals> {
        match &self.kind {
            AgentKind::Prey(v) | AgentKind::Predator(v) => Some(v),
            AgentKind::Resource(_) => None,
        }
    }

    pub fn vitals_mut(&mut self) -> Option<&mut Vitals> {
        match &mut self.kind {
            AgentKind::Prey(v) | AgentKind::Predator(v) => Some(v),
            AgentKind::Resource(_) => None,
        }
    }

    pub fn grass_patch(&self) -> Option<&GrassPatch> {
        match &self.kind {
            AgentKind::Resource(g) => Some(g),
            _ => None,
        }
    }

    pub fn grass_patch_mut(&mut self) -> Option<&mut GrassPatch> {
        match &mut self.kind {
            AgentKind::Resource(g) => Some(g),
            _ => None,
        }
    }

    pub fn energy(&self) -> Option<i64> {
        self.vitals().map(|v| v.energy)
    }

    /// Read-only copy for renderers and inspectors
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id,
            breed: self.breed(),
            position: self.position,
            energy: self.vitals().map(|v| v.energy),
            age: self.vitals().map(|v| v.age),
            is_grown: self.grass_patch().map(|g| g.is_grown),
        }
    }
}

/// Copy of the public fields of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub breed: Breed,
    pub position: Position,
    pub energy: Option<i64>,
    pub age: Option<u32>,
    pub is_grown: Option<bool>,
}
