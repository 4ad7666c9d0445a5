//! Authoritative set of live agents, keyed by id and partitioned by breed.

use crate::agent::{Agent, AgentId, Breed};
use crate::error::{SimError, SimResult};
use std::collections::{BTreeMap, BTreeSet};

/// Live population.
///
/// Every live id is in exactly one breed bucket and once in the record map.
/// Removed ids are gone from both and are never handed out again.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    agents: BTreeMap<AgentId, Agent>,
    by_breed: BTreeMap<Breed, BTreeSet<AgentId>>,
    next_id: AgentId,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from saved records, continuing id assignment at `next_id`
    pub fn from_agents(agents: impl IntoIterator<Item = Agent>, next_id: AgentId) -> SimResult<Self> {
        let mut registry = Self {
            next_id,
            ..Self::default()
        };
        for agent in agents {
            registry.next_id = registry.next_id.max(agent.id + 1);
            registry.admit(agent)?;
        }
        Ok(registry)
    }

    /// Reserve the next unused id
    pub fn allocate_id(&mut self) -> AgentId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Id the next allocation will return
    #[inline]
    pub fn next_id(&self) -> AgentId {
        self.next_id
    }

    /// Register an agent. Returns `false` if its id is already live.
    pub fn insert(&mut self, agent: Agent) -> bool {
        if self.agents.contains_key(&agent.id) {
            return false;
        }
        self.by_breed.entry(agent.breed()).or_default().insert(agent.id);
        self.agents.insert(agent.id, agent);
        true
    }

    /// Register an agent whose id must not be live yet
    pub fn admit(&mut self, agent: Agent) -> SimResult<()> {
        let id = agent.id;
        if self.insert(agent) {
            Ok(())
        } else {
            Err(SimError::Consistency(format!("agent id {id} is already live")))
        }
    }

    /// Purge an agent from both indexes
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        let agent = self.agents.remove(&id)?;
        if let Some(bucket) = self.by_breed.get_mut(&agent.breed()) {
            bucket.remove(&id);
        }
        Some(agent)
    }

    #[inline]
    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    #[inline]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Copy of a breed's live ids in ascending order
    pub fn ids_of(&self, breed: Breed) -> Vec<AgentId> {
        self.by_breed
            .get(&breed)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, breed: Breed) -> usize {
        self.by_breed.get(&breed).map_or(0, BTreeSet::len)
    }

    /// Live counts for every breed, including empty ones
    pub fn counts(&self) -> BTreeMap<Breed, usize> {
        Breed::ALL.iter().map(|&b| (b, self.count(b))).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// All live agents in id order
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Live agents of one breed in id order
    pub fn iter_breed(&self, breed: Breed) -> impl Iterator<Item = &Agent> {
        self.by_breed
            .get(&breed)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.agents.get(id))
    }

    /// Check that breed buckets and records agree
    pub fn verify(&self) -> Result<(), String> {
        let bucketed: usize = self.by_breed.values().map(BTreeSet::len).sum();
        if bucketed != self.agents.len() {
            return Err(format!(
                "{} ids in breed buckets but {} records",
                bucketed,
                self.agents.len()
            ));
        }
        for (breed, bucket) in &self.by_breed {
            for id in bucket {
                match self.agents.get(id) {
                    Some(agent) if agent.breed() == *breed => {}
                    Some(agent) => {
                        return Err(format!("agent {} is a {} but filed under {}", id, agent.breed(), breed))
                    }
                    None => return Err(format!("agent {} in {} bucket has no record", id, breed)),
                }
            }
        }
        if let Some(&max) = self.agents.keys().next_back() {
            if max >= self.next_id {
                return Err(format!("agent {} is at or above next id {}", max, self.next_id));
            }
        }
        Ok(())
    }
}
