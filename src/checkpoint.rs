//! Checkpoint system for saving and loading simulation state.

use crate::agent::{Agent, AgentId};
use crate::config::Config;
use crate::grid::MultiGrid;
use crate::rng::SimRng;
use crate::stats::{PopulationHistory, Stats};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAGIC: &[u8; 4] = b"SVNA";

/// Complete simulation state for checkpointing
#[derive(Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version for compatibility checking
    pub version: u32,
    /// Ticks completed
    pub tick: u64,
    pub config: Config,
    /// Live agents in id order
    pub agents: Vec<Agent>,
    /// Cell contents, kept so same-cell lookups resume in the same order
    pub grid: MultiGrid,
    pub next_agent_id: AgentId,
    /// Seed the run started from
    pub seed: u64,
    /// Generator state at the moment of the checkpoint
    pub rng: SimRng,
    pub stats: Stats,
    /// Sampled records up to `tick`
    pub history: PopulationHistory,
}

impl Checkpoint {
    /// Current checkpoint version
    pub const VERSION: u32 = 2;

    /// Save checkpoint to binary file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;

        Ok(())
    }

    /// Load checkpoint from binary file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CheckpointError::InvalidFormat("invalid magic bytes".to_string()));
        }

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let checkpoint: Checkpoint = bincode::deserialize(&buffer)?;

        if checkpoint.version != Self::VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: Self::VERSION,
                found: checkpoint.version,
            });
        }

        Ok(checkpoint)
    }

    /// Get approximate size in bytes
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(0) as usize
    }
}

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Checkpoint manager for automatic saving
pub struct CheckpointManager {
    /// Base directory for checkpoints
    pub base_dir: PathBuf,
    /// Interval between checkpoints
    pub interval: u64,
    /// Maximum checkpoints to keep
    pub max_checkpoints: usize,
    last_checkpoint: u64,
}

impl CheckpointManager {
    /// Create a new checkpoint manager, creating the directory if needed
    pub fn new(base_dir: impl Into<PathBuf>, interval: u64, max_checkpoints: usize) -> Result<Self, CheckpointError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            interval: interval.max(1),
            max_checkpoints,
            last_checkpoint: 0,
        })
    }

    /// Check if a checkpoint should be saved
    pub fn should_save(&self, tick: u64) -> bool {
        tick > 0 && tick % self.interval == 0 && tick != self.last_checkpoint
    }

    /// Generate checkpoint filename
    pub fn checkpoint_path(&self, tick: u64) -> PathBuf {
        self.base_dir.join(format!("checkpoint_{:08}.bin", tick))
    }

    /// Save checkpoint and update state
    pub fn save(&mut self, checkpoint: &Checkpoint) -> Result<PathBuf, CheckpointError> {
        let path = self.checkpoint_path(checkpoint.tick);
        checkpoint.save(&path)?;
        self.last_checkpoint = checkpoint.tick;

        self.cleanup()?;

        Ok(path)
    }

    fn checkpoint_files(&self) -> Result<Vec<std::fs::DirEntry>, CheckpointError> {
        Ok(std::fs::read_dir(&self.base_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("checkpoint_")
            })
            .collect())
    }

    /// Remove old checkpoints beyond max limit
    fn cleanup(&self) -> Result<(), CheckpointError> {
        let mut checkpoints = self.checkpoint_files()?;

        if checkpoints.len() > self.max_checkpoints {
            // Names embed the zero-padded tick
            checkpoints.sort_by_key(|e| e.file_name());

            let to_remove = checkpoints.len() - self.max_checkpoints;
            for entry in checkpoints.into_iter().take(to_remove) {
                std::fs::remove_file(entry.path())?;
            }
        }

        Ok(())
    }

    /// Find latest checkpoint in directory
    pub fn find_latest(&self) -> Option<PathBuf> {
        self.checkpoint_files()
            .ok()?
            .into_iter()
            .max_by_key(|e| e.file_name())
            .map(|e| e.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{GrassPatch, Position};
    use crate::rng::create_rng;
    use crate::stats::TickRecord;

    fn create_test_checkpoint(tick: u64) -> Checkpoint {
        let mut grid = MultiGrid::new(3, 3);
        grid.place(0, Position::new(1, 2)).unwrap();
        let mut history = PopulationHistory::new();
        history.record(TickRecord {
            tick_index: tick,
            ..TickRecord::default()
        });

        Checkpoint {
            version: Checkpoint::VERSION,
            tick,
            config: Config::default(),
            agents: vec![Agent::grass(0, Position::new(1, 2), GrassPatch::new(true, 4))],
            grid,
            next_agent_id: 1,
            seed: 12345,
            rng: create_rng(12345),
            stats: Stats::default(),
            history,
        }
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.bin");
        let checkpoint = create_test_checkpoint(1000);

        checkpoint.save(&path).unwrap();
        let loaded = Checkpoint::load(&path).unwrap();

        assert_eq!(loaded.tick, checkpoint.tick);
        assert_eq!(loaded.agents, checkpoint.agents);
        assert_eq!(loaded.grid, checkpoint.grid);
        assert_eq!(loaded.history.records, checkpoint.history.records);
        assert_eq!(loaded.seed, checkpoint.seed);
        assert_eq!(loaded.rng, checkpoint.rng);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.bin");
        std::fs::write(&path, b"PRMDxxxx").unwrap();

        assert!(matches!(Checkpoint::load(&path), Err(CheckpointError::InvalidFormat(_))));
    }

    #[test]
    fn test_manager_keeps_latest() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = CheckpointManager::new(dir.path(), 10, 2).unwrap();

        assert!(!manager.should_save(0));
        assert!(!manager.should_save(5));
        for tick in [10, 20, 30] {
            assert!(manager.should_save(tick));
            manager.save(&create_test_checkpoint(tick)).unwrap();
        }
        assert!(!manager.should_save(30));

        assert_eq!(manager.checkpoint_files().unwrap().len(), 2);
        assert_eq!(manager.find_latest(), Some(manager.checkpoint_path(30)));
        assert!(!manager.checkpoint_path(10).exists());
    }

    #[test]
    fn test_checkpoint_size() {
        let size = create_test_checkpoint(1).size_bytes();
        assert!(size > 0);
        assert!(size < 100_000);
    }
}
