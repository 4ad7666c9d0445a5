//! Error types for the simulation engine.

use crate::agent::{AgentId, Position};
use thiserror::Error;

/// Configuration rejected at load or initialization time
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value outside its documented range
    #[error("invalid configuration: `{field}` {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Grid operation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("position ({}, {}) is outside the {width}x{height} grid", .pos.x, .pos.y)]
    OutOfBounds {
        pos: Position,
        width: usize,
        height: usize,
    },

    /// Diagnostic only: removing an id that is not in the cell
    #[error("agent {id} is not present at ({}, {})", .pos.x, .pos.y)]
    NotPresent { id: AgentId, pos: Position },
}

/// Engine-level failures
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    /// Registry and grid disagree; state is corrupt
    #[error("internal consistency violated: {0}")]
    Consistency(String),
}

pub type SimResult<T> = Result<T, SimError>;
