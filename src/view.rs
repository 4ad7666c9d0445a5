//! Read-only render snapshots for visualization front ends.
//!
//! Everything here is a copy; nothing borrows engine state.

use crate::agent::{AgentSummary, Breed};
use serde::{Deserialize, Serialize};

/// Drawing hint for one agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portrayal {
    pub shape: Shape,
    pub color: &'static str,
    /// Radius for circles, side length for rects (in cells)
    pub size: f32,
    /// Higher layers draw on top
    pub layer: u8,
    pub filled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Circle,
    Rect,
}

impl Portrayal {
    pub fn of(agent: &AgentSummary) -> Self {
        match agent.breed {
            Breed::Prey => Self {
                shape: Shape::Circle,
                color: "grey",
                size: 0.2,
                layer: 1,
                filled: true,
            },
            Breed::Predator => Self {
                shape: Shape::Circle,
                color: "black",
                size: 0.5,
                layer: 1,
                filled: true,
            },
            Breed::Resource => Self {
                shape: Shape::Rect,
                color: if agent.is_grown == Some(true) { "green" } else { "#84e184" },
                size: 1.0,
                layer: 0,
                filled: true,
            },
        }
    }
}

/// Occupants of one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellView {
    pub x: usize,
    pub y: usize,
    pub agents: Vec<AgentSummary>,
}

/// Whole-grid snapshot taken between ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub tick: u64,
    pub width: usize,
    pub height: usize,
    /// Non-empty cells only, row by row
    pub cells: Vec<CellView>,
}

impl Frame {
    pub fn agent_count(&self) -> usize {
        self.cells.iter().map(|c| c.agents.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// One character per cell: `W` predator, `s` prey, `"` grown grass,
    /// `.` anything else
    pub fn to_ascii(&self) -> String {
        let mut rows = vec![vec!['.'; self.width]; self.height];
        for cell in &self.cells {
            let glyph = if cell.agents.iter().any(|a| a.breed == Breed::Predator) {
                'W'
            } else if cell.agents.iter().any(|a| a.breed == Breed::Prey) {
                's'
            } else if cell.agents.iter().any(|a| a.is_grown == Some(true)) {
                '"'
            } else {
                '.'
            };
            rows[cell.y][cell.x] = glyph;
        }
        rows.into_iter()
            .map(|row| row.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Position;

    fn summary(id: u64, breed: Breed, is_grown: Option<bool>) -> AgentSummary {
        AgentSummary {
            id,
            breed,
            position: Position::new(0, 0),
            energy: None,
            age: None,
            is_grown,
        }
    }

    #[test]
    fn test_portrayal_per_breed() {
        let predator = Portrayal::of(&summary(1, Breed::Predator, None));
        let prey = Portrayal::of(&summary(2, Breed::Prey, None));
        let grass = Portrayal::of(&summary(3, Breed::Resource, Some(true)));

        assert_eq!(predator.color, "black");
        assert!(predator.size > prey.size);
        assert_eq!(grass.shape, Shape::Rect);
        assert!(grass.layer < prey.layer);
    }

    #[test]
    fn test_ascii_render() {
        let frame = Frame {
            tick: 0,
            width: 3,
            height: 2,
            cells: vec![
                CellView {
                    x: 0,
                    y: 0,
                    agents: vec![summary(1, Breed::Resource, Some(true)), summary(2, Breed::Prey, None)],
                },
                CellView {
                    x: 2,
                    y: 1,
                    agents: vec![summary(3, Breed::Predator, None)],
                },
                CellView {
                    x: 1,
                    y: 1,
                    agents: vec![summary(4, Breed::Resource, Some(true))],
                },
            ],
        };

        assert_eq!(frame.to_ascii(), "s..\n.\"W");
        assert_eq!(frame.agent_count(), 4);
    }
}
