//! Toroidal multi-occupancy grid with neighborhood queries.

use crate::agent::{AgentId, Position};
use crate::error::GridError;
use crate::rng::SimRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Neighborhood shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Neighborhood {
    /// 8-connected square (Chebyshev distance)
    Moore,
    /// 4-connected diamond (Manhattan distance)
    VonNeumann,
}

/// Fixed-size grid whose edges wrap. Any number of agents may share a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiGrid {
    width: usize,
    height: usize,
    /// cells[y * width + x] holds occupant ids in insertion order
    cells: Vec<Vec<AgentId>>,
}

impl MultiGrid {
    /// Create an empty grid
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Vec::new(); width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Map any signed coordinate onto the torus
    #[inline]
    pub fn wrap(&self, x: i64, y: i64) -> Position {
        Position::new(
            x.rem_euclid(self.width as i64) as usize,
            y.rem_euclid(self.height as i64) as usize,
        )
    }

    #[inline]
    fn index(&self, pos: Position) -> Result<usize, GridError> {
        if self.in_bounds(pos) {
            Ok(pos.y * self.width + pos.x)
        } else {
            Err(GridError::OutOfBounds {
                pos,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Insert an agent into a cell
    pub fn place(&mut self, id: AgentId, pos: Position) -> Result<(), GridError> {
        let idx = self.index(pos)?;
        self.cells[idx].push(id);
        Ok(())
    }

    /// Remove an agent from a cell, keeping the order of the others
    pub fn remove(&mut self, id: AgentId, pos: Position) -> Result<(), GridError> {
        let idx = self.index(pos)?;
        let cell = &mut self.cells[idx];
        match cell.iter().position(|&other| other == id) {
            Some(i) => {
                cell.remove(i);
                Ok(())
            }
            None => Err(GridError::NotPresent { id, pos }),
        }
    }

    /// Relocate an agent. Either both halves happen or neither does.
    pub fn move_agent(&mut self, id: AgentId, from: Position, to: Position) -> Result<(), GridError> {
        let to_idx = self.index(to)?;
        self.remove(id, from)?;
        self.cells[to_idx].push(id);
        Ok(())
    }

    /// Occupants of a single cell; empty for out-of-range positions
    #[inline]
    pub fn occupants(&self, pos: Position) -> &[AgentId] {
        match self.index(pos) {
            Ok(idx) => &self.cells[idx],
            Err(_) => &[],
        }
    }

    #[inline]
    pub fn is_cell_empty(&self, pos: Position) -> bool {
        self.occupants(pos).is_empty()
    }

    /// Total number of placed agents
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }

    /// Iterate over every cell with its occupants, row by row
    pub fn iter_cells(&self) -> impl Iterator<Item = (Position, &[AgentId])> + '_ {
        self.cells.iter().enumerate().map(move |(i, cell)| {
            (Position::new(i % self.width, i / self.width), cell.as_slice())
        })
    }

    /// Distinct wrapped cells around `pos`, scanned row by row.
    ///
    /// On a torus smaller than the neighborhood, offsets that land on the same
    /// cell are reported once, and offsets that wrap back onto `pos` count as
    /// the center. Offsets past the torus size add no new cells, so the scan
    /// is bounded by the grid whatever the radius.
    pub fn neighborhood(
        &self,
        pos: Position,
        shape: Neighborhood,
        radius: usize,
        include_center: bool,
    ) -> Vec<Position> {
        let r = i64::try_from(radius).unwrap_or(i64::MAX);
        let rx = radius.min(self.width.saturating_sub(1));
        let ry = radius.min(self.height.saturating_sub(1));
        let (span_x, span_y) = (2 * rx + 1, 2 * ry + 1);
        let may_alias = span_x > self.width || span_y > self.height;
        let mut seen = if may_alias {
            vec![false; self.width * self.height]
        } else {
            Vec::new()
        };

        let mut cells = Vec::with_capacity((span_x * span_y).min(self.width * self.height));
        for dy in -(ry as i64)..=ry as i64 {
            for dx in -(rx as i64)..=rx as i64 {
                if shape == Neighborhood::VonNeumann && dx.abs() + dy.abs() > r {
                    continue;
                }
                let cell = self.wrap(pos.x as i64 + dx, pos.y as i64 + dy);
                if cell == pos && !include_center {
                    continue;
                }
                if may_alias {
                    let idx = cell.y * self.width + cell.x;
                    if seen[idx] {
                        continue;
                    }
                    seen[idx] = true;
                }
                cells.push(cell);
            }
        }
        cells
    }

    /// Agents occupying the neighborhood of `pos`.
    ///
    /// `radius = 0` with `include_center` yields the occupants of `pos` itself.
    pub fn neighbors(
        &self,
        pos: Position,
        shape: Neighborhood,
        radius: usize,
        include_center: bool,
    ) -> Vec<AgentId> {
        self.neighborhood(pos, shape, radius, include_center)
            .into_iter()
            .flat_map(|cell| self.occupants(cell).iter().copied())
            .collect()
    }

    /// Uniformly random adjacent cell, or `None` when the torus is too small
    /// to have one
    pub fn random_step(&self, pos: Position, shape: Neighborhood, rng: &mut SimRng) -> Option<Position> {
        self.neighborhood(pos, shape, 1, false).choose(rng).copied()
    }
}
