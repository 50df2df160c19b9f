//! CLUT stage
//!
//! An N-input grid of output vectors. Nodes are stored with the first
//! input axis varying slowest, matching the ICC table layout.

use crate::error::{Error, Result};
use crate::math::interpolation::{grid_strides, multilinear, tetrahedral};

use super::stages::MAX_CHANNELS;

/// Maximum grid points along a single axis
pub const MAX_GRID_POINTS: usize = 255;

/// Interpolation used between grid nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Multilinear,
    /// Three-input grids only
    Tetrahedral,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClutStage {
    grid: Vec<usize>,
    outputs: usize,
    table: Vec<f64>,
    strides: Vec<usize>,
    interpolation: Interpolation,
}

impl ClutStage {
    /// Build from a filled table
    ///
    /// `grid[i]` is the number of points along input axis `i`.
    pub fn new(grid: &[usize], outputs: usize, table: Vec<f64>) -> Result<Self> {
        let nodes = node_count(grid, outputs)?;
        if table.len() != nodes * outputs {
            return Err(Error::invalid(format!(
                "clut needs {} values, got {}",
                nodes * outputs,
                table.len()
            )));
        }
        Ok(Self {
            grid: grid.to_vec(),
            outputs,
            strides: grid_strides(grid, outputs),
            table,
            interpolation: Interpolation::default(),
        })
    }

    /// Same number of points along every axis
    pub fn uniform(points: usize, inputs: usize, outputs: usize, table: Vec<f64>) -> Result<Self> {
        Self::new(&vec![points; inputs], outputs, table)
    }

    /// Fill a table by calling `sampler` at every node
    ///
    /// The sampler receives the node's normalized input coordinates and
    /// writes `outputs` values.
    pub fn from_fn<F>(grid: &[usize], outputs: usize, mut sampler: F) -> Result<Self>
    where
        F: FnMut(&[f64], &mut [f64]),
    {
        let nodes = node_count(grid, outputs)?;
        let mut table = vec![0.0; nodes * outputs];
        let mut coords = vec![0.0; grid.len()];

        for (node, out) in table.chunks_exact_mut(outputs).enumerate() {
            let mut rest = node;
            for (axis, &points) in grid.iter().enumerate().rev() {
                coords[axis] = (rest % points) as f64 / (points - 1) as f64;
                rest /= points;
            }
            sampler(&coords, out);
        }
        Self::new(grid, outputs, table)
    }

    /// A grid that maps every input to itself
    pub fn identity(points: usize, channels: usize) -> Result<Self> {
        Self::from_fn(&vec![points; channels], channels, |input, output| {
            output.copy_from_slice(input)
        })
    }

    /// Switch interpolation; tetrahedral needs exactly 3 inputs
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Result<Self> {
        if interpolation == Interpolation::Tetrahedral && self.grid.len() != 3 {
            return Err(Error::invalid(format!(
                "tetrahedral interpolation needs 3 inputs, got {}",
                self.grid.len()
            )));
        }
        self.interpolation = interpolation;
        Ok(self)
    }

    pub fn inputs(&self) -> usize {
        self.grid.len()
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn grid(&self) -> &[usize] {
        &self.grid
    }

    pub fn table(&self) -> &[f64] {
        &self.table
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    #[inline]
    pub fn eval(&self, input: &[f64], output: &mut [f64]) {
        let output = &mut output[..self.outputs];
        match self.interpolation {
            Interpolation::Tetrahedral => {
                tetrahedral(&self.table, &self.grid, &self.strides, input, output)
            }
            Interpolation::Multilinear => {
                multilinear(&self.table, &self.grid, &self.strides, input, output)
            }
        }
    }
}

fn node_count(grid: &[usize], outputs: usize) -> Result<usize> {
    if grid.is_empty() || grid.len() > MAX_CHANNELS {
        return Err(Error::invalid(format!(
            "clut needs 1 to {} inputs, got {}",
            MAX_CHANNELS,
            grid.len()
        )));
    }
    if outputs == 0 || outputs > MAX_CHANNELS {
        return Err(Error::invalid(format!(
            "clut needs 1 to {} outputs, got {}",
            MAX_CHANNELS, outputs
        )));
    }
    if let Some(&bad) = grid.iter().find(|&&p| !(2..=MAX_GRID_POINTS).contains(&p)) {
        return Err(Error::invalid(format!(
            "clut grid points must be in 2..={}, got {}",
            MAX_GRID_POINTS, bad
        )));
    }
    grid.iter()
        .try_fold(1usize, |acc, &p| acc.checked_mul(p))
        .filter(|n| n.checked_mul(outputs).is_some())
        .ok_or_else(|| Error::invalid("clut grid too large"))
}
