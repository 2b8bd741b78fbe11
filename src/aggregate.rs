//! # Cell Aggregation
//!
//! A cell is the rectangle spanned by four adjacent samples
//! `(i, j)`, `(i, j+1)`, `(i+1, j)` and `(i+1, j+1)`. Each corner is converted
//! to the emitted unit first, then checked against the validity rule, so range
//! checks see converted values. A cell with any invalid corner, or whose mean
//! fails the same rule, yields nothing.
//!
//! Cells are visited in ascending `(i, j)` order. The parallel variant splits
//! the work by latitude row and merges rows back in order, so both variants
//! produce identical sequences.

use crate::grid::Grid;
use crate::quantity::ValidityRule;
use crate::snap::{Resolution, snap};
use log::debug;
use rayon::prelude::*;

/// Lattice-snapped bounds of a cell; `lat1`/`lon1` come from the lower indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellCorners {
    pub lat1: f64,
    pub lat2: f64,
    pub lon1: f64,
    pub lon2: f64,
}

/// A cell that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellAggregate {
    pub row: usize,
    pub col: usize,
    pub corners: CellCorners,
    pub value: f64,
}

/// Conversion, validity and snapping settings shared by every cell of a run.
#[derive(Clone, Copy)]
pub struct CellRules<'a> {
    pub convert: fn(f64) -> f64,
    pub rule: &'a dyn ValidityRule,
    pub resolution: Resolution,
}

/// Aggregates the cell whose lower-index corner is `(i, j)`.
///
/// Returns `None` when the indices leave no room for a cell or when the cell
/// fails validation.
pub fn aggregate_cell(grid: &Grid, i: usize, j: usize, rules: &CellRules<'_>) -> Option<CellAggregate> {
    if i + 1 >= grid.height() || j + 1 >= grid.width() {
        return None;
    }

    let raw = [
        grid.sample(i, j)?,
        grid.sample(i, j + 1)?,
        grid.sample(i + 1, j)?,
        grid.sample(i + 1, j + 1)?,
    ];
    let converted = raw.map(rules.convert);
    if !converted.iter().all(|&v| rules.rule.is_valid(v)) {
        return None;
    }

    let mean = converted.iter().sum::<f64>() / converted.len() as f64;
    if !rules.rule.is_valid(mean) {
        return None;
    }

    let latitudes = grid.latitudes();
    let longitudes = grid.longitudes();
    let corners = CellCorners {
        lat1: snap(latitudes[i], rules.resolution),
        lat2: snap(latitudes[i + 1], rules.resolution),
        lon1: snap(longitudes[j], rules.resolution),
        lon2: snap(longitudes[j + 1], rules.resolution),
    };

    Some(CellAggregate {
        row: i,
        col: j,
        corners,
        value: mean,
    })
}

fn aggregate_row(grid: &Grid, i: usize, rules: &CellRules<'_>) -> Vec<CellAggregate> {
    (0..grid.width().saturating_sub(1))
        .filter_map(|j| aggregate_cell(grid, i, j, rules))
        .collect()
}

/// Aggregates every cell of the grid in ascending `(i, j)` order.
pub fn aggregate_grid(grid: &Grid, rules: &CellRules<'_>) -> Vec<CellAggregate> {
    let cells: Vec<CellAggregate> = (0..grid.height().saturating_sub(1))
        .flat_map(|i| aggregate_row(grid, i, rules))
        .collect();
    log_skipped(grid, cells.len());
    cells
}

/// Row-parallel variant of [`aggregate_grid`] with identical output order.
pub fn aggregate_grid_parallel(grid: &Grid, rules: &CellRules<'_>) -> Vec<CellAggregate> {
    let rows: Vec<Vec<CellAggregate>> = (0..grid.height().saturating_sub(1))
        .into_par_iter()
        .map(|i| aggregate_row(grid, i, rules))
        .collect();
    let cells: Vec<CellAggregate> = rows.into_iter().flatten().collect();
    log_skipped(grid, cells.len());
    cells
}

fn log_skipped(grid: &Grid, kept: usize) {
    debug!(
        "Aggregated {} of {} cells ({} skipped as invalid)",
        kept,
        grid.cell_count(),
        grid.cell_count() - kept
    );
}
