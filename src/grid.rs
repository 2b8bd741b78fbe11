//! # Grid Data Model
//!
//! A [`Grid`] is an immutable snapshot of one scalar field sampled on a
//! rectilinear latitude/longitude lattice. Construction validates that the
//! sample array matches the coordinate axes and that both axes are strictly
//! monotonic, so every later stage can index without re-checking.
//!
//! A [`Dataset`] holds the shared coordinate axes plus any number of named
//! 2D variables, and hands out grids through a typed accessor.

use crate::error::{GridError, GridResult};
use ndarray::{Array2, Axis};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    samples: Array2<f64>,
}

impl Grid {
    /// Builds a grid, checking `samples` is `latitudes.len() x longitudes.len()`.
    ///
    /// ```rust
    /// use nc2geojson::grid::Grid;
    /// use ndarray::array;
    ///
    /// let grid = Grid::new(
    ///     vec![10.0, 10.1],
    ///     vec![20.0, 20.1, 20.2],
    ///     array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
    /// )?;
    /// assert_eq!(grid.cell_count(), 2);
    /// # Ok::<(), nc2geojson::error::GridError>(())
    /// ```
    pub fn new(latitudes: Vec<f64>, longitudes: Vec<f64>, samples: Array2<f64>) -> GridResult<Self> {
        let (rows, cols) = samples.dim();
        if rows != latitudes.len() || cols != longitudes.len() {
            return Err(GridError::InputShape {
                rows,
                cols,
                latitudes: latitudes.len(),
                longitudes: longitudes.len(),
            });
        }
        ensure_strictly_monotonic("latitude", &latitudes)?;
        ensure_strictly_monotonic("longitude", &longitudes)?;

        Ok(Grid {
            latitudes,
            longitudes,
            samples,
        })
    }

    /// Builds a grid from row-major nested rows, as produced by hand or in tests.
    pub fn from_rows(
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
        rows: Vec<Vec<f64>>,
    ) -> GridResult<Self> {
        let height = rows.len();
        let width = rows.first().map_or(longitudes.len(), Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != width) {
            return Err(GridError::InputShape {
                rows: height,
                cols: bad.len(),
                latitudes: latitudes.len(),
                longitudes: longitudes.len(),
            });
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let samples = Array2::from_shape_vec((height, width), flat).map_err(|_| {
            GridError::InputShape {
                rows: height,
                cols: width,
                latitudes: latitudes.len(),
                longitudes: longitudes.len(),
            }
        })?;
        Grid::new(latitudes, longitudes, samples)
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    /// Number of latitude rows (`H`).
    pub fn height(&self) -> usize {
        self.latitudes.len()
    }

    /// Number of longitude columns (`W`).
    pub fn width(&self) -> usize {
        self.longitudes.len()
    }

    pub fn sample(&self, row: usize, col: usize) -> Option<f64> {
        self.samples.get((row, col)).copied()
    }

    /// Number of adjacent-corner cells, `(H-1) x (W-1)`.
    pub fn cell_count(&self) -> usize {
        self.height().saturating_sub(1) * self.width().saturating_sub(1)
    }

    /// Number of sample points, `H x W`.
    pub fn point_count(&self) -> usize {
        self.height() * self.width()
    }

    /// Returns a new grid restricted to the given row and column indices.
    ///
    /// Indices must be ascending for the result to stay monotonic.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> GridResult<Grid> {
        let latitudes = rows.iter().map(|&i| self.latitudes[i]).collect();
        let longitudes = cols.iter().map(|&j| self.longitudes[j]).collect();
        let samples = self.samples.select(Axis(0), rows).select(Axis(1), cols);
        Grid::new(latitudes, longitudes, samples)
    }
}

fn ensure_strictly_monotonic(axis: &str, values: &[f64]) -> GridResult<()> {
    if values.len() < 2 {
        if values.iter().any(|v| v.is_nan()) {
            return Err(GridError::NonMonotonic(axis.to_string()));
        }
        return Ok(());
    }
    let increasing = values.windows(2).all(|w| w[0] < w[1]);
    let decreasing = values.windows(2).all(|w| w[0] > w[1]);
    if increasing || decreasing {
        Ok(())
    } else {
        Err(GridError::NonMonotonic(axis.to_string()))
    }
}

/// Coordinate axes plus named 2D variables sharing them.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    variables: BTreeMap<String, Array2<f64>>,
}

impl Dataset {
    pub fn new(latitudes: Vec<f64>, longitudes: Vec<f64>) -> Self {
        Dataset {
            latitudes,
            longitudes,
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, name: &str, samples: Array2<f64>) -> Self {
        self.insert_variable(name, samples);
        self
    }

    pub fn insert_variable(&mut self, name: &str, samples: Array2<f64>) {
        self.variables.insert(name.to_string(), samples);
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Typed accessor: the grid for `name`, or `MissingVariable`.
    pub fn grid(&self, name: &str) -> GridResult<Grid> {
        let samples = self
            .variables
            .get(name)
            .ok_or_else(|| GridError::MissingVariable(name.to_string()))?;
        Grid::new(self.latitudes.clone(), self.longitudes.clone(), samples.clone())
    }
}
