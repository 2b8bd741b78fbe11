use crate::error::{GridError, GridResult};
use crate::grid::Grid;
use log::debug;
use serde::{Deserialize, Serialize};

/// Inclusive latitude/longitude window applied to a grid before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> GridResult<Self> {
        let bbox = BoundingBox {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Parses `min_lat:max_lat:min_lon:max_lon`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 {
            return Err("Bounding box must be in format 'min_lat:max_lat:min_lon:max_lon'".to_string());
        }

        let mut values = [0.0; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid bounding box value '{}'", part))?;
        }

        BoundingBox::new(values[0], values[1], values[2], values[3]).map_err(|e| e.to_string())
    }

    pub fn validate(&self) -> GridResult<()> {
        let values = [self.min_lat, self.max_lat, self.min_lon, self.max_lon];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GridError::Config("bounding box bounds must be finite".to_string()));
        }
        if self.min_lat > self.max_lat {
            return Err(GridError::Config(format!(
                "bounding box min_lat {} is greater than max_lat {}",
                self.min_lat, self.max_lat
            )));
        }
        if self.min_lon > self.max_lon {
            return Err(GridError::Config(format!(
                "bounding box min_lon {} is greater than max_lon {}",
                self.min_lon, self.max_lon
            )));
        }
        Ok(())
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Restricts `grid` to the rows and columns inside the box, keeping their order.
    pub fn apply(&self, grid: &Grid) -> GridResult<Grid> {
        let rows: Vec<usize> = grid
            .latitudes()
            .iter()
            .enumerate()
            .filter(|(_, lat)| **lat >= self.min_lat && **lat <= self.max_lat)
            .map(|(idx, _)| idx)
            .collect();
        let cols: Vec<usize> = grid
            .longitudes()
            .iter()
            .enumerate()
            .filter(|(_, lon)| **lon >= self.min_lon && **lon <= self.max_lon)
            .map(|(idx, _)| idx)
            .collect();

        debug!(
            "Bounding box kept {} of {} latitudes and {} of {} longitudes",
            rows.len(),
            grid.height(),
            cols.len(),
            grid.width()
        );

        grid.select(&rows, &cols)
    }
}
