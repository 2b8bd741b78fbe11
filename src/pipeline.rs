//! # Conversion Pipelines
//!
//! Two products are built from a [`Grid`]:
//!
//! - **Cells**: one polygon per valid adjacent-corner cell, carrying the mean
//!   of the four converted corner values. Invalid cells are dropped.
//! - **Points**: one point per sample over the full latitude x longitude
//!   cross product. Samples are emitted unconditionally unless
//!   [`PipelineSettings::filter_points`] is set.
//!
//! All tunables travel in an explicit [`PipelineSettings`] value.

use crate::aggregate::{CellRules, aggregate_grid, aggregate_grid_parallel};
use crate::feature::{FeatureCollection, build_cell_feature, build_point_feature};
use crate::grid::Grid;
use crate::quantity::{Quantity, ValidityRule};
use crate::snap::Resolution;
use clap::ValueEnum;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Which feature collection a run produces.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    /// Rectangular cells with corner-averaged values
    #[default]
    Cells,
    /// One point per grid sample
    Points,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Cells => "cells",
            Product::Points => "points",
        }
    }
}

/// Per-run configuration of a pipeline.
pub struct PipelineSettings {
    pub quantity: Quantity,
    pub resolution: Resolution,
    pub property_name: String,
    pub rule: Box<dyn ValidityRule>,
    pub filter_points: bool,
    pub parallel: bool,
}

impl PipelineSettings {
    /// Settings with every quantity default: resolution, property name and rule.
    pub fn for_quantity(quantity: Quantity) -> Self {
        PipelineSettings {
            quantity,
            resolution: quantity.default_resolution(),
            property_name: quantity.property_name().to_string(),
            rule: Box::new(DefaultRule(quantity)),
            filter_points: false,
            parallel: false,
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_property_name(mut self, name: &str) -> Self {
        self.property_name = name.to_string();
        self
    }

    pub fn with_rule(mut self, rule: Box<dyn ValidityRule>) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_point_filtering(mut self, enabled: bool) -> Self {
        self.filter_points = enabled;
        self
    }

    pub fn with_parallelism(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    fn cell_rules(&self) -> CellRules<'_> {
        CellRules {
            convert: self.quantity.converter(),
            rule: self.rule.as_ref(),
            resolution: self.resolution,
        }
    }
}

/// Delegates to the quantity's built-in rule.
struct DefaultRule(Quantity);

impl ValidityRule for DefaultRule {
    fn is_valid(&self, value: f64) -> bool {
        self.0.validity_rule().is_valid(value)
    }

    fn describe(&self) -> String {
        self.0.validity_rule().describe()
    }
}

/// Builds the cell product: at most `(H-1) x (W-1)` polygon features.
pub fn run_cell_pipeline(grid: &Grid, settings: &PipelineSettings) -> FeatureCollection {
    let rules = settings.cell_rules();
    let cells = if settings.parallel {
        aggregate_grid_parallel(grid, &rules)
    } else {
        aggregate_grid(grid, &rules)
    };

    if cells.is_empty() && grid.cell_count() > 0 {
        warn!(
            "No valid cells among {} candidates; every cell failed '{}'",
            grid.cell_count(),
            settings.rule.describe()
        );
    }

    let collection = FeatureCollection::assemble(
        cells
            .iter()
            .map(|cell| build_cell_feature(&cell.corners, cell.value, &settings.property_name)),
    );
    info!(
        "Cell pipeline produced {} features at {} resolution",
        collection.len(),
        settings.resolution
    );
    collection
}

/// Builds the point product: exactly `H x W` features unless filtering is enabled.
pub fn run_point_pipeline(grid: &Grid, settings: &PipelineSettings) -> FeatureCollection {
    let convert = settings.quantity.converter();
    let mut features = Vec::with_capacity(grid.point_count());

    for (i, &lat) in grid.latitudes().iter().enumerate() {
        for (j, &lon) in grid.longitudes().iter().enumerate() {
            let value = convert(grid.samples()[[i, j]]);
            if settings.filter_points && !settings.rule.is_valid(value) {
                continue;
            }
            features.push(build_point_feature(lat, lon, value, &settings.property_name));
        }
    }

    let collection = FeatureCollection::assemble(features);
    info!(
        "Point pipeline produced {} features from {} samples",
        collection.len(),
        grid.point_count()
    );
    collection
}

/// Dispatches to the pipeline for `product`.
pub fn run_pipeline(grid: &Grid, product: Product, settings: &PipelineSettings) -> FeatureCollection {
    match product {
        Product::Cells => run_cell_pipeline(grid, settings),
        Product::Points => run_point_pipeline(grid, settings),
    }
}
