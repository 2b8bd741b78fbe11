//! # nc2geojson
//!
//! Converts gridded reanalysis fields (ERA5-style NetCDF) into GeoJSON
//! feature collections.
//!
//! ## Products
//!
//! - **Cells**: each rectangle of four adjacent samples becomes a polygon
//!   whose property is the mean of its four converted corners. Corners are
//!   snapped to a configurable lattice and invalid cells are dropped.
//! - **Points**: each sample becomes a point feature carrying its converted
//!   value.
//!
//! ## Quantities
//!
//! | variable | quantity | emitted unit | validity |
//! |----------|----------|--------------|----------|
//! | `t2m`, `2t` | temperature | °F | finite and within [-100, 150] |
//! | `swh` | wave height | ft | not NaN |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nc2geojson::{input::JobConfig, process_job};
//!
//! let config = JobConfig::from_file("t2m_cells.json")?;
//! let summary = process_job(&config, false)?;
//! println!("wrote {} features", summary.features);
//! # Ok::<(), nc2geojson::error::GridError>(())
//! ```
//!
//! ## Configuration Example
//!
//! ```json
//! {
//!   "input": "era5_t2m.nc",
//!   "output": "t2m_cells.geojson",
//!   "variable": "t2m",
//!   "product": "cells",
//!   "resolution": 0.1,
//!   "bbox": { "min_lat": 55.0, "max_lat": 65.0, "min_lon": 5.0, "max_lon": 15.0 }
//! }
//! ```

pub mod aggregate;
pub mod cli;
pub mod error;
pub mod feature;
pub mod filters;
pub mod grid;
pub mod info;
pub mod input;
pub mod log;
pub mod output;
pub mod pipeline;
pub mod quantity;
pub mod reader;
pub mod snap;
pub mod storage;
pub mod units;

#[cfg(test)]
mod tests;

use crate::error::{GridError, GridResult};
use crate::feature::FeatureCollection;
use crate::grid::Dataset;
use crate::input::JobConfig;
use crate::output::{OutputFormat, encode_collection, write_encoded};
use crate::pipeline::{Product, run_pipeline};
use crate::reader::load_dataset;
use crate::storage::{Location, fetch_to_local, write_local_output};
use ::log::{debug, info};
use serde::Serialize;
use std::path::Path;

/// Outcome of one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub destination: String,
    pub product: Product,
    pub format: OutputFormat,
    pub features: usize,
    pub bytes: usize,
}

/// Runs the configured pipeline over an already loaded dataset.
///
/// The bounding box, when present, is applied to the grid before any cell is
/// formed, so cells never straddle the box edge.
pub fn convert_dataset(dataset: &Dataset, config: &JobConfig) -> GridResult<FeatureCollection> {
    let mut grid = dataset.grid(&config.variable)?;
    if let Some(bbox) = &config.bbox {
        grid = bbox.apply(&grid)?;
    }

    let settings = config.pipeline_settings()?;
    Ok(run_pipeline(&grid, config.product, &settings))
}

/// Loads the configured variable from a local NetCDF file and converts it.
pub fn convert_file<P: AsRef<Path>>(path: P, config: &JobConfig) -> GridResult<FeatureCollection> {
    config.validate()?;
    let dataset = load_dataset(path, &[config.variable.as_str()], &config.layout())?;
    convert_dataset(&dataset, config)
}

fn encode(collection: &FeatureCollection, config: &JobConfig) -> GridResult<(OutputFormat, Vec<u8>)> {
    let format = config.resolve_format();
    let property_name = config.resolve_property_name()?;
    let bytes = encode_collection(collection, config.product, format, &property_name, config.pretty)?;
    Ok((format, bytes))
}

/// Converts a local input into a local output.
///
/// # Errors
///
/// Besides every conversion error, fails with `Config` when either path is an
/// S3 location (use [`process_job_async`]) and with `Serialization` when the
/// output exists and `overwrite` is false.
pub fn process_job(config: &JobConfig, overwrite: bool) -> GridResult<JobSummary> {
    let input = Location::parse(&config.input)?;
    let output = Location::parse(&config.output)?;
    let (Location::Local(input_path), Location::Local(output_path)) = (&input, &output) else {
        return Err(GridError::Config(
            "S3 locations require the async job runner".to_string(),
        ));
    };

    let collection = convert_file(input_path, config)?;
    let (format, bytes) = encode(&collection, config)?;

    write_local_output(output_path, &bytes, overwrite).map_err(|source| {
        GridError::Serialization {
            destination: config.output.clone(),
            source,
        }
    })?;

    info!("Wrote {} features to {}", collection.len(), config.output);
    Ok(JobSummary {
        destination: config.output.clone(),
        product: config.product,
        format,
        features: collection.len(),
        bytes: bytes.len(),
    })
}

/// Converts an input into an output, either of which may live in S3.
///
/// Remote inputs are downloaded to a temporary file that is removed when the
/// run finishes.
pub async fn process_job_async(config: &JobConfig, overwrite: bool) -> GridResult<JobSummary> {
    config.validate()?;
    let input = Location::parse(&config.input)?;
    let local_input = fetch_to_local(&input).await?;
    debug!("Reading {} from {}", config.variable, local_input.path().display());

    let collection = convert_file(local_input.path(), config)?;
    let (format, bytes) = encode(&collection, config)?;
    write_encoded(&config.output, &bytes, overwrite).await?;

    info!("Wrote {} features to {}", collection.len(), config.output);
    Ok(JobSummary {
        destination: config.output.clone(),
        product: config.product,
        format,
        features: collection.len(),
        bytes: bytes.len(),
    })
}
