//! # Error Types
//!
//! A single error enum covers every fatal condition of a conversion run.
//! Samples that fail a validity rule are not errors: they simply produce no
//! feature (cell pipeline) and never reach this module.

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that abort a conversion run.
#[derive(Error, Debug)]
pub enum GridError {
    #[error(
        "input shape mismatch: samples are {rows}x{cols} but coordinates describe {latitudes} latitudes x {longitudes} longitudes"
    )]
    InputShape {
        rows: usize,
        cols: usize,
        latitudes: usize,
        longitudes: usize,
    },

    #[error("coordinate axis '{0}' is not strictly monotonic")]
    NonMonotonic(String),

    #[error("variable '{0}' not found in dataset")]
    MissingVariable(String),

    #[error("unsupported layout for variable '{name}': {rank} dimensions")]
    UnsupportedLayout { name: String, rank: usize },

    #[error("time index {index} out of range for variable '{name}' with {steps} time steps")]
    TimeIndexOutOfRange {
        name: String,
        index: usize,
        steps: usize,
    },

    #[error("resolution must be a positive finite number of degrees, got {0}")]
    InvalidResolution(f64),

    #[error("cannot infer a quantity kind for variable '{0}'; set `quantity` explicitly")]
    UnknownQuantity(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to write output to '{destination}': {source}")]
    Serialization {
        destination: String,
        #[source]
        source: StorageError,
    },

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("table encoding error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for grid conversion operations
pub type GridResult<T> = Result<T, GridError>;
