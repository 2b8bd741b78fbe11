//! # Output Encoding
//!
//! A [`FeatureCollection`] is written as GeoJSON by default. The same
//! features can be flattened into a polars [`DataFrame`] and written as CSV
//! or Parquet instead:
//!
//! | product | columns |
//! |---------|---------|
//! | points  | `longitude`, `latitude`, `<property>` |
//! | cells   | `min_lon`, `min_lat`, `max_lon`, `max_lat`, `<property>` |
//!
//! Encoding happens in memory; the bytes are then handed to the storage layer
//! so local and S3 destinations behave the same.

use crate::error::{GridError, GridResult};
use crate::feature::{Feature, FeatureCollection, Geometry};
use crate::pipeline::Product;
use crate::storage::{Location, write_output};
use clap::ValueEnum;
use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[value(name = "geojson")]
    GeoJson,
    Csv,
    Parquet,
}

impl OutputFormat {
    /// Guesses the format from the file extension; GeoJSON when unknown.
    pub fn from_path(path: &str) -> Self {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => OutputFormat::Csv,
            Some("parquet") | Some("pq") => OutputFormat::Parquet,
            _ => OutputFormat::GeoJson,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::GeoJson => "geojson",
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Encodes `collection` into the bytes of `format`.
pub fn encode_collection(
    collection: &FeatureCollection,
    product: Product,
    format: OutputFormat,
    property_name: &str,
    pretty: bool,
) -> GridResult<Vec<u8>> {
    match format {
        OutputFormat::GeoJson => Ok(collection.to_json(pretty)?),
        OutputFormat::Csv => {
            let mut df = features_to_dataframe(collection, product, property_name)?;
            let mut buffer = Vec::new();
            CsvWriter::new(&mut buffer)
                .include_header(true)
                .finish(&mut df)?;
            Ok(buffer)
        }
        OutputFormat::Parquet => {
            let mut df = features_to_dataframe(collection, product, property_name)?;
            let mut buffer = Vec::new();
            ParquetWriter::new(&mut buffer).finish(&mut df)?;
            Ok(buffer)
        }
    }
}

/// Flattens features into one row each. Missing properties become NaN.
pub fn features_to_dataframe(
    collection: &FeatureCollection,
    product: Product,
    property_name: &str,
) -> GridResult<DataFrame> {
    let values: Vec<f64> = collection
        .iter()
        .map(|feature| feature.property(property_name).unwrap_or(f64::NAN))
        .collect();

    let df = match product {
        Product::Points => {
            let (lons, lats): (Vec<f64>, Vec<f64>) =
                collection.iter().map(point_position).unzip();
            DataFrame::new(vec![
                Column::new("longitude".into(), lons),
                Column::new("latitude".into(), lats),
                Column::new(property_name.into(), values),
            ])?
        }
        Product::Cells => {
            let bounds: Vec<[f64; 4]> = collection.iter().map(cell_bounds).collect();
            let column = |name: &str, k: usize| {
                Column::new(name.into(), bounds.iter().map(|b| b[k]).collect::<Vec<f64>>())
            };
            DataFrame::new(vec![
                column("min_lon", 0),
                column("min_lat", 1),
                column("max_lon", 2),
                column("max_lat", 3),
                Column::new(property_name.into(), values),
            ])?
        }
    };

    debug!("Flattened features into a {:?} table", df.shape());
    Ok(df)
}

fn point_position(feature: &Feature) -> (f64, f64) {
    match &feature.geometry {
        Geometry::Point { coordinates } => (coordinates[0], coordinates[1]),
        Geometry::Polygon { .. } => (f64::NAN, f64::NAN),
    }
}

/// `[min_lon, min_lat, max_lon, max_lat]` of a cell's exterior ring.
fn cell_bounds(feature: &Feature) -> [f64; 4] {
    let ring = feature.geometry.exterior().unwrap_or(&[]);
    if ring.is_empty() {
        return [f64::NAN; 4];
    }
    ring.iter().fold(
        [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
        |[min_lon, min_lat, max_lon, max_lat], [lon, lat]| {
            [
                min_lon.min(*lon),
                min_lat.min(*lat),
                max_lon.max(*lon),
                max_lat.max(*lat),
            ]
        },
    )
}

/// Writes encoded bytes to `destination` through the storage layer.
pub async fn write_encoded(destination: &str, bytes: &[u8], overwrite: bool) -> GridResult<()> {
    let location = Location::parse(destination)?;
    write_output(&location, bytes, overwrite)
        .await
        .map_err(|source| GridError::Serialization {
            destination: destination.to_string(),
            source,
        })
}
