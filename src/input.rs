//! # Job Configuration
//!
//! A [`JobConfig`] carries everything one conversion run needs: where to read
//! the grid, which variable and quantity to convert, which product to build,
//! the snapping resolution, and where to write the result. It is loaded from
//! JSON or YAML and can be overridden from the command line.
//!
//! ## Example
//!
//! ```rust
//! use nc2geojson::input::JobConfig;
//! use nc2geojson::pipeline::Product;
//!
//! let json = r#"
//! {
//!   "input": "era5_t2m.nc",
//!   "output": "grid.geojson",
//!   "variable": "t2m",
//!   "resolution": 0.1
//! }"#;
//! let config = JobConfig::from_json(json)?;
//! assert_eq!(config.product, Product::Cells);
//! # Ok::<(), nc2geojson::error::GridError>(())
//! ```

use crate::error::{GridError, GridResult};
use crate::filters::BoundingBox;
use crate::output::OutputFormat;
use crate::pipeline::{PipelineSettings, Product};
use crate::quantity::{Quantity, ValidityConfig};
use crate::reader::GridLayout;
use crate::snap::Resolution;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_latitude_name() -> String {
    "latitude".to_string()
}

fn default_longitude_name() -> String {
    "longitude".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Input NetCDF path (local or `s3://bucket/key`)
    pub input: String,
    /// Output path (local or `s3://bucket/key`)
    pub output: String,
    /// Variable to convert, e.g. `t2m` or `swh`
    pub variable: String,
    /// Quantity kind; inferred from `variable` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Quantity>,
    #[serde(default)]
    pub product: Product,
    /// Snapping resolution in degrees; quantity default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<f64>,
    #[serde(default = "default_latitude_name")]
    pub latitude_name: String,
    #[serde(default = "default_longitude_name")]
    pub longitude_name: String,
    /// Step of a leading time axis to convert
    #[serde(default)]
    pub time_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    /// Validity rule override; quantity default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<ValidityConfig>,
    /// Drop invalid samples from point products too
    #[serde(default)]
    pub filter_points: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    /// Output encoding; inferred from the output extension when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub pretty: bool,
}

impl JobConfig {
    /// Minimal configuration with every optional field at its default.
    pub fn new(input: &str, output: &str, variable: &str) -> Self {
        JobConfig {
            input: input.to_string(),
            output: output.to_string(),
            variable: variable.to_string(),
            quantity: None,
            product: Product::default(),
            resolution: None,
            latitude_name: default_latitude_name(),
            longitude_name: default_longitude_name(),
            time_index: 0,
            property_name: None,
            validity: None,
            filter_points: false,
            bbox: None,
            format: None,
            parallel: false,
            pretty: false,
        }
    }

    /// Loads a configuration from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> GridResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn from_json(json_str: &str) -> GridResult<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn from_yaml(yaml_str: &str) -> GridResult<Self> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    pub fn to_json(&self) -> GridResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> GridResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// The configured quantity, or the one implied by the variable name.
    pub fn resolve_quantity(&self) -> GridResult<Quantity> {
        self.quantity
            .or_else(|| Quantity::from_variable(&self.variable))
            .ok_or_else(|| GridError::UnknownQuantity(self.variable.clone()))
    }

    pub fn resolve_resolution(&self) -> GridResult<Resolution> {
        match self.resolution {
            Some(degrees) => Resolution::new(degrees),
            None => Ok(self.resolve_quantity()?.default_resolution()),
        }
    }

    pub fn resolve_property_name(&self) -> GridResult<String> {
        match &self.property_name {
            Some(name) => Ok(name.clone()),
            None => Ok(self.resolve_quantity()?.property_name().to_string()),
        }
    }

    pub fn resolve_format(&self) -> OutputFormat {
        self.format
            .unwrap_or_else(|| OutputFormat::from_path(&self.output))
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout {
            latitude_name: self.latitude_name.clone(),
            longitude_name: self.longitude_name.clone(),
            time_index: self.time_index,
        }
    }

    /// Builds the pipeline settings, applying every override over quantity defaults.
    pub fn pipeline_settings(&self) -> GridResult<PipelineSettings> {
        let quantity = self.resolve_quantity()?;
        let mut settings = PipelineSettings::for_quantity(quantity)
            .with_resolution(self.resolve_resolution()?)
            .with_point_filtering(self.filter_points)
            .with_parallelism(self.parallel);
        if let Some(name) = &self.property_name {
            settings = settings.with_property_name(name);
        }
        if let Some(validity) = &self.validity {
            settings = settings.with_rule(validity.to_rule());
        }
        Ok(settings)
    }

    /// Checks every field that can be checked without touching the input.
    pub fn validate(&self) -> GridResult<()> {
        if self.input.trim().is_empty() {
            return Err(GridError::Config("input path is empty".to_string()));
        }
        if self.output.trim().is_empty() {
            return Err(GridError::Config("output path is empty".to_string()));
        }
        if self.variable.trim().is_empty() {
            return Err(GridError::Config("variable name is empty".to_string()));
        }
        if let Some(name) = &self.property_name {
            if name.trim().is_empty() {
                return Err(GridError::Config("property name is empty".to_string()));
            }
        }
        if let Some(ValidityConfig::RangeAndFiniteness { min, max }) = &self.validity {
            if min > max {
                return Err(GridError::Config(format!(
                    "validity range min {} is greater than max {}",
                    min, max
                )));
            }
        }
        if let Some(bbox) = &self.bbox {
            bbox.validate()?;
        }
        self.resolve_quantity()?;
        self.resolve_resolution()?;
        Ok(())
    }
}
