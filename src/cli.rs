//! # CLI Module
//!
//! Command-line interface for nc2geojson:
//! - argument parsing with clap
//! - configuration files (JSON/YAML) with `NC2GEOJSON_` environment overrides
//! - merging with priority CLI > environment > config file > defaults
//! - templates and shell completions

use crate::error::{GridError, GridResult};
use crate::filters::BoundingBox;
use crate::input::JobConfig;
use crate::output::OutputFormat;
use crate::pipeline::Product;
use crate::quantity::{Quantity, ValidityConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Convert gridded NetCDF fields into GeoJSON cell and point collections
#[derive(Parser, Debug)]
#[command(name = "nc2geojson")]
#[command(about = "Convert gridded NetCDF fields into GeoJSON feature collections")]
#[command(version)]
#[command(long_about = "
nc2geojson turns gridded reanalysis fields (2-meter temperature, significant
wave height) into GeoJSON feature collections ready for map rendering.

PRODUCTS:
  • cells: one polygon per four adjacent samples, valued by the corner mean
  • points: one point per sample

EXAMPLES:
  # Temperature cells at the default 0.1° lattice
  nc2geojson convert era5_t2m.nc t2m.geojson -n t2m

  # Wave height points inside a bounding box
  nc2geojson convert era5_swh.nc swh.geojson -n swh --product points \\
    --bbox=55:65:5:15

  # S3 input, CSV output
  nc2geojson convert s3://bucket/t2m.nc t2m.csv -n t2m

  # Using a config file
  nc2geojson convert --config t2m.yaml

  # File inspection
  nc2geojson info era5_t2m.nc --detailed
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "NC2GEOJSON_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a NetCDF variable into a feature collection
    Convert(ConvertArgs),

    /// Validate a configuration file without converting
    Validate {
        /// Configuration file to validate (defaults to --config)
        config_file: Option<PathBuf>,

        /// Also check that a local input file exists
        #[arg(long)]
        detailed: bool,
    },

    /// Show dimensions, variables and recognised quantities of a NetCDF file
    Info {
        /// NetCDF file path (local or S3)
        file: String,

        /// Include every attribute
        #[arg(long)]
        detailed: bool,

        /// Show only this variable
        #[arg(short = 'n', long)]
        variable: Option<String>,

        #[arg(long, value_enum, default_value_t = DisplayFormat::Human)]
        format: DisplayFormat,
    },

    /// Generate a configuration template
    Template {
        #[arg(value_enum)]
        template_type: TemplateType,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Arguments of `convert`. Every option overrides the config file when given.
#[derive(Args, Debug, Clone, Default)]
pub struct ConvertArgs {
    /// Input NetCDF path (local or s3://bucket/key)
    #[arg(value_name = "INPUT", env = "NC2GEOJSON_INPUT")]
    pub input: Option<String>,

    /// Output path (local or s3://bucket/key)
    #[arg(value_name = "OUTPUT", env = "NC2GEOJSON_OUTPUT")]
    pub output: Option<String>,

    /// Variable to convert, e.g. t2m or swh
    #[arg(short = 'n', long, env = "NC2GEOJSON_VARIABLE")]
    pub variable: Option<String>,

    #[arg(short, long, value_enum, env = "NC2GEOJSON_PRODUCT")]
    pub product: Option<Product>,

    /// Snapping resolution in degrees
    #[arg(short, long, env = "NC2GEOJSON_RESOLUTION")]
    pub resolution: Option<f64>,

    /// Quantity kind when it cannot be inferred from the variable name
    #[arg(long, value_enum, env = "NC2GEOJSON_QUANTITY")]
    pub quantity: Option<Quantity>,

    /// Time step to convert for variables with a time axis
    #[arg(long, env = "NC2GEOJSON_TIME_INDEX")]
    pub time_index: Option<usize>,

    #[arg(long, env = "NC2GEOJSON_LAT_NAME")]
    pub lat_name: Option<String>,

    #[arg(long, env = "NC2GEOJSON_LON_NAME")]
    pub lon_name: Option<String>,

    /// Bounding box: min_lat:max_lat:min_lon:max_lon
    #[arg(long, value_parser = BoundingBox::parse, allow_hyphen_values = true, env = "NC2GEOJSON_BBOX")]
    pub bbox: Option<BoundingBox>,

    /// Output encoding (default: from the output extension)
    #[arg(short, long, value_enum, env = "NC2GEOJSON_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Property name carried by each feature
    #[arg(long, env = "NC2GEOJSON_PROPERTY")]
    pub property: Option<String>,

    /// Accept only finite values in [MIN, MAX]: min:max
    #[arg(
        long,
        value_parser = parse_valid_range,
        allow_hyphen_values = true,
        env = "NC2GEOJSON_VALID_RANGE"
    )]
    pub valid_range: Option<ValidityConfig>,

    /// Drop invalid samples from point products
    #[arg(long, env = "NC2GEOJSON_FILTER_POINTS")]
    pub filter_points: bool,

    /// Aggregate cells on all cores
    #[arg(long, env = "NC2GEOJSON_PARALLEL")]
    pub parallel: bool,

    /// Pretty-print GeoJSON
    #[arg(long, env = "NC2GEOJSON_PRETTY")]
    pub pretty: bool,

    /// Overwrite an existing local output
    #[arg(long, env = "NC2GEOJSON_FORCE")]
    pub force: bool,

    /// Validate the merged configuration without converting
    #[arg(long, env = "NC2GEOJSON_DRY_RUN")]
    pub dry_run: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayFormat {
    /// Human-readable output
    Human,
    Json,
    Yaml,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateType {
    /// Temperature cells at 0.1°
    CellsTemperature,
    /// Wave height cells at 0.25°
    CellsWaveHeight,
    /// Temperature points
    PointsTemperature,
    /// Temperature cells from S3 with a bounding box
    S3,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

/// Parses `min:max` into a range-and-finiteness rule.
fn parse_valid_range(s: &str) -> Result<ValidityConfig, String> {
    let (min, max) = s
        .split_once(':')
        .ok_or_else(|| "Valid range must be in format 'min:max'".to_string())?;
    let min: f64 = min
        .trim()
        .parse()
        .map_err(|_| format!("Invalid minimum '{}'", min))?;
    let max: f64 = max
        .trim()
        .parse()
        .map_err(|_| format!("Invalid maximum '{}'", max))?;
    if min > max {
        return Err(format!("Minimum {} is greater than maximum {}", min, max));
    }
    Ok(ValidityConfig::RangeAndFiniteness { min, max })
}

/// Builds the job configuration from an optional base file and CLI arguments.
///
/// Arguments (already resolved against the environment by clap) override the
/// base; flags can only switch behaviour on.
pub fn merge_config(base: Option<JobConfig>, args: &ConvertArgs) -> GridResult<JobConfig> {
    let mut config = match base {
        Some(config) => config,
        None => {
            let missing: Vec<&str> = [
                ("INPUT", args.input.is_none()),
                ("OUTPUT", args.output.is_none()),
                ("--variable", args.variable.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            if !missing.is_empty() {
                return Err(GridError::Config(format!(
                    "missing {} (pass them or use --config)",
                    missing.join(", ")
                )));
            }
            JobConfig::new("", "", "")
        }
    };

    if let Some(input) = &args.input {
        config.input = input.clone();
    }
    if let Some(output) = &args.output {
        config.output = output.clone();
    }
    if let Some(variable) = &args.variable {
        config.variable = variable.clone();
    }
    if let Some(product) = args.product {
        config.product = product;
    }
    if let Some(resolution) = args.resolution {
        config.resolution = Some(resolution);
    }
    if let Some(quantity) = args.quantity {
        config.quantity = Some(quantity);
    }
    if let Some(time_index) = args.time_index {
        config.time_index = time_index;
    }
    if let Some(name) = &args.lat_name {
        config.latitude_name = name.clone();
    }
    if let Some(name) = &args.lon_name {
        config.longitude_name = name.clone();
    }
    if let Some(bbox) = args.bbox {
        config.bbox = Some(bbox);
    }
    if let Some(format) = args.format {
        config.format = Some(format);
    }
    if let Some(property) = &args.property {
        config.property_name = Some(property.clone());
    }
    if let Some(validity) = &args.valid_range {
        config.validity = Some(validity.clone());
    }
    config.filter_points |= args.filter_points;
    config.parallel |= args.parallel;
    config.pretty |= args.pretty;

    config.validate()?;
    Ok(config)
}

pub fn template_config(template: TemplateType) -> JobConfig {
    let t2m = Quantity::Temperature.variable_name();
    let swh = Quantity::WaveHeight.variable_name();
    match template {
        TemplateType::CellsTemperature => {
            let mut config = JobConfig::new("era5_t2m.nc", "t2m_cells.geojson", t2m);
            config.resolution = Some(0.1);
            config
        }
        TemplateType::CellsWaveHeight => {
            let mut config = JobConfig::new("era5_swh.nc", "swh_cells.geojson", swh);
            config.resolution = Some(0.25);
            config
        }
        TemplateType::PointsTemperature => {
            let mut config = JobConfig::new("era5_t2m.nc", "t2m_points.geojson", t2m);
            config.product = Product::Points;
            config
        }
        TemplateType::S3 => {
            let mut config = JobConfig::new(
                "s3://my-bucket/era5/t2m.nc",
                "s3://my-bucket/geojson/t2m_cells.geojson",
                t2m,
            );
            config.bbox = Some(BoundingBox {
                min_lat: 55.0,
                max_lat: 65.0,
                min_lon: 5.0,
                max_lon: 15.0,
            });
            config.parallel = true;
            config
        }
    }
}

pub fn render_template(template: TemplateType, format: ConfigFormat) -> GridResult<String> {
    let config = template_config(template);
    match format {
        ConfigFormat::Json => config.to_json(),
        ConfigFormat::Yaml => config.to_yaml(),
    }
}
