//! # NetCDF Reader
//!
//! Loads coordinate axes and gridded variables from a NetCDF file into an
//! in-memory [`Dataset`].
//!
//! Variables are decoded following CF packing conventions: samples equal to
//! `_FillValue` or `missing_value` become NaN, then `scale_factor` and
//! `add_offset` are applied. Without a `_FillValue` attribute the netCDF
//! default fill for the variable's type is masked instead. Variables with a leading time axis are sliced at
//! the configured time index.

use crate::error::{GridError, GridResult};
use crate::grid::Dataset;
use log::{debug, warn};
use ndarray::{Array2, ArrayD, Axis, Ix2};
use netcdf::types::{FloatType, IntType, NcVariableType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names and slicing used to locate a 2D field inside a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub latitude_name: String,
    pub longitude_name: String,
    pub time_index: usize,
}

impl Default for GridLayout {
    fn default() -> Self {
        GridLayout {
            latitude_name: "latitude".to_string(),
            longitude_name: "longitude".to_string(),
            time_index: 0,
        }
    }
}

/// CF packing attributes of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Packing {
    fill_value: Option<f64>,
    missing_value: Option<f64>,
    scale_factor: Option<f64>,
    add_offset: Option<f64>,
}

impl Packing {
    fn from_variable(var: &netcdf::Variable) -> Self {
        Packing {
            fill_value: numeric_attribute(var, "_FillValue")
                .or_else(|| default_fill(&var.vartype())),
            missing_value: numeric_attribute(var, "missing_value"),
            scale_factor: numeric_attribute(var, "scale_factor"),
            add_offset: numeric_attribute(var, "add_offset"),
        }
    }

    fn decode(&self, raw: f64) -> f64 {
        if self.fill_value == Some(raw) || self.missing_value == Some(raw) {
            return f64::NAN;
        }
        raw * self.scale_factor.unwrap_or(1.0) + self.add_offset.unwrap_or(0.0)
    }

    fn is_identity(&self) -> bool {
        *self == Packing::default()
    }
}

const NC_FILL_FLOAT: f32 = 9.969_209_968_386_869e36;
const NC_FILL_DOUBLE: f64 = 9.969_209_968_386_869e36;

/// Library default fill for unwritten samples. Byte types are never masked.
fn default_fill(vartype: &NcVariableType) -> Option<f64> {
    match vartype {
        NcVariableType::Float(FloatType::F32) => Some(f64::from(NC_FILL_FLOAT)),
        NcVariableType::Float(FloatType::F64) => Some(NC_FILL_DOUBLE),
        NcVariableType::Int(IntType::I16) => Some(-32767.0),
        NcVariableType::Int(IntType::U16) => Some(65535.0),
        NcVariableType::Int(IntType::I32) => Some(-2_147_483_647.0),
        NcVariableType::Int(IntType::U32) => Some(4_294_967_295.0),
        _ => None,
    }
}

fn numeric_attribute(var: &netcdf::Variable, name: &str) -> Option<f64> {
    let value = var.attribute(name)?.value().ok()?;
    attribute_as_f64(&value)
}

/// First numeric element of an attribute value, widened to `f64`.
pub(crate) fn attribute_as_f64(value: &netcdf::AttributeValue) -> Option<f64> {
    use netcdf::AttributeValue as A;
    match value {
        A::Double(v) => Some(*v),
        A::Float(v) => Some(f64::from(*v)),
        A::Short(v) => Some(f64::from(*v)),
        A::Ushort(v) => Some(f64::from(*v)),
        A::Int(v) => Some(f64::from(*v)),
        A::Uint(v) => Some(f64::from(*v)),
        A::Schar(v) => Some(f64::from(*v)),
        A::Uchar(v) => Some(f64::from(*v)),
        A::Longlong(v) => Some(*v as f64),
        A::Ulonglong(v) => Some(*v as f64),
        A::Doubles(v) => v.first().copied(),
        A::Floats(v) => v.first().map(|x| f64::from(*x)),
        A::Shorts(v) => v.first().map(|x| f64::from(*x)),
        A::Ints(v) => v.first().map(|x| f64::from(*x)),
        _ => None,
    }
}

/// Opens `path` and loads the coordinate axes plus each named variable.
///
/// # Errors
///
/// - `MissingVariable` if a coordinate or requested variable is absent
/// - `UnsupportedLayout` if a variable is neither 2D nor 3D
/// - `TimeIndexOutOfRange` if a 3D variable has fewer steps than `time_index + 1`
pub fn load_dataset<P: AsRef<Path>>(
    path: P,
    variables: &[&str],
    layout: &GridLayout,
) -> GridResult<Dataset> {
    debug!("Opening NetCDF file: {}", path.as_ref().display());
    let file = netcdf::open(path.as_ref())?;

    let latitudes = read_coordinate(&file, &layout.latitude_name)?;
    let longitudes = read_coordinate(&file, &layout.longitude_name)?;
    debug!(
        "Coordinates: {} latitudes, {} longitudes",
        latitudes.len(),
        longitudes.len()
    );

    let mut dataset = Dataset::new(latitudes, longitudes);
    for name in variables {
        let samples = read_variable(&file, name, layout.time_index)?;
        dataset.insert_variable(name, samples);
    }

    file.close()?;
    Ok(dataset)
}

fn read_coordinate(file: &netcdf::File, name: &str) -> GridResult<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| GridError::MissingVariable(name.to_string()))?;
    let rank = var.dimensions().len();
    if rank != 1 {
        return Err(GridError::UnsupportedLayout {
            name: name.to_string(),
            rank,
        });
    }
    let values = var.get::<f64, _>(..)?;
    Ok(values.iter().copied().collect())
}

fn read_variable(file: &netcdf::File, name: &str, time_index: usize) -> GridResult<Array2<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| GridError::MissingVariable(name.to_string()))?;

    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
    debug!("Variable '{}' dimensions: {:?}", name, dims);

    let mut data: ArrayD<f64> = var.get::<f64, _>(..)?;
    let packing = Packing::from_variable(&var);
    if !packing.is_identity() {
        debug!("Decoding '{}' with {:?}", name, packing);
        data.mapv_inplace(|raw| packing.decode(raw));
    }

    slice_to_2d(name, data, time_index)
}

/// Reduces a 2D or `(time, lat, lon)` array to the 2D field at `time_index`.
pub(crate) fn slice_to_2d(name: &str, data: ArrayD<f64>, time_index: usize) -> GridResult<Array2<f64>> {
    let unsupported = |rank| GridError::UnsupportedLayout {
        name: name.to_string(),
        rank,
    };

    match data.ndim() {
        2 => data.into_dimensionality::<Ix2>().map_err(|_| unsupported(2)),
        3 => {
            let steps = data.shape()[0];
            if time_index >= steps {
                return Err(GridError::TimeIndexOutOfRange {
                    name: name.to_string(),
                    index: time_index,
                    steps,
                });
            }
            if steps > 1 {
                warn!(
                    "Variable '{}' has {} time steps; using step {}",
                    name, steps, time_index
                );
            }
            data.index_axis(Axis(0), time_index)
                .to_owned()
                .into_dimensionality::<Ix2>()
                .map_err(|_| unsupported(3))
        }
        rank => Err(unsupported(rank)),
    }
}
