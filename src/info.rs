//! # Dataset Inspection
//!
//! Summarises a NetCDF file before converting it: dimensions, variables with
//! their units, and which variables map onto a known [`Quantity`].

use crate::quantity::Quantity;
use crate::reader::attribute_as_f64;
use crate::storage::{Location, fetch_to_local};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub units: Option<String>,
    pub long_name: Option<String>,
    /// Set when the variable can be converted without an explicit quantity
    pub quantity: Option<Quantity>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub path: String,
    pub file_size: Option<u64>,
    pub dimensions: Vec<DimensionInfo>,
    pub variables: Vec<VariableInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub global_attributes: BTreeMap<String, String>,
}

impl DatasetInfo {
    /// Variables the converter recognises by name.
    pub fn convertible_variables(&self) -> impl Iterator<Item = &VariableInfo> {
        self.variables.iter().filter(|var| var.quantity.is_some())
    }
}

/// Inspects a local or S3 NetCDF file.
pub async fn get_dataset_info(path: &str, variable: Option<&str>, detailed: bool) -> Result<DatasetInfo> {
    let location = Location::parse(path)?;
    let local = fetch_to_local(&location)
        .await
        .with_context(|| format!("Failed to fetch {}", path))?;

    let mut info = inspect_file(local.path(), variable, detailed)?;
    info.path = path.to_string();
    if location.is_remote() {
        info.file_size = None;
    }
    Ok(info)
}

/// Inspects a NetCDF file on local disk.
///
/// `variable` restricts the listing to one variable. Per-variable attributes
/// and global attributes are only collected when `detailed` is set.
pub fn inspect_file(path: &Path, variable: Option<&str>, detailed: bool) -> Result<DatasetInfo> {
    debug!("Inspecting NetCDF file: {}", path.display());
    let file = netcdf::open(path)
        .with_context(|| format!("Failed to open NetCDF file: {}", path.display()))?;

    let dimensions = file
        .dimensions()
        .map(|dim| DimensionInfo {
            name: dim.name().to_string(),
            length: dim.len(),
            is_unlimited: dim.is_unlimited(),
        })
        .collect();

    let mut variables = Vec::new();
    for var in file.variables() {
        let name = var.name().to_string();
        if variable.is_some_and(|wanted| wanted != name) {
            continue;
        }

        let mut attributes = BTreeMap::new();
        let mut units = None;
        let mut long_name = None;
        for attr in var.attributes() {
            let Ok(value) = attr.value() else { continue };
            let rendered = format_attribute_value(&value);
            match attr.name() {
                "units" => units = Some(rendered.clone()),
                "long_name" => long_name = Some(rendered.clone()),
                _ => {}
            }
            if detailed {
                attributes.insert(attr.name().to_string(), rendered);
            }
        }

        variables.push(VariableInfo {
            quantity: Quantity::from_variable(&name),
            name,
            data_type: format!("{:?}", var.vartype()),
            dimensions: var.dimensions().iter().map(|d| d.name().to_string()).collect(),
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
            units,
            long_name,
            attributes,
        });
    }

    if let Some(wanted) = variable {
        if variables.is_empty() {
            anyhow::bail!("Variable '{}' not found in {}", wanted, path.display());
        }
    }

    let mut global_attributes = BTreeMap::new();
    if detailed {
        for attr in file.attributes() {
            if let Ok(value) = attr.value() {
                global_attributes.insert(attr.name().to_string(), format_attribute_value(&value));
            }
        }
    }

    file.close().context("Failed to close NetCDF file")?;

    Ok(DatasetInfo {
        path: path.display().to_string(),
        file_size: std::fs::metadata(path).ok().map(|m| m.len()),
        dimensions,
        variables,
        global_attributes,
    })
}

fn format_attribute_value(value: &netcdf::AttributeValue) -> String {
    match value {
        netcdf::AttributeValue::Str(text) => text.clone(),
        other => match attribute_as_f64(other) {
            Some(number) => number.to_string(),
            None => format!("{:?}", other),
        },
    }
}

pub fn print_info_human(info: &DatasetInfo) {
    println!("NetCDF File Information:");
    println!("  Path: {}", info.path);
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!("  Dimensions: {} total", info.dimensions.len());
    for dim in &info.dimensions {
        println!(
            "    {} ({}{})",
            dim.name,
            dim.length,
            if dim.is_unlimited { ", unlimited" } else { "" }
        );
    }
    println!("  Variables: {} total", info.variables.len());
    for var in &info.variables {
        let units = var.units.as_deref().unwrap_or("-");
        let marker = var
            .quantity
            .map(|q| format!(" -> {}", q.as_str()))
            .unwrap_or_default();
        println!(
            "    {} [{}] ({}) [{}]{}",
            var.name,
            units,
            var.data_type,
            var.dimensions.join(", "),
            marker
        );
        for (name, value) in &var.attributes {
            println!("      @{}: {}", name, value);
        }
    }
    if !info.global_attributes.is_empty() {
        println!("  Global Attributes:");
        for (name, value) in &info.global_attributes {
            println!("    @{}: {}", name, value);
        }
    }
}

pub fn print_info_json(info: &DatasetInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

pub fn print_info_yaml(info: &DatasetInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize dataset info to YAML")?;
    println!("{}", yaml);
    Ok(())
}
