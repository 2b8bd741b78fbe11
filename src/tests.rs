use crate::aggregate::*;
use crate::feature::*;
use crate::grid::*;
use crate::input::*;
use crate::pipeline::*;
use crate::quantity::*;
use crate::snap::*;
use std::path::Path;
use tempfile::tempdir;

const TOLERANCE: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < TOLERANCE
}

/// 2x2 temperature grid in Kelvin: 68.0, 69.8, 71.6 and 73.4 °F.
fn temperature_grid() -> Grid {
    Grid::from_rows(
        vec![10.0, 10.1],
        vec![20.0, 20.1],
        vec![vec![293.15, 294.15], vec![295.15, 296.15]],
    )
    .unwrap()
}

fn settings(quantity: Quantity, resolution: f64) -> PipelineSettings {
    PipelineSettings::for_quantity(quantity).with_resolution(Resolution::new(resolution).unwrap())
}

/// Writes a NetCDF file with `latitude`/`longitude` axes and one variable.
///
/// With `time_steps`, the variable gets a leading `time` axis and `values`
/// holds every step back to back.
fn write_grid_file(
    path: &Path,
    variable: &str,
    latitudes: &[f64],
    longitudes: &[f64],
    values: &[f64],
    time_steps: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("latitude", latitudes.len())?;
    file.add_dimension("longitude", longitudes.len())?;

    let mut lat = file.add_variable::<f64>("latitude", &["latitude"])?;
    lat.put_attribute("units", "degrees_north")?;
    lat.put_values(latitudes, ..)?;

    let mut lon = file.add_variable::<f64>("longitude", &["longitude"])?;
    lon.put_attribute("units", "degrees_east")?;
    lon.put_values(longitudes, ..)?;

    let dims: Vec<&str> = match time_steps {
        Some(steps) => {
            file.add_dimension("time", steps)?;
            vec!["time", "latitude", "longitude"]
        }
        None => vec!["latitude", "longitude"],
    };
    let mut var = file.add_variable::<f64>(variable, &dims)?;
    var.put_attribute("long_name", "test field")?;
    var.put_values(values, ..)?;
    Ok(())
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_single_temperature_cell() {
        let collection = run_cell_pipeline(&temperature_grid(), &settings(Quantity::Temperature, 0.1));
        assert_eq!(collection.len(), 1);

        let feature = &collection.features[0];
        let value = feature.property("temperature_f").unwrap();
        let expected = (68.0 + 69.8 + 71.6 + 73.4) / 4.0;
        assert!((value - expected).abs() < 1e-6, "got {value}");
        assert!((value - 70.7).abs() < 1e-6);

        let ring = feature.geometry.exterior().unwrap();
        let expected_ring = [
            [20.0, 10.0],
            [20.1, 10.0],
            [20.1, 10.1],
            [20.0, 10.1],
            [20.0, 10.0],
        ];
        assert_eq!(ring.len(), 5);
        for (got, want) in ring.iter().zip(expected_ring.iter()) {
            assert!(close(got[0], want[0]) && close(got[1], want[1]), "{got:?} != {want:?}");
        }
    }

    #[test]
    fn test_nan_corner_emits_nothing() {
        let grid = Grid::from_rows(
            vec![10.0, 10.1],
            vec![20.0, 20.1],
            vec![vec![293.15, f64::NAN], vec![295.15, 296.15]],
        )
        .unwrap();
        let collection = run_cell_pipeline(&grid, &settings(Quantity::Temperature, 0.1));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_infinite_wave_height_corner_is_still_emitted() {
        let grid = Grid::from_rows(
            vec![10.0, 10.25],
            vec![20.0, 20.25],
            vec![vec![1.0, f64::INFINITY], vec![2.0, 1.5]],
        )
        .unwrap();
        let collection = run_cell_pipeline(&grid, &settings(Quantity::WaveHeight, 0.25));
        assert_eq!(collection.len(), 1);
        let value = collection.features[0].property("wave_height_ft").unwrap();
        assert!(value.is_infinite() && value > 0.0);
    }

    #[test]
    fn test_infinite_wave_height_serialises_as_null() {
        let grid = Grid::from_rows(
            vec![10.0, 10.25],
            vec![20.0, 20.25],
            vec![vec![1.0, f64::INFINITY], vec![2.0, 1.5]],
        )
        .unwrap();
        let collection = run_cell_pipeline(&grid, &settings(Quantity::WaveHeight, 0.25));
        let json: serde_json::Value = serde_json::from_slice(&collection.to_json(false).unwrap()).unwrap();
        assert!(json["features"][0]["properties"]["wave_height_ft"].is_null());
    }

    #[test]
    fn test_wave_height_cell_with_undefined_mean_is_skipped() {
        // each corner passes the NaN check, but inf + -inf makes the mean NaN
        let grid = Grid::from_rows(
            vec![10.0, 10.25],
            vec![20.0, 20.25],
            vec![vec![f64::INFINITY, f64::NEG_INFINITY], vec![2.0, 1.5]],
        )
        .unwrap();
        let rules = CellRules {
            convert: Quantity::WaveHeight.converter(),
            rule: Quantity::WaveHeight.validity_rule(),
            resolution: Resolution::new(0.25).unwrap(),
        };
        assert!(aggregate_cell(&grid, 0, 0, &rules).is_none());

        let collection = run_cell_pipeline(&grid, &settings(Quantity::WaveHeight, 0.25));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_wave_height_cell_with_nan_corner_is_skipped() {
        let grid = Grid::from_rows(
            vec![10.0, 10.25],
            vec![20.0, 20.25],
            vec![vec![1.0, 1.2], vec![f64::NAN, 1.5]],
        )
        .unwrap();
        let collection = run_cell_pipeline(&grid, &settings(Quantity::WaveHeight, 0.25));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_temperature_outside_range_emits_nothing() {
        // 400 K is roughly 260 °F
        let grid = Grid::from_rows(
            vec![10.0, 10.1],
            vec![20.0, 20.1],
            vec![vec![293.15, 400.0], vec![295.15, 296.15]],
        )
        .unwrap();
        let collection = run_cell_pipeline(&grid, &settings(Quantity::Temperature, 0.1));
        assert!(collection.is_empty());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::units::{fahrenheit_to_kelvin, kelvin_to_fahrenheit};

    /// 4x5 grid with a NaN, an infinity and an out-of-range sample.
    fn mixed_grid() -> Grid {
        Grid::from_rows(
            vec![60.0, 59.75, 59.5, 59.25],
            vec![10.0, 10.25, 10.5, 10.75, 11.0],
            vec![
                vec![280.0, 281.0, 282.0, f64::NAN, 284.0],
                vec![280.5, 281.5, 282.5, 283.5, 284.5],
                vec![279.0, f64::INFINITY, 281.0, 282.0, 283.0],
                vec![278.0, 279.0, 280.0, 400.0, 282.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_cell_value_is_mean_of_converted_corners() {
        let grid = mixed_grid();
        let rules = CellRules {
            convert: kelvin_to_fahrenheit,
            rule: Quantity::Temperature.validity_rule(),
            resolution: Resolution::new(0.25).unwrap(),
        };
        for cell in aggregate_grid(&grid, &rules) {
            let (i, j) = (cell.row, cell.col);
            let corners = [
                grid.samples()[[i, j]],
                grid.samples()[[i, j + 1]],
                grid.samples()[[i + 1, j]],
                grid.samples()[[i + 1, j + 1]],
            ];
            let converted = corners.map(kelvin_to_fahrenheit);
            assert!(converted.iter().all(|&v| is_valid(v, Quantity::Temperature)));
            let mean = converted.iter().sum::<f64>() / 4.0;
            assert!(close(cell.value, mean));
        }
    }

    #[test]
    fn test_cells_touching_invalid_samples_are_skipped() {
        let grid = mixed_grid();
        let collection = run_cell_pipeline(&grid, &settings(Quantity::Temperature, 0.25));
        let rules = CellRules {
            convert: kelvin_to_fahrenheit,
            rule: Quantity::Temperature.validity_rule(),
            resolution: Resolution::new(0.25).unwrap(),
        };

        // NaN at (0,3), +inf at (2,1), 400 K at (3,3)
        for (i, j) in [(0, 2), (0, 3), (1, 0), (1, 1), (2, 0), (2, 1), (2, 2), (2, 3)] {
            assert!(aggregate_cell(&grid, i, j, &rules).is_none(), "cell ({i},{j})");
        }
        assert_eq!(collection.len(), 12 - 8);
    }

    #[test]
    fn test_every_ring_is_closed_with_five_vertices() {
        let collection = run_cell_pipeline(&mixed_grid(), &settings(Quantity::Temperature, 0.25));
        assert!(!collection.is_empty());
        for feature in &collection {
            assert_eq!(feature.geometry.kind(), "Polygon");
            let ring = feature.geometry.exterior().unwrap();
            assert_eq!(ring.len(), 5);
            assert_eq!(ring.first(), ring.last());
        }
    }

    #[test]
    fn test_cell_count_is_bounded() {
        for quantity in [Quantity::Temperature, Quantity::WaveHeight] {
            let grid = mixed_grid();
            let collection = run_cell_pipeline(&grid, &settings(quantity, 0.25));
            assert!(collection.len() <= (grid.height() - 1) * (grid.width() - 1));
        }
    }

    #[test]
    fn test_point_count_is_exactly_h_times_w() {
        let grid = mixed_grid();
        let collection = run_point_pipeline(&grid, &settings(Quantity::Temperature, 0.25));
        assert_eq!(collection.len(), grid.height() * grid.width());

        let first = &collection.features[0];
        assert_eq!(first.geometry, Geometry::Point { coordinates: [10.0, 60.0] });
        assert!(close(first.property("temperature_f").unwrap(), kelvin_to_fahrenheit(280.0)));
    }

    #[test]
    fn test_point_filtering_is_opt_in() {
        let grid = mixed_grid();
        let filtered = run_point_pipeline(
            &grid,
            &settings(Quantity::Temperature, 0.25).with_point_filtering(true),
        );
        assert_eq!(filtered.len(), grid.point_count() - 3);
    }

    #[test]
    fn test_snapping_is_idempotent_on_emitted_corners() {
        let resolution = Resolution::new(0.1).unwrap();
        for x in [-179.95, -12.34, 0.05, 10.1, 45.678, 89.99] {
            let once = snap(x, resolution);
            assert_eq!(snap(once, resolution), once);
        }
    }

    #[test]
    fn test_kelvin_fahrenheit_round_trip() {
        for k in [0.0, 1.0, 210.5, 273.15, 293.15, 330.0, 1.0e4] {
            assert!((fahrenheit_to_kelvin(kelvin_to_fahrenheit(k)) - k).abs() < 1e-9);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let grid = mixed_grid();
        let sequential = run_cell_pipeline(&grid, &settings(Quantity::Temperature, 0.25));
        let parallel = run_cell_pipeline(
            &grid,
            &settings(Quantity::Temperature, 0.25).with_parallelism(true),
        );
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_custom_rule_replaces_quantity_default() {
        let grid = mixed_grid();
        let strict = settings(Quantity::Temperature, 0.25).with_rule(
            ValidityConfig::RangeAndFiniteness {
                min: 45.0,
                max: 50.0,
            }
            .to_rule(),
        );
        // only cell (0,1) has all four corners inside [45, 50] °F
        let collection = run_cell_pipeline(&grid, &strict);
        assert_eq!(collection.len(), 1);
        let value = collection.features[0].property("temperature_f").unwrap();
        assert!((value - 47.48).abs() < 1e-6);
    }
}

#[cfg(test)]
mod grid_tests {
    use super::*;
    use crate::error::GridError;
    use crate::filters::BoundingBox;
    use ndarray::array;

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let result = Grid::new(vec![1.0, 2.0], vec![1.0, 2.0, 3.0], array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(matches!(result, Err(GridError::InputShape { rows: 2, cols: 2, .. })));

        let ragged = Grid::from_rows(vec![1.0, 2.0], vec![1.0, 2.0], vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(ragged, Err(GridError::InputShape { .. })));
    }

    #[test]
    fn test_non_monotonic_axis_is_rejected() {
        let result = Grid::new(vec![1.0, 3.0, 2.0], vec![1.0], array![[1.0], [2.0], [3.0]]);
        assert!(matches!(result, Err(GridError::NonMonotonic(axis)) if axis == "latitude"));
    }

    #[test]
    fn test_descending_latitudes_are_accepted() {
        let grid = Grid::new(vec![60.0, 59.75], vec![10.0, 10.25], array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(grid.is_ok());
    }

    #[test]
    fn test_missing_variable() {
        let dataset = Dataset::new(vec![10.0, 10.1], vec![20.0, 20.1])
            .with_variable("t2m", array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(dataset.has_variable("t2m"));
        assert!(matches!(dataset.grid("swh"), Err(GridError::MissingVariable(name)) if name == "swh"));
    }

    #[test]
    fn test_bounding_box_subsets_grid() {
        let grid = Grid::from_rows(
            vec![60.0, 59.75, 59.5],
            vec![10.0, 10.25, 10.5],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]],
        )
        .unwrap();
        let bbox = BoundingBox::new(59.5, 59.75, 10.25, 10.5).unwrap();
        let subset = bbox.apply(&grid).unwrap();
        assert_eq!(subset.latitudes(), &[59.75, 59.5]);
        assert_eq!(subset.longitudes(), &[10.25, 10.5]);
        assert_eq!(subset.samples(), &array![[5.0, 6.0], [8.0, 9.0]]);
    }

    #[test]
    fn test_bounding_box_parse() {
        let bbox = BoundingBox::parse("-10:10:-20.5:20").unwrap();
        assert_eq!(bbox.min_lon, -20.5);
        assert!(bbox.contains(0.0, 0.0));
        assert!(!bbox.contains(11.0, 0.0));
        assert!(BoundingBox::parse("1:2:3").is_err());
        assert!(BoundingBox::parse("10:-10:0:1").is_err());
    }
}

#[cfg(test)]
mod feature_tests {
    use super::*;

    #[test]
    fn test_point_feature_uses_lon_lat_order() {
        let feature = build_point_feature(59.5, 10.25, 3.2, "wave_height_ft");
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["geometry"]["type"], "Point");
        assert_eq!(json["geometry"]["coordinates"], serde_json::json!([10.25, 59.5]));
        assert_eq!(json["properties"]["wave_height_ft"], 3.2);
    }

    #[test]
    fn test_cell_feature_ring_order() {
        let corners = CellCorners {
            lat1: 1.0,
            lat2: 2.0,
            lon1: 3.0,
            lon2: 4.0,
        };
        let feature = build_cell_feature(&corners, 50.0, "temperature_f");
        assert_eq!(
            feature.geometry.exterior().unwrap(),
            &[[3.0, 1.0], [4.0, 1.0], [4.0, 2.0], [3.0, 2.0], [3.0, 1.0]]
        );
    }

    #[test]
    fn test_assemble_preserves_order_and_duplicates() {
        let a = build_point_feature(1.0, 1.0, 1.0, "v");
        let b = build_point_feature(2.0, 2.0, 2.0, "v");
        let collection = assemble(vec![b.clone(), a.clone(), b.clone()]);
        assert_eq!(collection.features, vec![b.clone(), a, b]);

        let json: serde_json::Value = serde_json::from_slice(&collection.to_json(true).unwrap()).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_collection_serialises() {
        let collection: FeatureCollection = std::iter::empty::<Feature>().collect();
        assert_eq!(
            collection.to_json(false).unwrap(),
            br#"{"type":"FeatureCollection","features":[]}"#.to_vec()
        );
    }
}

#[cfg(test)]
mod reader_tests {
    use super::*;
    use crate::error::GridError;
    use crate::reader::{GridLayout, load_dataset};

    #[test]
    fn test_load_2d_variable() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("t2m.nc");
        write_grid_file(
            &path,
            "t2m",
            &[10.0, 10.1],
            &[20.0, 20.1, 20.2],
            &[290.0, 291.0, 292.0, 293.0, 294.0, 295.0],
            None,
        )?;

        let dataset = load_dataset(&path, &["t2m"], &GridLayout::default())?;
        let grid = dataset.grid("t2m")?;
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.sample(1, 2), Some(295.0));
        Ok(())
    }

    #[test]
    fn test_time_axis_is_sliced() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("swh.nc");
        let values = [1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0];
        write_grid_file(&path, "swh", &[0.0, 0.25], &[0.0, 0.25], &values, Some(2))?;

        let first = load_dataset(&path, &["swh"], &GridLayout::default())?.grid("swh")?;
        assert_eq!(first.sample(1, 1), Some(4.0));

        let layout = GridLayout {
            time_index: 1,
            ..GridLayout::default()
        };
        let second = load_dataset(&path, &["swh"], &layout)?.grid("swh")?;
        assert_eq!(second.sample(0, 0), Some(10.0));

        let out_of_range = GridLayout {
            time_index: 2,
            ..GridLayout::default()
        };
        let err = load_dataset(&path, &["swh"], &out_of_range).unwrap_err();
        assert!(matches!(err, GridError::TimeIndexOutOfRange { steps: 2, .. }));
        Ok(())
    }

    #[test]
    fn test_missing_values_and_packing_are_decoded() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("packed.nc");
        {
            let mut file = netcdf::create(&path)?;
            file.add_dimension("latitude", 2)?;
            file.add_dimension("longitude", 2)?;
            let mut lat = file.add_variable::<f64>("latitude", &["latitude"])?;
            lat.put_values(&[10.0, 10.1], ..)?;
            let mut lon = file.add_variable::<f64>("longitude", &["longitude"])?;
            lon.put_values(&[20.0, 20.1], ..)?;
            let mut var = file.add_variable::<f64>("t2m", &["latitude", "longitude"])?;
            var.put_attribute("missing_value", -999.0)?;
            var.put_attribute("scale_factor", 0.5)?;
            var.put_attribute("add_offset", 200.0)?;
            var.put_values(&[186.3, 188.3, -999.0, 192.3], ..)?;
        }

        let grid = load_dataset(&path, &["t2m"], &GridLayout::default())?.grid("t2m")?;
        assert!((grid.sample(0, 0).unwrap() - 293.15).abs() < 1e-9);
        assert!(grid.sample(1, 0).unwrap().is_nan());
        Ok(())
    }

    #[test]
    fn test_default_fill_is_masked_without_attribute() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("swh.nc");
        let unwritten = 9.969_209_968_386_869e36;
        write_grid_file(
            &path,
            "swh",
            &[0.0, 0.25],
            &[0.0, 0.25, 0.5],
            &[1.0, 1.5, 2.0, 1.2, 1.4, unwritten],
            None,
        )?;

        let grid = load_dataset(&path, &["swh"], &GridLayout::default())?.grid("swh")?;
        assert!(grid.sample(1, 2).unwrap().is_nan());

        let collection = run_cell_pipeline(&grid, &settings(Quantity::WaveHeight, 0.25));
        assert_eq!(collection.len(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_variable_and_coordinates() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("t2m.nc");
        write_grid_file(&path, "t2m", &[10.0, 10.1], &[20.0, 20.1], &[1.0, 2.0, 3.0, 4.0], None)?;

        let err = load_dataset(&path, &["swh"], &GridLayout::default()).unwrap_err();
        assert!(matches!(err, GridError::MissingVariable(name) if name == "swh"));

        let layout = GridLayout {
            latitude_name: "lat".to_string(),
            ..GridLayout::default()
        };
        let err = load_dataset(&path, &["t2m"], &layout).unwrap_err();
        assert!(matches!(err, GridError::MissingVariable(name) if name == "lat"));
        Ok(())
    }
}

#[cfg(test)]
mod input_tests {
    use super::*;
    use crate::error::GridError;
    use crate::output::OutputFormat;

    #[test]
    fn test_job_config_from_json_defaults() {
        let json = r#"
        {
            "input": "era5_swh.nc",
            "output": "swh.geojson",
            "variable": "swh"
        }"#;
        let config = JobConfig::from_json(json).unwrap();
        assert_eq!(config.product, Product::Cells);
        assert_eq!(config.latitude_name, "latitude");
        assert_eq!(config.time_index, 0);
        assert!(!config.filter_points);
        assert_eq!(config.resolve_quantity().unwrap(), Quantity::WaveHeight);
        assert_eq!(config.resolve_resolution().unwrap().degrees(), 0.25);
        assert_eq!(config.resolve_property_name().unwrap(), "wave_height_ft");
        assert_eq!(config.resolve_format(), OutputFormat::GeoJson);
    }

    #[test]
    fn test_job_config_from_yaml_full() {
        let yaml = r#"
input: s3://bucket/t2m.nc
output: out/t2m.parquet
variable: temp
quantity: temperature
product: points
resolution: 0.5
time_index: 3
property_name: tf
validity:
  kind: range_and_finiteness
  min: -50.0
  max: 120.0
filter_points: true
bbox:
  min_lat: 50.0
  max_lat: 60.0
  min_lon: 0.0
  max_lon: 10.0
parallel: true
"#;
        let config = JobConfig::from_yaml(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.product, Product::Points);
        assert_eq!(config.resolve_format(), OutputFormat::Parquet);

        let settings = config.pipeline_settings().unwrap();
        assert_eq!(settings.quantity, Quantity::Temperature);
        assert_eq!(settings.property_name, "tf");
        assert_eq!(settings.resolution.degrees(), 0.5);
        assert!(settings.filter_points && settings.parallel);
        assert!(!settings.rule.is_valid(130.0));
        assert_eq!(config.layout().time_index, 3);
    }

    #[test]
    fn test_validation_errors() {
        let unknown = JobConfig::new("in.nc", "out.geojson", "tp");
        assert!(matches!(unknown.validate(), Err(GridError::UnknownQuantity(_))));

        let mut bad_resolution = JobConfig::new("in.nc", "out.geojson", "t2m");
        bad_resolution.resolution = Some(-0.1);
        assert!(matches!(bad_resolution.validate(), Err(GridError::InvalidResolution(_))));

        let mut bad_range = JobConfig::new("in.nc", "out.geojson", "t2m");
        bad_range.validity = Some(ValidityConfig::RangeAndFiniteness { min: 5.0, max: 1.0 });
        assert!(matches!(bad_range.validate(), Err(GridError::Config(_))));

        let empty = JobConfig::new("", "out.geojson", "t2m");
        assert!(matches!(empty.validate(), Err(GridError::Config(_))));
    }

    #[test]
    fn test_config_file_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut config = JobConfig::new("in.nc", "out.csv", "t2m");
        config.pretty = true;

        let json_path = dir.path().join("job.json");
        std::fs::write(&json_path, config.to_json()?)?;
        assert_eq!(JobConfig::from_file(&json_path)?, config);

        let yaml_path = dir.path().join("job.yml");
        std::fs::write(&yaml_path, config.to_yaml()?)?;
        assert_eq!(JobConfig::from_file(&yaml_path)?, config);
        Ok(())
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(JobConfig::from_json("{ not json"), Err(GridError::Json(_))));
        assert!(JobConfig::from_json(r#"{ "input": "a.nc" }"#).is_err());
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::error::GridError;
    use crate::{convert_dataset, process_job, process_job_async};
    use ndarray::array;

    fn write_temperature_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        write_grid_file(
            path,
            "t2m",
            &[10.0, 10.1, 10.2],
            &[20.0, 20.1, 20.2],
            &[
                293.15, 294.15, 295.15, //
                295.15, 296.15, f64::NAN, //
                296.15, 297.15, 298.15,
            ],
            None,
        )
    }

    #[test]
    fn test_convert_dataset_applies_bbox() {
        let dataset = Dataset::new(vec![10.0, 10.1, 10.2], vec![20.0, 20.1, 20.2]).with_variable(
            "t2m",
            array![[293.15, 294.15, 295.15], [295.15, 296.15, 297.15], [296.15, 297.15, 298.15]],
        );
        let mut config = JobConfig::new("unused.nc", "unused.geojson", "t2m");
        assert_eq!(convert_dataset(&dataset, &config).unwrap().len(), 4);

        config.bbox = Some(crate::filters::BoundingBox::new(10.0, 10.1, 20.0, 20.1).unwrap());
        assert_eq!(convert_dataset(&dataset, &config).unwrap().len(), 1);
    }

    #[test]
    fn test_process_job_writes_geojson() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let input = dir.path().join("t2m.nc");
        let output = dir.path().join("out/t2m.geojson");
        write_temperature_file(&input)?;

        let config = JobConfig::new(input.to_str().unwrap(), output.to_str().unwrap(), "t2m");
        let summary = process_job(&config, false)?;
        // the NaN sample at (1,2) removes two of the four cells
        assert_eq!(summary.features, 2);

        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&output)?)?;
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"].as_array().unwrap().len(), 2);
        assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");
        Ok(())
    }

    #[test]
    fn test_process_job_refuses_existing_output() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let input = dir.path().join("t2m.nc");
        let output = dir.path().join("t2m.geojson");
        write_temperature_file(&input)?;
        std::fs::write(&output, b"keep me")?;

        let config = JobConfig::new(input.to_str().unwrap(), output.to_str().unwrap(), "t2m");
        let err = process_job(&config, false).unwrap_err();
        assert!(matches!(err, GridError::Serialization { .. }));
        assert_eq!(std::fs::read(&output)?, b"keep me");

        process_job(&config, true)?;
        assert_ne!(std::fs::read(&output)?, b"keep me");
        Ok(())
    }

    #[test]
    fn test_process_job_creates_output_directories() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let input = dir.path().join("t2m.nc");
        let output = dir.path().join("out/2024/cells.geojson");
        write_temperature_file(&input)?;

        let config = JobConfig::new(input.to_str().unwrap(), output.to_str().unwrap(), "t2m");
        let summary = process_job(&config, false)?;
        assert_eq!(std::fs::metadata(&output)?.len() as usize, summary.bytes);

        let err = process_job(&config, false).unwrap_err();
        assert!(matches!(
            err,
            GridError::Serialization {
                source: crate::storage::StorageError::AlreadyExists(_),
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_process_job_points_to_csv() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let input = dir.path().join("t2m.nc");
        let output = dir.path().join("points.csv");
        write_temperature_file(&input)?;

        let mut config = JobConfig::new(input.to_str().unwrap(), output.to_str().unwrap(), "t2m");
        config.product = Product::Points;
        let summary = process_job(&config, false)?;
        assert_eq!(summary.features, 9);

        let text = std::fs::read_to_string(&output)?;
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("longitude,latitude,temperature_f"));
        assert_eq!(lines.count(), 9);
        Ok(())
    }

    #[test]
    fn test_process_job_rejects_s3_paths() {
        let config = JobConfig::new("s3://bucket/t2m.nc", "out.geojson", "t2m");
        assert!(matches!(process_job(&config, false), Err(GridError::Config(_))));
    }

    #[test]
    fn test_process_job_missing_input() {
        let config = JobConfig::new("/nonexistent/t2m.nc", "/tmp/never.geojson", "t2m");
        assert!(process_job(&config, false).is_err());
    }

    #[tokio::test]
    async fn test_process_job_async_local() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let input = dir.path().join("t2m.nc");
        let output = dir.path().join("cells.parquet");
        write_temperature_file(&input)?;

        let mut config = JobConfig::new(input.to_str().unwrap(), output.to_str().unwrap(), "t2m");
        config.parallel = true;
        let summary = process_job_async(&config, false).await?;
        assert_eq!(summary.features, 2);
        assert_eq!(summary.format, crate::output::OutputFormat::Parquet);
        assert!(output.exists());

        let refused = process_job_async(&config, false).await;
        assert!(matches!(refused, Err(GridError::Serialization { .. })));
        Ok(())
    }
}

#[cfg(test)]
mod info_tests {
    use super::*;
    use crate::info::{get_dataset_info, inspect_file};

    #[test]
    fn test_inspect_file_lists_variables() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("swh.nc");
        write_grid_file(&path, "swh", &[0.0, 0.25], &[0.0, 0.25], &[1.0; 8], Some(2))?;

        let info = inspect_file(&path, None, false)?;
        let dims: Vec<&str> = info.dimensions.iter().map(|d| d.name.as_str()).collect();
        assert!(dims.contains(&"time"));
        assert_eq!(info.variables.len(), 3);

        let swh = info.variables.iter().find(|v| v.name == "swh").unwrap();
        assert_eq!(swh.quantity, Some(Quantity::WaveHeight));
        assert_eq!(swh.shape, vec![2, 2, 2]);
        assert_eq!(swh.long_name.as_deref(), Some("test field"));
        assert!(swh.attributes.is_empty());

        let lat = info.variables.iter().find(|v| v.name == "latitude").unwrap();
        assert_eq!(lat.units.as_deref(), Some("degrees_north"));
        assert_eq!(info.convertible_variables().count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_dataset_info_single_variable() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("t2m.nc");
        write_grid_file(&path, "t2m", &[10.0, 10.1], &[20.0, 20.1], &[1.0; 4], None)?;
        let path_str = path.to_str().unwrap();

        let info = get_dataset_info(path_str, Some("t2m"), true).await?;
        assert_eq!(info.path, path_str);
        assert_eq!(info.variables.len(), 1);
        assert!(info.variables[0].attributes.contains_key("long_name"));
        assert!(info.file_size.is_some());

        assert!(get_dataset_info(path_str, Some("swh"), false).await.is_err());
        Ok(())
    }
}
