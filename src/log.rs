use crate::JobSummary;
use crate::input::JobConfig;
use std::time::Duration;

pub fn show_greeting(source: &str) {
    println!("=== NetCDF to GeoJSON Converter ===");
    println!("Loading configuration from: {}", source);
}

pub fn config_echo(config: &JobConfig) {
    println!("\nConfiguration:");
    println!("  Input NetCDF: {}", config.input);
    println!("  Variable: {}", config.variable);
    match config.resolve_quantity() {
        Ok(quantity) => println!("  Quantity: {}", quantity.as_str()),
        Err(_) => println!("  Quantity: unknown"),
    }
    println!("  Product: {}", config.product.as_str());
    match config.resolve_resolution() {
        Ok(resolution) => println!("  Resolution: {}", resolution),
        Err(e) => println!("  Resolution: invalid ({})", e),
    }
    println!("  Output: {} ({})", config.output, config.resolve_format().as_str());
    if let Some(bbox) = &config.bbox {
        println!(
            "  Bounding box: lat [{}, {}], lon [{}, {}]",
            bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon
        );
    }
    if let Some(validity) = &config.validity {
        println!("  Validity override: {}", validity.to_rule().describe());
    }
    if config.time_index > 0 {
        println!("  Time index: {}", config.time_index);
    }
}

pub fn show_summary(summary: &JobSummary) {
    println!("\nResult:");
    println!("  Features: {} {}", summary.features, summary.product.as_str());
    println!("  Written: {} bytes of {}", summary.bytes, summary.format.as_str());
    println!("  Destination: {}", summary.destination);
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    println!(
        "\n=== Conversion completed in {:.2}s ===",
        elapsed.as_secs_f64()
    );
}
