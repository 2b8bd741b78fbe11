//! # Quantity Kinds and Validity Rules
//!
//! Each physical quantity carries its unit conversion, its output property
//! name, a default snapping resolution, and the rule deciding whether a
//! converted sample is physically plausible.
//!
//! The two rules differ: temperature samples must be
//! finite and inside a Fahrenheit range, while wave heights are only rejected
//! when NaN. Infinite wave heights pass.

use crate::snap::Resolution;
use crate::units::{kelvin_to_fahrenheit, meters_to_feet};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lowest plausible 2-meter temperature, in Fahrenheit.
pub const TEMPERATURE_MIN_F: f64 = -100.0;
/// Highest plausible 2-meter temperature, in Fahrenheit.
pub const TEMPERATURE_MAX_F: f64 = 150.0;

/// Decides whether a single converted sample may contribute to a feature.
pub trait ValidityRule: Send + Sync {
    fn is_valid(&self, value: f64) -> bool;

    /// Short human-readable description used in logs and config echoes.
    fn describe(&self) -> String;
}

/// Accepts finite values inside an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeAndFiniteness {
    pub min: f64,
    pub max: f64,
}

impl RangeAndFiniteness {
    pub const fn new(min: f64, max: f64) -> Self {
        RangeAndFiniteness { min, max }
    }
}

impl ValidityRule for RangeAndFiniteness {
    fn is_valid(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    fn describe(&self) -> String {
        format!("finite and within [{}, {}]", self.min, self.max)
    }
}

/// Rejects NaN only; infinities are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NotNan;

impl ValidityRule for NotNan {
    fn is_valid(&self, value: f64) -> bool {
        !value.is_nan()
    }

    fn describe(&self) -> String {
        "not NaN".to_string()
    }
}

static TEMPERATURE_RULE: RangeAndFiniteness =
    RangeAndFiniteness::new(TEMPERATURE_MIN_F, TEMPERATURE_MAX_F);
static WAVE_HEIGHT_RULE: NotNan = NotNan;

/// The physical quantities the converter understands.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// 2-meter air temperature, stored in Kelvin, emitted in Fahrenheit
    Temperature,
    /// Significant wave height, stored in meters, emitted in feet
    WaveHeight,
}

impl Quantity {
    /// Infers the quantity from a reanalysis short name.
    pub fn from_variable(variable: &str) -> Option<Self> {
        match variable {
            "t2m" | "2t" => Some(Quantity::Temperature),
            "swh" => Some(Quantity::WaveHeight),
            _ => None,
        }
    }

    /// Conventional variable name in reanalysis files.
    pub fn variable_name(&self) -> &'static str {
        match self {
            Quantity::Temperature => "t2m",
            Quantity::WaveHeight => "swh",
        }
    }

    pub fn property_name(&self) -> &'static str {
        match self {
            Quantity::Temperature => "temperature_f",
            Quantity::WaveHeight => "wave_height_ft",
        }
    }

    /// Default lattice size in degrees for cell products of this quantity.
    pub fn default_resolution(&self) -> Resolution {
        match self {
            Quantity::Temperature => Resolution::new_unchecked(0.1),
            Quantity::WaveHeight => Resolution::new_unchecked(0.25),
        }
    }

    /// Native-to-emitted unit conversion for this quantity.
    pub fn converter(&self) -> fn(f64) -> f64 {
        match self {
            Quantity::Temperature => kelvin_to_fahrenheit,
            Quantity::WaveHeight => meters_to_feet,
        }
    }

    pub fn convert(&self, native: f64) -> f64 {
        (self.converter())(native)
    }

    pub fn validity_rule(&self) -> &'static dyn ValidityRule {
        match self {
            Quantity::Temperature => &TEMPERATURE_RULE,
            Quantity::WaveHeight => &WAVE_HEIGHT_RULE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quantity::Temperature => "temperature",
            Quantity::WaveHeight => "wave_height",
        }
    }
}

/// Checks an already-converted sample against the rule of its quantity.
pub fn is_valid(value: f64, quantity: Quantity) -> bool {
    quantity.validity_rule().is_valid(value)
}

/// Configurable override of a quantity's default validity rule.
///
/// ```rust
/// use nc2geojson::quantity::ValidityConfig;
///
/// let json = r#"{ "kind": "range_and_finiteness", "min": -60.0, "max": 130.0 }"#;
/// let config: ValidityConfig = serde_json::from_str(json).unwrap();
/// let rule = config.to_rule();
/// assert!(rule.is_valid(72.0));
/// assert!(!rule.is_valid(140.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidityConfig {
    RangeAndFiniteness { min: f64, max: f64 },
    NotNan,
}

impl ValidityConfig {
    pub fn to_rule(&self) -> Box<dyn ValidityRule> {
        match self {
            ValidityConfig::RangeAndFiniteness { min, max } => {
                Box::new(RangeAndFiniteness::new(*min, *max))
            }
            ValidityConfig::NotNan => Box::new(NotNan),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ValidityConfig::RangeAndFiniteness { .. } => "range_and_finiteness",
            ValidityConfig::NotNan => "not_nan",
        }
    }
}
