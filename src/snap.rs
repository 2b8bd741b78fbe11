//! Lattice snapping of coordinates.
//!
//! Ties round half to even, so a coordinate exactly between two lattice lines
//! attaches to the line with the even multiple of the resolution.

use crate::error::{GridError, GridResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive, finite lattice size in degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Resolution(f64);

impl Resolution {
    pub fn new(degrees: f64) -> GridResult<Self> {
        if degrees.is_finite() && degrees > 0.0 {
            Ok(Resolution(degrees))
        } else {
            Err(GridError::InvalidResolution(degrees))
        }
    }

    /// For compile-time constants already known to be positive.
    pub(crate) const fn new_unchecked(degrees: f64) -> Self {
        Resolution(degrees)
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Resolution {
    type Error = GridError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Resolution::new(value)
    }
}

impl From<Resolution> for f64 {
    fn from(resolution: Resolution) -> Self {
        resolution.0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Rounds `coordinate` to the nearest multiple of `resolution`.
pub fn snap(coordinate: f64, resolution: Resolution) -> f64 {
    (coordinate / resolution.0).round_ties_even() * resolution.0
}
