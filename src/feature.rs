//! # GeoJSON Features
//!
//! Output records of both pipelines. Coordinates are always
//! `[longitude, latitude]`. Cell features carry a closed five-vertex ring and
//! point features a single position; each carries exactly one named scalar
//! property.
//!
//! The builders do not validate property values. Filtering happens upstream
//! in the cell aggregator (or, optionally, the point pipeline).

use crate::aggregate::CellCorners;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// A `[longitude, latitude]` pair.
pub type Position = [f64; 2];

/// GeoJSON geometry restricted to the two shapes the pipelines emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    Polygon { coordinates: Vec<Vec<Position>> },
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::Polygon { .. } => "Polygon",
        }
    }

    /// Outer ring of a polygon; `None` for points.
    pub fn exterior(&self) -> Option<&[Position]> {
        match self {
            Geometry::Polygon { coordinates } => coordinates.first().map(Vec::as_slice),
            Geometry::Point { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Always "Feature".
    #[serde(rename = "type")]
    pub feature_type: String,

    pub geometry: Geometry,

    pub properties: BTreeMap<String, f64>,
}

impl Feature {
    fn new(geometry: Geometry, property_name: &str, value: f64) -> Self {
        let mut properties = BTreeMap::new();
        properties.insert(property_name.to_string(), value);
        Feature {
            feature_type: "Feature".to_string(),
            geometry,
            properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }
}

/// Builds the rectangle `(lon1,lat1) → (lon2,lat1) → (lon2,lat2) → (lon1,lat2) → (lon1,lat1)`.
pub fn build_cell_feature(corners: &CellCorners, value: f64, property_name: &str) -> Feature {
    let CellCorners {
        lat1,
        lat2,
        lon1,
        lon2,
    } = *corners;
    let ring = vec![
        [lon1, lat1],
        [lon2, lat1],
        [lon2, lat2],
        [lon1, lat2],
        [lon1, lat1],
    ];
    Feature::new(
        Geometry::Polygon {
            coordinates: vec![ring],
        },
        property_name,
        value,
    )
}

pub fn build_point_feature(lat: f64, lon: f64, value: f64, property_name: &str) -> Feature {
    Feature::new(Geometry::Point { coordinates: [lon, lat] }, property_name, value)
}

/// Ordered collection of features, serialised as a GeoJSON FeatureCollection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection".
    #[serde(rename = "type")]
    pub collection_type: String,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Wraps features in insertion order. No sorting, deduplication or limit.
    pub fn assemble<I>(features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
    {
        FeatureCollection {
            collection_type: "FeatureCollection".to_string(),
            features: features.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_json(&mut buffer, pretty)?;
        Ok(buffer)
    }

    pub fn write_json<W: Write>(&self, writer: W, pretty: bool) -> serde_json::Result<()> {
        if pretty {
            serde_json::to_writer_pretty(writer, self)
        } else {
            serde_json::to_writer(writer, self)
        }
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        FeatureCollection::assemble(iter)
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// Free-function form of [`FeatureCollection::assemble`].
pub fn assemble(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection::assemble(features)
}
