use std::fmt;

use geo_types::Polygon;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Coordinate reference system tag carried by a whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    epsg: u32,
}

impl Crs {
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// WGS84 geographic (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// OGC URN form, as written into GeoJSON `crs` members.
    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.epsg)
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// Attribute rows paired one-to-one with polygon geometries.
#[derive(Debug, Clone)]
pub struct GeoTable {
    pub frame: DataFrame,
    pub geometries: Vec<Polygon<f64>>,
    pub crs: Crs,
    pub key_field: Option<String>,
    /// Mean |input centroid_x - recomputed centroid_x|, when the input had one.
    pub centroid_deviation: Option<f64>,
}

impl GeoTable {
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}
