//! Polygon zones: identified polygons with a shared CRS

use crate::crs::CRS;
use crate::error::{Error, Result};
use geo_types::{MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier of a zone, taken from an integer or string attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolygonId {
    Int(i64),
    Text(String),
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolygonId::Int(v) => write!(f, "{}", v),
            PolygonId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PolygonId {
    fn from(v: i64) -> Self {
        PolygonId::Int(v)
    }
}

impl From<i32> for PolygonId {
    fn from(v: i32) -> Self {
        PolygonId::Int(i64::from(v))
    }
}

impl From<&str> for PolygonId {
    fn from(s: &str) -> Self {
        PolygonId::Text(s.to_string())
    }
}

impl From<String> for PolygonId {
    fn from(s: String) -> Self {
        PolygonId::Text(s)
    }
}

/// A single zone
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePolygon {
    pub id: PolygonId,
    pub geometry: MultiPolygon<f64>,
}

impl ZonePolygon {
    pub fn new(id: impl Into<PolygonId>, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
        }
    }

    /// Convenience constructor for a single polygon
    pub fn from_polygon(id: impl Into<PolygonId>, polygon: Polygon<f64>) -> Self {
        Self::new(id, MultiPolygon::new(vec![polygon]))
    }
}

/// Ordered collection of zones sharing one CRS.
///
/// Identifiers are unique and the order is the order the zones were read
/// in; results are reported in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonLayer {
    polygons: Vec<ZonePolygon>,
    crs: CRS,
    id_field: String,
}

impl PolygonLayer {
    /// Build a layer, rejecting duplicate identifiers
    pub fn new(polygons: Vec<ZonePolygon>, crs: CRS, id_field: impl Into<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(polygons.len());
        for polygon in &polygons {
            if !seen.insert(&polygon.id) {
                return Err(Error::DuplicateId(polygon.id.to_string()));
            }
        }

        Ok(Self {
            polygons,
            crs,
            id_field: id_field.into(),
        })
    }

    pub fn crs(&self) -> &CRS {
        &self.crs
    }

    /// Name of the attribute the identifiers were read from
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn polygons(&self) -> &[ZonePolygon] {
        &self.polygons
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZonePolygon> {
        self.polygons.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PolygonId> {
        self.polygons.iter().map(|p| &p.id)
    }

    /// Replace every geometry through `f`, keeping ids and order, and tag
    /// the result with `crs`. Stops at the first error.
    pub fn try_map_geometries<F>(self, crs: CRS, mut f: F) -> Result<Self>
    where
        F: FnMut(&MultiPolygon<f64>) -> Result<MultiPolygon<f64>>,
    {
        let polygons = self
            .polygons
            .into_iter()
            .map(|zone| {
                let geometry = f(&zone.geometry)?;
                Ok(ZonePolygon {
                    id: zone.id,
                    geometry,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            polygons,
            crs,
            id_field: self.id_field,
        })
    }
}

impl IntoIterator for PolygonLayer {
    type Item = ZonePolygon;
    type IntoIter = std::vec::IntoIter<ZonePolygon>;

    fn into_iter(self) -> Self::IntoIter {
        self.polygons.into_iter()
    }
}
