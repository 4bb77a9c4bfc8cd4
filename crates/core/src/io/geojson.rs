//! GeoJSON polygon layer reading
//!
//! Reads a FeatureCollection of Polygon / MultiPolygon features into a
//! [`PolygonLayer`], keeping feature order. The layer CRS comes from the
//! legacy `crs` member when present and defaults to EPSG:4326 (RFC 7946).

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{PolygonId, PolygonLayer, ZonePolygon};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct FeatureCollectionDoc {
    #[serde(rename = "type")]
    type_: String,
    #[serde(default)]
    crs: Option<NamedCrsDoc>,
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Deserialize)]
struct NamedCrsDoc {
    properties: NamedCrsProperties,
}

#[derive(Debug, Deserialize)]
struct NamedCrsProperties {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    geometry: Option<GeometryDoc>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct GeometryDoc {
    #[serde(rename = "type")]
    type_: String,
    #[serde(default)]
    coordinates: Value,
}

type RingDoc = Vec<Vec<f64>>;

/// Read a polygon layer from a GeoJSON file.
///
/// `id_field` names the property holding the zone identifier; `"id"` also
/// matches the feature-level `id` member.
pub fn read_polygons_geojson<P: AsRef<Path>>(path: P, id_field: &str) -> Result<PolygonLayer> {
    let text = std::fs::read_to_string(path.as_ref())?;
    read_polygons_geojson_str(&text, id_field)
}

/// Read a polygon layer from a GeoJSON string
pub fn read_polygons_geojson_str(text: &str, id_field: &str) -> Result<PolygonLayer> {
    let doc: FeatureCollectionDoc = serde_json::from_str(text)?;
    if doc.type_ != "FeatureCollection" {
        return Err(Error::Vector(format!(
            "expected a FeatureCollection, found {}",
            doc.type_
        )));
    }

    let crs = match &doc.crs {
        Some(named) => CRS::parse(&named.properties.name).ok_or_else(|| {
            Error::Vector(format!("unrecognised CRS name {}", named.properties.name))
        })?,
        None => CRS::wgs84(),
    };

    let polygons = doc
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let id = feature_id(feature, id_field)
                .ok_or_else(|| Error::Vector(format!("feature {} has no usable '{}'", index, id_field)))?;
            let geometry = feature
                .geometry
                .as_ref()
                .ok_or_else(|| Error::Vector(format!("feature {} has no geometry", id)))
                .and_then(|g| to_multipolygon(g).map_err(|e| Error::Vector(format!("feature {}: {}", id, e))))?;
            Ok(ZonePolygon { id, geometry })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(polygons = polygons.len(), crs = %crs, id_field, "Parsed GeoJSON polygon layer");
    PolygonLayer::new(polygons, crs, id_field)
}

fn feature_id(feature: &FeatureDoc, id_field: &str) -> Option<PolygonId> {
    let from_properties = feature
        .properties
        .as_ref()
        .and_then(|props| props.get(id_field));
    let value = match from_properties {
        Some(v) => v,
        None if id_field == "id" => feature.id.as_ref()?,
        None => return None,
    };

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(PolygonId::Int(i))
            } else {
                // Shapefile exports often store integer ids as doubles
                let f = n.as_f64()?;
                (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then(|| PolygonId::Int(f as i64))
            }
        }
        Value::String(s) => Some(PolygonId::Text(s.clone())),
        _ => None,
    }
}

fn to_multipolygon(geometry: &GeometryDoc) -> std::result::Result<MultiPolygon<f64>, String> {
    match geometry.type_.as_str() {
        "Polygon" => {
            let rings: Vec<RingDoc> =
                serde_json::from_value(geometry.coordinates.clone()).map_err(|e| e.to_string())?;
            Ok(MultiPolygon::new(vec![to_polygon(&rings)?]))
        }
        "MultiPolygon" => {
            let parts: Vec<Vec<RingDoc>> =
                serde_json::from_value(geometry.coordinates.clone()).map_err(|e| e.to_string())?;
            let polygons = parts
                .iter()
                .map(|rings| to_polygon(rings))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(MultiPolygon::new(polygons))
        }
        other => Err(format!("unsupported geometry type {}", other)),
    }
}

fn to_polygon(rings: &[RingDoc]) -> std::result::Result<Polygon<f64>, String> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| "polygon without rings".to_string())?;
    let interiors = interiors
        .iter()
        .map(|ring| to_ring(ring))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Polygon::new(to_ring(exterior)?, interiors))
}

fn to_ring(positions: &RingDoc) -> std::result::Result<LineString<f64>, String> {
    if positions.len() < 3 {
        return Err(format!("ring with {} positions", positions.len()));
    }
    positions
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err("position with fewer than two coordinates".to_string()),
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}
