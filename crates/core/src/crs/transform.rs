//! Point transforms between two CRS using proj4rs (pure Rust, no libproj)

use super::CRS;
use crate::error::{Error, Result};
use proj4rs::proj::Proj;

/// Coordinate transformer between a source and a target CRS.
///
/// Geographic coordinates are given and returned in degrees; the radian
/// conversion proj4rs expects is handled here.
pub struct CoordTransformer {
    source_proj: Proj,
    target_proj: Proj,
    source_is_geographic: bool,
    target_is_geographic: bool,
}

impl CoordTransformer {
    /// Build a transformer from `source` to `target`
    pub fn new(source: &CRS, target: &CRS) -> Result<Self> {
        Ok(Self {
            source_proj: build_proj(source)?,
            target_proj: build_proj(target)?,
            source_is_geographic: source.is_geographic(),
            target_is_geographic: target.is_geographic(),
        })
    }

    /// Transform a single coordinate pair
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut point = if self.source_is_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(&self.source_proj, &self.target_proj, &mut point)
            .map_err(|e| Error::Reprojection(format!("transform of ({}, {}) failed: {:?}", x, y, e)))?;

        let (out_x, out_y) = if self.target_is_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(Error::Reprojection(format!(
                "({}, {}) has no finite image in the target CRS",
                x, y
            )));
        }

        Ok((out_x, out_y))
    }
}

fn build_proj(crs: &CRS) -> Result<Proj> {
    let definition = crs
        .proj_definition()
        .ok_or_else(|| Error::Reprojection(format!("no PROJ definition for {}", crs)))?;
    Proj::from_proj_string(&definition)
        .map_err(|e| Error::Reprojection(format!("invalid projection {}: {:?}", crs, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wgs84_to_mercator_origin() {
        let t = CoordTransformer::new(&CRS::wgs84(), &CRS::web_mercator()).unwrap();
        let (x, y) = t.transform(0.0, 0.0).unwrap();
        assert_relative_eq!(x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mercator_roundtrip() {
        let forward = CoordTransformer::new(&CRS::wgs84(), &CRS::web_mercator()).unwrap();
        let back = CoordTransformer::new(&CRS::web_mercator(), &CRS::wgs84()).unwrap();

        let (x, y) = forward.transform(-47.93, -15.78).unwrap();
        assert_relative_eq!(x, -5_335_543.19, epsilon = 0.01);

        let (lon, lat) = back.transform(x, y).unwrap();
        assert_relative_eq!(lon, -47.93, epsilon = 1e-7);
        assert_relative_eq!(lat, -15.78, epsilon = 1e-7);
    }

    #[test]
    fn test_wkt_only_is_rejected() {
        let wkt = CRS::from_wkt("GEOGCS[\"unknown\"]");
        assert!(matches!(
            CoordTransformer::new(&wkt, &CRS::wgs84()),
            Err(Error::Reprojection(_))
        ));
    }
}
