//! CRS alignment of polygon layers
//!
//! The raster CRS is authoritative: polygons are reprojected onto it and
//! the raster itself is never resampled.

use geo::{Coord, MapCoords};
use gridzonal_core::crs::{CoordTransformer, CRS};
use gridzonal_core::vector::PolygonLayer;
use gridzonal_core::{Error, Result};
use tracing::{debug, info};

/// Express `layer` in the raster CRS.
///
/// Returns the layer untouched when both sides carry the same CRS
/// identifier. Otherwise every ring vertex is transformed and the new
/// layer is tagged with the raster CRS; ids and order do not change.
///
/// # Errors
/// - [`Error::Configuration`] when the raster has no CRS
/// - [`Error::Reprojection`] when either CRS has no usable definition or a
///   vertex cannot be transformed
pub fn align_crs(raster_crs: Option<&CRS>, layer: PolygonLayer) -> Result<PolygonLayer> {
    let target = raster_crs.ok_or_else(|| {
        Error::Configuration("raster carries no CRS, cannot align the polygon layer".into())
    })?;

    if layer.crs().same_identifier(target) {
        debug!(crs = %target, "Polygon layer already in raster CRS, reusing it");
        return Ok(layer);
    }

    info!(
        from = %layer.crs(),
        to = %target,
        polygons = layer.len(),
        "Reprojecting polygon layer"
    );

    let transformer = CoordTransformer::new(layer.crs(), target)?;
    layer.try_map_geometries(target.clone(), |geometry| {
        geometry.try_map_coords(|coord| {
            let (x, y) = transformer.transform(coord.x, coord.y)?;
            Ok(Coord { x, y })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::polygon;
    use gridzonal_core::vector::ZonePolygon;

    fn brasilia_layer() -> PolygonLayer {
        let zone = ZonePolygon::from_polygon(
            1,
            polygon![
                (x: -47.93, y: -15.78),
                (x: -47.83, y: -15.78),
                (x: -47.83, y: -15.68),
                (x: -47.93, y: -15.68),
            ],
        );
        PolygonLayer::new(vec![zone], CRS::wgs84(), "indice_gre").unwrap()
    }

    fn first_coord(layer: &PolygonLayer) -> Coord<f64> {
        layer.polygons()[0].geometry.0[0].exterior().0[0]
    }

    #[test]
    fn test_same_crs_is_identity() {
        let layer = brasilia_layer();
        let aligned = align_crs(Some(&CRS::from_epsg(4326)), layer.clone()).unwrap();
        assert_eq!(aligned, layer);
    }

    #[test]
    fn test_missing_raster_crs_is_configuration_error() {
        let result = align_crs(None, brasilia_layer());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_reproject_to_web_mercator_and_back() {
        let layer = brasilia_layer();
        let original = first_coord(&layer);

        let mercator = align_crs(Some(&CRS::web_mercator()), layer).unwrap();
        assert_eq!(mercator.crs(), &CRS::web_mercator());
        assert_eq!(mercator.id_field(), "indice_gre");
        let projected = first_coord(&mercator);
        assert_relative_eq!(projected.x, -5_335_543.19, epsilon = 0.01);
        assert!(projected.y < 0.0);

        let back = align_crs(Some(&CRS::wgs84()), mercator).unwrap();
        let restored = first_coord(&back);
        assert_relative_eq!(restored.x, original.x, epsilon = 1e-8);
        assert_relative_eq!(restored.y, original.y, epsilon = 1e-8);
    }

    #[test]
    fn test_wkt_only_target_is_rejected() {
        let target = CRS::from_wkt("LOCAL_CS[\"grid\"]");
        let result = align_crs(Some(&target), brasilia_layer());
        assert!(matches!(result, Err(Error::Reprojection(_))));
    }
}
