//! End-to-end zonal pipeline
//!
//! CRS alignment, orientation normalization, zonal mean and gap filling,
//! run in that order. The first failing stage aborts the run.

use crate::alignment::{align_crs, normalize_orientation, OrientationMode};
use crate::statistics::{fill_gaps, zonal_mean, CompleteTable, InclusionRule};
use gridzonal_core::raster::Raster;
use gridzonal_core::vector::PolygonLayer;
use gridzonal_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Parameters for the zonal pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZonalParams {
    /// Which cells belong to a polygon
    pub rule: InclusionRule,
    /// When to flip the raster rows
    pub orientation: OrientationMode,
}

/// Zonal pipeline algorithm
#[derive(Debug, Clone, Default)]
pub struct ZonalPipeline;

impl Algorithm for ZonalPipeline {
    type Input = (Raster<f64>, PolygonLayer);
    type Output = CompleteTable;
    type Params = ZonalParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "ZonalPipeline"
    }

    fn description(&self) -> &'static str {
        "Gap-filled mean raster value per polygon, in polygon order"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (raster, layer) = input;
        zonal_pipeline(raster, layer, params)
    }
}

/// Run the four stages on `raster` and `layer`.
///
/// # Errors
/// Whatever the first failing stage reports: a raster without CRS, a
/// failed reprojection, an unusable raster shape or orientation, or no
/// polygon producing a value.
pub fn zonal_pipeline(raster: Raster<f64>, layer: PolygonLayer, params: ZonalParams) -> Result<CompleteTable> {
    let layer = align_crs(raster.crs(), layer)?;
    let (raster, _) = normalize_orientation(raster, params.orientation);
    let table = zonal_mean(&layer, &raster, params.rule)?;
    let complete = fill_gaps(table).into_complete()?;

    info!(
        polygons = complete.len(),
        filled = complete.filled_count(),
        "Zonal pipeline finished"
    );
    Ok(complete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use gridzonal_core::vector::{PolygonId, ZonePolygon};
    use gridzonal_core::{GeoTransform, CRS};

    fn uniform(value: f64) -> Raster<f64> {
        let mut raster = Raster::filled(4, 4, value);
        raster.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        raster.set_crs(Some(CRS::from_epsg(4326)));
        raster
    }

    fn square(id: i64, x: f64, y: f64) -> ZonePolygon {
        ZonePolygon::from_polygon(
            id,
            polygon![
                (x: x, y: y),
                (x: x + 1.0, y: y),
                (x: x + 1.0, y: y + 1.0),
                (x: x, y: y + 1.0),
            ],
        )
    }

    #[test]
    fn test_outside_polygon_takes_neighbour_value() {
        let layer = PolygonLayer::new(
            vec![square(1, 0.0, 0.0), square(2, 50.0, 50.0), square(3, 2.0, 2.0)],
            CRS::wgs84(),
            "indice_gre",
        )
        .unwrap();

        let table = ZonalPipeline.execute_default((uniform(5.0), layer)).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(&PolygonId::from(2)), Some(5.0));
        assert_eq!(table.filled_count(), 1);
    }

    #[test]
    fn test_flipped_field_maps_to_same_rows() {
        let data = vec![10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 30.0, 30.0, 30.0];
        let mut raster = Raster::from_vec(data, 3, 3).unwrap();
        raster.set_transform(GeoTransform::new(0.0, 0.0, 1.0, -1.0));
        raster.set_crs(Some(CRS::wgs84()));
        let row_zero = PolygonLayer::new(vec![square(1, 0.0, -1.0)], CRS::wgs84(), "id").unwrap();

        for input in [raster.clone(), raster.flipped_vertical()] {
            let table = zonal_pipeline(input, row_zero.clone(), ZonalParams::default()).unwrap();
            assert_eq!(table.get(&PolygonId::from(1)), Some(10.0));
        }
    }

    #[test]
    fn test_all_outside_is_unresolvable() {
        let layer = PolygonLayer::new(
            vec![square(1, 50.0, 50.0), square(2, -50.0, 50.0)],
            CRS::wgs84(),
            "indice_gre",
        )
        .unwrap();

        let result = zonal_pipeline(uniform(5.0), layer, ZonalParams::default());
        assert!(matches!(result, Err(Error::UnresolvableGap { rows: 2 })));
    }

    #[test]
    fn test_raster_without_crs_fails() {
        let mut raster = uniform(5.0);
        raster.set_crs(None);
        let layer = PolygonLayer::new(vec![square(1, 0.0, 0.0)], CRS::wgs84(), "id").unwrap();
        let result = zonal_pipeline(raster, layer, ZonalParams::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_empty_layer_gives_empty_table() {
        let layer = PolygonLayer::new(Vec::new(), CRS::wgs84(), "id").unwrap();
        let table = zonal_pipeline(uniform(5.0), layer, ZonalParams::default()).unwrap();
        assert!(table.is_empty());
    }

    fn banded() -> Raster<f64> {
        let data = vec![10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 30.0, 30.0, 30.0];
        let mut raster = Raster::from_vec(data, 3, 3).unwrap();
        raster.set_transform(GeoTransform::new(0.0, 0.0, 1.0, -1.0));
        raster.set_crs(Some(CRS::wgs84()));
        raster
    }

    #[test]
    fn test_every_orientation_mode_gives_same_table() {
        let layer = PolygonLayer::new(
            vec![square(1, 0.0, -1.0), square(2, 2.0, -3.0), square(3, 40.0, 40.0)],
            CRS::wgs84(),
            "id",
        )
        .unwrap();

        for input in [banded(), banded().flipped_vertical()] {
            for orientation in [OrientationMode::Detect, OrientationMode::Always, OrientationMode::Never] {
                let params = ZonalParams {
                    orientation,
                    ..Default::default()
                };
                let table = zonal_pipeline(input.clone(), layer.clone(), params).unwrap();
                assert_eq!(table.get(&PolygonId::from(1)), Some(10.0), "{orientation}");
                assert_eq!(table.get(&PolygonId::from(2)), Some(30.0), "{orientation}");
                assert_eq!(table.get(&PolygonId::from(3)), Some(30.0), "{orientation}");
            }
        }
    }

    #[test]
    fn test_rotated_raster_fails() {
        let mut raster = uniform(5.0);
        let mut transform = *raster.transform();
        transform.col_rotation = 0.25;
        raster.set_transform(transform);

        let layer = PolygonLayer::new(vec![square(1, 0.0, 0.0)], CRS::wgs84(), "id").unwrap();
        let result = zonal_pipeline(raster, layer, ZonalParams::default());
        assert!(matches!(result, Err(Error::Orientation(_))));
    }
}
