//! End-to-end runs over GeoTIFF and GeoJSON files on disk

use gridzonal_algorithms::prelude::*;
use gridzonal_core::io::{read_geotiff, read_polygons_geojson, write_geotiff};
use gridzonal_core::CoordTransformer;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ORIGIN_X: f64 = -5_000_000.0;
const ORIGIN_Y: f64 = -1_700_000.0;
const CELL: f64 = 10_000.0;

/// 3x3 Web Mercator field with rows of 10/20/30, stored south-up on disk
fn write_field(dir: &Path, with_crs: bool) -> PathBuf {
    let data = vec![10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 30.0, 30.0, 30.0];
    let mut raster = Raster::from_vec(data, 3, 3).unwrap();
    raster.set_transform(GeoTransform::new(ORIGIN_X, ORIGIN_Y, CELL, -CELL));
    raster.set_nodata(Some(-9999.0));
    if with_crs {
        raster.set_crs(Some(CRS::web_mercator()));
    }

    let path = dir.join("field.tif");
    write_geotiff(&raster.flipped_vertical(), &path, None).unwrap();
    path
}

/// Box inset into cell (row, col), as lon/lat ring coordinates
fn cell_box_lonlat(row: usize, col: usize) -> Vec<[f64; 2]> {
    let to_lonlat = CoordTransformer::new(&CRS::web_mercator(), &CRS::wgs84()).unwrap();
    let min_x = ORIGIN_X + col as f64 * CELL + 0.2 * CELL;
    let max_x = min_x + 0.6 * CELL;
    let max_y = ORIGIN_Y - row as f64 * CELL - 0.2 * CELL;
    let min_y = max_y - 0.6 * CELL;

    [(min_x, min_y), (max_x, min_y), (max_x, max_y), (min_x, max_y), (min_x, min_y)]
        .iter()
        .map(|&(x, y)| {
            let (lon, lat) = to_lonlat.transform(x, y).unwrap();
            [lon, lat]
        })
        .collect()
}

fn feature(id: i64, ring: &[[f64; 2]]) -> String {
    format!(
        r#"{{ "type": "Feature", "properties": {{ "indice_gre": {} }}, "geometry": {{ "type": "Polygon", "coordinates": [{}] }} }}"#,
        id,
        serde_json::to_string(ring).unwrap()
    )
}

fn write_grid(dir: &Path, features: &[String]) -> PathBuf {
    let path = dir.join("grid.geojson");
    let text = format!(r#"{{ "type": "FeatureCollection", "features": [{}] }}"#, features.join(","));
    std::fs::write(&path, text).unwrap();
    path
}

fn far_away() -> Vec<[f64; 2]> {
    vec![[10.0, 10.0], [10.5, 10.0], [10.5, 10.5], [10.0, 10.5], [10.0, 10.0]]
}

#[test]
fn test_pipeline_from_files() {
    let dir = TempDir::new().unwrap();
    let raster_path = write_field(dir.path(), true);
    let grid_path = write_grid(
        dir.path(),
        &[
            feature(7, &far_away()),
            feature(3, &cell_box_lonlat(0, 1)),
            feature(5, &cell_box_lonlat(2, 2)),
            feature(4, &far_away().iter().map(|[x, y]| [x + 1.0, *y]).collect::<Vec<_>>()),
        ],
    );

    let raster = read_geotiff::<f64, _>(&raster_path, None).unwrap();
    assert!(raster.transform().is_south_up());
    let layer = read_polygons_geojson(&grid_path, "indice_gre").unwrap();

    let table = ZonalPipeline.execute_default((raster, layer)).unwrap();

    let rows: Vec<(PolygonId, f64)> = table.into_rows();
    assert_eq!(
        rows,
        vec![
            (PolygonId::from(7), 10.0),
            (PolygonId::from(3), 10.0),
            (PolygonId::from(5), 30.0),
            (PolygonId::from(4), 30.0),
        ]
    );
}

#[test]
fn test_orientation_modes_on_file() {
    let dir = TempDir::new().unwrap();
    let raster_path = write_field(dir.path(), true);
    let grid_path = write_grid(dir.path(), &[feature(1, &cell_box_lonlat(0, 0))]);

    // Detect turns the stored raster north-up; Never then keeps it
    let raster = read_geotiff::<f64, _>(&raster_path, None).unwrap();
    let (north_up, flipped) = normalize_orientation(raster, OrientationMode::Detect);
    assert!(flipped);

    let layer = read_polygons_geojson(&grid_path, "indice_gre").unwrap();
    let params = ZonalParams {
        rule: InclusionRule::CellCenter,
        orientation: OrientationMode::Never,
    };
    let table = zonal_pipeline(north_up.clone(), layer.clone(), params).unwrap();
    assert_eq!(table.get(&PolygonId::from(1)), Some(10.0));

    // Always flips a north-up raster back to south-up; the footprints and
    // so the mean stay the same
    let params = ZonalParams {
        orientation: OrientationMode::Always,
        ..params
    };
    let table = zonal_pipeline(north_up, layer.clone(), params).unwrap();
    assert_eq!(table.get(&PolygonId::from(1)), Some(10.0));

    // Never on the raster as stored aggregates the south-up rows directly
    let stored = read_geotiff::<f64, _>(&raster_path, None).unwrap();
    let params = ZonalParams {
        orientation: OrientationMode::Never,
        ..params
    };
    let table = zonal_pipeline(stored, layer, params).unwrap();
    assert_eq!(table.get(&PolygonId::from(1)), Some(10.0));
}

#[test]
fn test_raster_without_crs_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let raster_path = write_field(dir.path(), false);
    let grid_path = write_grid(dir.path(), &[feature(1, &cell_box_lonlat(1, 1))]);

    let raster = read_geotiff::<f64, _>(&raster_path, None).unwrap();
    assert!(raster.crs().is_none());
    let layer = read_polygons_geojson(&grid_path, "indice_gre").unwrap();

    let result = ZonalPipeline.execute_default((raster, layer));
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_every_polygon_outside_fails() {
    let dir = TempDir::new().unwrap();
    let raster_path = write_field(dir.path(), true);
    let grid_path = write_grid(dir.path(), &[feature(1, &far_away())]);

    let raster = read_geotiff::<f64, _>(&raster_path, None).unwrap();
    let layer = read_polygons_geojson(&grid_path, "indice_gre").unwrap();

    let result = ZonalPipeline.execute_default((raster, layer));
    assert!(matches!(result, Err(Error::UnresolvableGap { rows: 1 })));
}
