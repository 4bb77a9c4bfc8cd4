//! Zonal mean of a raster per polygon
//!
//! Each polygon's cells are found with a scan over the rows its bounding
//! box covers. Two inclusion rules are available:
//!
//! - [`InclusionRule::AllTouched`]: a cell counts when the polygon covers
//!   part of its interior. Each row strip is clipped once, then each cell
//!   of the strip is clipped and measured. Touching a cell along an edge
//!   or at a corner does not count, and neither does an overlap at the
//!   rounding-noise level of the cell's coordinates.
//! - [`InclusionRule::CellCenter`]: a cell counts when its center is inside
//!   the polygon (even-odd rule, holes excluded).
//!
//! Any axis-aligned raster works: rows may run north to south or south to
//! north, the cell footprints come from the transform either way.

use crate::vector::{clip_ring, open_ring, ring_area, ClipRect};
use geo::{BoundingRect, Coord, CoordsIter, MultiPolygon};
use gridzonal_core::raster::{GeoTransform, Raster};
use gridzonal_core::vector::PolygonLayer;
use gridzonal_core::{Error, Result};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::table::{ZonalRow, ZonalTable};

/// Multiple of machine epsilon that clipping round-off may reach
const CONTACT_ULPS: f64 = 64.0;

/// Which cells belong to a polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionRule {
    /// Every cell whose interior the polygon overlaps
    #[default]
    AllTouched,
    /// Cells whose center lies inside the polygon
    CellCenter,
}

impl fmt::Display for InclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InclusionRule::AllTouched => f.write_str("all-touched"),
            InclusionRule::CellCenter => f.write_str("cell-center"),
        }
    }
}

impl FromStr for InclusionRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "all-touched" => Ok(InclusionRule::AllTouched),
            "cell-center" | "center" => Ok(InclusionRule::CellCenter),
            _ => Err(Error::InvalidParameter {
                name: "rule",
                value: s.to_string(),
                reason: "expected all-touched or cell-center".into(),
            }),
        }
    }
}

/// Axis-aligned grid geometry shared by every polygon of a run.
///
/// Cell sizes keep the transform's signs, so `cell_height` is negative for
/// north-up rows and positive for south-up rows.
#[derive(Debug, Clone, Copy)]
struct Grid {
    origin_x: f64,
    origin_y: f64,
    cell_width: f64,
    cell_height: f64,
    rows: usize,
    cols: usize,
}

impl Grid {
    fn new(transform: &GeoTransform, rows: usize, cols: usize) -> Result<Self> {
        let rotated = transform.row_rotation.abs() > 1e-10 || transform.col_rotation.abs() > 1e-10;
        let usable = |size: f64| size.is_finite() && size != 0.0;
        if rotated || !usable(transform.pixel_width) || !usable(transform.pixel_height) {
            return Err(Error::Orientation(format!(
                "aggregation needs an axis-aligned raster with non-zero cell sizes, got {:?}",
                transform.to_gdal()
            )));
        }

        Ok(Self {
            origin_x: transform.origin_x,
            origin_y: transform.origin_y,
            cell_width: transform.pixel_width,
            cell_height: transform.pixel_height,
            rows,
            cols,
        })
    }

    /// X extent of the columns `cols` as (min, max)
    fn x_span(&self, cols: Range<usize>) -> (f64, f64) {
        span(self.origin_x, self.cell_width, cols)
    }

    /// Y extent of the rows `rows` as (min, max)
    fn y_span(&self, rows: Range<usize>) -> (f64, f64) {
        span(self.origin_y, self.cell_height, rows)
    }

    fn col_center(&self, col: usize) -> f64 {
        self.origin_x + (col as f64 + 0.5) * self.cell_width
    }

    fn row_center(&self, row: usize) -> f64 {
        self.origin_y + (row as f64 + 0.5) * self.cell_height
    }

    /// Rows and columns covered by a bounding box, clipped to the grid.
    ///
    /// Non-finite bounds cover nothing.
    fn window(&self, min: Coord<f64>, max: Coord<f64>) -> Option<(Range<usize>, Range<usize>)> {
        if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
            return None;
        }
        let rows = axis_range(min.y, max.y, self.origin_y, self.cell_height, self.rows)?;
        let cols = axis_range(min.x, max.x, self.origin_x, self.cell_width, self.cols)?;
        Some((rows, cols))
    }
}

fn span(origin: f64, size: f64, cells: Range<usize>) -> (f64, f64) {
    let a = origin + cells.start as f64 * size;
    let b = origin + cells.end as f64 * size;
    (a.min(b), a.max(b))
}

/// Cell indices along one axis whose extent meets `[lo, hi]`
fn axis_range(lo: f64, hi: f64, origin: f64, size: f64, n: usize) -> Option<Range<usize>> {
    let a = (lo - origin) / size;
    let b = (hi - origin) / size;
    let start = a.min(b).floor().max(0.0);
    let end = a.max(b).ceil().min(n as f64);
    (start < end).then(|| start as usize..end as usize)
}

/// Largest overlap with `cell` that is still treated as contact.
///
/// Clipped vertices carry round-off relative to the coordinate magnitude,
/// so the bound scales with it and with the cell extent, never with the
/// cell area alone. Polygons far smaller than a cell still select it.
fn contact_tolerance(cell: &ClipRect) -> f64 {
    let extent = (cell.max_x - cell.min_x).max(cell.max_y - cell.min_y);
    let magnitude = [cell.min_x, cell.max_x, cell.min_y, cell.max_y]
        .iter()
        .fold(extent, |m, v| m.max(v.abs()));
    CONTACT_ULPS * f64::EPSILON * magnitude * extent
}

/// Polygon rings as open vertex lists, tagged +1 for shells and -1 for holes
fn signed_rings(geometry: &MultiPolygon<f64>) -> Vec<(Vec<Coord<f64>>, f64)> {
    geometry
        .iter()
        .flat_map(|polygon| {
            std::iter::once((open_ring(polygon.exterior()), 1.0))
                .chain(polygon.interiors().iter().map(|hole| (open_ring(hole), -1.0)))
        })
        .filter(|(ring, _)| ring.len() >= 3)
        .collect()
}

fn touched_cells(geometry: &MultiPolygon<f64>, grid: &Grid) -> Vec<(usize, usize)> {
    let Some(bounds) = geometry.bounding_rect() else {
        return Vec::new();
    };
    let Some((rows, cols)) = grid.window(bounds.min(), bounds.max()) else {
        return Vec::new();
    };

    let rings = signed_rings(geometry);
    let mut cells = Vec::new();
    let (strip_left, strip_right) = grid.x_span(cols.clone());

    for row in rows {
        let (bottom, top) = grid.y_span(row..row + 1);
        let strip = ClipRect::new(strip_left, bottom, strip_right, top);

        let pieces: Vec<(Vec<Coord<f64>>, f64)> = rings
            .iter()
            .map(|(ring, sign)| (clip_ring(ring, &strip), *sign))
            .filter(|(piece, _)| piece.len() >= 3)
            .collect();
        if pieces.is_empty() {
            continue;
        }

        for col in cols.clone() {
            let (left, right) = grid.x_span(col..col + 1);
            let cell = ClipRect::new(left, bottom, right, top);
            let overlap: f64 = pieces
                .iter()
                .map(|(piece, sign)| sign * ring_area(&clip_ring(piece, &cell)))
                .sum();
            if overlap > contact_tolerance(&cell) {
                cells.push((row, col));
            }
        }
    }

    cells
}

fn center_cells(geometry: &MultiPolygon<f64>, grid: &Grid) -> Vec<(usize, usize)> {
    let Some(bounds) = geometry.bounding_rect() else {
        return Vec::new();
    };
    let Some((rows, cols)) = grid.window(bounds.min(), bounds.max()) else {
        return Vec::new();
    };

    let rings = signed_rings(geometry);
    let mut cells = Vec::new();
    let mut crossings = Vec::new();

    for row in rows {
        let y = grid.row_center(row);

        crossings.clear();
        for (ring, _) in &rings {
            let n = ring.len();
            for i in 0..n {
                let a = ring[i];
                let b = ring[(i + 1) % n];
                if (a.y > y) != (b.y > y) {
                    crossings.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
        }
        if crossings.is_empty() {
            continue;
        }
        crossings.sort_by(f64::total_cmp);

        for col in cols.clone() {
            let x = grid.col_center(col);
            if crossings.partition_point(|&cx| cx < x) % 2 == 1 {
                cells.push((row, col));
            }
        }
    }

    cells
}

/// Cells selected by `rule`; geometries with non-finite coordinates select
/// nothing
fn selected_cells(geometry: &MultiPolygon<f64>, grid: &Grid, rule: InclusionRule) -> Vec<(usize, usize)> {
    if !geometry.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        return Vec::new();
    }
    match rule {
        InclusionRule::AllTouched => touched_cells(geometry, grid),
        InclusionRule::CellCenter => center_cells(geometry, grid),
    }
}

/// Mean raster value per polygon.
///
/// Rows come back in layer order. Cells equal to the raster's no-data value
/// and NaN cells are skipped. A polygon with no valid cell gets no value
/// rather than zero. North-up and south-up rasters give the same result
/// for the same cell footprints.
///
/// # Errors
/// - [`Error::InputShape`] for an empty raster
/// - [`Error::Orientation`] when the transform is rotated or has a zero or
///   non-finite cell size
pub fn zonal_mean(layer: &PolygonLayer, raster: &Raster<f64>, rule: InclusionRule) -> Result<ZonalTable> {
    let (rows, cols) = raster.shape();
    if rows == 0 || cols == 0 {
        return Err(Error::InputShape { rows, cols, width: cols, height: rows });
    }
    let grid = Grid::new(raster.transform(), rows, cols)?;
    let data: ArrayView2<'_, f64> = raster.view();

    let mut empty = 0usize;
    let results = layer
        .iter()
        .enumerate()
        .map(|(sequence, zone)| {
            let cells = selected_cells(&zone.geometry, &grid, rule);

            let mut sum = 0.0;
            let mut valid = 0usize;
            for &(row, col) in &cells {
                let value = data[[row, col]];
                if raster.is_nodata(value) {
                    continue;
                }
                sum += value;
                valid += 1;
            }

            let mean = (valid > 0).then(|| sum / valid as f64);
            if mean.is_none() {
                empty += 1;
                debug!(id = %zone.id, selected = cells.len(), "Polygon has no valid cells");
            }

            ZonalRow::new(zone.id.clone(), sequence, mean, valid)
        })
        .collect();

    if empty > 0 {
        warn!(empty, polygons = layer.len(), "Polygons without a zonal value");
    }
    info!(polygons = layer.len(), %rule, "Zonal mean computed");

    ZonalTable::new(results)
}
