//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and geographic coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// For north-up images, `row_rotation` and `col_rotation` are 0 and
/// `pixel_height` is negative: row 0 is the northernmost row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, negative for north-up)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Convert to GDAL-style array
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Convert pixel coordinates to geographic coordinates
    ///
    /// Returns the coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let col_f = col as f64 + 0.5;
        let row_f = row as f64 + 0.5;

        let x = self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation;
        let y = self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height;

        (x, y)
    }

    /// Convert pixel coordinates to geographic coordinates (top-left corner)
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        let col_f = col as f64;
        let row_f = row as f64;

        let x = self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation;
        let y = self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height;

        (x, y)
    }

    /// Get the cell size (assumes square pixels and no rotation)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Check if this is a north-up image (no rotation)
    pub fn is_north_up(&self) -> bool {
        self.row_rotation.abs() < 1e-10
            && self.col_rotation.abs() < 1e-10
            && self.pixel_height < 0.0
    }

    /// Whether stored rows run south to north (`pixel_height > 0`)
    pub fn is_south_up(&self) -> bool {
        self.pixel_height > 0.0
    }

    /// Transform describing the same grid after its `rows` rows are
    /// reversed (row `i` becomes row `rows - 1 - i`).
    ///
    /// The origin moves to the far edge of the last row, which is the
    /// first row after the flip, and the vertical terms change sign. Must
    /// only be applied together with the matching array flip.
    pub fn flipped_vertical(&self, rows: usize) -> Self {
        let n = rows as f64;
        Self {
            origin_x: self.origin_x + self.row_rotation * n,
            origin_y: self.origin_y + self.pixel_height * n,
            pixel_width: self.pixel_width,
            pixel_height: -self.pixel_height,
            row_rotation: -self.row_rotation,
            col_rotation: self.col_rotation,
        }
    }

    /// Calculate the bounding box for a raster of given dimensions
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.pixel_to_geo_corner(0, 0);
        let (x1, y1) = self.pixel_to_geo_corner(width, 0);
        let (x2, y2) = self.pixel_to_geo_corner(0, height);
        let (x3, y3) = self.pixel_to_geo_corner(width, height);

        let min_x = x0.min(x1).min(x2).min(x3);
        let max_x = x0.max(x1).max(x2).max(x3);
        let min_y = y0.min(y1).min(y2).min(y3);
        let max_y = y0.max(y1).max(y2).max(y3);

        (min_x, min_y, max_x, max_y)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_to_geo_center_and_corner() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);

        let (x, y) = gt.pixel_to_geo(5, 10);
        assert_relative_eq!(x, 155.0, epsilon = 1e-10);
        assert_relative_eq!(y, 95.0, epsilon = 1e-10);

        let (x, y) = gt.pixel_to_geo_corner(5, 10);
        assert_relative_eq!(x, 150.0, epsilon = 1e-10);
        assert_relative_eq!(y, 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_bounds() {
        let gt = GeoTransform::new(0.0, 100.0, 1.0, -1.0);
        let (min_x, min_y, max_x, max_y) = gt.bounds(100, 100);

        assert_relative_eq!(min_x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(min_y, 0.0, epsilon = 1e-10);
        assert_relative_eq!(max_x, 100.0, epsilon = 1e-10);
        assert_relative_eq!(max_y, 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_flipped_vertical_keeps_cell_footprints() {
        // South-up grid: row 0 spans y in [-35, -34.9]
        let gt = GeoTransform::new(-53.0, -35.0, 0.1, 0.1);
        let flipped = gt.flipped_vertical(50);

        assert!(flipped.is_north_up());
        assert_relative_eq!(flipped.origin_y, -30.0, epsilon = 1e-9);

        // Old row 0 is new row 49; both describe the same cell center
        let (x_old, y_old) = gt.pixel_to_geo(3, 0);
        let (x_new, y_new) = flipped.pixel_to_geo(3, 49);
        assert_relative_eq!(x_old, x_new, epsilon = 1e-9);
        assert_relative_eq!(y_old, y_new, epsilon = 1e-9);
    }

    #[test]
    fn test_flipped_vertical_twice_is_identity() {
        // Dyadic cell sizes keep every intermediate exactly representable
        let gt = GeoTransform::new(-74.0, 5.5, 0.25, -0.25);
        assert_eq!(gt.flipped_vertical(340).flipped_vertical(340), gt);

        let gt = GeoTransform::new(-74.0, 5.3, 0.05, -0.05);
        let back = gt.flipped_vertical(340).flipped_vertical(340);
        assert_relative_eq!(back.origin_y, gt.origin_y, epsilon = 1e-12);
        assert_eq!(back.pixel_height, gt.pixel_height);
    }

    #[test]
    fn test_bounds_unchanged_by_flip() {
        let gt = GeoTransform::new(0.0, 0.0, 1.0, -1.0);
        let flipped = gt.flipped_vertical(3);
        assert_eq!(gt.bounds(3, 3), flipped.bounds(3, 3));
    }
}
