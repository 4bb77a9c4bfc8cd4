//! Bringing the polygon layer and the raster into a common frame
//!
//! - **crs**: reproject the polygon layer onto the raster CRS
//! - **orientation**: normalize raster row order to north-up

pub mod crs;
pub mod orientation;

pub use crs::align_crs;
pub use orientation::{flip_vertical, normalize_orientation, OrientationMode};
