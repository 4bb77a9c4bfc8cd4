//! # gridzonal algorithms
//!
//! Per-polygon aggregation of a gridded field.
//!
//! ## Stages
//!
//! - **alignment**: reproject polygons onto the raster CRS, normalize the
//!   raster to north-up
//! - **statistics**: zonal mean per polygon, gap filling in table order
//! - **pipeline**: the stages above chained behind the `Algorithm` trait
//!
//! Gap filling copies values between neighbouring rows of the result. It
//! depends on the order the polygons were supplied in and is not a spatial
//! interpolation.

pub mod alignment;
pub mod pipeline;
pub mod statistics;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::alignment::{align_crs, flip_vertical, normalize_orientation, OrientationMode};
    pub use crate::pipeline::{zonal_pipeline, ZonalParams, ZonalPipeline};
    pub use crate::statistics::{
        fill_gaps, zonal_mean, CompleteTable, InclusionRule, ValueOrigin, ZonalRow, ZonalTable,
    };
    pub use gridzonal_core::prelude::*;
}
