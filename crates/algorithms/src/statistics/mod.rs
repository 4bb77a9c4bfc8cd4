//! Per-polygon statistics of raster data
//!
//! - **zonal**: mean of the cells each polygon covers
//! - **gap_fill**: neighbour filling of polygons without a value
//! - **table**: result tables keyed by polygon id

pub mod gap_fill;
pub mod table;
pub mod zonal;

pub use gap_fill::fill_gaps;
pub use table::{CompleteTable, ValueOrigin, ZonalRow, ZonalTable};
pub use zonal::{zonal_mean, InclusionRule};
