//! Vector geometry helpers
//!
//! - Clip: intersect polygon rings with grid cells

mod clip;

pub use clip::{clip_ring, open_ring, ring_area, ClipRect};
