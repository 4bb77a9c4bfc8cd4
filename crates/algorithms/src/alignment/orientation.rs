//! Raster orientation normalization
//!
//! Rasters whose rows are stored south to north (positive pixel height)
//! are flipped here so row 0 is the northernmost row. Array and transform
//! change together, so each cell keeps its footprint and aggregation gives
//! the same means with or without the flip.

use gridzonal_core::raster::Raster;
use gridzonal_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// When to reverse the row order of the raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMode {
    /// Flip only rasters stored south-up
    #[default]
    Detect,
    /// Flip unconditionally (legacy behavior)
    Always,
    /// Leave the raster as loaded
    Never,
}

impl fmt::Display for OrientationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrientationMode::Detect => "detect",
            OrientationMode::Always => "always",
            OrientationMode::Never => "never",
        };
        f.write_str(name)
    }
}

impl FromStr for OrientationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "detect" => Ok(OrientationMode::Detect),
            "always" => Ok(OrientationMode::Always),
            "never" => Ok(OrientationMode::Never),
            _ => Err(Error::InvalidParameter {
                name: "orientation",
                value: s.to_string(),
                reason: "expected detect, always or never".into(),
            }),
        }
    }
}

/// Reverse the row order of a raster and adjust its transform.
///
/// Row `i` becomes row `rows - 1 - i`. Applying it twice gives back the
/// original raster.
pub fn flip_vertical(raster: Raster<f64>) -> Raster<f64> {
    let (rows, cols) = raster.shape();
    debug!(rows, cols, "Flipping raster rows");
    raster.flipped_vertical()
}

/// Apply `mode` to `raster`, returning the result and whether it was flipped
pub fn normalize_orientation(raster: Raster<f64>, mode: OrientationMode) -> (Raster<f64>, bool) {
    let flip = match mode {
        OrientationMode::Detect => raster.transform().is_south_up(),
        OrientationMode::Always => true,
        OrientationMode::Never => false,
    };

    if !flip {
        debug!(%mode, "Raster orientation kept");
        return (raster, false);
    }

    info!(%mode, "Reversing raster rows");
    (flip_vertical(raster), true)
}
