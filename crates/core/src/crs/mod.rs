//! Coordinate Reference System handling

mod transform;

pub use transform::CoordTransformer;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// Parse an authority string such as `EPSG:4326`, `epsg:31983`,
    /// `urn:ogc:def:crs:EPSG::4674` or `+proj=longlat ...`.
    ///
    /// The OGC CRS84 URN maps to EPSG:4326 (same datum, lon/lat order).
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.starts_with("+proj") {
            return Some(Self::from_proj(text));
        }
        if text.ends_with("CRS84") {
            return Some(Self::wgs84());
        }
        let upper = text.to_ascii_uppercase();
        let code = upper
            .strip_prefix("EPSG:")
            .or_else(|| upper.rsplit_once("EPSG::").map(|(_, code)| code))
            .or_else(|| upper.rsplit_once("EPSG:").map(|(_, code)| code))?;
        code.trim().parse::<u32>().ok().map(Self::from_epsg)
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Check whether two CRS carry the same identifier.
    ///
    /// This is identifier equality, not geometric equivalence: EPSG:4326 and
    /// a PROJ string describing the same datum are considered different.
    pub fn same_identifier(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a.trim() == b.trim();
        }

        false
    }

    /// PROJ definition used for coordinate transforms.
    ///
    /// Explicit PROJ strings win; EPSG codes are resolved against the
    /// bundled `crs-definitions` table. WKT-only CRS have no definition.
    pub fn proj_definition(&self) -> Option<String> {
        if let Some(proj) = &self.proj {
            return Some(proj.clone());
        }
        let code = u16::try_from(self.epsg?).ok()?;
        crs_definitions::from_code(code).map(|def| def.proj4.to_string())
    }

    /// Whether coordinates in this CRS are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self.proj_definition() {
            Some(def) => def.contains("+proj=longlat") || def.contains("+proj=latlong"),
            None => self.epsg == Some(4326),
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let head: String = wkt.chars().take(50).collect();
            return format!("WKT:{}", head);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}
