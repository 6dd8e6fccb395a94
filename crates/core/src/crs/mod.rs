//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System attached to a raster.
///
/// Only identity matters here: rasters are harmonized to a common CRS
/// before they reach this crate, so the CRS is compared, never transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// ETRS89 / LAEA Europe (EPSG:3035), the grid all European layers are harmonized to
    pub fn etrs89_laea() -> Self {
        Self::from_epsg(3035)
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Whether two optional CRS values describe the same system.
///
/// Two unset CRS match (synthetic or untagged rasters); a set and an unset CRS do not.
pub fn crs_matches(a: Option<&CRS>, b: Option<&CRS>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::etrs89_laea();
        assert_eq!(crs.epsg(), 3035);
        assert_eq!(crs.identifier(), "EPSG:3035");
    }

    #[test]
    fn test_crs_matches() {
        let laea = CRS::etrs89_laea();
        let wgs = CRS::from_epsg(4326);
        assert!(crs_matches(Some(&laea), Some(&CRS::from_epsg(3035))));
        assert!(!crs_matches(Some(&laea), Some(&wgs)));
        assert!(!crs_matches(Some(&laea), None));
        assert!(crs_matches(None, None));
    }
}
