//! # priocomp core
//!
//! Core types and I/O shared by the priocomp prioritization-comparison tools.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid with a no-data footprint
//! - `GeoTransform` and `CRS` for geometry checks
//! - `MethodKey` and [`classify`] for naming method results
//! - `ResultCache` keyed on input content and parameters
//! - GeoTIFF I/O for single-band layers

pub mod cache;
pub mod crs;
pub mod error;
pub mod io;
pub mod method;
pub mod raster;

pub use cache::{CacheKey, ContentId, ResultCache};
pub use crs::CRS;
pub use error::{Error, Result, ResultExt};
pub use method::{classify, FeatureSet, Method, MethodKey};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::method::{classify, FeatureSet, Method, MethodKey};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
}
