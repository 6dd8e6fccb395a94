//! Statistics over raster values
//!
//! - **descriptive**: quantiles, mean and standard deviations of valid values
//! - **zonal**: mean of a raster within each zone of a zone raster

pub mod descriptive;
pub mod zonal;

pub use descriptive::{mean, population_std, quantile_sorted, sample_std, sorted_valid};
pub use zonal::{read_zone_names, zonal_means, zone_means, zone_raster, ZoneMean};
