//! Per-cell rescaling transforms
//!
//! Four transforms fitted over the valid cells of a layer:
//! - **min-max**: `(x - min) / (max - min)`
//! - **occurrence level**: `(x - min) / Σ(x - min)`, the per-feature step of RWR
//! - **standardize**: `(x - mean) / sd` (population sd)
//! - **robust**: `(x - median) / IQR`
//!
//! Fitting yields a [`Normalization`] holding the fitted parameters, which
//! can be applied to rasters or plain value slices and inverted.
//! No-data cells (NaN, or the raster's sentinel) stay no-data.

use crate::statistics::descriptive::{mean, population_std, quantile_sorted, sorted_valid};
use priocomp_core::raster::Raster;
use priocomp_core::{Error, Result};
use serde::Serialize;
use std::str::FromStr;

/// Anything that can list its valid numeric values.
///
/// Implemented for rasters (footprint cells) and `f64` slices (non-NaN entries).
pub trait ValidValues {
    fn valid_values(&self) -> Vec<f64>;
}

impl ValidValues for Raster<f64> {
    fn valid_values(&self) -> Vec<f64> {
        Raster::valid_values(self)
    }
}

impl ValidValues for [f64] {
    fn valid_values(&self) -> Vec<f64> {
        self.iter().copied().filter(|v| !v.is_nan()).collect()
    }
}

impl ValidValues for Vec<f64> {
    fn valid_values(&self) -> Vec<f64> {
        self.as_slice().valid_values()
    }
}

/// Which transform to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NormalizeMethod {
    MinMax,
    OccurrenceLevel,
    Standardize,
    Robust,
}

impl FromStr for NormalizeMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "minmax" | "min-max" | "normalize" => Ok(NormalizeMethod::MinMax),
            "occurrence" | "ol" | "occurrence-level" => Ok(NormalizeMethod::OccurrenceLevel),
            "zscore" | "standardize" => Ok(NormalizeMethod::Standardize),
            "iqr" | "robust" => Ok(NormalizeMethod::Robust),
            _ => Err(Error::Configuration(format!(
                "unknown normalization '{}', use minmax, occurrence, zscore or iqr",
                s
            ))),
        }
    }
}

impl NormalizeMethod {
    /// Fit this transform over the valid values of `input`
    pub fn fit<C: ValidValues + ?Sized>(&self, input: &C) -> Result<Normalization> {
        let values = input.valid_values();
        if values.is_empty() {
            return Err(Error::DegenerateInput("no valid cells to normalize".into()));
        }
        match self {
            NormalizeMethod::MinMax => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                if max == min {
                    return Err(Error::DegenerateInput(format!(
                        "min-max range is zero (all values {})",
                        min
                    )));
                }
                Ok(Normalization::MinMax { min, max })
            }
            NormalizeMethod::OccurrenceLevel => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let sum: f64 = values.iter().map(|v| v - min).sum();
                if sum == 0.0 {
                    return Err(Error::DegenerateInput(
                        "occurrence-level denominator is zero".into(),
                    ));
                }
                Ok(Normalization::OccurrenceLevel { min, sum })
            }
            NormalizeMethod::Standardize => {
                let m = mean(&values).unwrap_or(0.0);
                let sd = population_std(&values).unwrap_or(0.0);
                if sd == 0.0 {
                    return Err(Error::DegenerateInput("standard deviation is zero".into()));
                }
                Ok(Normalization::Standard { mean: m, sd })
            }
            NormalizeMethod::Robust => {
                let sorted = sorted_valid(&values);
                let median = quantile_sorted(&sorted, 0.5)?;
                let iqr = quantile_sorted(&sorted, 0.75)? - quantile_sorted(&sorted, 0.25)?;
                if iqr == 0.0 {
                    return Err(Error::DegenerateInput("interquartile range is zero".into()));
                }
                Ok(Normalization::Robust { median, iqr })
            }
        }
    }
}

/// A fitted transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Normalization {
    MinMax { min: f64, max: f64 },
    OccurrenceLevel { min: f64, sum: f64 },
    Standard { mean: f64, sd: f64 },
    Robust { median: f64, iqr: f64 },
}

impl Normalization {
    /// Transform one value
    pub fn forward(&self, x: f64) -> f64 {
        match *self {
            Normalization::MinMax { min, max } => (x - min) / (max - min),
            Normalization::OccurrenceLevel { min, sum } => (x - min) / sum,
            Normalization::Standard { mean, sd } => (x - mean) / sd,
            Normalization::Robust { median, iqr } => (x - median) / iqr,
        }
    }

    /// Undo [`forward`](Self::forward) for one value
    pub fn inverse(&self, y: f64) -> f64 {
        match *self {
            Normalization::MinMax { min, max } => y * (max - min) + min,
            Normalization::OccurrenceLevel { min, sum } => y * sum + min,
            Normalization::Standard { mean, sd } => y * sd + mean,
            Normalization::Robust { median, iqr } => y * iqr + median,
        }
    }

    /// Transform every valid cell of a raster
    pub fn apply(&self, raster: &Raster<f64>) -> Raster<f64> {
        raster.map_valid(|v| self.forward(v))
    }

    /// Undo the transform on every valid cell of a raster
    pub fn invert(&self, raster: &Raster<f64>) -> Raster<f64> {
        raster.map_valid(|v| self.inverse(v))
    }

    /// Transform a slice, keeping NaN entries as NaN
    pub fn apply_values(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .map(|&v| if v.is_nan() { v } else { self.forward(v) })
            .collect()
    }

    /// Undo the transform on a slice, keeping NaN entries as NaN
    pub fn invert_values(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .map(|&v| if v.is_nan() { v } else { self.inverse(v) })
            .collect()
    }
}

/// Linear min-max scaling to [0, 1]
pub fn normalize(raster: &Raster<f64>) -> Result<Raster<f64>> {
    Ok(NormalizeMethod::MinMax.fit(raster)?.apply(raster))
}

/// Occurrence-level normalization: valid cells sum to 1
pub fn occurrence_level_normalize(raster: &Raster<f64>) -> Result<Raster<f64>> {
    Ok(NormalizeMethod::OccurrenceLevel.fit(raster)?.apply(raster))
}

/// Z-score with the population standard deviation
pub fn standardize(raster: &Raster<f64>) -> Result<Raster<f64>> {
    Ok(NormalizeMethod::Standardize.fit(raster)?.apply(raster))
}

/// Median-centred, IQR-scaled values
pub fn robust_normalize(raster: &Raster<f64>) -> Result<Raster<f64>> {
    Ok(NormalizeMethod::Robust.fit(raster)?.apply(raster))
}
