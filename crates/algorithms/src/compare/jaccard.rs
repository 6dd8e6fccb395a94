//! Jaccard overlap of quantile selections
//!
//! Each layer is binarized at its own quantile cut-offs: a cell is
//! selected when `q(lo) <= v <= q(hi)` over that layer's valid values.
//! The coefficient is `|A ∩ B| / |A ∪ B|` over the paired cells.

use crate::statistics::descriptive::{quantile_sorted, sorted_valid};
use priocomp_core::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Selected-set sizes differing by more than this factor are reported
const UNEVEN_FACTOR: f64 = 20.0;

/// Quantile interval `[lo, hi]`, held at two-decimal precision
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdPair {
    lo: f64,
    hi: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl ThresholdPair {
    /// Low tail: the lowest decile of ranks
    pub const LOW_TAIL: ThresholdPair = ThresholdPair { lo: 0.0, hi: 0.1 };
    /// High tail: the top decile of ranks
    pub const HIGH_TAIL: ThresholdPair = ThresholdPair { lo: 0.9, hi: 1.0 };

    /// Round both bounds to two decimals and require `0 <= lo < hi <= 1`.
    pub fn new(lo: f64, hi: f64) -> Result<Self> {
        let (lo, hi) = (round2(lo), round2(hi));
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo >= hi {
            return Err(Error::Configuration(format!(
                "threshold pair ({}, {}) must satisfy 0 <= lo < hi <= 1",
                lo, hi
            )));
        }
        Ok(Self { lo, hi })
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Output column name, e.g. `jac_0.90_1.00`
    pub fn column_name(&self) -> String {
        format!("jac_{:.2}_{:.2}", self.lo, self.hi)
    }

    /// Default pairs: both tails
    pub fn defaults() -> Vec<ThresholdPair> {
        vec![Self::LOW_TAIL, Self::HIGH_TAIL]
    }

    /// Parse a comma-separated list such as `0.0:0.1,0.9:1.0`.
    ///
    /// Pairs that round to one already listed are dropped, keeping the
    /// first occurrence.
    pub fn parse_list(s: &str) -> Result<Vec<ThresholdPair>> {
        let mut pairs: Vec<ThresholdPair> = Vec::new();
        for raw in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let pair: ThresholdPair = raw.parse()?;
            if pairs.contains(&pair) {
                warn!("Threshold pair '{}' duplicates {} after rounding, skipped", raw, pair);
                continue;
            }
            pairs.push(pair);
        }
        Ok(pairs)
    }
}

impl fmt::Display for ThresholdPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}:{:.2}", self.lo, self.hi)
    }
}

impl FromStr for ThresholdPair {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Configuration(format!("threshold pair '{}' is not lo:hi", s));
        let (lo, hi) = s.split_once(':').ok_or_else(bad)?;
        let lo: f64 = lo.trim().parse().map_err(|_| bad())?;
        let hi: f64 = hi.trim().parse().map_err(|_| bad())?;
        ThresholdPair::new(lo, hi)
    }
}

/// Selection mask of `values` at the quantile interval `pair`; NaN is never selected
pub fn quantile_selection(values: &[f64], pair: ThresholdPair) -> Result<Vec<bool>> {
    let sorted = sorted_valid(values);
    let lower = quantile_sorted(&sorted, pair.lo)?;
    let upper = quantile_sorted(&sorted, pair.hi)?;
    Ok(values
        .iter()
        .map(|&v| !v.is_nan() && v >= lower && v <= upper)
        .collect())
}

/// Jaccard coefficient of the quantile selections of two paired layers.
///
/// Both selections empty counts as identical (1.0).
pub fn jaccard(a: &[f64], b: &[f64], pair: ThresholdPair) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::ShapeMismatch(format!(
            "paired samples differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let sel_a = quantile_selection(a, pair)?;
    let sel_b = quantile_selection(b, pair)?;

    let size_a = sel_a.iter().filter(|&&s| s).count();
    let size_b = sel_b.iter().filter(|&&s| s).count();
    let (small, large) = (size_a.min(size_b), size_a.max(size_b));
    if small > 0 && large as f64 / small as f64 > UNEVEN_FACTOR {
        warn!(
            "Selections at {} differ more than {}-fold ({} vs {} cells): Jaccard is unreliable",
            pair, UNEVEN_FACTOR, size_a, size_b
        );
    }

    let (mut both, mut either) = (0usize, 0usize);
    for (&x, &y) in sel_a.iter().zip(&sel_b) {
        both += usize::from(x && y);
        either += usize::from(x || y);
    }
    if either == 0 {
        return Ok(1.0);
    }
    Ok(both as f64 / either as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn test_pair_validation() {
        let p = ThresholdPair::new(0.899, 1.0).unwrap();
        assert_relative_eq!(p.lo(), 0.9);
        assert_eq!(p.column_name(), "jac_0.90_1.00");
        assert!(ThresholdPair::new(0.5, 0.5).is_err());
        assert!(ThresholdPair::new(0.6, 0.4).is_err());
        assert!(ThresholdPair::new(-0.1, 0.4).is_err());
        assert!(ThresholdPair::new(0.1, 1.2).is_err());
    }

    #[test]
    fn test_parse_list() {
        let pairs = ThresholdPair::parse_list("0.0:0.1, 0.9:1.0").unwrap();
        assert_eq!(pairs, ThresholdPair::defaults());
        assert!(ThresholdPair::parse_list("0.9-1.0").is_err());
    }

    #[test]
    fn test_parse_list_drops_rounded_duplicates() {
        let pairs = ThresholdPair::parse_list("0.9:1.0,0.899:1.0,0.0:0.1,0.001:0.1").unwrap();
        assert_eq!(pairs, vec![ThresholdPair::HIGH_TAIL, ThresholdPair::LOW_TAIL]);
        let columns: Vec<String> = pairs.iter().map(ThresholdPair::column_name).collect();
        assert_eq!(columns, vec!["jac_0.90_1.00", "jac_0.00_0.10"]);
    }

    #[test]
    fn test_identical_high_tail() {
        let a = ramp(101);
        assert_relative_eq!(jaccard(&a, &a, ThresholdPair::HIGH_TAIL).unwrap(), 1.0);
        assert_relative_eq!(jaccard(&a, &a, ThresholdPair::LOW_TAIL).unwrap(), 1.0);
    }

    #[test]
    fn test_selection_is_relative() {
        // Same order, different scale: selections coincide
        let a = ramp(50);
        let b: Vec<f64> = a.iter().map(|v| v * 0.3 + 0.5).collect();
        assert_relative_eq!(jaccard(&a, &b, ThresholdPair::HIGH_TAIL).unwrap(), 1.0);
    }

    #[test]
    fn test_reversed_tails_disjoint() {
        let a = ramp(101);
        let b: Vec<f64> = a.iter().rev().copied().collect();
        assert_relative_eq!(jaccard(&a, &b, ThresholdPair::HIGH_TAIL).unwrap(), 0.0);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let a = vec![0.1, 0.5, 0.9, 0.3, 0.7, f64::NAN, 0.2, 0.95];
        let b = vec![0.9, 0.4, 0.8, 0.2, 0.1, 0.6, f64::NAN, 0.7];
        let pair = ThresholdPair::new(0.5, 1.0).unwrap();
        let ab = jaccard(&a, &b, pair).unwrap();
        let ba = jaccard(&b, &a, pair).unwrap();
        assert_relative_eq!(ab, ba);
        assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn test_selection_mask() {
        let v = [0.0, 0.25, f64::NAN, 0.5, 0.75, 1.0];
        let sel = quantile_selection(&v, ThresholdPair::new(0.5, 1.0).unwrap()).unwrap();
        assert_eq!(sel, vec![false, false, false, true, true, true]);
    }
}
