//! Map comparison statistic
//!
//! Mean relative cell-wise difference of two non-negative layers:
//! `MCS = mean |a - b| / max(a, b)`, where cells with `a = b = 0`
//! contribute 0. It is a dissimilarity in [0, 1]; [`cmcs`] reports its
//! complement so that 1 means identical.

use priocomp_core::{Error, Result};

/// Map comparison statistic over paired values. NaN positions are skipped.
pub fn map_comparison_statistic(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::ShapeMismatch(format!(
            "paired samples differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let mut sum = 0.0;
    let mut count = 0usize;
    for (&x, &y) in a.iter().zip(b) {
        if x.is_nan() || y.is_nan() {
            continue;
        }
        if x < 0.0 || y < 0.0 {
            return Err(Error::DegenerateInput(format!(
                "map comparison needs non-negative values, found {} / {}",
                x, y
            )));
        }
        let m = x.max(y);
        if m > 0.0 {
            sum += (x - y).abs() / m;
        }
        count += 1;
    }

    if count == 0 {
        return Err(Error::DegenerateInput(
            "no paired cells for the map comparison statistic".into(),
        ));
    }
    Ok(sum / count as f64)
}

/// Complement of the map comparison statistic: `1 - MCS`
pub fn cmcs(a: &[f64], b: &[f64]) -> Result<f64> {
    Ok(1.0 - map_comparison_statistic(a, b)?)
}
