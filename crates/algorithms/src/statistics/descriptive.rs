//! Descriptive statistics over valid (non-NaN) values

use priocomp_core::{Error, Result};

/// Valid values sorted ascending. NaN entries are dropped.
pub fn sorted_valid(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Quantile of ascending-sorted data with linear interpolation between
/// closest ranks (`h = (n - 1) * p`), the usual sample-quantile definition.
///
/// `p` is clamped to [0, 1]. Empty input is a degenerate input.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Result<f64> {
    if sorted.is_empty() {
        return Err(Error::DegenerateInput("quantile of an empty set".into()));
    }
    let p = p.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Ok(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Arithmetic mean; `None` for no values
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation (divisor n)
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Sample standard deviation (divisor n - 1); `None` below two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantiles() {
        let s = sorted_valid(&[4.0, f64::NAN, 1.0, 3.0, 2.0]);
        assert_eq!(s, vec![1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(quantile_sorted(&s, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile_sorted(&s, 1.0).unwrap(), 4.0);
        assert_relative_eq!(quantile_sorted(&s, 0.5).unwrap(), 2.5);
        assert_relative_eq!(quantile_sorted(&s, 0.25).unwrap(), 1.75);
        assert!(quantile_sorted(&[], 0.5).is_err());
    }

    #[test]
    fn test_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(population_std(&v).unwrap(), 2.0);
        assert_relative_eq!(sample_std(&v).unwrap(), (32.0_f64 / 7.0).sqrt());
        assert_eq!(sample_std(&[1.0]), None);
        assert_eq!(mean(&[]), None);
    }
}
