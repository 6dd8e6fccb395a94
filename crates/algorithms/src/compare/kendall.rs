//! Kendall rank correlation (tau-b)
//!
//! Knight's O(n log n) algorithm: sort the pairs by `x` (then `y`), count
//! ties in `x` and joint ties, then merge-sort by `y` counting the swaps,
//! which equal the number of discordant pairs.
//!
//! ```text
//! tau_b = (n0 - n1 - n2 + n3 - 2·swaps) / sqrt((n0 - n1)(n0 - n2))
//! ```
//!
//! with `n0 = n(n-1)/2`, `n1`/`n2` the tied pairs in `x`/`y` and `n3` the
//! pairs tied in both.

use priocomp_core::{Error, Result};

/// Pairs tied within runs of equal values in sorted data
fn tied_pairs<T, F>(sorted: &[T], same: F) -> u64
where
    F: Fn(&T, &T) -> bool,
{
    let mut total = 0u64;
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && same(&sorted[start], &sorted[end]) {
            end += 1;
        }
        let t = (end - start) as u64;
        total += t * (t - 1) / 2;
        start = end;
    }
    total
}

/// Stable merge sort of `v` returning the number of inversions removed
fn merge_count(v: &mut [f64], buf: &mut [f64]) -> u64 {
    let n = v.len();
    if n < 2 {
        return 0;
    }
    let mid = n / 2;
    let mut swaps = {
        let (left, right) = v.split_at_mut(mid);
        let (buf_left, buf_right) = buf.split_at_mut(mid);
        merge_count(left, buf_left) + merge_count(right, buf_right)
    };

    let (left, right) = v.split_at(mid);
    let (mut i, mut j) = (0, 0);
    for slot in buf[..n].iter_mut() {
        if j < right.len() && (i >= left.len() || right[j] < left[i]) {
            *slot = right[j];
            // right[j] jumps over every remaining left element
            swaps += (left.len() - i) as u64;
            j += 1;
        } else {
            *slot = left[i];
            i += 1;
        }
    }
    v.copy_from_slice(&buf[..n]);
    swaps
}

/// Kendall tau-b between two paired samples.
///
/// Positions where either value is NaN are skipped. Fewer than two
/// remaining pairs, or a sample without any variation, is a degenerate
/// input.
pub fn kendall_tau_b(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(Error::ShapeMismatch(format!(
            "paired samples differ in length: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    let mut pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return Err(Error::DegenerateInput(format!(
            "Kendall tau needs at least two paired cells, got {}",
            n
        )));
    }

    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let n0 = (n as u64) * (n as u64 - 1) / 2;
    let n1 = tied_pairs(&pairs, |a, b| a.0 == b.0);
    let n3 = tied_pairs(&pairs, |a, b| a == b);

    let mut ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let mut buf = vec![0.0; n];
    let swaps = merge_count(&mut ys, &mut buf);
    let n2 = tied_pairs(&ys, |a, b| a == b);

    if n1 == n0 || n2 == n0 {
        return Err(Error::DegenerateInput(
            "Kendall tau is undefined for a constant sample".into(),
        ));
    }

    let numerator = n0 as f64 - n1 as f64 - n2 as f64 + n3 as f64 - 2.0 * swaps as f64;
    let denominator = ((n0 - n1) as f64).sqrt() * ((n0 - n2) as f64).sqrt();
    Ok((numerator / denominator).clamp(-1.0, 1.0))
}
