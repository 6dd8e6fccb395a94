//! Ranking of valid cells
//!
//! Turns a score layer into a rank layer: valid cells are ranked ascending
//! by score (1 = lowest) and the ranks divided by the largest rank, so the
//! highest-priority cell gets 1.0.

use ndarray::Array2;
use priocomp_core::raster::Raster;
use priocomp_core::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

/// How cells with equal scores are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TieBreak {
    /// Uniform random order among ties, reproducible for a given seed
    Random { seed: u64 },
    /// Tied cells share the mean of their ordinal ranks
    Average,
}

impl Default for TieBreak {
    fn default() -> Self {
        TieBreak::Random { seed: 42 }
    }
}

/// Ascending ranks (1-based) of `values`. NaN must be filtered out beforehand.
pub fn rank_values(values: &[f64], tie_break: TieBreak) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut ranks = vec![0.0; n];

    match tie_break {
        TieBreak::Random { seed } => {
            // Shuffle first, then a stable sort keeps the shuffled order within ties
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            for (pos, &idx) in order.iter().enumerate() {
                ranks[idx] = (pos + 1) as f64;
            }
        }
        TieBreak::Average => {
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            let mut start = 0;
            while start < n {
                let mut end = start + 1;
                while end < n && values[order[end]] == values[order[start]] {
                    end += 1;
                }
                // Positions start+1 ..= end share their mean
                let shared = (start + 1 + end) as f64 / 2.0;
                for &idx in &order[start..end] {
                    ranks[idx] = shared;
                }
                start = end;
            }
        }
    }
    ranks
}

/// Rank the valid cells of `scores` into [0, 1]; no-data cells stay NaN.
pub fn rank_raster(scores: &Raster<f64>, tie_break: TieBreak) -> Result<Raster<f64>> {
    let mask = scores.valid_mask();
    let values: Vec<f64> = scores
        .data()
        .iter()
        .zip(mask.iter())
        .filter(|(_, valid)| **valid)
        .map(|(v, _)| *v)
        .collect();
    if values.is_empty() {
        return Err(Error::DegenerateInput("no valid cells to rank".into()));
    }

    let ranks = rank_values(&values, tie_break);
    let max_rank = ranks.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut out = Array2::from_elem(scores.shape(), f64::NAN);
    let mut next = ranks.iter();
    for (o, valid) in out.iter_mut().zip(mask.iter()) {
        if *valid && let Some(r) = next.next() {
            *o = r / max_rank;
        }
    }
    scores.derive(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_ties() {
        let r = rank_values(&[10.0, 20.0, 10.0, 30.0], TieBreak::Average);
        assert_eq!(r, vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn test_random_ties_deterministic() {
        let values = vec![1.0; 50];
        let a = rank_values(&values, TieBreak::Random { seed: 7 });
        let b = rank_values(&values, TieBreak::Random { seed: 7 });
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_by(f64::total_cmp);
        let expected: Vec<f64> = (1..=50).map(|i| i as f64).collect();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_random_respects_order() {
        let r = rank_values(&[0.3, 0.1, 0.2], TieBreak::Random { seed: 1 });
        assert_eq!(r, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_rank_raster_scaling() {
        let scores = Raster::from_vec(vec![5.0, f64::NAN, 1.0, 3.0], 2, 2).unwrap();
        let ranked = rank_raster(&scores, TieBreak::Average).unwrap();
        assert_eq!(ranked.get(0, 0).unwrap(), 1.0);
        assert!(ranked.get(0, 1).unwrap().is_nan());
        assert!((ranked.get(1, 0).unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert!((ranked.get(1, 1).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_rank_raster_empty() {
        let scores = Raster::filled(2, 2, f64::NAN);
        assert!(matches!(
            rank_raster(&scores, TieBreak::default()),
            Err(Error::DegenerateInput(_))
        ));
    }
}
