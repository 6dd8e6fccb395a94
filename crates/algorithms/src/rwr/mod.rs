//! Rarity-weighted richness (RWR)
//!
//! Each feature layer is turned into occurrence levels (shifted by its
//! minimum and divided by its total, so the layer sums to 1), weighted, and
//! summed cell by cell. The summed score is then ranked:
//!
//! ```text
//! score(c) = Σ_f  w_f · (x_f(c) - min_f) / Σ_c' (x_f(c') - min_f)
//! rank(c)  = ordinal(score(c)) / max ordinal
//! ```
//!
//! Cells where no feature has data, or where the score is exactly zero,
//! carry no priority information and become no-data.

mod stack;

pub use stack::{load_stack, read_manifest, Feature, FeatureCategory, FeatureStack, ManifestEntry};

use crate::maybe_rayon::*;
use crate::normalize::NormalizeMethod;
use crate::parallel::ProcessingMode;
use crate::rank::{rank_raster, TieBreak};
use ndarray::Array2;
use priocomp_core::raster::Raster;
use priocomp_core::{CacheKey, Error, FeatureSet, Result, ResultCache, ResultExt};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Parameters for RWR ranking
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RwrParams {
    /// Ordering of cells with equal scores
    pub tie_break: TieBreak,
}

/// RWR result: the raw summed score and its rank layer
#[derive(Debug, Clone)]
pub struct RwrOutput {
    pub score: Raster<f64>,
    pub rank: Raster<f64>,
}

/// Occurrence levels of one feature.
///
/// A layer whose valid cells are all equal has a zero denominator; it holds
/// no rarity information and contributes zero everywhere instead of failing
/// the whole stack.
fn occurrence_level(feature: &Feature) -> Raster<f64> {
    match NormalizeMethod::OccurrenceLevel.fit(&feature.raster) {
        Ok(fitted) => fitted.apply(&feature.raster),
        Err(e) => {
            warn!("feature '{}' contributes nothing to RWR: {}", feature.name, e);
            feature.raster.map_valid(|_| 0.0)
        }
    }
}

fn resolve_weights(stack: &FeatureStack, weights: Option<&[f64]>) -> Result<Vec<f64>> {
    let resolved: Vec<f64> = match weights {
        Some(w) if w.len() != stack.len() => {
            return Err(Error::Configuration(format!(
                "{} weights given for {} features",
                w.len(),
                stack.len()
            )));
        }
        Some(w) => w.to_vec(),
        None => stack
            .features()
            .iter()
            .map(|f| f.weight.unwrap_or(1.0))
            .collect(),
    };
    if let Some((i, w)) = resolved
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(Error::Configuration(format!(
            "weight {} of feature '{}' must be finite and non-negative",
            w,
            stack.features()[i].name
        )));
    }
    Ok(resolved)
}

/// Compute the RWR score and rank layers for a feature stack.
///
/// # Arguments
/// * `stack` - Features sharing one grid
/// * `weights` - Optional weight per feature (length must equal the stack
///   size); without it each feature's own weight, or 1.0, is used
/// * `params` - Tie-breaking policy
pub fn calculate_rwr(
    stack: &FeatureStack,
    weights: Option<&[f64]>,
    params: &RwrParams,
) -> Result<RwrOutput> {
    let weights = resolve_weights(stack, weights)?;
    let levels: Vec<Raster<f64>> = stack.features().par_iter().map(occurrence_level).collect();
    combine(stack.template(), &levels, &weights, params)
}

/// [`calculate_rwr`] with occurrence levels served from `cache`.
///
/// Occurrence levels depend only on the feature file, so they are shared
/// between feature sets of one run. Features without a file identity are
/// computed directly.
pub fn calculate_rwr_cached(
    stack: &FeatureStack,
    weights: Option<&[f64]>,
    params: &RwrParams,
    cache: &ResultCache<Raster<f64>>,
) -> Result<RwrOutput> {
    let weights = resolve_weights(stack, weights)?;
    let levels: Vec<Raster<f64>> = stack
        .features()
        .par_iter()
        .map(|f| match &f.source {
            Some(id) => {
                let key = CacheKey::new("occurrence_level", vec![id.clone()], &())?;
                cache.get_or_try_insert_with(key, || Ok(occurrence_level(f)))
            }
            None => Ok(occurrence_level(f)),
        })
        .collect::<Result<Vec<_>>>()?;
    combine(stack.template(), &levels, &weights, params)
}

fn combine(
    template: &Raster<f64>,
    levels: &[Raster<f64>],
    weights: &[f64],
    params: &RwrParams,
) -> Result<RwrOutput> {
    let (rows, cols) = template.shape();

    let score_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let mut sum = 0.0;
                let mut any_valid = false;
                for (level, &w) in levels.iter().zip(weights) {
                    let v = level.data()[(row, col)];
                    if !v.is_nan() {
                        sum += w * v;
                        any_valid = true;
                    }
                }
                if any_valid && sum != 0.0 {
                    *out = sum;
                }
            }
            row_data
        })
        .collect();

    let scores = Array2::from_shape_vec((rows, cols), score_data)
        .map_err(|e| Error::Other(e.to_string()))?;
    let score = template.derive(scores)?;
    debug!(
        "RWR score: {} of {} cells valid",
        score.valid_count(),
        score.len()
    );

    let rank = rank_raster(&score, params.tie_break)?;
    Ok(RwrOutput { score, rank })
}

/// Run RWR for several feature sets of one stack.
///
/// Each set is one unit of work: its failure is returned in place, with
/// the set named, and does not stop the others.
pub fn rwr_feature_sets(
    stack: &FeatureStack,
    sets: &[FeatureSet],
    params: &RwrParams,
    mode: ProcessingMode,
    cache: &ResultCache<Raster<f64>>,
) -> Result<Vec<(FeatureSet, Result<RwrOutput>)>> {
    info!("Computing RWR for {} feature set(s)", sets.len());
    mode.map(sets, |&feature_set| {
        let result = stack
            .select(feature_set)
            .and_then(|(sub, weights)| calculate_rwr_cached(&sub, Some(&weights), params, cache))
            .in_context(|| format!("RWR {}", feature_set));
        (feature_set, result)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use priocomp_core::ContentId;

    fn feature(name: &str, category: FeatureCategory, values: Vec<f64>) -> Feature {
        Feature::new(name, category, Raster::from_vec(values, 2, 2).unwrap())
    }

    #[test]
    fn test_two_feature_scenario() {
        let stack = FeatureStack::new(vec![
            feature("f1", FeatureCategory::Biodiversity, vec![1.0, 1.0, 1.0, 1.0]),
            feature("f2", FeatureCategory::Biodiversity, vec![0.0, 0.0, 4.0, 0.0]),
        ])
        .unwrap();
        let out = calculate_rwr(&stack, None, &RwrParams::default()).unwrap();

        // Row 2, col 1 carries the only non-zero occurrence level
        assert_relative_eq!(out.rank.get(1, 0).unwrap(), 1.0);
        assert_relative_eq!(out.score.get(1, 0).unwrap(), 1.0);
        assert!(out.rank.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_weights_change_priority() {
        let stack = FeatureStack::new(vec![
            feature("a", FeatureCategory::Biodiversity, vec![4.0, 0.0, 0.0, 1.0]),
            feature("b", FeatureCategory::EcosystemServices, vec![0.0, 4.0, 0.0, 1.0]),
        ])
        .unwrap();

        let plain = calculate_rwr(&stack, None, &RwrParams::default()).unwrap();
        let favour_b = calculate_rwr(&stack, Some(&[1.0, 3.0]), &RwrParams::default()).unwrap();
        assert_relative_eq!(favour_b.rank.get(0, 1).unwrap(), 1.0);
        assert!(plain.score.get(0, 0).unwrap() == plain.score.get(0, 1).unwrap());
    }

    #[test]
    fn test_weight_length_mismatch() {
        let stack = FeatureStack::new(vec![feature(
            "a",
            FeatureCategory::Biodiversity,
            vec![1.0, 2.0, 3.0, 4.0],
        )])
        .unwrap();
        let err = calculate_rwr(&stack, Some(&[1.0, 2.0]), &RwrParams::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = calculate_rwr(&stack, Some(&[-1.0]), &RwrParams::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_nodata_contributes_zero() {
        let stack = FeatureStack::new(vec![
            feature("a", FeatureCategory::Biodiversity, vec![f64::NAN, 1.0, 2.0, 3.0]),
            feature("b", FeatureCategory::Biodiversity, vec![f64::NAN, f64::NAN, 5.0, 1.0]),
        ])
        .unwrap();
        let out = calculate_rwr(&stack, None, &RwrParams::default()).unwrap();
        assert!(out.rank.get(0, 0).unwrap().is_nan());
        // (0,1) is the minimum of a and missing in b: score 0, so no-data
        assert!(out.rank.get(0, 1).unwrap().is_nan());
        assert_relative_eq!(out.score.get(1, 0).unwrap(), 1.0 / 3.0 + 1.0);
        assert_relative_eq!(out.score.get(1, 1).unwrap(), 2.0 / 3.0);
        assert_relative_eq!(out.rank.get(1, 0).unwrap(), 1.0);
        assert_relative_eq!(out.rank.get(1, 1).unwrap(), 0.5);
    }

    #[test]
    fn test_rank_monotonic_in_score() {
        let n = 8;
        let values = |k: usize| -> Vec<f64> {
            (0..n * n).map(|i| ((i * (k + 3) * 7919) % 101) as f64).collect()
        };
        let stack = FeatureStack::new(
            (0..4)
                .map(|k| {
                    Feature::new(
                        format!("f{}", k),
                        FeatureCategory::Biodiversity,
                        Raster::from_vec(values(k), n, n).unwrap(),
                    )
                })
                .collect(),
        )
        .unwrap();
        let out = calculate_rwr(&stack, None, &RwrParams::default()).unwrap();

        let cells: Vec<(f64, f64)> = out
            .score
            .data()
            .iter()
            .zip(out.rank.data().iter())
            .filter(|(s, _)| !s.is_nan())
            .map(|(s, r)| (*s, *r))
            .collect();
        for &(sa, ra) in &cells {
            for &(sb, rb) in &cells {
                if sa > sb {
                    assert!(ra >= rb, "score {} > {} but rank {} < {}", sa, sb, ra, rb);
                }
            }
        }
    }

    #[test]
    fn test_cached_matches_direct() {
        let mut f1 = feature("a", FeatureCategory::Biodiversity, vec![1.0, 2.0, 3.0, 4.0]);
        f1.source = Some(ContentId::of_bytes("a.tif", b"a"));
        let mut f2 = feature("b", FeatureCategory::EcosystemServices, vec![4.0, 1.0, 3.0, 2.0]);
        f2.source = Some(ContentId::of_bytes("b.tif", b"b"));
        let stack = FeatureStack::new(vec![f1, f2]).unwrap();
        let params = RwrParams {
            tie_break: TieBreak::Average,
        };

        let cache = ResultCache::new(8);
        let direct = calculate_rwr(&stack, None, &params).unwrap();
        let cached = calculate_rwr_cached(&stack, None, &params, &cache).unwrap();
        assert_eq!(cache.len(), 2);
        let again = calculate_rwr_cached(&stack, None, &params, &cache).unwrap();
        assert_eq!(cache.len(), 2);

        for ((a, b), c) in direct
            .rank
            .data()
            .iter()
            .zip(cached.rank.data().iter())
            .zip(again.rank.data().iter())
        {
            assert!((a.is_nan() && b.is_nan() && c.is_nan()) || (a == b && b == c));
        }
    }

    #[test]
    fn test_feature_sets_batch() {
        let stack = FeatureStack::new(vec![
            feature("bird", FeatureCategory::Biodiversity, vec![1.0, 2.0, 3.0, 4.0]).with_weight(2.0),
            feature("carbon", FeatureCategory::EcosystemServices, vec![4.0, 3.0, 2.0, 1.0]),
        ])
        .unwrap();
        let cache = ResultCache::new(8);
        let results = rwr_feature_sets(
            &stack,
            &FeatureSet::ALL,
            &RwrParams::default(),
            ProcessingMode::Sequential,
            &cache,
        )
        .unwrap();

        assert_eq!(results.len(), 4);
        for (fs, result) in &results {
            let out = result.as_ref().unwrap();
            assert!(out.rank.valid_count() > 0, "{}", fs);
        }
        let (_, bd) = &results[2];
        assert_eq!(results[2].0, FeatureSet::Bd);
        assert_relative_eq!(bd.as_ref().unwrap().rank.get(1, 1).unwrap(), 1.0);
    }

    #[test]
    fn test_feature_set_failure_is_isolated() {
        let stack = FeatureStack::new(vec![feature(
            "bird",
            FeatureCategory::Biodiversity,
            vec![1.0, 2.0, 3.0, 4.0],
        )])
        .unwrap();
        let cache = ResultCache::new(4);
        let results = rwr_feature_sets(
            &stack,
            &[FeatureSet::Es, FeatureSet::Bd],
            &RwrParams::default(),
            ProcessingMode::from_threads(Some(2)),
            &cache,
        )
        .unwrap();

        let (es, es_result) = &results[0];
        assert_eq!(*es, FeatureSet::Es);
        let err = es_result.as_ref().unwrap_err();
        assert!(err.to_string().starts_with("RWR ES"));
        assert!(matches!(err.root(), Error::Configuration(_)));
        assert!(results[1].1.is_ok());
    }
}
