//! Cross-method comparison of rank rasters
//!
//! Every pair of method results is compared on the cells both cover
//! with three similarity statistics, all oriented so that 1 means
//! identical:
//!
//! - **tau**: Kendall tau-b rank correlation
//! - **cmcs**: complement of the map comparison statistic
//! - **jaccard**: overlap of quantile selections, one per threshold pair
//!
//! cmcs always uses the methods' own rank values. When the footprints
//! differ, tau and Jaccard use ranks recomputed on the shared cells, as
//! [`crate::coverage::match_footprints`] does.
//!
//! [`cross_compare`] runs all unordered pairs of a batch, keeping going
//! past failed pairs and reporting them with the pair named.

pub mod jaccard;
pub mod kendall;
pub mod mcs;
mod table;

pub use jaccard::{jaccard, quantile_selection, ThresholdPair};
pub use kendall::kendall_tau_b;
pub use mcs::{cmcs, map_comparison_statistic};
pub use table::{write_comparison_tables, write_table, StatColumns, COMPARISON_FILES};

use crate::coverage::shared_footprint;
use crate::rank::{rank_raster, TieBreak};
use crate::parallel::ProcessingMode;
use crate::result::MethodResult;
use priocomp_core::raster::Raster;
use priocomp_core::{Error, MethodKey, Result, ResultExt};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Parameters for a comparison run
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonParams {
    /// Jaccard threshold pairs, in output column order
    pub thresholds: Vec<ThresholdPair>,
    /// How pairs are scheduled
    pub mode: ProcessingMode,
}

impl Default for ComparisonParams {
    fn default() -> Self {
        Self {
            thresholds: ThresholdPair::defaults(),
            mode: ProcessingMode::Parallel,
        }
    }
}

/// Statistics of one raster pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairStats {
    pub tau: f64,
    pub cmcs: f64,
    /// One coefficient per threshold pair, in parameter order
    pub jaccard: Vec<f64>,
}

fn cell_values(r: &Raster<f64>) -> Vec<f64> {
    r.to_f64_array().iter().copied().collect()
}

/// Compare two rank rasters on their shared footprint
pub fn compare_rasters(
    a: &Raster<f64>,
    b: &Raster<f64>,
    thresholds: &[ThresholdPair],
) -> Result<PairStats> {
    let (sa, sb) = shared_footprint(a, b)?;
    let (raw_a, raw_b) = (cell_values(&sa), cell_values(&sb));
    let cmcs = cmcs(&raw_a, &raw_b).in_context(|| "map comparison statistic")?;

    let (xa, xb) = if a.valid_mask() == b.valid_mask() {
        (raw_a, raw_b)
    } else {
        debug!(
            "Footprints differ, re-ranking {} shared cells",
            sa.valid_count()
        );
        let ra = rank_raster(&sa, TieBreak::Average)
            .in_context(|| "re-ranking first raster on the shared footprint")?;
        let rb = rank_raster(&sb, TieBreak::Average)
            .in_context(|| "re-ranking second raster on the shared footprint")?;
        (cell_values(&ra), cell_values(&rb))
    };

    let tau = kendall_tau_b(&xa, &xb).in_context(|| "Kendall tau")?;
    let jaccard = thresholds
        .iter()
        .map(|&pair| jaccard(&xa, &xb, pair).in_context(|| format!("Jaccard at {}", pair)))
        .collect::<Result<Vec<_>>>()?;
    Ok(PairStats { tau, cmcs, jaccard })
}

/// Order a pair of keys canonically (lexicographic by method, then feature set)
pub fn canonical_pair(a: MethodKey, b: MethodKey) -> (MethodKey, MethodKey) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Pair key as written to the tables: `RWR_ALL-ZON_ALL_WEIGHTED`
pub fn pair_key(first: MethodKey, second: MethodKey) -> String {
    format!("{}-{}", first, second)
}

/// Statistics of one canonical pair
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRecord {
    pub first: MethodKey,
    pub second: MethodKey,
    pub stats: PairStats,
}

impl ComparisonRecord {
    pub fn key(&self) -> String {
        pair_key(self.first, self.second)
    }
}

/// A pair whose comparison failed; the pair names the unit of work
#[derive(Debug)]
pub struct PairFailure {
    pub first: MethodKey,
    pub second: MethodKey,
    pub error: Error,
}

impl fmt::Display for PairFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", pair_key(self.first, self.second), self.error)
    }
}

/// Outcome of a batch comparison
#[derive(Debug)]
pub struct ComparisonReport {
    pub thresholds: Vec<ThresholdPair>,
    /// Successful pairs, in canonical pair order
    pub records: Vec<ComparisonRecord>,
    pub failures: Vec<PairFailure>,
}

impl ComparisonReport {
    /// True when every pair was compared
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn record(&self, first: MethodKey, second: MethodKey) -> Option<&ComparisonRecord> {
        let (first, second) = canonical_pair(first, second);
        self.records
            .iter()
            .find(|r| r.first == first && r.second == second)
    }
}

/// Compare every unordered pair of method results.
///
/// Keys must be unique. Pair failures do not stop the batch; they are
/// collected in the report.
pub fn cross_compare(results: &[MethodResult], params: &ComparisonParams) -> Result<ComparisonReport> {
    for (i, pair) in params.thresholds.iter().enumerate() {
        if params.thresholds[..i].contains(pair) {
            return Err(Error::Configuration(format!(
                "threshold pair {} listed more than once",
                pair
            )));
        }
    }
    if results.len() < 2 {
        return Err(Error::Configuration(format!(
            "comparison needs at least two method results, got {}",
            results.len()
        )));
    }

    let mut ordered: Vec<&MethodResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.key);
    for pair in ordered.windows(2) {
        if pair[0].key == pair[1].key {
            return Err(Error::DuplicateKey(format!(
                "method result {} given more than once",
                pair[0].key
            )));
        }
    }

    let pairs: Vec<(usize, usize)> = (0..ordered.len())
        .flat_map(|i| ((i + 1)..ordered.len()).map(move |j| (i, j)))
        .collect();
    info!(
        "Comparing {} method results ({} pairs)",
        ordered.len(),
        pairs.len()
    );

    let outcomes = params.mode.map(&pairs, |&(i, j)| {
        let (a, b) = (ordered[i], ordered[j]);
        debug!("Comparing {}", pair_key(a.key, b.key));
        compare_rasters(&a.rank, &b.rank, &params.thresholds)
    })?;

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for (&(i, j), outcome) in pairs.iter().zip(outcomes) {
        let (first, second) = (ordered[i].key, ordered[j].key);
        match outcome {
            Ok(stats) => records.push(ComparisonRecord {
                first,
                second,
                stats,
            }),
            Err(error) => {
                let failure = PairFailure {
                    first,
                    second,
                    error,
                };
                warn!("Comparison failed: {}", failure);
                failures.push(failure);
            }
        }
    }

    Ok(ComparisonReport {
        thresholds: params.thresholds.clone(),
        records,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use priocomp_core::{FeatureSet, Method};

    fn ramp(reverse: bool) -> Raster<f64> {
        let mut values: Vec<f64> = (0..20).map(|i| i as f64 / 19.0).collect();
        if reverse {
            values.reverse();
        }
        Raster::from_vec(values, 4, 5).unwrap()
    }

    fn result(method: Method, fs: FeatureSet, rank: Raster<f64>) -> MethodResult {
        MethodResult::new(MethodKey::new(method, fs), rank)
    }

    #[test]
    fn test_identical_rasters() {
        let stats = compare_rasters(&ramp(false), &ramp(false), &ThresholdPair::defaults()).unwrap();
        assert_relative_eq!(stats.tau, 1.0);
        assert_relative_eq!(stats.cmcs, 1.0);
        assert_eq!(stats.jaccard, vec![1.0, 1.0]);
    }

    #[test]
    fn test_reversed_rasters() {
        let stats = compare_rasters(&ramp(false), &ramp(true), &[ThresholdPair::HIGH_TAIL]).unwrap();
        assert_relative_eq!(stats.tau, -1.0);
        assert_relative_eq!(stats.jaccard[0], 0.0);
        assert!(stats.cmcs < 0.5);
    }

    #[test]
    fn test_cmcs_uses_own_values_on_same_footprint() {
        // ILP-style layer: most cells never selected, tied at 0
        let ilp = Raster::from_vec(
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.9],
            2,
            5,
        )
        .unwrap();
        let rwr = Raster::from_vec((1..=10).map(|i| i as f64 / 10.0).collect(), 2, 5).unwrap();

        let stats = compare_rasters(&ilp, &rwr, &[]).unwrap();
        let direct = cmcs(
            &ilp.data().iter().copied().collect::<Vec<_>>(),
            &rwr.data().iter().copied().collect::<Vec<_>>(),
        )
        .unwrap();
        assert_relative_eq!(stats.cmcs, direct, epsilon = 1e-12);
        // 8 cells differ fully, then 0.4 / 0.9 and 0.1 / 1.0
        assert_relative_eq!(stats.cmcs, 1.0 - (8.0 + 0.4 / 0.9 + 0.1) / 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cmcs_on_differing_footprints() {
        let a = Raster::from_vec(vec![0.5, 1.0, 0.2, f64::NAN], 2, 2).unwrap();
        let b = Raster::from_vec(vec![0.25, 0.5, f64::NAN, 0.3], 2, 2).unwrap();
        let stats = compare_rasters(&a, &b, &[]).unwrap();
        // Shared cells keep their values: (0.25 / 0.5 + 0.5 / 1.0) / 2
        assert_relative_eq!(stats.cmcs, 0.5, epsilon = 1e-12);
        assert_relative_eq!(stats.tau, 1.0);
    }

    #[test]
    fn test_duplicate_thresholds_rejected() {
        let results = vec![
            result(Method::Rwr, FeatureSet::All, ramp(false)),
            result(Method::Zon, FeatureSet::All, ramp(true)),
        ];
        let params = ComparisonParams {
            thresholds: vec![ThresholdPair::HIGH_TAIL, ThresholdPair::HIGH_TAIL],
            mode: ProcessingMode::Sequential,
        };
        let err = cross_compare(&results, &params).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_canonical_order() {
        let rwr = MethodKey::new(Method::Rwr, FeatureSet::All);
        let zon = MethodKey::new(Method::Zon, FeatureSet::AllWeighted);
        assert_eq!(canonical_pair(zon, rwr), (rwr, zon));
        assert_eq!(pair_key(rwr, zon), "RWR_ALL-ZON_ALL_WEIGHTED");
    }

    #[test]
    fn test_cross_compare_all_pairs() {
        let results = vec![
            result(Method::Zon, FeatureSet::All, ramp(false)),
            result(Method::Rwr, FeatureSet::All, ramp(false)),
            result(Method::Ilp, FeatureSet::All, ramp(true)),
        ];
        let report = cross_compare(&results, &ComparisonParams::default()).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.records.len(), 3);

        let keys: Vec<String> = report.records.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["ILP_ALL-RWR_ALL", "ILP_ALL-ZON_ALL", "RWR_ALL-ZON_ALL"]);

        let same = report
            .record(
                MethodKey::new(Method::Zon, FeatureSet::All),
                MethodKey::new(Method::Rwr, FeatureSet::All),
            )
            .unwrap();
        assert_relative_eq!(same.stats.tau, 1.0);
    }

    #[test]
    fn test_failures_collected() {
        let results = vec![
            result(Method::Rwr, FeatureSet::All, ramp(false)),
            result(Method::Zon, FeatureSet::All, ramp(true)),
            result(Method::Ilp, FeatureSet::All, Raster::filled(2, 2, 0.5)),
        ];
        let params = ComparisonParams {
            mode: ProcessingMode::Sequential,
            ..Default::default()
        };
        let report = cross_compare(&results, &params).unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].to_string().starts_with("ILP_ALL-RWR_ALL"));
        assert!(matches!(report.failures[0].error.root(), Error::GeometryMismatch(_)));
    }

    #[test]
    fn test_duplicate_keys() {
        let results = vec![
            result(Method::Rwr, FeatureSet::All, ramp(false)),
            result(Method::Rwr, FeatureSet::All, ramp(true)),
        ];
        let err = cross_compare(&results, &ComparisonParams::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));
    }
}
