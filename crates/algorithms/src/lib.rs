//! # priocomp algorithms
//!
//! Ranking and comparison of spatial conservation prioritizations.
//!
//! ## Modules
//!
//! - **normalize**: min-max, occurrence-level, z-score and IQR rescaling
//! - **rank**: rank layers from score layers
//! - **rwr**: rarity-weighted richness over a feature stack
//! - **coverage**: expand or intersect rank raster footprints
//! - **compare**: Kendall tau-b, map comparison statistic, Jaccard, all-pairs batch
//! - **regions**: per-region mean ranks joined across methods
//! - **statistics**: descriptive and zonal statistics
//! - **ilp**: cost layer and selection stacking for an external ILP solver

pub mod compare;
pub mod coverage;
pub mod ilp;
pub(crate) mod maybe_rayon;
pub mod normalize;
pub mod parallel;
pub mod rank;
pub mod regions;
pub mod result;
pub mod rwr;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::compare::{
        compare_rasters, cross_compare, write_comparison_tables, ComparisonParams,
        ComparisonRecord, ComparisonReport, PairStats, ThresholdPair,
    };
    pub use crate::coverage::{expand_value_coverage, match_footprints, shared_footprint, FillPolicy};
    pub use crate::ilp::{cost_raster, selections_to_rank};
    pub use crate::normalize::{
        normalize, occurrence_level_normalize, robust_normalize, standardize, NormalizeMethod,
        Normalization,
    };
    pub use crate::parallel::ProcessingMode;
    pub use crate::rank::{rank_raster, TieBreak};
    pub use crate::regions::{aggregate_regions, RegionSummary, RegionTable};
    pub use crate::result::MethodResult;
    pub use crate::rwr::{
        calculate_rwr, calculate_rwr_cached, load_stack, read_manifest, rwr_feature_sets,
        Feature, FeatureCategory, FeatureStack, RwrOutput, RwrParams,
    };
    pub use crate::statistics::zonal_means;
    pub use priocomp_core::prelude::*;
}
