//! Method results entering a comparison

use crate::regions::RegionSummary;
use priocomp_core::io::read_geotiff;
use priocomp_core::raster::Raster;
use priocomp_core::{classify, Error, MethodKey, Result, ResultExt};
use std::path::{Path, PathBuf};

/// One prioritization output: its key, rank raster, and optionally its
/// per-region summary
#[derive(Debug, Clone)]
pub struct MethodResult {
    pub key: MethodKey,
    pub rank: Raster<f64>,
    pub regions: Option<RegionSummary>,
    pub source: Option<PathBuf>,
}

impl MethodResult {
    pub fn new(key: MethodKey, rank: Raster<f64>) -> Self {
        Self {
            key,
            rank,
            regions: None,
            source: None,
        }
    }

    /// Attach a region summary, which must belong to the same method result
    pub fn with_regions(mut self, regions: RegionSummary) -> Result<Self> {
        if regions.key() != self.key {
            return Err(Error::Configuration(format!(
                "region summary of {} attached to {}",
                regions.key(),
                self.key
            )));
        }
        self.regions = Some(regions);
        Ok(self)
    }

    /// Read a rank raster, classifying it by its path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let key = classify(path)?;
        let rank = read_geotiff::<f64, _>(path)
            .in_context(|| format!("rank raster {}", path.display()))?;
        Ok(Self {
            key,
            rank,
            regions: None,
            source: Some(path.to_path_buf()),
        })
    }
}

/// Classify every path before any raster is read.
///
/// One unclassifiable name fails the whole batch, naming the file.
pub fn classify_all<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<(MethodKey, PathBuf)>> {
    paths
        .iter()
        .map(|p| Ok((classify(p.as_ref())?, p.as_ref().to_path_buf())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use priocomp_core::io::write_geotiff;
    use priocomp_core::{FeatureSet, Method};
    use std::collections::BTreeMap;

    #[test]
    fn test_load_classifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rwr_es.tif");
        let r = Raster::from_vec(vec![0.0, 0.5, 1.0, f64::NAN], 2, 2).unwrap();
        write_geotiff(&r, &path).unwrap();

        let result = MethodResult::load(&path).unwrap();
        assert_eq!(result.key, MethodKey::new(Method::Rwr, FeatureSet::Es));
        assert_eq!(result.rank.valid_count(), 3);
        assert_eq!(result.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_classify_all_fails_on_any_name() {
        let err = classify_all(&["rwr_all.tif", "mystery.tif"]).unwrap_err();
        assert!(matches!(err, Error::Classification { .. }));
    }

    #[test]
    fn test_regions_must_match_key() {
        let key = MethodKey::new(Method::Zon, FeatureSet::Bd);
        let other = MethodKey::new(Method::Zon, FeatureSet::Es);
        let result = MethodResult::new(key, Raster::filled(1, 1, 1.0));
        let summary = RegionSummary::new(other, "NUTS_ID", BTreeMap::new());
        assert!(result.with_regions(summary).is_err());
    }
}
