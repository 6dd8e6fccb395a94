//! Feature stacks and the feature manifest

use priocomp_core::io::read_geotiff_identified;
use priocomp_core::raster::Raster;
use priocomp_core::{ContentId, Error, FeatureSet, Result, ResultExt};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// What a feature layer represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum FeatureCategory {
    #[serde(rename = "bd", alias = "BD", alias = "biodiversity")]
    Biodiversity,
    #[serde(rename = "es", alias = "ES", alias = "ecosystem_services")]
    EcosystemServices,
}

/// One conservation feature: an occurrence-level layer with its metadata
#[derive(Debug, Clone)]
pub struct Feature {
    pub name: String,
    pub category: FeatureCategory,
    /// Weight applied in weighted runs; 1.0 when absent
    pub weight: Option<f64>,
    pub raster: Raster<f64>,
    /// File identity, when the layer was read from disk
    pub source: Option<ContentId>,
}

impl Feature {
    pub fn new(name: impl Into<String>, category: FeatureCategory, raster: Raster<f64>) -> Self {
        Self {
            name: name.into(),
            category,
            weight: None,
            raster,
            source: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// Ordered features sharing one grid.
///
/// Construction checks that every layer has the first layer's shape,
/// transform and CRS.
#[derive(Debug, Clone)]
pub struct FeatureStack {
    features: Vec<Feature>,
}

impl FeatureStack {
    pub fn new(features: Vec<Feature>) -> Result<Self> {
        let Some(first) = features.first() else {
            return Err(Error::Configuration("feature stack is empty".into()));
        };
        for f in &features[1..] {
            if let Some(reason) = first.raster.geometry_difference(&f.raster) {
                return Err(Error::ShapeMismatch(format!(
                    "feature '{}' vs '{}': {}",
                    first.name, f.name, reason
                )));
            }
        }
        Ok(Self { features })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Grid all features share
    pub fn template(&self) -> &Raster<f64> {
        &self.features[0].raster
    }

    /// Sub-stack and weight vector for a feature set.
    ///
    /// ALL and the single-category sets are unweighted; ALL_WEIGHTED uses
    /// each feature's own weight.
    pub fn select(&self, feature_set: FeatureSet) -> Result<(FeatureStack, Vec<f64>)> {
        let chosen: Vec<Feature> = self
            .features
            .iter()
            .filter(|f| match feature_set {
                FeatureSet::All | FeatureSet::AllWeighted => true,
                FeatureSet::Bd => f.category == FeatureCategory::Biodiversity,
                FeatureSet::Es => f.category == FeatureCategory::EcosystemServices,
            })
            .cloned()
            .collect();
        if chosen.is_empty() {
            return Err(Error::Configuration(format!(
                "no features in the stack belong to {}",
                feature_set
            )));
        }
        let weights = chosen
            .iter()
            .map(|f| {
                if feature_set.is_weighted() {
                    f.weight.unwrap_or(1.0)
                } else {
                    1.0
                }
            })
            .collect();
        Ok((FeatureStack::new(chosen)?, weights))
    }
}

/// One row of a feature manifest CSV: `path,category,weight`
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub category: FeatureCategory,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Read a feature manifest. Relative paths are resolved against the manifest's directory.
pub fn read_manifest(path: impl AsRef<Path>) -> Result<Vec<ManifestEntry>> {
    let path = path.as_ref();
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(Error::from)
        .in_context(|| format!("manifest {}", path.display()))?;

    let mut entries = Vec::new();
    for record in reader.deserialize::<ManifestEntry>() {
        let mut entry = record
            .map_err(Error::from)
            .in_context(|| format!("manifest {}", path.display()))?;
        if entry.path.is_relative() {
            entry.path = base.join(&entry.path);
        }
        entries.push(entry);
    }
    if entries.is_empty() {
        return Err(Error::Configuration(format!(
            "manifest {} lists no features",
            path.display()
        )));
    }
    Ok(entries)
}

/// Load every layer listed in a manifest into a stack
pub fn load_stack(entries: &[ManifestEntry]) -> Result<FeatureStack> {
    let mut features = Vec::with_capacity(entries.len());
    for entry in entries {
        let (raster, id) = read_geotiff_identified::<f64, _>(&entry.path)
            .in_context(|| format!("feature {}", entry.path.display()))?;
        let name = entry
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| entry.path.display().to_string());
        features.push(Feature {
            name,
            category: entry.category,
            weight: entry.weight,
            raster,
            source: Some(id),
        });
    }
    FeatureStack::new(features)
}
