//! Prioritization methods, feature sets, and artifact classification
//!
//! Every rank raster or region table entering a comparison is identified by
//! a [`MethodKey`]: which method produced it and over which feature set.
//! Keys are derived once from artifact names by [`classify`] and carried as
//! typed values from there on.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Prioritization method.
///
/// Variant order is the alphabetical order of the labels, so the derived
/// `Ord` is the canonical (lexicographic) order used for pair keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Integer linear programming (maximum coverage)
    #[serde(rename = "ILP")]
    Ilp,
    /// Rarity-weighted richness
    #[serde(rename = "RWR")]
    Rwr,
    /// Zonation (additive benefit function)
    #[serde(rename = "ZON")]
    Zon,
}

/// Feature subset a prioritization was run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureSet {
    /// All features, unweighted
    #[serde(rename = "ALL")]
    All,
    /// All features with their weights
    #[serde(rename = "ALL_WEIGHTED")]
    AllWeighted,
    /// Biodiversity features only
    #[serde(rename = "BD")]
    Bd,
    /// Ecosystem-service features only
    #[serde(rename = "ES")]
    Es,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Ilp, Method::Rwr, Method::Zon];

    pub fn label(&self) -> &'static str {
        match self {
            Method::Ilp => "ILP",
            Method::Rwr => "RWR",
            Method::Zon => "ZON",
        }
    }
}

impl FeatureSet {
    pub const ALL: [FeatureSet; 4] = [
        FeatureSet::All,
        FeatureSet::AllWeighted,
        FeatureSet::Bd,
        FeatureSet::Es,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FeatureSet::All => "ALL",
            FeatureSet::AllWeighted => "ALL_WEIGHTED",
            FeatureSet::Bd => "BD",
            FeatureSet::Es => "ES",
        }
    }

    /// Whether features carry their weights in this set
    pub fn is_weighted(&self) -> bool {
        matches!(self, FeatureSet::AllWeighted)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Classification {
                name: s.to_string(),
                reason: "expected one of RWR, ZON, ILP".into(),
            })
    }
}

impl FromStr for FeatureSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FeatureSet::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Classification {
                name: s.to_string(),
                reason: "expected one of ALL, ALL_WEIGHTED, ES, BD".into(),
            })
    }
}

/// Identifies one method result: (method, feature set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodKey {
    pub method: Method,
    pub feature_set: FeatureSet,
}

impl MethodKey {
    pub fn new(method: Method, feature_set: FeatureSet) -> Self {
        Self {
            method,
            feature_set,
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.method, self.feature_set)
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

fn method_of_token(token: &str) -> Option<Method> {
    match token {
        "rwr" => Some(Method::Rwr),
        "zonation" | "zon" => Some(Method::Zon),
        "ilp" => Some(Method::Ilp),
        _ => None,
    }
}

/// Classify an artifact path into its [`MethodKey`].
///
/// The method is looked up among all path tokens (`rwr`; `zonation` or
/// `zon`; `ilp`), the feature set among the file-name tokens only:
/// `wgt`/`weighted` → ALL_WEIGHTED, `es` → ES, `bd` → BD, `all`/`abf` → ALL.
/// Missing or conflicting matches are a [`Error::Classification`]; nothing
/// is ever guessed.
///
/// ```ignore
/// let key = classify("zonation/04_abf_wgt.rank.tif")?;
/// assert_eq!(key, MethodKey::new(Method::Zon, FeatureSet::AllWeighted));
/// ```
pub fn classify(path: impl AsRef<Path>) -> Result<MethodKey> {
    let path = path.as_ref();
    let name = path.to_string_lossy().to_string();
    let fail = |reason: &str| Error::Classification {
        name: name.clone(),
        reason: reason.to_string(),
    };

    let mut methods: Vec<Method> = tokens(&name)
        .iter()
        .filter_map(|t| method_of_token(t))
        .collect();
    methods.sort();
    methods.dedup();
    let method = match methods.as_slice() {
        [m] => *m,
        [] => return Err(fail("no method (RWR, ZON, ILP) in name")),
        _ => return Err(fail("name matches more than one method")),
    };

    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem_tokens = tokens(&file_name);
    let has = |words: &[&str]| stem_tokens.iter().any(|t| words.contains(&t.as_str()));

    let feature_set = if has(&["wgt", "weighted"]) {
        FeatureSet::AllWeighted
    } else {
        match (has(&["es"]), has(&["bd"])) {
            (true, true) => return Err(fail("file name matches both ES and BD")),
            (true, false) => FeatureSet::Es,
            (false, true) => FeatureSet::Bd,
            (false, false) if has(&["all", "abf"]) => FeatureSet::All,
            (false, false) => return Err(fail("no feature set (ALL, ALL_WEIGHTED, ES, BD) in file name")),
        }
    };

    Ok(MethodKey::new(method, feature_set))
}
