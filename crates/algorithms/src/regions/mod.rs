//! Regional aggregation of rank rasters
//!
//! A [`RegionSummary`] holds the mean rank of one method result per region
//! (NUTS2 units by default), read from the attribute table exported by a
//! zonal-statistics tool or computed with
//! [`zonal_means`](crate::statistics::zonal_means).
//! [`aggregate_regions`] outer-joins several summaries into a
//! [`RegionTable`] with the cross-method mean and sample standard deviation.

use crate::statistics::descriptive::{mean, sample_std};
use priocomp_core::{classify, Error, MethodKey, Result, ResultExt};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;
use tracing::debug;

/// Default region identifier column
pub const DEFAULT_ID_COLUMN: &str = "NUTS_ID";

/// Accepted names for the mean-rank column, in order of preference
const MEAN_COLUMNS: [&str; 2] = ["mean", "_mean"];

/// Mean rank per region for one method result
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    key: MethodKey,
    id_column: String,
    means: BTreeMap<String, f64>,
}

impl RegionSummary {
    pub fn new(key: MethodKey, id_column: impl Into<String>, means: BTreeMap<String, f64>) -> Self {
        Self {
            key,
            id_column: id_column.into(),
            means,
        }
    }

    pub fn key(&self) -> MethodKey {
        self.key
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Region id to mean rank, sorted by id
    pub fn means(&self) -> &BTreeMap<String, f64> {
        &self.means
    }

    pub fn get(&self, region: &str) -> Option<f64> {
        self.means.get(region).copied()
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Parse a region attribute table.
    ///
    /// The table needs the `id_column` and a `mean` (or `_mean`) column.
    /// Every other column is ignored.
    pub fn from_csv_reader<R: io::Read>(reader: R, key: MethodKey, id_column: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();

        let id_idx = headers.iter().position(|h| h == id_column).ok_or_else(|| {
            Error::Schema(format!("no region id column '{}' in {:?}", id_column, headers))
        })?;
        let mean_idx = MEAN_COLUMNS
            .iter()
            .find_map(|name| headers.iter().position(|h| h == *name))
            .ok_or_else(|| {
                Error::Schema(format!(
                    "no mean column ({}) in {:?}",
                    MEAN_COLUMNS.join(" or "),
                    headers
                ))
            })?;

        let mut means = BTreeMap::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            // Header is line 1
            let line = line + 2;
            let id = record.get(id_idx).unwrap_or_default().to_string();
            if id.is_empty() {
                return Err(Error::Schema(format!("line {}: empty region id", line)));
            }
            let raw = record.get(mean_idx).unwrap_or_default();
            let value: f64 = raw.parse().map_err(|_| {
                Error::Schema(format!(
                    "line {}: mean '{}' of region {} is not a number",
                    line, raw, id
                ))
            })?;
            if !value.is_finite() {
                return Err(Error::Schema(format!(
                    "line {}: mean '{}' of region {} is not finite",
                    line, raw, id
                )));
            }
            if means.insert(id.clone(), value).is_some() {
                return Err(Error::DuplicateKey(format!("region {} listed twice", id)));
            }
        }

        debug!("Read {} regions for {}", means.len(), key);
        Ok(Self::new(key, id_column, means))
    }

    /// Read a region attribute table, classifying the method result by file name
    pub fn from_path(path: impl AsRef<Path>, id_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let key = classify(path)?;
        let file = std::fs::File::open(path)
            .map_err(Error::from)
            .in_context(|| format!("region table {}", path.display()))?;
        Self::from_csv_reader(file, key, id_column)
            .in_context(|| format!("region table {}", path.display()))
    }

    /// Write as `<id_column>,mean`
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record([self.id_column.as_str(), MEAN_COLUMNS[0]])?;
        for (id, value) in &self.means {
            wtr.write_record([id.clone(), value.to_string()])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// One region across all method results
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRow {
    pub id: String,
    /// Mean rank per method result, in the table's key order
    pub values: Vec<Option<f64>>,
    pub agg_mean: Option<f64>,
    /// Sample standard deviation; absent below two values
    pub agg_std: Option<f64>,
}

/// Outer join of region summaries
#[derive(Debug, Clone)]
pub struct RegionTable {
    id_column: String,
    keys: Vec<MethodKey>,
    rows: Vec<RegionRow>,
}

impl RegionTable {
    pub fn keys(&self) -> &[MethodKey] {
        &self.keys
    }

    pub fn rows(&self) -> &[RegionRow] {
        &self.rows
    }

    pub fn row(&self, id: &str) -> Option<&RegionRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Write `<id>, <one column per method result>, agg_mean, agg_std`.
    /// Missing values are written as empty fields.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let fmt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();

        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec![self.id_column.clone()];
        header.extend(self.keys.iter().map(|k| k.to_string()));
        header.push("agg_mean".into());
        header.push("agg_std".into());
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.id.clone()];
            record.extend(row.values.iter().map(|v| fmt(*v)));
            record.push(fmt(row.agg_mean));
            record.push(fmt(row.agg_std));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Join region summaries on region id.
///
/// Columns follow the canonical [`MethodKey`] order; regions are sorted
/// ascending. A region missing from some summaries keeps empty cells there
/// and its aggregates use the values present.
pub fn aggregate_regions(summaries: &[RegionSummary]) -> Result<RegionTable> {
    let Some(first) = summaries.first() else {
        return Err(Error::Configuration("no region summaries to aggregate".into()));
    };

    let mut ordered: Vec<&RegionSummary> = summaries.iter().collect();
    ordered.sort_by_key(|s| s.key());
    for pair in ordered.windows(2) {
        if pair[0].key() == pair[1].key() {
            return Err(Error::DuplicateKey(format!(
                "method result {} appears in more than one region summary",
                pair[0].key()
            )));
        }
    }

    let regions: BTreeSet<&String> = ordered.iter().flat_map(|s| s.means.keys()).collect();
    let rows: Vec<RegionRow> = regions
        .into_iter()
        .map(|id| {
            let values: Vec<Option<f64>> = ordered.iter().map(|s| s.get(id)).collect();
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            RegionRow {
                id: id.clone(),
                values,
                agg_mean: mean(&present),
                agg_std: sample_std(&present),
            }
        })
        .collect();

    debug!(
        "Aggregated {} regions over {} method results",
        rows.len(),
        ordered.len()
    );
    Ok(RegionTable {
        id_column: first.id_column.clone(),
        keys: ordered.iter().map(|s| s.key()).collect(),
        rows,
    })
}
