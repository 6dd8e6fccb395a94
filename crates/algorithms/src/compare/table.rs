//! Comparison tables
//!
//! Every table starts with `key, f1_method, f1_type, f2_method, f2_type`
//! followed by its statistic columns.

use super::ComparisonReport;
use priocomp_core::{Error, Result, ResultExt};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Which statistics a table carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatColumns {
    All,
    Tau,
    Cmcs,
    Jaccard,
}

/// Output files of a comparison run and their columns
pub const COMPARISON_FILES: [(&str, StatColumns); 4] = [
    ("comparison.csv", StatColumns::All),
    ("kendall_tau.csv", StatColumns::Tau),
    ("cmcs.csv", StatColumns::Cmcs),
    ("jaccard.csv", StatColumns::Jaccard),
];

impl StatColumns {
    fn tau(self) -> bool {
        matches!(self, StatColumns::All | StatColumns::Tau)
    }

    fn cmcs(self) -> bool {
        matches!(self, StatColumns::All | StatColumns::Cmcs)
    }

    fn jaccard(self) -> bool {
        matches!(self, StatColumns::All | StatColumns::Jaccard)
    }
}

/// Write one comparison table
pub fn write_table<W: io::Write>(report: &ComparisonReport, columns: StatColumns, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = ["key", "f1_method", "f1_type", "f2_method", "f2_type"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if columns.tau() {
        header.push("tau".into());
    }
    if columns.cmcs() {
        header.push("cmcs".into());
    }
    if columns.jaccard() {
        header.extend(report.thresholds.iter().map(|t| t.column_name()));
    }
    wtr.write_record(&header)?;

    for record in &report.records {
        let mut row = vec![
            record.key(),
            record.first.method.to_string(),
            record.first.feature_set.to_string(),
            record.second.method.to_string(),
            record.second.feature_set.to_string(),
        ];
        if columns.tau() {
            row.push(record.stats.tau.to_string());
        }
        if columns.cmcs() {
            row.push(record.stats.cmcs.to_string());
        }
        if columns.jaccard() {
            row.extend(record.stats.jaccard.iter().map(|v| v.to_string()));
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write all comparison tables into `out_dir`, returning the written paths
pub fn write_comparison_tables(report: &ComparisonReport, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)
        .map_err(Error::from)
        .in_context(|| format!("output directory {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(COMPARISON_FILES.len());
    for (name, columns) in COMPARISON_FILES {
        let path = out_dir.join(name);
        let file = File::create(&path)
            .map_err(Error::from)
            .in_context(|| format!("table {}", path.display()))?;
        write_table(report, columns, file).in_context(|| format!("table {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
