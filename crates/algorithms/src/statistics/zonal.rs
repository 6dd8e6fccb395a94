//! Zonal means
//!
//! Mean of a rank raster within each zone of an integer zone raster
//! (typically rasterized NUTS2 regions). Zone 0 and the zone raster's
//! no-data value mark cells outside every region.

use crate::regions::RegionSummary;
use priocomp_core::raster::Raster;
use priocomp_core::{Error, MethodKey, Result};
use std::collections::{BTreeMap, HashMap};
use std::io;

/// Accumulated values of one zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneMean {
    pub zone_id: i32,
    pub count: usize,
    pub mean: f64,
}

/// Mean of the valid `values` cells per zone.
///
/// Zones without any valid value cell are left out.
pub fn zone_means(values: &Raster<f64>, zones: &Raster<i32>) -> Result<BTreeMap<i32, ZoneMean>> {
    values.ensure_same_geometry(zones)?;

    let mut sums: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for (&zone, &val) in zones.data().iter().zip(values.data().iter()) {
        if zone == 0 || zones.is_nodata(zone) || values.is_nodata(val) {
            continue;
        }
        let entry = sums.entry(zone).or_insert((0.0, 0));
        entry.0 += val;
        entry.1 += 1;
    }

    Ok(sums
        .into_iter()
        .map(|(zone_id, (sum, count))| {
            (
                zone_id,
                ZoneMean {
                    zone_id,
                    count,
                    mean: sum / count as f64,
                },
            )
        })
        .collect())
}

/// Integer zone raster from a float layer: values are rounded, no-data
/// cells become zone 0. Codes outside the `i32` range are a `Schema` error.
pub fn zone_raster(layer: &Raster<f64>) -> Result<Raster<i32>> {
    let (rows, cols) = layer.shape();
    let mut zones = layer.with_same_meta::<i32>(rows, cols);
    for ((row, col), &v) in layer.data().indexed_iter() {
        if layer.is_nodata(v) || !v.is_finite() {
            continue;
        }
        let code = v.round();
        if code < f64::from(i32::MIN) || code > f64::from(i32::MAX) {
            return Err(Error::Schema(format!(
                "region code {} at row {}, col {} does not fit a zone id",
                v, row, col
            )));
        }
        zones.data_mut()[[row, col]] = code as i32;
    }
    Ok(zones)
}

/// Per-region mean rank of one method result.
///
/// Without `names` regions are identified by their zone number. With
/// `names`, every zone present must have a name.
pub fn zonal_means(
    rank: &Raster<f64>,
    zones: &Raster<i32>,
    key: MethodKey,
    id_column: &str,
    names: Option<&HashMap<i32, String>>,
) -> Result<RegionSummary> {
    let per_zone = zone_means(rank, zones)?;
    let mut means = BTreeMap::new();
    for (zone_id, zm) in per_zone {
        let id = match names {
            Some(lookup) => lookup.get(&zone_id).cloned().ok_or_else(|| {
                Error::Schema(format!("zone {} has no entry in the name table", zone_id))
            })?,
            None => zone_id.to_string(),
        };
        if means.insert(id.clone(), zm.mean).is_some() {
            return Err(Error::DuplicateKey(format!(
                "region {} is named by more than one zone",
                id
            )));
        }
    }
    Ok(RegionSummary::new(key, id_column, means))
}

/// Read a zone name table with columns `zone` and `id_column`
pub fn read_zone_names<R: io::Read>(reader: R, id_column: &str) -> Result<HashMap<i32, String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::Schema(format!("no '{}' column in zone name table", name)))
    };
    let zone_idx = column("zone")?;
    let id_idx = column(id_column)?;

    let mut names = HashMap::new();
    for record in rdr.records() {
        let record = record?;
        let raw = record.get(zone_idx).unwrap_or_default();
        let zone: i32 = raw
            .parse()
            .map_err(|_| Error::Schema(format!("zone '{}' is not an integer", raw)))?;
        let name = record.get(id_idx).unwrap_or_default().to_string();
        if names.insert(zone, name).is_some() {
            return Err(Error::DuplicateKey(format!("zone {} listed twice", zone)));
        }
    }
    Ok(names)
}
