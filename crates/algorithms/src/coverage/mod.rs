//! Footprint alignment between rank rasters
//!
//! Rank rasters produced by different methods rarely cover exactly the
//! same cells. Before they can be compared they are either expanded onto
//! a common template footprint ([`expand_value_coverage`]) or cut down to
//! the cells both cover ([`match_footprints`]).

use crate::rank::{rank_raster, TieBreak};
use ndarray::{Array2, Zip};
use priocomp_core::raster::Raster;
use priocomp_core::{Error, Result, ResultExt};
use serde::Serialize;
use std::str::FromStr;
use tracing::debug;

/// How cells that the template covers but the target does not are filled
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum FillPolicy {
    /// New cells get rank 0; original ranks are compressed into `[s, 1]`
    /// with `s = n_new / n_union`, keeping their order and ties
    #[default]
    LowestTier,
    /// New cells get a fixed rank in [0, 1]; original ranks are kept
    Constant(f64),
}

impl FromStr for FillPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("lowest") {
            return Ok(FillPolicy::LowestTier);
        }
        let c: f64 = s.parse().map_err(|_| {
            Error::Configuration(format!("fill policy '{}' is neither 'lowest' nor a number", s))
        })?;
        Ok(FillPolicy::Constant(c))
    }
}

/// Expand a rank raster onto the footprint of `template`.
///
/// The output is valid exactly where the template is valid. Every valid
/// target cell must lie inside the template footprint.
pub fn expand_value_coverage(
    target: &Raster<f64>,
    template: &Raster<f64>,
    policy: FillPolicy,
) -> Result<Raster<f64>> {
    target.ensure_same_geometry(template)?;
    if let FillPolicy::Constant(c) = policy
        && !(0.0..=1.0).contains(&c)
    {
        return Err(Error::Configuration(format!(
            "fill value {} is outside [0, 1]",
            c
        )));
    }

    let target_mask = target.valid_mask();
    let template_mask = template.valid_mask();

    let outside = Zip::from(&target_mask)
        .and(&template_mask)
        .fold(0usize, |acc, &t, &m| acc + usize::from(t && !m));
    if outside > 0 {
        return Err(Error::GeometryMismatch(format!(
            "{} target cells lie outside the template footprint",
            outside
        )));
    }

    let n_union = template_mask.iter().filter(|&&m| m).count();
    if n_union == 0 {
        return Err(Error::DegenerateInput("template footprint is empty".into()));
    }
    let n_new = n_union - target_mask.iter().filter(|&&t| t).count();

    let (shift, fill) = match policy {
        FillPolicy::LowestTier => (n_new as f64 / n_union as f64, 0.0),
        FillPolicy::Constant(c) => (0.0, c),
    };
    debug!(
        "Expanding coverage: {} new cells of {}, original ranks shifted by {:.4}",
        n_new, n_union, shift
    );

    let mut out = Array2::from_elem(target.shape(), f64::NAN);
    Zip::from(&mut out)
        .and(target.data())
        .and(&target_mask)
        .and(&template_mask)
        .for_each(|o, &v, &in_target, &in_template| {
            if in_target {
                *o = shift + (1.0 - shift) * v;
            } else if in_template {
                *o = fill;
            }
        });
    target.derive(out)
}

/// Restrict two rank rasters to the cells both cover, keeping their values.
///
/// An empty shared footprint is a `DegenerateInput`.
pub fn shared_footprint(a: &Raster<f64>, b: &Raster<f64>) -> Result<(Raster<f64>, Raster<f64>)> {
    a.ensure_same_geometry(b)?;

    let mut shared = a.valid_mask();
    Zip::from(&mut shared)
        .and(&b.valid_mask())
        .for_each(|s, &v| *s = *s && v);
    if !shared.iter().any(|&s| s) {
        return Err(Error::DegenerateInput(
            "rasters share no valid cells".into(),
        ));
    }

    let restrict = |r: &Raster<f64>| -> Result<Raster<f64>> {
        let mut data = r.to_f64_array();
        Zip::from(&mut data).and(&shared).for_each(|d, &keep| {
            if !keep {
                *d = f64::NAN;
            }
        });
        r.derive(data)
    };
    Ok((restrict(a)?, restrict(b)?))
}

/// Restrict two rank rasters to the cells both cover and re-rank each.
///
/// Ranks are recomputed independently over the shared footprint with
/// averaged ties and divided by the largest rank.
pub fn match_footprints(a: &Raster<f64>, b: &Raster<f64>) -> Result<(Raster<f64>, Raster<f64>)> {
    let (a, b) = shared_footprint(a, b)?;
    let a_ranked = rank_raster(&a, TieBreak::Average)
        .in_context(|| "re-ranking first raster on the shared footprint")?;
    let b_ranked = rank_raster(&b, TieBreak::Average)
        .in_context(|| "re-ranking second raster on the shared footprint")?;
    Ok((a_ranked, b_ranked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use priocomp_core::GeoTransform;

    const NAN: f64 = f64::NAN;

    fn raster(values: Vec<f64>) -> Raster<f64> {
        Raster::from_vec(values, 2, 3).unwrap()
    }

    #[test]
    fn test_expand_lowest_tier() {
        let target = raster(vec![0.5, 1.0, NAN, 0.5, NAN, NAN]);
        let template = raster(vec![1.0, 1.0, 1.0, 1.0, 1.0, NAN]);
        let out = expand_value_coverage(&target, &template, FillPolicy::LowestTier).unwrap();

        assert_eq!(out.valid_mask(), template.valid_mask());
        // 2 new cells of 5: s = 0.4
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.4 + 0.6 * 0.5);
        assert_relative_eq!(out.get(0, 1).unwrap(), 1.0);
        assert_relative_eq!(out.get(0, 2).unwrap(), 0.0);
        assert_relative_eq!(out.get(1, 1).unwrap(), 0.0);
        // Ties among original cells survive
        assert_eq!(out.get(0, 0).unwrap(), out.get(1, 0).unwrap());
        assert!(out.get(1, 2).unwrap().is_nan());
    }

    #[test]
    fn test_expand_preserves_order() {
        let target = raster(vec![0.2, 0.9, 0.4, NAN, 0.6, NAN]);
        let template = raster(vec![1.0; 6]);
        let out = expand_value_coverage(&target, &template, FillPolicy::LowestTier).unwrap();
        let new_min = out.get(1, 0).unwrap();
        for (r, c) in [(0, 0), (0, 1), (0, 2), (1, 1)] {
            assert!(out.get(r, c).unwrap() > new_min);
        }
        assert!(out.get(0, 0).unwrap() < out.get(0, 2).unwrap());
        assert!(out.get(0, 2).unwrap() < out.get(1, 1).unwrap());
    }

    #[test]
    fn test_expand_constant() {
        let target = raster(vec![0.5, 1.0, NAN, NAN, NAN, NAN]);
        let template = raster(vec![1.0; 6]);
        let out = expand_value_coverage(&target, &template, FillPolicy::Constant(0.25)).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.5);
        assert_relative_eq!(out.get(1, 2).unwrap(), 0.25);

        let err = expand_value_coverage(&target, &template, FillPolicy::Constant(1.5)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_expand_target_outside_template() {
        let target = raster(vec![0.5, 1.0, NAN, NAN, NAN, 0.3]);
        let template = raster(vec![1.0, 1.0, 1.0, 1.0, 1.0, NAN]);
        let err = expand_value_coverage(&target, &template, FillPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::GeometryMismatch(_)));
    }

    #[test]
    fn test_expand_transform_mismatch() {
        let target = raster(vec![0.5; 6]);
        let mut template = raster(vec![1.0; 6]);
        template.set_transform(GeoTransform::new(100.0, 0.0, 10.0, -10.0));
        let err = expand_value_coverage(&target, &template, FillPolicy::default()).unwrap_err();
        assert!(matches!(err, Error::GeometryMismatch(_)));
    }

    #[test]
    fn test_match_footprints() {
        let a = raster(vec![0.1, 0.5, 0.9, NAN, 0.3, 0.7]);
        let b = raster(vec![0.9, NAN, 0.1, 0.4, 0.2, 0.8]);
        let (ma, mb) = match_footprints(&a, &b).unwrap();

        assert_eq!(ma.valid_mask(), mb.valid_mask());
        assert_eq!(ma.valid_count(), 4);
        assert!(ma.get(0, 1).unwrap().is_nan());
        assert!(mb.get(1, 0).unwrap().is_nan());
        // a over shared cells: 0.1, 0.9, 0.3, 0.7 -> ranks 1, 4, 2, 3
        assert_relative_eq!(ma.get(0, 0).unwrap(), 0.25);
        assert_relative_eq!(ma.get(0, 2).unwrap(), 1.0);
        assert_relative_eq!(mb.get(0, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_match_disjoint() {
        let a = raster(vec![0.1, 0.2, 0.3, NAN, NAN, NAN]);
        let b = raster(vec![NAN, NAN, NAN, 0.1, 0.2, 0.3]);
        let err = match_footprints(&a, &b).unwrap_err();
        assert!(matches!(err.root(), Error::DegenerateInput(_)));
    }

    #[test]
    fn test_shared_footprint_keeps_values() {
        let a = raster(vec![0.1, 0.5, 0.9, NAN, 0.3, 0.7]);
        let b = raster(vec![0.9, NAN, 0.1, 0.4, 0.2, 0.8]);
        let (sa, sb) = shared_footprint(&a, &b).unwrap();
        assert_eq!(sa.valid_count(), 4);
        assert_eq!(sa.valid_mask(), sb.valid_mask());
        assert_relative_eq!(sa.get(0, 0).unwrap(), 0.1);
        assert_relative_eq!(sb.get(1, 2).unwrap(), 0.8);
        assert!(sb.get(1, 0).unwrap().is_nan());
    }

    #[test]
    fn test_parse_fill() {
        assert_eq!("lowest".parse::<FillPolicy>().unwrap(), FillPolicy::LowestTier);
        assert_eq!("0.5".parse::<FillPolicy>().unwrap(), FillPolicy::Constant(0.5));
        assert!("top".parse::<FillPolicy>().is_err());
    }
}
