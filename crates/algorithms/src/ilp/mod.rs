//! Glue for an external ILP maximum-coverage solver
//!
//! The solver itself runs outside this crate. It takes a constant cost
//! layer ([`cost_raster`]) and a feature stack, and for each budget
//! fraction returns a binary selection raster. [`selections_to_rank`]
//! stacks those selections into a rank raster comparable to the other
//! methods.

use ndarray::{Array2, Zip};
use priocomp_core::raster::Raster;
use priocomp_core::{Error, Result};
use tracing::{debug, warn};

/// Constant 1.0 cost on the valid footprint of `template`
pub fn cost_raster(template: &Raster<f64>) -> Raster<f64> {
    template.map_valid(|_| 1.0)
}

/// Parse a comma-separated budget list such as `0.1,0.2,0.5`
pub fn parse_budgets(s: &str) -> Result<Vec<f64>> {
    s.split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(|b| {
            b.parse::<f64>()
                .map_err(|_| Error::Configuration(format!("budget '{}' is not a number", b)))
        })
        .collect()
}

/// Rank cells by the smallest budget at which the solver selects them.
///
/// `selections` pairs each budget fraction with its selection raster
/// (non-zero = selected). Budgets must lie in (0, 1] and increase
/// strictly. A cell first selected at budget `b` gets rank `1 - b`;
/// valid cells never selected get 0. The footprint is that of the first
/// selection.
pub fn selections_to_rank(selections: &[(f64, Raster<f64>)]) -> Result<Raster<f64>> {
    let Some((_, first)) = selections.first() else {
        return Err(Error::Configuration("no selection rasters given".into()));
    };

    let mut previous = 0.0;
    for (budget, selection) in selections {
        if !(*budget > previous && *budget <= 1.0) {
            return Err(Error::Configuration(format!(
                "budgets must increase strictly within (0, 1], got {} after {}",
                budget, previous
            )));
        }
        first.ensure_same_geometry(selection)?;
        previous = *budget;
    }

    let mask = first.valid_mask();
    let mut first_budget = Array2::from_elem(first.shape(), f64::NAN);
    let mut dropped = 0usize;

    for (budget, selection) in selections {
        Zip::from(&mut first_budget)
            .and(selection.data())
            .for_each(|b, &v| {
                let chosen = !v.is_nan() && v != 0.0;
                if chosen && b.is_nan() {
                    *b = *budget;
                } else if !chosen && !b.is_nan() {
                    dropped += 1;
                }
            });
    }
    if dropped > 0 {
        warn!(
            "{} cells selected at a smaller budget are missing from a larger one",
            dropped
        );
    }

    let mut out = Array2::from_elem(first.shape(), f64::NAN);
    Zip::from(&mut out)
        .and(&first_budget)
        .and(&mask)
        .for_each(|o, &b, &valid| {
            if valid {
                *o = if b.is_nan() { 0.0 } else { 1.0 - b };
            }
        });

    debug!("Stacked {} selection rasters into a rank raster", selections.len());
    first.derive(out)
}
