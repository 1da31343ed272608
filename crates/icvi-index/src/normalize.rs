//! Min-max normalization with polarity, per unit of analysis.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::{Unit, WeightScope, ZeroVariance};
use crate::domain::{IndicatorMeta, Polarity, Year};
use crate::error::{DataError, IndexError};
use crate::table::{IndicatorTable, Layout};

/// Observed range of one indicator within one unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Smallest observed raw value.
    pub min: f64,
    /// Largest observed raw value.
    pub max: f64,
}

impl Bounds {
    /// True if every observation had the same value.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }
}

/// Scale `value` into `[0, 1]` against `[min, max]`, then flip it for
/// negative polarity so that higher always means more vulnerable.
///
/// Requires `max > min`. Operands are halved before subtracting so that a
/// range spanning most of `f64` does not overflow to infinity.
#[must_use]
pub fn min_max_scale(value: f64, min: f64, max: f64, polarity: Polarity) -> f64 {
    let span = max / 2.0 - min / 2.0;
    let scaled = ((value / 2.0 - min / 2.0) / span).clamp(0.0, 1.0);
    match polarity {
        Polarity::Positive => scaled,
        Polarity::Negative => 1.0 - scaled,
    }
}

/// Normalized indicator values, same keys as the source [`IndicatorTable`].
///
/// Every present value lies in `[0, 1]`; missing raw values stay missing.
/// An indicator that cannot be normalized within a unit keeps the error for
/// that unit and has no values there; other units are unaffected.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    layout: Arc<Layout>,
    scope: WeightScope,
    values: Vec<Option<f64>>,
    bounds: HashMap<(Unit, usize), Result<Bounds, DataError>>,
}

impl NormalizedTable {
    /// Scope the table was normalized under.
    #[must_use]
    pub fn scope(&self) -> WeightScope {
        self.scope
    }

    /// Normalized value for a key, `None` if the raw value is missing.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IndexError::Lookup`] | Any part of the key is unknown |
    /// | [`IndexError::Data`] | The indicator could not be normalized in this unit |
    pub fn value(&self, region: &str, year: Year, indicator: &str) -> Result<Option<f64>, IndexError> {
        let r = self.layout.region_idx(region)?;
        self.bounds(year, indicator)?;
        let y = self.layout.year_idx(year)?;
        let i = self.layout.indicator_idx(indicator)?;
        Ok(self.values[self.layout.column_offset(y, i) + r])
    }

    /// Raw min/max of an indicator in the unit containing `year`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IndexError::Lookup`] | The year or indicator is unknown |
    /// | [`IndexError::Data`] | The indicator could not be normalized in this unit |
    pub fn bounds(&self, year: Year, indicator: &str) -> Result<Bounds, IndexError> {
        self.layout.year_idx(year)?;
        let i = self.layout.indicator_idx(indicator)?;
        // every (unit, indicator) pair is populated by normalize()
        self.bounds[&(self.scope.unit_for(year), i)]
            .clone()
            .map_err(IndexError::from)
    }

    /// Why `indicator_idx` could not be normalized in `unit`, if it failed.
    pub(crate) fn unit_failure(&self, unit: Unit, indicator_idx: usize) -> Option<&DataError> {
        self.bounds
            .get(&(unit, indicator_idx))
            .and_then(|b| b.as_ref().err())
    }

    /// Iterate over every present normalized value.
    pub fn iter_present(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|v| *v)
    }

    pub(crate) fn column(&self, year_idx: usize, indicator_idx: usize) -> &[Option<f64>] {
        let start = self.layout.column_offset(year_idx, indicator_idx);
        &self.values[start..start + self.layout.n_regions()]
    }
}

/// Column indices (by year) that make up each unit under `scope`.
pub(crate) fn unit_years(layout: &Layout, scope: WeightScope) -> Vec<(Unit, Vec<usize>)> {
    match scope {
        WeightScope::PerYear => layout
            .years()
            .iter()
            .enumerate()
            .map(|(y, &year)| (Unit::Year(year), vec![y]))
            .collect(),
        WeightScope::Panel => vec![(Unit::Panel, (0..layout.years().len()).collect())],
    }
}

/// Observed bounds of one indicator over `year_cols`, and the constant to
/// fill with if the range is degenerate.
fn unit_bounds(
    table: &IndicatorTable,
    year_cols: &[usize],
    indicator_idx: usize,
    meta: &IndicatorMeta,
    unit: Unit,
    zero_variance: ZeroVariance,
) -> Result<(Bounds, Option<f64>), DataError> {
    let observed = year_cols
        .iter()
        .flat_map(|&y| table.column(y, indicator_idx).iter().filter_map(|v| *v));
    let (min, max) = observed.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min > max {
        return Err(DataError::NoObservations {
            indicator: meta.id.as_str().to_string(),
            unit: unit.to_string(),
        });
    }
    let b = Bounds { min, max };
    if !b.is_degenerate() {
        return Ok((b, None));
    }
    match zero_variance {
        ZeroVariance::Reject => Err(DataError::ZeroVariance {
            indicator: meta.id.as_str().to_string(),
            unit: unit.to_string(),
            value: min,
        }),
        ZeroVariance::Constant(c) => {
            debug!(indicator = %meta.id, %unit, fallback = c, "zero-variance fallback applied");
            Ok((b, Some(c)))
        }
    }
}

/// Normalize every indicator of `table` within each unit of `scope`.
///
/// Bounds are taken over the non-missing values of the unit. A unit with a
/// single distinct value is handled per `zero_variance`.
///
/// Failures are kept per (unit, indicator) and surface from
/// [`NormalizedTable::value`] and [`NormalizedTable::bounds`]:
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::NoObservations`] | An indicator has no values at all in a unit |
/// | [`DataError::ZeroVariance`] | Fewer than 2 distinct values and `ZeroVariance::Reject` |
#[instrument(skip_all, fields(scope = ?scope))]
pub fn normalize(table: &IndicatorTable, scope: WeightScope, zero_variance: ZeroVariance) -> NormalizedTable {
    let layout = table.layout();
    let mut values = vec![None; layout.n_cells()];
    let mut bounds = HashMap::new();

    for (unit, year_cols) in unit_years(layout, scope) {
        for (i, meta) in layout.indicators().iter().enumerate() {
            let (b, fill) = match unit_bounds(table, &year_cols, i, meta, unit, zero_variance) {
                Ok(found) => found,
                Err(err) => {
                    debug!(indicator = %meta.id, %unit, %err, "indicator not normalized");
                    bounds.insert((unit, i), Err(err));
                    continue;
                }
            };
            bounds.insert((unit, i), Ok(b));

            for &y in &year_cols {
                let start = layout.column_offset(y, i);
                for (r, raw) in table.column(y, i).iter().enumerate() {
                    values[start + r] = raw.map(|x| {
                        fill.unwrap_or_else(|| min_max_scale(x, b.min, b.max, meta.polarity))
                    });
                }
            }
        }
    }

    NormalizedTable {
        layout: Arc::clone(layout),
        scope,
        values,
        bounds,
    }
}
