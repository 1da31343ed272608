//! Immutable engine snapshot and its read API.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::composite::weighted_sum;
use crate::config::{DegenerateFallback, EngineConfig, IcviRule, Unit};
use crate::domain::{Category, Dpsir, Group, IndicatorId, Year};
use crate::drilldown::{
    ContributionRecord, DpsirShare, Drilldown, RegionScores, Selector, sort_contributions,
};
use crate::entropy::{WeightSet, entropy_weights, equal_weights, fixed_weights};
use crate::error::{DataError, IndexError};
use crate::normalize::{NormalizedTable, normalize, unit_years};
use crate::table::IndicatorTable;

/// Indicator weights for one category in one unit.
pub type IndicatorWeights = WeightSet<IndicatorId>;

/// Category weights used to combine composites into the ICVI.
pub type GroupWeights = WeightSet<Category>;

/// Outcome of weighting one group in one unit.
type SliceResult<T> = Result<T, IndexError>;

fn category_slot(category: Category) -> usize {
    match category {
        Category::Exposure => 0,
        Category::Sensitivity => 1,
        Category::AdaptiveCapacity => 2,
    }
}

fn slice_error(group: &str, unit: Unit, source: IndexError) -> IndexError {
    IndexError::Slice {
        category: group.to_string(),
        unit: unit.to_string(),
        source: Box::new(source),
    }
}

/// Entropy weights with the configured degenerate fallback applied.
fn resolve_weights<K: Clone + Ord + std::fmt::Display>(
    group: &str,
    columns: &[(K, Vec<f64>)],
    fallback: DegenerateFallback,
) -> Result<WeightSet<K>, IndexError> {
    match entropy_weights(group, columns) {
        Err(IndexError::DegenerateWeights(err)) if fallback == DegenerateFallback::EqualWeights => {
            warn!(%err, "degenerate entropy weights, using equal weights");
            equal_weights(group, columns)
        }
        other => other,
    }
}

/// One member's inputs to a category composite.
struct Term {
    indicator_idx: usize,
    weight: f64,
    normalized: f64,
    raw: f64,
}

/// A computed, read-only view over one indicator panel.
///
/// Holds the source table, its normalized form, and every indicator and
/// category weight set. Composite scores are evaluated on demand from these
/// and are bit-identical across repeated calls.
///
/// Data problems are confined to the (unit, category) slice they occur in:
/// a slice that could not be weighted fails every query that needs it and
/// leaves the rest of the panel usable.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    table: IndicatorTable,
    normalized: NormalizedTable,
    members: [Vec<usize>; 3],
    weights: HashMap<(Unit, Category), SliceResult<IndicatorWeights>>,
    group_weights: HashMap<Unit, SliceResult<GroupWeights>>,
}

impl Engine {
    pub(crate) fn build(config: EngineConfig, table: IndicatorTable) -> Result<Self, IndexError> {
        let normalized = normalize(&table, config.weight_scope, config.zero_variance);
        let layout = table.layout();

        let mut members: [Vec<usize>; 3] = Default::default();
        for (i, meta) in layout.indicators().iter().enumerate() {
            members[category_slot(meta.category)].push(i);
        }
        for category in Category::ALL {
            if members[category_slot(category)].is_empty() {
                return Err(DataError::EmptyGroup { category }.into());
            }
        }

        let units = unit_years(layout, config.weight_scope);
        let tasks: Vec<(Unit, &[usize], Category)> = units
            .iter()
            .flat_map(|(unit, cols)| {
                Category::ALL
                    .into_iter()
                    .map(move |c| (*unit, cols.as_slice(), c))
            })
            .collect();

        let weights: HashMap<_, _> = tasks
            .par_iter()
            .map(|&(unit, year_cols, category)| {
                let slot = &members[category_slot(category)];
                let result = match slot.iter().find_map(|&i| normalized.unit_failure(unit, i)) {
                    Some(err) => Err(slice_error(category.as_str(), unit, err.clone().into())),
                    None => {
                        let columns: Vec<(IndicatorId, Vec<f64>)> = slot
                            .iter()
                            .map(|&i| {
                                let values = year_cols
                                    .iter()
                                    .flat_map(|&y| normalized.column(y, i).iter().filter_map(|v| *v))
                                    .collect();
                                (layout.indicators()[i].id.clone(), values)
                            })
                            .collect();
                        resolve_weights(category.as_str(), &columns, config.degenerate)
                            .map_err(|e| slice_error(category.as_str(), unit, e))
                    }
                };
                ((unit, category), result)
            })
            .collect();
        let n_failed = weights.values().filter(|w| w.is_err()).count();
        for ((unit, category), result) in &weights {
            if let Err(err) = result {
                warn!(%unit, %category, error = ?err, "slice left unweighted");
            }
        }
        debug!(n_weight_sets = weights.len(), n_failed, "indicator weights computed");

        let mut engine = Self {
            config,
            table,
            normalized,
            members,
            weights,
            group_weights: HashMap::new(),
        };
        engine.group_weights = engine.compute_group_weights(&units);
        Ok(engine)
    }

    fn compute_group_weights(&self, units: &[(Unit, Vec<usize>)]) -> HashMap<Unit, SliceResult<GroupWeights>> {
        match self.config.icvi_rule {
            IcviRule::EqualWeights => units
                .iter()
                .map(|(unit, _)| (*unit, Ok(fixed_weights("icvi", &Category::ALL))))
                .collect(),
            IcviRule::Entropy => units
                .par_iter()
                .map(|(unit, year_cols)| {
                    let mut columns: Vec<(Category, Vec<f64>)> =
                        Category::ALL.iter().map(|&c| (c, Vec::new())).collect();
                    let mut excluded = 0usize;
                    for &y in year_cols {
                        for r in 0..self.table.regions().len() {
                            let scores: Result<Vec<f64>, IndexError> = Category::ALL
                                .iter()
                                .map(|&c| self.category_score(r, y, c))
                                .collect();
                            match scores {
                                Ok(scores) => {
                                    for (col, s) in columns.iter_mut().zip(scores) {
                                        col.1.push(s);
                                    }
                                }
                                Err(_) => excluded += 1,
                            }
                        }
                    }
                    if excluded > 0 {
                        warn!(%unit, excluded, "regions without all category composites left out of ICVI weighting");
                    }
                    let result = resolve_weights("icvi", &columns, self.config.degenerate)
                        .map_err(|e| slice_error("icvi", *unit, e));
                    if let Err(err) = &result {
                        warn!(%unit, error = ?err, "ICVI left unweighted");
                    }
                    (*unit, result)
                })
                .collect(),
        }
    }

    /// Configuration this snapshot was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Source indicator table.
    #[must_use]
    pub fn table(&self) -> &IndicatorTable {
        &self.table
    }

    /// Normalized indicator table.
    #[must_use]
    pub fn normalized(&self) -> &NormalizedTable {
        &self.normalized
    }

    /// Most recent year of the panel; the default year for queries.
    #[must_use]
    pub fn latest_year(&self) -> Year {
        self.table.latest_year()
    }

    fn unit(&self, year: Year) -> Unit {
        self.config.weight_scope.unit_for(year)
    }

    fn indicator_weights(&self, year: Year, category: Category) -> Result<&IndicatorWeights, IndexError> {
        // every (unit, category) pair is populated by build()
        self.weights[&(self.unit(year), category)]
            .as_ref()
            .map_err(Clone::clone)
    }

    fn icvi_weights(&self, year: Year) -> Result<&GroupWeights, IndexError> {
        self.group_weights[&self.unit(year)]
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Inputs of each member of `category`, failing on the first missing
    /// value. `dpsir` restricts the members considered; a category with no
    /// matching member yields no terms without consulting its weights.
    fn category_terms(
        &self,
        region_idx: usize,
        year_idx: usize,
        category: Category,
        dpsir: Option<Dpsir>,
    ) -> Result<Vec<Term>, IndexError> {
        let layout = self.table.layout();
        let selected: Vec<usize> = self.members[category_slot(category)]
            .iter()
            .copied()
            .filter(|&i| dpsir.is_none_or(|d| layout.indicators()[i].dpsir == d))
            .collect();
        if selected.is_empty() {
            return Ok(Vec::new());
        }
        let year = layout.years()[year_idx];
        let weights = self.indicator_weights(year, category)?;
        selected
            .into_iter()
            .map(|i| {
                let meta = &layout.indicators()[i];
                let raw = self.table.column(year_idx, i)[region_idx];
                let normalized = self.normalized.column(year_idx, i)[region_idx];
                let (Some(raw), Some(normalized)) = (raw, normalized) else {
                    return Err(DataError::MissingValue {
                        region: layout.regions()[region_idx].as_str().to_string(),
                        year,
                        indicator: meta.id.as_str().to_string(),
                    }
                    .into());
                };
                Ok(Term {
                    indicator_idx: i,
                    weight: weights.get(&meta.id).unwrap_or(0.0),
                    normalized,
                    raw,
                })
            })
            .collect()
    }

    fn category_score(&self, region_idx: usize, year_idx: usize, category: Category) -> Result<f64, IndexError> {
        let terms = self.category_terms(region_idx, year_idx, category, None)?;
        Ok(weighted_sum(terms.into_iter().map(|t| (t.weight, t.normalized))))
    }

    fn icvi_score(&self, region_idx: usize, year_idx: usize) -> Result<f64, IndexError> {
        let year = self.table.layout().years()[year_idx];
        let group_weights = self.icvi_weights(year)?;
        let terms = Category::ALL
            .iter()
            .map(|&c| {
                let score = self.category_score(region_idx, year_idx, c)?;
                Ok((group_weights.get(&c).unwrap_or(0.0), score))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;
        Ok(weighted_sum(terms))
    }

    fn score(&self, region_idx: usize, year_idx: usize, group: Group) -> Result<f64, IndexError> {
        match group {
            Group::Category(c) => self.category_score(region_idx, year_idx, c),
            Group::Icvi => self.icvi_score(region_idx, year_idx),
        }
    }

    /// Composite score of `group` for one region and year, in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IndexError::Lookup`] | Unknown region or year |
    /// | [`IndexError::Data`] | A member indicator has no value for this region and year |
    /// | [`IndexError::Slice`] | The group could not be weighted in this year's unit |
    pub fn composite(&self, region: &str, year: Year, group: Group) -> Result<f64, IndexError> {
        let layout = self.table.layout();
        let r = layout.region_idx(region)?;
        let y = layout.year_idx(year)?;
        self.score(r, y, group)
    }

    /// Indicator weights of `category` applying to `year`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Lookup`] if the year is not in the panel, or
    /// [`IndexError::Slice`] if the category could not be weighted there.
    pub fn weights(&self, category: Category, year: Year) -> Result<&IndicatorWeights, IndexError> {
        self.table.layout().year_idx(year)?;
        self.indicator_weights(year, category)
    }

    /// Category weights used for the ICVI in `year`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Lookup`] if the year is not in the panel, or
    /// [`IndexError::Slice`] if the entropy pass over composites failed there.
    pub fn group_weights(&self, year: Year) -> Result<&GroupWeights, IndexError> {
        self.table.layout().year_idx(year)?;
        self.icvi_weights(year)
    }

    /// Contribution breakdown of the indicators matched by `selector`,
    /// sorted by descending contribution.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IndexError::Lookup`] | Unknown region or year |
    /// | [`IndexError::Data`] | A selected indicator has no value for this region and year |
    /// | [`IndexError::Slice`] | A category holding selected indicators could not be weighted |
    #[instrument(skip(self))]
    pub fn drilldown(&self, region: &str, year: Year, selector: Selector) -> Result<Drilldown, IndexError> {
        let layout = self.table.layout();
        let r = layout.region_idx(region)?;
        let y = layout.year_idx(year)?;

        let (categories, dpsir) = match selector {
            Selector::Category(c) => (vec![c], None),
            Selector::Dpsir(d) => (Category::ALL.to_vec(), Some(d)),
        };

        let mut records = Vec::new();
        for category in categories {
            for term in self.category_terms(r, y, category, dpsir)? {
                let meta = &layout.indicators()[term.indicator_idx];
                records.push(ContributionRecord {
                    indicator: meta.id.clone(),
                    category: meta.category,
                    dpsir: meta.dpsir,
                    raw: term.raw,
                    normalized: term.normalized,
                    weight: term.weight,
                    contribution: term.weight * term.normalized,
                });
            }
        }
        sort_contributions(&mut records);

        let total = match selector {
            Selector::Category(c) => self.category_score(r, y, c)?,
            Selector::Dpsir(_) => records.iter().map(|rec| rec.contribution).sum(),
        };

        Ok(Drilldown {
            region: layout.regions()[r].clone(),
            year,
            selector,
            total,
            records,
        })
    }

    /// Split the ICVI of one region and year into DPSIR classes.
    ///
    /// Each indicator contributes `category weight × indicator weight ×
    /// normalized value`; the contributions of all classes sum to the ICVI.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Engine::composite`] with [`Group::Icvi`].
    pub fn dpsir_decomposition(&self, region: &str, year: Year) -> Result<Vec<DpsirShare>, IndexError> {
        let layout = self.table.layout();
        let r = layout.region_idx(region)?;
        let y = layout.year_idx(year)?;
        let icvi = self.icvi_score(r, y)?;
        let group_weights = self.icvi_weights(year)?;

        let mut shares: Vec<DpsirShare> = Dpsir::ALL
            .iter()
            .map(|&dpsir| DpsirShare {
                dpsir,
                n_indicators: 0,
                contribution: 0.0,
                share: 0.0,
            })
            .collect();
        for category in Category::ALL {
            let g = group_weights.get(&category).unwrap_or(0.0);
            for term in self.category_terms(r, y, category, None)? {
                let dpsir = layout.indicators()[term.indicator_idx].dpsir;
                if let Some(share) = shares.iter_mut().find(|s| s.dpsir == dpsir) {
                    share.n_indicators += 1;
                    share.contribution += g * term.weight * term.normalized;
                }
            }
        }
        for share in &mut shares {
            share.share = if icvi > 0.0 { share.contribution / icvi } else { 0.0 };
        }
        Ok(shares)
    }

    /// Category and ICVI scores of every region for `year`.
    ///
    /// Unresolvable scores are `None` rather than errors so a full map can
    /// be rendered with "no data" cells.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Lookup`] if the year is not in the panel.
    pub fn year_scores(&self, year: Year) -> Result<Vec<RegionScores>, IndexError> {
        let layout = self.table.layout();
        let y = layout.year_idx(year)?;
        let scores: Vec<RegionScores> = layout
            .regions()
            .iter()
            .enumerate()
            .map(|(r, region)| RegionScores {
                region: region.clone(),
                year,
                exposure: self.category_score(r, y, Category::Exposure).ok(),
                sensitivity: self.category_score(r, y, Category::Sensitivity).ok(),
                adaptive_capacity: self.category_score(r, y, Category::AdaptiveCapacity).ok(),
                icvi: self.icvi_score(r, y).ok(),
            })
            .collect();
        let n_missing = scores.iter().filter(|s| s.icvi.is_none()).count();
        if n_missing > 0 {
            warn!(year, n_missing, "regions without a resolvable ICVI");
        }
        Ok(scores)
    }

    /// Mean composite of `group` over every year of the panel.
    ///
    /// # Errors
    ///
    /// Fails if the region is unknown or any year's composite fails.
    pub fn period_average(&self, region: &str, group: Group) -> Result<f64, IndexError> {
        let layout = self.table.layout();
        let r = layout.region_idx(region)?;
        let n_years = layout.years().len();
        let total = (0..n_years)
            .map(|y| self.score(r, y, group))
            .sum::<Result<f64, IndexError>>()?;
        Ok(total / n_years as f64)
    }
}
